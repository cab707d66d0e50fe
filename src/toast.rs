use std::time::{Duration, Instant};

use crate::settings::ToastSettings;

/// Ease-out timing curve, cubic bezier (0, 0) (0.58, 1).
pub fn ease_out(t: f32) -> f32 {
    const X1: f32 = 0.;
    const X2: f32 = 0.58;
    const Y1: f32 = 0.;
    const Y2: f32 = 1.;

    let t = t.clamp(0., 1.);
    let bezier = |p1: f32, p2: f32, s: f32| {
        let inv = 1. - s;
        3. * inv * inv * s * p1 + 3. * inv * s * s * p2 + s * s * s
    };

    // solve x(s) = t by bisection, x is monotonic on [0, 1]
    let (mut lo, mut hi) = (0f32, 1f32);
    for _ in 0..32 {
        let mid = (lo + hi) / 2.;
        if bezier(X1, X2, mid) < t {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    bezier(Y1, Y2, (lo + hi) / 2.)
}

/// A message on screen and the instant it appeared.
#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub message: String,
    pub shown_at: Instant,
}

/// Opacity of a toast shown `elapsed` ago, or `None` once the fade is over.
pub fn opacity_at(elapsed: Duration, delay: Duration, fade: Duration) -> Option<f32> {
    if elapsed < delay {
        return Some(1.);
    }
    let fading = elapsed - delay;
    if fading >= fade {
        return None;
    }
    Some(1. - ease_out(fading.as_secs_f32() / fade.as_secs_f32()))
}

/// At most one toast at a time; a new one replaces the current one.
pub struct ToastState {
    settings: ToastSettings,
    current: Option<Toast>,
}

/// What the overlay should render for one tick.
#[derive(Debug, Clone, PartialEq)]
pub enum ToastFrame {
    Hidden,
    Visible { message: String, opacity: f32 },
}

impl ToastState {
    pub fn new(settings: ToastSettings) -> Self {
        Self {
            settings,
            current: None,
        }
    }

    pub fn show(&mut self, message: String, now: Instant) {
        self.current = Some(Toast {
            message,
            shown_at: now,
        });
    }

    pub fn current(&self) -> Option<&Toast> {
        self.current.as_ref()
    }

    /// Advances the fade; drops the toast when it has fully faded.
    pub fn tick(&mut self, now: Instant) -> ToastFrame {
        let Some(toast) = &self.current else {
            return ToastFrame::Hidden;
        };
        let elapsed = now.saturating_duration_since(toast.shown_at);
        match opacity_at(elapsed, self.settings.delay(), self.settings.fade()) {
            Some(opacity) => ToastFrame::Visible {
                message: toast.message.clone(),
                opacity,
            },
            None => {
                self.current = None;
                ToastFrame::Hidden
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(100);
    const FADE: Duration = Duration::from_millis(4000);

    #[test]
    fn ease_out_endpoints_and_shape() {
        assert!(ease_out(0.).abs() < 1e-4);
        assert!((ease_out(1.) - 1.).abs() < 1e-4);
        // decelerates: ahead of linear in the middle
        assert!(ease_out(0.5) > 0.5);
        let mut last = 0.;
        for i in 1..=20 {
            let v = ease_out(i as f32 / 20.);
            assert!(v >= last);
            last = v;
        }
    }

    #[test]
    fn opaque_during_delay_then_fades_out() {
        assert_eq!(opacity_at(Duration::ZERO, DELAY, FADE), Some(1.));
        assert_eq!(opacity_at(Duration::from_millis(99), DELAY, FADE), Some(1.));
        let mid = opacity_at(DELAY + FADE / 2, DELAY, FADE).unwrap();
        assert!(mid > 0. && mid < 0.5, "{mid}");
        assert_eq!(opacity_at(DELAY + FADE, DELAY, FADE), None);
    }

    #[test]
    fn toast_is_removed_after_fade() {
        let mut state = ToastState::new(ToastSettings::default());
        let start = Instant::now();
        assert_eq!(state.tick(start), ToastFrame::Hidden);

        state.show("1+1".into(), start);
        assert_eq!(
            state.tick(start + Duration::from_millis(50)),
            ToastFrame::Visible {
                message: "1+1".into(),
                opacity: 1.
            }
        );
        assert_eq!(state.tick(start + Duration::from_millis(4200)), ToastFrame::Hidden);
        assert!(state.current().is_none());
    }

    #[test]
    fn new_toast_replaces_and_restarts() {
        let mut state = ToastState::new(ToastSettings::default());
        let start = Instant::now();
        state.show("first".into(), start);
        let later = start + Duration::from_millis(3000);
        state.show("second".into(), later);

        match state.tick(later + Duration::from_millis(100)) {
            ToastFrame::Visible { message, opacity } => {
                assert_eq!(message, "second");
                assert!(opacity > 0.99);
            }
            ToastFrame::Hidden => panic!("toast should be visible"),
        }
    }
}
