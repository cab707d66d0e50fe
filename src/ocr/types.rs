/// One candidate string for a detected text region.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedText {
    pub string: String,
    pub confidence: f32,
}

/// Region of the source image a text observation covers, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// One detected text region with its candidates, best first.
#[derive(Debug, Clone, PartialEq)]
pub struct TextObservation {
    pub candidates: Vec<RecognizedText>,
    pub bounding_box: BoundingBox,
}

impl TextObservation {
    pub fn top_candidates(&self, max: usize) -> &[RecognizedText] {
        &self.candidates[..max.min(self.candidates.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_candidates_is_bounded() {
        let observation = TextObservation {
            candidates: vec![
                RecognizedText { string: "1+1".into(), confidence: 0.9 },
                RecognizedText { string: "l+l".into(), confidence: 0.4 },
            ],
            bounding_box: BoundingBox::default(),
        };
        assert_eq!(observation.top_candidates(1)[0].string, "1+1");
        assert_eq!(observation.top_candidates(5).len(), 2);
        assert!(TextObservation { candidates: vec![], bounding_box: BoundingBox::default() }
            .top_candidates(1)
            .is_empty());
    }
}
