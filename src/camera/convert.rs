//! Raw camera frame conversions into `RgbaImage`.

use image::{
    imageops::{rotate180, rotate270, rotate90},
    RgbaImage,
};

/// android: YUV420SP (NV21, interleaved VU plane) to rgba.
/// `None` for odd dimensions or a buffer shorter than a full frame.
pub fn decode_yuv420sp(data: &[u8], width: u32, height: u32) -> Option<RgbaImage> {
    if width % 2 != 0 || height % 2 != 0 {
        return None;
    }
    let (w, h) = (width as usize, height as usize);
    let frame_size = w * h;
    if data.len() < frame_size + frame_size / 2 {
        return None;
    }
    let mut rgba_data = Vec::with_capacity(frame_size * 4);
    for j in 0..h {
        let mut uvp = frame_size + (j >> 1) * w;
        let (mut u, mut v) = (0, 0);
        for i in 0..w {
            let y = (data[j * w + i] as i32 - 16).max(0);
            if i & 1 == 0 {
                v = data[uvp] as i32 - 128;
                u = data[uvp + 1] as i32 - 128;
                uvp += 2;
            }

            let y1192 = 1192 * y;
            let r = (y1192 + 1634 * v).clamp(0, 262143);
            let g = (y1192 - 833 * v - 400 * u).clamp(0, 262143);
            let b = (y1192 + 2066 * u).clamp(0, 262143);

            rgba_data.extend_from_slice(&[(r >> 10) as u8, (g >> 10) as u8, (b >> 10) as u8, 255]);
        }
    }
    RgbaImage::from_raw(width, height, rgba_data)
}

/// Desktop drivers hand out BGRA.
pub fn bgra_to_rgba(data: &[u8], width: u32, height: u32) -> Option<RgbaImage> {
    let mut rgba = Vec::with_capacity(data.len());
    for bgra in data.chunks_exact(4) {
        rgba.extend_from_slice(&[bgra[2], bgra[1], bgra[0], bgra[3]]);
    }
    RgbaImage::from_raw(width, height, rgba)
}

/// Drops the padding at the end of each row of a plane whose row stride is
/// wider than its pixel width.
pub fn compact_rows(plane: &[u8], row_len: usize, stride: usize, rows: usize) -> Vec<u8> {
    if stride == row_len {
        return plane[..(row_len * rows).min(plane.len())].to_vec();
    }
    let mut out = Vec::with_capacity(row_len * rows);
    for row in plane.chunks(stride).take(rows) {
        out.extend_from_slice(&row[..row_len.min(row.len())]);
    }
    out
}

/// Builds the interleaved VU plane of NV21 from planar U and V.
pub fn interleave_vu(u: &[u8], v: &[u8]) -> Vec<u8> {
    v.iter().zip(u).flat_map(|(v, u)| [*v, *u]).collect()
}

/// Rotates a frame clockwise by the sensor orientation so it displays upright.
pub fn rotate_frame(frame: RgbaImage, degrees: i32) -> RgbaImage {
    match degrees.rem_euclid(360) {
        90 => rotate90(&frame),
        180 => rotate180(&frame),
        270 => rotate270(&frame),
        _ => frame,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nv21_grey_decodes_to_grey() {
        // Y=128, U=V=128 is mid grey
        let data = vec![128u8; 4 * 2 + 4];
        let img = decode_yuv420sp(&data, 4, 2).unwrap();
        assert_eq!(img.dimensions(), (4, 2));
        for p in img.pixels() {
            assert_eq!(p.0[0], p.0[1]);
            assert_eq!(p.0[1], p.0[2]);
            assert_eq!(p.0[3], 255);
            assert!((128..=134).contains(&p.0[0]), "{:?}", p);
        }
    }

    #[test]
    fn nv21_black_and_short_buffer() {
        let mut data = vec![0u8; 2 * 2];
        data.extend_from_slice(&[128, 128]);
        let img = decode_yuv420sp(&data, 2, 2).unwrap();
        assert!(img.pixels().all(|p| p.0 == [0, 0, 0, 255]));

        assert!(decode_yuv420sp(&[0; 5], 2, 2).is_none());
    }

    #[test]
    fn nv21_odd_dimensions_are_rejected() {
        assert!(decode_yuv420sp(&[128; 9], 3, 2).is_none());
        assert!(decode_yuv420sp(&[128; 64], 2, 3).is_none());
    }

    #[test]
    fn bgra_swaps_red_and_blue() {
        let img = bgra_to_rgba(&[1, 2, 3, 4, 5, 6, 7, 8], 2, 1).unwrap();
        assert_eq!(img.as_raw(), &vec![3, 2, 1, 4, 7, 6, 5, 8]);
        assert!(bgra_to_rgba(&[1, 2, 3, 4], 2, 1).is_none());
    }

    #[test]
    fn compact_rows_strips_padding() {
        let plane = [1, 2, 0, 0, 3, 4, 0, 0];
        assert_eq!(compact_rows(&plane, 2, 4, 2), vec![1, 2, 3, 4]);
        assert_eq!(compact_rows(&[1, 2, 3, 4], 2, 2, 2), vec![1, 2, 3, 4]);
        // last row of an NDK plane is often shorter than the stride
        assert_eq!(compact_rows(&[1, 2, 0, 0, 3, 4], 2, 4, 2), vec![1, 2, 3, 4]);
    }

    #[test]
    fn planar_chroma_interleaves_v_first() {
        assert_eq!(interleave_vu(&[1, 2], &[9, 8]), vec![9, 1, 8, 2]);
    }

    #[test]
    fn rotation_swaps_dimensions() {
        let frame = RgbaImage::new(4, 2);
        assert_eq!(rotate_frame(frame.clone(), 90).dimensions(), (2, 4));
        assert_eq!(rotate_frame(frame.clone(), 270).dimensions(), (2, 4));
        assert_eq!(rotate_frame(frame.clone(), 180).dimensions(), (4, 2));
        assert_eq!(rotate_frame(frame, 0).dimensions(), (4, 2));
    }
}
