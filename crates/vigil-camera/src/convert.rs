use crate::Frame;

/// Resize an RGB8 frame with nearest-neighbor sampling.
///
/// Deterministic: the same input always maps to the same output. Used by the
/// pipeline to bring frames to the model input size before inference. Returns
/// a clone when the target size equals the source size.
pub fn resize_rgb(frame: &Frame, width: u32, height: u32) -> Frame {
    if frame.width() == width && frame.height() == height {
        return frame.clone();
    }

    let src = frame.data();
    let src_w = frame.width() as usize;
    let src_h = frame.height() as usize;
    let dst_w = width as usize;
    let dst_h = height as usize;

    let mut dst = Vec::with_capacity(dst_w * dst_h * 3);
    for y in 0..dst_h {
        let src_y = y * src_h / dst_h;
        for x in 0..dst_w {
            let src_x = x * src_w / dst_w;
            let idx = (src_y * src_w + src_x) * 3;
            dst.extend_from_slice(&src[idx..idx + 3]);
        }
    }

    // Dimensions are validated non-zero by the caller's Frame, so this
    // construction cannot fail.
    Frame::rgb8(width, height, dst).unwrap_or_else(|_| frame.clone())
}
