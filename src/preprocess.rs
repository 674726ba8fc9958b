//! Frame preprocessing: Gaussian blur to knock down sensor noise before
//! background subtraction sees the frame.

use opencv::core::{Mat, Size};
use opencv::imgproc;

/// Blurs `frame` with a `kernel_size x kernel_size` Gaussian kernel (sigma
/// derived automatically from the kernel size, matching `cv2.GaussianBlur`
/// called with `sigmaX=0`).
pub fn blur(frame: &Mat, kernel_size: i32) -> opencv::Result<Mat> {
    let mut out = Mat::default();
    imgproc::gaussian_blur(
        frame,
        &mut out,
        Size::new(kernel_size, kernel_size),
        0.0,
        0.0,
        opencv::core::BORDER_DEFAULT,
    )?;
    Ok(out)
}
