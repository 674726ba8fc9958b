//! Morphological cleanup of the foreground mask: open then close, with a
//! configurable elliptical kernel and iteration count — unlike the fixed
//! 5x5/close-then-open pass used elsewhere, detection here needs the order
//! the reference detector uses (open first to drop speckle noise, then
//! close to stitch a bird's body back into one blob).

use opencv::core::{Mat, Point, Scalar, Size, BORDER_DEFAULT};
use opencv::imgproc::{self, MORPH_CLOSE, MORPH_ELLIPSE, MORPH_OPEN};

pub struct MorphologyFilter {
    kernel: Mat,
    iterations: i32,
}

impl MorphologyFilter {
    pub fn new(kernel_size: i32, iterations: i32) -> opencv::Result<Self> {
        let kernel = imgproc::get_structuring_element(
            MORPH_ELLIPSE,
            Size::new(kernel_size, kernel_size),
            Point::new(-1, -1),
        )?;
        Ok(Self { kernel, iterations })
    }

    /// Opening (erode then dilate) removes small noise; closing (dilate
    /// then erode) fills small gaps left inside a real blob.
    pub fn apply(&self, mask: &Mat) -> opencv::Result<Mat> {
        let mut opened = Mat::default();
        imgproc::morphology_ex(
            mask,
            &mut opened,
            MORPH_OPEN,
            &self.kernel,
            Point::new(-1, -1),
            self.iterations,
            BORDER_DEFAULT,
            Scalar::default(),
        )?;

        let mut closed = Mat::default();
        imgproc::morphology_ex(
            &opened,
            &mut closed,
            MORPH_CLOSE,
            &self.kernel,
            Point::new(-1, -1),
            self.iterations,
            BORDER_DEFAULT,
            Scalar::default(),
        )?;

        Ok(closed)
    }
}
