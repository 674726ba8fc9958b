//! Contour extraction from a cleaned binary mask.

use opencv::core::{Mat, Point, Vector};
use opencv::imgproc::{self, CHAIN_APPROX_SIMPLE, RETR_EXTERNAL};

use crate::geometry::BoundingBox;

/// A single extracted contour's bounding box and pixel area, kept together
/// since the region filter needs both and re-deriving the box later would
/// mean walking the contour twice.
pub struct ContourCandidate {
    pub bbox: BoundingBox,
    pub area: f64,
}

/// Finds external contours only (nested holes are not separate objects for
/// this pipeline) with simple chain approximation.
pub fn find(mask: &Mat) -> opencv::Result<Vec<ContourCandidate>> {
    let mut contours: Vector<Vector<Point>> = Vector::new();
    imgproc::find_contours(
        mask,
        &mut contours,
        RETR_EXTERNAL,
        CHAIN_APPROX_SIMPLE,
        Point::new(0, 0),
    )?;

    let mut out = Vec::with_capacity(contours.len());
    for contour in contours.iter() {
        let area = imgproc::contour_area(&contour, false)?;
        let rect = imgproc::bounding_rect(&contour)?;
        out.push(ContourCandidate {
            bbox: BoundingBox::new(rect.x, rect.y, rect.width, rect.height),
            area,
        });
    }
    Ok(out)
}
