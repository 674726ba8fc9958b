//! Area and spatial (horizon-line) gating of raw contour candidates.

use crate::contours::ContourCandidate;
use crate::geometry::BoundingBox;

#[derive(Debug, Clone, Copy)]
pub struct RegionFilterConfig {
    pub min_area: f64,
    pub max_area: f64,
    pub spatial_filter_enabled: bool,
    /// Fraction of frame height above which detections are kept; always in
    /// [0.0, 1.0] once constructed via `new`.
    pub horizon_line_percent: f64,
}

impl RegionFilterConfig {
    /// Clamps `horizon_line_percent` into `[0.0, 1.0]`, warning when the
    /// input required clamping — mirrors the reference detector's startup
    /// validation, which only ever warns rather than rejecting config.
    pub fn new(
        min_area: f64,
        max_area: f64,
        spatial_filter_enabled: bool,
        horizon_line_percent: f64,
    ) -> Self {
        let clamped = if !(0.0..=1.0).contains(&horizon_line_percent) {
            tracing::warn!(
                horizon_line_percent,
                "horizon_line_percent out of range [0.0, 1.0], clamping to valid range"
            );
            horizon_line_percent.clamp(0.0, 1.0)
        } else {
            horizon_line_percent
        };

        Self {
            min_area,
            max_area,
            spatial_filter_enabled,
            horizon_line_percent: clamped,
        }
    }
}

/// Applies the area gate then the horizon-line gate, returning surviving
/// bounding boxes in the order their contours were found.
pub fn filter(
    candidates: &[ContourCandidate],
    frame_height: i32,
    config: &RegionFilterConfig,
) -> Vec<BoundingBox> {
    let horizon_line_y = if config.spatial_filter_enabled {
        (frame_height as f64 * config.horizon_line_percent) as i32
    } else {
        frame_height
    };

    candidates
        .iter()
        .filter(|c| c.area >= config.min_area && c.area <= config.max_area)
        .map(|c| c.bbox)
        .filter(|bbox| {
            let cy = bbox.y + bbox.h / 2;
            cy < horizon_line_y
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(x: i32, y: i32, w: i32, h: i32, area: f64) -> ContourCandidate {
        ContourCandidate {
            bbox: BoundingBox::new(x, y, w, h),
            area,
        }
    }

    #[test]
    fn area_gate_rejects_too_small_and_too_large() {
        let config = RegionFilterConfig::new(10.0, 100.0, false, 0.7);
        let candidates = vec![candidate(0, 0, 5, 5, 5.0), candidate(0, 0, 5, 5, 500.0)];
        assert!(filter(&candidates, 480, &config).is_empty());
    }

    #[test]
    fn horizon_gate_drops_detections_below_line_when_enabled() {
        let config = RegionFilterConfig::new(1.0, 1000.0, true, 0.5);
        // frame_height=480 -> horizon_line_y=240; centroid y=300 is below it.
        let candidates = vec![candidate(0, 290, 10, 20, 50.0)];
        assert!(filter(&candidates, 480, &config).is_empty());
    }

    #[test]
    fn horizon_gate_is_inert_when_disabled() {
        let config = RegionFilterConfig::new(1.0, 1000.0, false, 0.1);
        let candidates = vec![candidate(0, 450, 10, 20, 50.0)];
        assert_eq!(filter(&candidates, 480, &config).len(), 1);
    }

    #[test]
    fn out_of_range_horizon_percent_is_clamped_not_rejected() {
        let config = RegionFilterConfig::new(1.0, 1000.0, true, 1.5);
        assert_eq!(config.horizon_line_percent, 1.0);
        let config = RegionFilterConfig::new(1.0, 1000.0, true, -0.3);
        assert_eq!(config.horizon_line_percent, 0.0);
    }
}
