//! Per-frame orchestration: detection through tracking through emission.

use opencv::core::Mat;

use crate::background::BackgroundModel;
use crate::config::AppConfig;
use crate::contours;
use crate::emission::{self, FrameData, ProcessingStats};
use crate::frame_source::FrameSource;
use crate::geometry::BoundingBox;
use crate::morphology::MorphologyFilter;
use crate::preprocess;
use crate::region_filter::{self, RegionFilterConfig};
use crate::tracker::Tracker;

pub struct Detector {
    background: BackgroundModel,
    morphology: MorphologyFilter,
    region_filter: RegionFilterConfig,
    blur_kernel_size: i32,
}

impl Detector {
    pub fn new(config: &crate::config::DetectionConfig, spatial: &crate::config::SpatialFilterConfig) -> opencv::Result<Self> {
        Ok(Self {
            background: BackgroundModel::new(config.mog2_history, config.mog2_var_threshold)?,
            morphology: MorphologyFilter::new(config.morph_kernel_size, config.morph_iterations)?,
            region_filter: RegionFilterConfig::new(
                config.min_contour_area,
                config.max_contour_area,
                spatial.enabled,
                spatial.horizon_line_percent,
            ),
            blur_kernel_size: config.blur_kernel_size,
        })
    }

    /// Preprocess -> subtract -> morphology -> contours -> region filter.
    pub fn detect(&mut self, frame: &Mat) -> opencv::Result<Vec<BoundingBox>> {
        let frame_height = frame.rows();
        let blurred = preprocess::blur(frame, self.blur_kernel_size)?;
        let fg_mask = self.background.apply(&blurred)?;
        let cleaned = self.morphology.apply(&fg_mask)?;
        let candidates = contours::find(&cleaned)?;
        Ok(region_filter::filter(&candidates, frame_height, &self.region_filter))
    }
}

pub fn centroids_of(boxes: &[BoundingBox]) -> Vec<(i32, i32)> {
    boxes.iter().map(|b| b.centroid()).collect()
}

/// Drives a whole video source through detection and tracking, invoking
/// `on_frame` with each frame's record as it's produced. `should_stop` is
/// polled once per frame boundary so an external cancellation request (the
/// IPC `stop` command) is observed promptly without the loop blocking past
/// the frame currently in flight; a CLI-mode caller with nothing to cancel
/// against can pass `|| false`. Returns final summary statistics.
pub fn run<F: FnMut(FrameData)>(
    source: &mut FrameSource,
    detector: &mut Detector,
    tracker: &mut Tracker,
    mut should_stop: impl FnMut() -> bool,
    mut on_frame: F,
) -> anyhow::Result<ProcessingStats> {
    let mut stats = ProcessingStats {
        total_frames: source.total_frames,
        fps: source.fps,
        width: source.width,
        height: source.height,
        ..Default::default()
    };

    let mut frame_num = 0u64;
    while !should_stop() {
        let Some(frame) = source.next_frame()? else {
            break;
        };
        frame_num += 1;

        let boxes = detector.detect(&frame)?;
        let centroids = centroids_of(&boxes);
        let update = tracker.update(&centroids);

        stats.processed_frames = frame_num;
        stats.max_simultaneous_birds = stats.max_simultaneous_birds.max(update.current_birds);
        stats.total_unique_birds = update.total_birds;

        let data = emission::build_frame_data(
            frame_num,
            &update.ids_in_order,
            &update.detection_index,
            &boxes,
            update.current_birds,
            update.total_birds,
        );
        on_frame(data);
    }

    Ok(stats)
}
