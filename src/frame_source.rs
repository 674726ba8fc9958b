//! Frame source adapter over OpenCV `VideoCapture`.
//!
//! Unlike a live RTSP camera, a file or local device source here is treated
//! as a finite stream: a failed/empty read past the first frame means
//! end-of-stream, not a dropped connection to reconnect to.

use opencv::core::Mat;
use opencv::prelude::*;
use opencv::videoio::{VideoCapture, CAP_ANY, CAP_PROP_FPS, CAP_PROP_FRAME_COUNT, CAP_PROP_FRAME_HEIGHT, CAP_PROP_FRAME_WIDTH};
use tracing::info;

use crate::error::PipelineError;

pub struct FrameSource {
    cap: VideoCapture,
    pub width: i32,
    pub height: i32,
    pub fps: f64,
    pub total_frames: i64,
    frame_idx: u64,
}

impl FrameSource {
    /// Opens `input` (a file path, or a numeric string for a local device
    /// index) with the default backend. A source that can't be opened is
    /// fatal per the configuration-vs-I/O error split: it's reported to the
    /// sink and the pipeline exits rather than retrying.
    pub fn open(input: &str) -> Result<Self, PipelineError> {
        let mut cap = if let Ok(index) = input.parse::<i32>() {
            VideoCapture::new(index, CAP_ANY)?
        } else {
            VideoCapture::from_file(input, CAP_ANY)?
        };

        if !cap.is_opened()? {
            return Err(PipelineError::SourceUnavailable(input.to_string()));
        }

        let width = cap.get(CAP_PROP_FRAME_WIDTH as i32)? as i32;
        let height = cap.get(CAP_PROP_FRAME_HEIGHT as i32)? as i32;
        let fps = cap.get(CAP_PROP_FPS as i32).unwrap_or(0.0);
        let total_frames = cap.get(CAP_PROP_FRAME_COUNT as i32).unwrap_or(0.0) as i64;

        info!(input, width, height, fps, total_frames, "frame source opened");

        Ok(Self {
            cap,
            width,
            height,
            fps,
            total_frames,
            frame_idx: 0,
        })
    }

    /// Reads the next frame. `Ok(None)` marks end-of-stream, which also
    /// covers a mid-stream decode failure: the pipeline finalizes cleanly
    /// rather than treating it as fatal.
    pub fn next_frame(&mut self) -> Result<Option<Mat>, PipelineError> {
        let mut frame = Mat::default();
        if !self.cap.read(&mut frame)? || frame.empty() {
            return Ok(None);
        }
        self.frame_idx += 1;
        Ok(Some(frame))
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_idx
    }
}
