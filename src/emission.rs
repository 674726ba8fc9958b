//! Per-frame and summary output, either as periodic CLI progress lines or
//! as an NDJSON stream for a calling process (one JSON object per line,
//! flushed immediately, matching the reference IPC mode's
//! `print(json.dumps(...), flush=True)` shape).

use std::io::Write;

use serde::Serialize;

use crate::geometry::BoundingBox;

#[derive(Debug, Clone, Serialize)]
pub struct TrackedObject {
    pub id: u64,
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
    pub cx: i32,
    pub cy: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct FrameStats {
    pub current_birds: usize,
    pub total_birds: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FrameData {
    pub frame: u64,
    pub objects: Vec<TrackedObject>,
    pub stats: FrameStats,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessingStats {
    pub total_frames: i64,
    pub processed_frames: u64,
    pub max_simultaneous_birds: usize,
    pub total_unique_birds: u64,
    pub fps: f64,
    pub width: i32,
    pub height: i32,
}

/// Builds tracked-object records for a frame, resolving each confirmed
/// track's bounding box through the detection-index map rather than
/// re-deriving it, since a track with no match this frame has no box to
/// report.
pub fn build_frame_data(
    frame_num: u64,
    ids_in_order: &[u64],
    detection_index: &std::collections::HashMap<u64, usize>,
    boxes: &[BoundingBox],
    current_birds: usize,
    total_birds: u64,
) -> FrameData {
    let mut objects = Vec::new();
    for &id in ids_in_order {
        if let Some(&idx) = detection_index.get(&id) {
            if let Some(bbox) = boxes.get(idx) {
                let (cx, cy) = bbox.centroid();
                objects.push(TrackedObject {
                    id,
                    x: bbox.x,
                    y: bbox.y,
                    w: bbox.w,
                    h: bbox.h,
                    cx,
                    cy,
                });
            }
        }
    }
    FrameData {
        frame: frame_num,
        objects,
        stats: FrameStats {
            current_birds,
            total_birds,
        },
    }
}

/// Emits a single NDJSON line wrapped in `{"type": "frame_data", "data": ...}`
/// and flushes — the consumer on the other end of the pipe reads line by
/// line and must see each frame promptly, not buffered.
pub fn emit_frame_data<W: Write>(mut out: W, data: &FrameData) -> std::io::Result<()> {
    let envelope = serde_json::json!({ "type": "frame_data", "data": data });
    serde_json::to_writer(&mut out, &envelope)?;
    writeln!(out)?;
    out.flush()
}

pub fn emit_started<W: Write>(mut out: W) -> std::io::Result<()> {
    writeln!(out, "{}", serde_json::json!({ "type": "started" }))?;
    out.flush()
}

pub fn emit_stopped<W: Write>(mut out: W) -> std::io::Result<()> {
    writeln!(out, "{}", serde_json::json!({ "type": "stopped" }))?;
    out.flush()
}

pub fn emit_completed<W: Write>(mut out: W, results: &ProcessingStats) -> std::io::Result<()> {
    let envelope = serde_json::json!({ "type": "completed", "results": results });
    serde_json::to_writer(&mut out, &envelope)?;
    writeln!(out)?;
    out.flush()
}

pub fn emit_error<W: Write>(mut out: W, message: &str) -> std::io::Result<()> {
    writeln!(
        out,
        "{}",
        serde_json::json!({ "type": "error", "message": message })
    )?;
    out.flush()
}

/// Prints a CLI progress line every `interval` frames, matching the
/// reference's "print every 30 frames" cadence.
pub fn maybe_print_progress(frame_num: u64, stats: &FrameStats, interval: u64) {
    if interval > 0 && frame_num % interval == 0 {
        println!(
            "Frame {frame_num}: Current={}, Total={}",
            stats.current_birds, stats.total_birds
        );
    }
}

pub fn print_summary(results: &ProcessingStats) {
    println!();
    println!("{}", "=".repeat(60));
    println!("Processing Complete!");
    println!("{}", "=".repeat(60));
    println!("Total Frames:           {}", results.total_frames);
    println!("Processed Frames:       {}", results.processed_frames);
    println!(
        "Max Simultaneous Birds: {}",
        results.max_simultaneous_birds
    );
    println!("Total Unique Birds:     {}", results.total_unique_birds);
    println!("Resolution:             {}x{}", results.width, results.height);
    println!("FPS:                    {:.2}", results.fps);
    println!("{}", "=".repeat(60));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_frame_data_skips_unmatched_confirmed_tracks() {
        let mut detection_index = std::collections::HashMap::new();
        detection_index.insert(1u64, 0usize);
        let boxes = vec![BoundingBox::new(10, 10, 5, 5)];
        let data = build_frame_data(3, &[1, 2], &detection_index, &boxes, 2, 2);
        assert_eq!(data.objects.len(), 1);
        assert_eq!(data.objects[0].id, 1);
    }

    #[test]
    fn emit_frame_data_writes_single_flushed_line() {
        let data = build_frame_data(1, &[], &Default::default(), &[], 0, 0);
        let mut buf = Vec::new();
        emit_frame_data(&mut buf, &data).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.matches('\n').count(), 1);
        let parsed: serde_json::Value = serde_json::from_str(text.trim_end()).unwrap();
        assert_eq!(parsed["type"], "frame_data");
    }
}
