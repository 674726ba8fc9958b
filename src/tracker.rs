//! Two-phase centroid tracker: probationary candidates promoted to
//! confirmed identities once they show enough movement evidence.
//!
//! Grounded on the reference `CentroidTracker.update` four-phase structure:
//! confirmed match, probationary match + promotion, unconditional
//! probationary aging, spawn. Phase C (aging) is split out as an
//! independent pass per frame regardless of whether Phase B ran — the
//! reference source only aged probationary candidates inside the matching
//! branch, which leaks stale candidates when no detections remain to match
//! against.

use std::collections::HashMap;

use crate::assignment;
use crate::trajectory::Trajectory;

const PROBATIONARY_MAX_DISAPPEARED: u32 = 5;
const TRAJECTORY_CAPACITY: usize = 30;

#[derive(Debug, Clone, Copy)]
pub struct TemporalFilterConfig {
    pub enabled: bool,
    pub min_confirm_frames: u32,
    pub min_move_distance: f64,
}

struct ConfirmedTrack {
    id: u64,
    position: (i32, i32),
    miss_count: u32,
    trajectory: Trajectory,
}

struct ProbationaryTrack {
    pid: u64,
    position: (i32, i32),
    initial_position: (i32, i32),
    frames_observed: u32,
    miss_count: u32,
    path: Trajectory,
}

/// Result of a single `update()` call: which confirmed ids are present (in
/// insertion/ascending-id order), which of those were matched to a
/// detection index this frame, and running totals.
pub struct FrameUpdate {
    pub ids_in_order: Vec<u64>,
    pub detection_index: HashMap<u64, usize>,
    pub current_birds: usize,
    pub total_birds: u64,
}

pub struct Tracker {
    next_id: u64,
    next_pid: u64,
    total_birds_seen: u64,
    confirmed: Vec<ConfirmedTrack>,
    probationary: Vec<ProbationaryTrack>,
    max_disappeared: u32,
    max_distance: f64,
    temporal_filter: TemporalFilterConfig,
}

impl Tracker {
    pub fn new(max_disappeared: u32, max_distance: f64, temporal_filter: TemporalFilterConfig) -> Self {
        Self {
            next_id: 0,
            next_pid: 0,
            total_birds_seen: 0,
            confirmed: Vec::new(),
            probationary: Vec::new(),
            max_disappeared,
            max_distance,
            temporal_filter,
        }
    }

    fn register_confirmed(&mut self, position: (i32, i32)) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.total_birds_seen += 1;
        self.confirmed.push(ConfirmedTrack {
            id,
            position,
            miss_count: 0,
            trajectory: Trajectory::starting_at(TRAJECTORY_CAPACITY, position),
        });
        id
    }

    pub fn update(&mut self, centroids: &[(i32, i32)]) -> FrameUpdate {
        if self.temporal_filter.enabled {
            self.update_with_temporal_filter(centroids)
        } else {
            self.update_legacy(centroids)
        }
    }

    /// Phase A alone; unmatched detections immediately become confirmed
    /// tracks. Retained for backwards compatibility when temporal
    /// filtering is disabled.
    fn update_legacy(&mut self, centroids: &[(i32, i32)]) -> FrameUpdate {
        let mut detection_index = HashMap::new();

        if centroids.is_empty() {
            self.age_confirmed(&[]);
            return self.snapshot(detection_index);
        }

        let row_positions: Vec<(i32, i32)> = self.confirmed.iter().map(|t| t.position).collect();
        let pairs = assignment::solve(&row_positions, centroids, self.max_distance);
        let mut used_cols = vec![false; centroids.len()];
        let mut matched_rows = vec![false; self.confirmed.len()];

        for (row, col) in pairs {
            let track = &mut self.confirmed[row];
            track.position = centroids[col];
            track.miss_count = 0;
            track.trajectory.push(centroids[col]);
            detection_index.insert(track.id, col);
            matched_rows[row] = true;
            used_cols[col] = true;
        }

        self.age_confirmed(&matched_rows);

        for (col, used) in used_cols.iter().enumerate() {
            if !used {
                let id = self.register_confirmed(centroids[col]);
                detection_index.insert(id, col);
            }
        }

        self.snapshot(detection_index)
    }

    fn update_with_temporal_filter(&mut self, centroids: &[(i32, i32)]) -> FrameUpdate {
        let mut detection_index = HashMap::new();

        if centroids.is_empty() {
            self.age_confirmed(&[]);
            self.age_all_probationary(&[]);
            return self.snapshot(detection_index);
        }

        // Phase A: confirmed tracks vs full detection set.
        let row_positions: Vec<(i32, i32)> = self.confirmed.iter().map(|t| t.position).collect();
        let phase_a_pairs = assignment::solve(&row_positions, centroids, self.max_distance);
        let mut used_cols = vec![false; centroids.len()];
        let mut matched_rows = vec![false; self.confirmed.len()];

        for (row, col) in phase_a_pairs {
            let track = &mut self.confirmed[row];
            track.position = centroids[col];
            track.miss_count = 0;
            track.trajectory.push(centroids[col]);
            detection_index.insert(track.id, col);
            matched_rows[row] = true;
            used_cols[col] = true;
        }
        self.age_confirmed(&matched_rows);

        // Remaining detection indices, ascending — load-bearing ordering.
        let remaining: Vec<usize> = used_cols
            .iter()
            .enumerate()
            .filter(|(_, used)| !**used)
            .map(|(idx, _)| idx)
            .collect();

        // Phase B: probationary tracks vs remaining detections.
        let mut matched_pids = Vec::new();
        if !self.probationary.is_empty() && !remaining.is_empty() {
            let prob_positions: Vec<(i32, i32)> =
                self.probationary.iter().map(|p| p.position).collect();
            let remaining_positions: Vec<(i32, i32)> =
                remaining.iter().map(|&idx| centroids[idx]).collect();

            let phase_b_pairs = assignment::solve(&prob_positions, &remaining_positions, self.max_distance);

            let mut to_remove = Vec::new();
            for (prow, pcol) in phase_b_pairs {
                let actual_idx = remaining[pcol];
                used_cols[actual_idx] = true;

                let prob = &mut self.probationary[prow];
                prob.position = centroids[actual_idx];
                prob.miss_count = 0;
                prob.frames_observed += 1;
                prob.path.push(prob.position);
                matched_pids.push(prob.pid);

                let cumulative = prob.path.cumulative_length();
                let net = crate::geometry::euclidean(prob.position, prob.initial_position);
                let confirm_frames = self.temporal_filter.min_confirm_frames;
                let move_threshold = self.temporal_filter.min_move_distance;

                if prob.frames_observed >= confirm_frames
                    && (cumulative >= move_threshold || net >= move_threshold)
                {
                    let position = prob.position;
                    let id = self.register_confirmed(position);
                    detection_index.insert(id, actual_idx);
                    to_remove.push(prow);
                } else if prob.frames_observed >= confirm_frames {
                    to_remove.push(prow);
                }
            }
            to_remove.sort_unstable();
            to_remove.dedup();
            for &idx in to_remove.iter().rev() {
                self.probationary.remove(idx);
            }
        }

        // Phase C: age every probationary candidate not matched this frame.
        self.age_all_probationary(&matched_pids);

        // Phase D: spawn new probationary candidates for unclaimed detections.
        for (col, used) in used_cols.iter().enumerate() {
            if !used {
                self.register_probationary(centroids[col]);
            }
        }

        self.snapshot(detection_index)
    }

    fn register_probationary(&mut self, position: (i32, i32)) {
        let pid = self.next_pid;
        self.next_pid += 1;
        self.probationary.push(ProbationaryTrack {
            pid,
            position,
            initial_position: position,
            frames_observed: 1,
            miss_count: 0,
            path: Trajectory::starting_at(self.temporal_filter.min_confirm_frames as usize, position),
        });
    }

    /// Ages unmatched confirmed tracks and deregisters past `max_disappeared`.
    /// `matched_rows[i]` (when non-empty) marks which confirmed tracks were
    /// matched this frame, indexed against `self.confirmed`'s order *before*
    /// this call; an empty slice means "none were matched" (the
    /// no-detections case). Uses `retain_mut` with an external counter
    /// rather than removing by live index while reading `matched_rows` —
    /// removing in place while indexing the same position shifts every
    /// later track down one slot, so a dropped track's stale `false` would
    /// get attributed to the track that replaces it.
    fn age_confirmed(&mut self, matched_rows: &[bool]) {
        let max_disappeared = self.max_disappeared;
        let mut i = 0;
        self.confirmed.retain_mut(|track| {
            let was_matched = matched_rows.get(i).copied().unwrap_or(false);
            i += 1;
            if !was_matched {
                track.miss_count += 1;
            }
            track.miss_count <= max_disappeared
        });
    }

    /// Ages every probationary candidate absent from `matched_pids`,
    /// dropping those past the fixed 5-frame threshold. Runs unconditionally
    /// every frame, independent of whether Phase B matched anything.
    fn age_all_probationary(&mut self, matched_pids: &[u64]) {
        self.probationary.retain_mut(|prob| {
            if !matched_pids.contains(&prob.pid) {
                prob.miss_count += 1;
            }
            prob.miss_count <= PROBATIONARY_MAX_DISAPPEARED
        });
    }

    /// Recent centroid history for a confirmed track, newest last, for
    /// downstream trail rendering. `None` if `id` isn't currently confirmed.
    pub fn trajectory(&self, id: u64) -> Option<Vec<(i32, i32)>> {
        self.confirmed
            .iter()
            .find(|t| t.id == id)
            .map(|t| t.trajectory.as_slice_points())
    }

    fn snapshot(&self, detection_index: HashMap<u64, usize>) -> FrameUpdate {
        FrameUpdate {
            ids_in_order: self.confirmed.iter().map(|t| t.id).collect(),
            detection_index,
            current_birds: self.confirmed.len(),
            total_birds: self.total_birds_seen,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(enabled: bool, min_confirm_frames: u32, min_move_distance: f64) -> TemporalFilterConfig {
        TemporalFilterConfig {
            enabled,
            min_confirm_frames,
            min_move_distance,
        }
    }

    #[test]
    fn stationary_blob_never_confirms() {
        let mut tracker = Tracker::new(30, 100.0, filter(true, 5, 50.0));
        let mut last = FrameUpdate {
            ids_in_order: vec![],
            detection_index: Default::default(),
            current_birds: 0,
            total_birds: 0,
        };
        for _ in 0..10 {
            last = tracker.update(&[(100, 100)]);
        }
        assert_eq!(last.total_birds, 0);
        assert_eq!(last.current_birds, 0);
    }

    #[test]
    fn linear_mover_promotes_once_threshold_crossed() {
        // 20 frames, centroid walking linearly from (50,50) to (200,50):
        // ~7.9 px/step. Promotion requires frames_observed >= 5 *and*
        // cumulative/net displacement >= 50, so it cannot fire before the
        // step count crosses both gates simultaneously.
        let mut tracker = Tracker::new(30, 100.0, filter(true, 5, 50.0));
        let step = 150.0 / 19.0;
        let mut promoted_frame = None;
        for frame in 1..=20 {
            let cx = 50.0 + (frame - 1) as f64 * step;
            let update = tracker.update(&[(cx.round() as i32, 50)]);
            if promoted_frame.is_none() && update.total_birds == 1 {
                promoted_frame = Some(frame);
            }
        }
        let expected = (1..=20)
            .find(|&frame| frame >= 5 && (frame - 1) as f64 * step >= 50.0)
            .unwrap();
        assert_eq!(promoted_frame, Some(expected));
        assert!(promoted_frame.unwrap() >= 5);
    }

    #[test]
    fn two_crossing_tracks_do_not_swap_ids() {
        // Tracks cross horizontally but stay vertically offset so the
        // between-track distance never drops below 30px (per the spec's
        // concrete scenario) while each track's own frame-to-frame step is
        // only 10px — keeping the correct assignment unambiguously cheaper
        // than a swap.
        let mut tracker = Tracker::new(30, 50.0, filter(false, 0, 0.0));
        let first = tracker.update(&[(0, 0), (90, 40)]);
        assert_eq!(first.total_birds, 2);
        let id_a = first.ids_in_order[0];
        let id_b = first.ids_in_order[1];
        let mut ids: Vec<u64> = first.ids_in_order.clone();
        ids.sort_unstable();
        for step in 1..10 {
            let a = (step * 10, 0);
            let b = (90 - step * 10, 40);
            let update = tracker.update(&[a, b]);
            assert_eq!(update.total_birds, 2);
            let mut ids_now: Vec<u64> = update.ids_in_order.clone();
            ids_now.sort_unstable();
            assert_eq!(ids_now, ids, "id set must persist through the crossing");
            assert_eq!(
                update.detection_index.get(&id_a),
                Some(&0),
                "id_a must stay matched to the a-side detection, not swap to b"
            );
            assert_eq!(
                update.detection_index.get(&id_b),
                Some(&1),
                "id_b must stay matched to the b-side detection, not swap to a"
            );
        }
    }

    #[test]
    fn teleport_beyond_max_distance_spawns_new_probationary_not_reusing_id() {
        let mut tracker = Tracker::new(30, 100.0, filter(false, 0, 0.0));
        let first = tracker.update(&[(10, 10)]);
        assert_eq!(first.total_birds, 1);
        let second = tracker.update(&[(500, 500)]);
        assert_eq!(second.total_birds, 2);
    }

    #[test]
    fn flicker_below_confirm_frames_never_issues_id() {
        let mut tracker = Tracker::new(30, 100.0, filter(true, 5, 50.0));
        for _ in 0..3 {
            tracker.update(&[(20, 20)]);
        }
        let last = tracker.update(&[]);
        assert_eq!(last.total_birds, 0);
    }

    #[test]
    fn aging_leak_guard_drops_unmatched_probationary_by_frame_six() {
        let mut tracker = Tracker::new(30, 100.0, filter(true, 15, 50.0));
        tracker.update(&[(20, 20)]);
        let mut last = FrameUpdate {
            ids_in_order: vec![],
            detection_index: Default::default(),
            current_birds: 0,
            total_birds: 0,
        };
        for _ in 0..10 {
            last = tracker.update(&[]);
        }
        assert_eq!(last.total_birds, 0);
        assert_eq!(last.current_birds, 0);
    }

    #[test]
    fn trajectory_reports_recent_history_for_confirmed_tracks_only() {
        let mut tracker = Tracker::new(30, 100.0, filter(false, 0, 0.0));
        let first = tracker.update(&[(0, 0)]);
        let id = first.ids_in_order[0];
        tracker.update(&[(10, 0)]);
        tracker.update(&[(20, 0)]);
        assert_eq!(
            tracker.trajectory(id),
            Some(vec![(0, 0), (10, 0), (20, 0)])
        );
        assert_eq!(tracker.trajectory(id + 1), None);
    }

    #[test]
    fn aging_does_not_corrupt_a_later_matched_track_when_an_earlier_one_is_deregistered() {
        // Regression for an index-shift bug: two confirmed tracks, the
        // first (lower vec index) ages out and is removed in the same
        // `age_confirmed` call in which the second was matched and had its
        // miss_count reset to 0. The second must not be spuriously aged by
        // one slot's worth of the just-removed track's unmatched status.
        let mut tracker = Tracker::new(0, 50.0, filter(false, 0, 0.0));
        let first = tracker.update(&[(0, 0), (500, 500)]);
        assert_eq!(first.total_birds, 2);
        let id_b = first.ids_in_order[1];

        let second = tracker.update(&[(500, 500)]);
        assert_eq!(second.current_birds, 1, "only the unmatched track should age out");
        assert_eq!(second.total_birds, 2);
        assert_eq!(second.detection_index.get(&id_b), Some(&0));

        let third = tracker.update(&[(500, 500)]);
        assert_eq!(third.current_birds, 1, "the surviving track's miss_count must still be 0");
    }

    #[test]
    fn empty_stream_after_prior_state_issues_no_new_ids() {
        let mut tracker = Tracker::new(3, 100.0, filter(false, 0, 0.0));
        tracker.update(&[(1, 1)]);
        let mut last = tracker.update(&[]);
        for _ in 0..5 {
            last = tracker.update(&[]);
        }
        assert_eq!(last.current_birds, 0);
        assert_eq!(last.total_birds, 1);
    }
}
