//! Shared progress counters and the single-flight guard for bulk workflows.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;

const PHASE_IDLE: &str = "idle";
const PHASE_COMPLETED: &str = "completed";
const PHASE_FAILED: &str = "failed";

/// Point-in-time view of the collector, as returned by `status()`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionStatus {
    pub is_collecting: bool,
    pub current_phase: String,
    pub processed_count: u32,
    pub total_count: u32,
    pub progress_percentage: f64,
}

#[derive(Debug)]
struct State {
    collecting: bool,
    /// Bumped whenever a run takes over the counters.
    generation: u64,
    phase: String,
    processed: u32,
    total: u32,
}

impl State {
    fn reset(&mut self, phase: &str) -> u64 {
        self.generation += 1;
        self.phase = phase.to_string();
        self.processed = 0;
        self.total = 0;
        self.generation
    }
}

#[derive(Debug)]
pub(crate) struct Progress {
    state: Mutex<State>,
}

impl Default for Progress {
    fn default() -> Self {
        Self {
            state: Mutex::new(State {
                collecting: false,
                generation: 0,
                phase: PHASE_IDLE.to_string(),
                processed: 0,
                total: 0,
            }),
        }
    }
}

impl Progress {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claims the collecting flag and resets the counters. `None` while
    /// another gated workflow holds it.
    pub(crate) fn try_begin(&self, phase: &str) -> Option<Lease<'_>> {
        let mut state = self.lock();
        if state.collecting {
            return None;
        }
        state.collecting = true;
        let generation = state.reset(phase);
        Some(Lease {
            progress: self,
            gated: true,
            generation: Some(generation),
            finished: false,
        })
    }

    /// Reports through the counters without taking the flag. A lease begun
    /// while a gated workflow runs never writes; one begun while idle writes
    /// only until a later run takes the counters over.
    pub(crate) fn begin_ungated(&self, phase: &str) -> Lease<'_> {
        let mut state = self.lock();
        let generation = if state.collecting {
            None
        } else {
            Some(state.reset(phase))
        };
        Lease {
            progress: self,
            gated: false,
            generation,
            finished: false,
        }
    }

    pub(crate) fn snapshot(&self) -> CollectionStatus {
        let state = self.lock();
        let progress_percentage = if state.total == 0 {
            0.0
        } else {
            (f64::from(state.processed) * 100.0 / f64::from(state.total)).min(100.0)
        };
        CollectionStatus {
            is_collecting: state.collecting,
            current_phase: state.phase.clone(),
            processed_count: state.processed,
            total_count: state.total,
            progress_percentage,
        }
    }
}

/// Handle on the shared counters for one workflow run. Dropping an
/// unfinished lease marks the run failed; dropping a gated lease releases
/// the collecting flag.
#[derive(Debug)]
pub(crate) struct Lease<'a> {
    progress: &'a Progress,
    gated: bool,
    /// Counter generation this lease writes to; `None` never writes.
    generation: Option<u64>,
    finished: bool,
}

impl Lease<'_> {
    /// The counters, if this lease still owns them.
    fn counters(&self) -> Option<MutexGuard<'_, State>> {
        let generation = self.generation?;
        let state = self.progress.lock();
        (state.generation == generation).then_some(state)
    }

    pub(crate) fn set_total(&self, total: usize) {
        if let Some(mut state) = self.counters() {
            state.total = u32::try_from(total).unwrap_or(u32::MAX);
            state.processed = state.processed.min(state.total);
        }
    }

    pub(crate) fn set_phase(&self, phase: impl Into<String>) {
        if let Some(mut state) = self.counters() {
            state.phase = phase.into();
        }
    }

    /// Counts one processed item; never passes the total.
    pub(crate) fn advance(&self) {
        if let Some(mut state) = self.counters() {
            if state.processed < state.total {
                state.processed += 1;
            }
        }
    }

    pub(crate) fn finish(mut self, succeeded: bool) {
        self.finished = true;
        if let Some(mut state) = self.counters() {
            state.phase = if succeeded { PHASE_COMPLETED } else { PHASE_FAILED }.to_string();
        }
    }
}

impl Drop for Lease<'_> {
    fn drop(&mut self) {
        if !self.finished {
            if let Some(mut state) = self.counters() {
                state.phase = PHASE_FAILED.to_string();
            }
        }
        if self.gated {
            self.progress.lock().collecting = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_snapshot_is_zeroed() {
        let status = Progress::default().snapshot();
        assert!(!status.is_collecting);
        assert_eq!(status.current_phase, "idle");
        assert_eq!(status.processed_count, 0);
        assert_eq!(status.total_count, 0);
        assert!(status.progress_percentage.abs() < f64::EPSILON);
    }

    #[test]
    fn second_gated_lease_is_refused() {
        let progress = Progress::default();
        let lease = progress.try_begin("collecting all channels").unwrap();
        assert!(progress.try_begin("updating all channels").is_none());
        assert!(progress.snapshot().is_collecting);

        lease.finish(true);
        assert!(!progress.snapshot().is_collecting);
        assert!(progress.try_begin("again").is_some());
    }

    #[test]
    fn processed_never_passes_total() {
        let progress = Progress::default();
        let lease = progress.try_begin("collecting").unwrap();
        lease.set_total(2);
        for _ in 0..5 {
            lease.advance();
        }

        let status = progress.snapshot();
        assert_eq!(status.processed_count, 2);
        assert!((status.progress_percentage - 100.0).abs() < f64::EPSILON);

        lease.set_total(1);
        assert_eq!(progress.snapshot().processed_count, 1);
    }

    #[test]
    fn percentage_tracks_ratio() {
        let progress = Progress::default();
        let lease = progress.try_begin("collecting").unwrap();
        lease.set_total(4);
        lease.advance();
        assert!((progress.snapshot().progress_percentage - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn dropped_lease_marks_failure_and_releases_flag() {
        let progress = Progress::default();
        {
            let _lease = progress.try_begin("collecting").unwrap();
        }
        let status = progress.snapshot();
        assert!(!status.is_collecting);
        assert_eq!(status.current_phase, "failed");
    }

    #[test]
    fn ungated_lease_leaves_running_counters_alone() {
        let progress = Progress::default();
        let gated = progress.try_begin("collecting all channels").unwrap();
        gated.set_total(3);
        gated.advance();

        let side = progress.begin_ungated("processing unprocessed videos");
        side.set_total(10);
        side.advance();
        side.finish(true);

        let status = progress.snapshot();
        assert!(status.is_collecting);
        assert_eq!(status.current_phase, "collecting all channels");
        assert_eq!(status.processed_count, 1);
        assert_eq!(status.total_count, 3);
        drop(gated);
    }

    #[test]
    fn ungated_lease_reports_when_idle() {
        let progress = Progress::default();
        let side = progress.begin_ungated("processing unprocessed videos");
        side.set_total(2);
        side.advance();

        let status = progress.snapshot();
        assert!(!status.is_collecting);
        assert_eq!(status.processed_count, 1);
        side.finish(true);
        assert_eq!(progress.snapshot().current_phase, "completed");
    }

    #[test]
    fn gated_run_takes_counters_from_idle_side_run() {
        let progress = Progress::default();
        let side = progress.begin_ungated("processing unprocessed videos");
        side.set_total(1);

        let gated = progress.try_begin("collecting all channels").unwrap();
        gated.set_total(1);
        side.advance();
        side.set_phase("stale");
        side.finish(true);

        let status = progress.snapshot();
        assert!(status.is_collecting);
        assert_eq!(status.current_phase, "collecting all channels");
        assert_eq!((status.processed_count, status.total_count), (0, 1));

        gated.advance();
        gated.finish(true);
        let status = progress.snapshot();
        assert!(!status.is_collecting);
        assert_eq!(status.current_phase, "completed");
        assert_eq!(status.processed_count, 1);
    }

    #[test]
    fn superseded_side_run_drop_leaves_phase_alone() {
        let progress = Progress::default();
        let older = progress.begin_ungated("collecting channel: a");
        let newer = progress.begin_ungated("collecting channel: b");
        drop(older);

        assert_eq!(progress.snapshot().current_phase, "collecting channel: b");
        newer.finish(true);
        assert_eq!(progress.snapshot().current_phase, "completed");
    }

    #[test]
    fn status_serializes_camel_case() {
        let json = serde_json::to_value(Progress::default().snapshot()).unwrap();
        assert_eq!(json["isCollecting"], false);
        assert_eq!(json["currentPhase"], "idle");
        assert_eq!(json["progressPercentage"], 0.0);
    }
}
