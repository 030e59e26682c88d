//! Stage counters and timings for the ETL run
//!
//! Metrics go through the `metrics` facade. No exporter is installed by this crate,
//! so every call is a no-op unless the embedding process sets a recorder.

use std::time::Instant;

pub const ROWS_EXTRACTED: &str = "etl_rows_extracted_total";
pub const ROWS_DEDUPLICATED: &str = "etl_rows_deduplicated_total";
pub const ROWS_FILTERED: &str = "etl_rows_filtered_total";
pub const ROWS_LOADED: &str = "etl_rows_loaded_total";
pub const LOAD_FAILURES: &str = "etl_load_failures_total";
pub const VALIDATION_FAILURES: &str = "etl_validation_failures_total";
pub const STAGE_DURATION: &str = "etl_stage_duration_seconds";

/// Records the elapsed time of a pipeline stage when dropped
pub struct TimingGuard {
    start: Instant,
    stage: &'static str,
}

impl TimingGuard {
    pub fn new(stage: &'static str) -> Self {
        Self {
            start: Instant::now(),
            stage,
        }
    }

    /// Seconds elapsed since the guard was created
    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        ::metrics::histogram!(STAGE_DURATION, "stage" => self.stage).record(self.elapsed_secs());
    }
}

/// Start timing `stage`; the duration is recorded when the guard goes out of scope.
pub fn time_stage(stage: &'static str) -> TimingGuard {
    TimingGuard::new(stage)
}

pub fn record_extracted(region: &'static str, rows: usize) {
    ::metrics::counter!(ROWS_EXTRACTED, "region" => region).increment(rows as u64);
}

pub fn record_deduplicated(dropped: usize) {
    ::metrics::counter!(ROWS_DEDUPLICATED).increment(dropped as u64);
}

pub fn record_filtered(dropped: usize) {
    ::metrics::counter!(ROWS_FILTERED).increment(dropped as u64);
}

pub fn record_loaded(rows: usize) {
    ::metrics::counter!(ROWS_LOADED).increment(rows as u64);
}

pub fn record_load_failure() {
    ::metrics::counter!(LOAD_FAILURES).increment(1);
}

pub fn record_validation_failure() {
    ::metrics::counter!(VALIDATION_FAILURES).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_timing_guard_measures_elapsed() {
        let guard = time_stage("test");
        thread::sleep(Duration::from_millis(5));
        assert!(guard.elapsed_secs() >= 0.005);
    }

    #[test]
    fn test_counters_without_recorder_are_noops() {
        record_extracted("A", 3);
        record_deduplicated(1);
        record_filtered(0);
        record_loaded(2);
        record_load_failure();
        record_validation_failure();
    }
}
