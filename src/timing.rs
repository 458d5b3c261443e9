//! Wall-clock timing of pipeline steps.

use crate::metrics::IngestMetrics;
use std::time::{Duration, Instant};
use tracing::info;

/// Records start/elapsed for named steps and keeps the finished durations
/// in order for the run summary.
#[derive(Debug)]
pub struct StepTimer {
    started: Instant,
    running: Vec<(String, Instant)>,
    finished: Vec<(String, Duration)>,
}

impl Default for StepTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl StepTimer {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            running: Vec::new(),
            finished: Vec::new(),
        }
    }

    pub fn start(&mut self, step: impl Into<String>) {
        let step = step.into();
        println!("\n🚀 Starting {}...", step);
        info!(step = %step, "Step started");
        self.running.push((step, Instant::now()));
    }

    /// Finish the most recent step called `step`. Unknown steps return zero.
    pub fn end(&mut self, step: &str) -> Duration {
        let Some(pos) = self.running.iter().rposition(|(name, _)| name == step) else {
            return Duration::ZERO;
        };
        let (name, begun) = self.running.remove(pos);
        let elapsed = begun.elapsed();
        println!("✅ {} completed in {:.2} seconds", name, elapsed.as_secs_f64());
        info!(step = %name, elapsed_secs = elapsed.as_secs_f64(), "Step completed");
        IngestMetrics::record_step_duration(name.clone(), elapsed.as_secs_f64());
        self.finished.push((name, elapsed));
        elapsed
    }

    pub fn finished(&self) -> &[(String, Duration)] {
        &self.finished
    }

    pub fn total(&self) -> Duration {
        self.started.elapsed()
    }
}
