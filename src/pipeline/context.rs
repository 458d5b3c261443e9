use crate::config::IngestConfig;
use crate::constants::DEFAULT_BATCH_SIZE;
use crate::graph::GraphStore;
use crate::table::Table;
use crate::timing::StepTimer;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub batch_size: usize,
    /// Fail the run on any dropped row instead of logging and moving on.
    pub strict: bool,
    pub show_progress: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            strict: false,
            show_progress: true,
        }
    }
}

impl PipelineOptions {
    pub fn from_config(config: &IngestConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            strict: config.strict,
            ..Self::default()
        }
    }
}

/// State shared by every stage of one run: the loaded table, the open store
/// and the step timer. Passed explicitly instead of living in globals.
pub struct PipelineContext {
    pub table: Table,
    pub store: Arc<dyn GraphStore>,
    pub timer: StepTimer,
    pub options: PipelineOptions,
}

impl PipelineContext {
    /// Batch size clamped to at least one row.
    pub fn batch_size(&self) -> usize {
        self.options.batch_size.max(1)
    }

    pub fn progress_bar(&self, len: usize, what: &str) -> ProgressBar {
        if !self.options.show_progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(len as u64);
        let style = ProgressStyle::with_template(
            "[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        bar.set_message(what.to_string());
        bar
    }
}
