//! Run outcome reported back to the trigger.

use std::fmt;

use serde::Serialize;

/// Stages of one delivery run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStage {
    Init,
    LoadedHistory,
    Queried,
    Filtered,
    Rendered,
    Delivered,
    Persisted,
    Synced,
    Done,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunStage::Init => "init",
            RunStage::LoadedHistory => "loaded_history",
            RunStage::Queried => "queried",
            RunStage::Filtered => "filtered",
            RunStage::Rendered => "rendered",
            RunStage::Delivered => "delivered",
            RunStage::Persisted => "persisted",
            RunStage::Synced => "synced",
            RunStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Success or failure of a run, with enough detail for logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunOutcome {
    /// Whether the run reached `Done`
    pub success: bool,

    /// Last stage completed before finishing or failing
    pub stage: RunStage,

    /// Error detail on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Results returned by the provider
    pub total_results: usize,

    /// Results not sent before
    pub novel_results: usize,
}

impl RunOutcome {
    pub fn success(total_results: usize, novel_results: usize) -> Self {
        Self {
            success: true,
            stage: RunStage::Done,
            error: None,
            total_results,
            novel_results,
        }
    }

    /// A failed run that stopped after `stage`.
    pub fn failure(stage: RunStage, error: impl fmt::Display) -> Self {
        Self {
            success: false,
            stage,
            error: Some(error.to_string()),
            total_results: 0,
            novel_results: 0,
        }
    }

    /// Attach result counts gathered before the failure.
    pub fn with_counts(mut self, total_results: usize, novel_results: usize) -> Self {
        self.total_results = total_results;
        self.novel_results = novel_results;
        self
    }

    /// Process exit code for the trigger: 0 on success, 1 on failure.
    pub fn exit_code(&self) -> u8 {
        if self.success { 0 } else { 1 }
    }
}
