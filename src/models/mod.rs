// src/models/mod.rs

//! Domain models for the search agent.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod history;
mod outcome;
mod result;

// Re-export all public types
pub use config::{
    BackupTarget, ConfigSource, EmailSettings, HistorySettings, LoggingSettings, MarkSeen,
    ScheduleSettings, SearchSettings, SerpApiSettings, Settings, env_key,
};
pub use history::History;
pub use outcome::{RunOutcome, RunStage};
pub use result::{CandidateResult, NO_SNIPPET, NO_TITLE, ResultBatch};
