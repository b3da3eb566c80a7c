//! Pipeline entry points for the search agent.
//!
//! - `filter_novel`: Keep results whose link was never sent
//! - `render`: Build the HTML report for a run
//! - `DeliveryPipeline`: Search, filter, render, send, and record one run
//! - `run_weekly`: Trigger runs on a weekly schedule

pub mod deliver;
pub mod filter;
pub mod render;
pub mod schedule;

pub use deliver::DeliveryPipeline;
pub use filter::{filter_novel, mark_seen};
pub use render::{Report, render, subject_for};
pub use schedule::{WeeklySchedule, run_weekly};
