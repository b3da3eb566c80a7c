// src/pipeline/deliver.rs

//! Delivery pipeline: search, filter, render, send, persist, back up.
//!
//! One run is a single sequential pass:
//!
//! ```text
//! Init → LoadedHistory → Queried → Filtered → Rendered → Delivered
//!      → Persisted → Synced → Done
//! ```
//!
//! Configuration, provider, and transport errors end the run as a failure.
//! Persistence and sync problems are logged and the run still succeeds.
//!
//! ## Mark-seen policy
//!
//! With [`MarkSeen::BeforeSend`] novel links are recorded before the report
//! is handed to the transport, and the history is saved even when sending
//! fails. A failed send therefore loses those postings for good
//! (at-most-once). [`MarkSeen::AfterSend`] records them only after the
//! transport accepted the report, so a failed send repeats them next run
//! (at-least-once).

use chrono::{DateTime, Utc};

use crate::error::{AppError, Result};
use crate::models::{History, MarkSeen, RunOutcome, RunStage, Settings};
use crate::services::{MailTransport, OutgoingMail, SearchProvider};
use crate::storage::{HistoryStore, SyncOutcome};

use super::filter::{filter_novel, mark_seen};
use super::render::{render, subject_for};

/// Orchestrates one run against its collaborators.
pub struct DeliveryPipeline<'a> {
    settings: &'a Settings,
    store: &'a dyn HistoryStore,
    provider: &'a dyn SearchProvider,
    transport: &'a dyn MailTransport,
}

/// Progress of a run, kept so a failure can report how far it got.
struct RunState {
    stage: RunStage,
    total_results: usize,
    novel_results: usize,
}

impl RunState {
    fn advance(&mut self, stage: RunStage) {
        log::debug!("Run stage: {} -> {}", self.stage, stage);
        self.stage = stage;
    }
}

impl<'a> DeliveryPipeline<'a> {
    pub fn new(
        settings: &'a Settings,
        store: &'a dyn HistoryStore,
        provider: &'a dyn SearchProvider,
        transport: &'a dyn MailTransport,
    ) -> Self {
        Self {
            settings,
            store,
            provider,
            transport,
        }
    }

    /// Run the pipeline now.
    pub async fn run(&self) -> RunOutcome {
        self.run_at(Utc::now()).await
    }

    /// Run the pipeline with an explicit run timestamp.
    pub async fn run_at(&self, now: DateTime<Utc>) -> RunOutcome {
        log::info!("Starting Vacation Scheme Search Agent...");

        let mut state = RunState {
            stage: RunStage::Init,
            total_results: 0,
            novel_results: 0,
        };

        match self.execute(now, &mut state).await {
            Ok(()) => {
                log::info!(
                    "Agent completed successfully: {} results, {} new",
                    state.total_results,
                    state.novel_results
                );
                RunOutcome::success(state.total_results, state.novel_results)
            }
            Err(e) => {
                log::error!("Error in agent execution after stage {}: {}", state.stage, e);
                RunOutcome::failure(state.stage, e)
                    .with_counts(state.total_results, state.novel_results)
            }
        }
    }

    async fn execute(&self, now: DateTime<Utc>, state: &mut RunState) -> Result<()> {
        self.settings.validate()?;
        let query = self.settings.search.query.as_str();
        let policy = self.settings.history.mark_seen;

        let mut history = self.store.load().await;
        state.advance(RunStage::LoadedHistory);

        let batch = self.provider.search(query).await?;
        state.total_results = batch.len();
        state.advance(RunStage::Queried);

        let novel = filter_novel(&batch, &history);
        state.novel_results = novel.len();
        log::info!(
            "{} of {} results are new ({} links already sent)",
            novel.len(),
            batch.len(),
            history.len()
        );
        if policy == MarkSeen::BeforeSend {
            mark_seen(&mut history, &novel);
        }
        state.advance(RunStage::Filtered);

        let report = render(query, now, &novel, !batch.is_empty());
        let mail = OutgoingMail {
            subject: subject_for(now),
            html_body: report.html,
        };
        state.advance(RunStage::Rendered);

        if let Err(e) = self.transport.send(&mail).await {
            if policy == MarkSeen::BeforeSend && !novel.is_empty() {
                log::warn!(
                    "Recording {} undelivered links as sent; they will not be emailed again",
                    novel.len()
                );
                self.persist(&history).await;
            }
            return Err(e);
        }
        state.advance(RunStage::Delivered);

        if policy == MarkSeen::AfterSend {
            mark_seen(&mut history, &novel);
        }

        self.persist(&history).await;
        state.advance(RunStage::Persisted);

        match self.store.sync_remote(&history).await {
            SyncOutcome::Failed(reason) => log::warn!("History backup skipped: {reason}"),
            outcome => log::debug!("History backup: {outcome:?}"),
        }
        state.advance(RunStage::Synced);

        state.advance(RunStage::Done);
        Ok(())
    }

    /// Save the history, logging instead of failing.
    async fn persist(&self, history: &History) {
        if let Err(e) = self.store.save(history).await {
            let e = match e {
                AppError::Persistence(_) => e,
                other => AppError::persistence(other),
            };
            log::warn!("{e}");
        }
    }
}
