//! The poll loop: fetch, validate, notify, sleep.
//!
//! A [`Poller`] owns all state that crosses cycles (checkpoint and the
//! notifier's dedup cache). The checkpoint only moves after a cycle whose
//! fetch and validation both succeeded; a failed delivery of the status
//! message does not hold it back.
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::clock::Clock;
use crate::db::{self, Pool};
use crate::model::PollState;
use crate::notifier::{MessageSink, Notifier, SendOutcome};
use crate::practicum::{FetchError, HomeworkApi};
use crate::validate::{self, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Fetch and validation succeeded. `delivery` is `None` for an empty batch.
    Completed {
        records: usize,
        delivery: Option<SendOutcome>,
    },
    FetchFailed(FetchError),
    ValidationFailed(ValidationError),
}

impl CycleOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CycleOutcome::Completed { .. })
    }
}

/// Text sent to the chat when a cycle fails.
pub fn failure_message(err: &dyn fmt::Display) -> String {
    format!("Program failure: {err}")
}

pub struct Poller {
    api: Arc<dyn HomeworkApi>,
    notifier: Notifier,
    clock: Arc<dyn Clock>,
    interval: Duration,
    checkpoint: i64,
    store: Option<Pool>,
}

impl Poller {
    /// New poller whose first request asks for changes since "now".
    pub fn new(
        api: Arc<dyn HomeworkApi>,
        sink: Arc<dyn MessageSink>,
        clock: Arc<dyn Clock>,
        interval: Duration,
    ) -> Self {
        let checkpoint = clock.now();
        Self {
            api,
            notifier: Notifier::new(sink),
            clock,
            interval,
            checkpoint,
            store: None,
        }
    }

    pub fn with_checkpoint(mut self, checkpoint: i64) -> Self {
        self.checkpoint = checkpoint;
        self
    }

    /// Resume from previously saved state.
    pub fn with_state(mut self, state: PollState) -> Self {
        self.checkpoint = state.checkpoint;
        self.notifier.set_cache(state.cache);
        self
    }

    /// Save state to this pool after every cycle that changes it.
    pub fn with_store(mut self, pool: Pool) -> Self {
        self.store = Some(pool);
        self
    }

    pub fn checkpoint(&self) -> i64 {
        self.checkpoint
    }

    pub fn state(&self) -> PollState {
        PollState {
            checkpoint: self.checkpoint,
            cache: self.notifier.cache().clone(),
        }
    }

    /// Run cycles forever, sleeping `interval` between them. Never returns;
    /// callers stop it by dropping the future.
    pub async fn run(&mut self) {
        info!(
            interval_secs = self.interval.as_secs(),
            checkpoint = self.checkpoint,
            "starting homework status poller"
        );
        loop {
            let outcome = self.run_cycle().await;
            debug!(?outcome, "cycle finished");
            tokio::time::sleep(self.interval).await;
        }
    }

    /// Execute exactly one fetch-validate-notify cycle and persist any state change.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let before = self.state();
        let outcome = self.execute_cycle().await;
        let after = self.state();
        if after != before {
            self.persist(&after).await;
        }
        outcome
    }

    #[instrument(skip(self), fields(checkpoint = self.checkpoint))]
    async fn execute_cycle(&mut self) -> CycleOutcome {
        let started_at = self.clock.now();

        let payload = match self.api.fetch(self.checkpoint).await {
            Ok(payload) => payload,
            Err(err) => {
                warn!(%err, "failed to fetch homework statuses");
                self.notifier.report_error(&failure_message(&err)).await;
                return CycleOutcome::FetchFailed(err);
            }
        };

        let records = match validate::validate(&payload) {
            Ok(records) => records,
            Err(err) => {
                warn!(%err, "grading API response failed validation");
                self.notifier.report_error(&failure_message(&err)).await;
                return CycleOutcome::ValidationFailed(err);
            }
        };
        info!(count = records.len(), "homework statuses received");

        let delivery = self.notifier.resolve(&records).await;
        self.checkpoint = self.checkpoint.max(started_at);
        CycleOutcome::Completed {
            records: records.len(),
            delivery,
        }
    }

    async fn persist(&self, state: &PollState) {
        let Some(pool) = &self.store else {
            return;
        };
        if let Err(err) = db::save_poll_state(pool, state).await {
            warn!(?err, "failed to save poll state");
        }
    }
}
