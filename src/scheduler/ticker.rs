//! The repeating timer that drives branch pipelines.

use std::sync::Arc;

use tokio::task::{JoinError, JoinSet};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use super::config::ScheduleConfig;
use super::pipeline::Pipeline;
use super::status::StatusBoard;
use crate::cursor::{Cursor, CursorStore};
use crate::delivery::MessageSender;
use crate::source::NoticeSource;
use crate::subscriptions::{DirectoryError, SubscriptionDirectory};
use crate::types::BranchId;

/// What one tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Branches whose pipeline was started.
    pub started: Vec<BranchId>,
    /// Branches skipped because their previous run had not finished.
    pub skipped: Vec<BranchId>,
}

/// Runs one pipeline per subscribed branch on every tick.
///
/// Branch pipelines run concurrently as separate tasks. Each task holds its branch's
/// cursor claim for the whole run, so a slow branch is skipped by later ticks instead
/// of being run twice at once.
pub struct Scheduler<Src, M, D> {
    pipeline: Arc<Pipeline<Src, M>>,
    directory: Arc<D>,
    cursors: CursorStore,
    config: ScheduleConfig,
    tasks: JoinSet<()>,
}

impl<Src, M, D> Scheduler<Src, M, D>
where
    Src: NoticeSource + 'static,
    M: MessageSender + 'static,
    D: SubscriptionDirectory + 'static,
{
    pub fn new(pipeline: Pipeline<Src, M>, directory: Arc<D>, config: ScheduleConfig) -> Self {
        Scheduler {
            pipeline: Arc::new(pipeline),
            directory,
            cursors: CursorStore::new(),
            config,
            tasks: JoinSet::new(),
        }
    }

    pub fn status(&self) -> &StatusBoard {
        self.pipeline.status()
    }

    /// Returns the cursor of `branch`, or `None` if unknown or currently claimed.
    pub fn cursor(&self, branch: &BranchId) -> Option<Cursor> {
        self.cursors.peek(branch)
    }

    /// Number of branch pipelines still running.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Starts a pipeline for every branch with subscribers.
    ///
    /// The subscription directory is read once; every pipeline of this tick sees the
    /// same snapshot.
    #[instrument(skip_all)]
    pub fn tick(&mut self, shutdown: &CancellationToken) -> Result<TickSummary, DirectoryError> {
        self.reap();
        let snapshot = self.directory.snapshot()?;
        let mut summary = TickSummary::default();

        for branch in snapshot.branches() {
            let Some(mut claim) = self.cursors.try_claim(branch) else {
                info!(%branch, "Previous run still in flight, skipping branch this tick");
                self.pipeline.status().record_skipped(branch);
                summary.skipped.push(branch.clone());
                continue;
            };

            let pipeline = Arc::clone(&self.pipeline);
            let branch = branch.clone();
            let subscribers = snapshot.subscribers_of(&branch);
            let shutdown = shutdown.clone();
            summary.started.push(branch.clone());

            self.tasks.spawn(async move {
                // Failures are logged and recorded on the status board by the pipeline.
                let _ = pipeline
                    .run(&branch, &mut claim, &subscribers, &shutdown)
                    .await;
            });
        }

        debug!(
            started = summary.started.len(),
            skipped = summary.skipped.len(),
            subscriptions = snapshot.subscription_count(),
            "Tick dispatched"
        );
        Ok(summary)
    }

    /// Ticks on the configured schedule until `shutdown` is cancelled, then waits for
    /// in-flight pipelines to stop.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            initial_delay_secs = self.config.initial_delay.as_secs(),
            "Scheduler started"
        );

        let start = Instant::now() + self.config.initial_delay;
        let mut ticker = tokio::time::interval_at(start, self.config.effective_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Shutdown signal received, stopping scheduler");
                    break;
                }

                _ = ticker.tick() => {
                    if let Err(e) = self.tick(&shutdown) {
                        error!(error = %e, "Failed to read subscriptions, skipping tick");
                    }
                }
            }
        }

        self.drain().await;
        info!("Scheduler stopped");
    }

    /// Waits for every running pipeline to finish.
    pub async fn drain(&mut self) {
        while let Some(result) = self.tasks.join_next().await {
            log_join(result);
        }
    }

    /// Collects pipelines that have already finished.
    fn reap(&mut self) {
        while let Some(result) = self.tasks.try_join_next() {
            log_join(result);
        }
    }
}

fn log_join(result: Result<(), JoinError>) {
    if let Err(e) = result {
        error!(error = %e, "Branch pipeline task panicked");
    }
}
