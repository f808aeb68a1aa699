//! One branch's run: fetch, diff, fan out.

use std::collections::BTreeSet;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};

use super::status::{RunOutcome, RunRecord, StatusBoard};
use crate::cursor::Cursor;
use crate::delivery::{DeliveryReport, FanoutDispatcher, MessageFormatter, MessageSender};
use crate::diff::{CursorChange, DiffEngine};
use crate::source::{NoticeSource, SourceError};
use crate::types::{BranchId, SubscriberId};

/// Errors that end a branch pipeline early.
///
/// The cursor is never touched when a pipeline fails.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("source error: {0}")]
    Source(#[from] SourceError),
}

/// Result of a successful pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutcome {
    pub change: CursorChange,
    /// Number of new notices found by the diff.
    pub new_notices: usize,
    /// Present when there were notices to fan out.
    pub report: Option<DeliveryReport>,
}

/// The collaborators a branch run needs, shared by every branch task.
pub struct Pipeline<Src, M> {
    source: Src,
    sender: M,
    engine: DiffEngine,
    formatter: MessageFormatter,
    status: StatusBoard,
}

impl<Src: NoticeSource, M: MessageSender> Pipeline<Src, M> {
    pub fn new(
        source: Src,
        sender: M,
        engine: DiffEngine,
        formatter: MessageFormatter,
        status: StatusBoard,
    ) -> Self {
        Pipeline {
            source,
            sender,
            engine,
            formatter,
            status,
        }
    }

    pub fn status(&self) -> &StatusBoard {
        &self.status
    }

    /// Runs the pipeline for `branch` and records the result on the status board.
    ///
    /// `cursor` is updated by the diff before any message is sent, so a fanout
    /// failure never causes notices to be offered again.
    #[instrument(skip_all, fields(branch = %branch))]
    pub async fn run(
        &self,
        branch: &BranchId,
        cursor: &mut Cursor,
        subscribers: &BTreeSet<SubscriberId>,
        shutdown: &CancellationToken,
    ) -> Result<PipelineOutcome, PipelineError> {
        let result = self.run_inner(branch, cursor, subscribers, shutdown).await;
        self.status.record(branch, run_record(&result, *cursor));
        if let Err(e) = &result {
            warn!(error = %e, "Branch pipeline failed, cursor untouched");
        }
        result
    }

    async fn run_inner(
        &self,
        branch: &BranchId,
        cursor: &mut Cursor,
        subscribers: &BTreeSet<SubscriberId>,
        shutdown: &CancellationToken,
    ) -> Result<PipelineOutcome, PipelineError> {
        let listing = self.source.fetch(branch).await?;
        let diff = self.engine.diff(branch, cursor, &listing);

        let report = if diff.is_empty() {
            None
        } else {
            let dispatcher = FanoutDispatcher::new(&self.sender, &self.formatter);
            Some(
                dispatcher
                    .dispatch(branch, &diff.new_notices, subscribers, shutdown)
                    .await,
            )
        };

        Ok(PipelineOutcome {
            change: diff.change,
            new_notices: diff.new_notices.len(),
            report,
        })
    }
}

fn run_record(result: &Result<PipelineOutcome, PipelineError>, cursor: Cursor) -> RunRecord {
    match result {
        Ok(outcome) => {
            let (delivered, failed) = outcome
                .report
                .as_ref()
                .map_or((0, 0), |r| (r.delivered, r.failed()));
            let outcome = match outcome.change {
                CursorChange::EmptyListing => RunOutcome::EmptyListing,
                CursorChange::Initialized { .. } => RunOutcome::Initialized,
                CursorChange::Unchanged => RunOutcome::Unchanged,
                CursorChange::Advanced { .. } => RunOutcome::Delivered,
                CursorChange::Reset { .. } => RunOutcome::Reset,
            };
            RunRecord {
                outcome,
                cursor,
                delivered,
                failed,
                error: None,
            }
        }
        Err(e) => {
            let outcome = match e {
                PipelineError::Source(source) if source.is_parse() => RunOutcome::ParseFailed,
                PipelineError::Source(_) => RunOutcome::FetchFailed,
            };
            RunRecord {
                outcome,
                cursor,
                delivered: 0,
                failed: 0,
                error: Some(e.to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::DeliveryError;
    use crate::test_utils::{RecordingSender, ScriptedSource, branch, subscribers};

    fn pipeline(source: &ScriptedSource, sender: &RecordingSender) -> Pipeline<ScriptedSource, RecordingSender> {
        Pipeline::new(
            source.clone(),
            sender.clone(),
            DiffEngine::default(),
            MessageFormatter::new("New"),
            StatusBoard::new(),
        )
    }

    #[tokio::test]
    async fn three_tick_scenario_delivers_only_new_notices() {
        let cse = branch("CSE");
        let source = ScriptedSource::new();
        let sender = RecordingSender::new();
        let pipeline = pipeline(&source, &sender);
        let subs = subscribers(&[1]);
        let shutdown = CancellationToken::new();
        let mut cursor = Cursor::Unset;

        source.set_listing(&cse, &["N5", "N4", "N3", "N2", "N1"]);
        let first = pipeline.run(&cse, &mut cursor, &subs, &shutdown).await.unwrap();
        assert!(matches!(first.change, CursorChange::Initialized { .. }));
        assert!(sender.sent().is_empty());

        source.set_listing(&cse, &["N7", "N6", "N5", "N4", "N3"]);
        let second = pipeline.run(&cse, &mut cursor, &subs, &shutdown).await.unwrap();
        assert_eq!(second.new_notices, 2);
        assert_eq!(sender.texts_for(SubscriberId(1)), vec!["New: N6", "New: N7"]);

        let third = pipeline.run(&cse, &mut cursor, &subs, &shutdown).await.unwrap();
        assert_eq!(third.change, CursorChange::Unchanged);
        assert_eq!(sender.sent().len(), 2);
    }

    #[tokio::test]
    async fn fetch_error_leaves_cursor_untouched() {
        let cse = branch("CSE");
        let source = ScriptedSource::new();
        let sender = RecordingSender::new();
        let pipeline = pipeline(&source, &sender);
        let start = Cursor::At(crate::types::NoticeId::from_title("N5"));
        let mut cursor = start;

        source.fail_next(&cse, SourceError::fetch("HTTP 503"));
        let result = pipeline
            .run(&cse, &mut cursor, &subscribers(&[1]), &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(PipelineError::Source(_))));
        assert_eq!(cursor, start);
        let status = pipeline.status().get(&cse).unwrap();
        assert_eq!(status.last_outcome, Some(RunOutcome::FetchFailed));
        assert!(status.last_error.unwrap().contains("HTTP 503"));
    }

    #[tokio::test]
    async fn parse_error_is_reported_separately() {
        let cse = branch("CSE");
        let source = ScriptedSource::new();
        let pipeline = pipeline(&source, &RecordingSender::new());

        source.fail_next(&cse, SourceError::Parse("no notice rows".into()));
        let _ = pipeline
            .run(&cse, &mut Cursor::Unset, &subscribers(&[1]), &CancellationToken::new())
            .await;

        let status = pipeline.status().get(&cse).unwrap();
        assert_eq!(status.last_outcome, Some(RunOutcome::ParseFailed));
    }

    #[tokio::test]
    async fn delivery_failure_still_advances_cursor() {
        let cse = branch("CSE");
        let source = ScriptedSource::new();
        let sender = RecordingSender::new();
        sender.fail_for(SubscriberId(1), || DeliveryError::unreachable("blocked"));
        let pipeline = pipeline(&source, &sender);
        let mut cursor = Cursor::At(crate::types::NoticeId::from_title("N1"));

        source.set_listing(&cse, &["N2", "N1"]);
        let outcome = pipeline
            .run(&cse, &mut cursor, &subscribers(&[1, 2]), &CancellationToken::new())
            .await
            .unwrap();

        let report = outcome.report.unwrap();
        assert_eq!(report.delivered, 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(cursor, Cursor::At(crate::types::NoticeId::from_title("N2")));

        let status = pipeline.status().get(&cse).unwrap();
        assert_eq!(status.last_outcome, Some(RunOutcome::Delivered));
        assert_eq!((status.delivered, status.failed), (1, 1));
    }
}
