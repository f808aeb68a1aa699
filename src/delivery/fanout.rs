//! Fanout of a branch's new notices to its subscribers.
//!
//! Each subscriber receives the notices oldest to newest, so their chat history reads
//! chronologically. Subscribers are independent: a failure for one never stops
//! delivery to another. The cursor has already been committed by the time fanout
//! starts, so nothing here can cause a notice to be re-sent on a later tick.

use std::collections::BTreeSet;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::format::MessageFormatter;
use super::{DeliveryErrorKind, MessageSender, OutboundMessage};
use crate::types::{BranchId, Notice, NoticeId, SubscriberId};

/// One failed send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryFailure {
    pub subscriber: SubscriberId,
    pub notice: NoticeId,
    pub kind: DeliveryErrorKind,
    pub message: String,
}

/// Outcome of one fanout run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub branch: BranchId,
    /// Number of notices being fanned out.
    pub notices: usize,
    /// Number of subscribers targeted.
    pub subscribers: usize,
    /// Messages sent successfully.
    pub delivered: usize,
    /// Messages not attempted because the subscriber was found unreachable earlier
    /// in this run, or because shutdown interrupted the run.
    pub skipped: usize,
    pub failures: Vec<DeliveryFailure>,
    /// Shutdown was requested before every message was attempted.
    pub interrupted: bool,
}

impl DeliveryReport {
    fn new(branch: &BranchId, notices: usize, subscribers: usize) -> Self {
        DeliveryReport {
            branch: branch.clone(),
            notices,
            subscribers,
            delivered: 0,
            skipped: 0,
            failures: Vec::new(),
            interrupted: false,
        }
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Returns true if every message was delivered.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.skipped == 0 && !self.interrupted
    }

    /// Subscribers that reported an unreachable error, in order.
    pub fn unreachable_subscribers(&self) -> BTreeSet<SubscriberId> {
        self.failures
            .iter()
            .filter(|f| f.kind == DeliveryErrorKind::Unreachable)
            .map(|f| f.subscriber)
            .collect()
    }
}

/// Delivers notices to every subscriber of a branch.
pub struct FanoutDispatcher<'a, M> {
    sender: &'a M,
    formatter: &'a MessageFormatter,
}

impl<'a, M: MessageSender> FanoutDispatcher<'a, M> {
    pub fn new(sender: &'a M, formatter: &'a MessageFormatter) -> Self {
        FanoutDispatcher { sender, formatter }
    }

    /// Sends `notices` (oldest first) to each subscriber in turn.
    ///
    /// Stops between sends once `shutdown` is cancelled; a send already in flight is
    /// allowed to finish.
    pub async fn dispatch(
        &self,
        branch: &BranchId,
        notices: &[Notice],
        subscribers: &BTreeSet<SubscriberId>,
        shutdown: &CancellationToken,
    ) -> DeliveryReport {
        let mut report = DeliveryReport::new(branch, notices.len(), subscribers.len());
        if notices.is_empty() || subscribers.is_empty() {
            debug!(%branch, notices = notices.len(), subscribers = subscribers.len(), "Nothing to fan out");
            return report;
        }

        let messages: Vec<(NoticeId, OutboundMessage)> = notices
            .iter()
            .map(|n| (n.id(), self.formatter.render(n)))
            .collect();
        let total = messages.len() * subscribers.len();
        let mut attempted = 0;

        'subscribers: for &subscriber in subscribers {
            for (index, (notice, message)) in messages.iter().enumerate() {
                if shutdown.is_cancelled() {
                    report.interrupted = true;
                    break 'subscribers;
                }
                attempted += 1;

                match self.sender.send(subscriber, message).await {
                    Ok(()) => report.delivered += 1,
                    Err(e) => {
                        warn!(
                            %branch,
                            %subscriber,
                            notice = %notice.short(),
                            kind = %e.kind,
                            error = %e,
                            "Delivery failed"
                        );
                        report.failures.push(DeliveryFailure {
                            subscriber,
                            notice: *notice,
                            kind: e.kind,
                            message: e.message.clone(),
                        });

                        if e.kind == DeliveryErrorKind::Unreachable {
                            let remaining = messages.len() - index - 1;
                            report.skipped += remaining;
                            attempted += remaining;
                            continue 'subscribers;
                        }
                    }
                }
            }
        }
        report.skipped += total - attempted;

        info!(
            %branch,
            notices = report.notices,
            subscribers = report.subscribers,
            delivered = report.delivered,
            failed = report.failed(),
            skipped = report.skipped,
            interrupted = report.interrupted,
            "Fanout finished"
        );
        report
    }
}
