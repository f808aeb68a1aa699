//! Scheduler tests: ticks over several branches with scripted collaborators.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::*;
use crate::cursor::Cursor;
use crate::delivery::{DeliveryError, MessageFormatter};
use crate::diff::DiffEngine;
use crate::source::SourceError;
use crate::subscriptions::{InMemorySubscriptions, SubscriptionStore};
use crate::test_utils::{RecordingSender, ScriptedSource, branch};
use crate::types::{NoticeId, SubscriberId};

struct Harness {
    source: ScriptedSource,
    sender: RecordingSender,
    directory: Arc<InMemorySubscriptions>,
    scheduler: Scheduler<ScriptedSource, RecordingSender, InMemorySubscriptions>,
}

fn harness(config: ScheduleConfig) -> Harness {
    let source = ScriptedSource::new();
    let sender = RecordingSender::new();
    let directory = Arc::new(InMemorySubscriptions::new());
    let pipeline = Pipeline::new(
        source.clone(),
        sender.clone(),
        DiffEngine::new(config.lookback_limit),
        MessageFormatter::new("New"),
        StatusBoard::new(),
    );
    let scheduler = Scheduler::new(pipeline, Arc::clone(&directory), config);
    Harness {
        source,
        sender,
        directory,
        scheduler,
    }
}

fn subscribe(h: &Harness, chat: i64, name: &str) {
    h.directory.subscribe(SubscriberId(chat), &branch(name)).unwrap();
}

async fn tick(h: &mut Harness) -> TickSummary {
    let summary = h.scheduler.tick(&CancellationToken::new()).unwrap();
    h.scheduler.drain().await;
    summary
}

fn at(title: &str) -> Option<Cursor> {
    Some(Cursor::At(NoticeId::from_title(title)))
}

#[tokio::test]
async fn first_tick_initializes_every_subscribed_branch_silently() {
    let mut h = harness(ScheduleConfig::new());
    subscribe(&h, 1, "CSE");
    subscribe(&h, 2, "IT");
    h.source.set_listing(&branch("CSE"), &["C2", "C1"]);
    h.source.set_listing(&branch("IT"), &["I1"]);

    let summary = tick(&mut h).await;

    assert_eq!(summary.started, vec![branch("CSE"), branch("IT")]);
    assert!(summary.skipped.is_empty());
    assert_eq!(h.scheduler.cursor(&branch("CSE")), at("C2"));
    assert_eq!(h.scheduler.cursor(&branch("IT")), at("I1"));
    assert!(h.sender.sent().is_empty());
}

#[tokio::test]
async fn new_notices_reach_subscribers_once() {
    let mut h = harness(ScheduleConfig::new());
    subscribe(&h, 1, "CSE");
    h.source.set_listing(&branch("CSE"), &["N5", "N4", "N3"]);
    tick(&mut h).await;

    h.source.set_listing(&branch("CSE"), &["N7", "N6", "N5", "N4"]);
    tick(&mut h).await;
    tick(&mut h).await;

    assert_eq!(h.sender.texts_for(SubscriberId(1)), vec!["New: N6", "New: N7"]);
    assert_eq!(h.scheduler.cursor(&branch("CSE")), at("N7"));
}

#[tokio::test]
async fn failing_recipient_does_not_hold_back_cursor_or_others() {
    let mut h = harness(ScheduleConfig::new());
    subscribe(&h, 1, "CSE");
    subscribe(&h, 2, "CSE");
    h.sender
        .fail_for(SubscriberId(1), || DeliveryError::unreachable("bot was blocked by the user"));
    h.source.set_listing(&branch("CSE"), &["N1"]);
    tick(&mut h).await;

    h.source.set_listing(&branch("CSE"), &["N2", "N1"]);
    tick(&mut h).await;
    tick(&mut h).await;

    assert!(h.sender.texts_for(SubscriberId(1)).is_empty());
    assert_eq!(h.sender.texts_for(SubscriberId(2)), vec!["New: N2"]);
    assert_eq!(h.scheduler.cursor(&branch("CSE")), at("N2"));

    let status = h.scheduler.status().get(&branch("CSE")).unwrap();
    assert_eq!(status.last_outcome, Some(RunOutcome::Unchanged));
}

#[tokio::test]
async fn fetch_failure_is_confined_to_its_branch() {
    let mut h = harness(ScheduleConfig::new());
    subscribe(&h, 1, "CSE");
    subscribe(&h, 1, "IT");
    h.source.set_listing(&branch("CSE"), &["C1"]);
    h.source.set_listing(&branch("IT"), &["I1"]);
    tick(&mut h).await;

    h.source.set_listing(&branch("CSE"), &["C2", "C1"]);
    h.source.set_listing(&branch("IT"), &["I2", "I1"]);
    h.source.fail_next(&branch("CSE"), SourceError::fetch("connection reset"));
    tick(&mut h).await;

    assert_eq!(h.scheduler.cursor(&branch("CSE")), at("C1"));
    assert_eq!(h.scheduler.cursor(&branch("IT")), at("I2"));
    assert_eq!(h.sender.texts_for(SubscriberId(1)), vec!["New: I2"]);

    // The next tick picks up what the failed one missed.
    tick(&mut h).await;
    assert_eq!(h.sender.texts_for(SubscriberId(1)), vec!["New: I2", "New: C2"]);
}

#[tokio::test]
async fn overlapping_run_is_skipped() {
    let mut h = harness(ScheduleConfig::new());
    subscribe(&h, 1, "CSE");
    h.source.set_listing(&branch("CSE"), &["N1"]);
    h.source.hold_fetches();
    let shutdown = CancellationToken::new();

    let first = h.scheduler.tick(&shutdown).unwrap();
    let second = h.scheduler.tick(&shutdown).unwrap();

    assert_eq!(first.started, vec![branch("CSE")]);
    assert_eq!(second.skipped, vec![branch("CSE")]);
    assert_eq!(h.scheduler.in_flight(), 1);
    assert_eq!(
        h.scheduler.status().get(&branch("CSE")).unwrap().last_outcome,
        Some(RunOutcome::Skipped)
    );

    h.source.release_fetches();
    h.scheduler.drain().await;

    assert_eq!(h.source.fetches(&branch("CSE")), 1);
    let third = tick(&mut h).await;
    assert_eq!(third.started, vec![branch("CSE")]);
}

#[tokio::test]
async fn branches_without_subscribers_are_not_fetched() {
    let mut h = harness(ScheduleConfig::new());
    subscribe(&h, 1, "CSE");
    h.directory.unsubscribe(SubscriberId(1), &branch("CSE")).unwrap();

    let summary = tick(&mut h).await;

    assert!(summary.started.is_empty());
    assert_eq!(h.source.fetches(&branch("CSE")), 0);
}

#[tokio::test]
async fn cursor_survives_resubscription() {
    let mut h = harness(ScheduleConfig::new());
    subscribe(&h, 1, "CSE");
    h.source.set_listing(&branch("CSE"), &["N1"]);
    tick(&mut h).await;

    h.directory.unsubscribe(SubscriberId(1), &branch("CSE")).unwrap();
    h.source.set_listing(&branch("CSE"), &["N2", "N1"]);
    tick(&mut h).await;
    subscribe(&h, 1, "CSE");
    tick(&mut h).await;

    assert_eq!(h.sender.texts_for(SubscriberId(1)), vec!["New: N2"]);
}

#[tokio::test]
async fn run_ticks_until_shutdown() {
    let config = ScheduleConfig {
        interval: Duration::from_secs(3600),
        initial_delay: Duration::ZERO,
        ..ScheduleConfig::new()
    };
    let h = harness(config);
    subscribe(&h, 1, "CSE");
    h.source.set_listing(&branch("CSE"), &["N1"]);
    let status = h.scheduler.status().clone();
    let source = h.source.clone();
    let shutdown = CancellationToken::new();

    let handle = tokio::spawn(h.scheduler.run(shutdown.clone()));

    tokio::time::timeout(Duration::from_secs(5), async {
        while status.get(&branch("CSE")).is_none() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("first tick should run immediately");

    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("scheduler should stop on shutdown")
        .unwrap();

    assert_eq!(source.fetches(&branch("CSE")), 1);
    assert_eq!(
        status.get(&branch("CSE")).unwrap().last_outcome,
        Some(RunOutcome::Initialized)
    );
}
