//! Shared test utilities: scripted collaborators and arbitrary generators for
//! property-based testing.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::{Arc, Mutex};

use proptest::prelude::*;
use tokio::sync::Semaphore;

use crate::delivery::{DeliveryError, MessageSender, OutboundMessage};
use crate::source::{NoticeSource, SourceError};
use crate::types::{BranchId, Notice, SubscriberId};

/// A notice with no link, so it renders as plain text.
pub fn notice(title: &str) -> Notice {
    Notice::new(title, None, "Registrar")
}

/// Notices for `titles`, in the order given (newest first).
pub fn listing(titles: &[&str]) -> Vec<Notice> {
    titles.iter().map(|t| notice(t)).collect()
}

pub fn subscribers(ids: &[i64]) -> BTreeSet<SubscriberId> {
    ids.iter().copied().map(SubscriberId).collect()
}

pub fn branch(name: &str) -> BranchId {
    BranchId::parse(name).unwrap()
}

// ==================== Generators ====================

/// Listings drawn from a small title space, so duplicates and cursor hits happen.
pub fn arb_listing(len: std::ops::Range<usize>) -> impl Strategy<Value = Vec<Notice>> {
    prop::collection::vec("Notice [0-9]{1,2}", len)
        .prop_map(|titles| titles.iter().map(|t| notice(t)).collect())
}

/// Distinct titles, oldest first.
pub fn arb_titles(len: std::ops::Range<usize>) -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[A-Za-z0-9 .,()-]{1,30}", len).prop_map(|titles| {
        titles
            .into_iter()
            .enumerate()
            .map(|(i, t)| format!("{} #{}", t, i))
            .collect()
    })
}

// ==================== Scripted source ====================

#[derive(Default)]
struct SourceScript {
    listings: BTreeMap<BranchId, Vec<Notice>>,
    failures: BTreeMap<BranchId, VecDeque<SourceError>>,
    fetches: BTreeMap<BranchId, usize>,
    gate: Option<Arc<Semaphore>>,
}

/// A [`NoticeSource`] serving listings set by the test.
///
/// Queued failures are returned first, one per fetch. Branches without a listing
/// return an empty page.
#[derive(Default, Clone)]
pub struct ScriptedSource {
    script: Arc<Mutex<SourceScript>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_listing(&self, branch: &BranchId, titles: &[&str]) {
        self.script
            .lock()
            .unwrap()
            .listings
            .insert(branch.clone(), listing(titles));
    }

    pub fn fail_next(&self, branch: &BranchId, error: SourceError) {
        self.script
            .lock()
            .unwrap()
            .failures
            .entry(branch.clone())
            .or_default()
            .push_back(error);
    }

    pub fn fetches(&self, branch: &BranchId) -> usize {
        self.script
            .lock()
            .unwrap()
            .fetches
            .get(branch)
            .copied()
            .unwrap_or(0)
    }

    /// Makes every fetch block until [`release_fetches`](Self::release_fetches).
    pub fn hold_fetches(&self) {
        self.script.lock().unwrap().gate = Some(Arc::new(Semaphore::new(0)));
    }

    pub fn release_fetches(&self) {
        if let Some(gate) = self.script.lock().unwrap().gate.take() {
            gate.close();
        }
    }
}

impl NoticeSource for ScriptedSource {
    async fn fetch(&self, branch: &BranchId) -> Result<Vec<Notice>, SourceError> {
        let gate = {
            let mut script = self.script.lock().unwrap();
            *script.fetches.entry(branch.clone()).or_default() += 1;
            script.gate.clone()
        };
        if let Some(gate) = gate {
            // A closed gate means released.
            let _ = gate.acquire().await;
        }

        let mut script = self.script.lock().unwrap();
        if let Some(error) = script.failures.get_mut(branch).and_then(VecDeque::pop_front) {
            return Err(error);
        }
        Ok(script.listings.get(branch).cloned().unwrap_or_default())
    }
}

// ==================== Recording sender ====================

type FailureFn = Box<dyn Fn() -> DeliveryError + Send + Sync>;

#[derive(Default)]
struct SenderScript {
    sent: Vec<(SubscriberId, OutboundMessage)>,
    always: BTreeMap<SubscriberId, FailureFn>,
    once: BTreeMap<SubscriberId, VecDeque<DeliveryError>>,
}

/// A [`MessageSender`] that records successful sends and fails on request.
#[derive(Default, Clone)]
pub struct RecordingSender {
    script: Arc<Mutex<SenderScript>>,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails every send to `subscriber` with the error built by `error`.
    pub fn fail_for(
        &self,
        subscriber: SubscriberId,
        error: impl Fn() -> DeliveryError + Send + Sync + 'static,
    ) {
        self.script
            .lock()
            .unwrap()
            .always
            .insert(subscriber, Box::new(error));
    }

    /// Fails the next send to `subscriber` only.
    pub fn fail_once_for(&self, subscriber: SubscriberId, error: DeliveryError) {
        self.script
            .lock()
            .unwrap()
            .once
            .entry(subscriber)
            .or_default()
            .push_back(error);
    }

    /// Every successful send, in order.
    pub fn sent(&self) -> Vec<(SubscriberId, OutboundMessage)> {
        self.script.lock().unwrap().sent.clone()
    }

    /// Texts delivered to `subscriber`, in order.
    pub fn texts_for(&self, subscriber: SubscriberId) -> Vec<String> {
        self.script
            .lock()
            .unwrap()
            .sent
            .iter()
            .filter(|(to, _)| *to == subscriber)
            .map(|(_, message)| message.text.clone())
            .collect()
    }
}

impl MessageSender for RecordingSender {
    async fn send(&self, to: SubscriberId, message: &OutboundMessage) -> Result<(), DeliveryError> {
        let mut script = self.script.lock().unwrap();
        if let Some(error) = script.once.get_mut(&to).and_then(VecDeque::pop_front) {
            return Err(error);
        }
        if let Some(error) = script.always.get(&to) {
            return Err(error());
        }
        script.sent.push((to, message.clone()));
        Ok(())
    }
}
