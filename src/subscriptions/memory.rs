//! In-memory subscription store.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use super::{DirectoryError, SubscriptionDirectory, SubscriptionStore};
use crate::types::{BranchId, SubscriberId};

/// Subscriptions held in a map, lost on restart.
#[derive(Debug, Default)]
pub struct InMemorySubscriptions {
    by_branch: Mutex<BTreeMap<BranchId, BTreeSet<SubscriberId>>>,
}

impl InMemorySubscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<BranchId, BTreeSet<SubscriberId>>>, DirectoryError> {
        self.by_branch.lock().map_err(|_| DirectoryError::Poisoned)
    }
}

impl SubscriptionDirectory for InMemorySubscriptions {
    fn subscribers_of(&self, branch: &BranchId) -> Result<BTreeSet<SubscriberId>, DirectoryError> {
        Ok(self.lock()?.get(branch).cloned().unwrap_or_default())
    }

    fn all_branches(&self) -> Result<Vec<BranchId>, DirectoryError> {
        Ok(self
            .lock()?
            .iter()
            .filter(|(_, subs)| !subs.is_empty())
            .map(|(branch, _)| branch.clone())
            .collect())
    }
}

impl SubscriptionStore for InMemorySubscriptions {
    fn subscribe(&self, subscriber: SubscriberId, branch: &BranchId) -> Result<bool, DirectoryError> {
        Ok(self
            .lock()?
            .entry(branch.clone())
            .or_default()
            .insert(subscriber))
    }

    fn unsubscribe(
        &self,
        subscriber: SubscriberId,
        branch: &BranchId,
    ) -> Result<bool, DirectoryError> {
        let mut map = self.lock()?;
        let removed = map
            .get_mut(branch)
            .is_some_and(|subs| subs.remove(&subscriber));
        map.retain(|_, subs| !subs.is_empty());
        Ok(removed)
    }

    fn unsubscribe_all(&self, subscriber: SubscriberId) -> Result<usize, DirectoryError> {
        let mut map = self.lock()?;
        let mut removed = 0;
        for subs in map.values_mut() {
            if subs.remove(&subscriber) {
                removed += 1;
            }
        }
        map.retain(|_, subs| !subs.is_empty());
        Ok(removed)
    }

    fn branches_of(&self, subscriber: SubscriberId) -> Result<Vec<BranchId>, DirectoryError> {
        Ok(self
            .lock()?
            .iter()
            .filter(|(_, subs)| subs.contains(&subscriber))
            .map(|(branch, _)| branch.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn branch(name: &str) -> BranchId {
        BranchId::parse(name).unwrap()
    }

    #[test]
    fn subscribe_is_idempotent() {
        let store = InMemorySubscriptions::new();
        assert!(store.subscribe(SubscriberId(7), &branch("CSE")).unwrap());
        assert!(!store.subscribe(SubscriberId(7), &branch("CSE")).unwrap());
        assert_eq!(store.subscribers_of(&branch("CSE")).unwrap().len(), 1);
    }

    #[test]
    fn unsubscribe_drops_empty_branches() {
        let store = InMemorySubscriptions::new();
        store.subscribe(SubscriberId(7), &branch("CSE")).unwrap();

        assert!(store.unsubscribe(SubscriberId(7), &branch("CSE")).unwrap());
        assert!(!store.unsubscribe(SubscriberId(7), &branch("CSE")).unwrap());
        assert!(store.all_branches().unwrap().is_empty());
    }

    #[test]
    fn unsubscribe_all_only_touches_one_subscriber() {
        let store = InMemorySubscriptions::new();
        store.subscribe(SubscriberId(1), &branch("CSE")).unwrap();
        store.subscribe(SubscriberId(1), &branch("IT")).unwrap();
        store.subscribe(SubscriberId(2), &branch("IT")).unwrap();

        assert_eq!(store.unsubscribe_all(SubscriberId(1)).unwrap(), 2);

        assert_eq!(store.all_branches().unwrap(), vec![branch("IT")]);
        assert!(store.branches_of(SubscriberId(1)).unwrap().is_empty());
        assert_eq!(store.branches_of(SubscriberId(2)).unwrap(), vec![branch("IT")]);
    }
}
