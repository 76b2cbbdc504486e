use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;

use crate::models::{Affinity, PreferenceSignal};

/// In-memory per-user preference signals
///
/// Each user's signals keep insertion order; an upsert for an existing item
/// updates it in place.
#[derive(Default)]
pub struct PreferenceStore {
    signals: RwLock<HashMap<String, Vec<PreferenceSignal>>>,
}

impl PreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a signal, or overwrites affinity and update time if the item is already rated
    pub async fn upsert(&self, user: &str, item: &str, affinity: Affinity) -> PreferenceSignal {
        let mut signals = self.signals.write().await;
        let user_signals = signals.entry(user.to_string()).or_default();

        if let Some(existing) = user_signals.iter_mut().find(|s| s.item == item) {
            existing.affinity = affinity;
            existing.updated_at = Utc::now();
            return existing.clone();
        }

        let signal = PreferenceSignal::new(user, item, affinity);
        user_signals.push(signal.clone());
        signal
    }

    /// Removes a signal; returns whether one existed
    pub async fn clear(&self, user: &str, item: &str) -> bool {
        let mut signals = self.signals.write().await;
        let Some(user_signals) = signals.get_mut(user) else {
            return false;
        };

        let before = user_signals.len();
        user_signals.retain(|s| s.item != item);
        let removed = user_signals.len() != before;

        if user_signals.is_empty() {
            signals.remove(user);
        }

        removed
    }

    pub async fn list(&self, user: &str) -> Vec<PreferenceSignal> {
        self.signals
            .read()
            .await
            .get(user)
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_new_store_is_empty() {
        let store = PreferenceStore::new();
        assert!(store.list("u1").await.is_empty());
    }

    #[tokio::test]
    async fn test_upsert_keeps_insertion_order() {
        let store = PreferenceStore::new();
        store.upsert("u1", "Arrival", Affinity::Strong).await;
        store.upsert("u1", "Heat", Affinity::Low).await;

        let items: Vec<String> = store.list("u1").await.into_iter().map(|s| s.item).collect();
        assert_eq!(items, vec!["Arrival", "Heat"]);
    }

    #[tokio::test]
    async fn test_upsert_overwrites_in_place() {
        let store = PreferenceStore::new();
        let first = store.upsert("u1", "Arrival", Affinity::Low).await;
        store.upsert("u1", "Heat", Affinity::Moderate).await;
        let second = store.upsert("u1", "Arrival", Affinity::Strong).await;

        let signals = store.list("u1").await;
        assert_eq!(signals.len(), 2);
        assert_eq!(signals[0].item, "Arrival");
        assert_eq!(signals[0].affinity, Affinity::Strong);
        assert!(second.updated_at >= first.updated_at);
    }

    #[tokio::test]
    async fn test_users_are_isolated() {
        let store = PreferenceStore::new();
        store.upsert("u1", "Arrival", Affinity::Strong).await;
        assert!(store.list("u2").await.is_empty());
    }

    #[tokio::test]
    async fn test_clear() {
        let store = PreferenceStore::new();
        store.upsert("u1", "Arrival", Affinity::Strong).await;

        assert!(store.clear("u1", "Arrival").await);
        assert!(!store.clear("u1", "Arrival").await);
        assert!(store.list("u1").await.is_empty());
    }
}
