//! Inbound event deduplication.
//!
//! The store's unique `(customer_id, channel_timestamp)` index is the
//! authoritative guard. The check here is a fast path: an in-memory set of
//! recently handled keys, then a store lookup for timestamped events.
//! Events without a timestamp are keyed by truncated content and only
//! deduplicated within one run.

use std::sync::Mutex;

use database::{message, Database, DatabaseError};
use indexmap::IndexSet;

/// Characters of message content used when no timestamp is available.
const CONTENT_KEY_CHARS: usize = 100;

/// Identity of an inbound event for dedup purposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DedupKey {
    Timestamp { customer_id: String, timestamp: String },
    Content { customer_id: String, content: String },
}

impl DedupKey {
    pub fn new(customer_id: &str, channel_timestamp: Option<&str>, text: &str) -> Self {
        match channel_timestamp.map(str::trim).filter(|t| !t.is_empty()) {
            Some(timestamp) => DedupKey::Timestamp {
                customer_id: customer_id.to_string(),
                timestamp: timestamp.to_string(),
            },
            None => DedupKey::Content {
                customer_id: customer_id.to_string(),
                content: text.trim().chars().take(CONTENT_KEY_CHARS).collect(),
            },
        }
    }
}

/// Remembers handled events.
#[derive(Debug)]
pub struct Deduplicator {
    seen: Mutex<IndexSet<DedupKey>>,
    capacity: usize,
}

impl Deduplicator {
    pub fn new(capacity: usize) -> Self {
        Self {
            seen: Mutex::new(IndexSet::new()),
            capacity: capacity.max(1),
        }
    }

    /// Whether this event was already processed.
    pub async fn is_processed(&self, db: &Database, key: &DedupKey) -> Result<bool, DatabaseError> {
        if self.seen(key) {
            return Ok(true);
        }
        match key {
            DedupKey::Timestamp { customer_id, timestamp } => {
                message::user_message_exists(db.pool(), customer_id, timestamp).await
            }
            DedupKey::Content { .. } => Ok(false),
        }
    }

    /// Record a key once its message is persisted. Oldest keys are evicted first.
    pub fn remember(&self, key: DedupKey) {
        if let Ok(mut seen) = self.seen.lock() {
            seen.shift_remove(&key);
            seen.insert(key);
            while seen.len() > self.capacity {
                seen.shift_remove_index(0);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.seen.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn seen(&self, key: &DedupKey) -> bool {
        self.seen.lock().map(|s| s.contains(key)).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use database::NewMessage;

    #[test]
    fn test_key_prefers_timestamp() {
        let key = DedupKey::new("maria", Some(" 100 "), "Привіт");
        assert_eq!(
            key,
            DedupKey::Timestamp {
                customer_id: "maria".into(),
                timestamp: "100".into()
            }
        );

        let long = "а".repeat(500);
        match DedupKey::new("maria", Some(""), &long) {
            DedupKey::Content { content, .. } => assert_eq!(content.chars().count(), 100),
            other => panic!("expected content key, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_store_is_consulted_for_timestamps() {
        let db = Database::in_memory().await.unwrap();
        message::insert_user_message(
            db.pool(),
            &NewMessage {
                customer_id: "maria".into(),
                content: "Привіт".into(),
                display_name: None,
                channel_timestamp: Some("100".into()),
            },
        )
        .await
        .unwrap();

        let dedup = Deduplicator::new(10);
        assert!(dedup
            .is_processed(&db, &DedupKey::new("maria", Some("100"), "x"))
            .await
            .unwrap());
        assert!(!dedup
            .is_processed(&db, &DedupKey::new("maria", Some("101"), "x"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_content_keys_are_memory_only() {
        let db = Database::in_memory().await.unwrap();
        let dedup = Deduplicator::new(10);
        let key = DedupKey::new("maria", None, "Привіт");

        assert!(!dedup.is_processed(&db, &key).await.unwrap());
        dedup.remember(key.clone());
        assert!(dedup.is_processed(&db, &key).await.unwrap());
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let dedup = Deduplicator::new(2);
        dedup.remember(DedupKey::new("a", None, "1"));
        dedup.remember(DedupKey::new("a", None, "2"));
        dedup.remember(DedupKey::new("a", None, "3"));

        assert_eq!(dedup.len(), 2);
        assert!(!dedup.seen(&DedupKey::new("a", None, "1")));
        assert!(dedup.seen(&DedupKey::new("a", None, "3")));
    }
}
