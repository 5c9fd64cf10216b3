use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

/// A bearer token and the time the service issued it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub value: Arc<str>,
    pub issued_at: DateTime<Utc>,
}

/// Holds the current Schedules Direct token.
///
/// Pure state: every in-flight request reads a cheap `Arc` snapshot, and
/// the write lock is only ever held for the assignment itself, never across
/// I/O. Serializing refreshes is the transport's job.
#[derive(Debug, Default)]
pub struct TokenStore {
    current: RwLock<Option<Token>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the token value, if any.
    pub fn token(&self) -> Option<Arc<str>> {
        self.current.read().as_ref().map(|t| t.value.clone())
    }

    /// Snapshot of the token with its timestamp.
    pub fn snapshot(&self) -> Option<Token> {
        self.current.read().clone()
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.current.read().as_ref().map(|t| t.issued_at)
    }

    pub fn is_empty(&self) -> bool {
        self.current.read().is_none()
    }

    /// Replace the token. An empty value clears the store.
    pub fn set(&self, value: &str, issued_at: DateTime<Utc>) {
        let next = if value.is_empty() {
            None
        } else {
            Some(Token {
                value: Arc::from(value),
                issued_at,
            })
        };
        *self.current.write() = next;
    }

    pub fn clear(&self) {
        *self.current.write() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_starts_empty() {
        let store = TokenStore::new();
        assert!(store.is_empty());
        assert!(store.token().is_none());
        assert!(store.issued_at().is_none());
    }

    #[test]
    fn test_set_replace_and_clear() {
        let store = TokenStore::new();
        let t0 = Utc::now();
        store.set("abc123", t0);
        assert_eq!(store.token().as_deref(), Some("abc123"));
        assert_eq!(store.issued_at(), Some(t0));

        let snapshot = store.token();
        store.set("def456", t0);
        // Earlier snapshots are unaffected by later writes.
        assert_eq!(snapshot.as_deref(), Some("abc123"));
        assert_eq!(store.token().as_deref(), Some("def456"));

        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn test_empty_value_clears() {
        let store = TokenStore::new();
        store.set("abc123", Utc::now());
        store.set("", Utc::now());
        assert!(store.is_empty());
    }
}
