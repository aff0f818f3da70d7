//! Issue fingerprints and the bounded store that remembers them

use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

/// Content fingerprint of a detected issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IssueHash([u8; 32]);

impl IssueHash {
    /// Hash the normalized reason together with the first `prefix_chars`
    /// characters of the normalized request.
    pub fn compute(reason: &str, user_request: &str, prefix_chars: usize) -> Self {
        let request_prefix: String = normalize(user_request).chars().take(prefix_chars).collect();

        let mut hasher = Sha256::new();
        hasher.update(normalize(reason).as_bytes());
        hasher.update([0u8]);
        hasher.update(request_prefix.as_bytes());
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&hasher.finalize());
        Self(bytes)
    }
}

impl std::fmt::Display for IssueHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Lowercase and collapse whitespace
fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Set of already-routed issues.
pub trait DedupStore: Send + Sync {
    /// Record `hash`. Returns `false` if it was already present.
    /// Check, insert and any eviction happen as one atomic step.
    fn insert_if_new(&self, hash: IssueHash) -> bool;

    fn contains(&self, hash: &IssueHash) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&self);
}

/// Fixed-capacity store that empties itself completely once it grows past
/// `capacity`. No per-entry eviction.
pub struct BoundedHashStore {
    capacity: usize,
    seen: Mutex<HashSet<IssueHash>>,
}

impl BoundedHashStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            seen: Mutex::new(HashSet::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl DedupStore for BoundedHashStore {
    fn insert_if_new(&self, hash: IssueHash) -> bool {
        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        if !seen.insert(hash) {
            return false;
        }
        if seen.len() > self.capacity {
            tracing::debug!(
                capacity = self.capacity(),
                "Dedup store over capacity, clearing"
            );
            seen.clear();
        }
        true
    }

    fn contains(&self, hash: &IssueHash) -> bool {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(hash)
    }

    fn len(&self) -> usize {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn clear(&self) {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}
