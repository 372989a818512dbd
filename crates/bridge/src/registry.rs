//! In-flight request bookkeeping, keyed by request id.
//!
//! The registry is bounded and explicitly expiring: an insert past the
//! capacity fails instead of evicting, and entries past their deadline are
//! removed by [`PendingRegistry::sweep_expired`] so the matching page
//! promise can be rejected instead of hanging forever.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEntry {
    pub command: String,
    pub deadline: Instant,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("{in_flight} requests already in flight")]
    Overloaded { in_flight: usize },
    #[error("request id {0:?} is already in flight")]
    DuplicateId(String),
}

pub struct PendingRegistry {
    capacity: usize,
    timeout: Duration,
    entries: HashMap<String, PendingEntry>,
}

impl PendingRegistry {
    pub fn new(capacity: usize, timeout: Duration) -> Self {
        Self {
            capacity,
            timeout,
            entries: HashMap::new(),
        }
    }

    /// Registers a request. The entry expires at `now + timeout`.
    pub fn insert(&mut self, id: &str, command: &str, now: Instant) -> Result<(), RegistryError> {
        if self.entries.contains_key(id) {
            return Err(RegistryError::DuplicateId(id.to_string()));
        }
        if self.entries.len() >= self.capacity {
            return Err(RegistryError::Overloaded {
                in_flight: self.entries.len(),
            });
        }
        self.entries.insert(
            id.to_string(),
            PendingEntry {
                command: command.to_string(),
                deadline: now + self.timeout,
            },
        );
        Ok(())
    }

    /// Removes and returns the entry, exactly once. A task that finishes
    /// after the sweeper expired its entry gets `None` and must drop its
    /// result, because the page promise was already rejected.
    pub fn complete(&mut self, id: &str) -> Option<PendingEntry> {
        self.entries.remove(id)
    }

    /// Removes every entry whose deadline has passed and returns them so
    /// the caller can reject the matching page promises.
    pub fn sweep_expired(&mut self, now: Instant) -> Vec<(String, PendingEntry)> {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.deadline <= now)
            .map(|(id, _)| id.clone())
            .collect();

        expired
            .into_iter()
            .filter_map(|id| self.entries.remove(&id).map(|entry| (id, entry)))
            .collect()
    }

    pub fn in_flight(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(capacity: usize) -> PendingRegistry {
        PendingRegistry::new(capacity, Duration::from_millis(500))
    }

    #[test]
    fn insert_then_complete_returns_the_entry_once() {
        let mut registry = registry(4);
        let now = Instant::now();
        registry.insert("req-1", "kernel_name", now).expect("insert");

        let entry = registry.complete("req-1").expect("entry");
        assert_eq!(entry.command, "kernel_name");
        assert_eq!(entry.deadline, now + Duration::from_millis(500));
        assert!(registry.complete("req-1").is_none());
        assert_eq!(registry.in_flight(), 0);
    }

    #[test]
    fn duplicate_id_is_rejected_and_keeps_the_original() {
        let mut registry = registry(4);
        let now = Instant::now();
        registry.insert("req-1", "host_name", now).expect("insert");

        let err = registry.insert("req-1", "user_name", now).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateId("req-1".to_string()));

        let entry = registry.complete("req-1").expect("entry");
        assert_eq!(entry.command, "host_name");
    }

    #[test]
    fn insert_past_capacity_fails_without_evicting() {
        let mut registry = registry(2);
        let now = Instant::now();
        registry.insert("req-1", "echo", now).expect("insert");
        registry.insert("req-2", "echo", now).expect("insert");

        let err = registry.insert("req-3", "echo", now).unwrap_err();
        assert_eq!(err, RegistryError::Overloaded { in_flight: 2 });
        assert_eq!(registry.in_flight(), 2);
        assert!(registry.complete("req-1").is_some());
    }

    #[test]
    fn sweep_removes_only_expired_entries() {
        let mut registry = registry(4);
        let start = Instant::now();
        registry.insert("req-1", "kernel_name", start).expect("insert");
        registry
            .insert("req-2", "host_name", start + Duration::from_millis(400))
            .expect("insert");

        let expired = registry.sweep_expired(start + Duration::from_millis(600));
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].0, "req-1");
        assert_eq!(expired[0].1.command, "kernel_name");

        assert_eq!(registry.in_flight(), 1);
        assert!(registry.complete("req-2").is_some());
    }

    #[test]
    fn expired_entry_cannot_be_completed_afterwards() {
        let mut registry = registry(4);
        let start = Instant::now();
        registry.insert("req-1", "user_name", start).expect("insert");

        let expired = registry.sweep_expired(start + Duration::from_secs(1));
        assert_eq!(expired.len(), 1);
        assert!(registry.complete("req-1").is_none());
    }

    #[test]
    fn sweep_before_deadline_is_a_no_op() {
        let mut registry = registry(4);
        let start = Instant::now();
        registry.insert("req-1", "echo", start).expect("insert");

        assert!(registry.sweep_expired(start + Duration::from_millis(100)).is_empty());
        assert_eq!(registry.in_flight(), 1);
    }
}
