use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use common::words;
use serde::{Deserialize, Serialize};

/// A pending song request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    /// The user who requested the song.
    #[serde(rename = "username")]
    pub user: String,
    /// The sanitized request text.
    #[serde(rename = "songName")]
    pub request: String,
    /// When the request was made.
    #[serde(rename = "timestamp")]
    pub added_at: DateTime<Utc>,
    /// How many times the entry has been moved to the back of the queue.
    /// Only counted while a requeue limit is configured.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub failures: u32,
}

impl QueueEntry {
    /// Construct a new entry for an already sanitized request.
    pub fn new(user: impl Into<String>, request: impl Into<String>, added_at: DateTime<Utc>) -> Self {
        Self {
            user: user.into(),
            request: request.into(),
            added_at,
            failures: 0,
        }
    }

    /// The normalized request text, which identifies the entry in the queue.
    pub fn key(&self) -> String {
        words::normalize(&self.request)
    }
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

/// An ordered queue of song requests where no two entries share a key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Queue {
    entries: VecDeque<QueueEntry>,
}

impl Queue {
    /// Construct a new empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a queue from the given entries, dropping any entry whose key is
    /// already present.
    pub fn from_entries(entries: impl IntoIterator<Item = QueueEntry>) -> Self {
        let mut queue = Self::new();

        for entry in entries {
            if let Err(position) = queue.push_back(entry) {
                tracing::warn!("Dropping duplicate of entry at position #{}", position + 1);
            }
        }

        queue
    }

    /// Number of entries in the queue.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Test if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries, front to back.
    pub fn iter(&self) -> impl Iterator<Item = &QueueEntry> {
        self.entries.iter()
    }

    /// Get the head of the queue.
    pub fn front(&self) -> Option<&QueueEntry> {
        self.entries.front()
    }

    /// Get the entry at the given zero-based index.
    pub fn get(&self, index: usize) -> Option<&QueueEntry> {
        self.entries.get(index)
    }

    /// Find the zero-based position of the entry with the given key.
    pub fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.key() == key)
    }

    /// Count the entries requested by the given user.
    pub fn count_by(&self, user: &str) -> usize {
        self.entries.iter().filter(|e| e.user == user).count()
    }

    /// Append an entry, returning its zero-based position.
    ///
    /// Fails with the position of the existing entry if one with the same
    /// key is already queued.
    pub fn push_back(&mut self, entry: QueueEntry) -> Result<usize, usize> {
        if let Some(position) = self.position(&entry.key()) {
            return Err(position);
        }

        self.entries.push_back(entry);
        Ok(self.entries.len() - 1)
    }

    /// Remove the entry with the given key.
    pub fn remove_key(&mut self, key: &str) -> Option<QueueEntry> {
        let position = self.position(key)?;
        self.entries.remove(position)
    }

    /// Remove the entry at the given zero-based index.
    pub fn remove_at(&mut self, index: usize) -> Option<QueueEntry> {
        self.entries.remove(index)
    }

    /// Move the entry with the given key to the back of the queue, counting
    /// the failure against it if `count_failure` is set.
    ///
    /// Returns the failure count of the entry, or `None` if no such entry
    /// exists.
    pub fn requeue(&mut self, key: &str, count_failure: bool) -> Option<u32> {
        let mut entry = self.remove_key(key)?;

        if count_failure {
            entry.failures = entry.failures.saturating_add(1);
        }

        let failures = entry.failures;
        self.entries.push_back(entry);
        Some(failures)
    }

    /// Remove all entries, returning how many there were.
    pub fn clear(&mut self) -> usize {
        let len = self.entries.len();
        self.entries.clear();
        len
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{Queue, QueueEntry};

    fn entry(user: &str, request: &str) -> QueueEntry {
        QueueEntry::new(user, request, Utc::now())
    }

    fn requests(queue: &Queue) -> Vec<&str> {
        queue.iter().map(|e| e.request.as_str()).collect()
    }

    #[test]
    fn test_push_back_rejects_same_key() {
        let mut queue = Queue::new();
        assert_eq!(queue.push_back(entry("alice", "Don't Stop Me Now")), Ok(0));
        assert_eq!(queue.push_back(entry("bob", "Under Pressure")), Ok(1));
        assert_eq!(queue.push_back(entry("carol", "dont stop me now!")), Err(0));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_requeue_moves_to_back() {
        let mut queue = Queue::from_entries([entry("a", "one"), entry("b", "two"), entry("c", "three")]);

        assert_eq!(queue.requeue("one", true), Some(1));
        assert_eq!(requests(&queue), vec!["two", "three", "one"]);
        assert_eq!(queue.get(2).map(|e| e.failures), Some(1));
        assert_eq!(queue.requeue("missing", true), None);
    }

    #[test]
    fn test_requeue_without_counting() {
        let mut queue = Queue::from_entries([entry("a", "one"), entry("b", "two")]);
        let before = queue.clone();

        assert_eq!(queue.requeue("one", false), Some(0));
        assert_eq!(requests(&queue), vec!["two", "one"]);

        assert_eq!(queue.requeue("two", false), Some(0));
        assert_eq!(queue, before);
    }

    #[test]
    fn test_from_entries_drops_duplicates() {
        let queue = Queue::from_entries([entry("a", "One"), entry("b", "one."), entry("c", "two")]);
        assert_eq!(requests(&queue), vec!["One", "two"]);
    }

    #[test]
    fn test_count_by() {
        let queue = Queue::from_entries([entry("a", "one"), entry("b", "two"), entry("a", "three")]);
        assert_eq!(queue.count_by("a"), 2);
        assert_eq!(queue.count_by("z"), 0);
    }
}
