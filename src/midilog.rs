//! Bounded in-memory log of outbound MIDI traffic
//!
//! Every successful send appends an entry; the buffer keeps the most
//! recent [`LOG_CAPACITY`] entries and evicts the oldest first.

use chrono::{DateTime, Local};
use std::collections::VecDeque;

/// Maximum number of retained entries
pub const LOG_CAPACITY: usize = 100;

/// Category of a log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    Cc,
    NoteOn,
    NoteOff,
    Error,
}

impl LogKind {
    pub fn label(&self) -> &'static str {
        match self {
            LogKind::Cc => "cc",
            LogKind::NoteOn => "note-on",
            LogKind::NoteOff => "note-off",
            LogKind::Error => "error",
        }
    }
}

/// One structured log entry
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub kind: LogKind,
    /// Short human message, e.g. "CC 11 sent"
    pub message: String,
    /// Detail string, e.g. "value: 64"
    pub detail: String,
    pub timestamp: DateTime<Local>,
    /// Monotonically increasing, never reused within a process
    pub id: u64,
}

/// Ring buffer of recent MIDI activity
#[derive(Debug, Default)]
pub struct MidiLog {
    entries: VecDeque<LogEntry>,
    next_id: u64,
}

impl MidiLog {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(LOG_CAPACITY),
            next_id: 0,
        }
    }

    /// Append an entry, evicting the oldest once at capacity
    pub fn push(&mut self, kind: LogKind, message: impl Into<String>, detail: impl Into<String>) {
        if self.entries.len() == LOG_CAPACITY {
            self.entries.pop_front();
        }
        let entry = LogEntry {
            kind,
            message: message.into(),
            detail: detail.into(),
            timestamp: Local::now(),
            id: self.next_id,
        };
        self.next_id += 1;
        self.entries.push_back(entry);
    }

    /// All retained entries, oldest first
    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    /// The most recent `n` entries, oldest first
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &LogEntry> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_read_back() {
        let mut log = MidiLog::new();
        log.push(LogKind::Cc, "CC 1 sent", "value: 64");

        let entry = log.entries().next().unwrap();
        assert_eq!(entry.kind, LogKind::Cc);
        assert_eq!(entry.message, "CC 1 sent");
        assert_eq!(entry.detail, "value: 64");
        assert_eq!(entry.id, 0);
    }

    #[test]
    fn test_capacity_evicts_oldest_first() {
        let mut log = MidiLog::new();
        for i in 0..150u64 {
            log.push(LogKind::Cc, format!("CC {} sent", i), "");
        }

        assert_eq!(log.len(), LOG_CAPACITY);
        let ids: Vec<u64> = log.entries().map(|e| e.id).collect();
        assert_eq!(ids.first(), Some(&50));
        assert_eq!(ids.last(), Some(&149));
    }

    #[test]
    fn test_ids_are_monotonic_across_eviction() {
        let mut log = MidiLog::new();
        for _ in 0..120 {
            log.push(LogKind::NoteOn, "Note 60 on", "velocity: 127");
        }
        let ids: Vec<u64> = log.entries().map(|e| e.id).collect();
        assert!(ids.windows(2).all(|w| w[1] == w[0] + 1));
    }

    #[test]
    fn test_recent_returns_tail() {
        let mut log = MidiLog::new();
        for i in 0..10u64 {
            log.push(LogKind::Cc, format!("CC {} sent", i), "");
        }
        let tail: Vec<u64> = log.recent(3).map(|e| e.id).collect();
        assert_eq!(tail, vec![7, 8, 9]);
    }

    #[test]
    fn test_clear_keeps_id_counter() {
        let mut log = MidiLog::new();
        log.push(LogKind::Cc, "CC 1 sent", "");
        log.clear();
        assert!(log.is_empty());

        log.push(LogKind::Cc, "CC 2 sent", "");
        assert_eq!(log.entries().next().unwrap().id, 1);
    }
}
