// packages/recorder/src/recording/ingest.rs
//! Child-process event ingestion
//!
//! Child processes report events as batches. Batches can be handed to the
//! recorder directly or sent through a [`ChildEventInbox`], which the
//! recorder drains in receipt order. The inbox is bounded; batches that do
//! not fit, or arrive while the recorder is torn down, are refused and
//! counted.

use crate::recording::event_queue::ExtraEntry;
use crate::recording::process::ProcessId;
use crossbeam_channel::{bounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use std::mem::size_of;
use std::ops::AddAssign;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::trace;

/// An event as reported by a child process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildEventData {
    /// Milliseconds on the child's monotonic clock
    pub timestamp_ms: u64,
    pub category: String,
    pub method: String,
    pub object: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub extra: Vec<ExtraEntry>,
}

impl ChildEventData {
    pub fn new(
        timestamp_ms: u64,
        category: impl Into<String>,
        method: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            timestamp_ms,
            category: category.into(),
            method: method.into(),
            object: object.into(),
            value: None,
            extra: Vec::new(),
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.push(ExtraEntry::new(key, value));
        self
    }
}

/// Coarse outcome of ingesting one or more batches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchResult {
    pub accepted: usize,
    pub rejected: usize,
    pub overflowed: usize,
}

/// Summary of a [`BatchResult`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    Empty,
    AllAccepted,
    Partial,
    NoneAccepted,
}

impl BatchResult {
    /// Events seen, whatever their outcome
    pub fn total(&self) -> usize {
        self.accepted + self.rejected + self.overflowed
    }

    pub fn status(&self) -> BatchStatus {
        match (self.accepted, self.total()) {
            (_, 0) => BatchStatus::Empty,
            (a, t) if a == t => BatchStatus::AllAccepted,
            (0, _) => BatchStatus::NoneAccepted,
            _ => BatchStatus::Partial,
        }
    }
}

impl AddAssign for BatchResult {
    fn add_assign(&mut self, other: Self) {
        self.accepted += other.accepted;
        self.rejected += other.rejected;
        self.overflowed += other.overflowed;
    }
}

/// A batch of events sent by one child process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildEventBatch {
    pub process: ProcessId,
    pub events: Vec<ChildEventData>,
}

impl ChildEventBatch {
    pub(crate) fn heap_size(&self) -> usize {
        self.events.capacity() * size_of::<ChildEventData>()
            + self
                .events
                .iter()
                .map(|e| {
                    e.category.capacity()
                        + e.method.capacity()
                        + e.object.capacity()
                        + e.value.as_ref().map_or(0, String::capacity)
                        + e.extra.capacity() * size_of::<ExtraEntry>()
                        + e.extra
                            .iter()
                            .map(|x| x.key.capacity() + x.value.capacity())
                            .sum::<usize>()
                })
                .sum::<usize>()
    }
}

/// State shared between the inbox and its senders
#[derive(Debug, Default)]
struct InboxShared {
    accepting: AtomicBool,
    refused: AtomicU64,
    pending_bytes: AtomicUsize,
}

/// Cloneable handle child-side code uses to report batches
#[derive(Debug, Clone)]
pub struct ChildEventSender {
    sender: Sender<ChildEventBatch>,
    shared: Arc<InboxShared>,
}

impl ChildEventSender {
    /// Queue a batch for ingestion. Returns false, and counts the batch as
    /// refused, if the inbox is full or not accepting.
    pub fn send(&self, process: ProcessId, events: Vec<ChildEventData>) -> bool {
        if !self.shared.accepting.load(Ordering::Acquire) {
            self.refuse(process, "inbox closed");
            return false;
        }

        let batch = ChildEventBatch { process, events };
        let bytes = size_of::<ChildEventBatch>() + batch.heap_size();
        self.shared.pending_bytes.fetch_add(bytes, Ordering::AcqRel);

        match self.sender.try_send(batch) {
            Ok(()) => true,
            Err(e) => {
                self.shared.pending_bytes.fetch_sub(bytes, Ordering::AcqRel);
                let reason = if e.is_full() { "inbox full" } else { "inbox gone" };
                self.refuse(process, reason);
                false
            }
        }
    }

    fn refuse(&self, process: ProcessId, reason: &'static str) {
        self.shared.refused.fetch_add(1, Ordering::Relaxed);
        crate::observability::record_refused_batch();
        trace!("Refused child batch from {}: {}", process, reason);
    }
}

/// Receiving end of the bounded child-event channel
#[derive(Debug)]
pub struct ChildEventInbox {
    sender: Sender<ChildEventBatch>,
    receiver: Receiver<ChildEventBatch>,
    shared: Arc<InboxShared>,
}

impl ChildEventInbox {
    /// Open inbox holding at most `capacity` pending batches
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        let shared = Arc::new(InboxShared {
            accepting: AtomicBool::new(true),
            ..InboxShared::default()
        });
        Self {
            sender,
            receiver,
            shared,
        }
    }

    /// New sender sharing this inbox
    pub fn sender(&self) -> ChildEventSender {
        ChildEventSender {
            sender: self.sender.clone(),
            shared: self.shared.clone(),
        }
    }

    /// Start or stop accepting batches. Already queued batches stay queued.
    pub fn set_accepting(&self, accepting: bool) {
        self.shared.accepting.store(accepting, Ordering::Release);
    }

    /// Whether sends are currently accepted
    pub fn is_accepting(&self) -> bool {
        self.shared.accepting.load(Ordering::Acquire)
    }

    /// Batches waiting to be ingested
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    /// Bytes held by pending batches
    pub fn pending_bytes(&self) -> usize {
        self.shared.pending_bytes.load(Ordering::Acquire)
    }

    /// Batches refused since the last reset
    pub fn refused(&self) -> u64 {
        self.shared.refused.load(Ordering::Relaxed)
    }

    /// Zero the refused-batch count
    pub fn reset_refused(&self) {
        self.shared.refused.store(0, Ordering::Relaxed);
    }

    /// Pending batches in receipt order, without blocking
    pub fn drain(&self) -> impl Iterator<Item = ChildEventBatch> + '_ {
        self.receiver.try_iter().map(|batch| {
            let bytes = size_of::<ChildEventBatch>() + batch.heap_size();
            self.shared.pending_bytes.fetch_sub(bytes, Ordering::AcqRel);
            batch
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_status() {
        let mut result = BatchResult::default();
        assert_eq!(result.status(), BatchStatus::Empty);

        result += BatchResult { accepted: 2, rejected: 0, overflowed: 0 };
        assert_eq!(result.status(), BatchStatus::AllAccepted);

        result += BatchResult { accepted: 0, rejected: 1, overflowed: 1 };
        assert_eq!(result.status(), BatchStatus::Partial);
        assert_eq!(result.total(), 4);

        let none = BatchResult { accepted: 0, rejected: 3, overflowed: 0 };
        assert_eq!(none.status(), BatchStatus::NoneAccepted);
    }

    #[test]
    fn test_inbox_preserves_receipt_order() {
        let inbox = ChildEventInbox::new(8);
        let content = inbox.sender();
        let gpu = inbox.sender();

        assert!(content.send(ProcessId::Content, vec![ChildEventData::new(1, "a", "b", "c")]));
        assert!(gpu.send(ProcessId::Gpu, vec![]));
        assert!(content.send(ProcessId::Content, vec![]));
        assert_eq!(inbox.pending(), 3);

        let order: Vec<_> = inbox.drain().map(|b| b.process).collect();
        assert_eq!(order, vec![ProcessId::Content, ProcessId::Gpu, ProcessId::Content]);
        assert_eq!(inbox.pending(), 0);
        assert_eq!(inbox.pending_bytes(), 0);
    }

    #[test]
    fn test_full_inbox_refuses_and_counts() {
        let inbox = ChildEventInbox::new(2);
        let sender = inbox.sender();
        let batch = || vec![ChildEventData::new(1, "a", "b", "c").with_value("x".repeat(80))];

        assert!(sender.send(ProcessId::Content, batch()));
        assert!(sender.send(ProcessId::Content, batch()));
        assert!(!sender.send(ProcessId::Content, batch()));
        assert_eq!(inbox.pending(), 2);
        assert_eq!(inbox.refused(), 1);
        assert!(inbox.pending_bytes() > 160);

        assert_eq!(inbox.drain().count(), 2);
        assert_eq!(inbox.pending_bytes(), 0);
        assert!(sender.send(ProcessId::Content, batch()));
    }

    #[test]
    fn test_closed_inbox_refuses() {
        let inbox = ChildEventInbox::new(4);
        let sender = inbox.sender();
        inbox.set_accepting(false);

        assert!(!sender.send(ProcessId::Gpu, vec![]));
        assert_eq!(inbox.pending(), 0);
        assert_eq!(inbox.refused(), 1);

        inbox.set_accepting(true);
        assert!(sender.send(ProcessId::Gpu, vec![]));
        inbox.reset_refused();
        assert_eq!(inbox.refused(), 0);
    }
}
