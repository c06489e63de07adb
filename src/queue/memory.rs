//! In-memory queue client.
//!
//! Records every physical submission instead of talking to a broker. Messages
//! are kept in memory and lost on restart; useful for tests and local runs
//! (`queue.url = "memory://"`).

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use uuid::Uuid;

use super::client::{
    BatchAck, BatchEntry, BatchEntryFailure, MessageAck, OutboundMessage, QueueClient, QueueError,
};

#[derive(Default)]
struct Recorded {
    single: Vec<OutboundMessage>,
    batches: Vec<Vec<BatchEntry>>,
}

/// In-memory [`QueueClient`] with optional failure injection
#[derive(Default)]
pub struct MemoryQueueClient {
    recorded: Mutex<Recorded>,
    attempted_batches: AtomicUsize,
    fail_single: AtomicBool,
    failing_batches: Mutex<HashSet<usize>>,
    rejected_entries: Mutex<HashSet<(usize, String)>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryQueueClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages accepted through `submit_message`
    pub fn single_messages(&self) -> Vec<OutboundMessage> {
        lock(&self.recorded).single.clone()
    }

    /// Batch calls that reached the transport, in submission order
    pub fn batches(&self) -> Vec<Vec<BatchEntry>> {
        lock(&self.recorded).batches.clone()
    }

    /// Every recorded message body, single and batched, in order
    pub fn message_bodies(&self) -> Vec<String> {
        let recorded = lock(&self.recorded);
        recorded
            .single
            .iter()
            .map(|m| m.body.clone())
            .chain(
                recorded
                    .batches
                    .iter()
                    .flatten()
                    .map(|e| e.message.body.clone()),
            )
            .collect()
    }

    /// Number of batch calls made, including failed ones
    pub fn attempted_batches(&self) -> usize {
        self.attempted_batches.load(Ordering::SeqCst)
    }

    /// Make every `submit_message` call fail
    pub fn fail_single_messages(&self, fail: bool) {
        self.fail_single.store(fail, Ordering::SeqCst);
    }

    /// Make the batch call with the given 0-based index fail at transport level
    pub fn fail_batch(&self, batch_index: usize) {
        lock(&self.failing_batches).insert(batch_index);
    }

    /// Reject a single entry of the given batch call
    pub fn reject_entry(&self, batch_index: usize, entry_id: &str) {
        lock(&self.rejected_entries).insert((batch_index, entry_id.to_string()));
    }
}

#[async_trait]
impl QueueClient for MemoryQueueClient {
    async fn submit_message(&self, message: OutboundMessage) -> Result<MessageAck, QueueError> {
        if self.fail_single.load(Ordering::SeqCst) {
            return Err(QueueError::Transport("memory queue unavailable".to_string()));
        }

        lock(&self.recorded).single.push(message);
        Ok(MessageAck {
            message_id: Some(Uuid::new_v4().to_string()),
        })
    }

    async fn submit_message_batch(&self, entries: Vec<BatchEntry>) -> Result<BatchAck, QueueError> {
        let batch_index = self.attempted_batches.fetch_add(1, Ordering::SeqCst);

        if lock(&self.failing_batches).contains(&batch_index) {
            return Err(QueueError::Transport(format!(
                "memory queue unavailable for batch {}",
                batch_index
            )));
        }

        let rejected = lock(&self.rejected_entries);
        let mut ack = BatchAck::default();
        for entry in &entries {
            if rejected.contains(&(batch_index, entry.id.clone())) {
                ack.failed.push(BatchEntryFailure {
                    entry_id: entry.id.clone(),
                    code: "InternalError".to_string(),
                    message: Some("rejected by memory queue".to_string()),
                });
            } else {
                ack.successful.push(entry.id.clone());
            }
        }
        drop(rejected);

        tracing::debug!(
            batch_index,
            accepted = ack.successful.len(),
            rejected = ack.failed.len(),
            "Batch recorded in memory queue"
        );

        lock(&self.recorded).batches.push(entries);
        Ok(ack)
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
