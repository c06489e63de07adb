//! Durable queue submission.
//!
//! - `client`: transport seam (`QueueClient`) and message types
//! - `submitter`: envelope serialization, priority delay policy, batching
//! - `batch`: order-preserving batch splitting
//! - `memory` / `sqs`: queue client implementations
//!
//! Use `create_queue_client()` to build the configured client at startup.

mod batch;
mod client;
mod factory;
mod memory;
mod sqs;
mod submitter;

pub use batch::split;
pub use client::{
    BatchAck, BatchEntry, BatchEntryFailure, MessageAck, MessageAttributes, OutboundMessage,
    QueueClient, QueueError,
};
pub use factory::create_queue_client;
pub use memory::MemoryQueueClient;
pub use sqs::SqsQueueClient;
pub use submitter::{outbound_message, QueueSubmissionError, QueueSubmitter, MAX_BATCH_ENTRIES};
