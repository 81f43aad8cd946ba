//! Durable job queue for notifications.
//!
//! An immediate FIFO list plus a delayed set ordered by due time, behind the
//! [`QueueBackend`] trait. [`QueueAdapter`] layers envelope encoding, delayed
//! scheduling, promotion and the blocking work loop on top.

pub mod adapter;
pub mod clock;
pub mod envelope;
pub mod error;
pub mod memory;
pub mod redis;
pub mod traits;

pub use adapter::{
    DEFAULT_BLOCK_TIMEOUT, DEFAULT_PROMOTE_BATCH_SIZE, DequeueConfig, EnqueueOptions, ErrorHook,
    JobHook, QueueAdapter, WorkerConfig, WorkerState,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use envelope::Envelope;
pub use error::QueueError;
pub use memory::MemoryQueueBackend;
pub use redis::{RedisPool, RedisQueueBackend};
pub use traits::QueueBackend;
