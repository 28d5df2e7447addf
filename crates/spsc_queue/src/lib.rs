//! # SPSC Queue
//!
//! Bounded single-producer/single-consumer transport between pipeline
//! threads.
//!
//! - `try_write` / `try_read` never block; a full or empty queue is a normal
//!   state, not an error
//! - each half is `Send` and not `Clone`, so exactly one thread owns each end
//! - blocking behaviour is layered on top through a [`RetryPolicy`]
//!
//! ## Usage
//!
//! ```
//! use spsc_queue::bounded;
//!
//! let (mut tx, mut rx) = bounded::<u64>(2);
//! assert!(tx.try_write(1).is_ok());
//! assert!(tx.try_write(2).is_ok());
//! assert_eq!(tx.try_write(3), Err(3));
//! assert_eq!(rx.try_read(), Some(1));
//! ```

mod queue;
mod retry;

pub use queue::{bounded, QueueConsumer, QueueProducer, QueueStats};
pub use retry::{read_with_retry, write_with_retry, Backoff, Cancelled, ReadOutcome, RetryPolicy};
