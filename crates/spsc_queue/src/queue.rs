//! Bounded SPSC queue over a lock-free ring buffer.
//!
//! Storage is a `ringbuf::HeapRb` split into its producer and consumer
//! halves; index publication uses acquire/release ordering inside ringbuf.
//! A small shared block tracks totals and whether the producer is gone.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use ringbuf::{traits::*, HeapCons, HeapProd, HeapRb};

/// Counters shared by both halves
#[derive(Debug, Default)]
struct Shared {
    written: AtomicU64,
    read: AtomicU64,
    producer_closed: AtomicBool,
}

/// Snapshot of queue counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueStats {
    pub capacity: usize,
    pub approx_size: usize,
    pub written: u64,
    pub read: u64,
}

/// Create a bounded queue with room for `capacity` items.
///
/// # Panics
/// If `capacity` is zero.
pub fn bounded<T>(capacity: usize) -> (QueueProducer<T>, QueueConsumer<T>) {
    assert!(capacity > 0, "queue capacity must be > 0");

    let (prod, cons) = HeapRb::<T>::new(capacity).split();
    let shared = Arc::new(Shared::default());

    (
        QueueProducer {
            inner: prod,
            shared: Arc::clone(&shared),
            capacity,
        },
        QueueConsumer {
            inner: cons,
            shared,
            capacity,
        },
    )
}

/// Writing half. Dropping it marks the stream as finished.
pub struct QueueProducer<T> {
    inner: HeapProd<T>,
    shared: Arc<Shared>,
    capacity: usize,
}

impl<T> QueueProducer<T> {
    /// Store `item` if there is room, otherwise hand it back unchanged.
    #[inline]
    pub fn try_write(&mut self, item: T) -> Result<(), T> {
        self.inner.try_push(item)?;
        self.shared.written.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Best-effort occupancy, for diagnostics only
    #[inline]
    pub fn approx_size(&self) -> usize {
        self.inner.occupied_len()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.inner.is_full()
    }

    pub fn stats(&self) -> QueueStats {
        stats(&self.shared, self.capacity, self.approx_size())
    }
}

impl<T> Drop for QueueProducer<T> {
    fn drop(&mut self) {
        self.shared.producer_closed.store(true, Ordering::Release);
    }
}

impl<T> fmt::Debug for QueueProducer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueProducer")
            .field("len", &self.approx_size())
            .field("capacity", &self.capacity)
            .finish()
    }
}

/// Reading half.
pub struct QueueConsumer<T> {
    inner: HeapCons<T>,
    shared: Arc<Shared>,
    capacity: usize,
}

impl<T> QueueConsumer<T> {
    /// Remove the oldest item, if any.
    #[inline]
    pub fn try_read(&mut self) -> Option<T> {
        let item = self.inner.try_pop()?;
        self.shared.read.fetch_add(1, Ordering::Relaxed);
        Some(item)
    }

    /// Best-effort occupancy, for diagnostics only
    #[inline]
    pub fn approx_size(&self) -> usize {
        self.inner.occupied_len()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// True once the producer has been dropped.
    ///
    /// Items written before the drop stay readable; check `is_empty` (or
    /// `try_read` once more) before concluding the stream is over.
    #[inline]
    pub fn is_producer_closed(&self) -> bool {
        self.shared.producer_closed.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> QueueStats {
        stats(&self.shared, self.capacity, self.approx_size())
    }
}

impl<T> fmt::Debug for QueueConsumer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueConsumer")
            .field("len", &self.approx_size())
            .field("capacity", &self.capacity)
            .field("producer_closed", &self.is_producer_closed())
            .finish()
    }
}

fn stats(shared: &Shared, capacity: usize, approx_size: usize) -> QueueStats {
    QueueStats {
        capacity,
        approx_size,
        written: shared.written.load(Ordering::Relaxed),
        read: shared.read.load(Ordering::Relaxed),
    }
}
