//! CancellationToken - process-wide stop flag

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Write-once stop flag shared by every pipeline thread.
///
/// Set by the interrupt handler (or by the pipeline after a device fault),
/// polled by each loop once per iteration. It never clears.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_cancel_is_sticky() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_clones_observe_cancel_across_threads() {
        let token = CancellationToken::new();
        let observer = token.clone();
        let handle = thread::spawn(move || {
            while !observer.is_cancelled() {
                std::hint::spin_loop();
            }
        });
        token.cancel();
        handle.join().unwrap();
    }
}
