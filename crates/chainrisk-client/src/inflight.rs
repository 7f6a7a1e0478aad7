//! Per-control loading flag.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

/// At most one outstanding request per control. While one is running,
/// further submissions are dropped.
#[derive(Debug, Default)]
pub struct ActionSlot {
    busy: AtomicBool,
}

struct Release<'a>(&'a AtomicBool);

impl Drop for Release<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ActionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loading(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Run `action` unless the slot is busy, in which case it is not
    /// polled and `None` is returned.
    pub async fn run<F, T>(&self, action: F) -> Option<T>
    where
        F: Future<Output = T>,
    {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }
        let _release = Release(&self.busy);
        Some(action.await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_second_submit_is_noop() {
        let slot = ActionSlot::new();
        let (tx, rx) = oneshot::channel::<u32>();

        let first = slot.run(async { rx.await.unwrap() });
        let second = async {
            assert!(slot.is_loading());
            let skipped = slot.run(async { 99 }).await;
            tx.send(7).unwrap();
            skipped
        };

        let (first, second) = tokio::join!(first, second);
        assert_eq!(first, Some(7));
        assert_eq!(second, None);
        assert!(!slot.is_loading());
    }

    #[tokio::test]
    async fn test_slot_released_after_completion() {
        let slot = ActionSlot::new();
        assert_eq!(slot.run(async { 1 }).await, Some(1));
        assert_eq!(slot.run(async { 2 }).await, Some(2));
    }
}
