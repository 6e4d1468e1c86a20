//! AI task queue
//!
//! Bounds how many AI CLI processes run at once.

use crate::error::{CoreError, Result};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[derive(Clone)]
pub struct AiTaskQueue {
    semaphore: Arc<Semaphore>,
    max_concurrent: usize,
}

impl AiTaskQueue {
    pub fn new(max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
        }
    }

    /// Wait for a slot; the slot is released when the permit is dropped
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit> {
        self.semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| CoreError::Ai(format!("Failed to acquire AI task permit: {}", e)))
    }

    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }
}

impl Default for AiTaskQueue {
    fn default() -> Self {
        Self::new(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_queue_limits_concurrency() {
        let queue = AiTaskQueue::new(2);

        let first = queue.acquire().await.unwrap();
        let _second = queue.acquire().await.unwrap();
        assert_eq!(queue.available_permits(), 0);

        drop(first);
        assert_eq!(queue.available_permits(), 1);
    }

    #[test]
    fn test_zero_is_clamped() {
        assert_eq!(AiTaskQueue::new(0).max_concurrent(), 1);
    }
}
