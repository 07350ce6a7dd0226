//! Per-product mutation locks.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use bazaar_core::ProductId;

/// Serializes mutations of the same product while leaving different
/// products independent.
#[derive(Debug, Default)]
pub struct ProductLocks {
    inflight: Mutex<HashMap<ProductId, Arc<Mutex<()>>>>,
}

impl ProductLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the product's lock. Held until the guard drops.
    pub async fn acquire(&self, product_id: &ProductId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut inflight = self.inflight.lock().await;
            // Locks nobody else references can go
            inflight.retain(|id, lock| id == product_id || Arc::strong_count(lock) > 1);
            Arc::clone(
                inflight
                    .entry(product_id.clone())
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_same_product_is_serialized() {
        let locks = Arc::new(ProductLocks::new());
        let p1 = ProductId::new("p1");

        let guard = locks.acquire(&p1).await;

        let waiter = {
            let locks = Arc::clone(&locks);
            let p1 = p1.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(&p1).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should acquire after release")
            .expect("task should not panic");
    }

    #[tokio::test]
    async fn test_different_products_are_independent() {
        let locks = ProductLocks::new();
        let _a = locks.acquire(&ProductId::new("p1")).await;
        let b = tokio::time::timeout(
            Duration::from_millis(100),
            locks.acquire(&ProductId::new("p2")),
        )
        .await;
        assert!(b.is_ok());
    }
}
