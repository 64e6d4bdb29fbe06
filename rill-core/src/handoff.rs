// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! One-slot synchronous rendezvous between a producer and a consumer task.

use tokio::sync::{Mutex, Notify};

/// A single-slot handoff: `offer` parks a value and blocks until a `take`
/// consumes it; `take` blocks until a value is parked.
///
/// The rendezvous keeps a producer from ever running more than one step
/// ahead of its consumer, which is what the two-source coordinators and the
/// debounce/aggregation protocols rely on. Cancellation is cooperative: a
/// caller dropped mid-wait leaves the slot in a consistent state.
pub struct Handoff<T> {
    slot: Mutex<Option<T>>,
    on_put: Notify,
    on_take: Notify,
}

impl<T: Send> Handoff<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            on_put: Notify::new(),
            on_take: Notify::new(),
        }
    }

    /// Parks `value` in the slot and waits until a consumer has taken it.
    pub async fn offer(&self, value: T) {
        let mut pending = Some(value);
        loop {
            {
                let mut slot = self.slot.lock().await;
                if slot.is_none() {
                    *slot = pending.take();
                    break;
                }
            }
            self.on_take.notified().await;
        }
        self.on_put.notify_one();
        // Rendezvous: resume only once the value has actually been taken.
        loop {
            if self.slot.lock().await.is_none() {
                return;
            }
            self.on_take.notified().await;
        }
    }

    /// Waits for a parked value and consumes it.
    pub async fn take(&self) -> T {
        loop {
            {
                let mut slot = self.slot.lock().await;
                if let Some(value) = slot.take() {
                    self.on_take.notify_one();
                    return value;
                }
            }
            self.on_put.notified().await;
        }
    }

    /// Consumes a parked value if one is present, without waiting.
    pub async fn try_take(&self) -> Option<T> {
        let mut slot = self.slot.lock().await;
        let value = slot.take();
        if value.is_some() {
            self.on_take.notify_one();
        }
        value
    }
}

impl<T: Send> Default for Handoff<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn offer_blocks_until_taken() {
        let handoff = Arc::new(Handoff::new());
        let producer = {
            let handoff = Arc::clone(&handoff);
            tokio::spawn(async move {
                handoff.offer(1).await;
                handoff.offer(2).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!producer.is_finished(), "offer must block until taken");

        assert_eq!(handoff.take().await, 1);
        assert_eq!(handoff.take().await, 2);
        producer.await.unwrap();
    }

    #[tokio::test]
    async fn try_take_on_empty_slot() {
        let handoff: Handoff<i32> = Handoff::new();
        assert_eq!(handoff.try_take().await, None);
    }
}
