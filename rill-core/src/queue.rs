// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Async queues with pluggable overflow policies and cooperative shutdown.

use std::collections::VecDeque;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::error::QueueShutdown;

/// Overflow policy applied when an `offer` finds the queue at capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OverflowPolicy {
    /// `offer` suspends until space is available.
    Backpressure,
    /// The offered item is discarded; `offer` reports `false`.
    Dropping,
    /// The oldest buffered item is evicted to make room.
    Sliding,
    /// No capacity bound; `offer` never suspends.
    Unbounded,
}

struct Inner<T> {
    items: VecDeque<T>,
    shutdown: bool,
}

/// A multi-producer, multi-consumer queue whose variants differ only in
/// overflow policy.
///
/// `shutdown` is idempotent and wakes every task blocked in `offer` or
/// `take` with [`QueueShutdown`]; buffered items are discarded. A shut-down
/// queue signals unsubscription, not failure: callers recover locally.
pub struct Queue<T> {
    inner: Mutex<Inner<T>>,
    capacity: usize,
    policy: OverflowPolicy,
    on_item: Notify,
    on_space: Notify,
}

impl<T> Queue<T> {
    fn with_policy(capacity: usize, policy: OverflowPolicy) -> Self {
        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::new(),
                shutdown: false,
            }),
            capacity,
            policy,
            on_item: Notify::new(),
            on_space: Notify::new(),
        }
    }

    /// A queue that suspends producers once `capacity` items are buffered.
    pub fn bounded(capacity: usize) -> Self {
        Self::with_policy(capacity.max(1), OverflowPolicy::Backpressure)
    }

    /// A queue that discards offered items while at capacity.
    pub fn dropping(capacity: usize) -> Self {
        Self::with_policy(capacity.max(1), OverflowPolicy::Dropping)
    }

    /// A queue that evicts its oldest item to admit a new one at capacity.
    pub fn sliding(capacity: usize) -> Self {
        Self::with_policy(capacity.max(1), OverflowPolicy::Sliding)
    }

    /// A queue with no capacity bound.
    pub fn unbounded() -> Self {
        Self::with_policy(usize::MAX, OverflowPolicy::Unbounded)
    }

    /// Offers one item.
    ///
    /// Returns `Ok(true)` if the item was admitted, `Ok(false)` if the
    /// overflow policy discarded it.
    ///
    /// # Errors
    ///
    /// Returns [`QueueShutdown`] if the queue was shut down before or while
    /// waiting for space.
    pub async fn offer(&self, item: T) -> Result<bool, QueueShutdown> {
        let mut pending = Some(item);
        loop {
            {
                let mut inner = self.inner.lock();
                if inner.shutdown {
                    // Chain the wakeup so every blocked producer observes it.
                    self.on_space.notify_one();
                    return Err(QueueShutdown);
                }
                if inner.items.len() < self.capacity {
                    if let Some(item) = pending.take() {
                        inner.items.push_back(item);
                    }
                    drop(inner);
                    self.on_item.notify_one();
                    return Ok(true);
                }
                match self.policy {
                    OverflowPolicy::Dropping => return Ok(false),
                    OverflowPolicy::Sliding => {
                        inner.items.pop_front();
                        if let Some(item) = pending.take() {
                            inner.items.push_back(item);
                        }
                        drop(inner);
                        self.on_item.notify_one();
                        return Ok(true);
                    }
                    OverflowPolicy::Backpressure | OverflowPolicy::Unbounded => {}
                }
            }
            self.on_space.notified().await;
        }
    }

    /// Takes the oldest buffered item, waiting for one to arrive.
    ///
    /// # Errors
    ///
    /// Returns [`QueueShutdown`] if the queue was shut down.
    pub async fn take(&self) -> Result<T, QueueShutdown> {
        loop {
            {
                let mut inner = self.inner.lock();
                if inner.shutdown {
                    self.on_item.notify_one();
                    return Err(QueueShutdown);
                }
                if let Some(item) = inner.items.pop_front() {
                    drop(inner);
                    self.on_space.notify_one();
                    return Ok(item);
                }
            }
            self.on_item.notified().await;
        }
    }

    /// Takes between `min` and `max` items, waiting until at least `min`
    /// are buffered. `min == 0` never waits.
    ///
    /// # Errors
    ///
    /// Returns [`QueueShutdown`] if the queue was shut down.
    pub async fn take_between(&self, min: usize, max: usize) -> Result<Vec<T>, QueueShutdown> {
        loop {
            {
                let mut inner = self.inner.lock();
                if inner.shutdown {
                    self.on_item.notify_one();
                    return Err(QueueShutdown);
                }
                if inner.items.len() >= min {
                    let count = inner.items.len().min(max);
                    let taken: Vec<T> = inner.items.drain(..count).collect();
                    drop(inner);
                    if !taken.is_empty() {
                        self.on_space.notify_one();
                    }
                    return Ok(taken);
                }
            }
            self.on_item.notified().await;
        }
    }

    /// Number of currently buffered items.
    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    /// Whether the queue currently buffers no items.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the queue has been shut down.
    pub fn is_shutdown(&self) -> bool {
        self.inner.lock().shutdown
    }

    /// Shuts the queue down: discards buffered items and wakes every
    /// blocked producer and consumer with [`QueueShutdown`]. Idempotent.
    pub fn shutdown(&self) {
        {
            let mut inner = self.inner.lock();
            if inner.shutdown {
                return;
            }
            inner.shutdown = true;
            inner.items.clear();
        }
        self.on_item.notify_one();
        self.on_space.notify_one();
    }
}
