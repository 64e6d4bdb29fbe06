// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Dynamic per-key partitioning.
//!
//! A [`Distributor`] hands out fresh per-partition queues on demand. One
//! consumption task pulls the upstream, asks a decider which partitions
//! each element belongs to, and offers the element to every matching
//! queue. A queue found shut down means its consumer unsubscribed: the
//! partition is pruned, never surfaced as a failure. On upstream end or
//! failure every surviving queue receives the terminal [`Take`] and the
//! completion callback fires exactly once.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_stream::stream;
use futures::StreamExt;
use rill_core::{Chunk, Queue, Scope, StreamError, Take};

use crate::logging::debug;
use crate::stream::Stream;

/// Selects which registered partition ids an element is offered to.
pub type Predicate = Arc<dyn Fn(u64) -> bool + Send + Sync>;

struct DistributorInner<T> {
    queues: parking_lot::Mutex<HashMap<u64, Arc<Queue<Take<T>>>>>,
    next_id: AtomicU64,
    buffer: usize,
}

/// A registry of per-partition queues, shared between the distribution
/// task and whoever allocates partitions.
pub struct Distributor<T> {
    inner: Arc<DistributorInner<T>>,
}

impl<T> Clone for Distributor<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Distributor<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// A distributor whose partition queues buffer up to `buffer` takes.
    pub fn new(buffer: usize) -> Self {
        Self {
            inner: Arc::new(DistributorInner {
                queues: parking_lot::Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(0),
                buffer,
            }),
        }
    }

    /// Allocates and registers a fresh partition queue.
    pub fn add(&self) -> (u64, Arc<Queue<Take<T>>>) {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let queue = Arc::new(Queue::bounded(self.inner.buffer));
        self.inner.queues.lock().insert(id, Arc::clone(&queue));
        (id, queue)
    }

    /// Number of currently registered partitions.
    pub fn len(&self) -> usize {
        self.inner.queues.lock().len()
    }

    /// Whether no partitions are currently registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Offers `take` to every partition whose id matches `predicate`,
    /// pruning partitions whose queue was shut down.
    pub(crate) async fn distribute(&self, predicate: &Predicate, take: Take<T>) {
        let targets: Vec<(u64, Arc<Queue<Take<T>>>)> = {
            let queues = self.inner.queues.lock();
            queues
                .iter()
                .filter(|(id, _)| predicate(**id))
                .map(|(id, queue)| (*id, Arc::clone(queue)))
                .collect()
        };
        for (id, queue) in targets {
            if queue.offer(take.clone()).await.is_err() {
                debug!("pruning partition {}: consumer unsubscribed", id);
                self.inner.queues.lock().remove(&id);
            }
        }
    }

    /// Offers `take` to every surviving partition and deregisters them all.
    pub(crate) async fn finish(&self, take: Take<T>) {
        let targets: Vec<Arc<Queue<Take<T>>>> = {
            let mut queues = self.inner.queues.lock();
            queues.drain().map(|(_, queue)| queue).collect()
        };
        for queue in targets {
            let _ = queue.offer(take.clone()).await;
        }
    }
}

/// A partitioned stream: (key, partition queue) pairs plus the buffer
/// size its derived sub-streams use.
///
/// `filter` and `first` reject keys by shutting their queue down, which
/// the distribution task treats as ordinary unsubscription. `apply`
/// drains every admitted key concurrently with no concurrency cap.
pub struct GroupBy<K, V> {
    pairs: Stream<(K, Arc<Queue<Take<V>>>)>,
    scope: Arc<Scope>,
    buffer: usize,
}

impl<K, V> GroupBy<K, V>
where
    K: Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Keeps only the keys matching `predicate`; rejected partitions are
    /// shut down before their pair is dropped.
    pub fn filter<F>(self, mut predicate: F) -> GroupBy<K, V>
    where
        F: FnMut(&K) -> bool + Send + 'static,
    {
        let pairs = self.pairs.filter(move |(key, queue)| {
            if predicate(key) {
                true
            } else {
                queue.shutdown();
                false
            }
        });
        GroupBy {
            pairs,
            scope: self.scope,
            buffer: self.buffer,
        }
    }

    /// Admits at most the first `n` distinct keys; every later partition
    /// is shut down before any of its elements can be observed.
    pub fn first(self, n: usize) -> GroupBy<K, V> {
        let mut admitted = 0usize;
        let pairs = self.pairs.filter(move |(_, queue)| {
            if admitted < n {
                admitted += 1;
                true
            } else {
                queue.shutdown();
                false
            }
        });
        GroupBy {
            pairs,
            scope: self.scope,
            buffer: self.buffer,
        }
    }

    /// Drains every admitted partition concurrently, with no concurrency
    /// cap, through the per-key stream `f` derives.
    pub fn apply<U, F>(self, mut f: F) -> Stream<U>
    where
        U: Clone + Send + Sync + 'static,
        F: FnMut(K, Stream<V>) -> Stream<U> + Send + 'static,
    {
        let scope = self.scope;
        let mut drained = self
            .pairs
            .flat_map_par(None, self.buffer, move |(key, queue)| {
                f(key, Stream::from_queue(queue))
            })
            .into_chunk_stream();
        Stream::new(stream! {
            // The distribution task lives exactly as long as this stream.
            let _scope = scope;
            while let Some(item) = drained.next().await {
                let failed = item.is_err();
                yield item;
                if failed {
                    return;
                }
            }
        })
    }
}

impl<T> Stream<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Forks the distribution task: pulls this stream to its end, asks
    /// `decide` for each element's partition predicate, and offers the
    /// element to every matching partition.
    ///
    /// The decider runs once per element on the single consumption task,
    /// so partition allocation it performs is naturally serialized. When
    /// the upstream ends or fails, every surviving partition receives the
    /// terminal [`Take`] and `on_done` fires exactly once with the
    /// failure, if any.
    pub fn distributed_with_dynamic<F, Fut, D, DFut>(
        self,
        distributor: Distributor<T>,
        mut decide: F,
        on_done: D,
    ) -> Scope
    where
        F: FnMut(&T) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Result<Predicate, StreamError>> + Send,
        D: FnOnce(Option<StreamError>) -> DFut + Send + 'static,
        DFut: std::future::Future<Output = ()> + Send,
    {
        let scope = Scope::new();
        scope.spawn(async move {
            let mut upstream = self.into_chunk_stream();
            let failure: Option<StreamError> = 'run: loop {
                match upstream.next().await {
                    Some(Ok(chunk)) => {
                        for element in chunk.iter() {
                            let predicate = match decide(element).await {
                                Ok(predicate) => predicate,
                                Err(e) => break 'run Some(e),
                            };
                            distributor
                                .distribute(&predicate, Take::single(element.clone()))
                                .await;
                        }
                    }
                    Some(Err(e)) => break 'run Some(e),
                    None => break 'run None,
                }
            };
            let terminal = match &failure {
                Some(e) => Take::Fail(e.clone()),
                None => Take::End,
            };
            distributor.finish(terminal).await;
            on_done(failure).await;
        });
        scope
    }

    /// Partitions this stream by the key `f` assigns each element.
    ///
    /// Each distinct key gets its own queue, allocated on first sight and
    /// announced downstream as a (key, queue) pair; every element is then
    /// routed to its key's queue in original relative order.
    pub fn group_by<K, F>(self, buffer: usize, mut f: F) -> GroupBy<K, T>
    where
        K: Clone + Eq + Hash + Send + Sync + 'static,
        F: FnMut(&T) -> K + Send + 'static,
    {
        let distributor = Distributor::new(buffer);
        let pair_queue: Arc<Queue<Take<(K, Arc<Queue<Take<T>>>)>>> =
            Arc::new(Queue::bounded(buffer.max(1)));
        // key -> partition id, guarded by a single-permit critical section
        // so two same-new-key elements can never allocate twice.
        let key_map: Arc<tokio::sync::Mutex<HashMap<K, u64>>> =
            Arc::new(tokio::sync::Mutex::new(HashMap::new()));

        let decide = {
            let distributor = distributor.clone();
            let pair_queue = Arc::clone(&pair_queue);
            let key_map = Arc::clone(&key_map);
            move |element: &T| {
                let key = f(element);
                let distributor = distributor.clone();
                let pair_queue = Arc::clone(&pair_queue);
                let key_map = Arc::clone(&key_map);
                async move {
                    let mut map = key_map.lock().await;
                    let id = match map.get(&key) {
                        Some(id) => *id,
                        None => {
                            let (id, queue) = distributor.add();
                            map.insert(key.clone(), id);
                            // The pair consumer may itself be gone; the
                            // orphaned queue is then pruned on first offer.
                            let _ = pair_queue
                                .offer(Take::Emit(Chunk::single((key, queue))))
                                .await;
                            id
                        }
                    };
                    drop(map);
                    Ok(Arc::new(move |candidate| candidate == id) as Predicate)
                }
            }
        };

        let on_done = {
            let pair_queue = Arc::clone(&pair_queue);
            move |failure: Option<StreamError>| async move {
                let terminal = match failure {
                    Some(e) => Take::Fail(e),
                    None => Take::End,
                };
                let _ = pair_queue.offer(terminal).await;
            }
        };

        let scope = self.distributed_with_dynamic(distributor, decide, on_done);
        GroupBy {
            pairs: Stream::from_queue(pair_queue),
            scope: Arc::new(scope),
            buffer,
        }
    }

    /// [`Stream::group_by`] with a default per-partition buffer.
    pub fn group_by_key<K, F>(self, f: F) -> GroupBy<K, T>
    where
        K: Clone + Eq + Hash + Send + Sync + 'static,
        F: FnMut(&T) -> K + Send + 'static,
    {
        self.group_by(16, f)
    }
}
