// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Producer/consumer decoupling through queues.
//!
//! The plain and unbounded variants push [`Take`] envelopes straight
//! through a queue. The sliding and dropping variants pair every envelope
//! with an acknowledgement that is satisfied by consumer take, eviction,
//! or shutdown; the producer tracks the last admitted item's
//! acknowledgement and withholds the terminal push until it is satisfied,
//! so the terminal envelope can never be evicted or discarded.

use std::sync::Arc;

use async_stream::stream;
use futures::StreamExt;
use rill_core::{Queue, QueueShutdown, Scope, Take};
use tokio::sync::oneshot;

use crate::stream::Stream;

/// An envelope paired with its consumption acknowledgement.
type Acked<T> = (Take<T>, oneshot::Sender<()>);

fn buffered_through<T>(source: Stream<T>, queue: Queue<Take<T>>) -> Stream<T>
where
    T: Clone + Send + Sync + 'static,
{
    Stream::new(stream! {
        let scope = Scope::new();
        let queue = Arc::new(queue);
        {
            let queue = Arc::clone(&queue);
            scope.spawn(async move {
                // Shutdown while offering means the consumer is gone.
                let _ = source.run_into_queue(queue).await;
            });
        }
        loop {
            match queue.take().await {
                Ok(Take::Emit(chunk)) => yield Ok(chunk),
                Ok(Take::Fail(e)) => {
                    scope.abort_all();
                    queue.shutdown();
                    yield Err(e);
                    return;
                }
                Ok(Take::End) | Err(QueueShutdown) => {
                    queue.shutdown();
                    return;
                }
            }
        }
    })
}

fn buffered_with_acks<T>(source: Stream<T>, queue: Queue<Acked<T>>) -> Stream<T>
where
    T: Clone + Send + Sync + 'static,
{
    Stream::new(stream! {
        let scope = Scope::new();
        let queue = Arc::new(queue);
        {
            let queue = Arc::clone(&queue);
            scope.spawn(async move {
                let mut upstream = source.into_chunk_stream();
                // The last admitted item's acknowledgement. An evicted or
                // discarded item resolves its ack by dropping the sender.
                let mut admitted_ack: Option<oneshot::Receiver<()>> = None;
                loop {
                    let take = match upstream.next().await {
                        Some(Ok(chunk)) => Take::Emit(chunk),
                        Some(Err(e)) => Take::Fail(e),
                        None => Take::End,
                    };
                    if take.is_terminal() {
                        // Once the last admitted item is consumed the queue
                        // is drained, so the terminal is always admitted.
                        if let Some(ack) = admitted_ack.take() {
                            let _ = ack.await;
                        }
                        let (tx, _rx) = oneshot::channel();
                        let _ = queue.offer((take, tx)).await;
                        return;
                    }
                    let (tx, rx) = oneshot::channel();
                    match queue.offer((take, tx)).await {
                        Ok(true) => admitted_ack = Some(rx),
                        Ok(false) => {}
                        Err(QueueShutdown) => return,
                    }
                }
            });
        }
        loop {
            match queue.take().await {
                Ok((take, ack)) => {
                    let _ = ack.send(());
                    match take {
                        Take::Emit(chunk) => yield Ok(chunk),
                        Take::Fail(e) => {
                            scope.abort_all();
                            queue.shutdown();
                            yield Err(e);
                            return;
                        }
                        Take::End => {
                            queue.shutdown();
                            return;
                        }
                    }
                }
                Err(QueueShutdown) => return,
            }
        }
    })
}

impl<T> Stream<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Decouples producer and consumer through a bounded queue; the
    /// producer backpressures once `capacity` takes are buffered.
    pub fn buffer(self, capacity: usize) -> Stream<T> {
        buffered_through(self, Queue::bounded(capacity))
    }

    /// Decouples producer and consumer with no bound; the producer never
    /// waits.
    pub fn buffer_unbounded(self) -> Stream<T> {
        buffered_through(self, Queue::unbounded())
    }

    /// Keeps the newest `capacity` takes, evicting the oldest when full.
    pub fn buffer_sliding(self, capacity: usize) -> Stream<T> {
        buffered_with_acks(self, Queue::sliding(capacity))
    }

    /// Keeps the oldest `capacity` takes, discarding new ones when full.
    pub fn buffer_dropping(self, capacity: usize) -> Stream<T> {
        buffered_with_acks(self, Queue::dropping(capacity))
    }
}
