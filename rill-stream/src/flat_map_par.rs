// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Bounded-concurrency fan-out.
//!
//! Derives a stream per input element and drains up to `limit` derivations
//! concurrently, buffering up to `buffer` unconsumed outputs. Output order
//! is explicitly NOT input order. A failure in any derivation interrupts
//! all others and propagates as the stream's single outcome.

use std::sync::Arc;

use async_stream::stream;
use futures::StreamExt;
use rill_core::{Scope, StreamError, Take};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::stream::Stream;

impl<T> Stream<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Concurrent flatMap: runs up to `limit` derived streams at once
    /// (`None` for unbounded) and interleaves their outputs as they
    /// arrive.
    pub fn flat_map_par<U, F>(self, limit: Option<usize>, buffer: usize, mut f: F) -> Stream<U>
    where
        U: Clone + Send + Sync + 'static,
        F: FnMut(T) -> Stream<U> + Send + 'static,
    {
        Stream::new(stream! {
            let scope = Scope::new();
            let cancel = CancellationToken::new();
            let (tx, mut rx) = mpsc::channel::<Take<U>>(buffer.max(1));
            let semaphore = limit.map(|n| Arc::new(Semaphore::new(n.max(1))));

            {
                let tx = tx.clone();
                let cancel = cancel.clone();
                scope.spawn(async move {
                    let mut upstream = self.into_chunk_stream();
                    let mut derivations: JoinSet<()> = JoinSet::new();
                    let mut failure: Option<StreamError> = None;
                    'outer: loop {
                        let item = tokio::select! {
                            _ = cancel.cancelled() => break 'outer,
                            item = upstream.next() => item,
                        };
                        match item {
                            Some(Ok(chunk)) => {
                                for element in chunk.iter().cloned() {
                                    // Reap finished derivations so the set stays small.
                                    while let Some(finished) = derivations.try_join_next() {
                                        if let Err(e) = finished {
                                            if e.is_panic() && failure.is_none() {
                                                failure = Some(StreamError::processing(
                                                    format!("derivation panicked: {e}"),
                                                ));
                                                cancel.cancel();
                                            }
                                        }
                                    }
                                    if cancel.is_cancelled() {
                                        break 'outer;
                                    }
                                    let permit = match &semaphore {
                                        Some(semaphore) => {
                                            let acquired = tokio::select! {
                                                _ = cancel.cancelled() => break 'outer,
                                                acquired = Arc::clone(semaphore).acquire_owned() => acquired,
                                            };
                                            match acquired {
                                                Ok(permit) => Some(permit),
                                                Err(_) => break 'outer,
                                            }
                                        }
                                        None => None,
                                    };
                                    let derived = f(element);
                                    let tx = tx.clone();
                                    let cancel = cancel.clone();
                                    derivations.spawn(async move {
                                        let _permit = permit;
                                        let mut derived = derived.into_chunk_stream();
                                        loop {
                                            let item = tokio::select! {
                                                _ = cancel.cancelled() => return,
                                                item = derived.next() => item,
                                            };
                                            match item {
                                                Some(Ok(chunk)) => {
                                                    if tx.send(Take::Emit(chunk)).await.is_err() {
                                                        return;
                                                    }
                                                }
                                                Some(Err(e)) => {
                                                    // First failure wins; interrupt the rest.
                                                    cancel.cancel();
                                                    let _ = tx.send(Take::Fail(e)).await;
                                                    return;
                                                }
                                                None => return,
                                            }
                                        }
                                    });
                                }
                            }
                            Some(Err(e)) => {
                                cancel.cancel();
                                derivations.abort_all();
                                let _ = tx.send(Take::Fail(e)).await;
                                return;
                            }
                            None => break,
                        }
                    }
                    while let Some(finished) = derivations.join_next().await {
                        if let Err(e) = finished {
                            if e.is_panic() && failure.is_none() {
                                failure = Some(StreamError::processing(format!(
                                    "derivation panicked: {e}"
                                )));
                            }
                        }
                    }
                    let outcome = match failure {
                        Some(e) => Take::Fail(e),
                        None => Take::End,
                    };
                    let _ = tx.send(outcome).await;
                });
            }
            drop(tx);

            loop {
                match rx.recv().await {
                    Some(Take::Emit(chunk)) => yield Ok(chunk),
                    Some(Take::Fail(e)) => {
                        cancel.cancel();
                        scope.abort_all();
                        yield Err(e);
                        return;
                    }
                    Some(Take::End) | None => return,
                }
            }
        })
    }

    /// Runs a fallible effect per element with up to `limit` in flight;
    /// results arrive in completion order, not input order.
    pub fn map_par_unordered<U, F, Fut>(self, limit: Option<usize>, mut f: F) -> Stream<U>
    where
        U: Clone + Send + Sync + 'static,
        F: FnMut(T) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Result<U, StreamError>> + Send + 'static,
    {
        let buffer = limit.unwrap_or(16);
        self.flat_map_par(limit, buffer, move |element| Stream::from_future(f(element)))
    }
}
