// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Generalized two-source coordination.
//!
//! Each source gets a background producer task that repeatedly pulls it and
//! forwards the outcome into a private data [`Handoff`], gated by a
//! companion ready handoff so the producer never runs more than one step
//! ahead of the consumer. The consumer-side pullers signal readiness, block
//! on the data handoff and decode a graceful end as `None`.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_stream::stream;
use futures::StreamExt;
use rill_core::{Chunk, Handoff, Scope, StreamError, Take};

use crate::stream::Stream;

/// Chunk-level pull handle onto one coordinated source.
///
/// Cheap to clone; all clones share the same producer task. After the
/// source ends or fails, every further `pull` returns `Ok(None)`.
pub struct ChunkPuller<T> {
    ready: Arc<Handoff<()>>,
    data: Arc<Handoff<Take<T>>>,
    done: Arc<AtomicBool>,
}

impl<T> Clone for ChunkPuller<T> {
    fn clone(&self) -> Self {
        Self {
            ready: Arc::clone(&self.ready),
            data: Arc::clone(&self.data),
            done: Arc::clone(&self.done),
        }
    }
}

impl<T> ChunkPuller<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Forks the producer task for `source` on `scope` and returns the
    /// consumer-side handle.
    pub(crate) fn launch(source: Stream<T>, scope: &Scope) -> Self {
        let ready = Arc::new(Handoff::new());
        let data = Arc::new(Handoff::new());
        {
            let ready = Arc::clone(&ready);
            let data = Arc::clone(&data);
            scope.spawn(async move {
                let mut upstream = source.into_chunk_stream();
                loop {
                    ready.take().await;
                    match upstream.next().await {
                        Some(Ok(chunk)) => data.offer(Take::Emit(chunk)).await,
                        Some(Err(e)) => {
                            data.offer(Take::Fail(e)).await;
                            return;
                        }
                        None => {
                            data.offer(Take::End).await;
                            return;
                        }
                    }
                }
            });
        }
        Self {
            ready,
            data,
            done: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Pulls the next chunk: `Ok(None)` once the source has ended.
    pub async fn pull(&self) -> Result<Option<Chunk<T>>, StreamError> {
        if self.done.load(Ordering::Acquire) {
            return Ok(None);
        }
        self.ready.offer(()).await;
        match self.data.take().await {
            Take::Emit(chunk) => Ok(Some(chunk)),
            Take::Fail(e) => {
                self.done.store(true, Ordering::Release);
                Err(e)
            }
            Take::End => {
                self.done.store(true, Ordering::Release);
                Ok(None)
            }
        }
    }
}

/// Element-level pull handle onto one coordinated source.
///
/// Buffers the current chunk and doles out one element per `pull`.
pub struct ElementPuller<T> {
    chunks: ChunkPuller<T>,
    buffer: Arc<tokio::sync::Mutex<VecDeque<T>>>,
}

impl<T> Clone for ElementPuller<T> {
    fn clone(&self) -> Self {
        Self {
            chunks: self.chunks.clone(),
            buffer: Arc::clone(&self.buffer),
        }
    }
}

impl<T> ElementPuller<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn launch(source: Stream<T>, scope: &Scope) -> Self {
        Self {
            chunks: ChunkPuller::launch(source, scope),
            buffer: Arc::new(tokio::sync::Mutex::new(VecDeque::new())),
        }
    }

    /// Pulls the next element: `Ok(None)` once the source has ended.
    pub async fn pull(&self) -> Result<Option<T>, StreamError> {
        let mut buffer = self.buffer.lock().await;
        loop {
            if let Some(element) = buffer.pop_front() {
                return Ok(Some(element));
            }
            match self.chunks.pull().await? {
                Some(chunk) => buffer.extend(chunk.iter().cloned()),
                None => return Ok(None),
            }
        }
    }
}

impl<T> Stream<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Merges two sources element by element through a caller-supplied
    /// state machine.
    ///
    /// Each step receives the current state plus a puller per side and
    /// either produces one output element and the next state, or ends the
    /// stream. Background producers are interrupted on every exit path.
    pub fn combine<U, S, O, F, Fut>(self, other: Stream<U>, seed: S, mut f: F) -> Stream<O>
    where
        U: Clone + Send + Sync + 'static,
        O: Clone + Send + Sync + 'static,
        S: Send + 'static,
        F: FnMut(S, ElementPuller<T>, ElementPuller<U>) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Result<Option<(O, S)>, StreamError>> + Send,
    {
        Stream::new(stream! {
            let scope = Scope::new();
            let left = ElementPuller::launch(self, &scope);
            let right = ElementPuller::launch(other, &scope);
            let mut state = seed;
            loop {
                match f(state, left.clone(), right.clone()).await {
                    Ok(Some((out, next))) => {
                        state = next;
                        yield Ok(Chunk::single(out));
                    }
                    Ok(None) => {
                        scope.abort_all();
                        return;
                    }
                    Err(e) => {
                        scope.abort_all();
                        yield Err(e);
                        return;
                    }
                }
            }
        })
    }

    /// Chunk-level variant of [`Stream::combine`].
    pub fn combine_chunks<U, S, O, F, Fut>(self, other: Stream<U>, seed: S, mut f: F) -> Stream<O>
    where
        U: Clone + Send + Sync + 'static,
        O: Clone + Send + Sync + 'static,
        S: Send + 'static,
        F: FnMut(S, ChunkPuller<T>, ChunkPuller<U>) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Result<Option<(Chunk<O>, S)>, StreamError>> + Send,
    {
        Stream::new(stream! {
            let scope = Scope::new();
            let left = ChunkPuller::launch(self, &scope);
            let right = ChunkPuller::launch(other, &scope);
            let mut state = seed;
            loop {
                match f(state, left.clone(), right.clone()).await {
                    Ok(Some((out, next))) => {
                        state = next;
                        yield Ok(out);
                    }
                    Ok(None) => {
                        scope.abort_all();
                        return;
                    }
                    Err(e) => {
                        scope.abort_all();
                        yield Err(e);
                        return;
                    }
                }
            }
        })
    }

    /// Pairs up both sources index by index, ending as soon as either side
    /// is exhausted. Unconsumed excess on the longer side is discarded.
    ///
    /// While both sides are live they are pulled in parallel; the carried
    /// excess from whichever side read ahead is merged with newly read
    /// data before zipping.
    pub fn zip_with<U, O, F>(self, other: Stream<U>, mut f: F) -> Stream<O>
    where
        U: Clone + Send + Sync + 'static,
        O: Clone + Send + Sync + 'static,
        F: FnMut(&T, &U) -> O + Send + 'static,
    {
        Stream::new(stream! {
            let scope = Scope::new();
            let left = ChunkPuller::launch(self, &scope);
            let right = ChunkPuller::launch(other, &scope);
            let mut left_excess: VecDeque<T> = VecDeque::new();
            let mut right_excess: VecDeque<U> = VecDeque::new();
            loop {
                if left_excess.is_empty() && right_excess.is_empty() {
                    let (l, r) = tokio::join!(left.pull(), right.pull());
                    match (l, r) {
                        (Err(e), _) | (_, Err(e)) => {
                            scope.abort_all();
                            yield Err(e);
                            return;
                        }
                        (Ok(None), _) | (_, Ok(None)) => {
                            scope.abort_all();
                            return;
                        }
                        (Ok(Some(lc)), Ok(Some(rc))) => {
                            left_excess.extend(lc.iter().cloned());
                            right_excess.extend(rc.iter().cloned());
                        }
                    }
                } else if left_excess.is_empty() {
                    match left.pull().await {
                        Err(e) => {
                            scope.abort_all();
                            yield Err(e);
                            return;
                        }
                        Ok(None) => {
                            scope.abort_all();
                            return;
                        }
                        Ok(Some(chunk)) => left_excess.extend(chunk.iter().cloned()),
                    }
                } else if right_excess.is_empty() {
                    match right.pull().await {
                        Err(e) => {
                            scope.abort_all();
                            yield Err(e);
                            return;
                        }
                        Ok(None) => {
                            scope.abort_all();
                            return;
                        }
                        Ok(Some(chunk)) => right_excess.extend(chunk.iter().cloned()),
                    }
                }

                let ready = left_excess.len().min(right_excess.len());
                if ready > 0 {
                    let zipped: Chunk<O> = left_excess
                        .drain(..ready)
                        .zip(right_excess.drain(..ready))
                        .map(|(a, b)| f(&a, &b))
                        .collect();
                    yield Ok(zipped);
                }
            }
        })
    }

    /// Pairs up both sources index by index into tuples.
    pub fn zip<U>(self, other: Stream<U>) -> Stream<(T, U)>
    where
        U: Clone + Send + Sync + 'static,
    {
        self.zip_with(other, |a, b| (a.clone(), b.clone()))
    }
}
