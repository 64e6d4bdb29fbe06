// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The public stream value type and its concurrency-free combinators.
//!
//! A [`Stream`] wraps exactly one boxed pull channel yielding
//! `Result<Chunk<T>, StreamError>`. Everything in this module rewrites that
//! channel without forking tasks: transformations are lazy (nothing runs
//! before the stream is polled), chunk boundaries are semantically
//! transparent, and the first failure short-circuits the rest.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_stream::stream;
use futures::stream::BoxStream;
use futures::StreamExt;
use rill_core::{Chunk, Queue, QueueShutdown, StreamError, Take};
use tokio::sync::mpsc;

/// A pull-based, chunked stream of elements.
///
/// Immutable: every combinator consumes `self` and returns a new stream.
/// Holds no mutable state of its own; the queues, handoffs and tasks a
/// concurrent combinator needs are created when the composed stream is
/// actually polled and torn down when it is dropped.
pub struct Stream<T> {
    inner: BoxStream<'static, Result<Chunk<T>, StreamError>>,
}

impl<T> futures::Stream for Stream<T> {
    type Item = Result<Chunk<T>, StreamError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl<T> Stream<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Wraps a raw chunk channel.
    pub fn new<S>(inner: S) -> Self
    where
        S: futures::Stream<Item = Result<Chunk<T>, StreamError>> + Send + 'static,
    {
        Self {
            inner: inner.boxed(),
        }
    }

    /// The stream that ends immediately.
    pub fn empty() -> Self {
        Self::new(futures::stream::empty())
    }

    /// The stream that fails immediately with `error`.
    pub fn fail(error: StreamError) -> Self {
        Self::new(futures::stream::iter([Err(error)]))
    }

    /// Emits one chunk, then ends.
    pub fn from_chunk(chunk: Chunk<T>) -> Self {
        Self::new(futures::stream::iter([Ok(chunk)]))
    }

    /// Emits the given chunks in order, then ends.
    pub fn from_chunks<I>(chunks: I) -> Self
    where
        I: IntoIterator<Item = Chunk<T>>,
        I::IntoIter: Send + 'static,
    {
        Self::new(futures::stream::iter(chunks.into_iter().map(Ok)))
    }

    /// Emits all elements as one chunk, then ends.
    pub fn from_iter<I>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        Self::from_chunk(items.into_iter().collect())
    }

    /// Emits the single element the future resolves to, or fails.
    pub fn from_future<Fut>(future: Fut) -> Self
    where
        Fut: std::future::Future<Output = Result<T, StreamError>> + Send + 'static,
    {
        Self::new(stream! {
            match future.await {
                Ok(value) => yield Ok(Chunk::single(value)),
                Err(e) => yield Err(e),
            }
        })
    }

    /// Generates elements from `seed` until `f` returns `None`.
    pub fn unfold<S, F, Fut>(seed: S, mut f: F) -> Self
    where
        S: Send + 'static,
        F: FnMut(S) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Result<Option<(T, S)>, StreamError>> + Send,
    {
        Self::new(stream! {
            let mut state = seed;
            loop {
                match f(state).await {
                    Ok(Some((value, next))) => {
                        state = next;
                        yield Ok(Chunk::single(value));
                    }
                    Ok(None) => return,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        })
    }

    /// Drains a queue of [`Take`] envelopes until a terminal one arrives.
    ///
    /// Queue shutdown is treated as a graceful end: the queue's owner
    /// unsubscribed this consumer.
    pub fn from_queue(queue: Arc<Queue<Take<T>>>) -> Self {
        Self::new(stream! {
            loop {
                match queue.take().await {
                    Ok(Take::Emit(chunk)) => yield Ok(chunk),
                    Ok(Take::Fail(e)) => {
                        yield Err(e);
                        return;
                    }
                    Ok(Take::End) | Err(QueueShutdown) => return,
                }
            }
        })
    }

    /// Drains an mpsc channel of [`Take`] envelopes until a terminal one
    /// arrives or the sender side is dropped.
    pub fn from_channel(mut receiver: mpsc::Receiver<Take<T>>) -> Self {
        Self::new(stream! {
            loop {
                match receiver.recv().await {
                    Some(Take::Emit(chunk)) => yield Ok(chunk),
                    Some(Take::Fail(e)) => {
                        yield Err(e);
                        return;
                    }
                    Some(Take::End) | None => return,
                }
            }
        })
    }

    /// The underlying chunk channel.
    pub fn into_chunk_stream(self) -> BoxStream<'static, Result<Chunk<T>, StreamError>> {
        self.inner
    }

    /// Transforms every element.
    pub fn map<U, F>(self, mut f: F) -> Stream<U>
    where
        U: Clone + Send + Sync + 'static,
        F: FnMut(T) -> U + Send + 'static,
    {
        let mut inner = self.inner;
        Stream::new(stream! {
            while let Some(item) = inner.next().await {
                match item {
                    Ok(chunk) => {
                        let mapped: Chunk<U> = chunk.iter().cloned().map(&mut f).collect();
                        yield Ok(mapped);
                    }
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        })
    }

    /// Transforms every element with a fallible function; the first `Err`
    /// fails the stream after the successfully mapped prefix is emitted.
    pub fn map_result<U, F>(self, mut f: F) -> Stream<U>
    where
        U: Clone + Send + Sync + 'static,
        F: FnMut(T) -> Result<U, StreamError> + Send + 'static,
    {
        let mut inner = self.inner;
        Stream::new(stream! {
            while let Some(item) = inner.next().await {
                match item {
                    Ok(chunk) => {
                        let mut mapped: Vec<U> = Vec::with_capacity(chunk.len());
                        let mut failure = None;
                        for element in chunk.iter().cloned() {
                            match f(element) {
                                Ok(value) => mapped.push(value),
                                Err(e) => {
                                    failure = Some(e);
                                    break;
                                }
                            }
                        }
                        if !mapped.is_empty() {
                            yield Ok(Chunk::from(mapped));
                        }
                        if let Some(e) = failure {
                            yield Err(e);
                            return;
                        }
                    }
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        })
    }

    /// Keeps only the elements matching `f`.
    pub fn filter<F>(self, mut f: F) -> Stream<T>
    where
        F: FnMut(&T) -> bool + Send + 'static,
    {
        let mut inner = self.inner;
        Stream::new(stream! {
            while let Some(item) = inner.next().await {
                match item {
                    Ok(chunk) => {
                        let kept = chunk.filtered(&mut f);
                        if !kept.is_empty() {
                            yield Ok(kept);
                        }
                    }
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        })
    }

    /// Observes every element without changing the stream.
    pub fn tap<F>(self, mut f: F) -> Stream<T>
    where
        F: FnMut(&T) + Send + 'static,
    {
        let mut inner = self.inner;
        Stream::new(stream! {
            while let Some(item) = inner.next().await {
                match item {
                    Ok(chunk) => {
                        for element in chunk.iter() {
                            f(element);
                        }
                        yield Ok(chunk);
                    }
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        })
    }

    /// Transforms whole chunks at once.
    pub fn map_chunks<U, F>(self, mut f: F) -> Stream<U>
    where
        U: Clone + Send + Sync + 'static,
        F: FnMut(Chunk<T>) -> Chunk<U> + Send + 'static,
    {
        let mut inner = self.inner;
        Stream::new(stream! {
            while let Some(item) = inner.next().await {
                match item {
                    Ok(chunk) => yield Ok(f(chunk)),
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        })
    }

    /// Substitutes a stream for every element and drains them sequentially.
    pub fn flat_map<U, F>(self, mut f: F) -> Stream<U>
    where
        U: Clone + Send + Sync + 'static,
        F: FnMut(T) -> Stream<U> + Send + 'static,
    {
        let mut inner = self.inner;
        Stream::new(stream! {
            while let Some(item) = inner.next().await {
                match item {
                    Ok(chunk) => {
                        for element in chunk.iter().cloned() {
                            let mut derived = f(element);
                            while let Some(derived_item) = derived.next().await {
                                match derived_item {
                                    Ok(derived_chunk) => yield Ok(derived_chunk),
                                    Err(e) => {
                                        yield Err(e);
                                        return;
                                    }
                                }
                            }
                        }
                    }
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        })
    }

    /// Emits at most the first `count` elements, splitting a chunk at the
    /// boundary if necessary.
    pub fn take(self, count: usize) -> Stream<T> {
        let mut inner = self.inner;
        Stream::new(stream! {
            if count == 0 {
                return;
            }
            let mut remaining = count;
            while let Some(item) = inner.next().await {
                match item {
                    Ok(chunk) => {
                        if chunk.len() <= remaining {
                            remaining -= chunk.len();
                            yield Ok(chunk);
                            if remaining == 0 {
                                return;
                            }
                        } else {
                            yield Ok(chunk.take_front(remaining));
                            return;
                        }
                    }
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        })
    }

    /// This stream followed by `other`; a failure in `self` suppresses
    /// `other` entirely.
    pub fn concat(self, other: Stream<T>) -> Stream<T> {
        let mut first = self.inner;
        let mut second = other.inner;
        Stream::new(stream! {
            while let Some(item) = first.next().await {
                let failed = item.is_err();
                yield item;
                if failed {
                    return;
                }
            }
            while let Some(item) = second.next().await {
                let failed = item.is_err();
                yield item;
                if failed {
                    return;
                }
            }
        })
    }

    /// Regroups elements into chunks of exactly `size` (the final chunk may
    /// be shorter).
    pub fn rechunk(self, size: usize) -> Stream<T> {
        let size = size.max(1);
        let mut inner = self.inner;
        Stream::new(stream! {
            let mut buffer: Vec<T> = Vec::with_capacity(size);
            while let Some(item) = inner.next().await {
                match item {
                    Ok(chunk) => {
                        for element in chunk.iter().cloned() {
                            buffer.push(element);
                            if buffer.len() == size {
                                yield Ok(Chunk::from(std::mem::take(&mut buffer)));
                            }
                        }
                    }
                    Err(e) => {
                        if !buffer.is_empty() {
                            yield Ok(Chunk::from(std::mem::take(&mut buffer)));
                        }
                        yield Err(e);
                        return;
                    }
                }
            }
            if !buffer.is_empty() {
                yield Ok(Chunk::from(buffer));
            }
        })
    }

    /// Runs the stream, collecting every element.
    pub async fn run_collect(self) -> Result<Vec<T>, StreamError> {
        let mut inner = self.inner;
        let mut collected = Vec::new();
        while let Some(item) = inner.next().await {
            collected.extend(item?.iter().cloned());
        }
        Ok(collected)
    }

    /// Runs the stream for its effects, discarding elements.
    pub async fn run_drain(self) -> Result<(), StreamError> {
        let mut inner = self.inner;
        while let Some(item) = inner.next().await {
            item?;
        }
        Ok(())
    }

    /// Runs the stream, folding every element into `seed`.
    pub async fn run_fold<S, F>(self, seed: S, mut f: F) -> Result<S, StreamError>
    where
        F: FnMut(S, T) -> S + Send,
    {
        let mut inner = self.inner;
        let mut state = seed;
        while let Some(item) = inner.next().await {
            for element in item?.iter().cloned() {
                state = f(state, element);
            }
        }
        Ok(state)
    }

    /// Runs the stream into a queue of [`Take`] envelopes, terminal
    /// included. Stops early if the queue is shut down.
    pub async fn run_into_queue(self, queue: Arc<Queue<Take<T>>>) -> Result<(), QueueShutdown> {
        let mut inner = self.inner;
        loop {
            let take = match inner.next().await {
                Some(Ok(chunk)) => Take::Emit(chunk),
                Some(Err(e)) => Take::Fail(e),
                None => Take::End,
            };
            let terminal = take.is_terminal();
            queue.offer(take).await?;
            if terminal {
                return Ok(());
            }
        }
    }
}
