// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Time-windowed coalescing.
//!
//! A feeder task forwards upstream outcomes into a one-slot handoff; the
//! consumer races a delay against fresh signals. A value superseded before
//! its delay fires is never emitted. On upstream end the outstanding delay
//! is joined and its value flushed; on failure everything is interrupted
//! and the error propagates.

use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use futures::StreamExt;
use rill_core::{Chunk, Handoff, Scope};
use tokio::time::Instant;

use crate::handoff_signal::{HandoffSignal, SinkEndReason};
use crate::stream::Stream;

enum Raced<T> {
    Signal(HandoffSignal<(), T>),
    Fired,
}

impl<T> Stream<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Emits only the last element of each burst, once the source has been
    /// quiet for `duration`.
    pub fn debounce(self, duration: Duration) -> Stream<T> {
        Stream::new(stream! {
            let scope = Scope::new();
            let handoff: Arc<Handoff<HandoffSignal<(), T>>> = Arc::new(Handoff::new());
            {
                let handoff = Arc::clone(&handoff);
                scope.spawn(async move {
                    let mut upstream = self.into_chunk_stream();
                    loop {
                        match upstream.next().await {
                            Some(Ok(chunk)) => handoff.offer(HandoffSignal::Emit(chunk)).await,
                            Some(Err(e)) => {
                                handoff.offer(HandoffSignal::Halt(e)).await;
                                return;
                            }
                            None => {
                                handoff
                                    .offer(HandoffSignal::End(SinkEndReason::UpstreamEnd))
                                    .await;
                                return;
                            }
                        }
                    }
                });
            }

            // The candidate value of the current burst and the moment its
            // quiet window expires.
            let mut pending: Option<(T, Instant)> = None;
            loop {
                let raced = match &pending {
                    Some((_, deadline)) => {
                        tokio::select! {
                            signal = handoff.take() => Raced::Signal(signal),
                            _ = tokio::time::sleep_until(*deadline) => Raced::Fired,
                        }
                    }
                    None => Raced::Signal(handoff.take().await),
                };
                match raced {
                    Raced::Fired => {
                        if let Some((value, _)) = pending.take() {
                            yield Ok(Chunk::single(value));
                        }
                    }
                    Raced::Signal(HandoffSignal::Emit(chunk)) => {
                        // A fresh signal supersedes the previous candidate
                        // and restarts the quiet window.
                        if let Some(last) = chunk.last() {
                            pending = Some((last.clone(), Instant::now() + duration));
                        }
                    }
                    Raced::Signal(HandoffSignal::Halt(e)) => {
                        scope.abort_all();
                        yield Err(e);
                        return;
                    }
                    Raced::Signal(HandoffSignal::End(_)) => {
                        if let Some((value, deadline)) = pending.take() {
                            tokio::time::sleep_until(deadline).await;
                            yield Ok(Chunk::single(value));
                        }
                        return;
                    }
                }
            }
        })
    }
}
