// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Sink-plus-schedule window aggregation.
//!
//! An upstream-feeding task forwards outcomes into a one-slot handoff
//! while the aggregator races "run the sink to completion" against the
//! schedule's timer. Whichever wins decides how the window closes; input
//! the sink did not consume carries into the next window, never dropped.

use std::sync::Arc;

use async_stream::stream;
use futures::StreamExt;
use rill_core::{Chunk, Handoff, Scope, StreamError};

use crate::handoff_signal::{HandoffSignal, SinkEndReason};
use crate::logging::debug;
use crate::schedule::{Schedule, ScheduleDone};
use crate::sink::{Sink, SinkStep};
use crate::stream::Stream;

/// A value from one of two sources of a windowed aggregation: `Left` is
/// the schedule's terminal output, `Right` a sink result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Either<A, B> {
    Left(A),
    Right(B),
}

enum WindowClose<C, S> {
    /// The window closed gracefully; the reason decides what is emitted.
    Closed(SinkEndReason<C>, S),
    /// The upstream failed.
    Failed(StreamError),
}

enum Raced<C, T> {
    Signal(HandoffSignal<C, T>),
    Tick(Result<C, ScheduleDone>),
}

impl<T> Stream<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Aggregates elements through `sink`, closing windows when the sink
    /// completes or the schedule fires, whichever comes first.
    ///
    /// Emits `Right` for every window's sink result. When the schedule
    /// runs to completion it additionally emits `Left` with the
    /// schedule's final output and restarts from the schedule's first
    /// step. A sink-driven close restarts the current step's delay for
    /// the next window; a mere timer tick advances the schedule without
    /// restarting it.
    pub fn aggregate_async_within_either<S, Z, C>(
        self,
        sink: Sink<T, S, Z>,
        schedule: Schedule<C>,
    ) -> Stream<Either<C, Z>>
    where
        S: Clone + Send + Sync + 'static,
        Z: Clone + Send + Sync + 'static,
        C: Clone + Send + Sync + 'static,
    {
        Stream::new(stream! {
            let scope = Scope::new();
            let handoff: Arc<Handoff<HandoffSignal<C, T>>> = Arc::new(Handoff::new());
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

            let mut driver = schedule.driver();
            // Input the previous window's sink did not consume.
            let mut carried: Option<Chunk<T>> = None;
            // A signal read while waiting out an exhausted schedule.
            let mut pending: Option<HandoffSignal<C, T>> = None;

            'windows: loop {
                let mut state = sink.initial_state();
                let mut consumed = false;

                if let Some(chunk) = carried.take() {
                    consumed = true;
                    match sink.step(state, chunk) {
                        SinkStep::Continue(next) => state = next,
                        SinkStep::Done(done, leftover) => {
                            if !leftover.is_empty() {
                                carried = Some(leftover);
                            }
                            yield Ok(Chunk::single(Either::Right(sink.extract(done))));
                            continue 'windows;
                        }
                    }
                }

                let close = 'window: loop {
                    let signal = match pending.take() {
                        Some(signal) => signal,
                        None => {
                            let raced = tokio::select! {
                                signal = handoff.take() => Raced::Signal(signal),
                                tick = driver.next() => Raced::Tick(tick),
                            };
                            match raced {
                                Raced::Signal(signal) => signal,
                                Raced::Tick(Ok(_)) => {
                                    break 'window WindowClose::Closed(
                                        SinkEndReason::ScheduleTimeout,
                                        state,
                                    )
                                }
                                Raced::Tick(Err(ScheduleDone)) => match driver.last() {
                                    Some(out) => {
                                        break 'window WindowClose::Closed(
                                            SinkEndReason::ScheduleEnd(out),
                                            state,
                                        )
                                    }
                                    None => {
                                        // A schedule with no steps at all
                                        // can never close a window.
                                        pending = Some(handoff.take().await);
                                        continue;
                                    }
                                },
                            }
                        }
                    };
                    match signal {
                        HandoffSignal::Emit(chunk) => {
                            consumed = true;
                            match sink.step(state, chunk) {
                                SinkStep::Continue(next) => state = next,
                                SinkStep::Done(done, leftover) => {
                                    if !leftover.is_empty() {
                                        carried = Some(leftover);
                                    }
                                    break 'window WindowClose::Closed(
                                        SinkEndReason::SinkEnd,
                                        done,
                                    );
                                }
                            }
                        }
                        HandoffSignal::Halt(e) => break 'window WindowClose::Failed(e),
                        HandoffSignal::End(reason) => {
                            break 'window WindowClose::Closed(reason, state)
                        }
                    }
                };

                match close {
                    WindowClose::Failed(e) => {
                        scope.abort_all();
                        yield Err(e);
                        return;
                    }
                    WindowClose::Closed(SinkEndReason::SinkEnd, done) => {
                        // Each window gets a fresh delay for the schedule's
                        // current step.
                        debug!("window closed by sink completion");
                        driver.rearm();
                        yield Ok(Chunk::single(Either::Right(sink.extract(done))));
                    }
                    WindowClose::Closed(SinkEndReason::ScheduleTimeout, state) => {
                        debug!("window closed by schedule timeout");
                        yield Ok(Chunk::single(Either::Right(sink.extract(state))));
                    }
                    WindowClose::Closed(SinkEndReason::ScheduleEnd(out), state) => {
                        debug!("window closed by schedule completion");
                        if consumed {
                            yield Ok(Chunk::single(Either::Right(sink.extract(state))));
                        }
                        yield Ok(Chunk::single(Either::Left(out)));
                        driver.reset();
                        if !consumed {
                            // An exhausted schedule would otherwise close
                            // empty windows in a tight loop; wait for input.
                            pending = Some(handoff.take().await);
                        }
                    }
                    WindowClose::Closed(SinkEndReason::UpstreamEnd, state) => {
                        debug!("upstream ended; closing final window");
                        if consumed {
                            yield Ok(Chunk::single(Either::Right(sink.extract(state))));
                        }
                        scope.abort_all();
                        return;
                    }
                }
            }
        })
    }

    /// [`Stream::aggregate_async_within_either`] keeping only sink
    /// results.
    pub fn aggregate_async_within<S, Z, C>(
        self,
        sink: Sink<T, S, Z>,
        schedule: Schedule<C>,
    ) -> Stream<Z>
    where
        S: Clone + Send + Sync + 'static,
        Z: Clone + Send + Sync + 'static,
        C: Clone + Send + Sync + 'static,
    {
        let mut inner = self
            .aggregate_async_within_either(sink, schedule)
            .into_chunk_stream();
        Stream::new(stream! {
            while let Some(item) = inner.next().await {
                match item {
                    Ok(chunk) => {
                        let results: Chunk<Z> = chunk
                            .iter()
                            .filter_map(|either| match either {
                                Either::Right(z) => Some(z.clone()),
                                Either::Left(_) => None,
                            })
                            .collect();
                        if !results.is_empty() {
                            yield Ok(results);
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
}
