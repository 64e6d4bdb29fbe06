// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Non-deterministic merge of two sources.
//!
//! Both sources run concurrently in forked tasks; whichever produces first
//! is emitted. Order is preserved within each source but unconstrained
//! across them. The termination policy is a per-side decision: a side's
//! end either finishes the merge with that exit or leaves the merge
//! waiting on the other side.

use async_stream::stream;
use futures::StreamExt;
use rill_core::{Scope, Take};
use tokio::sync::mpsc;

use crate::stream::Stream;

/// When a merged stream ends relative to its two sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationStrategy {
    /// End when the left source ends, regardless of the right.
    Left,
    /// End when the right source ends, regardless of the left.
    Right,
    /// End only after both sources have ended.
    Both,
    /// End as soon as either source ends, adopting that side's exit.
    Either,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

impl TerminationStrategy {
    /// The per-side decision: is this side's graceful end the merge's end?
    fn ends_on(self, side: Side, left_done: bool, right_done: bool) -> bool {
        match self {
            TerminationStrategy::Left => side == Side::Left,
            TerminationStrategy::Right => side == Side::Right,
            TerminationStrategy::Either => true,
            TerminationStrategy::Both => left_done && right_done,
        }
    }
}

fn merge_channels<O>(left: Stream<O>, right: Stream<O>, strategy: TerminationStrategy) -> Stream<O>
where
    O: Clone + Send + Sync + 'static,
{
    Stream::new(stream! {
        let scope = Scope::new();
        let (tx, mut rx) = mpsc::channel::<(Side, Take<O>)>(2);

        for (side, source) in [(Side::Left, left), (Side::Right, right)] {
            let tx = tx.clone();
            scope.spawn(async move {
                let mut upstream = source.into_chunk_stream();
                loop {
                    match upstream.next().await {
                        Some(Ok(chunk)) => {
                            if tx.send((side, Take::Emit(chunk))).await.is_err() {
                                return;
                            }
                        }
                        Some(Err(e)) => {
                            let _ = tx.send((side, Take::Fail(e))).await;
                            return;
                        }
                        None => {
                            let _ = tx.send((side, Take::End)).await;
                            return;
                        }
                    }
                }
            });
        }
        drop(tx);

        let mut left_done = false;
        let mut right_done = false;
        while let Some((side, take)) = rx.recv().await {
            match take {
                Take::Emit(chunk) => yield Ok(chunk),
                Take::Fail(e) => {
                    // Interrupt the sibling before surfacing the failure.
                    scope.abort_all();
                    yield Err(e);
                    return;
                }
                Take::End => {
                    match side {
                        Side::Left => left_done = true,
                        Side::Right => right_done = true,
                    }
                    if strategy.ends_on(side, left_done, right_done) {
                        scope.abort_all();
                        return;
                    }
                }
            }
        }
    })
}

impl<T> Stream<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Merges two same-typed sources, ending after both have ended.
    pub fn merge(self, other: Stream<T>) -> Stream<T> {
        merge_channels(self, other, TerminationStrategy::Both)
    }

    /// Merges two same-typed sources under an explicit termination policy.
    pub fn merge_halt(self, other: Stream<T>, strategy: TerminationStrategy) -> Stream<T> {
        merge_channels(self, other, strategy)
    }

    /// Merges two differently-typed sources by mapping each into a common
    /// output type first.
    pub fn merge_with<U, O, L, R>(
        self,
        other: Stream<U>,
        strategy: TerminationStrategy,
        l: L,
        r: R,
    ) -> Stream<O>
    where
        U: Clone + Send + Sync + 'static,
        O: Clone + Send + Sync + 'static,
        L: FnMut(T) -> O + Send + 'static,
        R: FnMut(U) -> O + Send + 'static,
    {
        merge_channels(self.map(l), other.map(r), strategy)
    }
}
