// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Fold-style consumers for window aggregation.

use std::sync::Arc;

use rill_core::Chunk;

/// The outcome of feeding one chunk to a sink.
pub enum SinkStep<T, S> {
    /// The sink wants more input.
    Continue(S),
    /// The sink is complete; the chunk's unconsumed tail is returned as
    /// leftover and must not be dropped.
    Done(S, Chunk<T>),
}

/// A reusable fold: a starting state, a step over one chunk, and an
/// extraction of the final result.
///
/// Sinks are fed window by window; each window starts from a fresh copy
/// of the initial state. A sink that never signals [`SinkStep::Done`]
/// relies on its schedule to close windows.
pub struct Sink<T, S, Z> {
    initial: S,
    step_fn: Arc<dyn Fn(S, Chunk<T>) -> SinkStep<T, S> + Send + Sync>,
    extract_fn: Arc<dyn Fn(S) -> Z + Send + Sync>,
}

impl<T, S, Z> Clone for Sink<T, S, Z>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            initial: self.initial.clone(),
            step_fn: Arc::clone(&self.step_fn),
            extract_fn: Arc::clone(&self.extract_fn),
        }
    }
}

impl<T, S, Z> Sink<T, S, Z>
where
    T: Clone,
    S: Clone,
{
    /// A sink from its three parts.
    pub fn new<St, Ex>(initial: S, step: St, extract: Ex) -> Self
    where
        St: Fn(S, Chunk<T>) -> SinkStep<T, S> + Send + Sync + 'static,
        Ex: Fn(S) -> Z + Send + Sync + 'static,
    {
        Self {
            initial,
            step_fn: Arc::new(step),
            extract_fn: Arc::new(extract),
        }
    }

    /// A fresh copy of the initial state.
    pub fn initial_state(&self) -> S {
        self.initial.clone()
    }

    /// Feeds one chunk.
    pub fn step(&self, state: S, chunk: Chunk<T>) -> SinkStep<T, S> {
        (self.step_fn)(state, chunk)
    }

    /// Extracts the result from a window's final state.
    pub fn extract(&self, state: S) -> Z {
        (self.extract_fn)(state)
    }
}

impl<T, S> Sink<T, S, S>
where
    T: Clone,
    S: Clone,
{
    /// A sink that folds every element and never completes on its own.
    pub fn fold<F>(initial: S, f: F) -> Self
    where
        F: Fn(S, &T) -> S + Send + Sync + 'static,
    {
        Sink::new(
            initial,
            move |state, chunk: Chunk<T>| {
                SinkStep::Continue(chunk.iter().fold(state, &f))
            },
            |state| state,
        )
    }
}

impl<T> Sink<T, Vec<T>, Vec<T>>
where
    T: Clone,
{
    /// A sink that completes after collecting `n` elements, returning the
    /// unconsumed tail of the final chunk as leftover.
    ///
    /// `n` is clamped to at least one: a zero-element window would never
    /// consume its carried leftover and aggregation would close empty
    /// windows forever.
    pub fn collect_n(n: usize) -> Self {
        let n = n.max(1);
        Sink::new(
            Vec::new(),
            move |mut collected: Vec<T>, chunk: Chunk<T>| {
                let missing = n.saturating_sub(collected.len());
                if chunk.len() < missing {
                    collected.extend(chunk.iter().cloned());
                    SinkStep::Continue(collected)
                } else {
                    collected.extend(chunk.take_front(missing).iter().cloned());
                    SinkStep::Done(collected, chunk.drop_front(missing))
                }
            },
            |collected| collected,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_accumulates_across_chunks() {
        let sink: Sink<i32, i32, i32> = Sink::fold(0, |acc, n| acc + n);
        let state = match sink.step(sink.initial_state(), Chunk::from(vec![1, 2])) {
            SinkStep::Continue(state) => state,
            SinkStep::Done(..) => panic!("fold must not complete"),
        };
        let state = match sink.step(state, Chunk::from(vec![3])) {
            SinkStep::Continue(state) => state,
            SinkStep::Done(..) => panic!("fold must not complete"),
        };
        assert_eq!(sink.extract(state), 6);
    }

    #[test]
    fn collect_n_returns_leftover() {
        let sink = Sink::collect_n(2);
        match sink.step(sink.initial_state(), Chunk::from(vec![1, 2, 3, 4])) {
            SinkStep::Done(collected, leftover) => {
                assert_eq!(collected, vec![1, 2]);
                assert_eq!(leftover.to_vec(), vec![3, 4]);
            }
            SinkStep::Continue(_) => panic!("sink should complete at n"),
        }
    }

    #[test]
    fn collect_n_zero_still_consumes_input() {
        let sink = Sink::collect_n(0);
        match sink.step(sink.initial_state(), Chunk::from(vec![7, 8])) {
            SinkStep::Done(collected, leftover) => {
                assert_eq!(collected, vec![7]);
                assert_eq!(leftover.to_vec(), vec![8]);
            }
            SinkStep::Continue(_) => panic!("sink should complete"),
        }
    }
}
