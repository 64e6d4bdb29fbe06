// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Token-bucket rate limiting.
//!
//! The bucket is recomputed lazily from elapsed wall-clock time on every
//! pull; no background timer exists. Over-weight chunks are dropped, never
//! delayed, and their weight is debited regardless.

use async_stream::stream;
use futures::StreamExt;
use std::time::Duration;
use tokio::time::Instant;

use crate::logging::debug;
use crate::stream::Stream;

impl<T> Stream<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Forwards chunks while a virtual bucket holds enough tokens, and
    /// drops the chunks it cannot afford.
    ///
    /// The bucket holds at most `units + burst` tokens and refills at
    /// `units` per `duration`. `cost` assigns each chunk a weight; the
    /// weight is always debited, so an over-weight chunk leaves the
    /// bucket in debt rather than being buffered for later.
    pub fn throttle_enforce<F>(
        self,
        units: u64,
        duration: Duration,
        burst: u64,
        mut cost: F,
    ) -> Stream<T>
    where
        F: FnMut(&rill_core::Chunk<T>) -> u64 + Send + 'static,
    {
        let mut inner = self.into_chunk_stream();
        Stream::new(stream! {
            let capacity = (units + burst) as f64;
            let mut tokens = capacity;
            let mut last = Instant::now();
            while let Some(item) = inner.next().await {
                match item {
                    Ok(chunk) => {
                        let now = Instant::now();
                        if duration.is_zero() {
                            tokens = capacity;
                        } else {
                            let refill = now.duration_since(last).as_secs_f64()
                                / duration.as_secs_f64()
                                * units as f64;
                            tokens = (tokens + refill).min(capacity);
                        }
                        last = now;

                        let weight = cost(&chunk) as f64;
                        let affordable = weight <= tokens;
                        tokens -= weight;
                        if affordable {
                            yield Ok(chunk);
                        } else {
                            debug!(
                                "throttle dropped chunk of {} elements",
                                chunk.len()
                            );
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
