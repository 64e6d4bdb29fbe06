// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Shared assertions for operator tests.

use std::time::Duration;

use futures::stream::StreamExt;
use futures::Stream;
use rill_core::{Chunk, StreamError};
use tokio::time::sleep;

/// Asserts the stream stays silent for `timeout_ms` milliseconds.
pub async fn assert_no_element_emitted<S, T>(stream: &mut S, timeout_ms: u64)
where
    S: Stream<Item = T> + Unpin,
{
    tokio::select! {
        _item = stream.next() => {
            panic!("Unexpected element emitted, expected no output.");
        }
        _ = sleep(Duration::from_millis(timeout_ms)) => {
        }
    }
}

/// Pulls the next chunk and asserts it equals `expected` element-wise.
pub async fn expect_next_chunk<S, T>(stream: &mut S, expected: &[T])
where
    S: Stream<Item = Result<Chunk<T>, StreamError>> + Unpin,
    T: Clone + PartialEq + std::fmt::Debug,
{
    let chunk = stream
        .next()
        .await
        .expect("expected next chunk")
        .expect("expected a chunk, got a failure");
    assert_eq!(chunk.as_slice(), expected);
}

/// Pulls the next item and asserts the stream failed.
pub async fn expect_failure<S, T>(stream: &mut S) -> StreamError
where
    S: Stream<Item = Result<Chunk<T>, StreamError>> + Unpin,
{
    loop {
        match stream.next().await.expect("expected a failure, got end") {
            Ok(_) => continue,
            Err(e) => return e,
        }
    }
}

/// Asserts the stream has ended.
pub async fn expect_end<S, T>(stream: &mut S)
where
    S: Stream<Item = Result<Chunk<T>, StreamError>> + Unpin,
    T: std::fmt::Debug,
{
    if let Some(item) = stream.next().await {
        match item {
            Ok(chunk) => panic!("expected end, got chunk {:?}", chunk.as_slice()),
            Err(e) => panic!("expected end, got failure {e}"),
        }
    }
}
