// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use std::time::Duration;

use rill_core::StreamError;
use rill_stream::Stream;
use rill_test_utils::helpers::{expect_end, expect_failure, expect_next_chunk};
use rill_test_utils::{assert_no_element_emitted, TestChannel};
use tokio::time::{advance, Instant};

#[tokio::test(start_paused = true)]
async fn test_debounce_emits_the_last_element_of_a_burst_after_quiet_time() -> anyhow::Result<()> {
    // Arrange
    let (tx, stream) = TestChannel::<i32>::new();
    let mut debounced = stream.debounce(Duration::from_millis(500));

    // Act: a sub-500ms-spaced burst.
    tx.send(1).await;
    tx.send(2).await;
    tx.send(3).await;
    let start = Instant::now();

    // Assert: exactly the last element, once, only after >= 500ms idle.
    expect_next_chunk(&mut debounced, &[3]).await;
    assert!(start.elapsed() >= Duration::from_millis(500));

    tx.end().await;
    expect_end(&mut debounced).await;

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_debounce_restarts_the_window_on_a_new_value() -> anyhow::Result<()> {
    // Arrange
    let (tx, stream) = TestChannel::<i32>::new();
    let mut debounced = stream.debounce(Duration::from_millis(500));

    // Act & Assert
    tx.send(1).await;
    assert_no_element_emitted(&mut debounced, 300).await;

    // The superseding value restarts the quiet window; 1 is never emitted.
    tx.send(2).await;
    assert_no_element_emitted(&mut debounced, 300).await;

    advance(Duration::from_millis(250)).await;
    expect_next_chunk(&mut debounced, &[2]).await;

    tx.end().await;
    expect_end(&mut debounced).await;

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_debounce_flushes_the_outstanding_value_on_end() -> anyhow::Result<()> {
    // Arrange
    let (tx, stream) = TestChannel::<i32>::new();
    let mut debounced = stream.debounce(Duration::from_millis(200));

    // Act
    tx.send(7).await;
    tx.end().await;

    // Assert: the pending value is joined and flushed, then the stream ends.
    expect_next_chunk(&mut debounced, &[7]).await;
    expect_end(&mut debounced).await;

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_debounce_propagates_an_upstream_failure() -> anyhow::Result<()> {
    // Arrange
    let (tx, stream) = TestChannel::<i32>::new();
    let mut debounced = stream.debounce(Duration::from_millis(200));

    // Act
    tx.send(1).await;
    tx.fail(StreamError::processing("upstream broke")).await;

    // Assert: the pending value is discarded in favor of the failure.
    let failure = expect_failure(&mut debounced).await;
    assert!(matches!(failure, StreamError::Processing { .. }));

    Ok(())
}
