// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use std::time::Duration;

use rill_core::StreamError;
use rill_stream::{Either, Schedule, Sink, Stream};
use rill_test_utils::helpers::{expect_end, expect_failure, expect_next_chunk};
use rill_test_utils::TestChannel;

#[tokio::test]
async fn test_sink_completion_closes_windows_and_carries_leftover() -> anyhow::Result<()> {
    // Arrange: windows of two elements against a schedule that never fires
    // in time.
    let sink = Sink::collect_n(2);
    let schedule = Schedule::spaced(Duration::from_secs(3600));

    // Act
    let windows = Stream::from_iter(vec![1, 2, 3, 4, 5])
        .aggregate_async_within(sink, schedule)
        .run_collect()
        .await?;

    // Assert: the chunk's tail carries across windows, never dropped.
    assert_eq!(windows, vec![vec![1, 2], vec![3, 4], vec![5]]);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_schedule_timeout_closes_the_window_with_the_partial_aggregate(
) -> anyhow::Result<()> {
    // Arrange
    let (tx, stream) = TestChannel::<i32>::new();
    let sink = Sink::fold(0, |acc, n| acc + n);
    let schedule = Schedule::spaced(Duration::from_millis(100));
    let mut aggregated = stream.aggregate_async_within(sink, schedule);

    // Act
    tx.send(1).await;
    tx.send(2).await;

    // Assert: the timer fires before the fold can ever complete.
    expect_next_chunk(&mut aggregated, &[3]).await;

    // Act: a second window aggregates what arrives next.
    tx.send(4).await;

    // Assert
    expect_next_chunk(&mut aggregated, &[4]).await;

    tx.end().await;
    expect_end(&mut aggregated).await;

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_schedule_completion_emits_its_terminal_output_as_left() -> anyhow::Result<()> {
    // Arrange: the schedule fires once, then completes.
    let (tx, stream) = TestChannel::<i32>::new();
    let sink = Sink::fold(0, |acc, n| acc + n);
    let schedule = Schedule::recurs(1, Duration::from_millis(100));
    let mut aggregated = stream.aggregate_async_within_either(sink, schedule);

    // Act
    tx.send(1).await;
    tx.send(2).await;

    // Assert: the single tick closes the first window.
    expect_next_chunk(&mut aggregated, &[Either::Right(3)]).await;

    // Assert: the exhausted schedule emits its own terminal output and
    // restarts from its first step.
    expect_next_chunk(&mut aggregated, &[Either::Left(1)]).await;

    // Act: input after the restart opens a fresh window.
    tx.send(7).await;
    tx.end().await;

    // Assert
    expect_next_chunk(&mut aggregated, &[Either::Right(7)]).await;
    expect_end(&mut aggregated).await;

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_sink_completion_restarts_the_schedule_delay() -> anyhow::Result<()> {
    // Arrange: every window closes by sink completion well before the
    // one-shot schedule can fire.
    let (tx, stream) = TestChannel::<i32>::new();
    let sink = Sink::collect_n(1);
    let schedule = Schedule::recurs(1, Duration::from_millis(150));
    let mut aggregated = stream.aggregate_async_within_either(sink, schedule);

    // Act & Assert: the delay restarts with each window, so the schedule
    // never fires and never emits its terminal output.
    for n in 1..=4 {
        tx.send(n).await;
        expect_next_chunk(&mut aggregated, &[Either::Right(vec![n])]).await;
        tokio::time::advance(Duration::from_millis(40)).await;
    }

    tx.end().await;
    expect_end(&mut aggregated).await;

    Ok(())
}

#[tokio::test]
async fn test_a_schedule_with_no_steps_never_closes_a_window() -> anyhow::Result<()> {
    // Arrange: the schedule is exhausted from the start, so only the
    // upstream end can close the single window.
    let sink = Sink::fold(0, |acc, n| acc + n);
    let schedule = Schedule::recurs(0, Duration::from_millis(10));

    // Act
    let windows = Stream::from_iter(vec![1, 2, 3])
        .aggregate_async_within(sink, schedule)
        .run_collect()
        .await?;

    // Assert
    assert_eq!(windows, vec![6]);

    Ok(())
}

#[tokio::test]
async fn test_upstream_end_closes_the_final_window() -> anyhow::Result<()> {
    // Arrange
    let sink = Sink::fold(0, |acc, n| acc + n);
    let schedule = Schedule::spaced(Duration::from_secs(3600));

    // Act
    let windows = Stream::from_iter(vec![5, 6])
        .aggregate_async_within(sink, schedule)
        .run_collect()
        .await?;

    // Assert
    assert_eq!(windows, vec![11]);

    Ok(())
}

#[tokio::test]
async fn test_aggregate_propagates_an_upstream_failure() -> anyhow::Result<()> {
    // Arrange
    let (tx, stream) = TestChannel::<i32>::new();
    let sink = Sink::fold(0, |acc, n| acc + n);
    let schedule = Schedule::spaced(Duration::from_secs(3600));
    let mut aggregated = stream.aggregate_async_within(sink, schedule);

    // Act
    tx.send(1).await;
    tx.fail(StreamError::processing("upstream broke")).await;

    // Assert
    let failure = expect_failure(&mut aggregated).await;
    assert!(matches!(failure, StreamError::Processing { .. }));

    Ok(())
}
