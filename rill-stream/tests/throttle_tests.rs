// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use std::time::Duration;

use rill_stream::Stream;
use rill_test_utils::helpers::{expect_end, expect_next_chunk};
use rill_test_utils::{assert_no_element_emitted, TestChannel};
use tokio::time::advance;

fn weight_is_len(chunk: &rill_core::Chunk<i32>) -> u64 {
    chunk.len() as u64
}

#[tokio::test(start_paused = true)]
async fn test_overweight_chunks_are_dropped_and_still_debited() -> anyhow::Result<()> {
    // Arrange: capacity 10 tokens, no burst.
    let (tx, stream) = TestChannel::<i32>::new();
    let mut throttled = stream.throttle_enforce(10, Duration::from_secs(60), 0, weight_is_len);

    // Act: a 12-element chunk outweighs the full bucket.
    tx.send_chunk(0..12).await;

    // Assert: dropped, not delayed, and the bucket goes into debt.
    assert_no_element_emitted(&mut throttled, 10).await;

    // Act: even a single element cannot pass while in debt.
    tx.send_chunk(0..1).await;

    // Assert
    assert_no_element_emitted(&mut throttled, 10).await;

    tx.end().await;
    expect_end(&mut throttled).await;

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_bucket_refills_to_capacity_and_never_beyond() -> anyhow::Result<()> {
    // Arrange: 10 tokens per second, burst of 2.
    let (tx, stream) = TestChannel::<i32>::new();
    let mut throttled = stream.throttle_enforce(10, Duration::from_secs(1), 2, weight_is_len);

    // Act: drain the bucket.
    tx.send_chunk(0..12).await;
    expect_next_chunk(&mut throttled, &(0..12).collect::<Vec<_>>()).await;

    // A long idle period may only refill up to units + burst.
    advance(Duration::from_secs(60)).await;

    // Act: exactly capacity passes.
    tx.send_chunk(100..112).await;
    expect_next_chunk(&mut throttled, &(100..112).collect::<Vec<_>>()).await;

    // Assert: the bucket was capped at 12, so nothing is left over.
    tx.send_chunk(0..2).await;
    assert_no_element_emitted(&mut throttled, 10).await;

    tx.end().await;
    expect_end(&mut throttled).await;

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_forwarding_resumes_after_refill() -> anyhow::Result<()> {
    // Arrange
    let (tx, stream) = TestChannel::<i32>::new();
    let mut throttled = stream.throttle_enforce(5, Duration::from_secs(1), 0, weight_is_len);

    // Act
    tx.send_chunk(0..5).await;
    expect_next_chunk(&mut throttled, &[0, 1, 2, 3, 4]).await;

    tx.send_chunk(5..10).await;
    assert_no_element_emitted(&mut throttled, 10).await;

    // The dropped chunk debited the empty bucket; two seconds refill both
    // the debt and a fresh five tokens.
    advance(Duration::from_secs(2)).await;
    tx.send_chunk(10..15).await;

    // Assert
    expect_next_chunk(&mut throttled, &[10, 11, 12, 13, 14]).await;

    tx.end().await;
    expect_end(&mut throttled).await;

    Ok(())
}

#[tokio::test]
async fn test_chunks_within_budget_pass_untouched() -> anyhow::Result<()> {
    // Act
    let result = Stream::from_iter(1..=5)
        .throttle_enforce(100, Duration::from_secs(1), 0, weight_is_len)
        .run_collect()
        .await?;

    // Assert
    assert_eq!(result, vec![1, 2, 3, 4, 5]);

    Ok(())
}
