// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rill_core::StreamError;
use rill_stream::Stream;
use rill_test_utils::helpers::expect_failure;

#[tokio::test]
async fn test_flat_map_par_never_exceeds_the_concurrency_limit() -> anyhow::Result<()> {
    // Arrange
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    // Act
    let mut result = {
        let active = Arc::clone(&active);
        let peak = Arc::clone(&peak);
        Stream::from_iter(1..=20)
            .flat_map_par(Some(2), 4, move |n| {
                let active = Arc::clone(&active);
                let peak = Arc::clone(&peak);
                Stream::from_future(async move {
                    let now_active = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now_active, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(2)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                    Ok(n * 2)
                })
            })
            .run_collect()
            .await?
    };

    // Assert
    assert!(peak.load(Ordering::SeqCst) <= 2);
    result.sort_unstable();
    let expected: Vec<i32> = (1..=20).map(|n| n * 2).collect();
    assert_eq!(result, expected);

    Ok(())
}

#[tokio::test]
async fn test_flat_map_par_interleaves_derived_streams() -> anyhow::Result<()> {
    // Act
    let mut result = Stream::from_iter(vec![1, 2, 3])
        .flat_map_par(None, 8, |n| Stream::from_iter(vec![n, n * 10]))
        .run_collect()
        .await?;

    // Assert: every derived element arrives, order unconstrained.
    result.sort_unstable();
    assert_eq!(result, vec![1, 2, 3, 10, 20, 30]);

    Ok(())
}

#[tokio::test]
async fn test_flat_map_par_failure_interrupts_the_other_derivations() -> anyhow::Result<()> {
    // Arrange
    let completed = Arc::new(AtomicUsize::new(0));

    // Act
    let mut stream = {
        let completed = Arc::clone(&completed);
        Stream::from_iter(1..=10).flat_map_par(Some(4), 4, move |n| {
            let completed = Arc::clone(&completed);
            Stream::from_future(async move {
                if n == 1 {
                    Err(StreamError::processing("derivation broke"))
                } else {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    completed.fetch_add(1, Ordering::SeqCst);
                    Ok(n)
                }
            })
        })
    };

    // Assert
    let failure = expect_failure(&mut stream).await;
    assert!(matches!(failure, StreamError::Processing { .. }));
    assert!(completed.load(Ordering::SeqCst) < 10);

    Ok(())
}

#[tokio::test]
async fn test_map_par_unordered_delivers_every_result() -> anyhow::Result<()> {
    // Act
    let mut result = Stream::from_iter(1..=8)
        .map_par_unordered(Some(3), |n| async move {
            // Later elements finish first to force reordering.
            tokio::time::sleep(Duration::from_millis(9 - n as u64)).await;
            Ok(n * n)
        })
        .run_collect()
        .await?;

    // Assert
    result.sort_unstable();
    assert_eq!(result, vec![1, 4, 9, 16, 25, 36, 49, 64]);

    Ok(())
}
