// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use rill_core::StreamError;
use rill_stream::{Stream, TerminationStrategy};
use rill_test_utils::helpers::expect_failure;
use rill_test_utils::TestChannel;

#[tokio::test]
async fn test_merge_emits_the_multiset_union_preserving_per_source_order() -> anyhow::Result<()> {
    // Arrange
    let left_elements = vec![1, 2, 3, 4];
    let right_elements = vec![10, 20, 30];
    let left = Stream::from_iter(left_elements.clone()).rechunk(1);
    let right = Stream::from_iter(right_elements.clone()).rechunk(1);

    // Act
    let merged = left.merge(right).run_collect().await?;

    // Assert: multiset union
    let mut sorted = merged.clone();
    sorted.sort_unstable();
    let mut expected = [left_elements.clone(), right_elements.clone()].concat();
    expected.sort_unstable();
    assert_eq!(sorted, expected);

    // Assert: order within each source is preserved
    let left_order: Vec<i32> = merged
        .iter()
        .copied()
        .filter(|n| left_elements.contains(n))
        .collect();
    let right_order: Vec<i32> = merged
        .iter()
        .copied()
        .filter(|n| right_elements.contains(n))
        .collect();
    assert_eq!(left_order, left_elements);
    assert_eq!(right_order, right_elements);

    Ok(())
}

#[tokio::test]
async fn test_merge_halt_left_ends_with_the_left_source() -> anyhow::Result<()> {
    // Arrange: the right side stays open for the whole test.
    let (right_tx, right) = TestChannel::<i32>::new();
    let left = Stream::from_iter(vec![1, 2]);

    // Act
    let merged = left
        .merge_halt(right, TerminationStrategy::Left)
        .run_collect()
        .await?;

    // Assert
    assert_eq!(merged, vec![1, 2]);
    drop(right_tx);

    Ok(())
}

#[tokio::test]
async fn test_merge_halt_either_adopts_the_first_exit() -> anyhow::Result<()> {
    // Arrange
    let (left_tx, left) = TestChannel::<i32>::new();
    let right = Stream::empty();

    // Act: the right side ends immediately, so the merge must not wait
    // for the left.
    let merged = left
        .merge_halt(right, TerminationStrategy::Either)
        .run_collect()
        .await?;

    // Assert
    assert_eq!(merged, Vec::<i32>::new());
    drop(left_tx);

    Ok(())
}

#[tokio::test]
async fn test_merge_with_maps_both_sides_into_a_common_type() -> anyhow::Result<()> {
    // Arrange
    let numbers = Stream::from_iter(vec![1, 2]);
    let labels = Stream::from_iter(vec!["a", "b"]);

    // Act
    let mut merged = numbers
        .merge_with(
            labels,
            TerminationStrategy::Both,
            |n| n.to_string(),
            |s| s.to_string(),
        )
        .run_collect()
        .await?;

    // Assert
    merged.sort();
    assert_eq!(merged, vec!["1", "2", "a", "b"]);

    Ok(())
}

#[tokio::test]
async fn test_merge_propagates_a_failure_from_either_side() -> anyhow::Result<()> {
    // Arrange
    let failing =
        Stream::from_iter(vec![1]).concat(Stream::fail(StreamError::processing("left broke")));
    let (right_tx, right) = TestChannel::<i32>::new();

    // Act
    let mut merged = failing.merge(right);

    // Assert
    let failure = expect_failure(&mut merged).await;
    assert!(matches!(failure, StreamError::Processing { .. }));
    drop(right_tx);

    Ok(())
}
