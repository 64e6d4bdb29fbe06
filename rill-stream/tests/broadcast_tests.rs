// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use std::time::Duration;

use rill_core::StreamError;
use rill_stream::Stream;
use tokio::time::sleep;

#[tokio::test]
async fn test_broadcast_delivers_every_element_to_every_consumer() -> anyhow::Result<()> {
    // Arrange
    let outputs = Stream::from_iter(1..=5).rechunk(1).broadcast(3, 16);
    assert_eq!(outputs.len(), 3);

    // Act
    let mut handles = Vec::new();
    for output in outputs {
        handles.push(tokio::spawn(output.run_collect()));
    }

    // Assert
    for handle in handles {
        assert_eq!(handle.await??, (1..=5).collect::<Vec<_>>());
    }

    Ok(())
}

#[tokio::test]
async fn test_broadcast_fails_a_lagging_consumer_instead_of_losing_data() -> anyhow::Result<()> {
    // Arrange: room for a single take per consumer.
    let mut outputs = Stream::from_iter(1..=10).rechunk(1).broadcast(1, 1);
    let output = outputs.remove(0);

    // Act: let the driver outrun the unpolled consumer.
    sleep(Duration::from_millis(20)).await;
    let result = output.run_collect().await;

    // Assert
    match result {
        Err(StreamError::Lagged { missed }) => assert!(missed > 0),
        other => panic!("expected a lag failure, got {other:?}"),
    }

    Ok(())
}

#[tokio::test]
async fn test_broadcast_propagates_a_failure_to_every_consumer() -> anyhow::Result<()> {
    // Arrange
    let source =
        Stream::from_iter(vec![1]).concat(Stream::fail(StreamError::processing("upstream broke")));
    let outputs = source.broadcast(2, 16);

    // Act & Assert
    for output in outputs {
        assert!(output.run_collect().await.is_err());
    }

    Ok(())
}
