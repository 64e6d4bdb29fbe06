// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! An imperative producer for driving streams under test.

use rill_core::{Chunk, StreamError, Take};
use rill_stream::Stream;
use tokio::sync::mpsc;

/// The push side of a stream: tests send elements, chunks, failures and
/// terminals while the paired [`Stream`] is consumed elsewhere.
pub struct TestChannel<T> {
    sender: mpsc::Sender<Take<T>>,
}

impl<T> TestChannel<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// A channel and the stream that drains it.
    pub fn new() -> (Self, Stream<T>) {
        let (sender, receiver) = mpsc::channel(64);
        (Self { sender }, Stream::from_channel(receiver))
    }

    /// Sends one element as a single-element chunk.
    pub async fn send(&self, item: T) {
        self.sender
            .send(Take::single(item))
            .await
            .expect("test stream was dropped");
    }

    /// Sends one multi-element chunk.
    pub async fn send_chunk<I>(&self, items: I)
    where
        I: IntoIterator<Item = T>,
    {
        self.sender
            .send(Take::Emit(items.into_iter().collect::<Chunk<T>>()))
            .await
            .expect("test stream was dropped");
    }

    /// Fails the stream.
    pub async fn fail(&self, error: StreamError) {
        self.sender
            .send(Take::Fail(error))
            .await
            .expect("test stream was dropped");
    }

    /// Ends the stream gracefully.
    pub async fn end(&self) {
        self.sender
            .send(Take::End)
            .await
            .expect("test stream was dropped");
    }
}
