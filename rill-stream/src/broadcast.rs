// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Splitting one stream into independent consumers through a hub.

use std::sync::Arc;

use async_stream::stream;
use futures::StreamExt;
use rill_core::{Scope, StreamError, Take};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::logging::warn;
use crate::stream::Stream;

impl<T> Stream<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Splits this stream into `n` independent consumers.
    ///
    /// The hub retains up to `maximum_lag` takes per consumer; a consumer
    /// that falls further behind observes [`StreamError::Lagged`] instead
    /// of silently losing elements. The driving task stops once every
    /// consumer is gone.
    pub fn broadcast(self, n: usize, maximum_lag: usize) -> Vec<Stream<T>> {
        let (hub, _) = broadcast::channel::<Take<T>>(maximum_lag.max(1));
        let receivers: Vec<broadcast::Receiver<Take<T>>> =
            (0..n).map(|_| hub.subscribe()).collect();

        let scope = Arc::new(Scope::new());
        scope.spawn(async move {
            let mut upstream = self.into_chunk_stream();
            loop {
                let take = match upstream.next().await {
                    Some(Ok(chunk)) => Take::Emit(chunk),
                    Some(Err(e)) => Take::Fail(e),
                    None => Take::End,
                };
                let terminal = take.is_terminal();
                if hub.send(take).is_err() {
                    // Every consumer unsubscribed.
                    return;
                }
                if terminal {
                    return;
                }
            }
        });

        receivers
            .into_iter()
            .map(|mut receiver| {
                let scope = Arc::clone(&scope);
                Stream::new(stream! {
                    // Each consumer keeps the driving task alive.
                    let _scope = scope;
                    loop {
                        match receiver.recv().await {
                            Ok(Take::Emit(chunk)) => yield Ok(chunk),
                            Ok(Take::Fail(e)) => {
                                yield Err(e);
                                return;
                            }
                            Ok(Take::End) | Err(RecvError::Closed) => return,
                            Err(RecvError::Lagged(missed)) => {
                                warn!("broadcast consumer lagged by {} takes", missed);
                                yield Err(StreamError::lagged(missed));
                                return;
                            }
                        }
                    }
                })
            })
            .collect()
    }
}
