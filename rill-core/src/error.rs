// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Error types for the rill stream engine.
//!
//! The engine carries typed failures as ordinary values: a failing stream
//! terminates with a [`StreamError`] delivered through a [`crate::Take::Fail`]
//! envelope, while a graceful end travels as [`crate::Take::End`]. Output
//! emitted before a failure remains valid and is never retracted.

/// Root error type for all rill operations.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Stream processing encountered an error.
    ///
    /// General-purpose variant for failures raised by the engine itself
    /// (coordination, partitioning, scheduling).
    #[error("stream processing error: {context}")]
    Processing {
        /// Description of what went wrong during stream processing
        context: String,
    },

    /// Custom error from user code.
    ///
    /// Wraps errors produced by user-provided closures (deciders, sinks,
    /// derivation functions) so they propagate through the engine unchanged.
    #[error("user error: {0}")]
    User(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A broadcast consumer fell behind the hub and missed items.
    #[error("consumer lagged behind by {missed} items")]
    Lagged {
        /// Number of items the consumer missed
        missed: u64,
    },
}

impl StreamError {
    /// Create a stream processing error with the given context.
    pub fn processing(context: impl Into<String>) -> Self {
        Self::Processing {
            context: context.into(),
        }
    }

    /// Wrap a user error.
    pub fn user(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::User(Box::new(error))
    }

    /// Create a lag error for a broadcast consumer that missed `missed` items.
    pub fn lagged(missed: u64) -> Self {
        Self::Lagged { missed }
    }
}

impl Clone for StreamError {
    fn clone(&self) -> Self {
        match self {
            Self::Processing { context } => Self::Processing {
                context: context.clone(),
            },
            // The boxed error is not clonable; preserve its message instead
            Self::User(e) => Self::Processing {
                context: format!("user error: {e}"),
            },
            Self::Lagged { missed } => Self::Lagged { missed: *missed },
        }
    }
}

/// Specialized `Result` type for rill operations.
pub type Result<T> = std::result::Result<T, StreamError>;

/// Error returned by queue operations after the queue has been shut down.
///
/// Shutdown is an unsubscription signal, not a fault: producers that observe
/// it prune the queue from their live set and carry on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("queue is shut down")]
pub struct QueueShutdown;
