// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! # Rill
//!
//! A pull-based, chunked async stream engine with concurrency-heavy
//! combinators: two-source coordination, non-deterministic merge, bounded
//! fan-out, dynamic per-key partitioning, debouncing, sink-plus-schedule
//! aggregation, token-bucket throttling and backpressure-aware buffering.
//!
//! ## Overview
//!
//! Elements travel in immutable [`Chunk`]s over one boxed pull channel per
//! [`Stream`]. Combinators that need concurrency fork background tasks on
//! a [`Scope`] and coordinate through bounded [`Queue`]s, one-slot
//! [`Handoff`]s and channels; dropping the composed stream interrupts
//! everything it forked.
//!
//! ## Quick Start
//!
//! ```rust
//! use rill::Stream;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let evens = Stream::from_iter(1..=10)
//!         .filter(|n| n % 2 == 0)
//!         .map(|n| n * n)
//!         .run_collect()
//!         .await?;
//!     assert_eq!(evens, vec![4, 16, 36, 64, 100]);
//!     Ok(())
//! }
//! ```

// Re-export core primitives
pub use rill_core::{Chunk, Handoff, Queue, QueueShutdown, Result, Scope, StreamError, Take};

// Re-export the stream type and its operator vocabulary
pub use rill_stream::{
    ChunkPuller, Distributor, Either, ElementPuller, GroupBy, HandoffSignal, Predicate, Schedule,
    ScheduleDone, ScheduleDriver, Sink, SinkEndReason, SinkStep, Stream, TerminationStrategy,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Chunk, Either, Queue, Schedule, Scope, Sink, Stream, StreamError, Take,
        TerminationStrategy,
    };
}
