// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

#![allow(clippy::multiple_crate_versions, clippy::doc_markdown)]
//! Core primitives for the rill chunked stream engine.
//!
//! Everything here is a building block the combinators in `rill-stream`
//! coordinate through: immutable [`Chunk`] batches, the tri-state [`Take`]
//! envelope, one-slot [`Handoff`] rendezvous, overflow-policy [`Queue`]s
//! and task-owning [`Scope`]s. None of these hold global state; each run of
//! a composed stream creates the instances it needs and tears them down on
//! every exit path.

pub mod chunk;
pub mod error;
pub mod handoff;
pub mod queue;
pub mod scope;
pub mod take;

pub use self::chunk::Chunk;
pub use self::error::{QueueShutdown, Result, StreamError};
pub use self::handoff::Handoff;
pub use self::queue::Queue;
pub use self::scope::Scope;
pub use self::take::Take;
