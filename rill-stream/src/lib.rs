// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The [`Stream`] type and its combinators.
//!
//! Concurrency-free transformations live in [`stream`]; every other
//! module implements one concurrent operator by forking tasks on a
//! [`rill_core::Scope`] and coordinating through queues, handoffs and
//! channels. All resources are created when the composed stream is first
//! polled and torn down when it is dropped.

pub mod aggregate;
pub mod broadcast;
pub mod buffer;
pub mod combine;
pub mod debounce;
pub mod flat_map_par;
pub mod group_by;
pub mod handoff_signal;
pub mod logging;
pub mod merge;
pub mod schedule;
pub mod sink;
pub mod stream;
pub mod throttle;

pub use aggregate::Either;
pub use combine::{ChunkPuller, ElementPuller};
pub use group_by::{Distributor, GroupBy, Predicate};
pub use handoff_signal::{HandoffSignal, SinkEndReason};
pub use merge::TerminationStrategy;
pub use schedule::{Schedule, ScheduleDone, ScheduleDriver};
pub use sink::{Sink, SinkStep};
pub use stream::Stream;
