// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The envelope time-driven combinators pass between their feeder and
//! aggregator tasks.

use rill_core::{Chunk, StreamError};

/// Why a sink-driven window closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEndReason<C> {
    /// The sink itself signalled completion.
    SinkEnd,
    /// The schedule ran to completion, yielding its terminal output.
    ScheduleEnd(C),
    /// The schedule's timer fired before the sink completed.
    ScheduleTimeout,
    /// The upstream ended, closing the final window.
    UpstreamEnd,
}

/// A [`rill_core::Take`] specialized with a schedule-output type.
///
/// Debounce and aggregation feeders produce these; `End` carries the
/// reason the window closed rather than a bare end marker.
#[derive(Debug, Clone)]
pub enum HandoffSignal<C, T> {
    /// A batch of upstream elements.
    Emit(Chunk<T>),
    /// The upstream failed; the composed stream terminates with this error.
    Halt(StreamError),
    /// The window closed gracefully for the carried reason.
    End(SinkEndReason<C>),
}
