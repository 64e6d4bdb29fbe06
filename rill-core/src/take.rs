// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The tri-state envelope producers use to hand their outcome to a consumer.

use crate::chunk::Chunk;
use crate::error::StreamError;

/// A single pull outcome serialized for transport across a queue or handoff.
///
/// Whenever one task must hand the result of pulling a stream to another
/// task, the outcome travels as a `Take`: a chunk of elements, a typed
/// failure, or a graceful end. The absent/present-error convention lives
/// here: `End` is not an error.
#[derive(Debug, Clone)]
pub enum Take<T> {
    /// A batch of elements was produced.
    Emit(Chunk<T>),
    /// The producer failed; the stream terminates with this error.
    Fail(StreamError),
    /// The producer completed gracefully.
    End,
}

impl<T> Take<T> {
    /// A `Take` carrying a single element.
    pub fn single(item: T) -> Self {
        Take::Emit(Chunk::single(item))
    }

    /// Whether this take ends the stream (gracefully or not).
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Take::Emit(_))
    }

    /// Whether this is a graceful end.
    pub fn is_end(&self) -> bool {
        matches!(self, Take::End)
    }

    /// Maps the carried chunk, leaving `Fail` and `End` untouched.
    pub fn map<U, F>(&self, f: F) -> Take<U>
    where
        F: FnMut(&T) -> U,
    {
        match self {
            Take::Emit(chunk) => Take::Emit(chunk.map(f)),
            Take::Fail(e) => Take::Fail(e.clone()),
            Take::End => Take::End,
        }
    }

    /// Converts into the `Result`/`Option` shape pull loops match on:
    /// `Ok(Some(chunk))` for data, `Ok(None)` for end, `Err` for failure.
    pub fn into_pull(self) -> Result<Option<Chunk<T>>, StreamError> {
        match self {
            Take::Emit(chunk) => Ok(Some(chunk)),
            Take::Fail(e) => Err(e),
            Take::End => Ok(None),
        }
    }
}

impl<T> From<Result<Chunk<T>, StreamError>> for Take<T> {
    fn from(result: Result<Chunk<T>, StreamError>) -> Self {
        match result {
            Ok(chunk) => Take::Emit(chunk),
            Err(e) => Take::Fail(e),
        }
    }
}
