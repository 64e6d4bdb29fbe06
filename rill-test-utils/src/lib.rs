// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Test utilities for the rill workspace.
//!
//! Production code composes a [`rill_stream::Stream`] through consuming
//! combinators; tests additionally need to push values, failures and
//! terminals imperatively while the stream is being pulled. [`TestChannel`]
//! bridges the two, and [`helpers`] carries the assertion functions the
//! operator tests share.

pub mod helpers;
pub mod test_channel;

pub use helpers::assert_no_element_emitted;
pub use test_channel::TestChannel;
