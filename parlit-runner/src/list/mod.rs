// Copyright (c) The parlit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Support for building and querying lists of tests.
//!
//! The discovery layer produces a [`TestList`]; a [`TestSelection`] narrows it down and fixes the
//! order tests are dispatched in.

mod selection;
mod test_list;

pub use selection::*;
pub use test_list::*;
