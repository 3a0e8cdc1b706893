// Copyright (c) The parlit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Documented exit codes and machine-readable summaries produced by `parlit`.
//!
//! These types are kept in a separate crate so that tools driving `parlit` as a subprocess can
//! interpret its results without depending on the runner itself.

mod exit_codes;
mod summary;

pub use exit_codes::*;
pub use summary::*;
