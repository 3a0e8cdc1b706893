// Copyright (c) The parlit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A concurrent test runner for suites of shell-driven tests.
//!
//! Tests are described in TOML manifests and run by `sh -c`. Scheduling, progress reporting and
//! result classification live in [`parlit_runner`].

#![warn(missing_docs)]

mod dispatch;
mod errors;
mod executor;
mod manifest;
mod output;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::*;
#[doc(hidden)]
pub use output::{OutputContext, OutputWriter, StderrStyles};
