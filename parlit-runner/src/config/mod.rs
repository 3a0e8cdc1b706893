// Copyright (c) The parlit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration support for parlit.
//!
//! Configuration is read from an embedded default, layered with an optional repository file at
//! `.config/parlit.toml`. Settings are grouped into named profiles.

mod imp;
mod run_config;
mod test_threads;

pub use imp::*;
pub use run_config::*;
pub use test_threads::*;
