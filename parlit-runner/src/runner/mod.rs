// Copyright (c) The parlit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The test runner.
//!
//! The main structure in this module is [`TestRunner`].

mod executor;
mod imp;
mod work_source;
mod worker;

pub use executor::*;
pub use imp::*;
pub use work_source::CancelHandle;
