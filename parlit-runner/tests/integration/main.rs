// Copyright (c) The parlit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the parlit runner.

mod abort;
mod basic;
mod fixtures;
