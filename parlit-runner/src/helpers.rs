// Copyright (c) The parlit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::any::Any;

/// Utilities for pluralizing various words based on count or plurality.
pub(crate) mod plural {
    /// Returns "test" if `count` is 1, otherwise "tests".
    pub(crate) fn tests_str(count: usize) -> &'static str {
        if count == 1 { "test" } else { "tests" }
    }

    /// Returns "thread" if `count` is 1, otherwise "threads".
    pub(crate) fn threads_str(count: usize) -> &'static str {
        if count == 1 { "thread" } else { "threads" }
    }
}

/// Extracts a string message from a panic payload.
pub(crate) fn panic_payload_to_string(payload: Box<dyn Any + Send + 'static>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "(unknown panic payload)".to_owned()
    }
}
