// Copyright (c) The parlit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::list::{Test, TestList};
use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};
use tracing::debug;

/// Hands out each test in a list to exactly one caller.
///
/// Dispatch stops once the source is canceled or the deadline passes. Tests that were never
/// dispatched keep an empty result slot, to be reconciled by the runner.
pub(crate) struct WorkSource<C> {
    test_list: Arc<TestList<C>>,
    start: Instant,
    max_duration: Option<Duration>,
    state: Mutex<WorkSourceState>,
}

#[derive(Debug, Default)]
struct WorkSourceState {
    next_index: usize,
    canceled: bool,
}

impl<C> WorkSource<C> {
    /// Creates a new source. The deadline clock starts now.
    pub(crate) fn new(test_list: Arc<TestList<C>>, max_duration: Option<Duration>) -> Self {
        Self {
            test_list,
            start: Instant::now(),
            max_duration,
            state: Mutex::new(WorkSourceState::default()),
        }
    }

    /// Returns the next test to run, or `None` if there's nothing left to dispatch.
    pub(crate) fn next(&self) -> Option<&Test<C>> {
        // The deadline is checked before the queue: once it passes, remaining tests starve.
        if self
            .max_duration
            .is_some_and(|max_duration| self.start.elapsed() >= max_duration)
        {
            return None;
        }

        let mut state = self.lock_state();
        if state.canceled {
            return None;
        }
        let test = self.test_list.get(state.next_index)?;
        state.next_index += 1;
        Some(test)
    }

    /// Stops dispatching tests. Tests that were already handed out are unaffected.
    pub(crate) fn cancel(&self) {
        let mut state = self.lock_state();
        if !state.canceled {
            debug!(
                "work source canceled after dispatching {} tests",
                state.next_index
            );
            state.canceled = true;
        }
    }

    #[cfg(test)]
    pub(crate) fn test_list(&self) -> &TestList<C> {
        &self.test_list
    }

    #[cfg(test)]
    pub(crate) fn is_canceled(&self) -> bool {
        self.lock_state().canceled
    }

    /// The number of tests handed out so far.
    pub(crate) fn dispatched_count(&self) -> usize {
        self.lock_state().next_index
    }

    fn lock_state(&self) -> MutexGuard<'_, WorkSourceState> {
        // The state is updated in single assignments, so it's consistent even after a panic.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<C> fmt::Debug for WorkSource<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkSource")
            .field("test_count", &self.test_list.len())
            .field("max_duration", &self.max_duration)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

trait CancelWork: Send + Sync {
    fn cancel(&self);
}

impl<C: Send + Sync> CancelWork for WorkSource<C> {
    fn cancel(&self) {
        WorkSource::cancel(self)
    }
}

/// A handle to stop dispatching new tests in a run, from any thread.
///
/// Tests that are already executing run to completion. Tests that never started are reported as
/// [`Unresolved`](crate::result::ResultCode::Unresolved).
///
/// Returned by [`TestRunner::cancel_handle`](crate::runner::TestRunner::cancel_handle).
#[derive(Clone)]
pub struct CancelHandle {
    source: Arc<dyn CancelWork>,
}

impl CancelHandle {
    pub(crate) fn new<C: Send + Sync + 'static>(source: Arc<WorkSource<C>>) -> Self {
        Self { source }
    }

    /// Stops dispatching new tests. Calling this more than once has no further effect.
    pub fn cancel(&self) {
        self.source.cancel();
    }
}

impl fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelHandle").finish_non_exhaustive()
    }
}
