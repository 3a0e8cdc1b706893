// Copyright (c) The parlit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Support for handling signals in parlit.
//!
//! Shutdown signals are forwarded over a channel to the thread orchestrating the run, which treats
//! them as a request to abort immediately.

use crate::errors::SignalHandlerSetupError;
use crossbeam_channel::Receiver;
use std::fmt;

/// The kind of signal handling to set up for a test run.
///
/// A `SignalHandlerKind` can be passed into
/// [`TestRunnerBuilder::build`](crate::runner::TestRunnerBuilder::build).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum SignalHandlerKind {
    /// The standard signal handler. Capture interrupt and termination signals depending on the
    /// platform.
    Standard,

    /// A no-op signal handler. Useful for tests.
    Noop,
}

impl SignalHandlerKind {
    pub(crate) fn build(self) -> Result<SignalHandler, SignalHandlerSetupError> {
        match self {
            Self::Standard => SignalHandler::new(),
            Self::Noop => Ok(SignalHandler::noop()),
        }
    }
}

/// The signal handler implementation.
#[derive(Debug)]
pub(crate) struct SignalHandler {
    receiver: Receiver<ShutdownEvent>,
    #[cfg(unix)]
    handle: Option<signal_hook::iterator::Handle>,
}

impl SignalHandler {
    /// Creates a new `SignalHandler` that handles Ctrl-C and other shutdown signals.
    #[cfg(unix)]
    pub(crate) fn new() -> Result<Self, SignalHandlerSetupError> {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let handle = imp::spawn_signal_thread(sender)?;
        Ok(Self {
            receiver,
            handle: Some(handle),
        })
    }

    /// On platforms without signal support, the platform's default Ctrl-C handling applies.
    #[cfg(not(unix))]
    pub(crate) fn new() -> Result<Self, SignalHandlerSetupError> {
        Ok(Self::noop())
    }

    /// Creates a new `SignalHandler` that never produces events.
    pub(crate) fn noop() -> Self {
        Self {
            receiver: crossbeam_channel::never(),
            #[cfg(unix)]
            handle: None,
        }
    }

    pub(crate) fn receiver(&self) -> &Receiver<ShutdownEvent> {
        &self.receiver
    }

    /// Returns true if this handler intercepts signals, so their default disposition no longer
    /// applies.
    pub(crate) fn is_active(&self) -> bool {
        #[cfg(unix)]
        {
            self.handle.is_some()
        }
        #[cfg(not(unix))]
        {
            false
        }
    }

    /// Returns a pending shutdown event, if any, without blocking.
    pub(crate) fn try_recv(&self) -> Option<ShutdownEvent> {
        self.receiver.try_recv().ok()
    }
}

#[cfg(unix)]
impl Drop for SignalHandler {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.close();
        }
    }
}

#[cfg(unix)]
mod imp {
    use super::ShutdownEvent;
    use crossbeam_channel::Sender;
    use signal_hook::{
        consts::{SIGHUP, SIGINT, SIGTERM},
        iterator::{Handle, Signals},
        low_level::emulate_default_handler,
    };
    use tracing::debug;

    pub(super) fn spawn_signal_thread(sender: Sender<ShutdownEvent>) -> std::io::Result<Handle> {
        let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP])?;
        let handle = signals.handle();

        std::thread::Builder::new()
            .name("parlit-signal".to_owned())
            .spawn(move || {
                let mut term_once = false;

                for signal in signals.forever() {
                    if term_once {
                        // A second signal means whoever is in charge of the first one is stuck.
                        debug!("received signal {signal} twice, using default handler");
                        let _ = emulate_default_handler(signal);
                        continue;
                    }

                    let event = match signal {
                        SIGINT => ShutdownEvent::Interrupt,
                        SIGTERM => ShutdownEvent::Term,
                        SIGHUP => ShutdownEvent::Hangup,
                        _ => continue,
                    };
                    term_once = true;
                    if sender.send(event).is_err() {
                        // The run is over.
                        break;
                    }
                }
            })?;

        Ok(handle)
    }
}

/// A signal event that should cause a shutdown to happen.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ShutdownEvent {
    /// SIGHUP.
    #[cfg(unix)]
    Hangup,

    /// SIGTERM.
    #[cfg(unix)]
    Term,

    /// SIGINT, or Ctrl-C on Windows.
    Interrupt,
}

impl fmt::Display for ShutdownEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            #[cfg(unix)]
            Self::Hangup => write!(f, "SIGHUP"),
            #[cfg(unix)]
            Self::Term => write!(f, "SIGTERM"),
            Self::Interrupt => write!(f, "SIGINT"),
        }
    }
}
