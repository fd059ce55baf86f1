//! Watcher lifecycle state machine.

use std::{fmt, mem};

use crate::WatcherError;

/// Externally visible state of a watcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WatcherState {
    /// Created; the pipeline has not started.
    Initializing,
    /// The pipeline is running and expectations are accepted.
    Watching,
    /// A caller is waiting for outstanding expectations to settle.
    Draining,
    /// The pipeline has been shut down.
    Stopped,
}

impl WatcherState {
    /// Whether expectations may be registered in this state.
    pub const fn accepts_expectations(&self) -> bool {
        matches!(self, Self::Watching | Self::Draining)
    }

    /// Whether the pipeline thread is running in this state.
    pub const fn is_running(&self) -> bool {
        matches!(self, Self::Watching | Self::Draining)
    }
}

impl fmt::Display for WatcherState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Initializing => "initializing",
            Self::Watching => "watching",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        })
    }
}

/// Lifecycle of a watcher owning a running pipeline `P`.
#[derive(Debug)]
pub(crate) enum Lifecycle<P> {
    /// Pipeline not started yet.
    Initializing,
    /// Pipeline running.
    Watching(P),
    /// Pipeline running, drain requested.
    Draining(P),
    /// Pipeline shut down.
    Stopped,
}

impl<P> Lifecycle<P> {
    /// Create a lifecycle that has not started.
    pub(crate) const fn new() -> Self {
        Self::Initializing
    }

    pub(crate) const fn state(&self) -> WatcherState {
        match self {
            Self::Initializing => WatcherState::Initializing,
            Self::Watching(_) => WatcherState::Watching,
            Self::Draining(_) => WatcherState::Draining,
            Self::Stopped => WatcherState::Stopped,
        }
    }

    /// Fail unless the pipeline may still be started.
    pub(crate) fn ensure_startable(&self) -> Result<(), WatcherError> {
        match self {
            Self::Initializing => Ok(()),
            other => Err(WatcherError::AlreadyStarted(other.state())),
        }
    }

    /// Take ownership of a started pipeline.
    pub(crate) fn start(&mut self, pipeline: P) -> Result<(), WatcherError> {
        self.ensure_startable()?;
        *self = Self::Watching(pipeline);
        Ok(())
    }

    /// Move a running pipeline to draining; returns whether it is running.
    pub(crate) fn drain(&mut self) -> bool {
        *self = match mem::replace(self, Self::Stopped) {
            Self::Watching(pipeline) | Self::Draining(pipeline) => Self::Draining(pipeline),
            other => other,
        };
        matches!(self, Self::Draining(_))
    }

    /// Stop for good, returning the pipeline if one was running.
    pub(crate) fn stop(&mut self) -> Option<P> {
        match mem::replace(self, Self::Stopped) {
            Self::Watching(pipeline) | Self::Draining(pipeline) => Some(pipeline),
            Self::Initializing | Self::Stopped => None,
        }
    }
}

impl<P> Default for Lifecycle<P> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_through_every_state() {
        let mut lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.state(), WatcherState::Initializing);
        assert!(!lifecycle.state().accepts_expectations());

        lifecycle.start(7u8).unwrap();
        assert_eq!(lifecycle.state(), WatcherState::Watching);
        assert!(lifecycle.state().accepts_expectations());

        assert!(lifecycle.drain());
        assert_eq!(lifecycle.state(), WatcherState::Draining);
        assert!(lifecycle.drain());

        assert_eq!(lifecycle.stop(), Some(7));
        assert_eq!(lifecycle.state(), WatcherState::Stopped);
        assert_eq!(lifecycle.stop(), None);
    }

    #[test]
    fn start_only_once() {
        let mut lifecycle = Lifecycle::new();
        lifecycle.start(1u8).unwrap();
        assert!(matches!(
            lifecycle.start(2),
            Err(WatcherError::AlreadyStarted(WatcherState::Watching))
        ));

        lifecycle.stop();
        assert!(matches!(
            lifecycle.start(3),
            Err(WatcherError::AlreadyStarted(WatcherState::Stopped))
        ));
    }

    #[test]
    fn drain_without_pipeline_keeps_state() {
        let mut lifecycle = Lifecycle::<u8>::new();
        assert!(!lifecycle.drain());
        assert_eq!(lifecycle.state(), WatcherState::Initializing);

        lifecycle.stop();
        assert!(!lifecycle.drain());
        assert_eq!(lifecycle.state(), WatcherState::Stopped);
    }
}
