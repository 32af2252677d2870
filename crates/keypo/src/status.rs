//! Decrypt progress as a state machine.
//!
//! ```text
//! Idle -> SettingUp -> AwaitingSession -> Decrypting -> Done
//!             \______________\________________\-----> Failed
//! ```
//!
//! `Done` and `Failed` are terminal for an attempt; the next `begin`
//! starts over at `SettingUp`. A `begin` while an attempt is in flight is
//! rejected with [`StatusError::Busy`].
//!
//! [`StatusMachine::attempt`] ties an attempt to an [`Attempt`] guard. If
//! the guard is dropped while the attempt is still in flight (for example
//! when the caller's future is cancelled by a timeout) the attempt ends as
//! `Failed` with [`CANCELLED`] as the reason.

use std::fmt;

use thiserror::Error;
use tokio::sync::watch;

/// Failure reason recorded for an attempt whose guard was dropped.
pub const CANCELLED: &str = "cancelled";

/// Progress of a decrypt attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecryptStatus {
    Idle,
    SettingUp,
    AwaitingSession,
    Decrypting,
    Done,
    Failed { reason: String },
}

impl DecryptStatus {
    /// Whether an attempt is running.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            DecryptStatus::SettingUp | DecryptStatus::AwaitingSession | DecryptStatus::Decrypting
        )
    }

    /// Position along the happy path; `None` off it.
    fn rank(&self) -> Option<u8> {
        match self {
            DecryptStatus::Idle => Some(0),
            DecryptStatus::SettingUp => Some(1),
            DecryptStatus::AwaitingSession => Some(2),
            DecryptStatus::Decrypting => Some(3),
            DecryptStatus::Done => Some(4),
            DecryptStatus::Failed { .. } => None,
        }
    }
}

impl fmt::Display for DecryptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecryptStatus::Idle => f.write_str("idle"),
            DecryptStatus::SettingUp => f.write_str("setting up"),
            DecryptStatus::AwaitingSession => f.write_str("awaiting session"),
            DecryptStatus::Decrypting => f.write_str("decrypting"),
            DecryptStatus::Done => f.write_str("done"),
            DecryptStatus::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}

/// Rejected status transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatusError {
    /// An attempt is already in flight.
    #[error("a decrypt is already in progress ({0})")]
    Busy(DecryptStatus),

    /// The transition is not on the state graph.
    #[error("cannot move from {from} to {to}")]
    InvalidTransition {
        from: DecryptStatus,
        to: DecryptStatus,
    },
}

/// Observable decrypt status.
#[derive(Debug)]
pub struct StatusMachine {
    tx: watch::Sender<DecryptStatus>,
}

impl Default for StatusMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusMachine {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(DecryptStatus::Idle);
        Self { tx }
    }

    /// Current status.
    pub fn current(&self) -> DecryptStatus {
        self.tx.borrow().clone()
    }

    /// Watch status changes.
    pub fn subscribe(&self) -> watch::Receiver<DecryptStatus> {
        self.tx.subscribe()
    }

    /// Start an attempt.
    pub fn begin(&self) -> Result<(), StatusError> {
        self.transition(|current| {
            if current.is_in_flight() {
                Err(StatusError::Busy(current.clone()))
            } else {
                Ok(DecryptStatus::SettingUp)
            }
        })
    }

    /// Start an attempt that fails itself if dropped unfinished.
    pub fn attempt(&self) -> Result<Attempt<'_>, StatusError> {
        self.begin()?;
        Ok(Attempt {
            machine: self,
            armed: true,
        })
    }

    /// Move forward along the happy path.
    ///
    /// Steps may be skipped but never revisited.
    pub fn advance(&self, next: DecryptStatus) -> Result<(), StatusError> {
        self.transition(|current| {
            let forward = current.is_in_flight()
                && matches!((current.rank(), next.rank()), (Some(a), Some(b)) if b > a);
            if forward {
                Ok(next.clone())
            } else {
                Err(StatusError::InvalidTransition {
                    from: current.clone(),
                    to: next.clone(),
                })
            }
        })
    }

    /// End the running attempt with a failure.
    pub fn fail(&self, reason: impl Into<String>) -> Result<(), StatusError> {
        let failed = DecryptStatus::Failed {
            reason: reason.into(),
        };
        self.transition(|current| {
            if current.is_in_flight() {
                Ok(failed.clone())
            } else {
                Err(StatusError::InvalidTransition {
                    from: current.clone(),
                    to: failed.clone(),
                })
            }
        })
    }

    /// Return to `Idle` after an attempt has ended.
    pub fn reset(&self) -> Result<(), StatusError> {
        self.transition(|current| {
            if current.is_in_flight() {
                Err(StatusError::Busy(current.clone()))
            } else {
                Ok(DecryptStatus::Idle)
            }
        })
    }

    /// Check and apply a transition atomically.
    fn transition<F>(&self, f: F) -> Result<(), StatusError>
    where
        F: FnOnce(&DecryptStatus) -> Result<DecryptStatus, StatusError>,
    {
        let mut outcome = Ok(());
        self.tx.send_if_modified(|status| match f(status) {
            Ok(next) => {
                tracing::debug!(from = %status, to = %next, "decrypt status");
                let changed = *status != next;
                *status = next;
                changed
            }
            Err(e) => {
                outcome = Err(e);
                false
            }
        });
        outcome
    }
}

/// A running attempt. See [`StatusMachine::attempt`].
#[derive(Debug)]
#[must_use = "dropping an attempt cancels it"]
pub struct Attempt<'a> {
    machine: &'a StatusMachine,
    armed: bool,
}

impl Attempt<'_> {
    /// End the attempt as `Done`.
    pub fn complete(mut self) -> Result<(), StatusError> {
        self.armed = false;
        self.machine.advance(DecryptStatus::Done)
    }

    /// End the attempt as `Failed`.
    pub fn fail(mut self, reason: impl Into<String>) -> Result<(), StatusError> {
        self.armed = false;
        self.machine.fail(reason)
    }
}

impl Drop for Attempt<'_> {
    fn drop(&mut self) {
        if self.armed && self.machine.current().is_in_flight() {
            tracing::warn!("decrypt attempt dropped before finishing");
            // In flight was just checked; a concurrent finisher can only
            // make this a no-op.
            let _ = self.machine.fail(CANCELLED);
        }
    }
}
