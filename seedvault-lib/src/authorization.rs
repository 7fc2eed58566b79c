//! Seed authorization state machine.
//!
//! ```text
//! Idle ─► CheckingAvailability ─┬─► AwaitingUserConsent ─┬─► Authorized ─┐
//!                               │                        └─► Failed ─────┤
//!                               ├─► Authorized (nothing to authorize)    │
//!                               └─► Failed                               │
//!   ▲                                                                    │
//!   └──────────────────────────── reset ◄────────────────────────────────┘
//! ```
//!
//! One flow value is created per `authorize_seed` call, so concurrent calls
//! never share state.

use std::fmt;

use crate::{BridgeError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthorizationState {
    Idle,
    CheckingAvailability,
    AwaitingUserConsent,
    Authorized,
    Failed,
}

impl AuthorizationState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Authorized | Self::Failed)
    }

    fn can_transition_to(&self, next: AuthorizationState) -> bool {
        use AuthorizationState::*;
        matches!(
            (self, next),
            (Idle, CheckingAvailability)
                | (CheckingAvailability, AwaitingUserConsent)
                | (CheckingAvailability, Authorized)
                | (CheckingAvailability, Failed)
                | (AwaitingUserConsent, Authorized)
                | (AwaitingUserConsent, Failed)
                | (Authorized, Idle)
                | (Failed, Idle)
        )
    }
}

impl fmt::Display for AuthorizationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::CheckingAvailability => "checking_availability",
            Self::AwaitingUserConsent => "awaiting_user_consent",
            Self::Authorized => "authorized",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Transition-checked driver for one authorization attempt.
#[derive(Debug)]
pub struct AuthorizationFlow {
    state: AuthorizationState,
    history: Vec<AuthorizationState>,
}

impl Default for AuthorizationFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthorizationFlow {
    pub fn new() -> Self {
        Self {
            state: AuthorizationState::Idle,
            history: vec![AuthorizationState::Idle],
        }
    }

    pub fn state(&self) -> AuthorizationState {
        self.state
    }

    /// Every state visited so far, starting with `Idle`.
    pub fn history(&self) -> &[AuthorizationState] {
        &self.history
    }

    fn advance(&mut self, next: AuthorizationState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(BridgeError::Internal(format!(
                "illegal authorization transition {} -> {}",
                self.state, next
            )));
        }

        #[cfg(feature = "tracing")]
        tracing::trace!(from = %self.state, to = %next, "authorization transition");

        self.state = next;
        self.history.push(next);
        Ok(())
    }

    pub fn begin(&mut self) -> Result<()> {
        self.advance(AuthorizationState::CheckingAvailability)
    }

    pub fn await_consent(&mut self) -> Result<()> {
        self.advance(AuthorizationState::AwaitingUserConsent)
    }

    pub fn authorize(&mut self) -> Result<()> {
        self.advance(AuthorizationState::Authorized)
    }

    pub fn fail(&mut self) -> Result<()> {
        self.advance(AuthorizationState::Failed)
    }

    /// Return to `Idle` from a terminal state.
    pub fn reset(&mut self) -> Result<()> {
        self.advance(AuthorizationState::Idle)
    }

    /// Record the outcome of the attempt and reset, passing `outcome` through.
    pub fn finish<T>(&mut self, outcome: Result<T>) -> Result<T> {
        match &outcome {
            Ok(_) => self.authorize()?,
            Err(_) => self.fail()?,
        }
        self.reset()?;
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use AuthorizationState::*;

    #[test]
    fn test_consent_path() {
        let mut flow = AuthorizationFlow::new();
        flow.begin().unwrap();
        flow.await_consent().unwrap();
        assert_eq!(flow.finish(Ok(42)).unwrap(), 42);
        assert_eq!(flow.state(), Idle);
        assert_eq!(
            flow.history(),
            &[Idle, CheckingAvailability, AwaitingUserConsent, Authorized, Idle]
        );
    }

    #[test]
    fn test_no_op_path_skips_consent() {
        let mut flow = AuthorizationFlow::new();
        flow.begin().unwrap();
        flow.finish(Ok(())).unwrap();
        assert_eq!(flow.history(), &[Idle, CheckingAvailability, Authorized, Idle]);
    }

    #[test]
    fn test_failure_resets() {
        let mut flow = AuthorizationFlow::new();
        flow.begin().unwrap();
        flow.await_consent().unwrap();
        let err = flow
            .finish::<()>(Err(BridgeError::authorization_failed("Authorization failed", None)))
            .unwrap_err();
        assert_eq!(err.kind(), "AuthorizationFailed");
        assert_eq!(flow.state(), Idle);
        assert!(flow.history().contains(&Failed));
    }

    #[test]
    fn test_illegal_transitions() {
        let mut flow = AuthorizationFlow::new();
        assert!(flow.await_consent().is_err());
        assert!(flow.reset().is_err());
        flow.begin().unwrap();
        assert!(flow.begin().is_err());
        assert!(Authorized.is_terminal());
        assert!(!AwaitingUserConsent.is_terminal());
    }
}
