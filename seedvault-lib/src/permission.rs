//! Permission gate.
//!
//! Checks the coarse-grained seed vault permission before the bridge talks to
//! the service. When the platform already reports it granted, the gate
//! resolves immediately; otherwise it runs the platform grant flow and
//! re-reads the grant state afterwards. Nothing is cached: every check asks
//! the platform.

use std::sync::Arc;

use crate::config::BridgeConfig;
use crate::service::{PermissionPlatform, PermissionState};
use crate::{BridgeError, Result};

/// Synchronous view of a capability's grant state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateStatus {
    Granted,
    /// A grant flow must run before the capability can be used.
    NeedsGrant,
}

/// How [`PermissionGate::ensure`] got to a granted state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PermissionOutcome {
    AlreadyGranted,
    GrantedAfterPrompt,
}

/// Checks and requests capabilities named in the bridge configuration.
pub struct PermissionGate<P: PermissionPlatform + ?Sized> {
    platform: Arc<P>,
    config: Arc<BridgeConfig>,
}

impl<P: PermissionPlatform + ?Sized> Clone for PermissionGate<P> {
    fn clone(&self) -> Self {
        Self {
            platform: self.platform.clone(),
            config: self.config.clone(),
        }
    }
}

impl<P: PermissionPlatform + ?Sized> PermissionGate<P> {
    pub fn new(platform: Arc<P>, config: Arc<BridgeConfig>) -> Self {
        Self { platform, config }
    }

    fn permissions(&self, alias: &str) -> Result<&[String]> {
        self.config
            .permissions_for(alias)
            .ok_or_else(|| BridgeError::Config(format!("unknown capability '{}'", alias)))
    }

    /// Fast path: is every permission behind `alias` granted right now?
    pub fn status(&self, alias: &str) -> Result<GateStatus> {
        let all_granted = self
            .permissions(alias)?
            .iter()
            .all(|p| self.platform.permission_state(p) == PermissionState::Granted);
        Ok(if all_granted {
            GateStatus::Granted
        } else {
            GateStatus::NeedsGrant
        })
    }

    /// Resolve once `alias` is granted, prompting the user if needed.
    ///
    /// Never prompts when the platform already reports the grant.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    pub async fn ensure(&self, alias: &str) -> Result<PermissionOutcome> {
        if self.status(alias)? == GateStatus::Granted {
            return Ok(PermissionOutcome::AlreadyGranted);
        }

        let permissions = self.permissions(alias)?;

        #[cfg(feature = "tracing")]
        tracing::info!(?permissions, "requesting platform permission");

        self.platform.request_permissions(alias, permissions).await?;

        match self.status(alias)? {
            GateStatus::Granted => Ok(PermissionOutcome::GrantedAfterPrompt),
            GateStatus::NeedsGrant => Err(BridgeError::permission_denied("Permission not granted")),
        }
    }
}
