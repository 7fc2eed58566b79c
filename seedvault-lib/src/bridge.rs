//! Bridge operations.
//!
//! [`SeedVaultBridge`] turns each application call into at most one platform
//! interaction and waits for its correlated, normalized result. Auth tokens
//! are always passed in by the caller; the bridge keeps no session state.

use std::sync::Arc;

use crate::authorization::AuthorizationFlow;
use crate::config::{methods, BridgeConfig, SEEDVAULT_ALIAS};
use crate::correlator::{
    completion_channel, CompletionSender, PendingInteraction, RequestCorrelator, ResultKind,
};
use crate::derivation::DerivationPath;
use crate::normalizer::{self, Normalized};
use crate::permission::{PermissionGate, PermissionOutcome};
use crate::service::{
    InteractionRequest, PermissionPlatform, SeedVaultService, AUTHORIZED_SEEDS_PROJECTION,
};
use crate::{AuthToken, BridgeError, PortableBytes, Result, SeedRecord};

/// Entry point for the six seed vault operations.
pub struct SeedVaultBridge<S: SeedVaultService + ?Sized, P: PermissionPlatform + ?Sized> {
    config: Arc<BridgeConfig>,
    service: Arc<S>,
    gate: PermissionGate<P>,
    correlator: Arc<RequestCorrelator>,
    signing_path: DerivationPath,
}

impl<S, P> SeedVaultBridge<S, P>
where
    S: SeedVaultService + ?Sized,
    P: PermissionPlatform + ?Sized,
{
    /// Validate `config` and build a bridge that registers its interactions
    /// with `correlator`.
    pub fn new(
        config: BridgeConfig,
        service: Arc<S>,
        platform: Arc<P>,
        correlator: Arc<RequestCorrelator>,
    ) -> Result<Self> {
        config.validate()?;
        let signing_path = config.derivation.signing_path()?;
        let config = Arc::new(config);
        Ok(Self {
            gate: PermissionGate::new(platform, config.clone()),
            config,
            service,
            correlator,
            signing_path,
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn correlator(&self) -> &Arc<RequestCorrelator> {
        &self.correlator
    }

    /// Path every key-bearing interaction uses.
    pub fn signing_path(&self) -> &DerivationPath {
        &self.signing_path
    }

    /// Run the permission gate for the capability `method` is registered
    /// with. Methods without a capability pass straight through.
    pub async fn ensure_capability(&self, method: &str) -> Result<()> {
        let registration = self
            .config
            .method(method)
            .ok_or_else(|| BridgeError::UnknownMethod(method.to_string()))?;
        if let Some(alias) = &registration.capability {
            self.gate.ensure(alias).await?;
        }
        Ok(())
    }

    /// Make sure the seed vault permission is granted, prompting if needed.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    pub async fn assert_permissions(&self) -> Result<PermissionOutcome> {
        let alias = self
            .config
            .method(methods::ASSERT_PERMISSIONS)
            .and_then(|m| m.capability.as_deref())
            .unwrap_or(SEEDVAULT_ALIAS);
        self.gate.ensure(alias).await
    }

    /// Let the user authorize a seed for the signing purpose.
    ///
    /// Returns `None` without launching anything when every seed is already
    /// authorized.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    pub async fn authorize_seed(&self) -> Result<Option<AuthToken>> {
        let mut flow = AuthorizationFlow::new();
        flow.begin()?;
        let outcome = self.run_authorization(&mut flow).await;
        flow.finish(outcome)
    }

    async fn run_authorization(&self, flow: &mut AuthorizationFlow) -> Result<Option<AuthToken>> {
        let purpose = self.config.signing_purpose;
        let available = self
            .service
            .has_unauthorized_seeds_for_purpose(purpose)
            .map_err(|e| {
                BridgeError::authorization_failed(
                    "Failed to check for unauthorized seeds",
                    Some(e.to_string()),
                )
            })?;
        if !available {
            #[cfg(feature = "tracing")]
            tracing::info!("no unauthorized seeds available");
            return Ok(None);
        }

        flow.await_consent()?;
        let pending = self.launch(
            ResultKind::Authorize,
            InteractionRequest::AuthorizeSeed { purpose },
            |e| {
                BridgeError::authorization_failed(
                    "Failed to start authorize seed activity",
                    Some(e.to_string()),
                )
            },
        )?;

        match pending.wait().await? {
            Normalized::AuthToken(token) => {
                #[cfg(feature = "tracing")]
                tracing::info!(%token, "seed authorized");
                Ok(Some(token))
            }
            other => Err(unexpected(ResultKind::Authorize, &other)),
        }
    }

    /// Fetch the public key for `auth_token` at the signing path.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    pub async fn get_pubkey(&self, auth_token: AuthToken) -> Result<PortableBytes> {
        let pending = self.launch(
            ResultKind::PublicKey,
            InteractionRequest::RequestPublicKey {
                auth_token,
                derivation_path: self.signing_path.clone(),
            },
            |e| BridgeError::NoKeyReceived {
                message: format!("Failed to request public key: {}", e),
            },
        )?;

        match pending.wait().await? {
            Normalized::PublicKey(key) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(len = key.len(), "received public key");
                Ok(key)
            }
            other => Err(unexpected(ResultKind::PublicKey, &other)),
        }
    }

    /// Sign `message` with the key at the signing path. Empty messages are
    /// passed through unchanged.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip(self, message), fields(len = message.len()))
    )]
    pub async fn sign_bytes(&self, auth_token: AuthToken, message: Vec<u8>) -> Result<PortableBytes> {
        let pending = self.launch(
            ResultKind::Sign,
            InteractionRequest::SignMessage {
                auth_token,
                derivation_path: self.signing_path.clone(),
                message,
            },
            |e| BridgeError::sign_failed("Failed to sign", Some(e.to_string())),
        )?;

        match pending.wait().await? {
            Normalized::Signature(signature) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(len = signature.len(), "received signature");
                Ok(signature)
            }
            other => Err(unexpected(ResultKind::Sign, &other)),
        }
    }

    /// Revoke `auth_token`.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    pub fn deauthorize_seed(&self, auth_token: AuthToken) -> Result<()> {
        self.service
            .deauthorize_seed(auth_token)
            .map_err(|e| BridgeError::deauth_failed(e.to_string()))
    }

    /// List the seeds currently authorized for this application.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    pub fn authorized_seeds(&self) -> Result<Vec<SeedRecord>> {
        let mut cursor = self
            .service
            .authorized_seeds(&AUTHORIZED_SEEDS_PROJECTION)
            .map_err(|e| BridgeError::seed_query_failed(e.to_string()))?;
        normalizer::normalize_seed_rows(cursor.as_mut())
    }

    fn launch(
        &self,
        kind: ResultKind,
        request: InteractionRequest,
        on_error: impl FnOnce(BridgeError) -> BridgeError,
    ) -> Result<PendingInteraction> {
        let pending = self.correlator.register(kind);

        #[cfg(feature = "tracing")]
        tracing::debug!(interaction_id = %pending.id(), interaction = request.name(), "launching");

        if let Err(e) = self.service.launch(pending.id(), request) {
            self.correlator.abandon(&pending.id());

            #[cfg(feature = "tracing")]
            tracing::warn!(interaction_id = %pending.id(), "launch failed: {}", e);

            return Err(on_error(e));
        }
        Ok(pending)
    }
}

fn unexpected(kind: ResultKind, got: &Normalized) -> BridgeError {
    BridgeError::Internal(format!("{:?} interaction resolved with {:?}", kind, got))
}

/// A bridge wired to a running completion dispatcher.
///
/// Must be started from within a tokio runtime.
pub struct BridgeRuntime<S: SeedVaultService + ?Sized, P: PermissionPlatform + ?Sized> {
    bridge: Arc<SeedVaultBridge<S, P>>,
    completions: CompletionSender,
    dispatcher: tokio::task::JoinHandle<()>,
}

impl<S, P> BridgeRuntime<S, P>
where
    S: SeedVaultService + ?Sized,
    P: PermissionPlatform + ?Sized,
{
    pub fn start(config: BridgeConfig, service: Arc<S>, platform: Arc<P>) -> Result<Self> {
        let correlator = Arc::new(RequestCorrelator::new());
        let (completions, dispatcher) = completion_channel(correlator.clone());
        let bridge = SeedVaultBridge::new(config, service, platform, correlator)?;
        Ok(Self {
            bridge: Arc::new(bridge),
            completions,
            dispatcher: dispatcher.spawn(),
        })
    }

    pub fn bridge(&self) -> Arc<SeedVaultBridge<S, P>> {
        self.bridge.clone()
    }

    /// Handle the platform uses to report interaction results.
    pub fn completions(&self) -> CompletionSender {
        self.completions.clone()
    }

    /// Stop the dispatcher. Calls still waiting resolve with a platform error.
    pub fn shutdown(self) {
        self.dispatcher.abort();
        let abandoned = self.bridge.correlator().abandon_all();

        #[cfg(feature = "tracing")]
        tracing::debug!(abandoned, "bridge runtime shut down");
        #[cfg(not(feature = "tracing"))]
        let _ = abandoned;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlator::ActivityResult;
    use crate::test_utils::{MockPermissions, MockSeedVault, ScriptedOutcome};

    fn runtime(vault: Arc<MockSeedVault>) -> BridgeRuntime<MockSeedVault, MockPermissions> {
        let rt = BridgeRuntime::start(
            BridgeConfig::default(),
            vault.clone(),
            Arc::new(MockPermissions::granted()),
        )
        .unwrap();
        vault.attach(rt.completions());
        rt
    }

    #[tokio::test]
    async fn test_launch_failure_abandons_slot() {
        let vault = Arc::new(MockSeedVault::new());
        vault.push_outcome(ScriptedOutcome::launch_error("activity not found"));
        let rt = runtime(vault.clone());

        let err = rt.bridge().sign_bytes(AuthToken(1), vec![1]).await.unwrap_err();
        assert_eq!(err.kind(), "SignFailed");
        assert_eq!(err.cause(), Some("platform error: activity not found"));
        assert_eq!(rt.bridge().correlator().pending_count(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_releases_waiting_calls() {
        let vault = Arc::new(MockSeedVault::new());
        let rt = runtime(vault.clone());
        let bridge = rt.bridge();

        let call = tokio::spawn(async move { bridge.sign_bytes(AuthToken(1), vec![1]).await });
        while vault.launch_count() == 0 {
            tokio::task::yield_now().await;
        }
        rt.shutdown();

        let err = tokio::time::timeout(std::time::Duration::from_secs(5), call)
            .await
            .expect("waiting call released")
            .unwrap()
            .unwrap_err();
        assert_eq!(err.kind(), "Platform");
    }

    #[tokio::test]
    async fn test_sign_uses_signing_path() {
        let vault = Arc::new(MockSeedVault::new());
        vault.push_outcome(ScriptedOutcome::signature(&[1, 2, 3]));
        let rt = runtime(vault.clone());

        rt.bridge().sign_bytes(AuthToken(3), vec![]).await.unwrap();

        match &vault.launches()[0] {
            InteractionRequest::SignMessage {
                auth_token,
                derivation_path,
                message,
            } => {
                assert_eq!(*auth_token, AuthToken(3));
                assert_eq!(derivation_path.to_uri(), "bip32:/m/44'/784'/0'/0'/0'");
                assert!(message.is_empty());
            }
            other => panic!("unexpected launch {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_wrong_result_shape_is_operation_failure() {
        let vault = Arc::new(MockSeedVault::new());
        vault.push_outcome(ScriptedOutcome::Complete(ActivityResult::ok(
            serde_json::json!({"authToken": 1}),
        )));
        let rt = runtime(vault);

        let err = rt.bridge().get_pubkey(AuthToken(1)).await.unwrap_err();
        assert_eq!(err.kind(), "NoKeyReceived");
    }

    #[tokio::test]
    async fn test_unknown_method_capability() {
        let rt = runtime(Arc::new(MockSeedVault::new()));
        let err = rt.bridge().ensure_capability("exportSeed").await.unwrap_err();
        assert_eq!(err, BridgeError::UnknownMethod("exportSeed".into()));
    }
}
