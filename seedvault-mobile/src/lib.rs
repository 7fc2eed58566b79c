//! Seed Vault Mobile FFI Bindings
//!
//! This crate provides FFI bindings for the Seed Vault bridge to be used
//! from iOS (Swift) and Android (Kotlin) applications.
//!
//! # Architecture
//!
//! The host app implements [`SeedVaultPlatformFFI`] over its platform seed
//! vault and permission APIs and constructs a [`SeedVaultClient`] with it.
//! Interactions the bridge launches are reported back with
//! [`SeedVaultClient::on_activity_result`]; permission dialogs with
//! [`SeedVaultClient::on_permission_result`].
//!
//! Calls are available in two shapes:
//! - [`SeedVaultClient::call`]: method name plus JSON arguments, outcome
//!   delivered to a [`BridgeCallCallback`].
//! - Blocking typed methods (`authorize_seed`, `sign_bytes`, ...) for hosts
//!   that run them on a background thread.
//!
//! # Usage
//!
//! Generate bindings using the generate-bindings binary:
//!
//! ```bash
//! cargo run --features bindgen-cli --bin generate-bindings -- \
//!     --library target/release/libseedvault_mobile.so -l kotlin
//! ```

pub mod async_bridge;
pub mod platform_ffi;

pub use async_bridge::{AsyncRuntime, BridgeCallCallback, CallHandle};
pub use platform_ffi::{
    InteractionRequestFFI, PermissionStateFFI, PlatformBridge, SeedRowFFI, SeedVaultPlatformFFI,
};

use std::sync::Arc;

use seedvault_lib::bridge::{BridgeRuntime, SeedVaultBridge};
use seedvault_lib::config::{methods, BridgeConfig};
use seedvault_lib::correlator::{ActivityResult, InteractionId};
use seedvault_lib::rpc::{BridgeCall, RpcDispatcher};
use seedvault_lib::{AuthToken, BridgeError, ErrorPayload, SeedRecord};

// UniFFI scaffolding
uniffi::setup_scaffolding!();

// ============================================================================
// Error Types
// ============================================================================

/// Mobile-friendly error type.
#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum SeedVaultMobileError {
    /// Seed vault access permission refused.
    #[error("Permission denied: {msg}")]
    PermissionDenied { msg: String },

    /// Seed authorization failed or was cancelled.
    #[error("Authorization failed: {msg}")]
    AuthorizationFailed { msg: String },

    /// No public key came back.
    #[error("No key received: {msg}")]
    NoKeyReceived { msg: String },

    /// The vault reported the public key as invalid.
    #[error("Key not valid: {msg}")]
    KeyNotValid { msg: String },

    /// Signing failed or was cancelled.
    #[error("Sign failed: {msg}")]
    SignFailed { msg: String },

    /// The vault refused to revoke the token.
    #[error("Deauthorize failed: {msg}")]
    DeauthFailed { msg: String },

    /// Authorized-seed enumeration failed.
    #[error("Seed query failed: {msg}")]
    SeedQueryFailed { msg: String },

    /// Invalid arguments or unknown method.
    #[error("Validation error: {msg}")]
    Validation { msg: String },

    /// Host platform failure (launch, callbacks, unknown interaction).
    #[error("Platform error: {msg}")]
    Platform { msg: String },

    /// Invalid bridge configuration.
    #[error("Configuration error: {msg}")]
    Config { msg: String },

    /// Internal error (unexpected state).
    #[error("Internal error: {msg}")]
    Internal { msg: String },
}

impl From<BridgeError> for SeedVaultMobileError {
    fn from(e: BridgeError) -> Self {
        let msg = e.to_string();
        match e {
            BridgeError::PermissionDenied { .. } => Self::PermissionDenied { msg },
            BridgeError::AuthorizationFailed { .. } => Self::AuthorizationFailed { msg },
            BridgeError::NoKeyReceived { .. } => Self::NoKeyReceived { msg },
            BridgeError::KeyNotValid { .. } => Self::KeyNotValid { msg },
            BridgeError::SignFailed { .. } => Self::SignFailed { msg },
            BridgeError::DeauthFailed { .. } => Self::DeauthFailed { msg },
            BridgeError::SeedQueryFailed { .. } => Self::SeedQueryFailed { msg },
            BridgeError::MalformedInput { .. } | BridgeError::UnknownMethod(_) => {
                Self::Validation { msg }
            }
            BridgeError::UnknownInteraction(_) | BridgeError::Platform(_) => {
                Self::Platform { msg }
            }
            BridgeError::Config(_) => Self::Config { msg },
            BridgeError::Internal(_) => Self::Internal { msg },
        }
    }
}

impl From<uniffi::UnexpectedUniFFICallbackError> for SeedVaultMobileError {
    fn from(e: uniffi::UnexpectedUniFFICallbackError) -> Self {
        Self::Platform { msg: e.reason }
    }
}

pub type Result<T> = std::result::Result<T, SeedVaultMobileError>;

// ============================================================================
// FFI Types
// ============================================================================

/// An authorized seed.
#[derive(Clone, Debug, PartialEq, Eq, uniffi::Record)]
pub struct SeedRecordFFI {
    pub auth_token: i64,
    pub purpose: i32,
    /// Absent when the user never named the seed.
    pub name: Option<String>,
}

impl From<SeedRecord> for SeedRecordFFI {
    fn from(record: SeedRecord) -> Self {
        Self {
            auth_token: record.auth_token.value(),
            purpose: record.purpose.code(),
            name: record.name,
        }
    }
}

/// Failure reported to a [`BridgeCallCallback`].
#[derive(Clone, Debug, PartialEq, Eq, uniffi::Record)]
pub struct ErrorPayloadFFI {
    pub code: i32,
    /// Stable failure kind, e.g. `SignFailed`.
    pub kind: String,
    pub message: String,
    /// Reason reported by the seed vault, when there is one.
    pub cause: Option<String>,
}

impl From<ErrorPayload> for ErrorPayloadFFI {
    fn from(payload: ErrorPayload) -> Self {
        Self {
            code: payload.code,
            kind: payload.kind,
            message: payload.message,
            cause: payload.cause,
        }
    }
}

type HostBridge = SeedVaultBridge<PlatformBridge, PlatformBridge>;

// ============================================================================
// Main Client
// ============================================================================

/// Seed Vault client for mobile applications.
#[derive(uniffi::Object)]
pub struct SeedVaultClient {
    platform: Arc<PlatformBridge>,
    bridge: BridgeRuntime<PlatformBridge, PlatformBridge>,
    rpc: Arc<RpcDispatcher<PlatformBridge, PlatformBridge>>,
    /// Dropped after the bridge.
    runtime: AsyncRuntime,
}

impl SeedVaultClient {
    fn start(platform: Box<dyn SeedVaultPlatformFFI>, config: BridgeConfig) -> Result<Arc<Self>> {
        let runtime = AsyncRuntime::new()?;
        let platform = Arc::new(PlatformBridge::new(Arc::from(platform)));
        let bridge = runtime.block_on(async {
            BridgeRuntime::start(config, platform.clone(), platform.clone())
        })?;
        let rpc = Arc::new(RpcDispatcher::new(bridge.bridge()));

        #[cfg(feature = "tracing")]
        tracing::info!(plugin = %bridge.bridge().config().plugin_name, "seed vault client started");

        Ok(Arc::new(Self {
            platform,
            bridge,
            rpc,
            runtime,
        }))
    }

    fn host_bridge(&self) -> Arc<HostBridge> {
        self.bridge.bridge()
    }

    /// Run a typed operation behind its method's capability check.
    fn run<T, F, Fut>(&self, method: &str, op: F) -> Result<T>
    where
        F: FnOnce(Arc<HostBridge>) -> Fut,
        Fut: std::future::Future<Output = seedvault_lib::Result<T>>,
    {
        let bridge = self.host_bridge();
        self.runtime.block_on(async move {
            bridge.ensure_capability(method).await?;
            op(bridge).await
        })
        .map_err(SeedVaultMobileError::from)
    }
}

#[uniffi::export]
impl SeedVaultClient {
    /// Create a client with the default configuration.
    #[uniffi::constructor]
    pub fn new(platform: Box<dyn SeedVaultPlatformFFI>) -> Result<Arc<Self>> {
        Self::start(platform, BridgeConfig::default())
    }

    /// Create a client from a JSON configuration document.
    #[uniffi::constructor]
    pub fn with_config_json(
        platform: Box<dyn SeedVaultPlatformFFI>,
        config_json: String,
    ) -> Result<Arc<Self>> {
        Self::start(platform, BridgeConfig::from_json_str(&config_json)?)
    }

    /// Create a client from a TOML configuration document.
    #[uniffi::constructor]
    pub fn with_config_toml(
        platform: Box<dyn SeedVaultPlatformFFI>,
        config_toml: String,
    ) -> Result<Arc<Self>> {
        Self::start(platform, BridgeConfig::from_toml_str(&config_toml)?)
    }

    /// Report the outcome of a launched interaction.
    ///
    /// `data_json` is the result payload, e.g. `{"authToken": 7}`.
    pub fn on_activity_result(
        &self,
        interaction_id: String,
        result_code: i32,
        data_json: Option<String>,
    ) -> Result<()> {
        let id: InteractionId = interaction_id.parse()?;
        let data = data_json
            .map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(|e| SeedVaultMobileError::Validation {
                msg: format!("invalid result data: {}", e),
            })?;
        self.bridge
            .completions()
            .complete(id, ActivityResult { result_code, data })?;
        Ok(())
    }

    /// Report that the user answered permission dialog `request_id`.
    pub fn on_permission_result(&self, request_id: String) -> Result<()> {
        Ok(self.platform.complete_permission_request(&request_id)?)
    }

    /// Invoke a bridge method by name. The outcome goes to `callback`.
    pub fn call(
        &self,
        method: String,
        args_json: String,
        callback: Box<dyn BridgeCallCallback>,
    ) -> Arc<CallHandle> {
        let rpc = self.rpc.clone();
        let future = async move {
            dispatch_json(&rpc, &method, &args_json).await.map_err(|e| {
                #[cfg(feature = "tracing")]
                tracing::warn!(%method, code = e.code() as i32, "call failed: {}", e);
                ErrorPayloadFFI::from(e.to_payload())
            })
        };
        CallHandle::new(self.runtime.spawn_with_callback(future, callback))
    }

    /// Invoke a bridge method by name and block until it finishes.
    /// Returns the reply data as JSON.
    pub fn call_blocking(&self, method: String, args_json: String) -> Result<String> {
        let rpc = self.rpc.clone();
        Ok(self
            .runtime
            .block_on(async move { dispatch_json(&rpc, &method, &args_json).await })?)
    }

    /// Ensure the seed vault permission is granted, prompting if needed.
    pub fn assert_permissions(&self) -> Result<()> {
        let bridge = self.host_bridge();
        self.runtime.block_on(bridge.assert_permissions())?;
        Ok(())
    }

    /// Authorize a seed. `None` when every seed is already authorized.
    pub fn authorize_seed(&self) -> Result<Option<i64>> {
        let token = self.run(methods::AUTHORIZE_SEED, |bridge| async move {
            bridge.authorize_seed().await
        })?;
        Ok(token.map(|t| t.value()))
    }

    /// Public key for `auth_token` at the signing path.
    pub fn get_pubkey(&self, auth_token: i64) -> Result<Vec<u8>> {
        let key = self.run(methods::GET_PUBKEY, |bridge| async move {
            bridge.get_pubkey(AuthToken(auth_token)).await
        })?;
        Ok(key.into_vec())
    }

    /// Sign `message` with the key at the signing path.
    pub fn sign_bytes(&self, auth_token: i64, message: Vec<u8>) -> Result<Vec<u8>> {
        let signed = self.run(methods::SIGN_BYTES, |bridge| async move {
            bridge.sign_bytes(AuthToken(auth_token), message).await
        })?;
        Ok(signed.into_vec())
    }

    pub fn deauthorize_seed(&self, auth_token: i64) -> Result<()> {
        self.run(methods::DEAUTHORIZE_SEED, |bridge| async move {
            bridge.deauthorize_seed(AuthToken(auth_token))
        })
    }

    pub fn get_authorized_seeds(&self) -> Result<Vec<SeedRecordFFI>> {
        let seeds = self.run(methods::GET_AUTHORIZED_SEEDS, |bridge| async move {
            bridge.authorized_seeds()
        })?;
        Ok(seeds.into_iter().map(SeedRecordFFI::from).collect())
    }

    /// Interactions launched and not yet resolved.
    pub fn pending_interactions(&self) -> u32 {
        self.host_bridge().correlator().pending_count() as u32
    }

    /// Derivation path URI every key-bearing interaction uses.
    pub fn signing_path(&self) -> String {
        self.host_bridge().signing_path().to_uri()
    }
}

/// An empty argument string stands for `{}`.
async fn dispatch_json(
    rpc: &RpcDispatcher<PlatformBridge, PlatformBridge>,
    method: &str,
    args_json: &str,
) -> seedvault_lib::Result<String> {
    let args = if args_json.trim().is_empty() {
        serde_json::json!({})
    } else {
        serde_json::from_str(args_json)
            .map_err(|e| BridgeError::malformed("args", e.to_string()))?
    };
    let data = rpc.dispatch(&BridgeCall::new(method, args)).await?;
    Ok(data.to_string())
}

// ============================================================================
// Utility Functions
// ============================================================================

/// Verify an Ed25519 `signature` over `message`.
#[uniffi::export]
pub fn verify_signature(pubkey: Vec<u8>, message: Vec<u8>, signature: Vec<u8>) -> Result<bool> {
    Ok(seedvault_lib::verify::verify_signature(
        &pubkey, &message, &signature,
    )?)
}

/// Account address of an Ed25519 public key.
#[uniffi::export]
pub fn address_from_pubkey(pubkey: Vec<u8>) -> Result<String> {
    Ok(seedvault_lib::verify::address_from_pubkey(&pubkey)?)
}

/// Digest a transaction is signed over.
#[uniffi::export]
pub fn intent_digest(tx_bytes: Vec<u8>) -> Vec<u8> {
    seedvault_lib::verify::intent_digest(&tx_bytes).to_vec()
}

/// Base64 flag||signature||pubkey form submitted alongside a transaction.
#[uniffi::export]
pub fn serialized_signature(signature: Vec<u8>, pubkey: Vec<u8>) -> Result<String> {
    Ok(seedvault_lib::verify::serialized_signature(
        &signature, &pubkey,
    )?)
}

/// Get the library version.
#[uniffi::export]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_mapping() {
        let err: SeedVaultMobileError =
            BridgeError::sign_failed("Sign failed", Some("Canceled".into())).into();
        assert!(matches!(err, SeedVaultMobileError::SignFailed { .. }));
        assert_eq!(err.to_string(), "Sign failed: Sign failed: Canceled");

        let err: SeedVaultMobileError = BridgeError::UnknownMethod("nope".into()).into();
        assert!(matches!(err, SeedVaultMobileError::Validation { .. }));

        let err: SeedVaultMobileError = BridgeError::UnknownInteraction("x".into()).into();
        assert!(matches!(err, SeedVaultMobileError::Platform { .. }));
    }

    #[test]
    fn test_seed_record_conversion() {
        let record = SeedRecord {
            auth_token: AuthToken(3),
            purpose: seedvault_lib::Purpose::SignSolanaTransaction,
            name: Some("Main".into()),
        };
        assert_eq!(
            SeedRecordFFI::from(record),
            SeedRecordFFI {
                auth_token: 3,
                purpose: 0,
                name: Some("Main".into())
            }
        );
    }

    #[test]
    fn test_utility_functions() {
        assert_eq!(intent_digest(vec![1, 2, 3]).len(), 32);
        assert!(matches!(
            address_from_pubkey(vec![1, 2]),
            Err(SeedVaultMobileError::Validation { .. })
        ));
        assert!(!get_version().is_empty());
    }
}
