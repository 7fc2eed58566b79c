//! Host Platform FFI Bindings
//!
//! The seed vault and the permission dialog belong to the host app. It
//! implements [`SeedVaultPlatformFFI`] in Swift/Kotlin and hands it to
//! [`SeedVaultClient`](crate::SeedVaultClient). [`PlatformBridge`] adapts the
//! callback interface to the core crate's collaborator traits.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                   Host App (Swift/Kotlin)                    │
//! │   SeedVaultPlatformFFI implementation                        │
//! │   (wraps the platform seed vault + permission APIs)          │
//! └──────────────────────────────────────────────────────────────┘
//!            │ launch / request_permissions        ▲
//!            ▼ (UniFFI callback)                   │ on_activity_result
//! ┌──────────────────────────────────────────────────────────────┐  on_permission_result
//! │                       Rust FFI Layer                         │
//! │   PlatformBridge                                             │
//! │   (implements SeedVaultService + PermissionPlatform)         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example (Kotlin)
//!
//! ```kotlin
//! class AndroidSeedVault(private val activity: Activity) : SeedVaultPlatformFfi {
//!     override fun launch(interactionId: String, request: InteractionRequestFfi) {
//!         val intent = when (request) {
//!             is InteractionRequestFfi.AuthorizeSeed -> Wallet.authorizeSeed(request.purpose)
//!             // ...
//!         }
//!         pending[nextRequestCode()] = interactionId
//!         activity.startActivityForResult(intent, requestCode)
//!     }
//!     // ... other methods
//! }
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use seedvault_lib::correlator::InteractionId;
use seedvault_lib::service::{
    ColumnValue, InteractionRequest, PermissionPlatform, PermissionState, RowCursor, SeedCursor,
    SeedVaultService, AUTHORIZED_SEEDS_AUTH_PURPOSE, AUTHORIZED_SEEDS_AUTH_TOKEN,
    AUTHORIZED_SEEDS_SEED_NAME,
};
use seedvault_lib::{AuthToken, BridgeError, Purpose};
use tokio::sync::oneshot;

use crate::SeedVaultMobileError;

// ============================================================================
// FFI Types
// ============================================================================

/// Grant state of a platform permission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, uniffi::Enum)]
pub enum PermissionStateFFI {
    Granted,
    Denied,
    /// Requesting will show the system dialog.
    Prompt,
}

impl From<PermissionStateFFI> for PermissionState {
    fn from(state: PermissionStateFFI) -> Self {
        match state {
            PermissionStateFFI::Granted => PermissionState::Granted,
            PermissionStateFFI::Denied => PermissionState::Denied,
            PermissionStateFFI::Prompt => PermissionState::Prompt,
        }
    }
}

/// Interaction the host must start.
///
/// Derivation paths are BIP32 URIs such as `bip32:/m/44'/784'/0'/0'/0'`.
#[derive(Clone, Debug, PartialEq, Eq, uniffi::Enum)]
pub enum InteractionRequestFFI {
    AuthorizeSeed {
        purpose: i32,
    },
    RequestPublicKey {
        auth_token: i64,
        derivation_path: String,
    },
    SignMessage {
        auth_token: i64,
        derivation_path: String,
        message: Vec<u8>,
    },
}

impl From<InteractionRequest> for InteractionRequestFFI {
    fn from(request: InteractionRequest) -> Self {
        match request {
            InteractionRequest::AuthorizeSeed { purpose } => Self::AuthorizeSeed {
                purpose: purpose.code(),
            },
            InteractionRequest::RequestPublicKey {
                auth_token,
                derivation_path,
            } => Self::RequestPublicKey {
                auth_token: auth_token.value(),
                derivation_path: derivation_path.to_uri(),
            },
            InteractionRequest::SignMessage {
                auth_token,
                derivation_path,
                message,
            } => Self::SignMessage {
                auth_token: auth_token.value(),
                derivation_path: derivation_path.to_uri(),
                message,
            },
        }
    }
}

/// One row of the authorized-seeds enumeration.
#[derive(Clone, Debug, PartialEq, Eq, uniffi::Record)]
pub struct SeedRowFFI {
    pub auth_token: i64,
    pub purpose: i32,
    /// Absent when the user never named the seed.
    pub seed_name: Option<String>,
}

// ============================================================================
// Callback Interface
// ============================================================================

/// Host platform interface.
///
/// Methods may be called from any thread. None of them may block on the
/// user: interaction and permission outcomes are reported back through
/// `SeedVaultClient::on_activity_result` and
/// `SeedVaultClient::on_permission_result`.
#[uniffi::export(callback_interface)]
pub trait SeedVaultPlatformFFI: Send + Sync {
    /// Current grant state of one platform permission string.
    fn permission_state(&self, permission: String) -> PermissionStateFFI;

    /// Show the grant dialog for `permissions`. Report the answer with
    /// `on_permission_result(request_id)`.
    fn request_permissions(
        &self,
        request_id: String,
        alias: String,
        permissions: Vec<String>,
    ) -> Result<(), SeedVaultMobileError>;

    /// Whether any seed is not yet authorized for `purpose`.
    fn has_unauthorized_seeds_for_purpose(&self, purpose: i32)
        -> Result<bool, SeedVaultMobileError>;

    /// Start an interaction. Report its outcome with
    /// `on_activity_result(interaction_id, ...)`.
    fn launch(
        &self,
        interaction_id: String,
        request: InteractionRequestFFI,
    ) -> Result<(), SeedVaultMobileError>;

    /// Revoke an auth token.
    fn deauthorize_seed(&self, auth_token: i64) -> Result<(), SeedVaultMobileError>;

    /// Enumerate the seeds authorized for this app.
    fn authorized_seeds(&self) -> Result<Vec<SeedRowFFI>, SeedVaultMobileError>;
}

// ============================================================================
// Bridge
// ============================================================================

/// Adapts [`SeedVaultPlatformFFI`] to the core collaborator traits.
pub struct PlatformBridge {
    ffi: Arc<dyn SeedVaultPlatformFFI>,
    pending_permissions: Mutex<HashMap<String, oneshot::Sender<()>>>,
}

impl PlatformBridge {
    pub fn new(ffi: Arc<dyn SeedVaultPlatformFFI>) -> Self {
        Self {
            ffi,
            pending_permissions: Mutex::new(HashMap::new()),
        }
    }

    fn permissions(&self) -> std::sync::MutexGuard<'_, HashMap<String, oneshot::Sender<()>>> {
        self.pending_permissions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    /// Wake the call waiting on permission request `request_id`.
    pub fn complete_permission_request(&self, request_id: &str) -> Result<(), BridgeError> {
        let waiter = self.permissions().remove(request_id).ok_or_else(|| {
            BridgeError::Platform(format!("no pending permission request {}", request_id))
        })?;
        // The caller may have gone away; the answer is still on the platform.
        let _ = waiter.send(());
        Ok(())
    }

    pub fn pending_permission_requests(&self) -> usize {
        self.permissions().len()
    }
}

impl std::fmt::Debug for PlatformBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformBridge")
            .field("ffi", &"<callback>")
            .field("pending_permissions", &self.pending_permission_requests())
            .finish()
    }
}

fn platform_error(e: SeedVaultMobileError) -> BridgeError {
    BridgeError::Platform(e.to_string())
}

#[async_trait]
impl PermissionPlatform for PlatformBridge {
    fn permission_state(&self, permission: &str) -> PermissionState {
        self.ffi.permission_state(permission.to_string()).into()
    }

    async fn request_permissions(
        &self,
        alias: &str,
        permissions: &[String],
    ) -> seedvault_lib::Result<()> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();
        // Registered first: the host may answer before `request_permissions` returns.
        self.permissions().insert(request_id.clone(), tx);

        if let Err(e) =
            self.ffi
                .request_permissions(request_id.clone(), alias.to_string(), permissions.to_vec())
        {
            self.permissions().remove(&request_id);
            return Err(platform_error(e));
        }

        rx.await.map_err(|_| {
            BridgeError::Platform(format!("permission request {} was dropped", request_id))
        })
    }
}

impl SeedVaultService for PlatformBridge {
    fn has_unauthorized_seeds_for_purpose(&self, purpose: Purpose) -> seedvault_lib::Result<bool> {
        self.ffi
            .has_unauthorized_seeds_for_purpose(purpose.code())
            .map_err(platform_error)
    }

    fn launch(
        &self,
        interaction_id: InteractionId,
        request: InteractionRequest,
    ) -> seedvault_lib::Result<()> {
        self.ffi
            .launch(interaction_id.to_string(), request.into())
            .map_err(platform_error)
    }

    fn deauthorize_seed(&self, auth_token: AuthToken) -> seedvault_lib::Result<()> {
        self.ffi
            .deauthorize_seed(auth_token.value())
            .map_err(platform_error)
    }

    fn authorized_seeds(&self, projection: &[&str]) -> seedvault_lib::Result<Box<dyn SeedCursor>> {
        let rows = self.ffi.authorized_seeds().map_err(platform_error)?;
        let rows = rows
            .into_iter()
            .map(|row| {
                projection
                    .iter()
                    .map(|column| match *column {
                        AUTHORIZED_SEEDS_AUTH_TOKEN => ColumnValue::Integer(row.auth_token),
                        AUTHORIZED_SEEDS_AUTH_PURPOSE => ColumnValue::Integer(row.purpose as i64),
                        AUTHORIZED_SEEDS_SEED_NAME => row
                            .seed_name
                            .clone()
                            .map_or(ColumnValue::Null, ColumnValue::Text),
                        _ => ColumnValue::Null,
                    })
                    .collect()
            })
            .collect();
        let columns = projection.iter().map(|c| c.to_string()).collect();
        Ok(Box::new(RowCursor::new(columns, rows)))
    }
}
