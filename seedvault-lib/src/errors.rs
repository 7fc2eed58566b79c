//! Error types for Seed Vault bridge operations.
//!
//! Every bridge call fails with exactly one [`BridgeError`]. Failures are
//! terminal for the call that produced them: nothing in this crate retries
//! automatically, the caller decides.

use serde::{Deserialize, Serialize};

/// Stable numeric codes for FFI and call/response integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum BridgeErrorCode {
    /// Access permission refused
    PermissionDenied = 1000,
    /// Seed consent interaction failed or was cancelled
    AuthorizationFailed = 2000,
    /// Service returned no public key response
    NoKeyReceived = 3000,
    /// Service reported the public key as invalid
    KeyNotValid = 3001,
    /// Signing interaction failed or produced no usable signature
    SignFailed = 4000,
    /// Revoke rejected by the service
    DeauthFailed = 5000,
    /// Authorized-seed enumeration failed
    SeedQueryFailed = 6000,
    /// Request arguments rejected before any interaction
    MalformedInput = 7000,
    /// Method not registered with the bridge
    UnknownMethod = 7001,
    /// Completion delivered for an interaction nobody is waiting on
    UnknownInteraction = 8000,
    /// Platform launch or completion channel failure
    Platform = 8001,
    /// Invalid bridge configuration
    Config = 9000,
    /// Internal/unexpected error
    Internal = 9999,
}

/// Comprehensive error type for bridge operations.
///
/// `cause` carries the service-reported reason when one is available.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    #[error("{message}")]
    PermissionDenied { message: String },

    #[error("{message}{}", fmt_cause(.cause))]
    AuthorizationFailed {
        message: String,
        cause: Option<String>,
    },

    #[error("{message}")]
    NoKeyReceived { message: String },

    #[error("{message}{}", fmt_cause(.cause))]
    KeyNotValid {
        message: String,
        cause: Option<String>,
    },

    #[error("{message}{}", fmt_cause(.cause))]
    SignFailed {
        message: String,
        cause: Option<String>,
    },

    #[error("{message}{}", fmt_cause(.cause))]
    DeauthFailed {
        message: String,
        cause: Option<String>,
    },

    #[error("{message}{}", fmt_cause(.cause))]
    SeedQueryFailed {
        message: String,
        cause: Option<String>,
    },

    #[error("invalid {field}: {reason}")]
    MalformedInput { field: String, reason: String },

    #[error("method not registered: {0}")]
    UnknownMethod(String),

    #[error("no pending request for interaction {0}")]
    UnknownInteraction(String),

    #[error("platform error: {0}")]
    Platform(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

fn fmt_cause(cause: &Option<String>) -> String {
    match cause {
        Some(cause) => format!(": {}", cause),
        None => String::new(),
    }
}

impl BridgeError {
    /// Get the error code for FFI/mobile integration.
    pub fn code(&self) -> BridgeErrorCode {
        match self {
            Self::PermissionDenied { .. } => BridgeErrorCode::PermissionDenied,
            Self::AuthorizationFailed { .. } => BridgeErrorCode::AuthorizationFailed,
            Self::NoKeyReceived { .. } => BridgeErrorCode::NoKeyReceived,
            Self::KeyNotValid { .. } => BridgeErrorCode::KeyNotValid,
            Self::SignFailed { .. } => BridgeErrorCode::SignFailed,
            Self::DeauthFailed { .. } => BridgeErrorCode::DeauthFailed,
            Self::SeedQueryFailed { .. } => BridgeErrorCode::SeedQueryFailed,
            Self::MalformedInput { .. } => BridgeErrorCode::MalformedInput,
            Self::UnknownMethod(_) => BridgeErrorCode::UnknownMethod,
            Self::UnknownInteraction(_) => BridgeErrorCode::UnknownInteraction,
            Self::Platform(_) => BridgeErrorCode::Platform,
            Self::Config(_) => BridgeErrorCode::Config,
            Self::Internal(_) => BridgeErrorCode::Internal,
        }
    }

    /// Stable name of the failure kind, as surfaced to the calling application.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PermissionDenied { .. } => "PermissionDenied",
            Self::AuthorizationFailed { .. } => "AuthorizationFailed",
            Self::NoKeyReceived { .. } => "NoKeyReceived",
            Self::KeyNotValid { .. } => "KeyNotValid",
            Self::SignFailed { .. } => "SignFailed",
            Self::DeauthFailed { .. } => "DeauthFailed",
            Self::SeedQueryFailed { .. } => "SeedQueryFailed",
            Self::MalformedInput { .. } => "MalformedInput",
            Self::UnknownMethod(_) => "UnknownMethod",
            Self::UnknownInteraction(_) => "UnknownInteraction",
            Self::Platform(_) => "Platform",
            Self::Config(_) => "Config",
            Self::Internal(_) => "Internal",
        }
    }

    /// The service-reported cause, if any.
    pub fn cause(&self) -> Option<&str> {
        match self {
            Self::AuthorizationFailed { cause, .. }
            | Self::KeyNotValid { cause, .. }
            | Self::SignFailed { cause, .. }
            | Self::DeauthFailed { cause, .. }
            | Self::SeedQueryFailed { cause, .. } => cause.as_deref(),
            _ => None,
        }
    }

    /// Returns true if the caller may reasonably re-invoke the operation.
    ///
    /// Permission denials need new user consent, and key/sign failures with
    /// the same token usually mean the token is stale.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::AuthorizationFailed { .. } | Self::Platform(_))
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied {
            message: message.into(),
        }
    }

    pub fn authorization_failed(message: impl Into<String>, cause: Option<String>) -> Self {
        Self::AuthorizationFailed {
            message: message.into(),
            cause,
        }
    }

    pub fn no_key_received() -> Self {
        Self::NoKeyReceived {
            message: "No public key received".to_string(),
        }
    }

    pub fn key_not_valid(cause: impl Into<String>) -> Self {
        Self::KeyNotValid {
            message: "Public key is not valid".to_string(),
            cause: Some(cause.into()),
        }
    }

    pub fn sign_failed(message: impl Into<String>, cause: Option<String>) -> Self {
        Self::SignFailed {
            message: message.into(),
            cause,
        }
    }

    pub fn deauth_failed(cause: impl Into<String>) -> Self {
        Self::DeauthFailed {
            message: "Failed deauth".to_string(),
            cause: Some(cause.into()),
        }
    }

    pub fn seed_query_failed(cause: impl Into<String>) -> Self {
        Self::SeedQueryFailed {
            message: "Failed to get authorized seeds".to_string(),
            cause: Some(cause.into()),
        }
    }

    pub fn malformed(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Serialisable failure shape for the call boundary.
    pub fn to_payload(&self) -> ErrorPayload {
        ErrorPayload {
            code: self.code() as i32,
            kind: self.kind().to_string(),
            message: self.to_string(),
            cause: self.cause().map(str::to_string),
        }
    }
}

/// Failure payload returned to the calling application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: i32,
    pub kind: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("serialization: {}", err))
    }
}
