//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use seedvault_lib::prelude::*;
//! ```

// Core types
pub use crate::{AuthToken, PortableBytes, Purpose, SeedRecord};

// Error handling
pub use crate::errors::{BridgeError, BridgeErrorCode, ErrorPayload};
pub use crate::Result;

// Bridge
pub use crate::bridge::{BridgeRuntime, SeedVaultBridge};
pub use crate::config::BridgeConfig;
pub use crate::permission::PermissionOutcome;
pub use crate::rpc::{BridgeCall, BridgeReply, RpcDispatcher};

// Host collaborators
pub use crate::correlator::{ActivityResult, CompletionSender, InteractionId};
pub use crate::service::{
    InteractionRequest, PermissionPlatform, PermissionState, SeedCursor, SeedVaultService,
};

// Verification
pub use crate::verify::{address_from_pubkey, intent_digest, verify_signature};
