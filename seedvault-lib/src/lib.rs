//! Seed Vault bridge library.
//!
//! Lets an application ask a hardware-backed seed vault to authorize seeds,
//! hand out public keys and sign messages without ever touching key
//! material. The vault and the permission UI are host collaborators reached
//! through the traits in [`service`]; this crate owns the protocol between
//! them.
//!
//! # Features
//!
//! - **Permission Gate**: fast-path grant check with a platform prompt fallback
//! - **Request Correlation**: each launched interaction resolves exactly one waiting call
//! - **Result Normalization**: platform results become typed payloads or one failure kind
//! - **Call/Response Surface**: JSON methods with synchronous argument validation
//!
//! # Example
//!
//! ```ignore
//! use seedvault_lib::prelude::*;
//!
//! let runtime = BridgeRuntime::start(BridgeConfig::default(), vault, permissions)?;
//! host.set_completion_sender(runtime.completions());
//!
//! let bridge = runtime.bridge();
//! bridge.assert_permissions().await?;
//! if let Some(token) = bridge.authorize_seed().await? {
//!     let pubkey = bridge.get_pubkey(token).await?;
//!     let signed = bridge.sign_bytes(token, tx_digest.to_vec()).await?;
//!     assert!(verify_signature(pubkey.as_slice(), &tx_digest, signed.as_slice())?);
//! }
//! ```

pub mod authorization;
pub mod bridge;
pub mod config;
pub mod correlator;
pub mod derivation;
pub mod errors;
pub mod normalizer;
pub mod permission;
pub mod prelude;
pub mod rpc;
pub mod service;
pub mod types;
pub mod verify;

/// Mock and software seed vaults for testing.
///
/// This module is only available with the `test-utils` feature, which the
/// crate's own tests enable through its dev-dependency on itself.
#[cfg(feature = "test-utils")]
pub mod test_utils;

pub use errors::{BridgeError, BridgeErrorCode, ErrorPayload};
pub use types::{AuthToken, PortableBytes, Purpose, SeedRecord};

/// Common result alias for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;
