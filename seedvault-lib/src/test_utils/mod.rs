//! Test utilities for the seed vault bridge.
//!
//! This module provides:
//! - A scripted mock seed vault that records every launched interaction
//! - A mock permission platform with a configurable prompt answer
//! - A software seed vault that really derives ed25519 keys and signs
//!
//! ## Usage
//!
//! ```rust,ignore
//! use seedvault_lib::test_utils::{MockPermissions, MockSeedVault, ScriptedOutcome};
//!
//! let vault = Arc::new(MockSeedVault::new());
//! vault.push_outcome(ScriptedOutcome::signature(&[-102, 0, 127]));
//!
//! let runtime = BridgeRuntime::start(config, vault.clone(), Arc::new(MockPermissions::granted()))?;
//! vault.attach(runtime.completions());
//!
//! let signed = runtime.bridge().sign_bytes(AuthToken(42), vec![1, 2, 255]).await?;
//! ```

mod mock_permissions;
mod mock_vault;
mod software_vault;

pub use mock_permissions::MockPermissions;
pub use mock_vault::{MockSeedVault, ScriptedOutcome};
pub use software_vault::SoftwareSeedVault;

/// Re-encode unsigned bytes the way the platform reports them (Java `byte`).
pub fn to_platform_bytes(bytes: &[u8]) -> Vec<i8> {
    bytes.iter().map(|b| *b as i8).collect()
}
