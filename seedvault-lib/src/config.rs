//! Bridge configuration.
//!
//! The capability table replaces annotation-style permission metadata: each
//! bridge method names the capability alias it needs (if any), and each alias
//! maps to the platform permission strings it stands for.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::derivation::SigningPolicy;
use crate::{BridgeError, Purpose, Result};

/// Alias of the single coarse-grained seed vault permission.
pub const SEEDVAULT_ALIAS: &str = "seedvault";

/// Platform permission guarding all seed vault access.
pub const PERMISSION_ACCESS_SEED_VAULT: &str = "com.solanamobile.seedvault.ACCESS_SEED_VAULT";

/// Bridge method names as exposed to the calling application.
pub mod methods {
    pub const ASSERT_PERMISSIONS: &str = "assertPermissions";
    pub const AUTHORIZE_SEED: &str = "authorizeSeed";
    pub const GET_PUBKEY: &str = "getPubkey";
    pub const SIGN_BYTES: &str = "signBytes";
    pub const DEAUTHORIZE_SEED: &str = "deauthorizeSeed";
    pub const GET_AUTHORIZED_SEEDS: &str = "getAuthorizedSeeds";

    pub const ALL: [&str; 6] = [
        ASSERT_PERMISSIONS,
        AUTHORIZE_SEED,
        GET_PUBKEY,
        SIGN_BYTES,
        DEAUTHORIZE_SEED,
        GET_AUTHORIZED_SEEDS,
    ];
}

/// Registration of one bridge method.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodRegistration {
    /// Capability alias the method must hold before it runs.
    #[serde(default)]
    pub capability: Option<String>,
}

impl MethodRegistration {
    pub fn open() -> Self {
        Self { capability: None }
    }

    pub fn requiring(alias: impl Into<String>) -> Self {
        Self {
            capability: Some(alias.into()),
        }
    }
}

/// Start-up configuration of the bridge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Name the bridge is registered under with the host.
    pub plugin_name: String,

    /// Capability alias -> required platform permission strings.
    pub permissions: BTreeMap<String, Vec<String>>,

    /// Method name -> registration.
    pub methods: BTreeMap<String, MethodRegistration>,

    /// Purpose every authorization requests and every token is used for.
    pub signing_purpose: Purpose,

    /// Inputs of the derivation path builder.
    pub derivation: SigningPolicy,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        let mut permissions = BTreeMap::new();
        permissions.insert(
            SEEDVAULT_ALIAS.to_string(),
            vec![PERMISSION_ACCESS_SEED_VAULT.to_string()],
        );

        let methods = methods::ALL
            .iter()
            .map(|name| {
                let registration = if *name == methods::ASSERT_PERMISSIONS {
                    MethodRegistration::requiring(SEEDVAULT_ALIAS)
                } else {
                    MethodRegistration::open()
                };
                (name.to_string(), registration)
            })
            .collect();

        Self {
            plugin_name: "SeedVault".to_string(),
            permissions,
            methods,
            signing_purpose: Purpose::SignSolanaTransaction,
            derivation: SigningPolicy::default(),
        }
    }
}

impl BridgeConfig {
    /// Parse a TOML configuration and validate it.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: Self = toml::from_str(input).map_err(|e| BridgeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON configuration and validate it.
    pub fn from_json_str(input: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(input).map_err(|e| BridgeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the capability table for dangling aliases and the derivation policy.
    pub fn validate(&self) -> Result<()> {
        for (alias, permissions) in &self.permissions {
            if permissions.is_empty() {
                return Err(BridgeError::Config(format!(
                    "capability '{}' maps to no platform permission",
                    alias
                )));
            }
        }
        for (method, registration) in &self.methods {
            if let Some(alias) = &registration.capability {
                if !self.permissions.contains_key(alias) {
                    return Err(BridgeError::Config(format!(
                        "method '{}' requires unknown capability '{}'",
                        method, alias
                    )));
                }
            }
        }
        self.derivation
            .signing_path()
            .map_err(|e| BridgeError::Config(e.to_string()))?;
        Ok(())
    }

    /// Platform permissions behind a capability alias.
    pub fn permissions_for(&self, alias: &str) -> Option<&[String]> {
        self.permissions.get(alias).map(Vec::as_slice)
    }

    pub fn method(&self, name: &str) -> Option<&MethodRegistration> {
        self.methods.get(name)
    }
}
