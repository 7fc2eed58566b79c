//! In-memory seed vault that really signs.
//!
//! Stands in for the hardware vault during development: one seed, ed25519
//! keys derived per path with HKDF-SHA256, results reported with the same
//! signed-byte encoding the platform uses. The derivation is not SLIP-0010
//! and keys do not match a real vault holding the same seed.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::RwLock;

use ed25519_dalek::{Signer, SigningKey};
use hkdf::Hkdf;
use rand::RngCore;
use serde_json::json;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::to_platform_bytes;
use crate::correlator::{ActivityResult, CompletionSender, InteractionId};
use crate::derivation::DerivationPath;
use crate::normalizer::CompletionCode;
use crate::service::{
    ColumnValue, InteractionRequest, RowCursor, SeedCursor, SeedVaultService,
    AUTHORIZED_SEEDS_AUTH_PURPOSE, AUTHORIZED_SEEDS_AUTH_TOKEN, AUTHORIZED_SEEDS_SEED_NAME,
};
use crate::{AuthToken, BridgeError, Purpose, Result};

const KEY_DERIVATION_SALT: &[u8] = b"seedvault-software-signer";

#[derive(Zeroize, ZeroizeOnDrop)]
struct Seed([u8; 32]);

/// Software seed vault holding a single seed.
pub struct SoftwareSeedVault {
    seed: Seed,
    name: String,
    completions: RwLock<Option<CompletionSender>>,
    tokens: RwLock<BTreeMap<i64, Purpose>>,
    next_token: AtomicI64,
}

impl SoftwareSeedVault {
    pub fn from_seed(seed: [u8; 32], name: &str) -> Self {
        Self {
            seed: Seed(seed),
            name: name.to_string(),
            completions: RwLock::new(None),
            tokens: RwLock::new(BTreeMap::new()),
            next_token: AtomicI64::new(1),
        }
    }

    /// Fresh random seed.
    pub fn generate(name: &str) -> Self {
        let mut seed = Zeroizing::new([0u8; 32]);
        rand::rngs::OsRng.fill_bytes(&mut seed[..]);
        Self::from_seed(*seed, name)
    }

    pub fn attach(&self, sender: CompletionSender) {
        *self.completions.write().unwrap() = Some(sender);
    }

    fn signing_key(&self, path: &DerivationPath) -> Result<SigningKey> {
        let hk = Hkdf::<Sha256>::new(Some(KEY_DERIVATION_SALT), &self.seed.0);
        let mut okm = Zeroizing::new([0u8; 32]);
        hk.expand(&path.to_bytes(), &mut okm[..])
            .map_err(|e| BridgeError::Internal(format!("key derivation failed: {}", e)))?;
        Ok(SigningKey::from_bytes(&okm))
    }

    /// Public key the vault reports for `path`.
    pub fn public_key(&self, path: &DerivationPath) -> Result<[u8; 32]> {
        Ok(self.signing_key(path)?.verifying_key().to_bytes())
    }

    fn is_authorized(&self, token: AuthToken) -> bool {
        self.tokens.read().unwrap().contains_key(&token.0)
    }

    fn run(&self, request: &InteractionRequest) -> Result<ActivityResult> {
        let result = match request {
            InteractionRequest::AuthorizeSeed { purpose } => {
                let token = self.next_token.fetch_add(1, Ordering::SeqCst);
                self.tokens.write().unwrap().insert(token, *purpose);
                ActivityResult::ok(json!({ "authToken": token }))
            }
            InteractionRequest::RequestPublicKey {
                auth_token,
                derivation_path,
            } => {
                if !self.is_authorized(*auth_token) {
                    return Ok(ActivityResult::failed(CompletionCode::InvalidAuthToken.code()));
                }
                let key = self.public_key(derivation_path)?;
                ActivityResult::ok(json!({
                    "publicKeys": [{
                        "publicKey": to_platform_bytes(&key),
                        "resolvedDerivationPath": derivation_path.to_uri()
                    }]
                }))
            }
            InteractionRequest::SignMessage {
                auth_token,
                derivation_path,
                message,
            } => {
                if !self.is_authorized(*auth_token) {
                    return Ok(ActivityResult::failed(CompletionCode::InvalidAuthToken.code()));
                }
                let signature = self.signing_key(derivation_path)?.sign(message).to_bytes();
                ActivityResult::ok(json!({
                    "signingResponses": [{
                        "signatures": [to_platform_bytes(&signature)],
                        "resolvedDerivationPaths": [derivation_path.to_uri()]
                    }]
                }))
            }
        };
        Ok(result)
    }
}

impl SeedVaultService for SoftwareSeedVault {
    fn has_unauthorized_seeds_for_purpose(&self, purpose: Purpose) -> Result<bool> {
        Ok(!self.tokens.read().unwrap().values().any(|p| *p == purpose))
    }

    fn launch(&self, interaction_id: InteractionId, request: InteractionRequest) -> Result<()> {
        let sender = self
            .completions
            .read()
            .unwrap()
            .clone()
            .ok_or_else(|| BridgeError::Platform("no completion sender attached".into()))?;
        let result = self.run(&request)?;
        sender.complete(interaction_id, result)
    }

    fn deauthorize_seed(&self, auth_token: AuthToken) -> Result<()> {
        self.tokens.write().unwrap().remove(&auth_token.0);
        Ok(())
    }

    fn authorized_seeds(&self, projection: &[&str]) -> Result<Box<dyn SeedCursor>> {
        let rows = self
            .tokens
            .read()
            .unwrap()
            .iter()
            .map(|(token, purpose)| {
                projection
                    .iter()
                    .map(|column| match *column {
                        AUTHORIZED_SEEDS_AUTH_TOKEN => ColumnValue::Integer(*token),
                        AUTHORIZED_SEEDS_AUTH_PURPOSE => ColumnValue::Integer(purpose.code() as i64),
                        AUTHORIZED_SEEDS_SEED_NAME => ColumnValue::Text(self.name.clone()),
                        _ => ColumnValue::Null,
                    })
                    .collect()
            })
            .collect();
        Ok(Box::new(RowCursor::new(
            projection.iter().map(|c| c.to_string()).collect(),
            rows,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derivation::build_signing_path;

    #[test]
    fn test_keys_are_deterministic_per_path() {
        let a = SoftwareSeedVault::from_seed([7u8; 32], "Test");
        let b = SoftwareSeedVault::from_seed([7u8; 32], "Test");
        let path = build_signing_path();
        assert_eq!(a.public_key(&path).unwrap(), b.public_key(&path).unwrap());

        let other: DerivationPath = "bip32:/m/44'/784'/1'/0'/0'".parse().unwrap();
        assert_ne!(a.public_key(&path).unwrap(), a.public_key(&other).unwrap());
    }

    #[test]
    fn test_unauthorized_token_fails_with_code() {
        let vault = SoftwareSeedVault::from_seed([1u8; 32], "Test");
        let result = vault
            .run(&InteractionRequest::RequestPublicKey {
                auth_token: AuthToken(99),
                derivation_path: build_signing_path(),
            })
            .unwrap();
        assert_eq!(result.result_code, 1001);
    }
}
