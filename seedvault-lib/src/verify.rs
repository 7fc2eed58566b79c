//! Checks applied to what the vault returns.
//!
//! The application verifies every signature before using it and derives the
//! on-chain address from the returned public key. Keys are 32-byte ed25519
//! keys; addresses and intent digests use BLAKE2b-256.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};

use crate::{BridgeError, Result};

type Blake2b256 = Blake2b<U32>;

/// Intent prefix of a transaction: scope, version, app id.
pub const TRANSACTION_INTENT: [u8; 3] = [0, 0, 0];

/// Signature scheme flag for ed25519.
pub const ED25519_FLAG: u8 = 0x00;

pub const PUBLIC_KEY_LENGTH: usize = 32;
pub const SIGNATURE_LENGTH: usize = 64;

fn public_key_bytes(pubkey: &[u8]) -> Result<[u8; PUBLIC_KEY_LENGTH]> {
    pubkey.try_into().map_err(|_| {
        BridgeError::malformed(
            "pubkey",
            format!("expected {} bytes, got {}", PUBLIC_KEY_LENGTH, pubkey.len()),
        )
    })
}

/// Check an ed25519 `signature` over `message`.
///
/// Malformed keys or signatures are errors; a well-formed signature that
/// does not verify is `Ok(false)`.
pub fn verify_signature(pubkey: &[u8], message: &[u8], signature: &[u8]) -> Result<bool> {
    let key = VerifyingKey::from_bytes(&public_key_bytes(pubkey)?)
        .map_err(|e| BridgeError::malformed("pubkey", e.to_string()))?;
    let signature =
        Signature::from_slice(signature).map_err(|e| BridgeError::malformed("signature", e.to_string()))?;
    Ok(key.verify(message, &signature).is_ok())
}

/// Digest a transaction is signed over: BLAKE2b-256 of intent prefix plus bytes.
pub fn intent_digest(tx_bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    hasher.update(TRANSACTION_INTENT);
    hasher.update(tx_bytes);
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&hasher.finalize());
    digest
}

/// Address of an ed25519 public key, `0x`-prefixed lowercase hex.
pub fn address_from_pubkey(pubkey: &[u8]) -> Result<String> {
    let key = public_key_bytes(pubkey)?;
    let mut hasher = Blake2b256::new();
    hasher.update([ED25519_FLAG]);
    hasher.update(key);
    Ok(format!("0x{}", hex::encode(hasher.finalize())))
}

/// Wire form of a signature: base64 of flag, signature and public key.
pub fn serialized_signature(signature: &[u8], pubkey: &[u8]) -> Result<String> {
    if signature.len() != SIGNATURE_LENGTH {
        return Err(BridgeError::malformed(
            "signature",
            format!("expected {} bytes, got {}", SIGNATURE_LENGTH, signature.len()),
        ));
    }
    let key = public_key_bytes(pubkey)?;

    let mut out = Vec::with_capacity(1 + SIGNATURE_LENGTH + PUBLIC_KEY_LENGTH);
    out.push(ED25519_FLAG);
    out.extend_from_slice(signature);
    out.extend_from_slice(&key);
    Ok(STANDARD.encode(out))
}
