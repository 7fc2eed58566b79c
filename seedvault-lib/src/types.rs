//! Value types shared across the bridge.

use serde::{Deserialize, Deserializer, Serialize};

/// Opaque handle issued by the seed vault for one seed and one purpose.
///
/// The bridge only passes tokens through; persisting them across process
/// lifetimes is the application's job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthToken(pub i64);

impl AuthToken {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl From<i64> for AuthToken {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Intent a token was issued for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Purpose {
    /// Sign transactions for the target network.
    #[default]
    SignSolanaTransaction,
    /// Any purpose code this bridge does not request itself.
    Other(i32),
}

impl Purpose {
    pub const SIGN_SOLANA_TRANSACTION: i32 = 0;

    pub fn code(&self) -> i32 {
        match self {
            Self::SignSolanaTransaction => Self::SIGN_SOLANA_TRANSACTION,
            Self::Other(code) => *code,
        }
    }
}

impl From<i32> for Purpose {
    fn from(code: i32) -> Self {
        match code {
            Self::SIGN_SOLANA_TRANSACTION => Self::SignSolanaTransaction,
            other => Self::Other(other),
        }
    }
}

impl Serialize for Purpose {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.code())
    }
}

impl<'de> Deserialize<'de> for Purpose {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        i32::deserialize(deserializer).map(Purpose::from)
    }
}

/// One row of the authorized-seed enumeration.
///
/// Not cached: every enumeration re-queries the seed vault. A seed the user
/// never named has `name: None`, serialised as `null`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedRecord {
    pub auth_token: AuthToken,
    pub purpose: Purpose,
    pub name: Option<String>,
}

/// Byte payload re-encoded as unsigned 8-bit values for the call boundary.
///
/// Serialises as a JSON array of integers in `0..=255`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortableBytes(pub Vec<u8>);

impl PortableBytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Re-encode platform bytes that use a signed representation.
    pub fn from_signed(bytes: &[i8]) -> Self {
        Self(bytes.iter().map(|b| *b as u8).collect())
    }

    /// Decode back to the signed representation the platform handed over.
    pub fn to_signed(&self) -> Vec<i8> {
        self.0.iter().map(|b| *b as i8).collect()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for PortableBytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for PortableBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Platform byte array as delivered in interaction result data.
///
/// Hosts whose native byte type is signed hand over values in `-128..=127`;
/// others use `0..=255`. Both are masked to the same unsigned byte.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawBytes(pub Vec<u8>);

impl RawBytes {
    pub fn into_portable(self) -> PortableBytes {
        PortableBytes(self.0)
    }
}

impl<'de> Deserialize<'de> for RawBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let values = Vec::<i64>::deserialize(deserializer)?;
        values
            .into_iter()
            .enumerate()
            .map(|(i, v)| {
                if (-128..=255).contains(&v) {
                    Ok((v & 0xFF) as u8)
                } else {
                    Err(serde::de::Error::custom(format!(
                        "byte value {} at index {} out of range",
                        v, i
                    )))
                }
            })
            .collect::<Result<Vec<u8>, _>>()
            .map(RawBytes)
    }
}

impl Serialize for RawBytes {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_purpose_codes() {
        assert_eq!(Purpose::from(0), Purpose::SignSolanaTransaction);
        assert_eq!(Purpose::from(7), Purpose::Other(7));
        assert_eq!(Purpose::Other(7).code(), 7);
    }

    #[test]
    fn test_seed_record_wire_shape() {
        let record = SeedRecord {
            auth_token: AuthToken(42),
            purpose: Purpose::SignSolanaTransaction,
            name: Some("Cool wallet".to_string()),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"authToken": 42, "purpose": 0, "name": "Cool wallet"})
        );
    }

    #[test]
    fn test_raw_bytes_masks_signed_values() {
        let raw: RawBytes = serde_json::from_str("[-102, 0, 127, 255]").unwrap();
        assert_eq!(raw.0, vec![154, 0, 127, 255]);
    }

    #[test]
    fn test_raw_bytes_rejects_out_of_range() {
        assert!(serde_json::from_str::<RawBytes>("[256]").is_err());
        assert!(serde_json::from_str::<RawBytes>("[-129]").is_err());
    }

    #[test]
    fn test_portable_bytes_signed_conversion() {
        let portable = PortableBytes::from_signed(&[-102, 0, 127]);
        assert_eq!(portable.as_slice(), &[154u8, 0, 127]);
        assert_eq!(portable.to_signed(), vec![-102, 0, 127]);
        assert_eq!(serde_json::to_string(&portable).unwrap(), "[154,0,127]");
    }
}
