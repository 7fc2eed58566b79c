//! BIP32 derivation paths for seed vault key requests.
//!
//! The seed vault addresses child keys by URI:
//!
//! ```text
//! bip32:/m/44'/784'/0'/0'/0'
//!        │  │   │    │  │  └── address index
//!        │  │   │    │  └───── change
//!        │  │   │    └──────── account
//!        │  │   └───────────── coin type
//!        │  └───────────────── purpose (BIP44)
//!        └──────────────────── master key indicator
//! ```
//!
//! Every level built here is hardened, as required for ed25519 derivation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{BridgeError, Result};

/// URI scheme for BIP32 derivation paths.
pub const BIP32_URI_SCHEME: &str = "bip32";

/// Master key indicator, first path segment.
pub const MASTER_KEY_INDICATOR: &str = "m";

/// BIP44 purpose level.
pub const BIP44_PURPOSE: u32 = 44;

/// SLIP-44 coin type of the target network.
pub const COIN_TYPE_SUI: u32 = 784;

/// Indices at or above this value cannot be hardened.
pub const HARDENED_LIMIT: u32 = 1 << 31;

/// One level of a derivation path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BipLevel {
    pub index: u32,
    pub hardened: bool,
}

impl BipLevel {
    pub const fn hardened(index: u32) -> Self {
        Self {
            index,
            hardened: true,
        }
    }

    pub const fn normal(index: u32) -> Self {
        Self {
            index,
            hardened: false,
        }
    }
}

impl fmt::Display for BipLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hardened {
            write!(f, "{}'", self.index)
        } else {
            write!(f, "{}", self.index)
        }
    }
}

/// Immutable, ordered derivation path.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DerivationPath {
    levels: Vec<BipLevel>,
}

impl DerivationPath {
    /// Build a path from its levels, rejecting indices outside the BIP32 range.
    pub fn new(levels: Vec<BipLevel>) -> Result<Self> {
        if let Some(level) = levels.iter().find(|l| l.index >= HARDENED_LIMIT) {
            return Err(BridgeError::malformed(
                "derivation path",
                format!("index {} exceeds {}", level.index, HARDENED_LIMIT - 1),
            ));
        }
        Ok(Self { levels })
    }

    pub fn levels(&self) -> &[BipLevel] {
        &self.levels
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn is_fully_hardened(&self) -> bool {
        self.levels.iter().all(|l| l.hardened)
    }

    /// Encode as a `bip32:` URI.
    pub fn to_uri(&self) -> String {
        self.to_string()
    }

    /// Canonical byte encoding: per level, the big-endian index with the
    /// hardened bit set, as BIP32 serialises child numbers.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.levels
            .iter()
            .flat_map(|l| {
                let n = if l.hardened {
                    l.index | HARDENED_LIMIT
                } else {
                    l.index
                };
                n.to_be_bytes()
            })
            .collect()
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:/{}", BIP32_URI_SCHEME, MASTER_KEY_INDICATOR)?;
        for level in &self.levels {
            write!(f, "/{}", level)?;
        }
        Ok(())
    }
}

impl FromStr for DerivationPath {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        let rest = s
            .strip_prefix(BIP32_URI_SCHEME)
            .and_then(|r| r.strip_prefix(":/"))
            .ok_or_else(|| BridgeError::malformed("derivation path", "expected bip32:/ scheme"))?;

        let mut segments = rest.split('/');
        if segments.next() != Some(MASTER_KEY_INDICATOR) {
            return Err(BridgeError::malformed(
                "derivation path",
                "missing master key indicator",
            ));
        }

        let levels = segments
            .map(|segment| {
                let (digits, hardened) = match segment.strip_suffix('\'') {
                    Some(d) => (d, true),
                    None => (segment, false),
                };
                digits
                    .parse::<u32>()
                    .map(|index| BipLevel { index, hardened })
                    .map_err(|_| {
                        BridgeError::malformed("derivation path", format!("bad level '{}'", segment))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(levels)
    }
}

impl Serialize for DerivationPath {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_uri())
    }
}

impl<'de> Deserialize<'de> for DerivationPath {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let uri = String::deserialize(deserializer)?;
        uri.parse().map_err(serde::de::Error::custom)
    }
}

/// Inputs the signing path is built from.
///
/// The bridge uses a single fixed policy today; keeping it as data keeps the
/// builder a pure function.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SigningPolicy {
    pub coin_type: u32,
    pub account: u32,
    pub change: u32,
    pub index: u32,
}

impl Default for SigningPolicy {
    fn default() -> Self {
        Self {
            coin_type: COIN_TYPE_SUI,
            account: 0,
            change: 0,
            index: 0,
        }
    }
}

impl SigningPolicy {
    /// Build the five-level, fully hardened path for this policy.
    pub fn signing_path(&self) -> Result<DerivationPath> {
        DerivationPath::new(vec![
            BipLevel::hardened(BIP44_PURPOSE),
            BipLevel::hardened(self.coin_type),
            BipLevel::hardened(self.account),
            BipLevel::hardened(self.change),
            BipLevel::hardened(self.index),
        ])
    }
}

/// The fixed signing path `m/44'/784'/0'/0'/0'`.
pub fn build_signing_path() -> DerivationPath {
    DerivationPath {
        levels: vec![
            BipLevel::hardened(BIP44_PURPOSE),
            BipLevel::hardened(COIN_TYPE_SUI),
            BipLevel::hardened(0),
            BipLevel::hardened(0),
            BipLevel::hardened(0),
        ],
    }
}
