//! Collaborator interfaces consumed from the host platform.
//!
//! The seed vault itself (key storage, derivation, signing) and the
//! permission UI live outside this crate. Hosts implement these traits:
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                        Host platform                          │
//! │   PermissionPlatform          SeedVaultService                │
//! │   - permission_state          - has_unauthorized_seeds        │
//! │   - request_permissions       - launch(interaction)  ─────┐   │
//! │                               - deauthorize_seed          │   │
//! │                               - authorized_seeds (cursor) │   │
//! └───────────────────────────────────────────────────────────┼───┘
//!                                                             │
//!                  CompletionSender::complete(id, result) ◄───┘
//! ```
//!
//! `launch` only starts the interaction. Its outcome comes back later
//! through the [`CompletionSender`](crate::correlator::CompletionSender).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::correlator::InteractionId;
use crate::derivation::DerivationPath;
use crate::{AuthToken, Purpose, Result};

/// Column holding the auth token in the authorized-seeds enumeration.
pub const AUTHORIZED_SEEDS_AUTH_TOKEN: &str = "AuthorizedSeeds_AuthToken";

/// Column holding the purpose code in the authorized-seeds enumeration.
pub const AUTHORIZED_SEEDS_AUTH_PURPOSE: &str = "AuthorizedSeeds_AuthPurpose";

/// Column holding the seed display name in the authorized-seeds enumeration.
pub const AUTHORIZED_SEEDS_SEED_NAME: &str = "AuthorizedSeeds_SeedName";

/// Fixed projection used for every enumeration query.
pub const AUTHORIZED_SEEDS_PROJECTION: [&str; 3] = [
    AUTHORIZED_SEEDS_AUTH_TOKEN,
    AUTHORIZED_SEEDS_AUTH_PURPOSE,
    AUTHORIZED_SEEDS_SEED_NAME,
];

/// Grant state of a platform permission, as the platform reports it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionState {
    Granted,
    Denied,
    /// Not decided yet; requesting will show the system dialog.
    Prompt,
}

/// Platform permission checks and the grant flow.
#[async_trait]
pub trait PermissionPlatform: Send + Sync {
    /// Current grant state of one platform permission string.
    fn permission_state(&self, permission: &str) -> PermissionState;

    /// Start the platform grant flow for `permissions` and return once the
    /// user has answered. The answer itself is read back through
    /// [`permission_state`](Self::permission_state).
    async fn request_permissions(&self, alias: &str, permissions: &[String]) -> Result<()>;
}

/// Interaction the platform runs on the bridge's behalf.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InteractionRequest {
    /// Let the user pick and consent to a seed for `purpose`.
    AuthorizeSeed { purpose: Purpose },
    /// Fetch the public key at `derivation_path`.
    RequestPublicKey {
        auth_token: AuthToken,
        derivation_path: DerivationPath,
    },
    /// Sign `message` with the key at `derivation_path`.
    SignMessage {
        auth_token: AuthToken,
        derivation_path: DerivationPath,
        message: Vec<u8>,
    },
}

impl InteractionRequest {
    pub fn name(&self) -> &'static str {
        match self {
            Self::AuthorizeSeed { .. } => "authorize_seed",
            Self::RequestPublicKey { .. } => "request_public_key",
            Self::SignMessage { .. } => "sign_message",
        }
    }
}

/// The seed-custody service as seen from the bridge.
pub trait SeedVaultService: Send + Sync {
    /// Whether any seed exists that is not yet authorized for `purpose`.
    fn has_unauthorized_seeds_for_purpose(&self, purpose: Purpose) -> Result<bool>;

    /// Start an interaction. Must not block on the user; the result is
    /// delivered later for `interaction_id`.
    fn launch(&self, interaction_id: InteractionId, request: InteractionRequest) -> Result<()>;

    /// Revoke `auth_token` synchronously.
    fn deauthorize_seed(&self, auth_token: AuthToken) -> Result<()>;

    /// Query authorized seeds, returning a cursor over `projection`.
    fn authorized_seeds(&self, projection: &[&str]) -> Result<Box<dyn SeedCursor>>;
}

/// A single value in an enumeration row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnValue {
    Integer(i64),
    Text(String),
    Null,
}

/// Cursor over a tabular query result, positioned before the first row.
pub trait SeedCursor: Send {
    /// Advance to the next row; false once exhausted.
    fn move_to_next(&mut self) -> bool;

    /// Index of `column` in the projection, if present.
    fn column_index(&self, column: &str) -> Option<usize>;

    fn get_i64(&self, index: usize) -> Result<i64>;

    fn get_i32(&self, index: usize) -> Result<i32>;

    /// `None` when the column is null.
    fn get_string(&self, index: usize) -> Result<Option<String>>;
}

/// In-memory cursor over owned rows.
#[derive(Clone, Debug, Default)]
pub struct RowCursor {
    columns: Vec<String>,
    rows: Vec<Vec<ColumnValue>>,
    position: Option<usize>,
}

impl RowCursor {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<ColumnValue>>) -> Self {
        Self {
            columns,
            rows,
            position: None,
        }
    }

    fn current(&self, index: usize) -> Result<&ColumnValue> {
        let row = self
            .position
            .and_then(|p| self.rows.get(p))
            .ok_or_else(|| crate::BridgeError::Internal("cursor not on a row".into()))?;
        row.get(index).ok_or_else(|| {
            crate::BridgeError::Internal(format!("column index {} out of range", index))
        })
    }
}

impl SeedCursor for RowCursor {
    fn move_to_next(&mut self) -> bool {
        let next = self.position.map_or(0, |p| p + 1);
        if next < self.rows.len() {
            self.position = Some(next);
            true
        } else {
            self.position = Some(self.rows.len());
            false
        }
    }

    fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    fn get_i64(&self, index: usize) -> Result<i64> {
        match self.current(index)? {
            ColumnValue::Integer(v) => Ok(*v),
            other => Err(crate::BridgeError::Internal(format!(
                "column {} is not an integer: {:?}",
                index, other
            ))),
        }
    }

    fn get_i32(&self, index: usize) -> Result<i32> {
        let value = self.get_i64(index)?;
        i32::try_from(value).map_err(|_| {
            crate::BridgeError::Internal(format!("column {} value {} exceeds i32", index, value))
        })
    }

    fn get_string(&self, index: usize) -> Result<Option<String>> {
        match self.current(index)? {
            ColumnValue::Text(v) => Ok(Some(v.clone())),
            ColumnValue::Integer(v) => Ok(Some(v.to_string())),
            ColumnValue::Null => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cursor() -> RowCursor {
        RowCursor::new(
            AUTHORIZED_SEEDS_PROJECTION.iter().map(|c| c.to_string()).collect(),
            vec![
                vec![
                    ColumnValue::Integer(7),
                    ColumnValue::Integer(0),
                    ColumnValue::Text("Main".into()),
                ],
                vec![
                    ColumnValue::Integer(9),
                    ColumnValue::Integer(0),
                    ColumnValue::Null,
                ],
            ],
        )
    }

    #[test]
    fn test_cursor_walks_rows() {
        let mut c = cursor();
        let token = c.column_index(AUTHORIZED_SEEDS_AUTH_TOKEN).unwrap();
        let name = c.column_index(AUTHORIZED_SEEDS_SEED_NAME).unwrap();

        assert!(c.get_i64(token).is_err());
        assert!(c.move_to_next());
        assert_eq!(c.get_i64(token).unwrap(), 7);
        assert_eq!(c.get_string(name).unwrap().as_deref(), Some("Main"));
        assert!(c.move_to_next());
        assert_eq!(c.get_string(name).unwrap(), None);
        assert!(!c.move_to_next());
        assert!(!c.move_to_next());
    }

    #[test]
    fn test_cursor_type_mismatch() {
        let mut c = cursor();
        c.move_to_next();
        assert!(c.get_i64(2).is_err());
        assert!(c.column_index("missing").is_none());
    }

    #[test]
    fn test_interaction_request_json() {
        let req = InteractionRequest::RequestPublicKey {
            auth_token: AuthToken(42),
            derivation_path: crate::derivation::build_signing_path(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["type"], "request_public_key");
        assert_eq!(json["derivation_path"], "bip32:/m/44'/784'/0'/0'/0'");
        assert_eq!(req.name(), "request_public_key");
    }
}
