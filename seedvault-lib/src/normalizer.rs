//! Result normalization.
//!
//! Interactions come back as a platform completion code plus opaque JSON
//! result data. Each operation has one interpretation function here that turns
//! that pair into either a typed payload or the operation's failure kind.
//! None of these functions panic: empty lists, missing data and payloads that
//! fail to decode all resolve to an error.

use serde::{Deserialize, Serialize};

use crate::correlator::{ActivityResult, ResultKind};
use crate::service::{
    SeedCursor, AUTHORIZED_SEEDS_AUTH_PURPOSE, AUTHORIZED_SEEDS_AUTH_TOKEN,
    AUTHORIZED_SEEDS_SEED_NAME,
};
use crate::types::RawBytes;
use crate::{AuthToken, BridgeError, PortableBytes, Purpose, Result, SeedRecord};

/// Platform completion codes reported with every interaction result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompletionCode {
    Ok,
    Canceled,
    UnspecifiedError,
    InvalidAuthToken,
    InvalidPayload,
    InvalidDerivationPath,
    KeyUnavailable,
    NoAvailableSeeds,
    ImplementationLimitExceeded,
    AuthenticationFailed,
    Other(i32),
}

impl CompletionCode {
    pub const RESULT_OK: i32 = -1;
    pub const RESULT_CANCELED: i32 = 0;

    pub fn from_code(code: i32) -> Self {
        match code {
            Self::RESULT_OK => Self::Ok,
            Self::RESULT_CANCELED => Self::Canceled,
            1000 => Self::UnspecifiedError,
            1001 => Self::InvalidAuthToken,
            1002 => Self::InvalidPayload,
            1003 => Self::InvalidDerivationPath,
            1004 => Self::KeyUnavailable,
            1005 => Self::NoAvailableSeeds,
            1006 => Self::ImplementationLimitExceeded,
            1007 => Self::AuthenticationFailed,
            other => Self::Other(other),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Self::Ok => Self::RESULT_OK,
            Self::Canceled => Self::RESULT_CANCELED,
            Self::UnspecifiedError => 1000,
            Self::InvalidAuthToken => 1001,
            Self::InvalidPayload => 1002,
            Self::InvalidDerivationPath => 1003,
            Self::KeyUnavailable => 1004,
            Self::NoAvailableSeeds => 1005,
            Self::ImplementationLimitExceeded => 1006,
            Self::AuthenticationFailed => 1007,
            Self::Other(code) => *code,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }

    /// Human-readable reason for a failed completion.
    pub fn describe(&self) -> String {
        match self {
            Self::Ok => "ok".to_string(),
            Self::Canceled => "cancelled by user".to_string(),
            Self::UnspecifiedError => "unspecified error".to_string(),
            Self::InvalidAuthToken => "invalid auth token".to_string(),
            Self::InvalidPayload => "invalid payload".to_string(),
            Self::InvalidDerivationPath => "invalid derivation path".to_string(),
            Self::KeyUnavailable => "key unavailable".to_string(),
            Self::NoAvailableSeeds => "no available seeds".to_string(),
            Self::ImplementationLimitExceeded => "implementation limit exceeded".to_string(),
            Self::AuthenticationFailed => "user authentication failed".to_string(),
            Self::Other(code) => format!("result code {}", code),
        }
    }
}

/// Result data of a seed authorization interaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizeSeedData {
    pub auth_token: AuthToken,
}

/// One entry of a public key interaction result.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyResponse {
    #[serde(default)]
    pub public_key: Option<RawBytes>,
    #[serde(default)]
    pub public_key_encoded: Option<String>,
    #[serde(default)]
    pub resolved_derivation_path: Option<String>,
    /// Reason the service gives when it could not produce a valid key.
    #[serde(default)]
    pub invalid_reason: Option<String>,
}

impl PublicKeyResponse {
    /// The key bytes, or the service-reported reason they are not valid.
    pub fn public_key(&self) -> std::result::Result<&[u8], String> {
        if let Some(reason) = &self.invalid_reason {
            return Err(reason.clone());
        }
        match &self.public_key {
            Some(key) if !key.0.is_empty() => Ok(&key.0),
            Some(_) => Err("public key is empty".to_string()),
            None => Err("public key is null".to_string()),
        }
    }
}

/// Result data of a public key interaction.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyData {
    #[serde(default)]
    pub public_keys: Vec<PublicKeyResponse>,
}

/// One entry of a signing interaction result.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningResponse {
    #[serde(default)]
    pub signatures: Vec<RawBytes>,
    #[serde(default)]
    pub resolved_derivation_paths: Vec<String>,
}

/// Result data of a signing interaction.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningData {
    #[serde(default)]
    pub signing_responses: Vec<SigningResponse>,
}

/// Uniform success payload of an interaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Normalized {
    AuthToken(AuthToken),
    PublicKey(PortableBytes),
    Signature(PortableBytes),
}

/// Dispatch to the interpretation function for `kind`.
pub fn normalize(kind: ResultKind, result: &ActivityResult) -> Result<Normalized> {
    match kind {
        ResultKind::Authorize => normalize_authorization(result).map(Normalized::AuthToken),
        ResultKind::PublicKey => normalize_public_key(result).map(Normalized::PublicKey),
        ResultKind::Sign => normalize_signature(result).map(Normalized::Signature),
    }
}

fn decode<T>(result: &ActivityResult) -> std::result::Result<T, String>
where
    T: serde::de::DeserializeOwned,
{
    let code = CompletionCode::from_code(result.result_code);
    if !code.is_ok() {
        return Err(code.describe());
    }
    let data = result
        .data
        .clone()
        .ok_or_else(|| "result carried no data".to_string())?;
    serde_json::from_value(data).map_err(|e| format!("undecodable result data: {}", e))
}

/// Extract the auth token from a seed authorization result.
pub fn normalize_authorization(result: &ActivityResult) -> Result<AuthToken> {
    decode::<AuthorizeSeedData>(result)
        .map(|data| data.auth_token)
        .map_err(|cause| BridgeError::authorization_failed("Authorization failed", Some(cause)))
}

/// Extract the first public key of a key request result.
///
/// Only the first response is consumed; the fixed single-path policy never
/// asks for more.
pub fn normalize_public_key(result: &ActivityResult) -> Result<PortableBytes> {
    let data = decode::<PublicKeyData>(result).map_err(|cause| BridgeError::NoKeyReceived {
        message: format!("Failed to get public key: {}", cause),
    })?;

    let response = data
        .public_keys
        .first()
        .ok_or_else(BridgeError::no_key_received)?;

    response
        .public_key()
        .map(|bytes| PortableBytes::new(bytes.to_vec()))
        .map_err(BridgeError::key_not_valid)
}

/// Extract the first signature of the first signing response.
pub fn normalize_signature(result: &ActivityResult) -> Result<PortableBytes> {
    let data = decode::<SigningData>(result)
        .map_err(|cause| BridgeError::sign_failed("sign failed", Some(cause)))?;

    let response = data
        .signing_responses
        .into_iter()
        .next()
        .ok_or_else(|| no_signature("empty signing response list"))?;

    response
        .signatures
        .into_iter()
        .next()
        .map(RawBytes::into_portable)
        .ok_or_else(|| no_signature("empty signature list"))
}

fn no_signature(cause: &str) -> BridgeError {
    BridgeError::sign_failed("No signature received", Some(cause.to_string()))
}

/// Read every row of an authorized-seeds cursor.
pub fn normalize_seed_rows(cursor: &mut dyn SeedCursor) -> Result<Vec<SeedRecord>> {
    let column = |name: &str| {
        cursor
            .column_index(name)
            .ok_or_else(|| BridgeError::seed_query_failed(format!("missing column {}", name)))
    };
    let token_idx = column(AUTHORIZED_SEEDS_AUTH_TOKEN)?;
    let purpose_idx = column(AUTHORIZED_SEEDS_AUTH_PURPOSE)?;
    let name_idx = column(AUTHORIZED_SEEDS_SEED_NAME)?;

    let mut seeds = Vec::new();
    while cursor.move_to_next() {
        let read = |e: BridgeError| BridgeError::seed_query_failed(e.to_string());
        seeds.push(SeedRecord {
            auth_token: AuthToken(cursor.get_i64(token_idx).map_err(read)?),
            purpose: Purpose::from(cursor.get_i32(purpose_idx).map_err(read)?),
            name: cursor.get_string(name_idx).map_err(read)?,
        });
    }
    Ok(seeds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{ColumnValue, RowCursor, AUTHORIZED_SEEDS_PROJECTION};
    use serde_json::json;

    fn ok(data: serde_json::Value) -> ActivityResult {
        ActivityResult::ok(data)
    }

    #[test]
    fn test_completion_code_mapping() {
        assert_eq!(CompletionCode::from_code(-1), CompletionCode::Ok);
        assert_eq!(CompletionCode::from_code(0), CompletionCode::Canceled);
        assert_eq!(CompletionCode::from_code(1004), CompletionCode::KeyUnavailable);
        assert_eq!(CompletionCode::from_code(42), CompletionCode::Other(42));
        assert_eq!(CompletionCode::KeyUnavailable.code(), 1004);
    }

    #[test]
    fn test_authorization_token() {
        let token = normalize_authorization(&ok(json!({"authToken": 42}))).unwrap();
        assert_eq!(token, AuthToken(42));
    }

    #[test]
    fn test_authorization_cancelled() {
        let err = normalize_authorization(&ActivityResult::canceled()).unwrap_err();
        assert_eq!(err.kind(), "AuthorizationFailed");
        assert_eq!(err.cause(), Some("cancelled by user"));
    }

    #[test]
    fn test_authorization_missing_data() {
        let result = ActivityResult {
            result_code: CompletionCode::RESULT_OK,
            data: None,
        };
        let err = normalize_authorization(&result).unwrap_err();
        assert_eq!(err.kind(), "AuthorizationFailed");
    }

    #[test]
    fn test_public_key_first_response_only() {
        let result = ok(json!({"publicKeys": [
            {"publicKey": [1, 2, -1]},
            {"publicKey": [9, 9, 9]}
        ]}));
        let key = normalize_public_key(&result).unwrap();
        assert_eq!(key.as_slice(), &[1u8, 2, 255]);
    }

    #[test]
    fn test_public_key_empty_list() {
        let err = normalize_public_key(&ok(json!({"publicKeys": []}))).unwrap_err();
        assert_eq!(err, BridgeError::no_key_received());
    }

    #[test]
    fn test_public_key_not_valid_carries_cause() {
        let result = ok(json!({"publicKeys": [
            {"publicKey": null, "invalidReason": "derivation path not permitted"}
        ]}));
        let err = normalize_public_key(&result).unwrap_err();
        assert_eq!(err.kind(), "KeyNotValid");
        assert!(err.to_string().contains("derivation path not permitted"));
    }

    #[test]
    fn test_public_key_null_without_reason() {
        let err = normalize_public_key(&ok(json!({"publicKeys": [{}]}))).unwrap_err();
        assert_eq!(err.kind(), "KeyNotValid");
        assert_eq!(err.cause(), Some("public key is null"));
    }

    #[test]
    fn test_public_key_action_failed() {
        let result = ActivityResult::failed(1001);
        let err = normalize_public_key(&result).unwrap_err();
        assert_eq!(err.kind(), "NoKeyReceived");
        assert!(err.to_string().contains("invalid auth token"));
    }

    #[test]
    fn test_signature_scenario() {
        let result = ok(json!({"signingResponses": [
            {"signatures": [[-102, 0, 127]], "resolvedDerivationPaths": ["bip32:/m/44'/784'/0'/0'/0'"]}
        ]}));
        let sig = normalize_signature(&result).unwrap();
        assert_eq!(serde_json::to_value(&sig).unwrap(), json!([154, 0, 127]));
    }

    #[test]
    fn test_signature_empty_lists_fail_without_panic() {
        let err = normalize_signature(&ok(json!({"signingResponses": []}))).unwrap_err();
        assert_eq!(err.kind(), "SignFailed");

        let err =
            normalize_signature(&ok(json!({"signingResponses": [{"signatures": []}]}))).unwrap_err();
        assert_eq!(err.kind(), "SignFailed");
        assert_eq!(err.cause(), Some("empty signature list"));
    }

    #[test]
    fn test_signature_undecodable_bytes() {
        let result = ok(json!({"signingResponses": [{"signatures": [[300]]}]}));
        assert_eq!(normalize_signature(&result).unwrap_err().kind(), "SignFailed");
    }

    #[test]
    fn test_normalize_dispatches_by_kind() {
        let result = ok(json!({"authToken": 5}));
        assert_eq!(
            normalize(ResultKind::Authorize, &result).unwrap(),
            Normalized::AuthToken(AuthToken(5))
        );
        assert!(normalize(ResultKind::Sign, &result).is_err());
    }

    #[test]
    fn test_seed_rows() {
        let mut cursor = RowCursor::new(
            AUTHORIZED_SEEDS_PROJECTION.iter().map(|c| c.to_string()).collect(),
            vec![vec![
                ColumnValue::Integer(11),
                ColumnValue::Integer(0),
                ColumnValue::Text("Cool wallet".into()),
            ]],
        );
        let seeds = normalize_seed_rows(&mut cursor).unwrap();
        assert_eq!(
            seeds,
            vec![SeedRecord {
                auth_token: AuthToken(11),
                purpose: Purpose::SignSolanaTransaction,
                name: Some("Cool wallet".into()),
            }]
        );
    }

    #[test]
    fn test_seed_rows_keep_null_name() {
        let mut cursor = RowCursor::new(
            AUTHORIZED_SEEDS_PROJECTION.iter().map(|c| c.to_string()).collect(),
            vec![vec![
                ColumnValue::Integer(12),
                ColumnValue::Integer(0),
                ColumnValue::Null,
            ]],
        );
        let seeds = normalize_seed_rows(&mut cursor).unwrap();
        assert_eq!(seeds[0].name, None);
        assert_eq!(
            serde_json::to_value(&seeds[0]).unwrap(),
            json!({"authToken": 12, "purpose": 0, "name": null})
        );
    }

    #[test]
    fn test_seed_rows_empty_and_missing_column() {
        let mut empty = RowCursor::new(
            AUTHORIZED_SEEDS_PROJECTION.iter().map(|c| c.to_string()).collect(),
            vec![],
        );
        assert!(normalize_seed_rows(&mut empty).unwrap().is_empty());

        let mut bad = RowCursor::new(vec!["other".into()], vec![]);
        assert_eq!(
            normalize_seed_rows(&mut bad).unwrap_err().kind(),
            "SeedQueryFailed"
        );
    }
}
