//! Call/response surface.
//!
//! Applications reach the bridge through named methods with JSON arguments.
//! Arguments are validated before anything is launched, the method's
//! capability is checked, and every outcome is shaped into a [`BridgeReply`].
//!
//! | Method               | Args                       | Data                       |
//! |----------------------|----------------------------|----------------------------|
//! | `assertPermissions`  |                            | `{}`                       |
//! | `authorizeSeed`      |                            | `{authToken}` or `{}`      |
//! | `getPubkey`          | `{authToken}`              | `{pubkey: [u8]}`           |
//! | `signBytes`          | `{authToken, bytes: [u8]}` | `{signed: [u8]}`           |
//! | `deauthorizeSeed`    | `{authToken}`              | `{}`                       |
//! | `getAuthorizedSeeds` |                            | `{seeds: [SeedRecord]}`    |

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::bridge::SeedVaultBridge;
use crate::config::methods;
use crate::service::{PermissionPlatform, SeedVaultService};
use crate::{AuthToken, BridgeError, ErrorPayload, Result};

/// One application call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BridgeCall {
    pub method: String,
    #[serde(default)]
    pub args: Value,
}

impl BridgeCall {
    pub fn new(method: impl Into<String>, args: Value) -> Self {
        Self {
            method: method.into(),
            args,
        }
    }
}

/// Outcome of one call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BridgeReply {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorPayload>,
}

impl BridgeReply {
    pub fn success(data: Value) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: &BridgeError) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(error.to_payload()),
        }
    }
}

/// Routes [`BridgeCall`]s to a bridge.
pub struct RpcDispatcher<S: SeedVaultService + ?Sized, P: PermissionPlatform + ?Sized> {
    bridge: Arc<SeedVaultBridge<S, P>>,
}

impl<S, P> RpcDispatcher<S, P>
where
    S: SeedVaultService + ?Sized,
    P: PermissionPlatform + ?Sized,
{
    pub fn new(bridge: Arc<SeedVaultBridge<S, P>>) -> Self {
        Self { bridge }
    }

    /// Handle one call. Never fails: errors become a failed reply.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, call), fields(method = %call.method)))]
    pub async fn handle(&self, call: BridgeCall) -> BridgeReply {
        match self.dispatch(&call).await {
            Ok(data) => BridgeReply::success(data),
            Err(e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(code = e.code() as i32, "call failed: {}", e);
                BridgeReply::failure(&e)
            }
        }
    }

    /// Run one call and return its reply data.
    pub async fn dispatch(&self, call: &BridgeCall) -> Result<Value> {
        let bridge = &self.bridge;
        if bridge.config().method(&call.method).is_none() {
            return Err(BridgeError::UnknownMethod(call.method.clone()));
        }

        match call.method.as_str() {
            methods::ASSERT_PERMISSIONS => {
                bridge.assert_permissions().await?;
                Ok(json!({}))
            }
            methods::AUTHORIZE_SEED => {
                bridge.ensure_capability(&call.method).await?;
                Ok(match bridge.authorize_seed().await? {
                    Some(token) => json!({ "authToken": token }),
                    None => json!({}),
                })
            }
            methods::GET_PUBKEY => {
                let token = auth_token_arg(&call.args)?;
                bridge.ensure_capability(&call.method).await?;
                let pubkey = bridge.get_pubkey(token).await?;
                Ok(json!({ "pubkey": pubkey }))
            }
            methods::SIGN_BYTES => {
                let token = auth_token_arg(&call.args)?;
                let bytes = bytes_arg(&call.args)?;
                bridge.ensure_capability(&call.method).await?;
                let signed = bridge.sign_bytes(token, bytes).await?;
                Ok(json!({ "signed": signed }))
            }
            methods::DEAUTHORIZE_SEED => {
                let token = auth_token_arg(&call.args)?;
                bridge.ensure_capability(&call.method).await?;
                bridge.deauthorize_seed(token)?;
                Ok(json!({}))
            }
            methods::GET_AUTHORIZED_SEEDS => {
                bridge.ensure_capability(&call.method).await?;
                let seeds = bridge.authorized_seeds()?;
                Ok(json!({ "seeds": seeds }))
            }
            other => Err(BridgeError::UnknownMethod(other.to_string())),
        }
    }
}

/// `authToken` must be an integral JSON number within i64.
pub fn auth_token_arg(args: &Value) -> Result<AuthToken> {
    match args.get("authToken") {
        Some(Value::Number(n)) => n.as_i64().map(AuthToken).ok_or_else(|| {
            BridgeError::malformed("authToken", format!("{} is not a 64-bit integer", n))
        }),
        Some(other) => Err(BridgeError::malformed(
            "authToken",
            format!("expected a number, got {}", other),
        )),
        None => Err(BridgeError::malformed("authToken", "missing")),
    }
}

/// `bytes` must be an array of integers in 0..=255.
pub fn bytes_arg(args: &Value) -> Result<Vec<u8>> {
    let values = match args.get("bytes") {
        Some(Value::Array(values)) => values,
        Some(other) => {
            return Err(BridgeError::malformed(
                "bytes",
                format!("expected an array, got {}", other),
            ))
        }
        None => return Err(BridgeError::malformed("bytes", "missing")),
    };

    values
        .iter()
        .enumerate()
        .map(|(i, value)| {
            value
                .as_u64()
                .and_then(|v| u8::try_from(v).ok())
                .ok_or_else(|| {
                    BridgeError::malformed(
                        "bytes",
                        format!("element {} ({}) is not in 0..=255", i, value),
                    )
                })
        })
        .collect()
}
