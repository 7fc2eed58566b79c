//! Scripted mock seed vault.

use std::collections::VecDeque;
use std::sync::RwLock;

use serde_json::json;

use crate::correlator::{ActivityResult, CompletionSender, InteractionId};
use crate::service::{
    ColumnValue, InteractionRequest, RowCursor, SeedCursor, SeedVaultService,
    AUTHORIZED_SEEDS_AUTH_PURPOSE, AUTHORIZED_SEEDS_AUTH_TOKEN, AUTHORIZED_SEEDS_SEED_NAME,
};
use crate::{AuthToken, BridgeError, Purpose, Result, SeedRecord};

/// What the mock does with the next launched interaction.
#[derive(Clone, Debug)]
pub enum ScriptedOutcome {
    /// Report `ActivityResult` through the attached completion sender.
    Complete(ActivityResult),
    /// Refuse to start the interaction.
    LaunchError(String),
    /// Start it but never report a result.
    Hold,
}

impl ScriptedOutcome {
    pub fn authorized(token: i64) -> Self {
        Self::Complete(ActivityResult::ok(json!({ "authToken": token })))
    }

    /// One public key response with platform-signed bytes.
    pub fn public_key(key: &[i8]) -> Self {
        Self::Complete(ActivityResult::ok(json!({
            "publicKeys": [{
                "publicKey": key,
                "resolvedDerivationPath": "bip32:/m/44'/784'/0'/0'/0'"
            }]
        })))
    }

    /// A public key response the service flagged as invalid.
    pub fn invalid_public_key(reason: &str) -> Self {
        Self::Complete(ActivityResult::ok(json!({
            "publicKeys": [{ "publicKey": null, "invalidReason": reason }]
        })))
    }

    pub fn no_public_keys() -> Self {
        Self::Complete(ActivityResult::ok(json!({ "publicKeys": [] })))
    }

    /// One signing response carrying one platform-signed signature.
    pub fn signature(signature: &[i8]) -> Self {
        Self::Complete(ActivityResult::ok(json!({
            "signingResponses": [{
                "signatures": [signature],
                "resolvedDerivationPaths": ["bip32:/m/44'/784'/0'/0'/0'"]
            }]
        })))
    }

    pub fn no_signatures() -> Self {
        Self::Complete(ActivityResult::ok(json!({
            "signingResponses": [{ "signatures": [] }]
        })))
    }

    pub fn canceled() -> Self {
        Self::Complete(ActivityResult::canceled())
    }

    pub fn failed(result_code: i32) -> Self {
        Self::Complete(ActivityResult::failed(result_code))
    }

    pub fn launch_error(reason: &str) -> Self {
        Self::LaunchError(reason.to_string())
    }
}

/// Seed vault that answers launches from a script and records them.
///
/// Launches with an empty script are held.
pub struct MockSeedVault {
    completions: RwLock<Option<CompletionSender>>,
    unauthorized_seeds: RwLock<bool>,
    script: RwLock<VecDeque<ScriptedOutcome>>,
    launches: RwLock<Vec<(InteractionId, InteractionRequest)>>,
    seeds: RwLock<Vec<SeedRecord>>,
    revoked: RwLock<Vec<AuthToken>>,
    deauth_error: RwLock<Option<String>>,
    query_error: RwLock<Option<String>>,
}

impl Default for MockSeedVault {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSeedVault {
    pub fn new() -> Self {
        Self {
            completions: RwLock::new(None),
            unauthorized_seeds: RwLock::new(true),
            script: RwLock::new(VecDeque::new()),
            launches: RwLock::new(Vec::new()),
            seeds: RwLock::new(Vec::new()),
            revoked: RwLock::new(Vec::new()),
            deauth_error: RwLock::new(None),
            query_error: RwLock::new(None),
        }
    }

    /// Deliver scripted results through `sender`.
    pub fn attach(&self, sender: CompletionSender) {
        *self.completions.write().unwrap() = Some(sender);
    }

    pub fn set_unauthorized_seeds(&self, available: bool) {
        *self.unauthorized_seeds.write().unwrap() = available;
    }

    pub fn push_outcome(&self, outcome: ScriptedOutcome) {
        self.script.write().unwrap().push_back(outcome);
    }

    pub fn add_seed(&self, auth_token: i64, name: &str) {
        self.push_seed(auth_token, Some(name.to_string()));
    }

    /// Seed the user never named; its name column reads as null.
    pub fn add_unnamed_seed(&self, auth_token: i64) {
        self.push_seed(auth_token, None);
    }

    fn push_seed(&self, auth_token: i64, name: Option<String>) {
        self.seeds.write().unwrap().push(SeedRecord {
            auth_token: AuthToken(auth_token),
            purpose: Purpose::SignSolanaTransaction,
            name,
        });
    }

    pub fn fail_deauthorize(&self, reason: &str) {
        *self.deauth_error.write().unwrap() = Some(reason.to_string());
    }

    pub fn fail_query(&self, reason: &str) {
        *self.query_error.write().unwrap() = Some(reason.to_string());
    }

    /// Requests launched so far, in launch order.
    pub fn launches(&self) -> Vec<InteractionRequest> {
        self.launches
            .read()
            .unwrap()
            .iter()
            .map(|(_, request)| request.clone())
            .collect()
    }

    pub fn launched_ids(&self) -> Vec<InteractionId> {
        self.launches.read().unwrap().iter().map(|(id, _)| *id).collect()
    }

    pub fn launch_count(&self) -> usize {
        self.launches.read().unwrap().len()
    }

    pub fn revoked(&self) -> Vec<AuthToken> {
        self.revoked.read().unwrap().clone()
    }
}

impl SeedVaultService for MockSeedVault {
    fn has_unauthorized_seeds_for_purpose(&self, _purpose: Purpose) -> Result<bool> {
        Ok(*self.unauthorized_seeds.read().unwrap())
    }

    fn launch(&self, interaction_id: InteractionId, request: InteractionRequest) -> Result<()> {
        let outcome = self
            .script
            .write()
            .unwrap()
            .pop_front()
            .unwrap_or(ScriptedOutcome::Hold);

        if let ScriptedOutcome::LaunchError(reason) = outcome {
            return Err(BridgeError::Platform(reason));
        }

        self.launches
            .write()
            .unwrap()
            .push((interaction_id, request));

        if let ScriptedOutcome::Complete(result) = outcome {
            let sender = self
                .completions
                .read()
                .unwrap()
                .clone()
                .ok_or_else(|| BridgeError::Platform("no completion sender attached".into()))?;
            sender.complete(interaction_id, result)?;
        }
        Ok(())
    }

    fn deauthorize_seed(&self, auth_token: AuthToken) -> Result<()> {
        if let Some(reason) = self.deauth_error.read().unwrap().clone() {
            return Err(BridgeError::Platform(reason));
        }
        self.seeds
            .write()
            .unwrap()
            .retain(|seed| seed.auth_token != auth_token);
        self.revoked.write().unwrap().push(auth_token);
        Ok(())
    }

    fn authorized_seeds(&self, projection: &[&str]) -> Result<Box<dyn SeedCursor>> {
        if let Some(reason) = self.query_error.read().unwrap().clone() {
            return Err(BridgeError::Platform(reason));
        }
        let rows = self
            .seeds
            .read()
            .unwrap()
            .iter()
            .map(|seed| {
                projection
                    .iter()
                    .map(|column| match *column {
                        AUTHORIZED_SEEDS_AUTH_TOKEN => ColumnValue::Integer(seed.auth_token.0),
                        AUTHORIZED_SEEDS_AUTH_PURPOSE => {
                            ColumnValue::Integer(seed.purpose.code() as i64)
                        }
                        AUTHORIZED_SEEDS_SEED_NAME => seed
                            .name
                            .clone()
                            .map_or(ColumnValue::Null, ColumnValue::Text),
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
