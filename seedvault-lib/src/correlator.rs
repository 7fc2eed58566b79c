//! Request correlation.
//!
//! Each launched interaction gets a fresh [`InteractionId`] and a slot that
//! remembers which interpretation function applies to its result. The
//! platform later reports the outcome through a [`CompletionSender`]; the
//! single [`Dispatcher`] task drains those events, normalizes the result and
//! wakes the waiting call.
//!
//! ```text
//! bridge call ──register(kind)──► RequestCorrelator ◄──resolve── Dispatcher
//!      │                                │                            ▲
//!      └──── PendingInteraction::wait ◄─┘ (oneshot)                  │
//!                                                    CompletionSender (mpsc)
//!                                                            ▲
//!                                                      host platform
//! ```
//!
//! A slot is created when the interaction is launched and removed when its
//! result is delivered, whether success or failure. Ids are never reused.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::normalizer::{self, CompletionCode, Normalized};
use crate::{BridgeError, Result};

/// Correlation id of one launched interaction.
///
/// Crosses the host boundary as its hyphenated string form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InteractionId(Uuid);

impl InteractionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for InteractionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InteractionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for InteractionId {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| BridgeError::malformed("interaction id", e.to_string()))
    }
}

/// Which interpretation function applies to an interaction's result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultKind {
    Authorize,
    PublicKey,
    Sign,
}

/// Outcome of a platform interaction: completion code plus opaque data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityResult {
    pub result_code: i32,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl ActivityResult {
    pub fn ok(data: serde_json::Value) -> Self {
        Self {
            result_code: CompletionCode::RESULT_OK,
            data: Some(data),
        }
    }

    /// The user dismissed the interaction.
    pub fn canceled() -> Self {
        Self {
            result_code: CompletionCode::RESULT_CANCELED,
            data: None,
        }
    }

    pub fn failed(result_code: i32) -> Self {
        Self {
            result_code,
            data: None,
        }
    }
}

/// Completion reported by the platform for one interaction.
#[derive(Clone, Debug, PartialEq)]
pub struct CompletionEvent {
    pub interaction_id: InteractionId,
    pub result: ActivityResult,
}

struct PendingRequest {
    kind: ResultKind,
    waiter: oneshot::Sender<Result<Normalized>>,
}

/// Maps outstanding interactions to the calls waiting on them.
#[derive(Default)]
pub struct RequestCorrelator {
    pending: Mutex<HashMap<InteractionId, PendingRequest>>,
}

impl fmt::Debug for RequestCorrelator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestCorrelator")
            .field("pending", &self.pending_count())
            .finish()
    }
}

impl RequestCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> std::sync::MutexGuard<'_, HashMap<InteractionId, PendingRequest>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Open a slot for an interaction about to be launched.
    pub fn register(&self, kind: ResultKind) -> PendingInteraction {
        let (waiter, receiver) = oneshot::channel();
        let mut slots = self.slots();
        let mut id = InteractionId::new();
        while slots.contains_key(&id) {
            id = InteractionId::new();
        }
        slots.insert(id, PendingRequest { kind, waiter });

        #[cfg(feature = "tracing")]
        tracing::debug!(interaction_id = %id, ?kind, "registered pending interaction");

        PendingInteraction { id, kind, receiver }
    }

    /// Route a completion to its slot, normalize it and wake the caller.
    ///
    /// Normalization failures are delivered to the caller as its outcome;
    /// only an unknown interaction id is an error here.
    pub fn resolve(&self, event: CompletionEvent) -> Result<()> {
        let slot = self
            .slots()
            .remove(&event.interaction_id)
            .ok_or_else(|| BridgeError::UnknownInteraction(event.interaction_id.to_string()))?;

        let outcome = normalizer::normalize(slot.kind, &event.result);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            interaction_id = %event.interaction_id,
            kind = ?slot.kind,
            result_code = event.result.result_code,
            ok = outcome.is_ok(),
            "resolved interaction"
        );

        if slot.waiter.send(outcome).is_err() {
            #[cfg(feature = "tracing")]
            tracing::warn!(interaction_id = %event.interaction_id, "caller stopped waiting");
        }
        Ok(())
    }

    /// Drop a slot whose interaction never started. Returns whether it existed.
    pub fn abandon(&self, id: &InteractionId) -> bool {
        self.slots().remove(id).is_some()
    }

    /// Drop every slot, waking all waiters with a platform error. Returns how
    /// many were dropped.
    pub fn abandon_all(&self) -> usize {
        let drained: Vec<_> = self.slots().drain().collect();
        drained.len()
    }

    pub fn is_pending(&self, id: &InteractionId) -> bool {
        self.slots().contains_key(id)
    }

    pub fn pending_count(&self) -> usize {
        self.slots().len()
    }
}

/// Handle of one launched interaction; resolves with its normalized outcome.
#[derive(Debug)]
pub struct PendingInteraction {
    id: InteractionId,
    kind: ResultKind,
    receiver: oneshot::Receiver<Result<Normalized>>,
}

impl PendingInteraction {
    pub fn id(&self) -> InteractionId {
        self.id
    }

    pub fn kind(&self) -> ResultKind {
        self.kind
    }

    /// Suspend until the platform delivers this interaction's result.
    ///
    /// No timeout: a hung interaction keeps the caller pending.
    pub async fn wait(self) -> Result<Normalized> {
        self.receiver.await.map_err(|_| {
            BridgeError::Platform(format!("interaction {} was abandoned", self.id))
        })?
    }
}

/// Platform-side handle for reporting interaction results.
#[derive(Clone, Debug)]
pub struct CompletionSender {
    tx: mpsc::UnboundedSender<CompletionEvent>,
}

impl CompletionSender {
    pub fn complete(&self, interaction_id: InteractionId, result: ActivityResult) -> Result<()> {
        self.tx
            .send(CompletionEvent {
                interaction_id,
                result,
            })
            .map_err(|_| BridgeError::Platform("completion dispatcher has stopped".into()))
    }
}

/// Single consumer of completion events.
pub struct Dispatcher {
    rx: mpsc::UnboundedReceiver<CompletionEvent>,
    correlator: Arc<RequestCorrelator>,
}

impl Dispatcher {
    /// Drain completion events until every sender is dropped.
    pub async fn run(mut self) {
        while let Some(event) = self.rx.recv().await {
            if let Err(_e) = self.correlator.resolve(event) {
                #[cfg(feature = "tracing")]
                tracing::warn!("dropping completion: {}", _e);
            }
        }
    }

    /// Run on the current tokio runtime.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }
}

/// Create the completion channel feeding `correlator`.
pub fn completion_channel(correlator: Arc<RequestCorrelator>) -> (CompletionSender, Dispatcher) {
    let (tx, rx) = mpsc::unbounded_channel();
    (CompletionSender { tx }, Dispatcher { rx, correlator })
}
