//! Async Bridge for Mobile Platforms
//!
//! Bridge calls suspend until the user finishes an interaction, which can
//! take as long as the user likes. Hosts that cannot await Rust futures use
//! the callback form: the call runs on the client's runtime and its outcome
//! is delivered to a [`BridgeCallCallback`].
//!
//! # Example (Callback Style)
//!
//! ```ignore
//! // From Swift
//! let handle = client.call(method: "signBytes", argsJson: args, callback: MyCallback())
//! // later, if the screen goes away:
//! handle.cancel()
//! ```

use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;

use crate::{ErrorPayloadFFI, SeedVaultMobileError};

/// Result callback for a spawned operation.
pub trait ResultCallback<T, E>: Send + Sync {
    fn on_success(&self, value: T);
    fn on_error(&self, error: E);
}

/// Receives the outcome of one `SeedVaultClient::call`.
#[uniffi::export(callback_interface)]
pub trait BridgeCallCallback: Send + Sync {
    /// `data_json` is the reply data, e.g. `{"signed":[...]}`.
    fn on_success(&self, data_json: String);
    fn on_error(&self, error: ErrorPayloadFFI);
}

impl ResultCallback<String, ErrorPayloadFFI> for Box<dyn BridgeCallCallback> {
    fn on_success(&self, value: String) {
        BridgeCallCallback::on_success(self.as_ref(), value);
    }

    fn on_error(&self, error: ErrorPayloadFFI) {
        BridgeCallCallback::on_error(self.as_ref(), error);
    }
}

/// Async operation handle.
///
/// Cancelling stops waiting; an interaction already on screen stays there
/// and its late result is discarded.
pub struct AsyncHandle {
    cancel_tx: Option<oneshot::Sender<()>>,
}

impl AsyncHandle {
    pub fn new(cancel_tx: oneshot::Sender<()>) -> Self {
        Self {
            cancel_tx: Some(cancel_tx),
        }
    }

    pub fn cancel(&mut self) {
        if let Some(tx) = self.cancel_tx.take() {
            let _ = tx.send(());
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_tx.is_none()
    }
}

/// FFI handle returned by `SeedVaultClient::call`.
#[derive(uniffi::Object)]
pub struct CallHandle {
    inner: Mutex<AsyncHandle>,
}

impl CallHandle {
    pub(crate) fn new(handle: AsyncHandle) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(handle),
        })
    }

    fn handle(&self) -> std::sync::MutexGuard<'_, AsyncHandle> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[uniffi::export]
impl CallHandle {
    /// Stop waiting for the call. No callback fires afterwards.
    pub fn cancel(&self) {
        self.handle().cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.handle().is_cancelled()
    }
}

/// Async runtime wrapper for mobile.
///
/// Owns the Tokio runtime the bridge and its completion dispatcher run on.
pub struct AsyncRuntime {
    runtime: tokio::runtime::Runtime,
}

impl AsyncRuntime {
    pub fn new() -> Result<Self, SeedVaultMobileError> {
        tokio::runtime::Runtime::new()
            .map(|runtime| Self { runtime })
            .map_err(|e| SeedVaultMobileError::Internal {
                msg: format!("Failed to create runtime: {}", e),
            })
    }

    /// Run a future to completion on the calling thread.
    ///
    /// # Panics
    ///
    /// Panics if called from within a Tokio runtime context. Call it from
    /// host threads only (main thread, GCD queues, executor threads).
    pub fn block_on<F, T>(&self, future: F) -> T
    where
        F: std::future::Future<Output = T>,
    {
        self.runtime.block_on(future)
    }

    /// Spawn `future` and report its outcome to `callback` unless cancelled.
    ///
    /// Only [`AsyncHandle::cancel`] cancels. Dropping the handle leaves the
    /// call running and the callback still fires.
    pub fn spawn_with_callback<F, T, E, C>(&self, future: F, callback: C) -> AsyncHandle
    where
        F: std::future::Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
        C: ResultCallback<T, E> + 'static,
    {
        let (cancel_tx, cancel_rx) = oneshot::channel();

        self.runtime.spawn(async move {
            tokio::select! {
                Ok(()) = cancel_rx => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!("call cancelled by host");
                }
                result = future => {
                    match result {
                        Ok(value) => callback.on_success(value),
                        Err(error) => callback.on_error(error),
                    }
                }
            }
        });

        AsyncHandle::new(cancel_tx)
    }
}
