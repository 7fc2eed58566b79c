//! Mock permission platform.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::service::{PermissionPlatform, PermissionState};
use crate::Result;

/// Permission platform whose grant dialog always gives the same answer.
pub struct MockPermissions {
    state: RwLock<PermissionState>,
    answer: PermissionState,
    prompts: AtomicUsize,
    requested: RwLock<Vec<String>>,
}

impl MockPermissions {
    /// Already granted; the dialog is never needed.
    pub fn granted() -> Self {
        Self::with_state(PermissionState::Granted, PermissionState::Granted)
    }

    /// Not decided yet; the dialog answers with `answer`.
    pub fn prompt_then(answer: PermissionState) -> Self {
        Self::with_state(PermissionState::Prompt, answer)
    }

    /// Denied before and after the dialog.
    pub fn denied() -> Self {
        Self::with_state(PermissionState::Denied, PermissionState::Denied)
    }

    pub fn with_state(state: PermissionState, answer: PermissionState) -> Self {
        Self {
            state: RwLock::new(state),
            answer,
            prompts: AtomicUsize::new(0),
            requested: RwLock::new(Vec::new()),
        }
    }

    /// Number of times the grant dialog was shown.
    pub fn prompt_count(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }

    /// Every platform permission string requested so far.
    pub fn requested(&self) -> Vec<String> {
        self.requested.read().unwrap().clone()
    }

    /// Change the grant state behind the bridge's back (e.g. revoked in settings).
    pub fn set_state(&self, state: PermissionState) {
        *self.state.write().unwrap() = state;
    }
}

#[async_trait]
impl PermissionPlatform for MockPermissions {
    fn permission_state(&self, _permission: &str) -> PermissionState {
        *self.state.read().unwrap()
    }

    async fn request_permissions(&self, _alias: &str, permissions: &[String]) -> Result<()> {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        self.requested
            .write()
            .unwrap()
            .extend(permissions.iter().cloned());
        *self.state.write().unwrap() = self.answer;
        Ok(())
    }
}
