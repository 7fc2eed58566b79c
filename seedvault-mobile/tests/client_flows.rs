//! Client Flow Tests
//!
//! Drives `SeedVaultClient` the way a host app does: bridge calls run on a
//! worker thread while the "UI thread" (the test) answers launched
//! interactions and permission dialogs through the client's callbacks.

use seedvault_mobile::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// Fake Host
// ============================================================================

enum HostEvent {
    Launch {
        interaction_id: String,
        request: InteractionRequestFFI,
    },
    PermissionRequest {
        request_id: String,
        permissions: Vec<String>,
    },
}

/// Host that forwards every launch and permission dialog to the test.
struct FakeHost {
    events: Mutex<Sender<HostEvent>>,
    permission: Arc<Mutex<PermissionStateFFI>>,
    fail_launch: AtomicBool,
    seeds: Vec<SeedRowFFI>,
}

impl FakeHost {
    fn new(permission: PermissionStateFFI) -> (Self, Receiver<HostEvent>, Arc<Mutex<PermissionStateFFI>>) {
        let (tx, rx) = mpsc::channel();
        let permission = Arc::new(Mutex::new(permission));
        let host = Self {
            events: Mutex::new(tx),
            permission: permission.clone(),
            fail_launch: AtomicBool::new(false),
            seeds: vec![
                SeedRowFFI {
                    auth_token: 7,
                    purpose: 0,
                    seed_name: Some("Main".to_string()),
                },
                SeedRowFFI {
                    auth_token: 9,
                    purpose: 0,
                    seed_name: None,
                },
            ],
        };
        (host, rx, permission)
    }

    fn send(&self, event: HostEvent) {
        self.events.lock().unwrap().send(event).unwrap();
    }
}

impl SeedVaultPlatformFFI for FakeHost {
    fn permission_state(&self, _permission: String) -> PermissionStateFFI {
        *self.permission.lock().unwrap()
    }

    fn request_permissions(
        &self,
        request_id: String,
        _alias: String,
        permissions: Vec<String>,
    ) -> Result<()> {
        self.send(HostEvent::PermissionRequest {
            request_id,
            permissions,
        });
        Ok(())
    }

    fn has_unauthorized_seeds_for_purpose(&self, _purpose: i32) -> Result<bool> {
        Ok(true)
    }

    fn launch(&self, interaction_id: String, request: InteractionRequestFFI) -> Result<()> {
        if self.fail_launch.load(Ordering::SeqCst) {
            return Err(SeedVaultMobileError::Platform {
                msg: "activity not found".to_string(),
            });
        }
        self.send(HostEvent::Launch {
            interaction_id,
            request,
        });
        Ok(())
    }

    fn deauthorize_seed(&self, auth_token: i64) -> Result<()> {
        if auth_token == 9 {
            return Err(SeedVaultMobileError::Platform {
                msg: "token unknown".to_string(),
            });
        }
        Ok(())
    }

    fn authorized_seeds(&self) -> Result<Vec<SeedRowFFI>> {
        Ok(self.seeds.clone())
    }
}

struct Harness {
    client: Arc<SeedVaultClient>,
    events: Receiver<HostEvent>,
    permission: Arc<Mutex<PermissionStateFFI>>,
}

impl Harness {
    fn new() -> Self {
        Self::with_permission(PermissionStateFFI::Granted)
    }

    fn with_permission(state: PermissionStateFFI) -> Self {
        let (host, events, permission) = FakeHost::new(state);
        let client = SeedVaultClient::new(Box::new(host)).unwrap();
        Self {
            client,
            events,
            permission,
        }
    }

    fn next_launch(&self) -> (String, InteractionRequestFFI) {
        match self.events.recv_timeout(TIMEOUT).unwrap() {
            HostEvent::Launch {
                interaction_id,
                request,
            } => (interaction_id, request),
            HostEvent::PermissionRequest { .. } => panic!("expected a launch"),
        }
    }

    fn next_permission_request(&self) -> (String, Vec<String>) {
        match self.events.recv_timeout(TIMEOUT).unwrap() {
            HostEvent::PermissionRequest {
                request_id,
                permissions,
            } => (request_id, permissions),
            HostEvent::Launch { .. } => panic!("expected a permission request"),
        }
    }

    /// Run `f` on a worker thread, as a host would for a blocking call.
    fn in_background<T, F>(&self, f: F) -> thread::JoinHandle<T>
    where
        T: Send + 'static,
        F: FnOnce(Arc<SeedVaultClient>) -> T + Send + 'static,
    {
        let client = self.client.clone();
        thread::spawn(move || f(client))
    }
}

struct ChannelCallback(Mutex<Sender<std::result::Result<String, ErrorPayloadFFI>>>);

impl BridgeCallCallback for ChannelCallback {
    fn on_success(&self, data_json: String) {
        let _ = self.0.lock().unwrap().send(Ok(data_json));
    }

    fn on_error(&self, error: ErrorPayloadFFI) {
        let _ = self.0.lock().unwrap().send(Err(error));
    }
}

// ============================================================================
// Typed Calls
// ============================================================================

#[test]
fn test_authorize_then_sign() {
    let h = Harness::new();

    let call = h.in_background(|client| client.authorize_seed());
    let (id, request) = h.next_launch();
    assert_eq!(request, InteractionRequestFFI::AuthorizeSeed { purpose: 0 });
    h.client
        .on_activity_result(id, -1, Some(r#"{"authToken": 7}"#.to_string()))
        .unwrap();
    assert_eq!(call.join().unwrap().unwrap(), Some(7));

    let call = h.in_background(|client| client.sign_bytes(7, vec![1, 2, 3]));
    let (id, request) = h.next_launch();
    assert_eq!(
        request,
        InteractionRequestFFI::SignMessage {
            auth_token: 7,
            derivation_path: h.client.signing_path(),
            message: vec![1, 2, 3],
        }
    );
    h.client
        .on_activity_result(
            id,
            -1,
            Some(r#"{"signingResponses": [{"signatures": [[-102, 0, 127]]}]}"#.to_string()),
        )
        .unwrap();
    assert_eq!(call.join().unwrap().unwrap(), vec![154, 0, 127]);
    assert_eq!(h.client.pending_interactions(), 0);
}

#[test]
fn test_get_pubkey_invalid_key() {
    let h = Harness::new();

    let call = h.in_background(|client| client.get_pubkey(7));
    let (id, request) = h.next_launch();
    assert!(matches!(
        request,
        InteractionRequestFFI::RequestPublicKey { auth_token: 7, .. }
    ));
    h.client
        .on_activity_result(
            id,
            -1,
            Some(r#"{"publicKeys": [{"publicKey": null, "invalidReason": "bad path"}]}"#.to_string()),
        )
        .unwrap();

    match call.join().unwrap() {
        Err(SeedVaultMobileError::KeyNotValid { msg }) => assert!(msg.contains("bad path")),
        other => panic!("expected KeyNotValid, got {:?}", other),
    }
}

#[test]
fn test_cancelled_sign() {
    let h = Harness::new();

    let call = h.in_background(|client| client.sign_bytes(7, vec![9]));
    let (id, _) = h.next_launch();
    h.client.on_activity_result(id, 0, None).unwrap();

    assert!(matches!(
        call.join().unwrap(),
        Err(SeedVaultMobileError::SignFailed { .. })
    ));
}

#[test]
fn test_launch_failure_leaves_nothing_pending() {
    let (host, _events, _) = FakeHost::new(PermissionStateFFI::Granted);
    host.fail_launch.store(true, Ordering::SeqCst);
    let client = SeedVaultClient::new(Box::new(host)).unwrap();

    match client.authorize_seed() {
        Err(SeedVaultMobileError::AuthorizationFailed { msg }) => {
            assert!(msg.contains("activity not found"))
        }
        other => panic!("expected AuthorizationFailed, got {:?}", other),
    }
    assert_eq!(client.pending_interactions(), 0);
}

#[test]
fn test_seeds_and_deauthorize() {
    let h = Harness::new();

    let seeds = h.client.get_authorized_seeds().unwrap();
    assert_eq!(seeds.len(), 2);
    assert_eq!(seeds[0].auth_token, 7);
    assert_eq!(seeds[0].name.as_deref(), Some("Main"));
    assert_eq!(seeds[1].name, None);

    h.client.deauthorize_seed(7).unwrap();
    assert!(matches!(
        h.client.deauthorize_seed(9),
        Err(SeedVaultMobileError::DeauthFailed { .. })
    ));
}

// ============================================================================
// Permissions
// ============================================================================

#[test]
fn test_permission_prompt_granted() {
    let h = Harness::with_permission(PermissionStateFFI::Prompt);

    let call = h.in_background(|client| client.assert_permissions());
    let (request_id, permissions) = h.next_permission_request();
    assert_eq!(
        permissions,
        vec!["com.solanamobile.seedvault.ACCESS_SEED_VAULT".to_string()]
    );

    *h.permission.lock().unwrap() = PermissionStateFFI::Granted;
    h.client.on_permission_result(request_id).unwrap();
    call.join().unwrap().unwrap();

    // Granted now: no second dialog.
    h.client.assert_permissions().unwrap();
    assert!(h.events.try_recv().is_err());
}

#[test]
fn test_permission_prompt_refused() {
    let h = Harness::with_permission(PermissionStateFFI::Prompt);

    let call = h.in_background(|client| {
        client.call_blocking("assertPermissions".to_string(), String::new())
    });
    let (request_id, _) = h.next_permission_request();
    *h.permission.lock().unwrap() = PermissionStateFFI::Denied;
    h.client.on_permission_result(request_id.clone()).unwrap();

    assert!(matches!(
        call.join().unwrap(),
        Err(SeedVaultMobileError::PermissionDenied { .. })
    ));
    // Answered requests cannot be answered twice.
    assert!(matches!(
        h.client.on_permission_result(request_id),
        Err(SeedVaultMobileError::Platform { .. })
    ));
}

// ============================================================================
// Named Calls
// ============================================================================

#[test]
fn test_callback_call_delivers_reply_data() {
    let h = Harness::new();
    let (tx, rx) = mpsc::channel();

    let handle = h.client.call(
        "getPubkey".to_string(),
        r#"{"authToken": 7}"#.to_string(),
        Box::new(ChannelCallback(Mutex::new(tx))),
    );
    let (id, _) = h.next_launch();
    h.client
        .on_activity_result(id, -1, Some(r#"{"publicKeys": [{"publicKey": [1, -1]}]}"#.to_string()))
        .unwrap();

    let data = rx.recv_timeout(TIMEOUT).unwrap().unwrap();
    let data: serde_json::Value = serde_json::from_str(&data).unwrap();
    assert_eq!(data, serde_json::json!({"pubkey": [1, 255]}));
    assert!(!handle.is_cancelled());
}

#[test]
fn test_callback_call_reports_error_payload() {
    let h = Harness::new();
    let (tx, rx) = mpsc::channel();

    h.client.call(
        "signBytes".to_string(),
        r#"{"authToken": 7, "bytes": [256]}"#.to_string(),
        Box::new(ChannelCallback(Mutex::new(tx))),
    );

    let error = rx.recv_timeout(TIMEOUT).unwrap().unwrap_err();
    assert_eq!(error.kind, "MalformedInput");
    assert_eq!(error.code, 7000);
    // Rejected before anything was launched.
    assert!(h.events.try_recv().is_err());
}

#[test]
fn test_cancelled_call_never_reports() {
    let h = Harness::new();
    let (tx, rx) = mpsc::channel();

    let handle = h.client.call(
        "signBytes".to_string(),
        r#"{"authToken": 7, "bytes": [1]}"#.to_string(),
        Box::new(ChannelCallback(Mutex::new(tx))),
    );
    let (id, _) = h.next_launch();
    handle.cancel();
    assert!(handle.is_cancelled());

    // The late result is accepted and discarded.
    h.client
        .on_activity_result(id, -1, Some(r#"{"signingResponses": [{"signatures": [[1]]}]}"#.to_string()))
        .unwrap();
    assert!(rx.recv_timeout(Duration::from_millis(500)).is_err());
}

#[test]
fn test_dropped_call_handle_still_delivers() {
    let h = Harness::new();
    let (tx, rx) = mpsc::channel();

    drop(h.client.call(
        "signBytes".to_string(),
        r#"{"authToken": 7, "bytes": [1]}"#.to_string(),
        Box::new(ChannelCallback(Mutex::new(tx))),
    ));
    let (id, _) = h.next_launch();
    h.client
        .on_activity_result(id, -1, Some(r#"{"signingResponses": [{"signatures": [[1]]}]}"#.to_string()))
        .unwrap();

    let data = rx.recv_timeout(TIMEOUT).unwrap().unwrap();
    let data: serde_json::Value = serde_json::from_str(&data).unwrap();
    assert_eq!(data, serde_json::json!({"signed": [1]}));
}

#[test]
fn test_unknown_method_and_bad_args() {
    let h = Harness::new();

    assert!(matches!(
        h.client.call_blocking("exportSeed".to_string(), "{}".to_string()),
        Err(SeedVaultMobileError::Validation { .. })
    ));
    assert!(matches!(
        h.client.call_blocking("getPubkey".to_string(), "not json".to_string()),
        Err(SeedVaultMobileError::Validation { .. })
    ));
    assert!(matches!(
        h.client.call_blocking("getPubkey".to_string(), r#"{"authToken": 1.5}"#.to_string()),
        Err(SeedVaultMobileError::Validation { .. })
    ));

    let data = h
        .client
        .call_blocking("getAuthorizedSeeds".to_string(), String::new())
        .unwrap();
    let data: serde_json::Value = serde_json::from_str(&data).unwrap();
    assert_eq!(data["seeds"][0]["authToken"], 7);
}

// ============================================================================
// Host Callbacks
// ============================================================================

#[test]
fn test_activity_result_validation() {
    let h = Harness::new();

    assert!(matches!(
        h.client.on_activity_result("not-an-id".to_string(), -1, None),
        Err(SeedVaultMobileError::Validation { .. })
    ));

    let call = h.in_background(|client| client.authorize_seed());
    let (id, _) = h.next_launch();
    assert!(matches!(
        h.client.on_activity_result(id.clone(), -1, Some("{".to_string())),
        Err(SeedVaultMobileError::Validation { .. })
    ));
    // The interaction is still pending after the rejected delivery.
    assert_eq!(h.client.pending_interactions(), 1);
    h.client
        .on_activity_result(id, -1, Some(r#"{"authToken": 3}"#.to_string()))
        .unwrap();
    assert_eq!(call.join().unwrap().unwrap(), Some(3));
}

#[test]
fn test_custom_config() {
    let (host, _events, _) = FakeHost::new(PermissionStateFFI::Granted);
    let err = SeedVaultClient::with_config_json(Box::new(host), r#"{"methods": 5}"#.to_string());
    assert!(matches!(err, Err(SeedVaultMobileError::Config { .. })));
    assert_eq!(get_version(), env!("CARGO_PKG_VERSION"));
}
