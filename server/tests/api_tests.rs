use cdkgate_server::{
    build_admin_router, build_router, AppState, CheckDeviceResponse, DeleteUsedResponse,
    GenerateResponse, ListResponse, VerifyResponse,
};
use cdkgate_store::MemoryStore;
use std::path::PathBuf;
use std::sync::Arc;

struct TestServer {
    public: String,
    admin: String,
    _assets: tempfile::TempDir,
    assets_dir: PathBuf,
}

/// Spins up both routers on OS-assigned ports against a fresh in-memory
/// store and an empty assets directory.
async fn spawn_test_server() -> TestServer {
    let assets = tempfile::tempdir().unwrap();
    let state = AppState {
        store: Arc::new(MemoryStore::new()),
        assets_dir: assets.path().to_path_buf(),
    };

    let public_app = build_router(state.clone());
    let public_listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let public_port = public_listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(public_listener, public_app).await.unwrap();
    });

    let admin_app = build_admin_router(state);
    let admin_listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let admin_port = admin_listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(admin_listener, admin_app).await.unwrap();
    });

    let assets_dir = assets.path().to_path_buf();
    TestServer {
        public: format!("http://127.0.0.1:{public_port}"),
        admin: format!("http://127.0.0.1:{admin_port}"),
        _assets: assets,
        assets_dir,
    }
}

async fn generate_one(srv: &TestServer) -> String {
    let resp: GenerateResponse = reqwest::Client::new()
        .post(format!("{}/api/generate_cdk", srv.admin))
        .json(&serde_json::json!({"count": 1}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    resp.cdks.into_iter().next().unwrap()
}

async fn verify(srv: &TestServer, cdk: &str, device: &str) -> (u16, VerifyResponse) {
    let resp = reqwest::Client::new()
        .post(format!("{}/api/verify_cdk", srv.public))
        .json(&serde_json::json!({"cdk": cdk, "device_id": device}))
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

// ── Verification flow ─────────────────────────────────────────────

#[tokio::test]
async fn first_bind_then_idempotent_reverify() {
    let srv = spawn_test_server().await;
    let code = generate_one(&srv).await;

    let (status, body) = verify(&srv, &code, "device-1").await;
    assert_eq!(status, 200);
    assert_eq!(body.status, "success");
    assert_eq!(body.download_url.as_deref(), Some("/api/download_file"));

    let (status, body) = verify(&srv, &code, "device-1").await;
    assert_eq!(status, 200);
    assert_eq!(body.status, "success");
    assert_eq!(serde_json::to_value(body.reason).unwrap(), "already_bound_to_this_device");
}

#[tokio::test]
async fn second_device_gets_conflict() {
    let srv = spawn_test_server().await;
    let code = generate_one(&srv).await;

    verify(&srv, &code, "device-1").await;
    let (status, body) = verify(&srv, &code, "device-2").await;
    assert_eq!(status, 409);
    assert_eq!(body.status, "error");
    assert!(body.download_url.is_none());
}

#[tokio::test]
async fn unknown_code_is_404() {
    let srv = spawn_test_server().await;
    let (status, body) = verify(&srv, "DOESNOTEXIST0000", "device-1").await;
    assert_eq!(status, 404);
    assert_eq!(body.status, "error");
}

#[tokio::test]
async fn empty_inputs_are_400() {
    let srv = spawn_test_server().await;
    let resp = reqwest::Client::new()
        .post(format!("{}/api/verify_cdk", srv.public))
        .json(&serde_json::json!({"cdk": "", "device_id": "d"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn code_entry_is_case_insensitive_over_http() {
    let srv = spawn_test_server().await;
    let code = generate_one(&srv).await;

    let (status, _) = verify(&srv, &code.to_lowercase(), "device-1").await;
    assert_eq!(status, 200);
}

// ── Device check ──────────────────────────────────────────────────

#[tokio::test]
async fn check_device_tracks_binding() {
    let srv = spawn_test_server().await;
    let code = generate_one(&srv).await;
    let client = reqwest::Client::new();

    let before: CheckDeviceResponse = client
        .post(format!("{}/api/check_device", srv.public))
        .json(&serde_json::json!({"device_id": "device-1"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(!before.authorized);

    verify(&srv, &code, "device-1").await;

    let after: CheckDeviceResponse = client
        .post(format!("{}/api/check_device", srv.public))
        .json(&serde_json::json!({"device_id": "device-1"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(after.authorized);
}

// ── Gated download ────────────────────────────────────────────────

#[tokio::test]
async fn download_without_device_header_is_400() {
    let srv = spawn_test_server().await;
    let resp = reqwest::get(format!("{}/api/download_file", srv.public))
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn unauthorized_download_is_403_even_with_asset() {
    let srv = spawn_test_server().await;
    std::fs::write(srv.assets_dir.join("release.zip"), b"payload").unwrap();

    let resp = reqwest::Client::new()
        .get(format!("{}/api/download_file", srv.public))
        .header("Device-ID", "device-1")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
}

#[tokio::test]
async fn authorized_download_streams_the_asset() {
    let srv = spawn_test_server().await;
    let code = generate_one(&srv).await;
    verify(&srv, &code, "device-1").await;
    std::fs::write(srv.assets_dir.join("release.zip"), b"payload").unwrap();

    let resp = reqwest::Client::new()
        .get(format!("{}/api/download_file", srv.public))
        .header("Device-ID", "device-1")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let disposition = resp
        .headers()
        .get("content-disposition")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains("release.zip"));
    let length = resp
        .headers()
        .get("content-length")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert_eq!(length, "7");
    assert_eq!(resp.bytes().await.unwrap().as_ref(), b"payload");
}

#[tokio::test]
async fn asset_filename_is_sanitized_in_disposition() {
    let srv = spawn_test_server().await;
    let code = generate_one(&srv).await;
    verify(&srv, &code, "device-1").await;
    // A quote in the staged filename must not break out of the quoted
    // content-disposition value.
    std::fs::write(srv.assets_dir.join("re\"lease.zip"), b"x").unwrap();

    let resp = reqwest::Client::new()
        .get(format!("{}/api/download_file", srv.public))
        .header("Device-ID", "device-1")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let disposition = resp
        .headers()
        .get("content-disposition")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains("re_lease.zip"));
    assert_eq!(disposition.matches('"').count(), 2);
}

#[tokio::test]
async fn authorized_download_with_nothing_staged_is_404() {
    let srv = spawn_test_server().await;
    let code = generate_one(&srv).await;
    verify(&srv, &code, "device-1").await;

    let resp = reqwest::Client::new()
        .get(format!("{}/api/download_file", srv.public))
        .header("Device-ID", "device-1")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

// ── Admin surface ─────────────────────────────────────────────────

#[tokio::test]
async fn generate_validates_count() {
    let srv = spawn_test_server().await;
    let client = reqwest::Client::new();

    for bad in [0, 1001] {
        let resp = client
            .post(format!("{}/api/generate_cdk", srv.admin))
            .json(&serde_json::json!({"count": bad}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400, "count {bad}");
    }
}

#[tokio::test]
async fn list_and_cleanup_roundtrip() {
    let srv = spawn_test_server().await;
    let client = reqwest::Client::new();

    let r#gen: GenerateResponse = client
        .post(format!("{}/api/generate_cdk", srv.admin))
        .json(&serde_json::json!({"count": 3}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(r#gen.cdks.len(), 3);

    verify(&srv, &r#gen.cdks[0], "device-1").await;

    let listed: ListResponse = client
        .get(format!("{}/api/list_cdks", srv.admin))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.total, 3);
    assert_eq!(listed.used, 1);
    assert_eq!(listed.cdks.len(), 3);

    let cleaned: DeleteUsedResponse = client
        .post(format!("{}/api/delete_used", srv.admin))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(cleaned.deleted, 1);

    let listed: ListResponse = client
        .get(format!("{}/api/list_cdks", srv.admin))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.total, 2);
    assert_eq!(listed.used, 0);
}

#[tokio::test]
async fn admin_routes_absent_from_public_router() {
    let srv = spawn_test_server().await;
    let resp = reqwest::Client::new()
        .post(format!("{}/api/generate_cdk", srv.public))
        .json(&serde_json::json!({"count": 1}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}
