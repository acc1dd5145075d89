use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use files_server::{build_state, config::Config, create_app};
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn test_app(auth_server_url: &str, temp_dir: &TempDir, quota: i64) -> Router {
    let config = Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        upload_dir: temp_dir.path().join("files").to_string_lossy().into_owned(),
        session_file: temp_dir
            .path()
            .join("data/user.json")
            .to_string_lossy()
            .into_owned(),
        auth_server_url: auth_server_url.to_string(),
        auth_app_id: "app".to_string(),
        auth_app_secret: "secret".to_string(),
        auth_redirect_uri: "http://localhost:8080/auth/callback".to_string(),
        default_quota_bytes: quota,
    };
    create_app(build_state(config).await)
}

async fn mount_provider_user(server: &MockServer, code: &str, user_id: &str, nickname: &str) {
    Mock::given(method("GET"))
        .and(path("/auth/app/user"))
        .and(query_param("user_code", code))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "user_id": user_id,
            "nickname": nickname
        })))
        .mount(server)
        .await;
}

async fn login(app: &Router, code: &str) -> serde_json::Value {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/auth/callback?code={}", code))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

fn multipart_upload_request(token: &str, filename: &str, data: &[u8]) -> Request<Body> {
    let boundary = "test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n",
            boundary, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/user/upload")
        .header("authorization", format!("Bearer {}", token))
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap()
}

fn authed_get(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let temp_dir = TempDir::new().unwrap();
    let app = test_app("http://127.0.0.1:1", &temp_dir, 1000).await;

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_routes_require_token() {
    let temp_dir = TempDir::new().unwrap();
    let app = test_app("http://127.0.0.1:1", &temp_dir, 1000).await;

    for uri in ["/user/info", "/user/storage", "/user/files", "/auth/user"] {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
    }

    // An unknown token is just as unauthorized as a missing one.
    let response = app
        .oneshot(authed_get("/user/files", "bogus"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_callback_failure_is_generic_denial() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/app/user"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let app = test_app(&server.uri(), &temp_dir, 1000).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/auth/callback?code=abc")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_upload_list_storage_download_delete_flow() {
    let server = MockServer::start().await;
    mount_provider_user(&server, "abc", "u1", "Alice").await;

    let temp_dir = TempDir::new().unwrap();
    let app = test_app(&server.uri(), &temp_dir, 524_288_000).await;

    let user = login(&app, "abc").await;
    assert_eq!(user["userId"], "u1");
    assert_eq!(user["username"], "Alice");
    assert_eq!(user["usedStorage"], 0);
    assert_eq!(user["storageLimit"], 524_288_000i64);
    let token = user["accessToken"].as_str().unwrap().to_string();

    // Fresh user: no files, zero usage.
    let response = app.clone().oneshot(authed_get("/user/files", &token)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let files: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(files.as_array().unwrap().len(), 0);

    // Upload into a nested path.
    let response = app
        .clone()
        .oneshot(multipart_upload_request(&token, "hello.txt", b"hello world"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app.clone().oneshot(authed_get("/user/files", &token)).await.unwrap();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let files: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(files[0]["name"], "hello.txt");
    assert_eq!(files[0]["relative_path"], "hello.txt");
    assert_eq!(files[0]["size_bytes"], 11);

    // Walk-based storage summary sees the upload.
    let response = app.clone().oneshot(authed_get("/user/storage", &token)).await.unwrap();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let summary: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(summary["used"], 11);
    assert_eq!(summary["limit"], 524_288_000i64);
    assert_eq!(summary["used_formatted"], "11.0 Bytes");

    let response = app
        .clone()
        .oneshot(authed_get("/user/exists?path=hello.txt", &token))
        .await
        .unwrap();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"true");

    // Download round trip.
    let response = app
        .clone()
        .oneshot(authed_get("/user/download/hello.txt", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-disposition"],
        "attachment; filename=\"hello.txt\""
    );
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"hello world");

    // Delete, then the listing is empty again.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/user/delete/hello.txt")
                .header("authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.clone().oneshot(authed_get("/user/files", &token)).await.unwrap();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let files: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(files.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_upload_rejected_when_over_quota() {
    let server = MockServer::start().await;
    mount_provider_user(&server, "abc", "u1", "Alice").await;

    let temp_dir = TempDir::new().unwrap();
    let app = test_app(&server.uri(), &temp_dir, 10).await;

    let user = login(&app, "abc").await;
    let token = user["accessToken"].as_str().unwrap().to_string();

    // 10-byte quota: the first upload fills it exactly, the second is denied.
    let response = app
        .clone()
        .oneshot(multipart_upload_request(&token, "exact.txt", b"0123456789"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(multipart_upload_request(&token, "extra.txt", b"x"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    // Only the admitted file exists.
    let response = app.clone().oneshot(authed_get("/user/files", &token)).await.unwrap();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let files: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(files.as_array().unwrap().len(), 1);
    assert_eq!(files[0]["name"], "exact.txt");
}

#[tokio::test]
async fn test_multi_megabyte_upload_under_quota_is_admitted() {
    let server = MockServer::start().await;
    mount_provider_user(&server, "abc", "u1", "Alice").await;

    let temp_dir = TempDir::new().unwrap();
    let app = test_app(&server.uri(), &temp_dir, 10 * 1024 * 1024).await;

    let user = login(&app, "abc").await;
    let token = user["accessToken"].as_str().unwrap().to_string();

    // Well under the 10 MiB quota but above axum's default 2 MB body cap;
    // the router's body limit is sized from config so only the quota decides.
    let data = vec![0u8; 3 * 1024 * 1024];
    let response = app
        .clone()
        .oneshot(multipart_upload_request(&token, "big.bin", &data))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app.clone().oneshot(authed_get("/user/files", &token)).await.unwrap();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let files: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(files[0]["name"], "big.bin");
    assert_eq!(files[0]["size_bytes"], 3 * 1024 * 1024);
}

#[tokio::test]
async fn test_traversal_paths_rejected() {
    let server = MockServer::start().await;
    mount_provider_user(&server, "abc", "u1", "Alice").await;

    let temp_dir = TempDir::new().unwrap();
    let app = test_app(&server.uri(), &temp_dir, 1000).await;

    let user = login(&app, "abc").await;
    let token = user["accessToken"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(authed_get("/user/download/..%2F..%2Fuser.json", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(authed_get("/user/exists?path=..%2Fescape.txt", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_sessions_survive_restart() {
    let server = MockServer::start().await;
    mount_provider_user(&server, "abc", "u1", "Alice").await;

    let temp_dir = TempDir::new().unwrap();
    let app = test_app(&server.uri(), &temp_dir, 1000).await;
    login(&app, "abc").await;
    drop(app);

    // A second app over the same session file picks the login back up.
    let app = test_app(&server.uri(), &temp_dir, 1000).await;
    let response = app.oneshot(authed_get("/auth/user", "abc")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
