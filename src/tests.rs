//! Integration tests against a mock Slack Web API.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::api::{SlackApi, SlackClient};
use crate::cache::Snapshot;
use crate::config::Config;
use crate::emoji::EmojiImage;
use crate::errors::AppError;
use crate::models::Presence;
use crate::refresh::RefreshOutcome;
use crate::session::Session;

const TOKEN: &str = "T1";

type Params = Query<HashMap<String, String>>;

/// Scripted Slack workspace with two users and one live channel.
#[derive(Default)]
struct MockSlack {
    base_url: Mutex<String>,
    fail_presence_for: Mutex<Option<String>>,
    reject_set_presence: AtomicBool,
    set_presence_values: Mutex<Vec<String>>,
    set_status_requests: Mutex<Vec<RecordedPost>>,
    image_fetches: AtomicUsize,
}

#[derive(Debug, Clone)]
struct RecordedPost {
    authorization: Option<String>,
    content_type: Option<String>,
    body: Value,
}

fn header_value(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

fn authorized(headers: &HeaderMap) -> bool {
    header_value(headers, header::AUTHORIZATION).as_deref() == Some("Bearer T1")
}

fn slack_error(error: &str) -> Json<Value> {
    Json(json!({ "ok": false, "error": error }))
}

async fn auth_test(headers: HeaderMap) -> Json<Value> {
    if !authorized(&headers) {
        return slack_error("invalid_auth");
    }
    Json(json!({
        "ok": true,
        "url": "https://acme.slack.com/",
        "team": "Acme",
        "user": "alice",
        "team_id": "TEAM1",
        "user_id": "U1"
    }))
}

async fn channels_list(headers: HeaderMap, Query(params): Params) -> Json<Value> {
    if !authorized(&headers) {
        return slack_error("invalid_auth");
    }
    assert_eq!(params.get("exclude_archived").map(String::as_str), Some("1"));
    Json(json!({
        "ok": true,
        "channels": [
            {
                "id": "C1",
                "name": "general",
                "members": ["U1"],
                "topic": {"value": "Company-wide", "creator": "U1"},
                "purpose": {"value": "Everything"}
            },
            {"id": "C9", "name": "graveyard", "members": [], "is_archived": true}
        ]
    }))
}

async fn users_list(headers: HeaderMap) -> Json<Value> {
    if !authorized(&headers) {
        return slack_error("invalid_auth");
    }
    Json(json!({
        "ok": true,
        "members": [
            {
                "id": "U1",
                "name": "alice",
                "deleted": false,
                "profile": {"real_name": "Alice A", "email": "alice@example.com", "status_text": "", "status_emoji": ""}
            },
            {
                "id": "U2",
                "name": "bob",
                "profile": {"real_name": "Bob B", "email": "bob@example.com", "status_text": "lunch", "status_emoji": ":taco:"}
            },
            {"id": "USLACKBOT", "name": "slackbot", "profile": {"real_name": "Slackbot"}}
        ]
    }))
}

async fn get_presence(
    State(mock): State<Arc<MockSlack>>,
    headers: HeaderMap,
    Query(params): Params,
) -> Json<Value> {
    if !authorized(&headers) {
        return slack_error("invalid_auth");
    }
    let user = params.get("user").cloned().unwrap_or_default();
    if mock.fail_presence_for.lock().unwrap().as_deref() == Some(user.as_str()) {
        return slack_error("user_not_found");
    }
    let presence = if user == "U1" { "active" } else { "away" };
    Json(json!({ "ok": true, "presence": presence }))
}

async fn set_presence(
    State(mock): State<Arc<MockSlack>>,
    headers: HeaderMap,
    Query(params): Params,
) -> Json<Value> {
    if !authorized(&headers) {
        return slack_error("invalid_auth");
    }
    if mock.reject_set_presence.load(Ordering::SeqCst) {
        return slack_error("invalid_presence");
    }
    let value = params.get("presence").cloned().unwrap_or_default();
    mock.set_presence_values.lock().unwrap().push(value);
    Json(json!({ "ok": true }))
}

async fn profile_set(
    State(mock): State<Arc<MockSlack>>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Value> {
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    mock.set_status_requests.lock().unwrap().push(RecordedPost {
        authorization: header_value(&headers, header::AUTHORIZATION),
        content_type: header_value(&headers, header::CONTENT_TYPE),
        body,
    });
    if !authorized(&headers) {
        return slack_error("invalid_auth");
    }
    Json(json!({ "ok": true, "profile": {} }))
}

async fn im_open(headers: HeaderMap, Query(params): Params) -> Json<Value> {
    if !authorized(&headers) {
        return slack_error("invalid_auth");
    }
    let user = params.get("user").cloned().unwrap_or_default();
    Json(json!({ "ok": true, "channel": { "id": format!("D{}", user) } }))
}

async fn pins_list(headers: HeaderMap, Query(params): Params) -> Json<Value> {
    if !authorized(&headers) {
        return slack_error("invalid_auth");
    }
    if params.get("channel").map(String::as_str) != Some("C1") {
        return slack_error("channel_not_found");
    }
    Json(json!({
        "ok": true,
        "items": [
            {
                "type": "message",
                "channel": "C1",
                "created": 1700000000,
                "message": {"ts": "1.1", "user": "U1", "text": "Runbook <https://wiki.example.com/runbook|here>"}
            },
            {
                "type": "file",
                "created": 1700000001,
                "file": {"title": "Roadmap.pdf", "filetype": "pdf", "url_private": "https://files.example.com/roadmap.pdf"}
            }
        ]
    }))
}

async fn emoji_list(State(mock): State<Arc<MockSlack>>, headers: HeaderMap) -> Json<Value> {
    if !authorized(&headers) {
        return slack_error("invalid_auth");
    }
    let base = mock.base_url.lock().unwrap().clone();
    Json(json!({
        "ok": true,
        "emoji": {
            "party": format!("{}/files/party.gif", base),
            "yay": "alias:party"
        }
    }))
}

async fn file(State(mock): State<Arc<MockSlack>>, Path(name): Path<String>) -> impl IntoResponse {
    mock.image_fetches.fetch_add(1, Ordering::SeqCst);
    if name == "missing.gif" {
        return (StatusCode::NOT_FOUND, Vec::new());
    }
    (StatusCode::OK, name.into_bytes())
}

async fn unavailable() -> impl IntoResponse {
    (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "ok": true })))
}

async fn garbage() -> &'static str {
    "<html>maintenance</html>"
}

fn mock_router(mock: Arc<MockSlack>) -> Router {
    Router::new()
        .route("/api/auth.test", get(auth_test))
        .route("/api/channels.list", get(channels_list))
        .route("/api/users.list", get(users_list))
        .route("/api/users.getPresence", get(get_presence))
        .route("/api/users.setPresence", get(set_presence))
        .route("/api/users.profile.set", post(profile_set))
        .route("/api/im.open", get(im_open))
        .route("/api/pins.list", get(pins_list))
        .route("/api/emoji.list", get(emoji_list))
        .route("/files/{name}", get(file))
        .route("/down/{method}", get(unavailable))
        .route("/garbage/{method}", get(garbage))
        .with_state(mock)
}

/// Test fixture for integration tests.
struct TestFixture {
    mock: Arc<MockSlack>,
    base_url: String,
    config: Config,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mock = Arc::new(MockSlack::default());

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);
        *mock.base_url.lock().unwrap() = base_url.clone();

        // Spawn server
        let app = mock_router(mock.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let config = Config {
            data_dir: temp_dir.path().join("data"),
            cache_dir: temp_dir.path().join("cache"),
            api_base_url: format!("{}/api", base_url),
            http_timeout: Some(Duration::from_secs(5)),
            stale_minutes: 5,
            presence_stale_minutes: 1,
            presence_concurrency: None,
            sprite_index_path: temp_dir.path().join("emoji.json"),
            log_level: "warn".to_string(),
        };

        TestFixture {
            mock,
            base_url,
            config,
            _temp_dir: temp_dir,
        }
    }

    fn client_at(&self, path: &str) -> SlackClient {
        SlackClient::new(format!("{}{}", self.base_url, path), Some(Duration::from_secs(5)))
            .unwrap()
    }

    async fn session(&self) -> Session {
        let client = SlackClient::from_config(&self.config).unwrap();
        Session::open(self.config.clone(), Arc::new(client)).await
    }

    async fn refreshed_session(&self) -> Session {
        let mut session = self.session().await;
        session.set_token(TOKEN).await.unwrap();
        session.ensure_fresh().await.unwrap();
        session
    }

    async fn persisted(&self) -> Snapshot {
        Snapshot::load(&self.config.snapshot_file()).await
    }
}

#[tokio::test]
async fn test_end_to_end_refresh() {
    let fixture = TestFixture::new().await;
    let mut session = fixture.session().await;
    assert!(!session.has_token());

    session.set_token(TOKEN).await.unwrap();
    assert!(session.has_token());

    let outcome = session.ensure_fresh().await.unwrap();
    assert_eq!(outcome, RefreshOutcome::Refreshed);

    let snapshot = session.snapshot();
    assert_eq!(snapshot.identity.user_id, "U1");
    assert_eq!(snapshot.identity.team_id, "TEAM1");
    assert_eq!(snapshot.identity.team_name, "Acme");

    let general = snapshot.find_channel("C1").unwrap();
    assert_eq!(general.name, "general");
    assert_eq!(general.topic, "Company-wide");
    assert!(general.is_member("U1"));
    assert!(snapshot.find_channel("C9").is_none());

    assert_eq!(snapshot.users.len(), 3);
    assert_eq!(snapshot.find_user("U1").unwrap().presence, Presence::Active);
    assert_eq!(snapshot.find_user("U2").unwrap().presence, Presence::Away);
    assert_eq!(snapshot.find_user("U2").unwrap().status_emoji, ":taco:");
    assert!(!snapshot.find_user("USLACKBOT").unwrap().is_addressable());

    assert_eq!(&fixture.persisted().await, session.snapshot());
}

#[tokio::test]
async fn test_reopened_session_serves_from_cache() {
    let fixture = TestFixture::new().await;
    let first = fixture.refreshed_session().await;

    let mut second = fixture.session().await;
    assert!(second.has_token());
    assert_eq!(second.snapshot(), first.snapshot());
    assert_eq!(second.ensure_fresh().await.unwrap(), RefreshOutcome::Fresh);
}

#[tokio::test]
async fn test_missing_token() {
    let fixture = TestFixture::new().await;
    let mut session = fixture.session().await;

    let err = session.ensure_fresh().await.unwrap_err();
    assert!(matches!(err, AppError::MissingToken));
    assert!(session.list_pins("C1").await.is_err());
}

#[tokio::test]
async fn test_invalid_token_keeps_previous_snapshot() {
    let fixture = TestFixture::new().await;
    let mut session = fixture.refreshed_session().await;
    let before = session.snapshot().clone();

    session.set_token("nope").await.unwrap();
    let err = session.ensure_fresh().await.unwrap_err();

    match err {
        AppError::RemoteApi { message, .. } => assert_eq!(message, "invalid_auth"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(session.snapshot().identity, before.identity);
    assert_eq!(session.snapshot().channels, before.channels);
    assert_eq!(session.snapshot().users, before.users);
}

#[tokio::test]
async fn test_http_status_is_an_error_regardless_of_body() {
    let fixture = TestFixture::new().await;
    let client = fixture.client_at("/down");

    let err = client.get_identity(TOKEN).await.unwrap_err();
    match err {
        AppError::HttpStatus(status) => assert_eq!(status, "503 Service Unavailable"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let fixture = TestFixture::new().await;
    let client = fixture.client_at("/garbage");

    let err = client.list_users(TOKEN).await.unwrap_err();
    assert!(matches!(err, AppError::Decode(_)));
}

#[tokio::test]
async fn test_fetch_binary() {
    let fixture = TestFixture::new().await;
    let client = fixture.client_at("/api");

    let data = client
        .fetch_binary(&format!("{}/files/smile.png", fixture.base_url))
        .await
        .unwrap();
    assert_eq!(data, b"smile.png");

    let err = client
        .fetch_binary(&format!("{}/files/missing.gif", fixture.base_url))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::HttpStatus(ref s) if s.starts_with("404")));
}

#[tokio::test]
async fn test_set_status_posts_json_and_updates_cache() {
    let fixture = TestFixture::new().await;
    let mut session = fixture.refreshed_session().await;

    session
        .set_status("In a meeting", ":calendar:")
        .await
        .unwrap();

    let requests = fixture.mock.set_status_requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.authorization.as_deref(), Some("Bearer T1"));
    assert!(request
        .content_type
        .as_deref()
        .is_some_and(|ct| ct.starts_with("application/json")));
    assert_eq!(
        request.body,
        json!({"profile": {"status_text": "In a meeting", "status_emoji": ":calendar:"}})
    );

    let me = session.snapshot().current_user().unwrap();
    assert_eq!(me.status_text, "In a meeting");
    assert_eq!(me.status_emoji, ":calendar:");
    assert_eq!(
        fixture.persisted().await.current_user().unwrap().status_text,
        "In a meeting"
    );
}

#[tokio::test]
async fn test_failed_set_status_leaves_cache_untouched() {
    let fixture = TestFixture::new().await;
    let mut session = fixture.refreshed_session().await;
    let before = session.snapshot().clone();

    // A token the mock rejects makes the POST fail with ok:false.
    let mut credentials = crate::config::Credentials::load(&fixture.config.config_file()).await;
    credentials.api_token = Some("revoked".to_string());
    credentials.save(&fixture.config.config_file()).await.unwrap();
    let client = SlackClient::from_config(&fixture.config).unwrap();
    let mut session_with_revoked = Session::open(fixture.config.clone(), Arc::new(client)).await;

    let err = session_with_revoked
        .set_status("nope", "")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::RemoteApi { ref message, .. } if message == "invalid_auth"));
    assert_eq!(session_with_revoked.snapshot(), &before);
    assert_eq!(fixture.persisted().await, before);

    session.set_status("", "").await.unwrap();
    assert_eq!(session.snapshot().current_user().unwrap().status_text, "");
}

#[tokio::test]
async fn test_set_presence_round_trip() {
    let fixture = TestFixture::new().await;
    let mut session = fixture.refreshed_session().await;

    session.set_presence(Presence::Away).await.unwrap();
    assert_eq!(session.snapshot().current_user().unwrap().presence, Presence::Away);

    session.set_presence(Presence::Active).await.unwrap();
    assert_eq!(
        *fixture.mock.set_presence_values.lock().unwrap(),
        vec!["away".to_string(), "auto".to_string()]
    );
    assert_eq!(
        fixture.persisted().await.current_user().unwrap().presence,
        Presence::Active
    );
}

#[tokio::test]
async fn test_toggle_presence_flips_cached_state() {
    let fixture = TestFixture::new().await;
    let mut session = fixture.refreshed_session().await;

    assert_eq!(session.toggle_presence().await.unwrap(), Presence::Away);
    assert_eq!(session.toggle_presence().await.unwrap(), Presence::Active);

    assert_eq!(
        *fixture.mock.set_presence_values.lock().unwrap(),
        vec!["away".to_string(), "auto".to_string()]
    );
    assert_eq!(
        fixture.persisted().await.current_user().unwrap().presence,
        Presence::Active
    );
}

#[tokio::test]
async fn test_failed_set_presence_leaves_cache_untouched() {
    let fixture = TestFixture::new().await;
    let mut session = fixture.refreshed_session().await;
    fixture.mock.reject_set_presence.store(true, Ordering::SeqCst);

    let err = session.set_presence(Presence::Away).await.unwrap_err();

    match err {
        AppError::RemoteApi { method, message } => {
            assert_eq!(method, "users.setPresence");
            assert_eq!(message, "invalid_presence");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(session.snapshot().current_user().unwrap().presence, Presence::Active);
    assert_eq!(
        fixture.persisted().await.current_user().unwrap().presence,
        Presence::Active
    );
}

#[tokio::test]
async fn test_presence_failure_for_one_user_keeps_primary_merge() {
    let fixture = TestFixture::new().await;
    *fixture.mock.fail_presence_for.lock().unwrap() = Some("U2".to_string());
    let mut session = fixture.session().await;
    session.set_token(TOKEN).await.unwrap();

    let err = session.ensure_fresh().await.unwrap_err();
    assert!(matches!(err, AppError::RemoteApi { ref message, .. } if message == "user_not_found"));

    let snapshot = session.snapshot();
    assert!(snapshot.fetched_at.is_some());
    assert!(snapshot.find_channel("C1").is_some());
    let mut ids: Vec<&str> = snapshot.users.iter().map(|u| u.id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, ["U1", "U2", "USLACKBOT"]);

    assert_eq!(&fixture.persisted().await, session.snapshot());
}

#[tokio::test]
async fn test_own_presence_uses_cache_when_recent() {
    let fixture = TestFixture::new().await;
    let mut session = fixture.refreshed_session().await;
    assert_eq!(session.own_presence().await.unwrap(), Presence::Active);
}

#[tokio::test]
async fn test_open_direct_message_link() {
    let fixture = TestFixture::new().await;
    let session = fixture.refreshed_session().await;

    let link = session.open_direct_message("U2").await.unwrap();
    assert_eq!(link, "slack://channel?team=TEAM1&id=DU2");
}

#[tokio::test]
async fn test_pins_are_fetched_not_cached() {
    let fixture = TestFixture::new().await;
    let session = fixture.refreshed_session().await;

    let pins = session.list_pins("C1").await.unwrap();
    assert_eq!(pins.len(), 2);
    assert_eq!(pins[0].target_url(), Some("https://wiki.example.com/runbook"));
    assert_eq!(pins[1].channel, "C1");
    assert_eq!(pins[1].title(), "Roadmap.pdf");
    assert_eq!(pins[1].target_url(), Some("https://files.example.com/roadmap.pdf"));

    let err = session.list_pins("C404").await.unwrap_err();
    assert!(matches!(err, AppError::RemoteApi { ref message, .. } if message == "channel_not_found"));
}

#[tokio::test]
async fn test_custom_emoji_is_downloaded_once() {
    let fixture = TestFixture::new().await;
    let mut session = fixture.refreshed_session().await;

    let image = session.emoji_image(":yay:").await.unwrap();
    let path = match image {
        EmojiImage::File(path) => path,
        other => panic!("unexpected image: {other:?}"),
    };
    assert_eq!(path, fixture.config.emoji_dir().join("party.gif"));
    assert_eq!(std::fs::read(&path).unwrap(), b"party.gif");

    session.emoji_image("party").await.unwrap();
    assert_eq!(fixture.mock.image_fetches.load(Ordering::SeqCst), 1);
    assert_eq!(fixture.persisted().await.emoji.len(), 2);
}

#[tokio::test]
async fn test_standard_emoji_resolves_to_sprite_cell() {
    let fixture = TestFixture::new().await;
    tokio::fs::write(
        &fixture.config.sprite_index_path,
        br#"[{"short_name": "wave", "sheet_x": 2, "sheet_y": 1}]"#,
    )
    .await
    .unwrap();
    let mut session = fixture.refreshed_session().await;

    let names: Vec<&str> = session
        .emoji_store()
        .sprites()
        .await
        .unwrap()
        .names()
        .collect();
    assert_eq!(names, ["wave"]);

    match session.emoji_image(":wave:").await.unwrap() {
        EmojiImage::Sprite { path, cell } => {
            assert_eq!(path, fixture.config.emoji_dir().join("wave.png"));
            assert_eq!((cell.x, cell.y), (128, 64));
        }
        other => panic!("unexpected image: {other:?}"),
    }
    assert_eq!(fixture.mock.image_fetches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_user_links_point_at_workspace() {
    let fixture = TestFixture::new().await;
    let session = fixture.refreshed_session().await;
    let identity = &session.snapshot().identity;

    assert!(identity.is_current_user("U1"));
    assert!(!identity.is_current_user("U2"));
    assert_eq!(identity.user_link("U2"), "slack://user?team=TEAM1&id=U2");
}

#[tokio::test]
async fn test_reset_erases_everything() {
    let fixture = TestFixture::new().await;
    let mut session = fixture.refreshed_session().await;
    assert!(fixture.config.snapshot_file().exists());

    session.reset().await.unwrap();

    assert_eq!(session.snapshot(), &Snapshot::default());
    assert!(!session.has_token());
    assert!(!fixture.config.snapshot_file().exists());
    assert!(matches!(
        session.ensure_fresh().await.unwrap_err(),
        AppError::MissingToken
    ));

    let reopened = fixture.session().await;
    assert!(!reopened.has_token());
    assert_eq!(reopened.snapshot(), &Snapshot::default());
}
