use axum::{
    extract::FromRequestParts,
    http::{HeaderValue, Method, Request, Uri, header, request::Parts},
};
use ilmo::{
    AppConfig, AppState, MockRepository,
    auth::{self, Claims, Session},
    context::{PageContext, RenderMode},
    models::{Lang, Viewer},
    repository::Repository,
    store::ViewerState,
};
use jsonwebtoken::{EncodingKey, Header, encode};
use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};
use uuid::Uuid;

const TEST_JWT_SECRET: &str = "auth-integration-test-secret";

fn config() -> AppConfig {
    AppConfig {
        jwt_secret: TEST_JWT_SECRET.to_string(),
        ..AppConfig::default()
    }
}

/// Helper to create a signed token with a relative expiry.
fn create_token(user_id: Uuid, secret: &str, expires_in: i64) -> String {
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;
    let claims = Claims {
        sub: user_id,
        iat: now as usize,
        exp: (now + expires_in) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

fn viewer() -> Viewer {
    Viewer {
        id: Uuid::new_v4(),
        name: "Teemu".to_string(),
        username: "teemu".to_string(),
        is_verified: true,
        ..Default::default()
    }
}

fn app_state(repo: MockRepository) -> AppState {
    AppState {
        repo: Arc::new(repo),
        config: config(),
    }
}

/// Helper to get the mutable Parts struct from a generated Request
fn get_request_parts(method: Method, uri: Uri) -> Parts {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let (parts, _) = request.into_parts();
    parts
}

// --- Session Resolution ---

#[tokio::test]
async fn test_session_from_cookie() {
    let user_id = Uuid::new_v4();
    let token = create_token(user_id, TEST_JWT_SECRET, 3600);

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::COOKIE,
        HeaderValue::from_str(&format!("{}={}", auth::SESSION_COOKIE, token)).unwrap(),
    );

    let session = Session::from_headers(&parts.headers, &config()).unwrap();
    assert_eq!(session.user_id, user_id);
    assert_eq!(session.token, token);
}

#[tokio::test]
async fn test_session_from_bearer_header() {
    let user_id = Uuid::new_v4();
    let token = create_token(user_id, TEST_JWT_SECRET, 3600);

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
    );

    let session = Session::from_headers(&parts.headers, &config()).unwrap();
    assert_eq!(session.user_id, user_id);
}

#[tokio::test]
async fn test_session_rejects_expired_and_foreign_tokens() {
    let user_id = Uuid::new_v4();
    for token in [
        // Well past the default validation leeway
        create_token(user_id, TEST_JWT_SECRET, -3600),
        create_token(user_id, "some-other-secret", 3600),
        "not-a-jwt".to_string(),
    ] {
        let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
        parts.headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        assert!(Session::from_headers(&parts.headers, &config()).is_none());
    }
}

#[tokio::test]
async fn test_session_missing() {
    let parts = get_request_parts(Method::GET, "/".parse().unwrap());
    assert!(Session::from_headers(&parts.headers, &config()).is_none());
}

#[test]
fn test_issued_tokens_round_trip() {
    let user_id = Uuid::new_v4();
    let token =
        auth::issue_token(TEST_JWT_SECRET, user_id, std::time::Duration::from_secs(60)).unwrap();
    let claims = auth::decode_token(&token, TEST_JWT_SECRET).unwrap();
    assert_eq!(claims.sub, user_id);
    assert!(claims.exp > claims.iat);
}

#[test]
fn test_session_cookie_attributes() {
    let cookie = auth::session_cookie("t".to_string(), &config());
    assert_eq!(cookie.http_only(), Some(true));
    assert_eq!(cookie.path(), Some("/"));
    assert_eq!(cookie.secure(), Some(false));

    let https = AppConfig {
        root_url: "https://ilmo.example".to_string(),
        ..config()
    };
    assert_eq!(auth::session_cookie("t".to_string(), &https).secure(), Some(true));
    assert_eq!(
        auth::clear_session_cookie(&https).max_age(),
        Some(time::Duration::ZERO)
    );
}

// --- Page Context Extraction ---

#[tokio::test]
async fn test_page_context_loads_viewer() {
    let viewer = viewer();
    let repo = MockRepository::new(TEST_JWT_SECRET).with_user(viewer.clone(), "pw");
    let token = repo.token_for(viewer.id);
    let state = app_state(repo);

    let mut parts = get_request_parts(Method::GET, "/settings?tab=1".parse().unwrap());
    parts.headers.insert(
        header::COOKIE,
        HeaderValue::from_str(&format!("{}={}", auth::SESSION_COOKIE, token)).unwrap(),
    );
    parts
        .headers
        .insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("en-GB,en;q=0.9"));
    parts.headers.insert(
        header::USER_AGENT,
        HeaderValue::from_static("Mozilla/5.0 (iPhone) Mobile/15E148"),
    );

    let Ok(ctx) = PageContext::from_request_parts(&mut parts, &state).await;

    assert_eq!(ctx.store.state(), &ViewerState::Present(viewer));
    assert_eq!(ctx.current_url(), "/settings?tab=1");
    assert_eq!(ctx.auth(), Some(token.as_str()));
    assert_eq!(ctx.lang, Lang::En);
    assert!(ctx.is_mobile);
    assert_eq!(ctx.mode, RenderMode::Interactive);
}

#[tokio::test]
async fn test_page_context_without_session_skips_service() {
    // A failing service proves the anonymous path never calls it.
    let repo = MockRepository::new(TEST_JWT_SECRET)
        .fail_viewer(ilmo::error::BackendError::Network("down".into()));
    let state = app_state(repo);

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    let Ok(ctx) = PageContext::from_request_parts(&mut parts, &state).await;

    assert_eq!(ctx.store.state(), &ViewerState::Absent);
    assert_eq!(ctx.lang, Lang::Fi);
    assert!(!ctx.is_mobile);
}

#[tokio::test]
async fn test_page_context_detects_prefetch() {
    let state = app_state(MockRepository::new(TEST_JWT_SECRET));

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts
        .headers
        .insert("sec-purpose", HeaderValue::from_static("prefetch;prerender"));
    let Ok(ctx) = PageContext::from_request_parts(&mut parts, &state).await;
    assert_eq!(ctx.mode, RenderMode::Prefetch);

    let mut parts = get_request_parts(Method::HEAD, "/".parse().unwrap());
    let Ok(ctx) = PageContext::from_request_parts(&mut parts, &state).await;
    assert_eq!(ctx.mode, RenderMode::Prefetch);
}

#[tokio::test]
async fn test_page_context_pending_on_slow_service() {
    let viewer = viewer();
    let repo = MockRepository::new(TEST_JWT_SECRET)
        .with_user(viewer.clone(), "pw")
        .with_viewer_delay(std::time::Duration::from_millis(500));
    let token = repo.token_for(viewer.id);
    let state = AppState {
        repo: Arc::new(repo),
        config: AppConfig {
            viewer_timeout: std::time::Duration::from_millis(20),
            ..config()
        },
    };

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
    );
    let Ok(ctx) = PageContext::from_request_parts(&mut parts, &state).await;

    assert_eq!(ctx.store.state(), &ViewerState::Pending);
    assert!(ctx.store.fetching());
}

#[tokio::test]
async fn test_logout_forgets_revoked_tokens_once_expired() {
    let repo = MockRepository::new(TEST_JWT_SECRET);
    let user_id = Uuid::new_v4();

    // Past `exp` but still inside the validation leeway, so logout records it
    let nearly_expired = create_token(user_id, TEST_JWT_SECRET, -58);
    repo.logout(&nearly_expired).await.unwrap();
    assert_eq!(repo.revoked_sessions(), 1);

    // Tokens that no longer decode are not recorded at all
    repo.logout("not-a-token").await.unwrap();
    assert_eq!(repo.revoked_sessions(), 1);

    tokio::time::sleep(Duration::from_secs(3)).await;

    let fresh = create_token(user_id, TEST_JWT_SECRET, 3600);
    repo.logout(&fresh).await.unwrap();
    assert_eq!(repo.revoked_sessions(), 1);
    assert!(repo.current_user(Some(&fresh)).await.unwrap().is_none());
}
