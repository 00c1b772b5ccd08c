//! End-to-end checks of the HTML auth flow against an in-memory database.

use authgate::{
    app::build_app,
    auth::User,
    config::{AppConfig, SessionBackend},
    state::AppState,
};
use axum::{
    body::{to_bytes, Body},
    http::{
        header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE},
        Request, Response, StatusCode,
    },
    Router,
};
use tower::ServiceExt;

const FORM: &str = "application/x-www-form-urlencoded";
const REGISTER_BODY: &str = "first_name=Ada&last_name=Lovelace&username=ada&email=ada%40example.com&mobile=555-0100&password=analytical-engine";

async fn setup() -> (Router, AppState) {
    let state = AppState::in_memory().await.expect("state");
    (build_app(state.clone()), state)
}

async fn get(app: &Router, uri: &str, cookie: Option<&str>) -> Response<Body> {
    let mut req = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        req = req.header(COOKIE, cookie);
    }
    app.clone()
        .oneshot(req.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn post_form(app: &Router, uri: &str, body: &str, cookie: Option<&str>) -> Response<Body> {
    let mut req = Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, FORM);
    if let Some(cookie) = cookie {
        req = req.header(COOKIE, cookie);
    }
    app.clone()
        .oneshot(req.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap()
}

/// `name=value` pair from a `Set-Cookie` header of the response.
fn cookie(res: &Response<Body>, name: &str) -> Option<String> {
    res.headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .find(|pair| pair.starts_with(&format!("{name}=")))
        .map(str::to_string)
}

fn location(res: &Response<Body>) -> &str {
    res.headers()[LOCATION].to_str().unwrap()
}

async fn body_text(res: Response<Body>) -> String {
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn register_and_login(app: &Router) -> String {
    let res = post_form(app, "/register", REGISTER_BODY, None).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    let res = post_form(
        app,
        "/login",
        "email=ada%40example.com&password=analytical-engine",
        None,
    )
    .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    cookie(&res, "session").expect("session cookie")
}

#[tokio::test]
async fn home_requires_login() {
    let (app, _) = setup().await;
    let res = get(&app, "/", None).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/login?next=%2F");
    assert_eq!(cookie(&res, "flash").as_deref(), Some("flash=login_required"));
}

#[tokio::test]
async fn register_redirects_to_login_with_flash() {
    let (app, state) = setup().await;
    let res = post_form(&app, "/register", REGISTER_BODY, None).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/login");
    assert_eq!(cookie(&res, "flash").as_deref(), Some("flash=registered"));

    let user = User::find_by_email(&state.db, "ada@example.com")
        .await
        .unwrap()
        .expect("row persisted");
    assert_ne!(user.password, "analytical-engine");
    assert_eq!(user.mobile.as_deref(), Some("555-0100"));
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let (app, state) = setup().await;
    post_form(&app, "/register", REGISTER_BODY, None).await;

    let res = post_form(
        &app,
        "/register",
        "username=ada2&email=ADA%40example.com&password=another-password",
        None,
    )
    .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/register");
    assert_eq!(cookie(&res, "flash").as_deref(), Some("flash=email_taken"));
    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ?")
        .bind("ada@example.com")
        .fetch_one(&state.db)
        .await
        .unwrap();
    assert_eq!(rows, 1);
}

#[tokio::test]
async fn register_accepts_local_domain_and_short_password() {
    let (app, state) = setup().await;
    let res = post_form(&app, "/register", "email=user%40localhost&password=abc", None).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/login");
    assert_eq!(cookie(&res, "flash").as_deref(), Some("flash=registered"));
    assert!(User::find_by_email(&state.db, "user@localhost")
        .await
        .unwrap()
        .is_some());

    let res = post_form(&app, "/login", "email=user%40localhost&password=abc", None).await;
    assert_eq!(location(&res), "/");
    assert!(cookie(&res, "session").is_some());
}

#[tokio::test]
async fn register_without_email_or_password_flashes() {
    let (app, state) = setup().await;
    let res = post_form(&app, "/register", "first_name=Ada&password=secret", None).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/register");
    assert_eq!(cookie(&res, "flash").as_deref(), Some("flash=missing_fields"));

    let res = post_form(&app, "/register", "email=ada%40example.com", None).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/register");
    assert_eq!(cookie(&res, "flash").as_deref(), Some("flash=missing_fields"));

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&state.db)
        .await
        .unwrap();
    assert_eq!(rows, 0);

    let res = get(&app, "/register", Some("flash=missing_fields")).await;
    assert!(body_text(res).await.contains("Email and password are required"));
}

#[tokio::test]
async fn login_without_fields_is_invalid_credentials() {
    let (app, _) = setup().await;
    post_form(&app, "/register", REGISTER_BODY, None).await;

    for body in ["", "email=ada%40example.com", "password=analytical-engine"] {
        let res = post_form(&app, "/login", body, None).await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER, "body {body:?}");
        assert_eq!(location(&res), "/login");
        assert_eq!(cookie(&res, "session"), None);
        assert_eq!(
            cookie(&res, "flash").as_deref(),
            Some("flash=invalid_credentials")
        );
    }
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let (app, _) = setup().await;
    post_form(&app, "/register", REGISTER_BODY, None).await;

    let res = post_form(
        &app,
        "/login",
        "email=ada%40example.com&password=difference-engine",
        None,
    )
    .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/login");
    assert_eq!(cookie(&res, "session"), None);
    assert_eq!(
        cookie(&res, "flash").as_deref(),
        Some("flash=invalid_credentials")
    );
}

#[tokio::test]
async fn login_then_home_then_logout() {
    let (app, _) = setup().await;
    let session = register_and_login(&app).await;

    let res = get(&app, "/", Some(&session)).await;
    assert_eq!(res.status(), StatusCode::OK);
    let html = body_text(res).await;
    assert!(html.contains("Welcome, Ada!"));
    assert!(html.contains("ada@example.com"));

    let res = get(&app, "/logout", Some(&session)).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/login");
    assert_eq!(cookie(&res, "session").as_deref(), Some("session="));
    assert_eq!(cookie(&res, "flash").as_deref(), Some("flash=logged_out"));

    // The old cookie no longer grants access.
    let res = get(&app, "/", Some(&session)).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/login?next=%2F");
}

#[tokio::test]
async fn login_over_live_session_replaces_it() {
    let (app, _) = setup().await;
    let first = register_and_login(&app).await;

    let res = post_form(
        &app,
        "/login",
        "email=ada%40example.com&password=analytical-engine",
        Some(&first),
    )
    .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    let second = cookie(&res, "session").expect("new session cookie");
    assert_ne!(first, second);

    let res = get(&app, "/", Some(&first)).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    let res = get(&app, "/", Some(&second)).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn logout_requires_login() {
    let (app, _) = setup().await;
    let res = get(&app, "/logout", None).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/login?next=%2Flogout");
}

#[tokio::test]
async fn login_honours_safe_next_only() {
    let (app, _) = setup().await;
    post_form(&app, "/register", REGISTER_BODY, None).await;

    let res = post_form(
        &app,
        "/login",
        "email=ada%40example.com&password=analytical-engine&next=%2F",
        None,
    )
    .await;
    assert_eq!(location(&res), "/");

    let res = post_form(
        &app,
        "/login",
        "email=ada%40example.com&password=analytical-engine&next=https%3A%2F%2Fevil.example",
        None,
    )
    .await;
    assert_eq!(location(&res), "/");
}

#[tokio::test]
async fn login_ignores_next_with_control_or_whitespace() {
    let (app, _) = setup().await;
    post_form(&app, "/register", REGISTER_BODY, None).await;

    for next in ["%2Fa%0Ab", "%2F%09%2Fevil.example", "%2Fa%0D%0ASet-Cookie%3A+x%3D1", "%2F+%2Fevil.example"] {
        let body = format!("email=ada%40example.com&password=analytical-engine&next={next}");
        let res = post_form(&app, "/login", &body, None).await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER, "next {next}");
        assert_eq!(location(&res), "/", "next {next}");
    }

    let res = get(&app, "/login?next=%2F%09%2Fevil.example", None).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(!body_text(res).await.contains(r#"name="next""#));
}

#[tokio::test]
async fn flash_is_shown_once() {
    let (app, _) = setup().await;
    let res = get(&app, "/login", Some("flash=registered")).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(cookie(&res, "flash").as_deref() == Some("flash="));
    let html = body_text(res).await;
    assert!(html.contains("Registration successful! Login now."));

    let res = get(&app, "/login", None).await;
    assert_eq!(cookie(&res, "flash"), None);
    let html = body_text(res).await;
    assert!(!html.contains("Registration successful!"));
}

#[tokio::test]
async fn login_form_keeps_next() {
    let (app, _) = setup().await;
    let res = get(&app, "/login?next=%2F", None).await;
    let html = body_text(res).await;
    assert!(html.contains(r#"name="next" value="/""#));
}

#[tokio::test]
async fn register_form_renders() {
    let (app, _) = setup().await;
    let res = get(&app, "/register", None).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(body_text(res).await.contains(r#"action="/register""#));
}

#[tokio::test]
async fn memory_session_backend_works_end_to_end() {
    let mut config = AppConfig::in_memory();
    config.session.backend = SessionBackend::Memory;
    let state = AppState::from_config(config).await.unwrap();
    let app = build_app(state);

    let session = register_and_login(&app).await;
    let res = get(&app, "/", Some(&session)).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn purge_removes_expired_sessions_without_lookups() {
    let mut config = AppConfig::in_memory();
    config.session.purge_interval_seconds = 1;
    let state = AppState::from_config(config).await.unwrap();
    let app = build_app(state.clone());
    let live = register_and_login(&app).await;

    let user = User::find_by_email(&state.db, "ada@example.com")
        .await
        .unwrap()
        .unwrap();
    state.sessions.create(user.id, -1).await.unwrap();
    state.sessions.create(user.id, -60).await.unwrap();

    let purge = state.spawn_session_purge();
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    purge.abort();

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions")
        .fetch_one(&state.db)
        .await
        .unwrap();
    assert_eq!(rows, 1);
    let res = get(&app, "/", Some(&live)).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn health_is_public() {
    let (app, _) = setup().await;
    let res = get(&app, "/health", None).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_text(res).await, "ok");
}
