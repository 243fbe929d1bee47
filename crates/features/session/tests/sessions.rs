use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use ramverk_kernel::domain::config::Settings;
use ramverk_kernel::{Application, Error, routing};
use ramverk_session::{SecretKey, Session, Sessions};
use tower::ServiceExt;

async fn visit(session: Session) -> Result<String, Error> {
    let visits = session.get::<u32>("visits")?.unwrap_or(0) + 1;
    session.insert("visits", &visits)?;
    Ok(visits.to_string())
}

async fn peek(session: Session) -> Result<String, Error> {
    Ok(session.get::<u32>("visits")?.unwrap_or(0).to_string())
}

async fn logout(session: Session) -> &'static str {
    session.clear();
    "bye"
}

fn app(sessions: Sessions, settings: Settings) -> Application {
    Application::builder(settings)
        .component(sessions)
        .route(routing::get("/visit").endpoint("visit"), visit)
        .route(routing::get("/peek").endpoint("peek"), peek)
        .route(routing::get("/logout").endpoint("logout"), logout)
        .build()
        .unwrap()
}

async fn get(app: &Application, uri: &str, cookie: Option<&str>) -> (StatusCode, Option<String>, String) {
    let mut request = Request::get(uri);
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    let response = app.router().oneshot(request.body(Body::empty()).unwrap()).await.unwrap();
    let status = response.status();
    let set_cookie = response.headers().get(header::SET_COOKIE).map(|v| v.to_str().unwrap().to_owned());
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, set_cookie, String::from_utf8(body.to_vec()).unwrap())
}

fn cookie_pair(set_cookie: &str) -> &str {
    set_cookie.split(';').next().unwrap()
}

#[tokio::test]
async fn sessions_survive_between_requests() {
    let app = app(Sessions::with_key(SecretKey::from_bytes(b"test key".to_vec()).unwrap()), Settings::named("Test"));

    let (_, set_cookie, body) = get(&app, "/visit", None).await;
    assert_eq!(body, "1");
    let set_cookie = set_cookie.unwrap();
    assert!(set_cookie.contains("HttpOnly"));

    let (_, again, body) = get(&app, "/visit", Some(cookie_pair(&set_cookie))).await;
    assert_eq!(body, "2");
    let again = again.unwrap();

    let (_, untouched, body) = get(&app, "/peek", Some(cookie_pair(&again))).await;
    assert_eq!(body, "2");
    assert!(untouched.is_none());
}

#[tokio::test]
async fn forged_cookies_start_over() {
    let app = app(Sessions::with_key(SecretKey::from_bytes(b"test key".to_vec()).unwrap()), Settings::named("Test"));
    let (_, _, body) = get(&app, "/peek", Some("session=e30.AAAA")).await;
    assert_eq!(body, "0");
}

#[tokio::test]
async fn clearing_expires_the_cookie() {
    let app = app(Sessions::with_key(SecretKey::from_bytes(b"test key".to_vec()).unwrap()), Settings::named("Test"));
    let (_, set_cookie, _) = get(&app, "/visit", None).await;

    let (_, expired, body) = get(&app, "/logout", Some(cookie_pair(&set_cookie.unwrap()))).await;
    assert_eq!(body, "bye");
    assert!(expired.unwrap().starts_with("session=; Max-Age=0"));
}

#[tokio::test]
async fn key_file_is_created_under_the_data_dir() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = Settings::named("Test");
    settings.storage.data_dir = dir.path().to_path_buf();
    settings.security.secret_key_bytes = 48;
    settings.security.session_cookie = "sid".into();

    let app = app(Sessions::new(), settings);
    let (status, set_cookie, _) = get(&app, "/visit", None).await;

    assert_eq!(status, StatusCode::OK);
    assert!(set_cookie.unwrap().starts_with("sid="));
    assert_eq!(std::fs::read(dir.path().join("secret.key")).unwrap().len(), 48);
}

#[tokio::test]
async fn extraction_fails_without_the_component() {
    let app = Application::builder(Settings::named("Test"))
        .route(routing::get("/peek").endpoint("peek"), peek)
        .build()
        .unwrap();
    let (status, _, _) = get(&app, "/peek", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}
