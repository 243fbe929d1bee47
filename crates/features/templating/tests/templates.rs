use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use ramverk_kernel::domain::config::Settings;
use ramverk_kernel::{Application, Environment, Error, Response, Segments, routing};
use ramverk_templating::Templates;
use serde::Serialize;
use std::path::Path;
use tower::ServiceExt;

#[derive(Serialize)]
struct Page<'a> {
    title: &'a str,
}

async fn index(env: Environment) -> Result<Response, Error> {
    env.render("index.html", &Page { title: "Welcome" })
}

async fn greet(env: Environment, segments: Segments) -> Result<Response, Error> {
    let name: String = segments.parse("name")?;
    env.render("greet.txt", &serde_json::json!({ "name": name }))
}

async fn missing(env: Environment) -> Result<Response, Error> {
    env.render("missing.html", &())
}

fn write(dir: &Path, name: &str, body: &str) {
    std::fs::write(dir.join(name), body).unwrap();
}

fn app(dir: &Path) -> Application {
    write(dir, "index.html", "<h1>{{ title }}</h1><p>{{ app.name }} {{ request.method }} {{ request.args.q }}</p>{{ motto }}");
    write(dir, "greet.txt", "Hello {{ name }} from {{ url('index') }}, see {{ path('greet', name='Ada Lovelace') }}");

    Application::builder(Settings::named("Site"))
        .component(Templates::new().directory(dir))
        .context_processor(|_env, context| {
            context.insert("motto".into(), "<ok>".into());
            context.insert("title".into(), "ignored".into());
            Ok(())
        })
        .route(routing::get("/").endpoint("index"), index)
        .route(routing::get("/greet/{name}").endpoint("greet"), greet)
        .route(routing::get("/missing").endpoint("missing"), missing)
        .build()
        .unwrap()
}

async fn get(app: &Application, uri: &str) -> (StatusCode, String, String) {
    let request = Request::get(uri).header(header::HOST, "example.org").body(Body::empty()).unwrap();
    let response = app.router().oneshot(request).await.unwrap();
    let status = response.status();
    let content_type =
        response.headers().get(header::CONTENT_TYPE).map(|v| v.to_str().unwrap().to_owned()).unwrap_or_default();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, content_type, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn templates_see_defaults_processors_and_caller_values() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path());

    let (status, content_type, body) = get(&app, "/?q=tea").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type, "text/html; charset=utf-8");
    assert_eq!(body, "<h1>Welcome</h1><p>Site GET tea</p>&lt;ok&gt;");
}

#[tokio::test]
async fn text_templates_are_not_escaped() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path());

    let (_, content_type, body) = get(&app, "/greet/%3Cb%3E").await;
    assert_eq!(content_type, "text/plain; charset=utf-8");
    assert_eq!(body, "Hello <b> from http://example.org/, see /greet/Ada%20Lovelace");
}

#[tokio::test]
async fn missing_templates_fail_the_request() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path());
    let (status, _, _) = get(&app, "/missing").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}
