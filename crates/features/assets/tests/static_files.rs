use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use ramverk_assets::SharedData;
use ramverk_kernel::domain::config::Settings;
use ramverk_kernel::{Application, Environment, Error, routing};
use std::path::Path;
use tower::ServiceExt;

async fn stylesheet(env: Environment) -> Result<String, Error> {
    env.path("static", [("name", "css/site.css")])
}

fn settings(root: &Path) -> Settings {
    let mut settings = Settings::named("Test");
    settings.storage.static_dir = root.join("static");
    settings
}

async fn get(app: &Application, uri: &str) -> (StatusCode, String) {
    let response = app.router().oneshot(Request::get(uri).body(Body::empty()).unwrap()).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn files_are_served_and_linked() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("static/css")).unwrap();
    std::fs::write(dir.path().join("static/css/site.css"), "body {}").unwrap();

    let app = Application::builder(settings(dir.path()))
        .component(SharedData::new())
        .route(routing::get("/").endpoint("index"), stylesheet)
        .build()
        .unwrap();

    assert_eq!(get(&app, "/").await.1, "/static/css/site.css");
    assert_eq!(get(&app, "/static/css/site.css").await, (StatusCode::OK, "body {}".to_owned()));
    assert_eq!(get(&app, "/static/missing.css").await.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn extra_directories_can_be_mounted() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("uploads")).unwrap();
    std::fs::write(dir.path().join("uploads/a.txt"), "upload").unwrap();

    let app = Application::builder(settings(dir.path()))
        .component(SharedData::new().mount("/media/", dir.path().join("uploads")))
        .build()
        .unwrap();

    assert_eq!(get(&app, "/media/a.txt").await.1, "upload");
}

#[tokio::test]
async fn the_static_rule_is_build_only() {
    let dir = tempfile::tempdir().unwrap();
    let app = Application::builder(settings(dir.path())).component(SharedData::new()).build().unwrap();

    let rule = app.rules().next().unwrap();
    assert_eq!(rule.pattern(), "/static/{*name}");
    assert!(rule.is_build_only());
}

#[test]
fn root_mounts_are_rejected() {
    let mut settings = Settings::named("Test");
    settings.storage.static_path = "/".into();
    let err = Application::builder(settings).component(SharedData::new()).build().unwrap_err();
    assert!(matches!(err, Error::Routing { .. }));
}
