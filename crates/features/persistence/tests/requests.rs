use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use ramverk_database::Document;
use ramverk_kernel::domain::config::Settings;
use ramverk_kernel::{Application, Error, routing};
use ramverk_persistence::{Db, Persistence, Persistent, Transaction, Transactions};
use ramverk_storage::MemoryStorage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower::ServiceExt;

#[derive(Debug, Default, Serialize, Deserialize)]
struct Counter {
    hits: u32,
}

impl Document for Counter {
    const KEY: &'static str = "counter";
}

fn bump(counter: &Db<Counter>) -> Result<u32, Error> {
    let mut doc = counter.get()?;
    doc.hits += 1;
    counter.save(&doc)?;
    Ok(doc.hits)
}

async fn hit(counter: Db<Counter>) -> Result<String, Error> {
    Ok(bump(&counter)?.to_string())
}

async fn crash(counter: Db<Counter>) -> Result<String, Error> {
    bump(&counter)?;
    Err("boom".into())
}

async fn gone(counter: Db<Counter>) -> Result<String, Error> {
    bump(&counter)?;
    Err(Error::not_found("/gone"))
}

async fn doomed(counter: Db<Counter>, tx: Transaction) -> Result<String, Error> {
    bump(&counter)?;
    tx.doom().map_err(Error::internal)?;
    Ok("doomed".to_owned())
}

async fn keys(root: Persistent) -> Result<String, Error> {
    Ok(root.keys().map_err(Error::internal)?.join(","))
}

async fn setup() -> (Application, Persistence) {
    let persistence = Persistence::open(Arc::new(MemoryStorage::new())).await.unwrap();
    let app = Application::builder(Settings::named("Test"))
        .component(persistence.clone())
        .component(Transactions)
        .route(routing::post("/hit").endpoint("hit"), hit)
        .route(routing::post("/crash").endpoint("crash"), crash)
        .route(routing::post("/gone").endpoint("gone"), gone)
        .route(routing::post("/doomed").endpoint("doomed"), doomed)
        .route(routing::get("/keys").endpoint("keys"), keys)
        .route(routing::get("/idle").endpoint("idle"), || async { "idle" })
        .build()
        .unwrap();
    (app, persistence)
}

async fn call(app: &Application, method: &str, uri: &str) -> (StatusCode, String) {
    let request = Request::builder().method(method).uri(uri).body(Body::empty()).unwrap();
    let response = app.router().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

fn stored_hits(persistence: &Persistence) -> u32 {
    persistence.database().open_connection().root().document::<Counter>().unwrap().hits
}

#[tokio::test]
async fn completed_requests_commit() {
    let (app, persistence) = setup().await;
    assert_eq!(call(&app, "POST", "/hit").await, (StatusCode::OK, "1".to_owned()));
    assert_eq!(call(&app, "POST", "/hit").await.1, "2");
    assert_eq!(stored_hits(&persistence), 2);
    assert_eq!(call(&app, "GET", "/keys").await.1, "counter");
}

#[tokio::test]
async fn http_errors_still_commit() {
    let (app, persistence) = setup().await;
    assert_eq!(call(&app, "POST", "/gone").await.0, StatusCode::NOT_FOUND);
    assert_eq!(stored_hits(&persistence), 1);
}

#[tokio::test]
async fn failed_requests_abort() {
    let (app, persistence) = setup().await;
    call(&app, "POST", "/hit").await;
    assert_eq!(call(&app, "POST", "/crash").await.0, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(stored_hits(&persistence), 1);
}

#[tokio::test]
async fn doomed_transactions_abort() {
    let (app, persistence) = setup().await;
    assert_eq!(call(&app, "POST", "/doomed").await.1, "doomed");
    assert_eq!(stored_hits(&persistence), 0);
}

#[tokio::test]
async fn requests_without_database_access_leave_it_alone() {
    let (app, persistence) = setup().await;
    let before = persistence.database().serial();
    assert_eq!(call(&app, "GET", "/idle").await.1, "idle");
    assert_eq!(persistence.database().serial(), before);
}

#[tokio::test]
async fn extraction_requires_the_component() {
    let app = Application::builder(Settings::named("Test"))
        .route(routing::post("/hit").endpoint("hit"), hit)
        .build()
        .unwrap();
    assert_eq!(call(&app, "POST", "/hit").await.0, StatusCode::INTERNAL_SERVER_ERROR);
}
