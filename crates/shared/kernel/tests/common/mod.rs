#![allow(dead_code)]

use axum::body::{Body, to_bytes};
use axum::http::{HeaderMap, StatusCode};
use ramverk_kernel::{Application, Component, Environment, Error, Next, Outcome, Response, async_trait};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

pub async fn send(app: &Application, request: axum::http::Request<Body>) -> Reply {
    let response = app.router().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    Reply { status, headers, body: String::from_utf8(body.to_vec()).unwrap() }
}

pub async fn call(app: &Application, method: &str, uri: &str) -> Reply {
    let request = axum::http::Request::builder().method(method).uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

pub type Events = Arc<Mutex<Vec<String>>>;

/// Records its hooks into a shared event list.
pub struct Recorder {
    pub name: &'static str,
    pub events: Events,
    pub fail_enter: bool,
    pub fail_exit: bool,
}

impl Recorder {
    pub fn new(name: &'static str, events: &Events) -> Self {
        Self { name, events: Arc::clone(events), fail_enter: false, fail_exit: false }
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

#[async_trait]
impl Component for Recorder {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn enter(&self, _env: &Environment) -> Result<(), Error> {
        self.push(format!("enter:{}", self.name));
        if self.fail_enter {
            return Err("enter refused".into());
        }
        Ok(())
    }

    async fn respond(&self, env: &Environment, next: Next<'_>) -> Result<Response, Error> {
        self.push(format!("respond:{}", self.name));
        next.run(env).await
    }

    async fn exit(&self, _env: &Environment, outcome: Outcome) -> Result<(), Error> {
        self.push(format!("exit:{}:{outcome:?}", self.name));
        if self.fail_exit {
            return Err("exit refused".into());
        }
        Ok(())
    }
}

pub fn events(events: &Events) -> Vec<String> {
    events.lock().unwrap().clone()
}
