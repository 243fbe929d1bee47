mod common;

use axum::http::{StatusCode, header};
use common::{Events, Recorder, call, events};
use ramverk_kernel::domain::config::Settings;
use ramverk_kernel::{Application, Error, local, routing};

fn app_with(components: Vec<Recorder>) -> Application {
    let mut builder = Application::builder(Settings::named("Test"))
        .route(routing::get("/").endpoint("index"), || async { "index" })
        .route(routing::get("/boom").endpoint("boom"), || async { Err::<String, _>(Error::from("boom")) });
    for component in components {
        builder = builder.component(component);
    }
    builder.build().unwrap()
}

#[tokio::test]
async fn components_bracket_the_request() {
    let log = Events::default();
    let app = app_with(vec![Recorder::new("a", &log), Recorder::new("b", &log)]);

    let reply = call(&app, "GET", "/").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, "index");
    assert_eq!(
        events(&log),
        ["enter:a", "enter:b", "respond:a", "respond:b", "exit:b:Completed", "exit:a:Completed"]
    );
}

#[tokio::test]
async fn http_errors_complete_the_request() {
    let log = Events::default();
    let app = app_with(vec![Recorder::new("a", &log)]);

    let reply = call(&app, "GET", "/missing").await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert!(reply.body.contains("<h1>Not Found</h1>"));

    let reply = call(&app, "POST", "/").await;
    assert_eq!(reply.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(reply.headers[header::ALLOW], "GET, HEAD");

    assert_eq!(events(&log).last().map(String::as_str), Some("exit:a:Completed"));
    assert!(!events(&log).iter().any(|e| e.ends_with("Failed")));
}

#[tokio::test]
async fn internal_errors_fail_the_request() {
    let log = Events::default();
    let app = app_with(vec![Recorder::new("a", &log)]);

    let reply = call(&app, "GET", "/boom").await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!reply.body.contains("boom"));
    assert_eq!(events(&log).last().map(String::as_str), Some("exit:a:Failed"));
}

#[tokio::test]
async fn failed_enter_only_exits_entered_components() {
    let log = Events::default();
    let mut refusing = Recorder::new("b", &log);
    refusing.fail_enter = true;
    let app = app_with(vec![Recorder::new("a", &log), refusing, Recorder::new("c", &log)]);

    let reply = call(&app, "GET", "/").await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(events(&log), ["enter:a", "enter:b", "exit:a:Failed"]);
}

#[tokio::test]
async fn exit_errors_replace_the_response() {
    let log = Events::default();
    let mut refusing = Recorder::new("b", &log);
    refusing.fail_exit = true;
    let app = app_with(vec![Recorder::new("a", &log), refusing]);

    let reply = call(&app, "GET", "/").await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(&events(&log)[4..], ["exit:b:Completed", "exit:a:Completed"]);
}

#[tokio::test]
async fn handlers_see_their_environment_on_the_stack() {
    let app = Application::builder(Settings::named("Test"))
        .route(routing::get("/depth").endpoint("depth"), || async {
            let env = local::current()?;
            Ok::<_, Error>(format!("{} {}", local::depth(), env.endpoint().unwrap_or("-")))
        })
        .build()
        .unwrap();

    assert_eq!(call(&app, "GET", "/depth").await.body, "1 depth");
}

#[tokio::test]
async fn custom_error_handler() {
    let app = Application::builder(Settings::named("Test"))
        .error_handler(|_env, err| {
            ramverk_kernel::Response::new(format!("oops {}", err.status().as_u16())).with_status(err.status())
        })
        .build()
        .unwrap();

    let reply = call(&app, "GET", "/").await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body, "oops 404");
}

#[tokio::test]
async fn contextbound_brackets_without_dispatch() {
    let log = Events::default();
    let app = app_with(vec![Recorder::new("a", &log)]);

    let path = app
        .contextbound(ramverk_kernel::Request::get("/").unwrap(), |env| async move {
            assert_eq!(local::depth(), 1);
            env.path("index", [("q", "x")])
        })
        .await
        .unwrap();
    assert_eq!(path, "/?q=x");
    assert_eq!(events(&log), ["enter:a", "exit:a:Completed"]);

    let failed: Result<(), Error> =
        app.contextbound(ramverk_kernel::Request::get("/").unwrap(), |_| async { Err("nope".into()) }).await;
    assert!(failed.is_err());
    assert_eq!(events(&log).last().map(String::as_str), Some("exit:a:Failed"));
}

#[ramverk_derive::extension]
struct Motto {
    text: String,
}

#[ramverk_derive::extension]
struct Uninstalled {}

#[tokio::test]
async fn extensions_are_injected() {
    let motto = Motto::new(MottoInner { text: "Keep it small".to_owned() });
    let app = Application::builder(Settings::named("Test"))
        .extension(motto)
        .route(routing::get("/motto").endpoint("motto"), |motto: ramverk_kernel::Ext<Motto>| async move {
            motto.text.clone()
        })
        .route(routing::get("/missing").endpoint("missing"), |_: ramverk_kernel::Ext<Uninstalled>| async { "unreachable" })
        .build()
        .unwrap();

    assert_eq!(call(&app, "GET", "/motto").await.body, "Keep it small");
    assert!(app.extension::<Motto>().is_some());
    assert_eq!(call(&app, "GET", "/missing").await.status, StatusCode::INTERNAL_SERVER_ERROR);
}
