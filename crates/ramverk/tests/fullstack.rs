use ramverk::domain::config::Settings;
use ramverk::features::FULLSTACK;
use ramverk::fullstack::{self, Options};
use ramverk::storage::Storage as _;

fn memory_settings() -> Settings {
    let mut settings = Settings::named("Test");
    settings.storage.memory = true;
    settings
}

#[tokio::test]
async fn components_are_installed_in_order() {
    let app = fullstack::builder(memory_settings()).await.unwrap().build().unwrap();
    assert_eq!(app.components().collect::<Vec<_>>(), FULLSTACK);
    assert!(app.rules().any(|rule| rule.endpoint_name() == Some("static") && rule.is_build_only()));
}

#[tokio::test]
async fn sessions_are_optional() {
    let app = fullstack::builder_with(memory_settings(), Options { sessions: false }).await.unwrap().build().unwrap();
    assert!(!app.components().any(|name| name == "sessions"));
}

#[tokio::test]
async fn databases_live_under_the_data_dir() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = Settings::named("Greeter");
    settings.storage.data_dir = dir.path().join("data");

    let storage = fullstack::storage(&settings).await.unwrap();
    assert_eq!(storage.name(), "greeter.db");
    assert!(dir.path().join("data").is_dir());
}
