use ramverk_domain::config::{SecurityConfig, ServerConfig, Settings, StorageConfig};
use serde_json::json;
use std::path::PathBuf;

#[test]
fn config_defaults_are_sane() {
    let server = ServerConfig::default();
    assert_eq!(server.port, 8008);
    assert!(server.server_name.is_none());

    let security = SecurityConfig::default();
    assert_eq!(security.secret_key_bytes, 256);
    assert_eq!(security.session_cookie, "session");

    let storage = StorageConfig::default();
    assert_eq!(storage.static_dir, PathBuf::from("static"));
    assert_eq!(storage.static_path, "/static");
    assert!(!storage.memory);
}

#[test]
fn settings_deserialize_with_partial_sections() {
    let raw = json!({
        "name": "Greeter",
        "debug": true,
        "server": { "port": 9000, "server_name": "example.org" },
        "storage": { "data_dir": "/tmp/data" }
    });

    let settings: Settings = serde_json::from_value(raw).expect("settings deserialize");
    assert_eq!(settings.name, "Greeter");
    assert!(settings.debug);
    assert_eq!(settings.module, "app");
    assert_eq!(settings.server.port, 9000);
    assert_eq!(settings.server.server_name.as_deref(), Some("example.org"));
    assert_eq!(settings.storage.templates_dir, PathBuf::from("templates"));
}

#[test]
fn database_path_defaults_to_lowercased_name() {
    let mut settings = Settings::named("Greeter");
    settings.storage.data_dir = PathBuf::from("/srv");
    assert_eq!(settings.database_path(), PathBuf::from("/srv/greeter.db"));

    settings.storage.database = Some(PathBuf::from("custom.db"));
    assert_eq!(settings.database_path(), PathBuf::from("/srv/custom.db"));
}

#[test]
fn clones_share_until_mutated() {
    let base = Settings::named("Shared");
    let mut copy = base.clone();
    copy.debug = true;
    assert!(!base.debug);
    assert!(copy.debug);
}
