//! The shipped config/default.toml must load and match the documented defaults.

use std::path::Path;

use paysoko_assistant::config::{self, EnvOverrides};
use paysoko_assistant::subsystems::comms::TONES;

#[test]
fn test_default_config_loads() {
    let cfg = config::load_from(Path::new("config/default.toml"), &EnvOverrides::default())
        .expect("default config should parse");

    assert_eq!(cfg.name, "paysoko-assistant");
    assert_eq!(cfg.llm.provider, "anthropic");
    assert!(cfg.comms_http_should_load());
    assert!(!cfg.comms_pty_should_load());
    assert_eq!(cfg.comms.http.bind, "127.0.0.1:8000");
    assert_eq!(cfg.graph.neo4j.database, "neo4j");
    assert_eq!(cfg.qa.indexes.location, "locationIndex");
    assert!(cfg.qa.log_file.ends_with("qa_logs.csv"));
    assert!(!cfg.work_dir.to_string_lossy().starts_with('~'));
}

#[test]
fn test_default_tone_is_offered() {
    let cfg = config::load_from(Path::new("config/default.toml"), &EnvOverrides::default()).unwrap();
    assert!(TONES.contains(&cfg.qa.default_tone.as_str()));
}

#[test]
fn test_env_overrides_apply() {
    let overrides = EnvOverrides {
        neo4j_uri: Some("http://graph.internal:7474".into()),
        neo4j_username: Some("neo4j".into()),
        neo4j_password: Some("secret".into()),
        llm_api_key: Some("sk-test".into()),
        ..Default::default()
    };
    let cfg = config::load_from(Path::new("config/default.toml"), &overrides).unwrap();
    assert_eq!(cfg.graph.neo4j.uri, "http://graph.internal:7474");
    assert_eq!(cfg.graph.neo4j.password.as_deref(), Some("secret"));
    assert_eq!(cfg.llm_api_key.as_deref(), Some("sk-test"));
}
