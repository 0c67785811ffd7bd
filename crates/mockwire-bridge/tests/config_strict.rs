#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::time::Duration;

use mockwire_bridge::config;
use mockwire_bridge::engine::MemoryStore;

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
bridge:
  listen: "127.0.0.1:7878"
  call_timeot_ms: 500 # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.code().as_str(), "BAD_REQUEST");
}

#[test]
fn ok_minimal_config() {
    let cfg = config::load_from_str("version: 1\n").expect("must parse");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.bridge.listen, "127.0.0.1:7878");
    assert_eq!(cfg.bridge.call_timeout(), Some(Duration::from_millis(30000)));
    assert!(cfg.interception.default_domain_enabled);
    assert!(cfg.store.rules_file.is_none());
}

#[test]
fn zero_timeout_disables_it() {
    let cfg = config::load_from_str("version: 1\nbridge:\n  call_timeout_ms: 0\n").unwrap();
    assert_eq!(cfg.bridge.call_timeout(), None);
}

#[test]
fn rejects_wrong_version() {
    let err = config::load_from_str("version: 2\n").expect_err("must fail");
    assert_eq!(err.code().as_str(), "UNSUPPORTED_VERSION");
}

#[test]
fn rejects_idle_not_above_ping() {
    let bad = r#"
version: 1
bridge:
  ping_interval_ms: 30000
  idle_timeout_ms: 30000
"#;
    let err = config::load_from_str(bad).expect_err("must fail");
    assert!(err.to_string().contains("idle_timeout_ms"));
}

#[test]
fn full_config() {
    let ok = r#"
version: 1
bridge:
  listen: "0.0.0.0:9000"
  call_timeout_ms: 1500
  max_frame_bytes: 4096
  channel_capacity: 16
interception:
  default_domain_enabled: false
store:
  rules_file: "rules.yaml"
"#;
    let cfg = config::load_from_str(ok).unwrap();
    assert_eq!(cfg.bridge.max_frame_bytes, 4096);
    assert!(!cfg.interception.default_domain_enabled);
    assert_eq!(cfg.store.rules_file.as_deref(), Some("rules.yaml"));
}

#[test]
fn shipped_sample_files_load() {
    let root = concat!(env!("CARGO_MANIFEST_DIR"), "/../..");
    let cfg = config::load_from_file(&format!("{root}/mockwire.yaml")).unwrap();
    let rules = cfg.store.rules_file.expect("sample names a rules file");
    MemoryStore::load_seed_file(&format!("{root}/{rules}")).unwrap();
}
