use std::{env, fs};

use mitzmock_config::loader::load_config;

#[test]
fn config_parsing_and_env_overrides_and_validation() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("mitzmock.toml");

    let toml_content = r#"
[server]
host = "127.0.0.1"
port = 9443
cert_path = "certs/server.crt"
key_path = "certs/server.key"

[saml]
enabled = true
signing_cert_path = "certs/client.crt"
expected_issuer = "urn:mitz:testclient"
clock_skew_seconds = 10

[logging]
level = "debug"
"#;
    fs::write(&path, toml_content).expect("write toml");

    // 1) Valid config parses
    let cfg = load_config(path.to_str()).expect("should parse config");
    assert_eq!(cfg.server.port, 9443);
    assert!(cfg.saml.enabled);
    assert_eq!(cfg.saml.expected_issuer, "urn:mitz:testclient");
    assert_eq!(cfg.saml.clock_skew_seconds, 10);
    assert_eq!(cfg.logging.level, "debug");

    // 2) Env override should win over file
    unsafe {
        env::set_var("MITZMOCK__SAML__CLOCK_SKEW_SECONDS", "30");
    }
    let cfg_env = load_config(path.to_str()).expect("should parse config with env overrides");
    assert_eq!(cfg_env.saml.clock_skew_seconds, 30);
    unsafe {
        env::remove_var("MITZMOCK__SAML__CLOCK_SKEW_SECONDS");
    }

    // 3) Missing file falls back to defaults
    let cfg_default = load_config(Some(dir.path().join("absent.toml").to_str().unwrap()))
        .expect("defaults should validate");
    assert_eq!(cfg_default.server.port, 8443);

    // 4) Invalid config (mTLS without CA bundle) should error
    let invalid_path = dir.path().join("invalid.toml");
    let invalid_toml = r#"
[server]
mtls_enabled = true
ca_cert_path = ""
"#;
    fs::write(&invalid_path, invalid_toml).expect("write invalid toml");
    let err = load_config(invalid_path.to_str()).expect_err("expected validation error");
    assert!(err.contains("ca_cert_path"));
}
