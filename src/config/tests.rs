use super::load_config;
use super::settings::Settings;
use crate::broker::DeliveryPolicy;
use serial_test::serial;
use std::env;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

const RELAY_VARS: [&str; 5] = [
    "HOST",
    "PORT",
    "RELAY_SERVER__PORT",
    "RELAY_RELAY__PING_INTERVAL_MS",
    "RELAY_RELAY__SELF_DELIVERY",
];

#[test]
fn test_default_settings() {
    let settings = Settings::default();
    assert_eq!(settings.server.host, "0.0.0.0");
    assert_eq!(settings.server.port, 4444);
    assert_eq!(settings.server.addr(), "0.0.0.0:4444");
    assert_eq!(settings.relay.ping_interval(), Duration::from_secs(30));
    assert_eq!(settings.relay.self_delivery, DeliveryPolicy::ExcludePublisher);
    assert_eq!(settings.log.level, "info");
}

#[test]
fn test_ping_interval_never_zero() {
    let mut settings = Settings::default();
    settings.relay.ping_interval_ms = 0;
    assert_eq!(settings.relay.ping_interval(), Duration::from_millis(1));
}

#[test]
#[serial]
fn load_config_without_sources_uses_defaults() {
    temp_env::with_vars_unset(RELAY_VARS, || {
        let cfg = load_config().expect("load_config failed");
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.server.port, 4444);
        assert_eq!(cfg.relay.ping_interval_ms, 30_000);
    });
}

#[test]
#[serial]
fn load_config_reads_host_and_port() {
    temp_env::with_vars_unset(RELAY_VARS, || {
        temp_env::with_vars([("HOST", Some("127.0.0.1")), ("PORT", Some("9100"))], || {
            let cfg = load_config().expect("load_config failed");
            assert_eq!(cfg.server.host, "127.0.0.1");
            assert_eq!(cfg.server.port, 9100);
        });
    });
}

#[test]
#[serial]
fn load_config_reads_prefixed_relay_settings() {
    temp_env::with_vars_unset(RELAY_VARS, || {
        temp_env::with_vars(
            [
                ("RELAY_RELAY__PING_INTERVAL_MS", Some("1500")),
                ("RELAY_RELAY__SELF_DELIVERY", Some("include_publisher")),
            ],
            || {
                let cfg = load_config().expect("load_config failed");
                assert_eq!(cfg.relay.ping_interval(), Duration::from_millis(1500));
                assert_eq!(cfg.relay.self_delivery, DeliveryPolicy::IncludePublisher);
            },
        );
    });
}

#[test]
#[serial]
fn load_config_rejects_zero_ping_interval() {
    temp_env::with_vars_unset(RELAY_VARS, || {
        temp_env::with_var("RELAY_RELAY__PING_INTERVAL_MS", Some("0"), || {
            assert!(load_config().is_err());
        });
    });
}

#[test]
#[serial]
fn load_config_from_file_overrides_defaults() {
    // load_config looks for config/default.* relative to the cwd
    let tmp = TempDir::new().expect("create tempdir");
    let orig = env::current_dir().expect("current_dir");
    env::set_current_dir(tmp.path()).expect("set current dir");

    fs::create_dir_all("config").expect("create config dir");
    let toml = r#"
        [server]
        host = "10.0.0.5"
        port = 9000

        [relay]
        ping_interval_ms = 250
        self_delivery = "include_publisher"

        [log]
        level = "debug"
    "#;
    fs::write("config/default.toml", toml).expect("write config file");

    let result = temp_env::with_vars_unset(RELAY_VARS, || {
        let from_file = load_config();
        let with_port = temp_env::with_var("PORT", Some("9001"), load_config);
        (from_file, with_port)
    });

    env::set_current_dir(orig).expect("restore cwd");

    let (from_file, with_port) = result;
    let cfg = from_file.expect("load_config failed");
    assert_eq!(cfg.server.host, "10.0.0.5");
    assert_eq!(cfg.server.port, 9000);
    assert_eq!(cfg.relay.ping_interval_ms, 250);
    assert_eq!(cfg.relay.self_delivery, DeliveryPolicy::IncludePublisher);
    assert_eq!(cfg.log.level, "debug");

    // PORT wins over the file
    let cfg = with_port.expect("load_config failed");
    assert_eq!(cfg.server.host, "10.0.0.5");
    assert_eq!(cfg.server.port, 9001);
}
