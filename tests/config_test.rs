//! Configuration loading tests

use secrecy::ExposeSecret;
use std::io::Write;
use tempfile::NamedTempFile;
use zha_exporter::config::{Config, Overrides};

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("Failed to create temp file");
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn path(file: &NamedTempFile) -> &str {
    file.path().to_str().unwrap()
}

#[test]
fn test_default_config_file_loads() {
    let config = Config::load("config/Default.toml").expect("Failed to load default config");
    assert_eq!(config.homeassistant.port, 8123);
}

#[test]
fn test_full_config() {
    // Given: A config file setting every option
    let file = config_file(
        r#"
        [homeassistant]
        hostname = "hass.lan"
        port = 8443
        token = "abc"
        use_tls = true
        verify_ssl = false
        request_timeout_seconds = 5

        [metrics]
        scrape_interval_seconds = 15
        "#,
    );

    // When: Loading
    let config = Config::load(path(&file)).expect("Failed to load config");

    // Then: All values are taken from the file
    let hass = &config.homeassistant;
    assert_eq!(hass.hostname, "hass.lan");
    assert_eq!(hass.port, 8443);
    assert_eq!(hass.token.expose_secret(), "abc");
    assert!(hass.use_tls);
    assert!(!hass.verify_ssl);
    assert_eq!(hass.request_timeout().as_secs(), 5);
    assert_eq!(hass.websocket_url(), "wss://hass.lan:8443/api/websocket");
    assert_eq!(config.metrics.scrape_interval_seconds, 15);
}

#[test]
fn test_defaults_apply() {
    // Given: Only a token
    let file = config_file("[homeassistant]\ntoken = \"abc\"\n");

    // When: Loading
    let config = Config::load(path(&file)).unwrap();

    // Then: Defaults fill the rest
    assert_eq!(config.homeassistant.hostname, "homeassistant.local");
    assert_eq!(config.homeassistant.port, 8123);
    assert!(!config.homeassistant.use_tls);
    assert!(config.homeassistant.verify_ssl);
    assert_eq!(config.homeassistant.request_timeout_seconds, 30);
    assert_eq!(config.metrics.scrape_interval_seconds, 60);
    assert_eq!(
        config.homeassistant.websocket_url(),
        "ws://homeassistant.local:8123/api/websocket"
    );
}

#[test]
fn test_port_as_string() {
    let file = config_file("[homeassistant]\nport = \"8124\"\ntoken = \"abc\"\n");

    let config = Config::load(path(&file)).unwrap();

    assert_eq!(config.homeassistant.port, 8124);
}

#[test]
fn test_invalid_port_rejected() {
    for port in ["\"not-a-port\"", "70000", "0"] {
        let file = config_file(&format!("[homeassistant]\nport = {}\ntoken = \"abc\"\n", port));

        let result = Config::load(path(&file));

        assert!(result.is_err(), "port {} should be rejected", port);
    }
}

#[test]
fn test_zero_intervals_rejected() {
    // Given: A zero read timeout, then a zero scrape interval
    for body in [
        "[homeassistant]\ntoken = \"abc\"\nrequest_timeout_seconds = 0\n",
        "[homeassistant]\ntoken = \"abc\"\n[metrics]\nscrape_interval_seconds = 0\n",
    ] {
        let file = config_file(body);

        // When: Loading
        let err = Config::load(path(&file)).unwrap_err();

        // Then: The offending setting is named
        assert!(format!("{:#}", err).contains("_seconds must be at least 1"), "{:#}", err);
    }
}

#[test]
fn test_missing_section_is_reported() {
    let file = config_file("[metrics]\nscrape_interval_seconds = 10\n");

    let err = Config::load(path(&file)).unwrap_err();

    assert!(format!("{:#}", err).contains("homeassistant"));
}

#[test]
fn test_missing_token_is_reported() {
    let file = config_file("[homeassistant]\nhostname = \"hass.lan\"\n");

    let err = Config::load(path(&file)).unwrap_err();

    assert!(format!("{:#}", err).contains("token"));
}

#[test]
fn test_unknown_key_is_rejected() {
    let file = config_file("[homeassistant]\ntoken = \"abc\"\napi_key = \"typo\"\n");

    assert!(Config::load(path(&file)).is_err());
}

#[test]
fn test_overrides_take_precedence() {
    // Given: A file and command-line overrides
    let file = config_file("[homeassistant]\nhostname = \"file.lan\"\nport = 1000\ntoken = \"file\"\n");
    let overrides = Overrides {
        hostname: Some("cli.lan".to_string()),
        port: Some(2000),
        token: Some("cli".to_string()),
    };

    // When: Loading with overrides
    let config = Config::load_with_overrides(path(&file), overrides).unwrap();

    // Then: The command line wins
    assert_eq!(config.homeassistant.hostname, "cli.lan");
    assert_eq!(config.homeassistant.port, 2000);
    assert_eq!(config.homeassistant.token.expose_secret(), "cli");
}

#[test]
fn test_overrides_without_file() {
    let overrides = Overrides {
        token: Some("cli".to_string()),
        ..Default::default()
    };

    let config = Config::load_with_overrides("does/not/exist.toml", overrides).unwrap();

    assert_eq!(config.homeassistant.hostname, "homeassistant.local");
    assert_eq!(config.homeassistant.token.expose_secret(), "cli");
}

#[test]
fn test_token_is_not_printed() {
    let file = config_file("[homeassistant]\ntoken = \"super-secret\"\n");

    let config = Config::load(path(&file)).unwrap();

    assert!(!format!("{:?}", config).contains("super-secret"));
}
