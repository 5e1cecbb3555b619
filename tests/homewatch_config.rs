use std::sync::Mutex;
use std::time::Duration;

use tempfile::NamedTempFile;

use homewatch::config::HomewatchConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "HOMEWATCH_CONFIG",
        "HOMEWATCH_API_URL",
        "HOMEWATCH_AUTH_TOKEN",
        "HOMEWATCH_STREAM_URL",
        "HOMEWATCH_OUTPUT_ROOT",
        "HOMEWATCH_STATE_FILE",
        "HOMEWATCH_CONFIDENCE_THRESHOLD",
        "HOMEWATCH_NOTIFY_INTERVAL_SECS",
    ] {
        std::env::remove_var(key);
    }
}

fn set_secrets() {
    std::env::set_var("HOMEWATCH_API_URL", "https://hass.local:8123/api/notify");
    std::env::set_var("HOMEWATCH_AUTH_TOKEN", "secret-token");
}

#[test]
fn missing_secrets_fail_fast() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    assert!(HomewatchConfig::load().is_err());

    std::env::set_var("HOMEWATCH_API_URL", "https://hass.local:8123/api/notify");
    assert!(HomewatchConfig::load().is_err());

    std::env::set_var("HOMEWATCH_AUTH_TOKEN", "secret-token");
    assert!(HomewatchConfig::load().is_ok());

    clear_env();
}

#[test]
fn defaults_are_applied_without_config_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();
    set_secrets();

    let cfg = HomewatchConfig::load().expect("load config");

    assert_eq!(cfg.stream.url, "stub://front_door");
    assert_eq!(cfg.stream.target_fps, 10);
    assert_eq!(cfg.confidence_threshold, 0.37);
    assert_eq!(cfg.notify_interval, Duration::from_secs(30));
    assert_eq!(cfg.notify.auth_token, "secret-token");

    clear_env();
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();
    set_secrets();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "stream": {
            "url": "rtsp://camera-1:554/stream",
            "target_fps": 12,
            "width": 800,
            "height": 600
        },
        "output_root": "/var/lib/homewatch",
        "state_file": "/var/lib/homewatch/last_notify",
        "detection": {
            "confidence_threshold": 0.5
        },
        "notify": {
            "interval_secs": 60,
            "image": "/media/front.jpg",
            "click_action": "/camera/front"
        }
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("HOMEWATCH_CONFIG", file.path());
    std::env::set_var("HOMEWATCH_STREAM_URL", "rtsp://camera-2:554/stream");
    std::env::set_var("HOMEWATCH_NOTIFY_INTERVAL_SECS", "45");

    let cfg = HomewatchConfig::load().expect("load config");

    assert_eq!(cfg.stream.url, "rtsp://camera-2:554/stream");
    assert_eq!(cfg.stream.target_fps, 12);
    assert_eq!(cfg.stream.width, 800);
    assert_eq!(cfg.stream.height, 600);
    assert_eq!(cfg.output_root.to_string_lossy(), "/var/lib/homewatch");
    assert_eq!(cfg.confidence_threshold, 0.5);
    assert_eq!(cfg.notify_interval, Duration::from_secs(45));
    assert_eq!(cfg.notify.image, "/media/front.jpg");
    assert_eq!(cfg.notify.click_action, "/camera/front");

    clear_env();
}

#[test]
fn rejects_invalid_threshold_and_interval() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();
    set_secrets();

    std::env::set_var("HOMEWATCH_CONFIDENCE_THRESHOLD", "1.5");
    assert!(HomewatchConfig::load().is_err());
    std::env::remove_var("HOMEWATCH_CONFIDENCE_THRESHOLD");

    std::env::set_var("HOMEWATCH_NOTIFY_INTERVAL_SECS", "0");
    assert!(HomewatchConfig::load().is_err());

    clear_env();
}

#[test]
fn rejects_non_http_api_url() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();
    std::env::set_var("HOMEWATCH_API_URL", "ftp://hass.local/notify");
    std::env::set_var("HOMEWATCH_AUTH_TOKEN", "secret-token");

    assert!(HomewatchConfig::load().is_err());

    clear_env();
}
