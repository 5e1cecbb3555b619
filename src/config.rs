use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::notify::NotifyConfig;

const DEFAULT_STREAM_URL: &str = "stub://front_door";
const DEFAULT_STREAM_FPS: u32 = 10;
const DEFAULT_STREAM_WIDTH: u32 = 640;
const DEFAULT_STREAM_HEIGHT: u32 = 480;
const DEFAULT_OUTPUT_ROOT: &str = "homewatch_output";
const DEFAULT_STATE_FILE: &str = "/tmp/homewatch_last_notify";
const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.37;
const DEFAULT_NOTIFY_INTERVAL_SECS: u64 = 30;
const DEFAULT_NOTIFY_IMAGE: &str = "/media/homewatch/person.jpg";
const DEFAULT_NOTIFY_CLICK_ACTION: &str = "/camera-proxy/ingress";

#[derive(Debug, Deserialize, Default)]
struct HomewatchConfigFile {
    stream: Option<StreamConfigFile>,
    output_root: Option<String>,
    state_file: Option<String>,
    detection: Option<DetectionConfigFile>,
    notify: Option<NotifyConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct StreamConfigFile {
    url: Option<String>,
    target_fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectionConfigFile {
    confidence_threshold: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct NotifyConfigFile {
    interval_secs: Option<u64>,
    image: Option<String>,
    click_action: Option<String>,
}

#[derive(Debug, Clone)]
pub struct HomewatchConfig {
    pub stream: StreamSettings,
    pub output_root: PathBuf,
    pub state_file: PathBuf,
    pub confidence_threshold: f32,
    pub notify_interval: Duration,
    pub notify: NotifyConfig,
}

#[derive(Debug, Clone)]
pub struct StreamSettings {
    pub url: String,
    pub target_fps: u32,
    pub width: u32,
    pub height: u32,
}

impl HomewatchConfig {
    /// Load configuration from the optional JSON file named by
    /// `HOMEWATCH_CONFIG`, apply environment overrides, then validate.
    ///
    /// The two secrets (`HOMEWATCH_API_URL`, `HOMEWATCH_AUTH_TOKEN`) come
    /// from the environment only; a missing secret fails the load.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("HOMEWATCH_CONFIG").ok().map(PathBuf::from);
        Self::load_from(config_path.as_deref())
    }

    /// Like `load`, with an explicit config file path (e.g. from the
    /// daemon's command line).
    pub fn load_from(config_path: Option<&Path>) -> Result<Self> {
        let file_cfg = match config_path {
            Some(path) => Some(read_config_file(path)?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: HomewatchConfigFile) -> Result<Self> {
        let api_url = std::env::var("HOMEWATCH_API_URL")
            .map_err(|_| anyhow!("HOMEWATCH_API_URL must be set"))?;
        let auth_token = std::env::var("HOMEWATCH_AUTH_TOKEN")
            .map_err(|_| anyhow!("HOMEWATCH_AUTH_TOKEN must be set"))?;

        let stream = StreamSettings {
            url: file
                .stream
                .as_ref()
                .and_then(|stream| stream.url.clone())
                .unwrap_or_else(|| DEFAULT_STREAM_URL.to_string()),
            target_fps: file
                .stream
                .as_ref()
                .and_then(|stream| stream.target_fps)
                .unwrap_or(DEFAULT_STREAM_FPS),
            width: file
                .stream
                .as_ref()
                .and_then(|stream| stream.width)
                .unwrap_or(DEFAULT_STREAM_WIDTH),
            height: file
                .stream
                .as_ref()
                .and_then(|stream| stream.height)
                .unwrap_or(DEFAULT_STREAM_HEIGHT),
        };
        let output_root = PathBuf::from(
            file.output_root
                .unwrap_or_else(|| DEFAULT_OUTPUT_ROOT.to_string()),
        );
        let state_file = PathBuf::from(
            file.state_file
                .unwrap_or_else(|| DEFAULT_STATE_FILE.to_string()),
        );
        let confidence_threshold = file
            .detection
            .as_ref()
            .and_then(|detection| detection.confidence_threshold)
            .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD);
        let notify_interval = Duration::from_secs(
            file.notify
                .as_ref()
                .and_then(|notify| notify.interval_secs)
                .unwrap_or(DEFAULT_NOTIFY_INTERVAL_SECS),
        );
        let notify = NotifyConfig {
            api_url,
            auth_token,
            image: file
                .notify
                .as_ref()
                .and_then(|notify| notify.image.clone())
                .unwrap_or_else(|| DEFAULT_NOTIFY_IMAGE.to_string()),
            click_action: file
                .notify
                .and_then(|notify| notify.click_action)
                .unwrap_or_else(|| DEFAULT_NOTIFY_CLICK_ACTION.to_string()),
        };

        Ok(Self {
            stream,
            output_root,
            state_file,
            confidence_threshold,
            notify_interval,
            notify,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var("HOMEWATCH_STREAM_URL") {
            if !url.trim().is_empty() {
                self.stream.url = url;
            }
        }
        if let Ok(root) = std::env::var("HOMEWATCH_OUTPUT_ROOT") {
            if !root.trim().is_empty() {
                self.output_root = PathBuf::from(root);
            }
        }
        if let Ok(path) = std::env::var("HOMEWATCH_STATE_FILE") {
            if !path.trim().is_empty() {
                self.state_file = PathBuf::from(path);
            }
        }
        if let Ok(threshold) = std::env::var("HOMEWATCH_CONFIDENCE_THRESHOLD") {
            let parsed: f32 = threshold.parse().map_err(|_| {
                anyhow!("HOMEWATCH_CONFIDENCE_THRESHOLD must be a number in 0..1")
            })?;
            self.confidence_threshold = parsed;
        }
        if let Ok(interval) = std::env::var("HOMEWATCH_NOTIFY_INTERVAL_SECS") {
            let seconds: u64 = interval.parse().map_err(|_| {
                anyhow!("HOMEWATCH_NOTIFY_INTERVAL_SECS must be an integer number of seconds")
            })?;
            self.notify_interval = Duration::from_secs(seconds);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.confidence_threshold) {
            return Err(anyhow!("confidence_threshold must be within 0..1"));
        }
        if self.notify_interval.as_secs() == 0 {
            return Err(anyhow!("notify interval must be greater than zero"));
        }
        let parsed = url::Url::parse(&self.notify.api_url)
            .map_err(|e| anyhow!("HOMEWATCH_API_URL is not a valid URL: {}", e))?;
        match parsed.scheme() {
            "http" | "https" => Ok(()),
            other => Err(anyhow!(
                "HOMEWATCH_API_URL scheme '{}' is not http(s)",
                other
            )),
        }
    }
}

fn read_config_file(path: &Path) -> Result<HomewatchConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
