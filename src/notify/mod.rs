//! Mobile notification delivery.
//!
//! `Notifier` posts a fixed JSON payload to the configured endpoint with a
//! bearer credential. `Alerter` combines it with the durable `RateLimiter`:
//! a send is suppressed inside the debounce window, and a qualifying
//! attempt advances the stored timestamp whether or not the send succeeds.
//!
//! Nothing in this module may propagate an error to the detection loop; a
//! flapping endpoint must not stop frame processing.

use anyhow::{anyhow, Result};

mod debounce;

pub use debounce::RateLimiter;

/// Message body sent with every notification.
pub const NOTIFY_MESSAGE: &str = "Motion[Person] Detected";

/// Notification endpoint settings. The image/url fields are static
/// configuration for the mobile client, not derived from the detection.
#[derive(Debug, Clone)]
pub struct NotifyConfig {
    pub api_url: String,
    pub auth_token: String,
    pub image: String,
    pub click_action: String,
}

/// Sends one notification per call to the configured endpoint.
pub struct Notifier {
    config: NotifyConfig,
    agent: ureq::Agent,
}

impl Notifier {
    pub fn new(config: NotifyConfig) -> Self {
        Self {
            config,
            agent: ureq::agent(),
        }
    }

    /// POST the notification payload. Returns the endpoint's status code;
    /// the status is reported for logging, never interpreted.
    pub fn send(&self) -> Result<u16> {
        let payload = serde_json::json!({
            "message": NOTIFY_MESSAGE,
            "data": {
                "image": self.config.image,
                "url": self.config.click_action,
                "clickAction": self.config.click_action,
            }
        });
        let response = self
            .agent
            .post(&self.config.api_url)
            .set(
                "Authorization",
                &format!("Bearer {}", self.config.auth_token),
            )
            .send_json(payload);
        match response {
            Ok(resp) => Ok(resp.status()),
            Err(ureq::Error::Status(code, _)) => Ok(code),
            Err(ureq::Error::Transport(transport)) => {
                Err(anyhow!("notification transport failed: {}", transport))
            }
        }
    }
}

/// The combined suppress-or-send step invoked once per qualifying
/// detection. Failures are logged and contained here.
pub struct Alerter {
    notifier: Notifier,
    limiter: RateLimiter,
}

impl Alerter {
    pub fn new(notifier: Notifier, limiter: RateLimiter) -> Self {
        Self { notifier, limiter }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Fire a person notification unless the debounce window is still
    /// open. The stored timestamp advances on every attempt, success or
    /// failure.
    pub fn notify_person(&mut self) {
        let now = match crate::now_s() {
            Ok(now) => now,
            Err(e) => {
                log::error!("clock unavailable, skipping notification: {}", e);
                return;
            }
        };

        if !self.limiter.may_notify(now) {
            log::info!(
                "notification suppressed: {}s since last, window is {}s",
                now.saturating_sub(self.limiter.last_notified()),
                self.limiter.min_interval().as_secs()
            );
            return;
        }

        match self.notifier.send() {
            Ok(status) => log::info!("notification sent, endpoint returned {}", status),
            Err(e) => log::warn!("notification send failed: {}", e),
        }

        if let Err(e) = self.limiter.record_attempt(now) {
            log::error!("failed to persist notification state: {}", e);
        }
    }
}
