//! Fan-out tuning knobs shared by the dispatcher and the CLI config layer.

use crate::error::{BeaconError, BeaconResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Token prefix issued by the Expo push service.
pub const DEFAULT_TOKEN_PREFIX: &str = "ExponentPushToken";

pub const DEFAULT_TITLE: &str = "⚠️ Beacon Triggered";

/// `{sender}` is replaced with the triggering user's display name.
pub const DEFAULT_BODY_TEMPLATE: &str = "{sender} has lit their beacon and needs you.";

/// Sequential by default; raise for a bounded worker pool.
const DEFAULT_MAX_CONCURRENT: usize = 1;

const DEFAULT_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub title: String,
    pub body_template: String,
    /// Tokens not starting with this prefix are ineligible.
    pub token_prefix: String,
    /// Max in-flight gateway calls per trigger.
    pub max_concurrent: usize,
    /// Upper bound for a single gateway call.
    pub timeout_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            body_template: DEFAULT_BODY_TEMPLATE.to_string(),
            token_prefix: DEFAULT_TOKEN_PREFIX.to_string(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl DispatchConfig {
    pub fn validate(&self) -> BeaconResult<()> {
        if self.max_concurrent == 0 {
            return Err(BeaconError::Config("max_concurrent must be at least 1".into()));
        }
        if self.timeout_ms == 0 {
            return Err(BeaconError::Config("timeout_ms must be positive".into()));
        }
        if self.token_prefix.trim().is_empty() {
            return Err(BeaconError::Config("token_prefix must not be empty".into()));
        }
        if self.title.trim().is_empty() {
            return Err(BeaconError::Config("title must not be empty".into()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn render_body(&self, sender: &str) -> String {
        self.body_template.replace("{sender}", sender)
    }
}
