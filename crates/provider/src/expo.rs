//! Push gateway backed by the Expo push HTTP API.
//!
//! ```ignore
//! let gateway = ExpoPushGateway::new(EXPO_PUSH_URL, Duration::from_secs(10))?;
//! gateway.send(&message).await?;
//! ```

use crate::PushGateway;
use async_trait::async_trait;
use beacon_core::error::{BeaconError, BeaconResult};
use beacon_core::PushMessage;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const EXPO_PUSH_URL: &str = "https://exp.host/--/api/v2/push/send";

/// Sends one message per request to the Expo push service.
#[derive(Debug, Clone)]
pub struct ExpoPushGateway {
    endpoint: String,
    access_token: Option<String>,
    client: reqwest::Client,
}

/// Request body for a single Expo push message.
#[derive(Debug, Serialize)]
struct ExpoMessage<'a> {
    to: &'a str,
    title: &'a str,
    body: &'a str,
    sound: &'static str,
    priority: &'static str,
}

#[derive(Debug, Deserialize)]
struct ExpoResponse {
    #[serde(default)]
    data: Option<ExpoTicket>,
    #[serde(default)]
    errors: Vec<ExpoError>,
}

#[derive(Debug, Deserialize)]
struct ExpoTicket {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ExpoError {
    #[serde(default)]
    code: Option<String>,
    message: String,
}

impl ExpoPushGateway {
    /// `timeout` bounds each HTTP request, connect included.
    pub fn new(endpoint: &str, timeout: Duration) -> BeaconResult<Self> {
        let parsed = url::Url::parse(endpoint)
            .map_err(|e| BeaconError::InvalidInput(format!("push endpoint {endpoint}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(BeaconError::InvalidInput(format!(
                "push endpoint must be http(s): {endpoint}"
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BeaconError::Gateway(format!("failed to build HTTP client: {e}")))?;

        tracing::info!(endpoint, timeout_ms = timeout.as_millis() as u64, "expo gateway ready");

        Ok(Self {
            endpoint: endpoint.to_string(),
            access_token: None,
            client,
        })
    }

    /// Bearer token for projects with enhanced push security enabled.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }
}

#[async_trait]
impl PushGateway for ExpoPushGateway {
    async fn send(&self, message: &PushMessage) -> BeaconResult<()> {
        let payload = ExpoMessage {
            to: &message.token,
            title: &message.title,
            body: &message.body,
            sound: "default",
            priority: "high",
        };

        let mut request = self.client.post(&self.endpoint).json(&payload);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| BeaconError::Gateway(format!("request failed: {e}")))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| BeaconError::Gateway(format!("failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(BeaconError::Gateway(format!("HTTP {status}: {text}")));
        }

        check_ticket(&text)
    }
}

/// Interprets a 2xx Expo response body. An `error` ticket is a failure even
/// though the HTTP exchange succeeded.
fn check_ticket(body: &str) -> BeaconResult<()> {
    let resp: ExpoResponse = match serde_json::from_str(body) {
        Ok(r) => r,
        Err(e) => {
            tracing::debug!(error = %e, "unparseable expo response, trusting HTTP status");
            return Ok(());
        }
    };

    if let Some(err) = resp.errors.first() {
        let code = err.code.as_deref().unwrap_or("UNKNOWN");
        return Err(BeaconError::Gateway(format!("{code}: {}", err.message)));
    }

    match resp.data {
        Some(ticket) if ticket.status == "error" => {
            let detail = ticket
                .details
                .as_ref()
                .and_then(|d| d.get("error"))
                .and_then(|e| e.as_str())
                .unwrap_or("error");
            Err(BeaconError::Gateway(format!(
                "{detail}: {}",
                ticket.message.as_deref().unwrap_or("push rejected")
            )))
        }
        _ => Ok(()),
    }
}
