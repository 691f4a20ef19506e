//! Gateway that logs instead of delivering. Backs the CLI's `--dry-run`.

use crate::PushGateway;
use async_trait::async_trait;
use beacon_core::error::BeaconResult;
use beacon_core::PushMessage;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct LogGateway {
    sent: AtomicUsize,
}

impl LogGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages accepted so far.
    pub fn sent(&self) -> usize {
        self.sent.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl PushGateway for LogGateway {
    async fn send(&self, message: &PushMessage) -> BeaconResult<()> {
        self.sent.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            token = %redact(&message.token),
            title = %message.title,
            body = %message.body,
            "dry run: push not sent"
        );
        Ok(())
    }
}

/// Keeps the token family visible, hides the device part.
fn redact(token: &str) -> String {
    match token.find('[') {
        Some(i) => format!("{}[…]", &token[..i]),
        None => "…".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn counts_messages() {
        let gw = LogGateway::new();
        let msg = PushMessage {
            token: "ExponentPushToken[secret]".into(),
            title: "t".into(),
            body: "b".into(),
        };
        gw.send(&msg).await.unwrap();
        gw.send(&msg).await.unwrap();
        assert_eq!(gw.sent(), 2);
    }

    #[test]
    fn redacts_device_part() {
        assert_eq!(redact("ExponentPushToken[secret]"), "ExponentPushToken[…]");
        assert_eq!(redact("raw"), "…");
    }
}
