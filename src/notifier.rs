use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info};

use crate::auth::RelayAuth;
use crate::config::NotifierConfig;
use crate::error::NotifyError;

/// Outbound email delivery.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, subject: &str, body: &str) -> Result<(), NotifyError>;
}

#[derive(Debug, Serialize)]
struct RelayMessage<'a> {
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

/// Sends mail through an HTTP relay, signing every request with HMAC-SHA256
pub struct RelayNotifier {
    client: Client,
    config: NotifierConfig,
}

impl RelayNotifier {
    pub fn new(config: NotifierConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn encode_message(&self, subject: &str, body: &str) -> Result<String, NotifyError> {
        let payload = serde_json::to_string(&RelayMessage {
            to: &self.config.recipient,
            subject,
            text: body,
        })?;
        Ok(payload)
    }
}

#[async_trait]
impl Notifier for RelayNotifier {
    async fn send(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        let method = "POST";
        let path = "/v1/messages";
        let url = format!("{}{}", self.config.endpoint.trim_end_matches('/'), path);

        let payload = self.encode_message(subject, body)?;

        let timestamp = RelayAuth::get_timestamp();
        let nonce = RelayAuth::generate_nonce();
        let signature = RelayAuth::generate_signature(
            &self.config.key_id,
            &self.config.secret,
            method,
            path,
            timestamp,
            &nonce,
            &payload,
        );

        info!("Sending notification '{}' to {}", subject, self.config.recipient);
        debug!("Relay URL: {}", url);

        let res = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("X-Relay-Key", &self.config.key_id)
            .header("X-Relay-Timestamp", timestamp.to_string())
            .header("X-Relay-Nonce", &nonce)
            .header("X-Relay-Signature", signature)
            .body(payload)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(NotifyError::Status {
                status: status.as_u16(),
                body,
            });
        }

        info!("Notification accepted with status: {}", status);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn notifier() -> RelayNotifier {
        RelayNotifier::new(NotifierConfig {
            endpoint: "http://relay.test".to_string(),
            key_id: "key".to_string(),
            secret: "secret".to_string(),
            recipient: "ops@makerspace.test".to_string(),
        })
    }

    #[test]
    fn test_encode_message_carries_every_field() {
        let payload = notifier()
            .encode_message("1 new slot", "Laser Cutter\n\"quoted\"")
            .unwrap();

        let json: Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(json["to"], "ops@makerspace.test");
        assert_eq!(json["subject"], "1 new slot");
        assert_eq!(json["text"], "Laser Cutter\n\"quoted\"");
    }
}
