use base64::engine::{general_purpose, Engine};
use chrono::Utc;
use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;
use tracing::debug;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

/// Signing utilities for requests sent to the notification relay
pub struct RelayAuth;

impl RelayAuth {
    /// Generate a random nonce for relay requests
    pub fn generate_nonce() -> String {
        rand::thread_rng().gen_range(10000000..99999999).to_string()
    }

    /// Get current timestamp for relay requests
    pub fn get_timestamp() -> i64 {
        Utc::now().timestamp()
    }

    /// Sign a relay request.
    ///
    /// The signed content is the method, the key/nonce/timestamp header string,
    /// the path and the body, newline separated. The HMAC-SHA256 digest is hex
    /// encoded and then base64 encoded.
    pub fn generate_signature(
        key_id: &str,
        secret: &str,
        method: &str,
        path: &str,
        timestamp: i64,
        nonce: &str,
        body: &str,
    ) -> String {
        let header_string = format!(
            "X-Relay-Key={}&X-Relay-Nonce={}&X-Relay-Timestamp={}",
            key_id, nonce, timestamp
        );

        let content = format!("{}\n{}\n{}\n{}", method, header_string, path, body);

        debug!("String to sign: {}", content);

        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(content.as_bytes());

        let hex_hash = hex::encode(mac.finalize().into_bytes());
        general_purpose::STANDARD.encode(hex_hash.as_bytes())
    }

    /// Constant-time comparison of a presented trigger token with the configured one.
    pub fn token_matches(presented: Option<&str>, expected: Option<&str>) -> bool {
        let Some(expected) = expected else {
            return true;
        };
        let Some(presented) = presented else {
            return false;
        };

        let (a, b) = (presented.as_bytes(), expected.as_bytes());
        a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
    }
}
