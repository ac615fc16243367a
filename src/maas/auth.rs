//! MAAS Authentication
//!
//! MAAS API keys are OAuth 1.0 credentials (`consumer:key:secret`) signed
//! with the PLAINTEXT method. The consumer secret is always empty.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// OAuth credentials parsed from a MAAS API key
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub consumer_key: String,
    pub token_key: String,
    token_secret: String,
}

impl Credentials {
    pub fn new(consumer_key: &str, token_key: &str, token_secret: &str) -> Self {
        Self {
            consumer_key: consumer_key.to_string(),
            token_key: token_key.to_string(),
            token_secret: token_secret.to_string(),
        }
    }

    /// PLAINTEXT signature: `<consumer_secret>&<token_secret>`
    fn signature(&self) -> String {
        format!("&{}", urlencoding::encode(&self.token_secret))
    }

    /// Build a fresh `Authorization` header value.
    ///
    /// A new nonce and timestamp are generated on every call, so the header
    /// must be rebuilt per request.
    pub fn authorization_header(&self) -> String {
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        let timestamp = chrono::Utc::now().timestamp().to_string();

        let fields = [
            ("oauth_nonce", nonce),
            ("oauth_timestamp", timestamp),
            ("oauth_version", "1.0".to_string()),
            ("oauth_signature_method", "PLAINTEXT".to_string()),
            ("oauth_consumer_key", self.consumer_key.clone()),
            ("oauth_token", self.token_key.clone()),
            ("oauth_signature", self.signature()),
        ];

        let encoded: Vec<String> = fields
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", k, urlencoding::encode(v)))
            .collect();

        format!("OAuth realm=\"\", {}", encoded.join(", "))
    }
}

impl FromStr for Credentials {
    type Err = Error;

    fn from_str(api_key: &str) -> Result<Self> {
        let parts: Vec<&str> = api_key.trim().split(':').collect();
        match parts.as_slice() {
            [consumer, key, secret] if !consumer.is_empty() && !key.is_empty() => {
                Ok(Self::new(consumer, key, secret))
            }
            _ => Err(Error::InvalidApiKey),
        }
    }
}

// Security: never print the token secret
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("consumer_key", &self.consumer_key)
            .field("token_key", &self.token_key)
            .field("token_secret", &"***")
            .finish()
    }
}
