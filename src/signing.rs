//! HMAC request signing for the platform APIs.
//!
//! Every request carries an `Authorization` header derived from the API key
//! pair, the request target and a fresh nonce/timestamp.

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use url::Url;
use uuid::Uuid;

use crate::credentials::ApiCredentials;

type HmacSha256 = Hmac<Sha256>;

pub const AUTH_SCHEME: &str = "VERACODE-HMAC-SHA-256";
const REQUEST_VERSION: &[u8] = b"vcode_request_version_1";

/// Computes `Authorization` header values for outgoing requests
pub struct HmacSigner {
    key_id: String,
    key_secret: Vec<u8>,
}

impl HmacSigner {
    pub fn new(credentials: &ApiCredentials) -> Result<Self> {
        let key_secret = hex::decode(credentials.signing_secret())
            .context("API key secret is not a valid hex string")?;

        Ok(Self {
            key_id: credentials.signing_key_id().to_string(),
            key_secret,
        })
    }

    /// Header value for a request issued now
    pub fn authorization(&self, method: &str, url: &Url) -> Result<String> {
        let nonce = Uuid::new_v4().into_bytes();
        let timestamp = Utc::now().timestamp_millis();
        self.authorization_at(method, url, timestamp, &nonce)
    }

    fn authorization_at(
        &self,
        method: &str,
        url: &Url,
        timestamp: i64,
        nonce: &[u8],
    ) -> Result<String> {
        let host = url
            .host_str()
            .ok_or_else(|| anyhow!("Cannot sign request without a host: {}", url))?;

        let mut target = url.path().to_string();
        if let Some(query) = url.query() {
            target.push('?');
            target.push_str(query);
        }

        let data = format!(
            "id={}&host={}&url={}&method={}",
            self.key_id, host, target, method
        );

        let key_nonce = hmac(&self.key_secret, nonce)?;
        let key_date = hmac(&key_nonce, timestamp.to_string().as_bytes())?;
        let signature_key = hmac(&key_date, REQUEST_VERSION)?;
        let signature = hex::encode(hmac(&signature_key, data.as_bytes())?);

        Ok(format!(
            "{} id={},ts={},nonce={},sig={}",
            AUTH_SCHEME,
            self.key_id,
            timestamp,
            hex::encode(nonce),
            signature
        ))
    }
}

fn hmac(key: &[u8], message: &[u8]) -> Result<Vec<u8>> {
    let mut mac =
        HmacSha256::new_from_slice(key).map_err(|e| anyhow!("Invalid HMAC key: {}", e))?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}
