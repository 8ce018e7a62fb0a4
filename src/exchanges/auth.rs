//! Request signing for authenticated Coinstore endpoints
//!
//! The venue signs the URL-encoded parameter string (insertion order
//! preserved, timestamp appended last before signing) with HMAC-SHA256
//! and expects the lowercase hex digest plus an API-key header.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::constants::API_KEY_HEADER;

type HmacSha256 = Hmac<Sha256>;

pub struct CoinstoreAuth {
    api_key: String,
    secret_key: String,
}

impl CoinstoreAuth {
    pub fn new(api_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            secret_key: secret_key.into(),
        }
    }

    /// Append the millisecond timestamp and the signature over the full
    /// parameter list. Returns the augmented parameters ready to send.
    pub fn add_auth_to_params(
        &self,
        params: &[(String, String)],
        timestamp_ms: u64,
    ) -> Vec<(String, String)> {
        let mut signed: Vec<(String, String)> = params.to_vec();
        signed.push(("timestamp".to_string(), timestamp_ms.to_string()));
        let signature = self.generate_signature(&signed);
        signed.push(("signature".to_string(), signature));
        signed
    }

    /// HMAC-SHA256 over the canonical query string, lowercase hex.
    /// Pure function of (params, secret); no hidden state.
    pub fn generate_signature(&self, params: &[(String, String)]) -> String {
        let encoded = canonical_query(params);
        let mut mac = HmacSha256::new_from_slice(self.secret_key.as_bytes())
            .expect("HMAC key can be any size");
        mac.update(encoded.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Header identifying the API key on authenticated requests
    pub fn auth_header(&self) -> (&'static str, &str) {
        (API_KEY_HEADER, &self.api_key)
    }
}

/// URL-encode parameters preserving insertion order
fn canonical_query(params: &[(String, String)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .finish()
}
