//! Inbound gateway webhook verification
//!
//! The gateway signs callback payloads with HMAC-SHA256 over the raw bytes
//! using a shared secret. Verification uses a constant-time comparison; a
//! payload is treated as unverified when the signature is missing, malformed,
//! mismatched, or the secret is unconfigured.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

/// Webhook verification settings, supplied by the host application
#[derive(Debug, Clone, Default)]
pub struct WebhookConfig {
    /// Shared HMAC secret; `None` means unconfigured
    pub secret: Option<String>,

    /// Whether this is a production context
    pub production: bool,
}

/// Outcome of verifying a webhook payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookVerification {
    /// Signature matched
    Verified,

    /// Payload must not be trusted
    Unverified { reason: String },
}

impl WebhookVerification {
    fn unverified(reason: &str) -> Self {
        WebhookVerification::Unverified {
            reason: reason.to_string(),
        }
    }
}

/// Verify a webhook payload against its signature header
///
/// The signature is hex-encoded HMAC-SHA256 of the raw payload bytes, with
/// an optional `sha256=` prefix. Comparison is constant-time.
pub fn verify_webhook(
    config: &WebhookConfig,
    payload: &[u8],
    signature: Option<&str>,
) -> WebhookVerification {
    let secret = match &config.secret {
        Some(secret) => secret,
        None => {
            if config.production {
                warn!("webhook secret unconfigured in production, rejecting payload");
            } else {
                warn!("webhook secret unconfigured, payload treated as unverified");
            }
            return WebhookVerification::unverified("webhook secret unconfigured");
        }
    };

    let signature = match signature {
        Some(sig) => sig.trim_start_matches("sha256="),
        None => {
            warn!("webhook received without signature");
            return WebhookVerification::unverified("missing signature");
        }
    };

    let provided = match hex::decode(signature) {
        Ok(bytes) => bytes,
        Err(_) => return WebhookVerification::unverified("malformed signature"),
    };

    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return WebhookVerification::unverified("unusable secret"),
    };
    mac.update(payload);

    // verify_slice is the constant-time comparison.
    match mac.verify_slice(&provided) {
        Ok(()) => WebhookVerification::Verified,
        Err(_) => WebhookVerification::unverified("signature mismatch"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, payload: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    fn config(secret: Option<&str>, production: bool) -> WebhookConfig {
        WebhookConfig {
            secret: secret.map(|s| s.to_string()),
            production,
        }
    }

    #[test]
    fn test_valid_signature_verifies() {
        let payload = br#"{"transactionId":"gw_1","status":"success"}"#;
        let sig = sign("topsecret", payload);

        let result = verify_webhook(&config(Some("topsecret"), true), payload, Some(&sig));
        assert_eq!(result, WebhookVerification::Verified);
    }

    #[test]
    fn test_sha256_prefix_accepted() {
        let payload = b"payload";
        let sig = format!("sha256={}", sign("topsecret", payload));

        let result = verify_webhook(&config(Some("topsecret"), true), payload, Some(&sig));
        assert_eq!(result, WebhookVerification::Verified);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let payload = b"payload";
        let sig = sign("other", payload);

        let result = verify_webhook(&config(Some("topsecret"), true), payload, Some(&sig));
        assert!(matches!(result, WebhookVerification::Unverified { .. }));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let sig = sign("topsecret", b"original");

        let result = verify_webhook(&config(Some("topsecret"), true), b"tampered", Some(&sig));
        assert!(matches!(result, WebhookVerification::Unverified { .. }));
    }

    #[test]
    fn test_missing_signature_rejected() {
        let result = verify_webhook(&config(Some("topsecret"), true), b"payload", None);
        assert!(matches!(result, WebhookVerification::Unverified { .. }));
    }

    #[test]
    fn test_unconfigured_secret_rejected_in_production() {
        let sig = sign("topsecret", b"payload");
        let result = verify_webhook(&config(None, true), b"payload", Some(&sig));
        assert_eq!(
            result,
            WebhookVerification::Unverified {
                reason: "webhook secret unconfigured".to_string()
            }
        );
    }

    #[test]
    fn test_malformed_hex_rejected() {
        let result = verify_webhook(
            &config(Some("topsecret"), true),
            b"payload",
            Some("not-hex!"),
        );
        assert_eq!(
            result,
            WebhookVerification::Unverified {
                reason: "malformed signature".to_string()
            }
        );
    }
}
