//! HMAC-SHA256 signatures used by Razorpay.
//!
//! Two schemes, both lowercase hex:
//!
//! - **Checkout**: `HMAC(key_secret, "<order_id>|<payment_id>")`, returned
//!   by the checkout widget as `razorpay_signature`.
//! - **Webhook**: `HMAC(webhook_secret, <raw body>)`, sent in the
//!   `x-razorpay-signature` header.
//!
//! Comparisons are constant time.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the webhook signature.
pub const WEBHOOK_SIGNATURE_HEADER: &str = "x-razorpay-signature";

fn hmac_hex(secret: &str, parts: &[&[u8]]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    for part in parts {
        mac.update(part);
    }
    Some(hex::encode(mac.finalize().into_bytes()))
}

fn matches(expected: Option<String>, provided: &str) -> bool {
    match expected {
        Some(expected) if !provided.is_empty() => {
            constant_time_eq::constant_time_eq(expected.as_bytes(), provided.trim().as_bytes())
        }
        _ => false,
    }
}

/// Checkout signature for an order and payment.
#[must_use]
pub fn sign_payment(key_secret: &str, order_id: &str, payment_id: &str) -> String {
    hmac_hex(
        key_secret,
        &[order_id.as_bytes(), b"|", payment_id.as_bytes()],
    )
    .unwrap_or_default()
}

/// Whether `signature` is the checkout signature for the order and payment.
///
/// ```
/// use clubpass_razorpay::signature::{sign_payment, verify_payment_signature};
///
/// let sig = sign_payment("secret", "order_1", "pay_1");
/// assert!(verify_payment_signature("secret", "order_1", "pay_1", &sig));
/// assert!(!verify_payment_signature("secret", "order_1", "pay_2", &sig));
/// ```
#[must_use]
pub fn verify_payment_signature(
    key_secret: &str,
    order_id: &str,
    payment_id: &str,
    signature: &str,
) -> bool {
    matches(
        hmac_hex(
            key_secret,
            &[order_id.as_bytes(), b"|", payment_id.as_bytes()],
        ),
        signature,
    )
}

/// Webhook signature for a raw body.
#[must_use]
pub fn sign_webhook(webhook_secret: &str, body: &[u8]) -> String {
    hmac_hex(webhook_secret, &[body]).unwrap_or_default()
}

/// Whether `signature` is the webhook signature for `body`.
#[must_use]
pub fn verify_webhook_signature(webhook_secret: &str, body: &[u8], signature: &str) -> bool {
    matches(hmac_hex(webhook_secret, &[body]), signature)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vector() {
        // HMAC-SHA256("key", "The quick brown fox jumps over the lazy dog")
        assert_eq!(
            sign_webhook("key", b"The quick brown fox jumps over the lazy dog"),
            "f7bc83f430538424b13298e6aa6fb143ef4d59a14946175997479dbc2d1a3cd8"
        );
    }

    #[test]
    fn test_payment_signature_covers_both_ids() {
        let sig = sign_payment("secret", "order_1", "pay_1");
        assert_eq!(sig.len(), 64);
        assert!(verify_payment_signature("secret", "order_1", "pay_1", &sig));
        assert!(!verify_payment_signature("secret", "order_2", "pay_1", &sig));
        assert!(!verify_payment_signature("other", "order_1", "pay_1", &sig));
    }

    #[test]
    fn test_separator_is_part_of_message() {
        let sig = sign_payment("secret", "order_1", "pay_1");
        assert_ne!(sig, sign_webhook("secret", b"order_1pay_1"));
        assert_eq!(sig, sign_webhook("secret", b"order_1|pay_1"));
    }

    #[test]
    fn test_webhook_signature() {
        let body = br#"{"event":"payment.captured"}"#;
        let sig = sign_webhook("whsec", body);
        assert!(verify_webhook_signature("whsec", body, &sig));
        assert!(!verify_webhook_signature("wrong", body, &sig));
        assert!(!verify_webhook_signature("whsec", b"{}", &sig));
    }

    #[test]
    fn test_empty_signature_never_matches() {
        assert!(!verify_webhook_signature("whsec", b"", ""));
        assert!(!verify_payment_signature("secret", "", "", ""));
    }
}
