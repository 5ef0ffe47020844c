//! Payment confirmation signatures
//!
//! After checkout the payment gateway hands the client an order id, a
//! payment id and a signature. The signature is the hex HMAC-SHA256 of
//! `"{order_id}|{payment_id}"` keyed with the merchant secret; a payment is
//! only trusted when the signature recomputes exactly.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{debug, warn};

use crate::error::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// Fields returned by the gateway after a successful checkout
#[derive(Debug, Clone)]
pub struct PaymentConfirmation {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
}

/// Reject blank fields; the value itself is used exactly as given
fn require<'a>(value: &'a str, field: &'static str) -> Result<&'a str> {
    if value.trim().is_empty() {
        return Err(Error::MissingField(field));
    }
    Ok(value)
}

fn signing_mac(order_id: &str, payment_id: &str, secret: &str) -> Result<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| Error::InvalidOption(format!("unusable signing secret: {}", e)))?;
    mac.update(order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    Ok(mac)
}

/// Hex HMAC-SHA256 of `"{order_id}|{payment_id}"`
pub fn expected_signature(order_id: &str, payment_id: &str, secret: &str) -> Result<String> {
    let mac = signing_mac(order_id, payment_id, secret)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Check a payment confirmation against the merchant secret
///
/// Returns `Ok(false)` for a well-formed confirmation whose signature does
/// not match, and an error when a field or the secret is missing.
pub fn verify_payment_signature(confirmation: &PaymentConfirmation, secret: &str) -> Result<bool> {
    let order_id = require(&confirmation.order_id, "order id")?;
    let payment_id = require(&confirmation.payment_id, "payment id")?;
    let signature = require(&confirmation.signature, "signature")?;
    let secret = require(secret, "signing secret")?;

    let mac = signing_mac(order_id, payment_id, secret)?;

    // Only the exact lowercase hex form matches; the byte comparison is
    // constant time
    let lowercase_hex = signature
        .bytes()
        .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
    let verified = lowercase_hex
        && match hex::decode(signature) {
            Ok(bytes) => mac.verify_slice(&bytes).is_ok(),
            Err(_) => false,
        };

    if verified {
        debug!(order_id, payment_id, "payment signature verified");
    } else {
        warn!(order_id, payment_id, "payment signature mismatch");
    }
    Ok(verified)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test_secret";

    fn confirmation(signature: String) -> PaymentConfirmation {
        PaymentConfirmation {
            order_id: "order_9A33XWu170gUtm".to_string(),
            payment_id: "pay_29QQoUBi66xm2f".to_string(),
            signature,
        }
    }

    #[test]
    fn test_signature_covers_both_ids() {
        let mut mac = HmacSha256::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(b"order_1|pay_1");
        let manual = hex::encode(mac.finalize().into_bytes());

        assert_eq!(expected_signature("order_1", "pay_1", SECRET).unwrap(), manual);
        assert_eq!(manual.len(), 64);
        assert_ne!(expected_signature("order_1", "pay_2", SECRET).unwrap(), manual);
    }

    #[test]
    fn test_valid_signature_verifies() {
        let c = confirmation(String::new());
        let sig = expected_signature(&c.order_id, &c.payment_id, SECRET).unwrap();
        assert!(verify_payment_signature(&confirmation(sig), SECRET).unwrap());
    }

    #[test]
    fn test_tampered_signature_fails() {
        let c = confirmation(String::new());
        let sig = expected_signature(&c.order_id, "pay_other", SECRET).unwrap();
        assert!(!verify_payment_signature(&confirmation(sig), SECRET).unwrap());
        assert!(!verify_payment_signature(&confirmation("zz".to_string()), SECRET).unwrap());
    }

    #[test]
    fn test_signature_must_match_exactly() {
        let c = confirmation(String::new());
        let sig = expected_signature(&c.order_id, &c.payment_id, SECRET).unwrap();

        let upper = confirmation(sig.to_uppercase());
        assert!(!verify_payment_signature(&upper, SECRET).unwrap());

        let padded = PaymentConfirmation {
            order_id: format!(" {} ", c.order_id),
            ..confirmation(sig)
        };
        assert!(!verify_payment_signature(&padded, SECRET).unwrap());
    }

    #[test]
    fn test_missing_fields_are_errors() {
        let err = verify_payment_signature(&confirmation(String::new()), SECRET).unwrap_err();
        assert!(matches!(err, Error::MissingField("signature")));
        let err = verify_payment_signature(&confirmation("ab".to_string()), "").unwrap_err();
        assert!(matches!(err, Error::MissingField("signing secret")));
    }
}
