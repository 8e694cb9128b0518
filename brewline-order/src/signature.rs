//! Payment callback signatures (HMAC-SHA256 over `order_id|payment_id`).

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SignatureError {
    #[error("Signature is not valid hex")]
    Malformed,

    #[error("Payment signature mismatch")]
    Mismatch,

    #[error("HMAC key error")]
    Key,
}

fn mac_for(order_id: &str, payment_id: &str, secret: &str) -> Result<HmacSha256, SignatureError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::Key)?;
    mac.update(order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    Ok(mac)
}

/// Hex signature the gateway attaches to a successful payment.
pub fn sign_payment(order_id: &str, payment_id: &str, secret: &str) -> Result<String, SignatureError> {
    let mac = mac_for(order_id, payment_id, secret)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time check of a widget-supplied signature.
pub fn verify_payment_signature(
    order_id: &str,
    payment_id: &str,
    signature: &str,
    secret: &str,
) -> Result<(), SignatureError> {
    let expected = hex::decode(signature.trim()).map_err(|_| SignatureError::Malformed)?;
    mac_for(order_id, payment_id, secret)?
        .verify_slice(&expected)
        .map_err(|_| SignatureError::Mismatch)
}
