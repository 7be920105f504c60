use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::PaymentProcessorError;

pub const DEFAULT_SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Verifies a `Stripe-Signature` header (`t=<timestamp>,v1=<hex hmac>,...`) against the raw request body.
///
/// The signed payload is `<timestamp>.<body>`. Any of the `v1` signatures may match, which allows Stripe to roll
/// secrets. Signatures older than `tolerance_secs` relative to `now` are rejected.
pub fn verify_webhook_signature(
    payload: &[u8],
    sig_header: &str,
    secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> Result<(), PaymentProcessorError> {
    let invalid = |msg: &str| PaymentProcessorError::InvalidSignature(msg.to_string());
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in sig_header.split(',') {
        let part = part.trim();
        if let Some(t) = part.strip_prefix("t=") {
            timestamp = Some(t);
        } else if let Some(v) = part.strip_prefix("v1=") {
            signatures.push(v);
        }
    }
    let timestamp = timestamp.ok_or_else(|| invalid("Missing timestamp"))?;
    if signatures.is_empty() {
        return Err(invalid("Missing v1 signature"));
    }
    let ts = timestamp.parse::<i64>().map_err(|_| invalid("Invalid timestamp"))?;
    if (now - ts).abs() > tolerance_secs {
        return Err(invalid("Timestamp outside the tolerance window"));
    }
    let matched = signatures.into_iter().filter_map(|s| hex::decode(s).ok()).any(|sig| {
        let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
            return false;
        };
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);
        mac.verify_slice(&sig).is_ok()
    });
    if matched {
        Ok(())
    } else {
        Err(invalid("Signature mismatch"))
    }
}
