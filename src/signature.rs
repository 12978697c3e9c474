//! Payment webhook signature verification.
//!
//! The processor signs each notification with HMAC-SHA256 over
//! `"{timestamp}.{body}"` and sends `t=<unix>,v1=<hex>` in the signature
//! header. Verification fails closed: a notification that cannot be
//! authenticated is never processed.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Accepted clock skew between the processor's timestamp and ours.
const TIMESTAMP_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature header is missing the timestamp")]
    MissingTimestamp,

    #[error("signature header is missing the v1 signature")]
    MissingSignature,

    #[error("signature timestamp outside tolerance")]
    StaleTimestamp,

    #[error("signature does not match payload")]
    Mismatch,
}

/// Verifies a `t=...,v1=...` signature header against the raw request body.
///
/// `now_unix` is passed in by the caller so reconciliation stays clock-free
/// and the tolerance window is testable.
pub fn verify_signature(
    secret: &str,
    payload: &str,
    signature_header: &str,
    now_unix: i64,
) -> Result<(), SignatureError> {
    let mut timestamp: Option<i64> = None;
    let mut provided: Option<&str> = None;

    for part in signature_header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => provided = Some(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::MissingTimestamp)?;
    let provided = provided.ok_or(SignatureError::MissingSignature)?;

    if (now_unix - timestamp).abs() > TIMESTAMP_TOLERANCE_SECS {
        return Err(SignatureError::StaleTimestamp);
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| SignatureError::Mismatch)?;
    mac.update(format!("{timestamp}.{payload}").as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());

    if !constant_time_eq::constant_time_eq(expected.as_bytes(), provided.as_bytes()) {
        return Err(SignatureError::Mismatch);
    }

    Ok(())
}

/// Computes the signature header value for a payload. Used by tests and by
/// local tooling that emulates the processor.
pub fn sign_payload(secret: &str, payload: &str, timestamp: i64) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(format!("{timestamp}.{payload}").as_bytes());
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}
