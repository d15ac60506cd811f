//! Webhook signature verification

use crate::error::{Error, Result};
use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Check the hex HMAC-SHA1 of `body` carried in `header`.
///
/// `Ok(false)` means the signature decoded but does not match. The
/// comparison is constant-time.
pub fn verify_signature(
    headers: &[(String, String)],
    header: &str,
    body: &[u8],
    secret: &str,
) -> Result<bool> {
    let signature = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(header))
        .map(|(_, v)| v.trim())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::MissingSignature {
            header: header.to_string(),
        })?;

    let expected = hex::decode(signature).map_err(|e| Error::InvalidSignature {
        message: e.to_string(),
    })?;

    let mut mac = HmacSha1::new_from_slice(secret.as_bytes()).map_err(|e| Error::InvalidSignature {
        message: e.to_string(),
    })?;
    mac.update(body);

    Ok(mac.verify_slice(&expected).is_ok())
}

/// Hex HMAC-SHA1 of `body`, as providers compute it
pub fn sign(body: &[u8], secret: &str) -> Result<String> {
    let mut mac = HmacSha1::new_from_slice(secret.as_bytes()).map_err(|e| Error::InvalidSignature {
        message: e.to_string(),
    })?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}
