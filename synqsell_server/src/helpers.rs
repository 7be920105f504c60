use actix_web::HttpRequest;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::errors::ServerError;

type HmacSha256 = Hmac<Sha256>;

/// The base64-encoded HMAC-SHA256 of `data`, the form Shopify puts in the `X-Shopify-Hmac-Sha256` header.
pub fn calculate_hmac(secret: &str, data: &[u8]) -> String {
    // Hmac accepts keys of any length, so this cannot fail
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::default(),
    };
    mac.update(data);
    base64::encode(mac.finalize().into_bytes())
}

/// Reads a header as a trimmed, non-empty string.
pub fn required_header(req: &HttpRequest, name: &str) -> Result<String, ServerError> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ServerError::MissingHeader(name.to_string()))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn shopify_hmac() {
        // Signature produced by `echo -n 'hello' | openssl dgst -sha256 -hmac secret -binary | base64`
        assert_eq!(calculate_hmac("secret", b"hello"), "iKqz7ejTrflNJquQ07r9SiCDBww7zOnAFO4EpEOEfAs=");
        assert_ne!(calculate_hmac("other", b"hello"), calculate_hmac("secret", b"hello"));
    }
}
