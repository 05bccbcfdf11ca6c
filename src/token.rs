//! Opaque stream tokens: an embed URL, percent-encoded then base64'd, so that
//! adapters and logs carry a transport-safe handle instead of a raw URL.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Url;

use crate::error::{Error, Result};

pub fn encode(url: &str) -> String {
    STANDARD.encode(urlencoding::encode(url).as_bytes())
}

pub fn decode(token: &str) -> Result<Url> {
    // Query-string parsing turns '+' into ' '; put them back.
    let token = token.trim().replace(' ', "+");

    let bytes = STANDARD
        .decode(token.as_bytes())
        .map_err(|e| Error::Decode(format!("invalid base64: {}", e)))?;
    let encoded =
        String::from_utf8(bytes).map_err(|e| Error::Decode(format!("invalid UTF-8: {}", e)))?;
    let raw = urlencoding::decode(&encoded)
        .map_err(|e| Error::Decode(format!("invalid percent-encoding: {}", e)))?;

    Url::parse(&raw).map_err(|e| Error::Decode(format!("not an absolute URL ({}): {}", e, raw)))
}
