//! Correlation token codec.
//!
//! The upstream authorization flow echoes back exactly one opaque field, so
//! the store handle and the target domain travel together inside it, joined
//! by a double underscore (natural identifiers never contain one).

use regex::Regex;
use std::sync::OnceLock;

use crate::error::Error;

static DOMAIN_PATTERN: OnceLock<Regex> = OnceLock::new();

/// Trailing domain: one or more dot-separated labels ending in an alphabetic
/// TLD of at least two characters. Labels carry no digits so a handle ending
/// in digits cannot bleed into the recovered domain.
fn domain_pattern() -> &'static Regex {
    DOMAIN_PATTERN
        .get_or_init(|| Regex::new(r"(?:[A-Za-z-]+\.)+[A-Za-z]{2,}$").expect("valid pattern"))
}

/// Decoded correlation token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedToken {
    pub handle: String,
    pub domain: String,
}

pub fn encode(handle: &str, domain: &str) -> String {
    format!("{}__{}", handle, domain)
}

/// Decode a correlation token.
///
/// Splits on the first `__`. When the separator did not survive the redirect,
/// a trailing-domain match recovers the domain and the remainder becomes the
/// handle, stripped to `[A-Za-z0-9_-]`. With no recoverable domain the
/// handshake must abort; a store identity is never guessed.
pub fn decode(token: &str) -> Result<DecodedToken, Error> {
    if let Some((handle, domain)) = token.split_once("__") {
        if !handle.is_empty() && !domain.is_empty() {
            return Ok(DecodedToken {
                handle: handle.to_string(),
                domain: domain.to_string(),
            });
        }
    }

    if let Some(found) = domain_pattern().find(token) {
        let handle: String = token[..found.start()]
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
            .collect();
        return Ok(DecodedToken {
            handle,
            domain: found.as_str().to_string(),
        });
    }

    Err(Error::Validation(
        "correlation token does not identify a store".to_string(),
    ))
}
