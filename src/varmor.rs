//! Versioned text armoring for envelopes
//!
//! The armored format is `ecodec1:` followed by the base64url (no padding)
//! encoding of the binary envelope. It is:
//! - Free of whitespace (including newlines)
//! - Safe to embed in URLs
//! - Safe to pass unescaped in a POSIX shell
//!
//! A binary envelope starts with its version byte (0x01), so armored and
//! binary input can be told apart by the first byte alone.

use crate::error::{EcodecError, ErrorCategory, ErrorKind, Result};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};

/// Magic prefix shared by all armor versions
const MAGIC_PREFIX: &str = "ecodec";

/// Version 1 magic marker
const V1_MAGIC: &str = "ecodec1:";

/// Wrap an envelope in armor, returning the armored string
pub fn wrap(body: &[u8]) -> String {
    let encoded = URL_SAFE_NO_PAD.encode(body);
    format!("{}{}", V1_MAGIC, encoded)
}

/// Whether `data` looks like armored input rather than a binary envelope.
pub fn is_armored(data: &[u8]) -> bool {
    data.starts_with(MAGIC_PREFIX.as_bytes())
}

/// Unwrap an armored string, returning the original bytes
pub fn unwrap(armored: &str) -> Result<Vec<u8>> {
    if armored.len() < V1_MAGIC.len() {
        return Err(EcodecError::with_kind(
            ErrorCategory::User,
            ErrorKind::ArmoringInvalid,
            "input size smaller than magic marker; likely truncated",
        ));
    }

    if let Some(encoded) = armored.strip_prefix(V1_MAGIC) {
        URL_SAFE_NO_PAD.decode(encoded.trim_end()).map_err(|e| {
            EcodecError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::ArmoringDecode,
                format!("base64 decoding failed: {}", e),
                e,
            )
        })
    } else if armored.starts_with(MAGIC_PREFIX) {
        Err(EcodecError::with_kind(
            ErrorCategory::User,
            ErrorKind::ArmoringFromFuture,
            "input claims to be ecodec armor, but not a version we support",
        ))
    } else {
        Err(EcodecError::with_kind(
            ErrorCategory::User,
            ErrorKind::ArmoringInvalid,
            "input unrecognized as ecodec armor",
        ))
    }
}
