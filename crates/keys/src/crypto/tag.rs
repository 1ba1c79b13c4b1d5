//! Tagged textual encoding of binary values
//!
//! Every key, signature, hash and sealed box that crosses the network is
//! written as `<base64>.<suffix>`, where the suffix names the curve, hash or
//! encoding. Identifiers additionally carry a one-character sigil in front:
//!
//! ```text
//! @FCX/tsDLpubCPKKfIrw4gc+SQkHcaD17s7GI6i/ziWY=.ed25519
//! ^ sigil  ^ base64 public key                  ^ suffix
//! ```

use std::fmt;

use base64::Engine;

use super::primitives;

/// Errors raised while encoding or decoding tags
#[derive(Debug, thiserror::Error)]
pub enum TagError {
    #[error("no suffix given for tag")]
    MissingSuffix,
    #[error("value is not text, it may already be decoded")]
    AlreadyDecoded,
    #[error("malformed tag: {0}")]
    Malformed(String),
}

/// The leading character of an identifier, marking what it names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sigil {
    /// `@`, a feed (peer identity)
    Feed,
    /// `%`, a message
    Message,
    /// `&`, a blob
    Blob,
}

impl Sigil {
    pub fn as_char(&self) -> char {
        match self {
            Sigil::Feed => '@',
            Sigil::Message => '%',
            Sigil::Blob => '&',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '@' => Some(Sigil::Feed),
            '%' => Some(Sigil::Message),
            '&' => Some(Sigil::Blob),
            _ => None,
        }
    }

    /// The sigil `s` starts with, if any
    pub fn of(s: &str) -> Option<Self> {
        s.chars().next().and_then(Self::from_char)
    }
}

impl fmt::Display for Sigil {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Whether `s` starts with one of `@`, `%` or `&`
pub fn has_sigil(s: &str) -> bool {
    Sigil::of(s).is_some()
}

/// Encode `bytes` as `<base64>.<suffix>`
///
/// A leading `.` on the suffix is dropped, so `"sig.ed25519"` and
/// `".sig.ed25519"` produce the same tag.
pub fn encode(bytes: impl AsRef<[u8]>, suffix: &str) -> Result<String, TagError> {
    let suffix = suffix.strip_prefix('.').unwrap_or(suffix);
    if suffix.is_empty() {
        return Err(TagError::MissingSuffix);
    }
    Ok(format!(
        "{}.{}",
        base64::engine::general_purpose::STANDARD.encode(bytes.as_ref()),
        suffix
    ))
}

/// Decode the base64 part of a tag, dropping an optional sigil and the suffix
///
/// Input that is not valid UTF-8 is rejected with [`TagError::AlreadyDecoded`]:
/// it is raw bytes, not a tag.
pub fn decode(tag: impl AsRef<[u8]>) -> Result<Vec<u8>, TagError> {
    let tag = std::str::from_utf8(tag.as_ref()).map_err(|_| TagError::AlreadyDecoded)?;
    let body = strip_sigil(tag);
    let (encoded, _) = body
        .split_once('.')
        .ok_or_else(|| TagError::Malformed(format!("no suffix separator in {:?}", tag)))?;
    if encoded.is_empty() {
        return Err(TagError::Malformed("empty base64 segment".to_string()));
    }
    base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| TagError::Malformed(e.to_string()))
}

/// Everything after the first `.`, or `None` when there is no separator
pub fn suffix_of(tag: &str) -> Option<&str> {
    tag.split_once('.').map(|(_, suffix)| suffix)
}

/// Drop a leading sigil, if present
pub fn strip_sigil(s: &str) -> &str {
    match Sigil::of(s) {
        Some(_) => &s[1..],
        None => s,
    }
}

/// Build the feed identifier for a public key
///
/// Self-identifying curves use the tagged public key directly:
/// `@<base64>.<curve>`. Every other curve predates that form and is
/// identified by the hash of its tagged public key: `@<sha256>.sha256`.
pub fn derive_identifier(
    curve_name: &str,
    public: &[u8],
    self_identifying: bool,
) -> Result<String, TagError> {
    let tagged = encode(public, curve_name)?;
    if self_identifying {
        Ok(format!("{}{}", Sigil::Feed, tagged))
    } else {
        Ok(format!("{}{}", Sigil::Feed, primitives::hash(tagged)))
    }
}
