use std::str::FromStr;

use base64::Engine;
use zeroize::ZeroizeOnDrop;

use super::primitives::{self, HMAC_KEY_SIZE, HMAC_SIZE};

/// Errors that can occur when parsing a domain-separation key
#[derive(Debug, thiserror::Error)]
pub enum HmacKeyError {
    #[error("invalid hmac key size, expected {expected}, got {got}")]
    Size { expected: usize, got: usize },
    #[error("hmac key is neither hex nor base64")]
    Encoding,
}

/// A network-wide shared secret mixed into every signature
///
/// Signing with an `HmacKey` signs `hmac(msg, key)` instead of `msg`, so the
/// resulting signatures only verify for peers holding the same key. This
/// keeps e.g. test networks from replaying messages onto the main network.
///
/// Keys can be built from raw bytes, base64 text or hex text. The "no key"
/// case is `Option::None`; [`HmacKey::parse_optional`] maps empty input to
/// it.
#[derive(Clone, PartialEq, Eq, ZeroizeOnDrop)]
pub struct HmacKey([u8; HMAC_KEY_SIZE]);

impl std::fmt::Debug for HmacKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("HmacKey(..)")
    }
}

impl From<[u8; HMAC_KEY_SIZE]> for HmacKey {
    fn from(bytes: [u8; HMAC_KEY_SIZE]) -> Self {
        HmacKey(bytes)
    }
}

impl TryFrom<&[u8]> for HmacKey {
    type Error = HmacKeyError;
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; HMAC_KEY_SIZE] = bytes.try_into().map_err(|_| HmacKeyError::Size {
            expected: HMAC_KEY_SIZE,
            got: bytes.len(),
        })?;
        Ok(HmacKey(bytes))
    }
}

impl FromStr for HmacKey {
    type Err = HmacKeyError;

    /// Hex when the text is exactly a hex-encoded key, base64 otherwise
    ///
    /// A trailing `.<suffix>` on base64 input is ignored, so tagged keys are
    /// accepted as well.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() == HMAC_KEY_SIZE * 2 {
            if let Ok(key) = Self::from_hex(s) {
                return Ok(key);
            }
        }
        Self::from_base64(s)
    }
}

impl HmacKey {
    /// Parse a key from a hexadecimal string
    ///
    /// Accepts both plain hex and "0x"-prefixed hex strings.
    pub fn from_hex(hex: &str) -> Result<Self, HmacKeyError> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        let mut buff = [0; HMAC_KEY_SIZE];
        hex::decode_to_slice(hex, &mut buff).map_err(|_| HmacKeyError::Encoding)?;
        Ok(HmacKey(buff))
    }

    /// Parse a key from base64, with or without a `.<suffix>` tag
    pub fn from_base64(text: &str) -> Result<Self, HmacKeyError> {
        let encoded = text.split_once('.').map_or(text, |(encoded, _)| encoded);
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|_| HmacKeyError::Encoding)?;
        Self::try_from(bytes.as_slice())
    }

    /// Parse a key where empty input means "no key"
    pub fn parse_optional(s: &str) -> Result<Option<Self>, HmacKeyError> {
        if s.trim().is_empty() {
            return Ok(None);
        }
        s.parse().map(Some)
    }

    pub fn bytes(&self) -> &[u8; HMAC_KEY_SIZE] {
        &self.0
    }

    /// Authenticate `msg` under this key
    pub fn authenticate(&self, msg: &[u8]) -> [u8; HMAC_SIZE] {
        primitives::hmac(msg, &self.0)
    }
}
