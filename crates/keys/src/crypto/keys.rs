use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use super::curve::{Curve, CurveError, CurveRegistry};
use super::tag::{self, TagError};

/// Errors that can occur when reading key material
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("key error: {0}")]
    Default(#[from] anyhow::Error),
    #[error("keypair has no private key")]
    MissingPrivateKey,
    #[error("invalid {curve} public key size, expected {expected}, got {got}")]
    PublicKeySize {
        curve: String,
        expected: usize,
        got: usize,
    },
    #[error("identifier {got} does not match public key, expected {expected}")]
    IdMismatch { expected: String, got: String },
    #[error("private key does not belong to public key {0}")]
    PrivateKeyMismatch(String),
    #[error("curve error: {0}")]
    Curve(#[from] CurveError),
    #[error("tag error: {0}")]
    Tag(#[from] TagError),
}

/// A peer identity: curve, key bytes and the derived feed identifier
///
/// A keypair without a private half is a valid verify-only identity.
///
/// The X25519 secret used to open sealed boxes is derived on first use and
/// cached inside the value, so repeated unboxing with the same `KeyPair`
/// only pays for the conversion once. The cache never affects equality or
/// serialization.
///
/// # Examples
///
/// ```ignore
/// let keyring = Keyring::default();
/// let keys = keyring.generate(None, None)?;
/// assert!(keys.id().starts_with('@'));
///
/// // JSON form, as stored in key files
/// let json = serde_json::to_string_pretty(&keys)?;
/// let recovered: KeyPair = serde_json::from_str(&json)?;
/// assert_eq!(keys, recovered);
/// ```
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "TaggedKeys", into = "TaggedKeys")]
pub struct KeyPair {
    curve: String,
    public: Vec<u8>,
    private: Option<Vec<u8>>,
    id: String,
    exchange: OnceLock<[u8; 32]>,
}

impl KeyPair {
    /// Assemble a keypair, deriving its identifier through `registry`
    pub fn new(
        registry: &CurveRegistry,
        curve: &str,
        public: Vec<u8>,
        private: Option<Vec<u8>>,
    ) -> Result<Self, KeyError> {
        let resolved = registry.resolve(curve)?;
        check_public_size(curve, resolved.curve, &public)?;
        let id = registry.derive_identifier(curve, &public)?;
        Ok(Self::from_parts(curve.to_string(), public, private, id))
    }

    fn from_parts(curve: String, public: Vec<u8>, private: Option<Vec<u8>>, id: String) -> Self {
        Self {
            curve,
            public,
            private,
            id,
            exchange: OnceLock::new(),
        }
    }

    pub fn curve(&self) -> &str {
        &self.curve
    }

    pub fn public(&self) -> &[u8] {
        &self.public
    }

    pub fn private(&self) -> Option<&[u8]> {
        self.private.as_deref()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn has_private(&self) -> bool {
        self.private.is_some()
    }

    /// The public key as a tag, `<base64>.<curve>`
    pub fn public_tag(&self) -> String {
        // curve names are never empty, see `KeyPair::new` and `TryFrom<TaggedKeys>`
        tag::encode(&self.public, &self.curve).unwrap_or_default()
    }

    /// The private key as a tag, if present
    pub fn private_tag(&self) -> Option<String> {
        self.private
            .as_ref()
            .and_then(|private| tag::encode(private, &self.curve).ok())
    }

    /// A verify-only copy of this identity
    pub fn to_public(&self) -> Self {
        Self::from_parts(
            self.curve.clone(),
            self.public.clone(),
            None,
            self.id.clone(),
        )
    }

    /// Check a keypair read from outside against `registry`
    ///
    /// The curve must be registered, the public key must have its size, the
    /// identifier must be the one `registry` derives, and a private half must
    /// produce the same public key.
    pub fn check(&self, registry: &CurveRegistry) -> Result<(), KeyError> {
        let resolved = registry.resolve(&self.curve)?;
        check_public_size(&self.curve, resolved.curve, &self.public)?;
        let expected = registry.derive_identifier(&self.curve, &self.public)?;
        if expected != self.id {
            return Err(KeyError::IdMismatch {
                expected,
                got: self.id.clone(),
            });
        }
        if let Some(private) = self.private.as_deref() {
            if resolved.curve.public_from_private(private)? != self.public {
                return Err(KeyError::PrivateKeyMismatch(self.id.clone()));
            }
        }
        Ok(())
    }

    /// The X25519 secret for opening sealed boxes, converted once and cached
    ///
    /// # Errors
    ///
    /// - [`KeyError::MissingPrivateKey`] for verify-only keypairs
    /// - [`CurveError::UnsupportedConversion`] when the curve has no mapping
    pub fn exchange_secret(&self, curve: &dyn Curve) -> Result<[u8; 32], KeyError> {
        if let Some(secret) = self.exchange.get() {
            return Ok(*secret);
        }
        let private = self.private.as_deref().ok_or(KeyError::MissingPrivateKey)?;
        let secret = curve.to_exchange_secret(private)?;
        // a concurrent caller may have won the race, both derived the same value
        let _ = self.exchange.set(secret);
        Ok(secret)
    }
}

impl PartialEq for KeyPair {
    fn eq(&self, other: &Self) -> bool {
        self.curve == other.curve
            && self.public == other.public
            && self.private == other.private
            && self.id == other.id
    }
}

impl Eq for KeyPair {}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("curve", &self.curve)
            .field("id", &self.id)
            .field("has_private", &self.private.is_some())
            .finish_non_exhaustive()
    }
}

impl Drop for KeyPair {
    fn drop(&mut self) {
        if let Some(private) = self.private.as_mut() {
            private.zeroize();
        }
    }
}

fn check_public_size(name: &str, curve: &dyn Curve, public: &[u8]) -> Result<(), KeyError> {
    if public.len() != curve.public_key_size() {
        return Err(KeyError::PublicKeySize {
            curve: name.to_string(),
            expected: curve.public_key_size(),
            got: public.len(),
        });
    }
    Ok(())
}

/// JSON form of a keypair, with every binary value tagged
///
/// ```json
/// {
///   "curve": "ed25519",
///   "public": "<base64>.ed25519",
///   "private": "<base64>.ed25519",
///   "id": "@<base64>.ed25519"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaggedKeys {
    /// Absent in some historical key files, where the tag suffix names it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curve: Option<String>,
    pub public: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private: Option<String>,
    pub id: String,
}

impl From<KeyPair> for TaggedKeys {
    fn from(keys: KeyPair) -> Self {
        TaggedKeys {
            curve: Some(keys.curve.clone()),
            public: keys.public_tag(),
            private: keys.private_tag(),
            id: keys.id.clone(),
        }
    }
}

impl TryFrom<TaggedKeys> for KeyPair {
    type Error = KeyError;

    fn try_from(tagged: TaggedKeys) -> Result<Self, Self::Error> {
        let curve = match tagged.curve {
            Some(curve) if !curve.is_empty() => curve,
            _ => tag::suffix_of(&tagged.public)
                .filter(|suffix| !suffix.is_empty())
                .ok_or(CurveError::Ambiguous)?
                .to_string(),
        };
        let public = tag::decode(&tagged.public)?;
        // curves outside the built-in set are checked by `KeyPair::check`
        if let Ok(resolved) = CurveRegistry::default().resolve(&curve) {
            check_public_size(&curve, resolved.curve, &public)?;
        }
        let private = tagged
            .private
            .as_deref()
            .map(|private| tag::decode(private))
            .transpose()?;
        Ok(Self::from_parts(curve, public, private, tagged.id))
    }
}

/// Anything a key can be read from
///
/// Text is a tagged key (`<base64>.<curve>`) or a feed identifier
/// (`@<base64>.<curve>`); which half it holds depends on where it is used.
#[derive(Debug, Clone, Copy)]
pub enum KeyMaterial<'a> {
    Pair(&'a KeyPair),
    Text(&'a str),
}

impl<'a> From<&'a KeyPair> for KeyMaterial<'a> {
    fn from(keys: &'a KeyPair) -> Self {
        KeyMaterial::Pair(keys)
    }
}

impl<'a> From<&'a str> for KeyMaterial<'a> {
    fn from(text: &'a str) -> Self {
        KeyMaterial::Text(text)
    }
}

impl<'a> From<&'a String> for KeyMaterial<'a> {
    fn from(text: &'a String) -> Self {
        KeyMaterial::Text(text.as_str())
    }
}

impl KeyMaterial<'_> {
    /// The public key bytes, checked against the curve's expected size
    pub fn public_bytes(&self, name: &str, curve: &dyn Curve) -> Result<Vec<u8>, KeyError> {
        let public = match self {
            KeyMaterial::Pair(keys) => keys.public.clone(),
            KeyMaterial::Text(text) => tag::decode(text)?,
        };
        check_public_size(name, curve, &public)?;
        Ok(public)
    }

    /// The private key bytes
    ///
    /// Identifiers (anything with a sigil) never hold a private key.
    pub fn private_bytes(&self) -> Result<Vec<u8>, KeyError> {
        match self {
            KeyMaterial::Pair(keys) => keys
                .private
                .clone()
                .ok_or(KeyError::MissingPrivateKey),
            KeyMaterial::Text(text) if tag::has_sigil(text) => Err(KeyError::MissingPrivateKey),
            KeyMaterial::Text(text) => Ok(tag::decode(text)?),
        }
    }
}
