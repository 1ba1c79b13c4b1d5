//! Pluggable signature curves
//!
//! A [`Curve`] is a named signature scheme. The [`CurveRegistry`] maps curve
//! names (the suffix in `<base64>.<curve>`) to implementations, and is how the
//! signing and boxing layers find the right arithmetic for a key.
//!
//! The registry always has exactly one *primary* curve. Generation defaults
//! to it, and only it produces compact `@<public>.<curve>` identifiers. Other
//! registered curves are legacy: they remain usable for verifying historical
//! data and are never picked implicitly.

mod ed25519;
mod secp256k1;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub use ed25519::{Ed25519, ED25519};
pub use secp256k1::{Secp256k1, SECP256K1};

use super::keys::KeyMaterial;
use super::tag::{self, TagError};

/// Errors raised by curve lookup and curve arithmetic
#[derive(Debug, thiserror::Error)]
pub enum CurveError {
    #[error("curve already registered: {0}")]
    Duplicate(String),
    #[error("curve {name} is missing required operations: {missing:?}")]
    InvalidImplementation {
        name: String,
        missing: Vec<&'static str>,
    },
    #[error("unknown curve: {name}, expected one of: {known:?}")]
    Unknown { name: String, known: Vec<String> },
    #[error("cannot determine the curve of the given key material")]
    Ambiguous,
    #[error("curve {0} has no encryption key conversion")]
    UnsupportedConversion(String),
    #[error("invalid seed, expected {expected} bytes, got {got}")]
    InvalidSeed { expected: usize, got: usize },
    #[error("invalid key: {0}")]
    InvalidKey(String),
    #[error("tag error: {0}")]
    Tag(#[from] TagError),
}

/// The operations a curve implementation actually provides
///
/// Registration checks this explicitly rather than trusting the presence of
/// trait methods, which all have signatures whether or not they work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub generate: bool,
    pub sign: bool,
    pub verify: bool,
    /// Conversion of signing keys to X25519 keys for sealed boxes
    pub exchange: bool,
}

impl Capabilities {
    /// The minimum every registered curve must support
    pub const SIGNING: Capabilities = Capabilities {
        generate: true,
        sign: true,
        verify: true,
        exchange: false,
    };

    fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !self.generate {
            missing.push("generate");
        }
        if !self.sign {
            missing.push("sign");
        }
        if !self.verify {
            missing.push("verify");
        }
        missing
    }
}

/// Raw key bytes as produced by a curve
#[derive(Clone, PartialEq, Eq)]
pub struct RawKeys {
    pub public: Vec<u8>,
    pub private: Vec<u8>,
}

impl fmt::Debug for RawKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawKeys")
            .field("public", &hex::encode(&self.public))
            .finish_non_exhaustive()
    }
}

/// A signature scheme usable for peer identities
pub trait Curve: Send + Sync + fmt::Debug {
    fn capabilities(&self) -> Capabilities;

    /// Size of an encoded public key. Identifiers decode to exactly this.
    fn public_key_size(&self) -> usize;

    /// Create a keypair, deterministically when a seed is given
    fn generate(&self, seed: Option<&[u8]>) -> Result<RawKeys, CurveError>;

    fn sign(&self, private: &[u8], msg: &[u8]) -> Result<Vec<u8>, CurveError>;

    /// `false` for any signature that does not check out, including
    /// malformed keys or signatures of the wrong length.
    fn verify(&self, public: &[u8], signature: &[u8], msg: &[u8]) -> bool;

    /// Recover the public half from the private half
    fn public_from_private(&self, private: &[u8]) -> Result<Vec<u8>, CurveError>;

    /// Convert a signing public key to an X25519 public key
    fn to_exchange_public(&self, _public: &[u8]) -> Result<[u8; 32], CurveError> {
        Err(CurveError::UnsupportedConversion(format!("{:?}", self)))
    }

    /// Convert a signing private key to an X25519 secret
    fn to_exchange_secret(&self, _private: &[u8]) -> Result<[u8; 32], CurveError> {
        Err(CurveError::UnsupportedConversion(format!("{:?}", self)))
    }
}

/// A curve looked up in a registry, together with the name it is known by
#[derive(Debug, Clone, Copy)]
pub struct Resolved<'a> {
    pub name: &'a str,
    pub curve: &'a dyn Curve,
}

/// Name → implementation map with a designated primary curve
#[derive(Debug, Clone)]
pub struct CurveRegistry {
    curves: HashMap<String, Arc<dyn Curve>>,
    primary: String,
}

impl Default for CurveRegistry {
    /// `ed25519` as primary, `secp256k1` for legacy verification
    fn default() -> Self {
        let mut registry = CurveRegistry::new(ED25519, Arc::new(Ed25519));
        registry
            .curves
            .insert(SECP256K1.to_string(), Arc::new(Secp256k1));
        registry
    }
}

impl CurveRegistry {
    /// A registry holding only its primary curve
    pub fn new(primary: impl Into<String>, curve: Arc<dyn Curve>) -> Self {
        let primary = primary.into();
        let mut curves = HashMap::new();
        curves.insert(primary.clone(), curve);
        Self { curves, primary }
    }

    /// Add a curve under `name`
    ///
    /// # Errors
    ///
    /// - [`CurveError::Duplicate`] if `name` is taken
    /// - [`CurveError::InvalidImplementation`] if the curve cannot generate,
    ///   sign and verify
    pub fn register(
        &mut self,
        name: impl Into<String>,
        curve: Arc<dyn Curve>,
    ) -> Result<(), CurveError> {
        let name = name.into();
        if self.curves.contains_key(&name) {
            return Err(CurveError::Duplicate(name));
        }
        let missing = curve.capabilities().missing_required();
        if !missing.is_empty() {
            return Err(CurveError::InvalidImplementation { name, missing });
        }
        tracing::debug!("registering curve {}", name);
        self.curves.insert(name, curve);
        Ok(())
    }

    pub fn primary(&self) -> &str {
        &self.primary
    }

    pub fn is_primary(&self, name: &str) -> bool {
        self.primary == name
    }

    /// Registered curve names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.curves.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn resolve<'a>(&'a self, name: &str) -> Result<Resolved<'a>, CurveError> {
        self.curves
            .get_key_value(name)
            .map(|(name, curve)| Resolved {
                name: name.as_str(),
                curve: curve.as_ref(),
            })
            .ok_or_else(|| CurveError::Unknown {
                name: name.to_string(),
                known: self.names(),
            })
    }

    /// Find the curve for a keypair, tagged key or identifier
    ///
    /// The explicit curve of a [`KeyMaterial::Pair`] wins; otherwise the
    /// suffix of the tag or identifier names the curve.
    pub fn resolve_from_key_material<'a>(
        &'a self,
        keys: &KeyMaterial<'_>,
    ) -> Result<Resolved<'a>, CurveError> {
        let name = match keys {
            KeyMaterial::Pair(pair) => pair.curve(),
            KeyMaterial::Text(text) => match tag::suffix_of(text) {
                Some(suffix) if !suffix.is_empty() => suffix,
                _ => return Err(CurveError::Ambiguous),
            },
        };
        self.resolve(name)
    }

    /// Build the feed identifier for `public` on the named curve
    pub fn derive_identifier(&self, curve_name: &str, public: &[u8]) -> Result<String, CurveError> {
        let resolved = self.resolve(curve_name)?;
        Ok(tag::derive_identifier(
            resolved.name,
            public,
            self.is_primary(resolved.name),
        )?)
    }
}
