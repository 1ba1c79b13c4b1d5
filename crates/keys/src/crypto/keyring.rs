use std::sync::Arc;

use super::curve::CurveRegistry;
use super::keys::{KeyError, KeyMaterial, KeyPair};
use super::sealed_box::{BoxError, DEFAULT_MAX_RECIPIENTS, MAX_RECIPIENTS};

/// Entry point for key generation, signing and sealed boxes
///
/// A `Keyring` owns the [`CurveRegistry`] every operation dispatches through.
/// It is cheap to clone and holds no secrets itself.
///
/// # Examples
///
/// ```ignore
/// let keyring = Keyring::default();
/// let alice = keyring.generate(None, None)?;
///
/// let signature = keyring.sign(&alice, "secure scuttlebutt")?;
/// assert!(keyring.verify(&alice, &signature, "secure scuttlebutt")?);
/// ```
#[derive(Debug, Clone)]
pub struct Keyring {
    registry: Arc<CurveRegistry>,
    max_recipients: usize,
}

impl Default for Keyring {
    fn default() -> Self {
        Self::new(CurveRegistry::default())
    }
}

impl Keyring {
    pub fn new(registry: CurveRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            max_recipients: DEFAULT_MAX_RECIPIENTS,
        }
    }

    /// Raise or lower the sealed-box recipient limit
    ///
    /// Senders and recipients must agree on it: a recipient only tries as
    /// many header slots as its own limit allows.
    ///
    /// # Errors
    ///
    /// Returns an error unless `1 <= max <= 255`.
    pub fn with_max_recipients(mut self, max: usize) -> Result<Self, BoxError> {
        if max == 0 || max > MAX_RECIPIENTS {
            return Err(BoxError::RecipientLimit(max));
        }
        self.max_recipients = max;
        Ok(self)
    }

    pub fn registry(&self) -> &CurveRegistry {
        &self.registry
    }

    pub fn max_recipients(&self) -> usize {
        self.max_recipients
    }

    /// Create a keypair on `curve` (the primary curve when `None`)
    ///
    /// With a seed the keypair is fully deterministic; without one a fresh
    /// random seed is drawn from the OS.
    pub fn generate(&self, curve: Option<&str>, seed: Option<&[u8]>) -> Result<KeyPair, KeyError> {
        let name = curve.unwrap_or(self.registry.primary());
        let resolved = self.registry.resolve(name)?;
        let raw = resolved.curve.generate(seed)?;
        tracing::debug!("generated {} keypair", resolved.name);
        KeyPair::new(&self.registry, resolved.name, raw.public, Some(raw.private))
    }

    /// Rebuild a full keypair from a private key on `curve`
    pub fn from_private(&self, curve: &str, private: Vec<u8>) -> Result<KeyPair, KeyError> {
        let resolved = self.registry.resolve(curve)?;
        let public = resolved.curve.public_from_private(&private)?;
        KeyPair::new(&self.registry, resolved.name, public, Some(private))
    }

    /// Build a verify-only keypair from a tagged public key or identifier
    ///
    /// Only works for self-identifying identifiers; a hashed legacy
    /// identifier does not contain the public key.
    pub fn from_public(&self, tagged: &str) -> Result<KeyPair, KeyError> {
        let material = KeyMaterial::Text(tagged);
        let resolved = self.registry.resolve_from_key_material(&material)?;
        let public = material.public_bytes(resolved.name, resolved.curve)?;
        KeyPair::new(&self.registry, resolved.name, public, None)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crypto::curve::CurveError;
    use crate::crypto::tag;

    #[test]
    fn test_generate_defaults_to_primary() {
        let keyring = Keyring::default();
        let keys = keyring.generate(None, None).unwrap();
        assert_eq!(keys.curve(), "ed25519");
        assert!(keys.id().starts_with('@'));
        assert!(keys.id().ends_with(".ed25519"));
    }

    #[test]
    fn test_seeded_keys() {
        let keyring = Keyring::default();
        let seed = [42u8; 32];
        let k1 = keyring.generate(Some("ed25519"), Some(&seed)).unwrap();
        let k2 = keyring.generate(Some("ed25519"), Some(&seed)).unwrap();
        assert_eq!(k1, k2);
    }

    #[test]
    fn test_legacy_curve_identifier_is_hashed() {
        let keyring = Keyring::default();
        let keys = keyring.generate(Some("secp256k1"), None).unwrap();
        assert_eq!(keys.curve(), "secp256k1");
        assert!(keys.id().starts_with('@'));
        assert!(keys.id().ends_with(".sha256"));
        assert_eq!(
            &keys.id()[1..],
            crate::crypto::hash(tag::encode(keys.public(), "secp256k1").unwrap())
        );
    }

    #[test]
    fn test_unknown_curve() {
        let keyring = Keyring::default();
        assert!(matches!(
            keyring.generate(Some("curve448"), None),
            Err(KeyError::Curve(CurveError::Unknown { .. }))
        ));
    }

    #[test]
    fn test_from_private_and_public() {
        let keyring = Keyring::default();
        let keys = keyring.generate(None, None).unwrap();

        let rebuilt = keyring
            .from_private("ed25519", keys.private().unwrap().to_vec())
            .unwrap();
        assert_eq!(rebuilt, keys);

        let public = keyring.from_public(keys.id()).unwrap();
        assert_eq!(public, keys.to_public());
        let public = keyring.from_public(&keys.public_tag()).unwrap();
        assert_eq!(public, keys.to_public());
    }

    #[test]
    fn test_recipient_limit() {
        assert_eq!(Keyring::default().max_recipients(), 7);
        assert!(Keyring::default().with_max_recipients(0).is_err());
        assert!(Keyring::default().with_max_recipients(256).is_err());
        assert_eq!(
            Keyring::default()
                .with_max_recipients(255)
                .unwrap()
                .max_recipients(),
            255
        );
    }
}
