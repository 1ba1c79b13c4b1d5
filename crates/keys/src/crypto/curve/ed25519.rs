use curve25519_dalek::edwards::CompressedEdwardsY;
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};

use super::{Capabilities, Curve, CurveError, RawKeys};
use crate::crypto::primitives;

/// Registered name of the primary curve
pub const ED25519: &str = "ed25519";

/// Size of an Ed25519 seed in bytes
pub const SEED_SIZE: usize = 32;
/// Size of an Ed25519 public key in bytes
pub const PUBLIC_KEY_SIZE: usize = 32;
/// Size of an Ed25519 private key in bytes, `seed || public` as in libsodium
pub const PRIVATE_KEY_SIZE: usize = 64;
/// Size of an Ed25519 signature in bytes
pub const SIGNATURE_SIZE: usize = 64;

/// Ed25519, the primary identity curve
///
/// Private keys use the 64-byte libsodium layout so that key files and
/// tagged private keys are interchangeable with other implementations. A bare
/// 32-byte seed is accepted wherever a private key is expected.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519;

impl Ed25519 {
    fn signing_key(private: &[u8]) -> Result<SigningKey, CurveError> {
        match private.len() {
            PRIVATE_KEY_SIZE => {
                let mut bytes = [0u8; PRIVATE_KEY_SIZE];
                bytes.copy_from_slice(private);
                SigningKey::from_keypair_bytes(&bytes)
                    .map_err(|e| CurveError::InvalidKey(format!("ed25519 private key: {}", e)))
            }
            SEED_SIZE => {
                let mut seed = [0u8; SEED_SIZE];
                seed.copy_from_slice(private);
                Ok(SigningKey::from_bytes(&seed))
            }
            len => Err(CurveError::InvalidKey(format!(
                "ed25519 private key size, expected {}, got {}",
                PRIVATE_KEY_SIZE, len
            ))),
        }
    }

    fn public_bytes(public: &[u8]) -> Result<[u8; PUBLIC_KEY_SIZE], CurveError> {
        public.try_into().map_err(|_| {
            CurveError::InvalidKey(format!(
                "ed25519 public key size, expected {}, got {}",
                PUBLIC_KEY_SIZE,
                public.len()
            ))
        })
    }
}

impl Curve for Ed25519 {
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            exchange: true,
            ..Capabilities::SIGNING
        }
    }

    fn public_key_size(&self) -> usize {
        PUBLIC_KEY_SIZE
    }

    fn generate(&self, seed: Option<&[u8]>) -> Result<RawKeys, CurveError> {
        let seed: [u8; SEED_SIZE] = match seed {
            Some(seed) => seed.try_into().map_err(|_| CurveError::InvalidSeed {
                expected: SEED_SIZE,
                got: seed.len(),
            })?,
            None => primitives::random_bytes(),
        };
        let signing_key = SigningKey::from_bytes(&seed);
        Ok(RawKeys {
            public: signing_key.verifying_key().to_bytes().to_vec(),
            private: signing_key.to_keypair_bytes().to_vec(),
        })
    }

    fn sign(&self, private: &[u8], msg: &[u8]) -> Result<Vec<u8>, CurveError> {
        let signing_key = Self::signing_key(private)?;
        Ok(signing_key.sign(msg).to_bytes().to_vec())
    }

    fn verify(&self, public: &[u8], signature: &[u8], msg: &[u8]) -> bool {
        let Ok(public) = Self::public_bytes(public) else {
            return false;
        };
        let Ok(verifying_key) = VerifyingKey::from_bytes(&public) else {
            return false;
        };
        let Ok(signature) = <[u8; SIGNATURE_SIZE]>::try_from(signature) else {
            return false;
        };
        verifying_key
            .verify_strict(msg, &Signature::from_bytes(&signature))
            .is_ok()
    }

    fn public_from_private(&self, private: &[u8]) -> Result<Vec<u8>, CurveError> {
        Ok(Self::signing_key(private)?
            .verifying_key()
            .to_bytes()
            .to_vec())
    }

    /// Map the Edwards point to its Montgomery form
    fn to_exchange_public(&self, public: &[u8]) -> Result<[u8; 32], CurveError> {
        let edwards_point = CompressedEdwardsY::from_slice(public)
            .map_err(|_| CurveError::InvalidKey("public key invalid edwards point".into()))?
            .decompress()
            .ok_or_else(|| {
                CurveError::InvalidKey("public key failed to decompress edwards point".into())
            })?;
        Ok(edwards_point.to_montgomery().to_bytes())
    }

    /// The scalar bytes of the expanded Ed25519 key are the X25519 secret
    fn to_exchange_secret(&self, private: &[u8]) -> Result<[u8; 32], CurveError> {
        Ok(Self::signing_key(private)?.to_scalar_bytes())
    }
}
