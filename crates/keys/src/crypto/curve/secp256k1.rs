use k256::ecdsa::signature::{Signer, Verifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};

use super::{Capabilities, Curve, CurveError, RawKeys};
use crate::crypto::primitives;

/// Registered name of the legacy secp256k1 curve
pub const SECP256K1: &str = "secp256k1";

/// Size of a secp256k1 private scalar in bytes
pub const PRIVATE_KEY_SIZE: usize = 32;
/// Size of a compressed SEC1 public key in bytes
pub const PUBLIC_KEY_SIZE: usize = 33;

/// secp256k1 ECDSA over SHA-256, kept to verify historical feeds
///
/// Signatures are 64-byte compact `r || s`, normalized to low-S. There is no
/// X25519 conversion, so these keys cannot open sealed boxes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Secp256k1;

impl Secp256k1 {
    fn signing_key(private: &[u8]) -> Result<SigningKey, CurveError> {
        if private.len() != PRIVATE_KEY_SIZE {
            return Err(CurveError::InvalidKey(format!(
                "secp256k1 private key size, expected {}, got {}",
                PRIVATE_KEY_SIZE,
                private.len()
            )));
        }
        SigningKey::from_slice(private)
            .map_err(|_| CurveError::InvalidKey("secp256k1 private key out of range".into()))
    }

    fn encode_public(signing_key: &SigningKey) -> Vec<u8> {
        signing_key
            .verifying_key()
            .to_encoded_point(true)
            .as_bytes()
            .to_vec()
    }
}

impl Curve for Secp256k1 {
    fn capabilities(&self) -> Capabilities {
        Capabilities::SIGNING
    }

    fn public_key_size(&self) -> usize {
        PUBLIC_KEY_SIZE
    }

    fn generate(&self, seed: Option<&[u8]>) -> Result<RawKeys, CurveError> {
        let signing_key = match seed {
            Some(seed) => {
                if seed.len() != PRIVATE_KEY_SIZE {
                    return Err(CurveError::InvalidSeed {
                        expected: PRIVATE_KEY_SIZE,
                        got: seed.len(),
                    });
                }
                Self::signing_key(seed)?
            }
            // rejection sampling, almost never loops
            None => loop {
                let candidate: [u8; PRIVATE_KEY_SIZE] = primitives::random_bytes();
                if let Ok(key) = SigningKey::from_slice(&candidate) {
                    break key;
                }
            },
        };
        Ok(RawKeys {
            public: Self::encode_public(&signing_key),
            private: signing_key.to_bytes().to_vec(),
        })
    }

    fn sign(&self, private: &[u8], msg: &[u8]) -> Result<Vec<u8>, CurveError> {
        let signing_key = Self::signing_key(private)?;
        let signature: Signature = signing_key.sign(msg);
        Ok(signature.to_bytes().to_vec())
    }

    fn verify(&self, public: &[u8], signature: &[u8], msg: &[u8]) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_sec1_bytes(public) else {
            return false;
        };
        let Ok(signature) = Signature::from_slice(signature) else {
            return false;
        };
        verifying_key.verify(msg, &signature).is_ok()
    }

    fn public_from_private(&self, private: &[u8]) -> Result<Vec<u8>, CurveError> {
        Ok(Self::encode_public(&Self::signing_key(private)?))
    }
}
