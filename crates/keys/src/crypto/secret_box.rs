//! Symmetric boxes for JSON values
//!
//! The nonce is the first 24 bytes of the key itself. A key must therefore
//! only ever box one value, which is how these are used: each key is a
//! fresh random per-message secret handed out separately.

use serde::de::DeserializeOwned;
use serde::Serialize;
use zeroize::Zeroizing;

use super::primitives::{self, SECRETBOX_KEY_SIZE, SECRETBOX_NONCE_SIZE};

#[derive(Debug, thiserror::Error)]
pub enum SecretBoxError {
    #[error("secret box error: {0}")]
    Default(#[from] anyhow::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

fn nonce_of(key: &[u8; SECRETBOX_KEY_SIZE]) -> [u8; SECRETBOX_NONCE_SIZE] {
    let mut nonce = [0u8; SECRETBOX_NONCE_SIZE];
    nonce.copy_from_slice(&key[..SECRETBOX_NONCE_SIZE]);
    nonce
}

/// Serialize `value` to JSON and encrypt it under `key`
pub fn secret_box<T: Serialize + ?Sized>(
    value: &T,
    key: &[u8; SECRETBOX_KEY_SIZE],
) -> Result<Vec<u8>, SecretBoxError> {
    let json = Zeroizing::new(serde_json::to_vec(value)?);
    Ok(primitives::secretbox_seal(&json, &nonce_of(key), key)?)
}

/// Decrypt and parse a value boxed with [`secret_box`]
///
/// `None` when the ciphertext does not authenticate under `key` or does not
/// parse as `T`.
pub fn secret_unbox<T: DeserializeOwned>(
    ciphertext: &[u8],
    key: &[u8; SECRETBOX_KEY_SIZE],
) -> Option<T> {
    let plaintext = Zeroizing::new(primitives::secretbox_open(
        ciphertext,
        &nonce_of(key),
        key,
    )?);
    serde_json::from_slice(&plaintext).ok()
}
