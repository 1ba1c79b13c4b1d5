//! Low-level primitives the protocol layers are built on
//!
//! Everything here is a thin binding over RustCrypto / dalek crates, laid out
//! so the bytes match NaCl:
//! - `hash`: SHA-256, tagged `.sha256`
//! - `hmac`: HMAC-SHA-512-256 (`crypto_auth`)
//! - `secretbox_seal` / `secretbox_open`: XSalsa20-Poly1305 with the
//!   `tag || ciphertext` layout of `crypto_secretbox_easy`
//! - `scalarmult` / `scalarmult_base`: raw X25519

use base64::Engine;
use hmac::digest::KeyInit as MacKeyInit;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256, Sha512};
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};
use xsalsa20poly1305::aead::{AeadInPlace, KeyInit};
use xsalsa20poly1305::{Key, Nonce, Tag, XSalsa20Poly1305};
use zeroize::Zeroize;

/// Size of an XSalsa20 nonce in bytes
pub const SECRETBOX_NONCE_SIZE: usize = 24;
/// Size of an XSalsa20-Poly1305 key in bytes
pub const SECRETBOX_KEY_SIZE: usize = 32;
/// Size of the Poly1305 authenticator prepended to every secretbox
pub const SECRETBOX_MAC_SIZE: usize = 16;
/// Size of an HMAC-SHA-512-256 key in bytes
pub const HMAC_KEY_SIZE: usize = 32;
/// Size of an HMAC-SHA-512-256 output in bytes
pub const HMAC_SIZE: usize = 32;
/// Suffix attached to tagged SHA-256 hashes
pub const HASH_SUFFIX: &str = "sha256";

type HmacSha512 = Hmac<Sha512>;

/// Hash `data` with SHA-256 and return it as a tag, `<base64>.sha256`
pub fn hash(data: impl AsRef<[u8]>) -> String {
    let digest = Sha256::digest(data.as_ref());
    format!(
        "{}.{}",
        base64::engine::general_purpose::STANDARD.encode(digest),
        HASH_SUFFIX
    )
}

/// HMAC-SHA-512 truncated to 32 bytes, the construction behind NaCl's
/// `crypto_auth`.
///
/// HMAC zero-pads short keys to the hash block size, so the key is laid
/// into a full block up front.
pub fn hmac(msg: &[u8], key: &[u8; HMAC_KEY_SIZE]) -> [u8; HMAC_SIZE] {
    let mut block = hmac::digest::Key::<HmacSha512>::default();
    block[..HMAC_KEY_SIZE].copy_from_slice(key);
    let mut mac = <HmacSha512 as MacKeyInit>::new(&block);
    block.as_mut_slice().zeroize();
    mac.update(msg);
    let full = mac.finalize().into_bytes();
    let mut out = [0u8; HMAC_SIZE];
    out.copy_from_slice(&full[..HMAC_SIZE]);
    out
}

/// Encrypt `msg` and return `mac (16 bytes) || ciphertext`
///
/// Fails only for messages past the XSalsa20 keystream limit.
pub fn secretbox_seal(
    msg: &[u8],
    nonce: &[u8; SECRETBOX_NONCE_SIZE],
    key: &[u8; SECRETBOX_KEY_SIZE],
) -> anyhow::Result<Vec<u8>> {
    let cipher = XSalsa20Poly1305::new(Key::from_slice(key));
    let mut buffer = msg.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(Nonce::from_slice(nonce), b"", &mut buffer)
        .map_err(|_| anyhow::anyhow!("secretbox message too long: {} bytes", msg.len()))?;

    let mut out = Vec::with_capacity(SECRETBOX_MAC_SIZE + buffer.len());
    out.extend_from_slice(tag.as_slice());
    out.extend_from_slice(&buffer);
    Ok(out)
}

/// Inverse of [`secretbox_seal`]. Returns `None` when the data is too short
/// or does not authenticate under `key`.
pub fn secretbox_open(
    boxed: &[u8],
    nonce: &[u8; SECRETBOX_NONCE_SIZE],
    key: &[u8; SECRETBOX_KEY_SIZE],
) -> Option<Vec<u8>> {
    if boxed.len() < SECRETBOX_MAC_SIZE {
        return None;
    }
    let (tag, ciphertext) = boxed.split_at(SECRETBOX_MAC_SIZE);
    let cipher = XSalsa20Poly1305::new(Key::from_slice(key));
    let mut buffer = ciphertext.to_vec();
    cipher
        .decrypt_in_place_detached(
            Nonce::from_slice(nonce),
            b"",
            &mut buffer,
            Tag::from_slice(tag),
        )
        .ok()?;
    Some(buffer)
}

/// Raw X25519 between a secret scalar and a public point
pub fn scalarmult(secret: &[u8; 32], public: &[u8; 32]) -> [u8; 32] {
    let secret = StaticSecret::from(*secret);
    let shared = secret.diffie_hellman(&X25519PublicKey::from(*public));
    *shared.as_bytes()
}

/// X25519 public point for a secret scalar
pub fn scalarmult_base(secret: &[u8; 32]) -> [u8; 32] {
    X25519PublicKey::from(&StaticSecret::from(*secret)).to_bytes()
}

/// Fill a fixed-size buffer from the OS RNG
pub fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    getrandom::getrandom(&mut bytes).expect("failed to generate random bytes");
    bytes
}
