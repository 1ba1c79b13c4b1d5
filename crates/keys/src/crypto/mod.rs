//! Identity keys, signatures and boxes for replicated feeds
//!
//! - **Identity**: a [`KeyPair`] on a registered curve, named by its feed
//!   identifier `@<base64>.<curve>`
//! - **Signing**: detached signatures over raw messages or canonical JSON
//!   objects, optionally bound to a network [`HmacKey`]
//! - **Sealed boxes**: one JSON message encrypted for up to 255 feed
//!   identities, with no visible recipient list
//! - **Secret boxes**: one JSON value encrypted under a symmetric key
//!
//! # Encodings
//!
//! Every binary value crosses the wire as a tag, `<base64>.<suffix>`, where
//! the suffix names what the bytes are (`ed25519`, `sig.ed25519`, `box`,
//! `sha256`, ...). References add a sigil in front: `@` for feeds, `%` for
//! messages, `&` for blobs.
//!
//! # Curves
//!
//! All operations dispatch through the [`CurveRegistry`] owned by a
//! [`Keyring`]. The default registry has `ed25519` as its primary curve and
//! keeps `secp256k1` around to verify historical feeds.
//!
//! ## Sealed boxes
//! Boxing converts each recipient's Ed25519 key to X25519 (Montgomery form)
//! and wraps a per-message body key for each of them under an ephemeral
//! Diffie-Hellman secret. See [`sealed_box`] for the wire format.

mod curve;
mod hmac_key;
mod keyring;
mod keys;
mod primitives;
pub mod sealed_box;
mod secret_box;
mod signing;
pub mod tag;

pub use curve::{
    Capabilities, Curve, CurveError, CurveRegistry, Ed25519, RawKeys, Resolved, Secp256k1,
    ED25519, SECP256K1,
};
pub use hmac_key::{HmacKey, HmacKeyError};
pub use keyring::Keyring;
pub use keys::{KeyError, KeyMaterial, KeyPair, TaggedKeys};
pub use primitives::{hash, HASH_SUFFIX, HMAC_KEY_SIZE, SECRETBOX_KEY_SIZE};
pub use sealed_box::{BodyKey, BoxError, BOX_SUFFIX, DEFAULT_MAX_RECIPIENTS, MAX_RECIPIENTS};
pub use secret_box::{secret_box, secret_unbox, SecretBoxError};
pub use signing::{
    canonical_bytes, hmac_object, verify_object_hmac, SignError, HMAC_FIELD, HMAC_SUFFIX,
    SIGNATURE_FIELD,
};
pub use tag::{has_sigil, suffix_of, Sigil, TagError};
