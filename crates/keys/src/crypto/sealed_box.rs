//! Multi-recipient sealed boxes
//!
//! A sealed box encrypts one JSON message for up to 255 recipients at once,
//! without revealing who the recipients are.
//!
//! # Protocol Overview
//!
//! To box a message:
//! 1. **Generate** a random nonce, a random body key and an ephemeral X25519
//!    keypair
//! 2. **Agree** on a shared secret with each recipient's exchange key
//! 3. **Wrap** `[recipient count] || body key` under each shared secret, one
//!    header slot per recipient
//! 4. **Encrypt** the message once under the body key
//!
//! A recipient recovers the message by:
//! 1. Computing the shared secret with the ephemeral public key
//! 2. Trying header slots in order until one authenticates
//! 3. Skipping the header (its length is in the recovered key) and opening
//!    the body
//!
//! # Wire Format
//!
//! ```text
//! [ nonce: 24 ][ ephemeral pubkey: 32 ][ slot: 49 ] * n [ body: 16 + len ]
//! ```
//!
//! The whole thing is base64 encoded and tagged `.box`. Slots are
//! indistinguishable from random to anyone who is not a recipient, so
//! failing to open a box is never an error.

use serde::de::DeserializeOwned;
use serde::Serialize;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::curve::{CurveError, Resolved};
use super::keyring::Keyring;
use super::keys::{KeyError, KeyMaterial};
use super::primitives::{self, SECRETBOX_KEY_SIZE, SECRETBOX_MAC_SIZE, SECRETBOX_NONCE_SIZE};
use super::tag::{self, TagError};

/// Recipient limit used unless a [`Keyring`] is configured otherwise
pub const DEFAULT_MAX_RECIPIENTS: usize = 7;
/// Hard recipient limit, the count has to fit the first byte of a slot
pub const MAX_RECIPIENTS: usize = 255;
/// Suffix of boxed messages
pub const BOX_SUFFIX: &str = "box";

/// Size of a recovered body key: count byte plus the secretbox key
pub const BODY_KEY_SIZE: usize = 1 + SECRETBOX_KEY_SIZE;
/// Size of one wrapped header slot
pub const SLOT_SIZE: usize = SECRETBOX_MAC_SIZE + BODY_KEY_SIZE;
/// Size of the fixed prefix, nonce plus ephemeral public key
pub const HEADER_SIZE: usize = SECRETBOX_NONCE_SIZE + 32;

/// Errors that can occur when boxing, or when the caller's own keys cannot
/// be used to unbox
#[derive(Debug, thiserror::Error)]
pub enum BoxError {
    #[error("box error: {0}")]
    Default(#[from] anyhow::Error),
    #[error("invalid recipient limit {0}, must be between 1 and 255")]
    RecipientLimit(usize),
    #[error("cannot box a message for zero recipients")]
    NoRecipients,
    #[error("too many recipients, at most {max}, got {got}")]
    TooManyRecipients { max: usize, got: usize },
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("key error: {0}")]
    Key(#[from] KeyError),
    #[error("curve error: {0}")]
    Curve(#[from] CurveError),
    #[error("tag error: {0}")]
    Tag(#[from] TagError),
}

/// The key recovered from a header slot
///
/// Holding a `BodyKey` is enough to open the body of the box it came from;
/// it can be stored to re-read a message without repeating trial
/// decryption.
///
/// Layout: `[ recipient count: 1 ][ secretbox key: 32 ]`
#[derive(Clone, PartialEq, Eq, ZeroizeOnDrop)]
pub struct BodyKey {
    recipients: u8,
    key: [u8; SECRETBOX_KEY_SIZE],
}

impl std::fmt::Debug for BodyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BodyKey {{ recipients: {} }}", self.recipients)
    }
}

impl TryFrom<&[u8]> for BodyKey {
    type Error = BoxError;
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        match bytes.split_first() {
            Some((&recipients, key)) if key.len() == SECRETBOX_KEY_SIZE => {
                let mut body_key = BodyKey {
                    recipients,
                    key: [0u8; SECRETBOX_KEY_SIZE],
                };
                body_key.key.copy_from_slice(key);
                Ok(body_key)
            }
            _ => Err(anyhow::anyhow!(
                "invalid body key size, expected {}, got {}",
                BODY_KEY_SIZE,
                bytes.len()
            )
            .into()),
        }
    }
}

impl BodyKey {
    /// Number of header slots in the box this key belongs to
    pub fn recipients(&self) -> usize {
        self.recipients as usize
    }

    pub fn key(&self) -> &[u8; SECRETBOX_KEY_SIZE] {
        &self.key
    }

    /// The 33 bytes wrapped into each header slot
    pub fn to_bytes(&self) -> Zeroizing<[u8; BODY_KEY_SIZE]> {
        let mut bytes = Zeroizing::new([0u8; BODY_KEY_SIZE]);
        bytes[0] = self.recipients;
        bytes[1..].copy_from_slice(&self.key);
        bytes
    }
}

/// Encrypt `msg` for the given X25519 public keys
///
/// # Errors
///
/// Fails for an empty recipient list or more than `max` recipients.
pub fn multibox(msg: &[u8], recipients: &[[u8; 32]], max: usize) -> Result<Vec<u8>, BoxError> {
    if recipients.is_empty() {
        return Err(BoxError::NoRecipients);
    }
    let max = max.min(MAX_RECIPIENTS);
    if recipients.len() > max {
        return Err(BoxError::TooManyRecipients {
            max,
            got: recipients.len(),
        });
    }

    let nonce: [u8; SECRETBOX_NONCE_SIZE] = primitives::random_bytes();
    let body_key = BodyKey {
        recipients: recipients.len() as u8,
        key: primitives::random_bytes(),
    };
    let wrapped = body_key.to_bytes();
    let ephemeral = Zeroizing::new(primitives::random_bytes::<32>());
    let ephemeral_public = primitives::scalarmult_base(&ephemeral);

    let mut out = Vec::with_capacity(
        HEADER_SIZE + SLOT_SIZE * recipients.len() + SECRETBOX_MAC_SIZE + msg.len(),
    );
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ephemeral_public);
    for recipient in recipients {
        let mut shared = primitives::scalarmult(&ephemeral, recipient);
        let slot = primitives::secretbox_seal(wrapped.as_slice(), &nonce, &shared);
        shared.zeroize();
        out.extend(slot?);
    }
    out.extend(primitives::secretbox_seal(msg, &nonce, body_key.key())?);
    Ok(out)
}

/// Try the first `max` header slots with an X25519 secret
pub fn multibox_open_key(boxed: &[u8], secret: &[u8; 32], max: usize) -> Option<BodyKey> {
    if boxed.len() < HEADER_SIZE {
        return None;
    }
    let nonce: &[u8; SECRETBOX_NONCE_SIZE] = boxed[..SECRETBOX_NONCE_SIZE].try_into().ok()?;
    let ephemeral: &[u8; 32] = boxed[SECRETBOX_NONCE_SIZE..HEADER_SIZE].try_into().ok()?;
    let shared = Zeroizing::new(primitives::scalarmult(secret, ephemeral));

    for slot in boxed[HEADER_SIZE..].chunks_exact(SLOT_SIZE).take(max) {
        if let Some(mut opened) = primitives::secretbox_open(slot, nonce, &shared) {
            let key = BodyKey::try_from(opened.as_slice()).ok();
            opened.zeroize();
            return key;
        }
    }
    None
}

/// Open the body of a box with an already recovered key
pub fn multibox_open_body(boxed: &[u8], key: &BodyKey) -> Option<Vec<u8>> {
    let offset = HEADER_SIZE + SLOT_SIZE * key.recipients();
    if boxed.len() < offset {
        return None;
    }
    let nonce: &[u8; SECRETBOX_NONCE_SIZE] = boxed[..SECRETBOX_NONCE_SIZE].try_into().ok()?;
    primitives::secretbox_open(&boxed[offset..], nonce, key.key())
}

fn exchange_public(resolved: Resolved<'_>, recipient: KeyMaterial<'_>) -> Result<[u8; 32], BoxError> {
    if !resolved.curve.capabilities().exchange {
        return Err(CurveError::UnsupportedConversion(resolved.name.to_string()).into());
    }
    let public = recipient.public_bytes(resolved.name, resolved.curve)?;
    Ok(resolved.curve.to_exchange_public(&public)?)
}

impl Keyring {
    /// Encrypt a JSON-serializable message for a set of recipients
    ///
    /// Recipients are keypairs, tagged public keys or feed identifiers. All
    /// of them must be on a curve with an exchange conversion.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let boxed = keyring.box_message(&json!({"okay": true}), [alice.id(), bob.id()])?;
    /// let opened: Option<Value> = keyring.unbox(&boxed, &alice)?;
    /// ```
    pub fn box_message<'k, T, I>(&self, msg: &T, recipients: I) -> Result<String, BoxError>
    where
        T: Serialize + ?Sized,
        I: IntoIterator,
        I::Item: Into<KeyMaterial<'k>>,
    {
        let recipients = recipients
            .into_iter()
            .map(|recipient| {
                let recipient = recipient.into();
                let resolved = self.registry().resolve_from_key_material(&recipient)?;
                exchange_public(resolved, recipient)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let json = Zeroizing::new(serde_json::to_vec(msg)?);
        let boxed = multibox(&json, &recipients, self.max_recipients())?;
        tracing::debug!("boxed message for {} recipients", recipients.len());
        Ok(tag::encode(boxed, BOX_SUFFIX)?)
    }

    /// Recover the body key of a box with the caller's private key
    ///
    /// Returns `Ok(None)` when no slot is addressed to `keys`, which includes
    /// boxes that are not boxes at all.
    ///
    /// # Errors
    ///
    /// Only when `keys` cannot be used for unboxing: no private half, or a
    /// curve without an exchange conversion.
    pub fn unbox_key<'k>(
        &self,
        boxed: &str,
        keys: impl Into<KeyMaterial<'k>>,
    ) -> Result<Option<BodyKey>, BoxError> {
        let keys = keys.into();
        let resolved = self.registry().resolve_from_key_material(&keys)?;
        let secret = Zeroizing::new(match keys {
            KeyMaterial::Pair(pair) => pair.exchange_secret(resolved.curve)?,
            KeyMaterial::Text(_) => {
                let private = Zeroizing::new(keys.private_bytes()?);
                resolved.curve.to_exchange_secret(&private)?
            }
        });

        let Ok(data) = tag::decode(boxed) else {
            tracing::trace!("not a box, cannot decode");
            return Ok(None);
        };
        let key = multibox_open_key(&data, &secret, self.max_recipients());
        tracing::trace!("tried header slots, recovered key: {}", key.is_some());
        Ok(key)
    }

    /// Open the body of a box with a recovered key
    ///
    /// `None` for a missing key, a body that does not authenticate, or a
    /// plaintext that is not valid JSON for `T`.
    pub fn unbox_body<T: DeserializeOwned>(&self, boxed: &str, key: Option<&BodyKey>) -> Option<T> {
        let key = key?;
        let data = tag::decode(boxed).ok()?;
        let plaintext = Zeroizing::new(multibox_open_body(&data, key)?);
        serde_json::from_slice(&plaintext).ok()
    }

    /// [`Keyring::unbox_key`] followed by [`Keyring::unbox_body`]
    pub fn unbox<'k, T: DeserializeOwned>(
        &self,
        boxed: &str,
        keys: impl Into<KeyMaterial<'k>>,
    ) -> Result<Option<T>, BoxError> {
        let key = self.unbox_key(boxed, keys)?;
        Ok(self.unbox_body(boxed, key.as_ref()))
    }
}
