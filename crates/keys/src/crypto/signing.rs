//! Message and object signatures
//!
//! Raw messages are signed as-is. Structured objects are signed over their
//! canonical form: pretty-printed JSON with two-space indentation, fields in
//! authored order, and the `signature` field left out. The signer and every
//! verifier must produce exactly the same bytes, so this layout is part of
//! the protocol.
//!
//! Every operation has a `_with_hmac` twin that mixes a network
//! [`HmacKey`] into the message first. A signature made with a key only
//! verifies with that same key.

use std::borrow::Cow;
use std::io;

use serde::Serialize;
use serde_json::ser::{Formatter, PrettyFormatter};
use serde_json::{Map, Value};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use super::curve::CurveError;
use super::hmac_key::HmacKey;
use super::keyring::Keyring;
use super::keys::{KeyError, KeyMaterial};
use super::tag::{self, TagError};

/// Field holding an object's signature
pub const SIGNATURE_FIELD: &str = "signature";
/// Field holding an object's HMAC
pub const HMAC_FIELD: &str = "hmac";
/// Suffix of object HMAC tags
pub const HMAC_SUFFIX: &str = "sha512256.hmac";

/// Errors raised for malformed signing or verification input
///
/// A signature that merely fails to verify is not an error; see
/// [`Keyring::verify`].
#[derive(Debug, thiserror::Error)]
pub enum SignError {
    #[error("sign error: {0}")]
    Default(#[from] anyhow::Error),
    #[error("signature should be a tagged string, use verify_object for signed objects")]
    SignatureShape,
    #[error("only JSON objects can be signed")]
    NotAnObject,
    #[error("object has no {0} field")]
    MissingField(&'static str),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("key error: {0}")]
    Key(#[from] KeyError),
    #[error("curve error: {0}")]
    Curve(#[from] CurveError),
    #[error("tag error: {0}")]
    Tag(#[from] TagError),
}

/// Serialize an object in the canonical signing layout
///
/// Numbers print the way JavaScript's `Number.prototype.toString` prints
/// them, so `2.0` prints as `2` and `1e-6` as `0.000001`.
pub fn canonical_bytes(object: &Map<String, Value>) -> Result<Vec<u8>, SignError> {
    let mut out = Vec::with_capacity(128);
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut out, CanonicalFormatter::new());
    object.serialize(&mut serializer)?;
    Ok(out)
}

/// Two-space pretty printing with ECMAScript number formatting
struct CanonicalFormatter(PrettyFormatter<'static>);

impl CanonicalFormatter {
    fn new() -> Self {
        Self(PrettyFormatter::with_indent(b"  "))
    }

    fn write_number<W: ?Sized + io::Write>(writer: &mut W, value: f64) -> io::Result<()> {
        if !value.is_finite() {
            return writer.write_all(b"null");
        }
        if value == 0.0 {
            return writer.write_all(b"0");
        }
        let mut buffer = ryu_js::Buffer::new();
        writer.write_all(buffer.format_finite(value).as_bytes())
    }
}

impl Formatter for CanonicalFormatter {
    fn begin_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.begin_array(writer)
    }

    fn end_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.0.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.begin_object(writer)
    }

    fn end_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.0.begin_object_key(writer, first)
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.begin_object_value(writer)
    }

    fn end_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_object_value(writer)
    }

    fn write_f32<W: ?Sized + io::Write>(&mut self, writer: &mut W, value: f32) -> io::Result<()> {
        Self::write_number(writer, f64::from(value))
    }

    fn write_f64<W: ?Sized + io::Write>(&mut self, writer: &mut W, value: f64) -> io::Result<()> {
        Self::write_number(writer, value)
    }
}

/// Copy of `object` without `field`, keeping the order of the other fields
fn without(object: &Map<String, Value>, field: &str) -> Map<String, Value> {
    object
        .iter()
        .filter(|(key, _)| key.as_str() != field)
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn to_object<T: Serialize + ?Sized>(object: &T) -> Result<Map<String, Value>, SignError> {
    match serde_json::to_value(object)? {
        Value::Object(map) => Ok(map),
        _ => Err(SignError::NotAnObject),
    }
}

fn as_object(value: &Value) -> Result<&Map<String, Value>, SignError> {
    value.as_object().ok_or(SignError::NotAnObject)
}

fn prehash<'m>(msg: &'m [u8], hmac_key: Option<&HmacKey>) -> Cow<'m, [u8]> {
    match hmac_key {
        Some(key) => Cow::Owned(key.authenticate(msg).to_vec()),
        None => Cow::Borrowed(msg),
    }
}

impl Keyring {
    /// Sign `msg` and return the tagged signature, `<base64>.sig.<curve>`
    ///
    /// `keys` is a keypair with a private half or a tagged private key.
    pub fn sign<'k>(
        &self,
        keys: impl Into<KeyMaterial<'k>>,
        msg: impl AsRef<[u8]>,
    ) -> Result<String, SignError> {
        self.sign_inner(keys.into(), None, msg.as_ref())
    }

    /// Sign `hmac(msg, hmac_key)`
    pub fn sign_with_hmac<'k>(
        &self,
        keys: impl Into<KeyMaterial<'k>>,
        hmac_key: &HmacKey,
        msg: impl AsRef<[u8]>,
    ) -> Result<String, SignError> {
        self.sign_inner(keys.into(), Some(hmac_key), msg.as_ref())
    }

    /// Check a tagged signature over `msg`
    ///
    /// `keys` is a keypair, a tagged public key or a feed identifier.
    /// Returns `Ok(false)` for a signature that does not verify, and an error
    /// only when the input itself is malformed.
    pub fn verify<'k>(
        &self,
        keys: impl Into<KeyMaterial<'k>>,
        signature: &str,
        msg: impl AsRef<[u8]>,
    ) -> Result<bool, SignError> {
        self.verify_inner(keys.into(), signature, None, msg.as_ref())
    }

    /// Check a signature made with [`Keyring::sign_with_hmac`]
    pub fn verify_with_hmac<'k>(
        &self,
        keys: impl Into<KeyMaterial<'k>>,
        signature: &str,
        hmac_key: &HmacKey,
        msg: impl AsRef<[u8]>,
    ) -> Result<bool, SignError> {
        self.verify_inner(keys.into(), signature, Some(hmac_key), msg.as_ref())
    }

    /// Sign a serializable object, returning it with a `signature` field
    ///
    /// Any existing `signature` field is replaced; the new one is appended
    /// after the other fields.
    pub fn sign_object<'k, T: Serialize + ?Sized>(
        &self,
        keys: impl Into<KeyMaterial<'k>>,
        object: &T,
    ) -> Result<Value, SignError> {
        self.sign_object_inner(keys.into(), None, object)
    }

    pub fn sign_object_with_hmac<'k, T: Serialize + ?Sized>(
        &self,
        keys: impl Into<KeyMaterial<'k>>,
        hmac_key: &HmacKey,
        object: &T,
    ) -> Result<Value, SignError> {
        self.sign_object_inner(keys.into(), Some(hmac_key), object)
    }

    /// Verify an object produced by [`Keyring::sign_object`]
    ///
    /// # Errors
    ///
    /// - [`SignError::NotAnObject`] unless `signed` is a JSON object
    /// - [`SignError::MissingField`] if it has no `signature`
    /// - [`SignError::SignatureShape`] if `signature` is not a string
    pub fn verify_object<'k>(
        &self,
        keys: impl Into<KeyMaterial<'k>>,
        signed: &Value,
    ) -> Result<bool, SignError> {
        self.verify_object_inner(keys.into(), None, signed)
    }

    pub fn verify_object_with_hmac<'k>(
        &self,
        keys: impl Into<KeyMaterial<'k>>,
        hmac_key: &HmacKey,
        signed: &Value,
    ) -> Result<bool, SignError> {
        self.verify_object_inner(keys.into(), Some(hmac_key), signed)
    }

    fn sign_inner(
        &self,
        keys: KeyMaterial<'_>,
        hmac_key: Option<&HmacKey>,
        msg: &[u8],
    ) -> Result<String, SignError> {
        let resolved = self.registry().resolve_from_key_material(&keys)?;
        let private = Zeroizing::new(keys.private_bytes()?);
        let msg = prehash(msg, hmac_key);
        let signature = resolved.curve.sign(&private, &msg)?;
        Ok(tag::encode(signature, &format!("sig.{}", resolved.name))?)
    }

    fn verify_inner(
        &self,
        keys: KeyMaterial<'_>,
        signature: &str,
        hmac_key: Option<&HmacKey>,
        msg: &[u8],
    ) -> Result<bool, SignError> {
        // a serialized signed object handed over in place of its signature
        if signature.trim_start().starts_with('{') {
            return Err(SignError::SignatureShape);
        }
        let resolved = self.registry().resolve_from_key_material(&keys)?;
        let public = keys.public_bytes(resolved.name, resolved.curve)?;
        let signature = tag::decode(signature)?;
        let msg = prehash(msg, hmac_key);
        Ok(resolved.curve.verify(&public, &signature, &msg))
    }

    fn sign_object_inner<T: Serialize + ?Sized>(
        &self,
        keys: KeyMaterial<'_>,
        hmac_key: Option<&HmacKey>,
        object: &T,
    ) -> Result<Value, SignError> {
        let mut unsigned = without(&to_object(object)?, SIGNATURE_FIELD);
        let bytes = canonical_bytes(&unsigned)?;
        let signature = self.sign_inner(keys, hmac_key, &bytes)?;
        unsigned.insert(SIGNATURE_FIELD.to_string(), Value::String(signature));
        Ok(Value::Object(unsigned))
    }

    fn verify_object_inner(
        &self,
        keys: KeyMaterial<'_>,
        hmac_key: Option<&HmacKey>,
        signed: &Value,
    ) -> Result<bool, SignError> {
        let object = as_object(signed)?;
        let signature = match object.get(SIGNATURE_FIELD) {
            Some(Value::String(signature)) => signature,
            Some(_) => return Err(SignError::SignatureShape),
            None => return Err(SignError::MissingField(SIGNATURE_FIELD)),
        };
        let bytes = canonical_bytes(&without(object, SIGNATURE_FIELD))?;
        self.verify_inner(keys, signature, hmac_key, &bytes)
    }
}

/// Attach an `hmac` field authenticating the rest of `object` under `key`
///
/// Unlike a signature this proves membership of whoever holds `key`, not a
/// specific identity.
pub fn hmac_object<T: Serialize + ?Sized>(key: &HmacKey, object: &T) -> Result<Value, SignError> {
    let mut unauthenticated = without(&to_object(object)?, HMAC_FIELD);
    let mac = key.authenticate(&canonical_bytes(&unauthenticated)?);
    unauthenticated.insert(
        HMAC_FIELD.to_string(),
        Value::String(tag::encode(mac, HMAC_SUFFIX)?),
    );
    Ok(Value::Object(unauthenticated))
}

/// Check an object produced by [`hmac_object`]
pub fn verify_object_hmac(key: &HmacKey, authenticated: &Value) -> Result<bool, SignError> {
    let object = as_object(authenticated)?;
    let claimed = match object.get(HMAC_FIELD) {
        Some(Value::String(claimed)) => claimed,
        Some(_) => return Err(SignError::SignatureShape),
        None => return Err(SignError::MissingField(HMAC_FIELD)),
    };
    if tag::suffix_of(claimed) != Some(HMAC_SUFFIX) {
        return Ok(false);
    }
    let claimed = tag::decode(claimed)?;
    let expected = key.authenticate(&canonical_bytes(&without(object, HMAC_FIELD))?);
    Ok(bool::from(expected.as_slice().ct_eq(claimed.as_slice())))
}
