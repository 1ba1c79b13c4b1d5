//! Integration tests for message and object signatures

mod common;

use keys::crypto::{hash, HmacKey, Keyring, SignError};
use serde_json::json;

#[test]
fn test_sign_and_verify_string() {
    common::init_tracing();
    let (keyring, peers) = common::setup_peers(2);
    let alice = &peers[0];
    let bob = &peers[1];

    let signature = keyring.sign(alice, "secure scuttlebutt").unwrap();
    assert!(keyring.verify(alice, &signature, "secure scuttlebutt").unwrap());
    assert!(keyring.verify(alice.id(), &signature, "secure scuttlebutt").unwrap());
    assert!(!keyring.verify(bob, &signature, "secure scuttlebutt").unwrap());
    assert!(!keyring.verify(alice, &signature, "secure scuttlebutt!").unwrap());
}

#[test]
fn test_sign_and_verify_with_hmac() {
    let (keyring, peers) = common::setup_peers(1);
    let alice = &peers[0];
    let network = HmacKey::from([7u8; 32]);
    let other_network = HmacKey::from([8u8; 32]);

    let signature = keyring
        .sign_with_hmac(alice, &network, "secure scuttlebutt")
        .unwrap();
    assert!(keyring
        .verify_with_hmac(alice, &signature, &network, "secure scuttlebutt")
        .unwrap());
    assert!(!keyring
        .verify_with_hmac(alice, &signature, &other_network, "secure scuttlebutt")
        .unwrap());
    // without the key the signature belongs to a different message
    assert!(!keyring.verify(alice, &signature, "secure scuttlebutt").unwrap());
}

#[test]
fn test_falsy_hmac_key_means_no_key() {
    let (keyring, peers) = common::setup_peers(1);
    let alice = &peers[0];
    let signature = keyring.sign(alice, "msg").unwrap();

    for text in ["", "  "] {
        let key = HmacKey::parse_optional(text).unwrap();
        assert!(key.is_none());
        let verified = match key {
            Some(key) => keyring.verify_with_hmac(alice, &signature, &key, "msg"),
            None => keyring.verify(alice, &signature, "msg"),
        };
        assert!(verified.unwrap());
    }
}

#[test]
fn test_hmac_key_encodings_sign_alike() {
    let (keyring, peers) = common::setup_peers(1);
    let alice = &peers[0];
    let bytes = [0x5au8; 32];
    let signature = keyring
        .sign_with_hmac(alice, &HmacKey::from(bytes), "msg")
        .unwrap();

    let from_hex: HmacKey = hex::encode(bytes).parse().unwrap();
    assert!(keyring
        .verify_with_hmac(alice, &signature, &from_hex, "msg")
        .unwrap());
}

#[test]
fn test_sign_and_verify_object() {
    let (keyring, peers) = common::setup_peers(2);
    let alice = &peers[0];
    let bob = &peers[1];

    let msg = json!({
        "previous": null,
        "author": alice.id(),
        "sequence": 1,
        "content": {"type": "post", "text": "hello"}
    });
    let signed = keyring.sign_object(alice, &msg).unwrap();
    assert!(signed["signature"]
        .as_str()
        .unwrap()
        .ends_with(".sig.ed25519"));
    assert!(keyring.verify_object(alice, &signed).unwrap());
    assert!(!keyring.verify_object(bob, &signed).unwrap());

    let mut tampered = signed.clone();
    tampered["content"]["text"] = json!("goodbye");
    assert!(!keyring.verify_object(alice, &tampered).unwrap());
}

#[test]
fn test_field_order_is_signed() {
    let (keyring, peers) = common::setup_peers(1);
    let alice = &peers[0];
    let signed = keyring.sign_object(alice, &json!({"a": 1, "b": 2})).unwrap();

    let reordered = json!({
        "b": 2,
        "a": 1,
        "signature": signed["signature"].clone()
    });
    assert!(!keyring.verify_object(alice, &reordered).unwrap());
}

#[test]
fn test_sign_object_with_hmac() {
    let (keyring, peers) = common::setup_peers(1);
    let alice = &peers[0];
    let network = HmacKey::from([1u8; 32]);

    let signed = keyring
        .sign_object_with_hmac(alice, &network, &json!({"type": "contact"}))
        .unwrap();
    assert!(keyring
        .verify_object_with_hmac(alice, &network, &signed)
        .unwrap());
    assert!(!keyring.verify_object(alice, &signed).unwrap());
}

#[test]
fn test_serializable_structs_sign_like_json() {
    #[derive(serde::Serialize)]
    struct Post<'a> {
        kind: &'a str,
        text: &'a str,
    }

    let (keyring, peers) = common::setup_peers(1);
    let alice = &peers[0];
    let signed = keyring
        .sign_object(alice, &Post { kind: "post", text: "hi" })
        .unwrap();
    let as_json = json!({"kind": "post", "text": "hi", "signature": signed["signature"].clone()});
    assert!(keyring.verify_object(alice, &as_json).unwrap());
}

#[test]
fn test_misuse_is_an_error() {
    let (keyring, peers) = common::setup_peers(1);
    let alice = &peers[0];
    let signed = keyring.sign_object(alice, &json!({"a": 1})).unwrap();

    assert!(matches!(
        keyring.verify(alice, &signed.to_string(), "msg"),
        Err(SignError::SignatureShape)
    ));
    assert!(matches!(
        keyring.sign(alice.id(), "msg"),
        Err(SignError::Key(_))
    ));
    assert!(matches!(
        keyring.sign("no curve here", "msg"),
        Err(SignError::Curve(_))
    ));
}

#[test]
fn test_legacy_curve_signatures() {
    let keyring = Keyring::default();
    let legacy = keyring.generate(Some("secp256k1"), None).unwrap();
    assert_eq!(
        legacy.id(),
        format!("@{}", hash(legacy.public_tag()))
    );

    let signature = keyring.sign(&legacy, "historical").unwrap();
    assert!(signature.ends_with(".sig.secp256k1"));
    assert!(keyring.verify(&legacy, &signature, "historical").unwrap());
    assert!(keyring
        .verify(&legacy.public_tag(), &signature, "historical")
        .unwrap());

    let signed = keyring.sign_object(&legacy, &json!({"old": true})).unwrap();
    assert!(keyring.verify_object(&legacy, &signed).unwrap());
}

#[test]
fn test_deterministic_signatures() {
    let keyring = Keyring::default();
    let a = keyring.generate(None, Some(&[3u8; 32])).unwrap();
    let b = keyring.generate(None, Some(&[3u8; 32])).unwrap();
    assert_eq!(a.id(), b.id());
    assert_eq!(
        keyring.sign(&a, "same").unwrap(),
        keyring.sign(&b, "same").unwrap()
    );
}
