//! Integration tests for symmetric secret boxes

use keys::crypto::{secret_box, secret_unbox};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Attachment {
    name: String,
    size: u64,
}

#[test]
fn test_secret_box_roundtrip() {
    let key = [0x42u8; 32];
    let value = json!({"hello": "secret", "nested": {"list": [1, 2, 3]}});
    let boxed = secret_box(&value, &key).unwrap();
    assert_eq!(secret_unbox::<Value>(&boxed, &key), Some(value));
}

#[test]
fn test_secret_box_typed() {
    let key = [9u8; 32];
    let attachment = Attachment {
        name: "photo.jpg".into(),
        size: 1024,
    };
    let boxed = secret_box(&attachment, &key).unwrap();
    assert_eq!(secret_unbox::<Attachment>(&boxed, &key), Some(attachment));
}

#[test]
fn test_secret_box_wrong_key() {
    let boxed = secret_box(&json!({"a": 1}), &[1u8; 32]).unwrap();
    assert_eq!(secret_unbox::<Value>(&boxed, &[2u8; 32]), None);
}

#[test]
fn test_secret_box_garbage() {
    let key = [1u8; 32];
    assert_eq!(secret_unbox::<Value>(b"", &key), None);
    assert_eq!(secret_unbox::<Value>(&[0u8; 64], &key), None);
}
