//! Shared test utilities for keys integration tests
#![allow(dead_code)]

use keys::crypto::{KeyPair, Keyring};
use tempfile::TempDir;

/// A default keyring with `n` fresh primary-curve identities
pub fn setup_peers(n: usize) -> (Keyring, Vec<KeyPair>) {
    let keyring = Keyring::default();
    let peers = (0..n)
        .map(|_| keyring.generate(None, None).unwrap())
        .collect();
    (keyring, peers)
}

/// A temporary directory plus the path of a not yet existing key file in it
pub fn setup_key_dir() -> (TempDir, std::path::PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let key_path = temp_dir.path().join("secret");
    (temp_dir, key_path)
}

/// Write `keys` the way older clients did: bare JSON with a sigil-less id
pub fn write_presigil_key_file(path: &std::path::Path, keys: &KeyPair) -> String {
    let mut json = serde_json::to_value(keys).unwrap();
    let id = keys.id().trim_start_matches('@').to_string();
    json["id"] = serde_json::Value::String(id.clone());
    std::fs::write(path, serde_json::to_string(&json).unwrap()).unwrap();
    id
}

/// Log output for a test run, controlled by RUST_LOG
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
