//! Integration tests for key file create/load

mod common;

use keys::crypto::Keyring;
use keys::keyfile::{KeyFile, KeyFileError, KeysConfig};

#[test]
fn test_create_then_load() {
    common::init_tracing();
    let (_temp, key_path) = common::setup_key_dir();
    let keyring = Keyring::default();
    let file = KeyFile::new(&key_path);

    let created = file.create(&keyring).unwrap();
    let loaded = file.load(&keyring).unwrap();
    assert_eq!(created, loaded);

    let contents = std::fs::read_to_string(&key_path).unwrap();
    assert!(contents.starts_with("# WARNING"));
    assert!(contents.trim_end().ends_with(created.id()));
}

#[test]
fn test_load_presigil_legacy() {
    let (_temp, key_path) = common::setup_key_dir();
    let keyring = Keyring::default();
    let keys = keyring.generate(Some("ed25519"), None).unwrap();
    let id = common::write_presigil_key_file(&key_path, &keys);

    let loaded = KeyFile::new(&key_path).load(&keyring).unwrap();
    assert_eq!(loaded.id(), format!("@{}", id));
    assert_eq!(loaded, keys);
}

#[tokio::test]
async fn test_load_presigil_legacy_async() {
    let (_temp, key_path) = common::setup_key_dir();
    let keyring = Keyring::default();
    let keys = keyring.generate(None, None).unwrap();
    let id = common::write_presigil_key_file(&key_path, &keys);

    let loaded = KeyFile::new(&key_path).load_async(&keyring).await.unwrap();
    assert_eq!(loaded.id(), format!("@{}", id));
}

#[tokio::test]
async fn test_prevent_clobbering_existing_keys() {
    let (_temp, key_path) = common::setup_key_dir();
    std::fs::write(&key_path, "this file intentionally left blank").unwrap();
    let keyring = Keyring::default();
    let file = KeyFile::new(&key_path);

    assert!(matches!(
        file.create(&keyring),
        Err(KeyFileError::AlreadyExists(_))
    ));
    assert!(matches!(
        file.create_async(&keyring).await,
        Err(KeyFileError::AlreadyExists(_))
    ));
    assert_eq!(
        std::fs::read_to_string(&key_path).unwrap(),
        "this file intentionally left blank"
    );
    // an unreadable file is reported, not replaced
    assert!(matches!(
        file.load_or_create(&keyring),
        Err(KeyFileError::Unrecognized { .. })
    ));
}

#[test]
fn test_load_or_create_can_load() {
    let (_temp, key_path) = common::setup_key_dir();
    let keyring = Keyring::default();
    let keys = keyring.generate(None, None).unwrap();
    let id = common::write_presigil_key_file(&key_path, &keys);

    let loaded = KeyFile::new(&key_path).load_or_create(&keyring).unwrap();
    assert_eq!(loaded.id(), format!("@{}", id));
}

#[test]
fn test_load_or_create_can_create() {
    let (_temp, key_path) = common::setup_key_dir();
    assert!(!key_path.exists());
    let keyring = Keyring::default();

    let keys = KeyFile::new(&key_path).load_or_create(&keyring).unwrap();
    assert!(keys.public_tag().len() > 20);
    assert!(keys.private_tag().unwrap().len() > 20);
    assert!(keys.id().len() > 20);
    assert_eq!(KeyFile::new(&key_path).load(&keyring).unwrap(), keys);
}

#[tokio::test]
async fn test_load_or_create_async() {
    let (_temp, key_path) = common::setup_key_dir();
    let keyring = Keyring::default();
    let file = KeyFile::new(&key_path);

    let created = file.load_or_create_async(&keyring).await.unwrap();
    let loaded = file.load_or_create_async(&keyring).await.unwrap();
    assert_eq!(created, loaded);
}

#[test]
fn test_creates_missing_directories() {
    let (temp, _) = common::setup_key_dir();
    let key_path = temp.path().join("nested").join("dir").join("secret");
    let keyring = Keyring::default();

    KeyFile::new(&key_path).create(&keyring).unwrap();
    assert!(key_path.exists());
}

#[test]
fn test_config_location() {
    let (temp, _) = common::setup_key_dir();
    let mut config = KeysConfig::new(temp.path().join("identity"));
    config.curve = Some("secp256k1".into());
    let keyring = Keyring::default();

    let keys = KeyFile::from(&config).load_or_create(&keyring).unwrap();
    assert_eq!(keys.curve(), "secp256k1");
    assert!(config.secret_path().exists());

    let loaded = KeyFile::from(config).load(&keyring).unwrap();
    assert_eq!(loaded, keys);
}

#[test]
fn test_legacy_layout() {
    let (_temp, key_path) = common::setup_key_dir();
    let keyring = Keyring::default();
    let file = KeyFile::new(&key_path).legacy(true);

    let keys = file.create(&keyring).unwrap();
    let contents = std::fs::read_to_string(&key_path).unwrap();
    assert!(contents.contains(&keys.private_tag().unwrap()));
    assert!(!contents.contains("\"curve\""));
    assert_eq!(file.load(&keyring).unwrap(), keys);
}

#[test]
fn test_hex_layout() {
    let (_temp, key_path) = common::setup_key_dir();
    let keyring = Keyring::default();
    let keys = keyring.generate(None, None).unwrap();
    std::fs::write(
        &key_path,
        format!("# old key\n{}\n", hex::encode(keys.private().unwrap())),
    )
    .unwrap();
    assert_eq!(KeyFile::new(&key_path).load(&keyring).unwrap(), keys);
}

#[test]
fn test_load_missing_file() {
    let (_temp, key_path) = common::setup_key_dir();
    assert!(matches!(
        KeyFile::new(&key_path).load(&Keyring::default()),
        Err(KeyFileError::Io(_))
    ));
}

#[test]
fn test_loaded_keys_sign() {
    let (_temp, key_path) = common::setup_key_dir();
    let keyring = Keyring::default();
    let file = KeyFile::new(&key_path);
    let created = file.create(&keyring).unwrap();
    let loaded = file.load(&keyring).unwrap();

    let signature = keyring.sign(&loaded, "from disk").unwrap();
    assert!(keyring.verify(created.id(), &signature, "from disk").unwrap());
}
