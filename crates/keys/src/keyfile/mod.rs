//! Identity key files
//!
//! A key file holds one keypair as pretty JSON surrounded by `#` comment
//! lines: a warning banner before and the public identifier after. Older
//! files may instead hold just the tagged private key, or the private key
//! as plain hex. All three layouts load; only the first two are written.
//!
//! Files are created with `create_new` and mode `0o400`, so an existing
//! identity is never overwritten.

mod config;

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use crate::crypto::tag;
use crate::crypto::{KeyError, KeyPair, Keyring, TaggedKeys};

pub use config::{KeysConfig, APP_NAME, CONFIG_FILE_NAME, SECRET_FILE_NAME};

const BANNER: &str = "\
# WARNING: Never show this to anyone.
# WARNING: Never edit it or use it on multiple devices at once.
#
# This is your SECRET, it gives you magical powers. With your secret you can
# sign your messages so that your friends can verify that the messages came
# from you. If anyone learns your secret, they can use it to impersonate you.
#
# If you use this secret on more than one device you will create a fork and
# your friends will stop replicating your content.
#
";

#[derive(Debug, thiserror::Error)]
pub enum KeyFileError {
    #[error("key file error: {0}")]
    Default(#[from] anyhow::Error),

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("refusing to overwrite existing key file: {0}")]
    AlreadyExists(PathBuf),

    #[error("unrecognized key file {path}: {reasons:?}")]
    Unrecognized { path: PathBuf, reasons: Vec<String> },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("key error: {0}")]
    Key(#[from] KeyError),
}

impl KeyFileError {
    fn is_not_found(&self) -> bool {
        matches!(self, KeyFileError::Io(err) if err.kind() == io::ErrorKind::NotFound)
    }
}

/// Result of one key file layout parser
#[derive(Debug)]
pub enum ParseOutcome {
    Parsed(KeyPair),
    /// Not this layout, with the reason
    Rejected(String),
}

type Parser = fn(&Keyring, &str) -> ParseOutcome;

/// Layouts in the order they are tried, the first success wins
const PARSERS: &[(&str, Parser)] = &[
    ("json", parse_json),
    ("private tag", parse_private_tag),
    ("hex", parse_hex),
];

/// A key file on disk, with the options used when creating it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyFile {
    path: PathBuf,
    curve: Option<String>,
    legacy: bool,
}

impl From<PathBuf> for KeyFile {
    fn from(path: PathBuf) -> Self {
        Self::new(path)
    }
}

impl From<&Path> for KeyFile {
    fn from(path: &Path) -> Self {
        Self::new(path)
    }
}

impl From<&str> for KeyFile {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<&KeysConfig> for KeyFile {
    fn from(config: &KeysConfig) -> Self {
        Self {
            path: config.secret_path(),
            curve: config.curve.clone(),
            legacy: config.legacy,
        }
    }
}

impl From<KeysConfig> for KeyFile {
    fn from(config: KeysConfig) -> Self {
        Self::from(&config)
    }
}

impl KeyFile {
    /// A key file at exactly `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            curve: None,
            legacy: false,
        }
    }

    pub fn with_curve(mut self, curve: impl Into<String>) -> Self {
        self.curve = Some(curve.into());
        self
    }

    pub fn legacy(mut self, legacy: bool) -> Self {
        self.legacy = legacy;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Generate a keypair and write it out
    ///
    /// # Errors
    ///
    /// [`KeyFileError::AlreadyExists`] if the file is already there.
    pub fn create(&self, keyring: &Keyring) -> Result<KeyPair, KeyFileError> {
        let keys = keyring.generate(self.curve.as_deref(), None)?;
        let contents = render(&keys, self.legacy)?;
        if let Some(parent) = self.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = self
            .open_options()
            .open(&self.path)
            .map_err(|e| self.map_create_error(e))?;
        file.write_all(contents.as_bytes())?;
        tracing::debug!("created key file {} for {}", self.path.display(), keys.id());
        Ok(keys)
    }

    pub fn load(&self, keyring: &Keyring) -> Result<KeyPair, KeyFileError> {
        let contents = fs::read_to_string(&self.path)?;
        self.parse(keyring, &contents)
    }

    /// Load the key file, creating it only if there is none
    ///
    /// A file that exists but does not parse is an error, never replaced.
    pub fn load_or_create(&self, keyring: &Keyring) -> Result<KeyPair, KeyFileError> {
        match self.load(keyring) {
            Err(err) if err.is_not_found() => self.create(keyring),
            result => result,
        }
    }

    pub async fn create_async(&self, keyring: &Keyring) -> Result<KeyPair, KeyFileError> {
        let keys = keyring.generate(self.curve.as_deref(), None)?;
        let contents = render(&keys, self.legacy)?;
        if let Some(parent) = self.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::from(self.open_options())
            .open(&self.path)
            .await
            .map_err(|e| self.map_create_error(e))?;
        file.write_all(contents.as_bytes()).await?;
        file.flush().await?;
        tracing::debug!("created key file {} for {}", self.path.display(), keys.id());
        Ok(keys)
    }

    pub async fn load_async(&self, keyring: &Keyring) -> Result<KeyPair, KeyFileError> {
        let contents = tokio::fs::read_to_string(&self.path).await?;
        self.parse(keyring, &contents)
    }

    pub async fn load_or_create_async(&self, keyring: &Keyring) -> Result<KeyPair, KeyFileError> {
        match self.load_async(keyring).await {
            Err(err) if err.is_not_found() => self.create_async(keyring).await,
            result => result,
        }
    }

    fn parent(&self) -> Option<&Path> {
        self.path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
    }

    fn open_options(&self) -> fs::OpenOptions {
        let mut options = fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o400);
        }
        options
    }

    fn map_create_error(&self, err: io::Error) -> KeyFileError {
        if err.kind() == io::ErrorKind::AlreadyExists {
            KeyFileError::AlreadyExists(self.path.clone())
        } else {
            err.into()
        }
    }

    fn parse(&self, keyring: &Keyring, contents: &str) -> Result<KeyPair, KeyFileError> {
        let stripped = strip_comments(contents);
        let mut reasons = Vec::new();
        for (index, (layout, parser)) in PARSERS.iter().enumerate() {
            match parser(keyring, &stripped) {
                ParseOutcome::Parsed(keys) => {
                    if index > 0 {
                        tracing::warn!(
                            "loaded {} from legacy {} key file layout",
                            self.path.display(),
                            layout
                        );
                    }
                    tracing::debug!("loaded key file {} for {}", self.path.display(), keys.id());
                    return Ok(keys);
                }
                ParseOutcome::Rejected(reason) => reasons.push(format!("{}: {}", layout, reason)),
            }
        }
        Err(KeyFileError::Unrecognized {
            path: self.path.clone(),
            reasons,
        })
    }
}

/// The full text of a key file for `keys`
pub fn render(keys: &KeyPair, legacy: bool) -> Result<String, KeyFileError> {
    let body = if legacy {
        keys.private_tag().ok_or(KeyError::MissingPrivateKey)?
    } else {
        serde_json::to_string_pretty(keys)?
    };
    Ok(format!(
        "{}{}\n#\n# The only part of this file that's safe to share is your public name:\n#\n#   {}",
        BANNER,
        body,
        keys.id()
    ))
}

/// Drop everything from `#` to the end of each line, then join what is left
pub fn strip_comments(contents: &str) -> String {
    contents
        .lines()
        .map(|line| line.split_once('#').map_or(line, |(before, _)| before).trim())
        .filter(|line| !line.is_empty())
        .collect()
}

fn parse_json(keyring: &Keyring, text: &str) -> ParseOutcome {
    let tagged: TaggedKeys = match serde_json::from_str(text) {
        Ok(tagged) => tagged,
        Err(err) => return ParseOutcome::Rejected(err.to_string()),
    };
    let repair = !tag::has_sigil(&tagged.id);
    let result = KeyPair::try_from(tagged).and_then(|keys| {
        if repair {
            // legacy files stored the identifier without its sigil
            KeyPair::new(
                keyring.registry(),
                keys.curve(),
                keys.public().to_vec(),
                keys.private().map(<[u8]>::to_vec),
            )
            .and_then(|repaired| repaired.check(keyring.registry()).map(|_| repaired))
        } else {
            keys.check(keyring.registry()).map(|_| keys)
        }
    });
    match result {
        Ok(keys) => ParseOutcome::Parsed(keys),
        Err(err) => ParseOutcome::Rejected(err.to_string()),
    }
}

fn parse_private_tag(keyring: &Keyring, text: &str) -> ParseOutcome {
    let Some(curve) = tag::suffix_of(text).filter(|suffix| !suffix.is_empty()) else {
        return ParseOutcome::Rejected("no curve suffix".into());
    };
    let result = tag::decode(text)
        .map_err(KeyError::from)
        .and_then(|private| keyring.from_private(curve, private));
    match result {
        Ok(keys) => ParseOutcome::Parsed(keys),
        Err(err) => ParseOutcome::Rejected(err.to_string()),
    }
}

fn parse_hex(keyring: &Keyring, text: &str) -> ParseOutcome {
    let private = match hex::decode(text.strip_prefix("0x").unwrap_or(text)) {
        Ok(private) => private,
        Err(err) => return ParseOutcome::Rejected(err.to_string()),
    };
    let primary = keyring.registry().primary();
    let result = match private.len() {
        32 => keyring.generate(Some(primary), Some(private.as_slice())),
        _ => keyring.from_private(primary, private),
    };
    match result {
        Ok(keys) => ParseOutcome::Parsed(keys),
        Err(err) => ParseOutcome::Rejected(err.to_string()),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_render_layout() {
        let keyring = Keyring::default();
        let keys = keyring.generate(None, None).unwrap();
        let contents = render(&keys, false).unwrap();
        assert!(contents.starts_with("# WARNING: Never show this to anyone."));
        assert!(contents.ends_with(&format!("#   {}", keys.id())));
        assert!(contents.contains("\n{\n  \"curve\": \"ed25519\",\n"));

        let legacy = render(&keys, true).unwrap();
        assert!(legacy.contains(&format!("\n{}\n", keys.private_tag().unwrap())));
        assert!(render(&keys.to_public(), true).is_err());
    }

    #[test]
    fn test_strip_comments() {
        let text = "# header\n{\n  \"a\": 1 # trailing\n}\n#\n#   @id\n";
        assert_eq!(strip_comments(text), "{\"a\": 1}");
    }

    #[test]
    fn test_parsers_in_order() {
        let keyring = Keyring::default();
        let keys = keyring.generate(None, None).unwrap();
        let file = KeyFile::new("unused");

        let json = strip_comments(&render(&keys, false).unwrap());
        assert_eq!(file.parse(&keyring, &json).unwrap(), keys);

        let private_tag = strip_comments(&render(&keys, true).unwrap());
        assert_eq!(file.parse(&keyring, &private_tag).unwrap(), keys);

        let hex = hex::encode(keys.private().unwrap());
        assert_eq!(file.parse(&keyring, &hex).unwrap(), keys);
        let seed_hex = hex::encode(&keys.private().unwrap()[..32]);
        assert_eq!(file.parse(&keyring, &seed_hex).unwrap(), keys);
    }

    #[test]
    fn test_json_must_match_its_identifier() {
        let keyring = Keyring::default();
        let keys = keyring.generate(None, None).unwrap();
        let other = keyring.generate(None, None).unwrap();

        let mut json = serde_json::to_value(&keys).unwrap();
        json["id"] = other.id().into();
        match parse_json(&keyring, &json.to_string()) {
            ParseOutcome::Rejected(reason) => assert!(reason.contains(other.id())),
            ParseOutcome::Parsed(keys) => panic!("loaded mismatched identity {:?}", keys),
        }

        let mut json = serde_json::to_value(&keys).unwrap();
        json["public"] = tag::encode(&keys.public()[..16], "ed25519").unwrap().into();
        assert!(matches!(
            parse_json(&keyring, &json.to_string()),
            ParseOutcome::Rejected(_)
        ));
    }

    #[test]
    fn test_unrecognized() {
        let keyring = Keyring::default();
        match KeyFile::new("blank").parse(&keyring, "this file intentionally left blank") {
            Err(KeyFileError::Unrecognized { reasons, .. }) => assert_eq!(reasons.len(), 3),
            other => panic!("expected unrecognized key file, got {:?}", other),
        }
    }

    #[test]
    fn test_no_parent_directory_for_bare_name() {
        assert_eq!(KeyFile::new("secret").parent(), None);
        let temp_dir = TempDir::new().unwrap();
        let file = KeyFile::new(temp_dir.path().join("a").join("secret"));
        assert_eq!(file.parent(), Some(temp_dir.path().join("a").as_path()));
    }

    #[cfg(unix)]
    #[test]
    fn test_created_read_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let file = KeyFile::new(temp_dir.path().join("secret"));
        file.create(&Keyring::default()).unwrap();
        let mode = fs::metadata(file.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o400);
    }
}
