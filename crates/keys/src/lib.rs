/**
 * Identity keys and the operations built on them.
 *  - Tagged `<base64>.<suffix>` encodings
 *  - Pluggable curves behind a registry
 *  - Message and object signatures
 *  - Multi-recipient sealed boxes and
 *    symmetric secret boxes
 */
pub mod crypto;
/**
 * Loading and creating identity key files,
 *  plus the TOML config describing where
 *  they live.
 */
pub mod keyfile;

pub mod prelude {
    pub use crate::crypto::{
        hash, secret_box, secret_unbox, BodyKey, BoxError, CurveRegistry, HmacKey, KeyMaterial,
        KeyPair, Keyring, SignError,
    };
    pub use crate::keyfile::{KeyFile, KeyFileError, KeysConfig};
}
