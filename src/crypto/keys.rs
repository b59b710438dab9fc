//! RSA key pair storage.
//!
//! Keys live in a directory as two files: `private.key` (base64 PKCS#8 DER)
//! and `public.key` (base64 X.509 SubjectPublicKeyInfo DER). The public key
//! file is what gets handed to vote sites.

use std::fs;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};

/// Key size used for new key pairs (256-byte blocks).
pub const DEFAULT_KEY_BITS: usize = 2048;

pub const PRIVATE_KEY_FILE: &str = "private.key";
pub const PUBLIC_KEY_FILE: &str = "public.key";

#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("key file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("key file {path} is not valid base64: {source}")]
    Encoding {
        path: PathBuf,
        #[source]
        source: base64::DecodeError,
    },

    #[error("key file {path} does not hold a valid key: {reason}")]
    Format { path: PathBuf, reason: String },

    #[error("key generation failed: {0}")]
    Generate(#[from] rsa::Error),
}

/// An RSA private key and its public half.
#[derive(Debug, Clone)]
pub struct KeyPair {
    pub private: RsaPrivateKey,
    pub public: RsaPublicKey,
}

impl KeyPair {
    pub fn from_private(private: RsaPrivateKey) -> Self {
        let public = private.to_public_key();
        Self { private, public }
    }
}

/// Generate a fresh key pair.
pub fn generate(bits: usize) -> Result<KeyPair, KeyError> {
    let private = RsaPrivateKey::new(&mut rand::thread_rng(), bits)?;
    Ok(KeyPair::from_private(private))
}

/// Write both halves of `pair` into `dir`, creating it if needed.
pub fn save(dir: &Path, pair: &KeyPair) -> Result<(), KeyError> {
    fs::create_dir_all(dir).map_err(|source| KeyError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let private_path = dir.join(PRIVATE_KEY_FILE);
    let private_der = pair.private.to_pkcs8_der().map_err(|e| KeyError::Format {
        path: private_path.clone(),
        reason: e.to_string(),
    })?;
    write_private(&private_path, &STANDARD.encode(private_der.as_bytes()))?;

    let public_path = dir.join(PUBLIC_KEY_FILE);
    let public_der = pair.public.to_public_key_der().map_err(|e| KeyError::Format {
        path: public_path.clone(),
        reason: e.to_string(),
    })?;
    write_base64(&public_path, public_der.as_bytes())
}

/// Read a key pair previously written by [`save`].
pub fn load(dir: &Path) -> Result<KeyPair, KeyError> {
    let private_path = dir.join(PRIVATE_KEY_FILE);
    let private = RsaPrivateKey::from_pkcs8_der(&read_base64(&private_path)?).map_err(|e| {
        KeyError::Format {
            path: private_path,
            reason: e.to_string(),
        }
    })?;

    let public_path = dir.join(PUBLIC_KEY_FILE);
    let public = load_public_key(&public_path)?;
    if public != private.to_public_key() {
        return Err(KeyError::Format {
            path: public_path,
            reason: "public key does not belong to the private key".into(),
        });
    }

    Ok(KeyPair { private, public })
}

/// Read a single `public.key` file, as a sender would.
pub fn load_public_key(path: &Path) -> Result<RsaPublicKey, KeyError> {
    RsaPublicKey::from_public_key_der(&read_base64(path)?).map_err(|e| KeyError::Format {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Load the key pair in `dir`, or generate and store one if the directory
/// does not exist yet.
pub fn load_or_generate(dir: &Path) -> Result<KeyPair, KeyError> {
    if dir.exists() {
        return load(dir);
    }

    tracing::info!(directory = %dir.display(), bits = DEFAULT_KEY_BITS, "Generating RSA key pair");
    let pair = generate(DEFAULT_KEY_BITS)?;
    save(dir, &pair)?;
    Ok(pair)
}

/// Write the private key readable by the owner only.
#[cfg(unix)]
fn write_private(path: &Path, contents: &str) -> Result<(), KeyError> {
    use std::fs::{OpenOptions, Permissions};
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let io_error = |source| KeyError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
        .map_err(io_error)?;
    // `mode` only applies on creation; tighten a pre-existing file too.
    file.set_permissions(Permissions::from_mode(0o600))
        .map_err(io_error)?;
    file.write_all(contents.as_bytes()).map_err(io_error)
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &str) -> Result<(), KeyError> {
    fs::write(path, contents).map_err(|source| KeyError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn write_base64(path: &Path, der: &[u8]) -> Result<(), KeyError> {
    fs::write(path, STANDARD.encode(der)).map_err(|source| KeyError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn read_base64(path: &Path) -> Result<Vec<u8>, KeyError> {
    let text = fs::read_to_string(path).map_err(|source| KeyError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    STANDARD
        .decode(text.trim())
        .map_err(|source| KeyError::Encoding {
            path: path.to_path_buf(),
            source,
        })
}
