//! AES-256-GCM encryption for the secondary credential pair.
//!
//! Every blob is self-contained: `nonce(12) || tag(16) || ciphertext`,
//! base64-encoded, so no separate metadata storage is needed. The master key
//! must resolve to 32 bytes (256 bits) and is provided from an environment
//! variable.

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use anyhow::anyhow;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use crate::error::Error;

/// Size of the encryption key in bytes (256 bits)
const KEY_SIZE: usize = 32;

/// Size of the nonce in bytes (96 bits, standard for GCM)
const NONCE_SIZE: usize = 12;

/// Size of the authentication tag in bytes (128 bits)
const TAG_SIZE: usize = 16;

/// Resolve configured key material into raw key bytes.
///
/// Accepts a 64-character hex string or a base64 string; both must decode to
/// exactly 32 bytes. `None` means the secondary-credential feature is not
/// configured; that is reported at call time so the rest of the service runs
/// without it.
pub fn load_key(material: Option<&str>) -> Result<Vec<u8>, Error> {
    let material =
        material.ok_or_else(|| Error::Configuration("cipher key is not configured".to_string()))?;

    let key_bytes = if material.len() == KEY_SIZE * 2 && material.bytes().all(|b| b.is_ascii_hexdigit())
    {
        hex::decode(material)
            .map_err(|e| Error::Configuration(format!("cipher key is not valid hex: {}", e)))?
    } else {
        BASE64
            .decode(material)
            .map_err(|e| Error::Configuration(format!("cipher key is not valid base64: {}", e)))?
    };

    if key_bytes.len() != KEY_SIZE {
        return Err(Error::Configuration(format!(
            "cipher key must be {} bytes (256 bits), got {}",
            KEY_SIZE,
            key_bytes.len()
        )));
    }

    Ok(key_bytes)
}

/// Encrypt plaintext with a random nonce; returns the base64 blob.
pub fn encrypt(plaintext: &str, key: &[u8]) -> Result<String, Error> {
    if key.len() != KEY_SIZE {
        return Err(Error::Configuration(format!(
            "cipher key must be {} bytes",
            KEY_SIZE
        )));
    }

    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| Error::Internal(anyhow!("failed to create cipher: {}", e)))?;

    // Random nonce, never reused
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    // The aead crate appends the tag to the ciphertext; the stored layout
    // carries it up front instead.
    let sealed = cipher
        .encrypt(&nonce, plaintext.as_bytes())
        .map_err(|e| Error::Internal(anyhow!("encryption failed: {}", e)))?;
    let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_SIZE);

    let mut blob = Vec::with_capacity(NONCE_SIZE + TAG_SIZE + ciphertext.len());
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(tag);
    blob.extend_from_slice(ciphertext);

    Ok(BASE64.encode(&blob))
}

/// Decrypt a blob produced by [`encrypt`].
///
/// Any blob that cannot be authenticated, including one too short or not
/// base64 at all, fails with [`Error::Integrity`]; altered plaintext is never
/// returned.
pub fn decrypt(blob: &str, key: &[u8]) -> Result<String, Error> {
    if key.len() != KEY_SIZE {
        return Err(Error::Configuration(format!(
            "cipher key must be {} bytes",
            KEY_SIZE
        )));
    }

    let bytes = BASE64.decode(blob).map_err(|_| Error::Integrity)?;
    if bytes.len() < NONCE_SIZE + TAG_SIZE {
        return Err(Error::Integrity);
    }

    let nonce = &bytes[..NONCE_SIZE];
    let tag = &bytes[NONCE_SIZE..NONCE_SIZE + TAG_SIZE];
    let ciphertext = &bytes[NONCE_SIZE + TAG_SIZE..];

    // Reassemble into the ciphertext || tag order the aead crate verifies
    let mut sealed = Vec::with_capacity(ciphertext.len() + TAG_SIZE);
    sealed.extend_from_slice(ciphertext);
    sealed.extend_from_slice(tag);

    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| Error::Internal(anyhow!("failed to create cipher: {}", e)))?;

    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce), sealed.as_slice())
        .map_err(|_| Error::Integrity)?;

    String::from_utf8(plaintext).map_err(|_| Error::Integrity)
}
