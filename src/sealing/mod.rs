//! Credential sealing using ChaCha20-Poly1305.
//!
//! A sealed secret is `base64(nonce || tag || ciphertext)`. The key is read
//! from the environment on every call, see [`crate::config::sealing_key_raw`].

use base64::{engine::general_purpose::STANDARD, Engine};
use chacha20poly1305::{
    aead::{AeadInPlace, KeyInit},
    ChaCha20Poly1305, Nonce, Tag,
};
use rand::RngCore;
use thiserror::Error;

use crate::config;

/// Size of nonce in bytes (96 bits for ChaCha20-Poly1305).
pub const NONCE_SIZE: usize = 12;

/// Size of authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// Size of the symmetric key in bytes.
pub const KEY_SIZE: usize = 32;

/// Shortest decoded length a sealed value can have (one byte of ciphertext).
pub const MIN_SEALED_LEN: usize = NONCE_SIZE + TAG_SIZE + 1;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SealError {
    #[error("sealing key is not configured")]
    MissingKey,

    #[error("sealing key is invalid: {0}")]
    InvalidKey(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("decryption failed: {0}")]
    Decryption(String),
}

/// 256-bit sealing key.
#[derive(Clone)]
pub struct SealingKey([u8; KEY_SIZE]);

impl std::fmt::Debug for SealingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SealingKey(..)")
    }
}

impl SealingKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Decodes a base64 key, rejecting anything that is not exactly 32 bytes.
    pub fn from_base64(encoded: &str) -> Result<Self, SealError> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| SealError::InvalidKey(format!("invalid base64: {}", e)))?;

        let key: [u8; KEY_SIZE] = bytes.as_slice().try_into().map_err(|_| {
            SealError::InvalidKey(format!("expected {} bytes, got {}", KEY_SIZE, bytes.len()))
        })?;

        Ok(Self(key))
    }

    pub fn from_raw(raw: Option<String>) -> Result<Self, SealError> {
        match raw {
            Some(value) => Self::from_base64(&value),
            None => Err(SealError::MissingKey),
        }
    }

    /// Loads the process-wide key. Not cached.
    pub fn from_env() -> Result<Self, SealError> {
        Self::from_raw(config::sealing_key_raw())
    }

    /// Fresh random key, base64 encoded, for provisioning.
    pub fn generate_base64() -> String {
        let mut bytes = [0u8; KEY_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        STANDARD.encode(bytes)
    }

    fn cipher(&self) -> ChaCha20Poly1305 {
        ChaCha20Poly1305::new((&self.0).into())
    }
}

/// Seals `plaintext` with the configured key. Empty or absent input yields `None`.
pub fn seal(plaintext: Option<&str>) -> Result<Option<String>, SealError> {
    match plaintext {
        None | Some("") => Ok(None),
        Some(text) => seal_with(&SealingKey::from_env()?, text).map(Some),
    }
}

/// Opens a sealed value, failing closed on any error.
pub fn open(sealed: &str) -> Result<String, SealError> {
    open_with(&SealingKey::from_env()?, sealed)
}

/// Opens a sealed value, returning the input unchanged when it cannot be
/// opened. Lets fields written before sealing was introduced keep reading.
pub fn open_lenient(value: &str) -> String {
    match SealingKey::from_env() {
        Ok(key) => open_lenient_with(&key, value),
        Err(_) => value.to_string(),
    }
}

pub fn seal_with(key: &SealingKey, plaintext: &str) -> Result<String, SealError> {
    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let mut buffer = plaintext.as_bytes().to_vec();
    let tag = key
        .cipher()
        .encrypt_in_place_detached(nonce, b"", &mut buffer)
        .map_err(|e| SealError::Encryption(e.to_string()))?;

    let mut out = Vec::with_capacity(NONCE_SIZE + TAG_SIZE + buffer.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(tag.as_slice());
    out.extend_from_slice(&buffer);
    Ok(STANDARD.encode(out))
}

pub fn open_lenient_with(key: &SealingKey, value: &str) -> String {
    open_with(key, value).unwrap_or_else(|_| value.to_string())
}

pub fn open_with(key: &SealingKey, sealed: &str) -> Result<String, SealError> {
    let bytes = STANDARD
        .decode(sealed)
        .map_err(|e| SealError::Decryption(format!("invalid base64: {}", e)))?;

    if bytes.len() < MIN_SEALED_LEN {
        return Err(SealError::Decryption("data too short".to_string()));
    }

    let (nonce_bytes, rest) = bytes.split_at(NONCE_SIZE);
    let (tag_bytes, ciphertext) = rest.split_at(TAG_SIZE);

    let mut buffer = ciphertext.to_vec();
    key.cipher()
        .decrypt_in_place_detached(
            Nonce::from_slice(nonce_bytes),
            b"",
            &mut buffer,
            Tag::from_slice(tag_bytes),
        )
        .map_err(|_| {
            SealError::Decryption("decryption failed (wrong key or tampered data)".to_string())
        })?;

    String::from_utf8(buffer).map_err(|e| SealError::Decryption(format!("invalid UTF-8: {}", e)))
}
