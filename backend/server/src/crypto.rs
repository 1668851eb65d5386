//! # Field encryption
//!
//! Personal data (name, CPF, phone) is stored encrypted, lookups go through
//! SHA-256 hashes of the normalised digits instead.
//!
//! - AES-256-GCM, key derived from `SECRET_KEY`
//! - Fresh 96-bit nonce per value
//! - Stored as hex of `nonce || ciphertext`
use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, AeadCore, KeyInit, OsRng},
};
use sha2::{Digest, Sha256};
use thiserror::Error;

const NONCE_LEN: usize = 12;
const KEY_CONTEXT: &[u8] = b"creches:campos:v1";

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Encryption failed")]
    Encrypt,

    #[error("Malformed ciphertext")]
    Malformed,

    #[error("Decryption failed")]
    Decrypt,
}

pub struct FieldCipher {
    aead: Aes256Gcm,
}

impl FieldCipher {
    pub fn new(secret_key: &str) -> Self {
        let key = Sha256::new()
            .chain_update(KEY_CONTEXT)
            .chain_update(secret_key.as_bytes())
            .finalize();

        Self {
            aead: Aes256Gcm::new(&key),
        }
    }

    pub fn encrypt(&self, plain: &str) -> Result<String, CryptoError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let cipher = self
            .aead
            .encrypt(&nonce, plain.as_bytes())
            .map_err(|_| CryptoError::Encrypt)?;

        let mut sealed = nonce.to_vec();
        sealed.extend_from_slice(&cipher);

        Ok(hex::encode(sealed))
    }

    pub fn decrypt(&self, sealed: &str) -> Result<String, CryptoError> {
        let bytes = hex::decode(sealed).map_err(|_| CryptoError::Malformed)?;

        if bytes.len() <= NONCE_LEN {
            return Err(CryptoError::Malformed);
        }

        let (nonce, cipher) = bytes.split_at(NONCE_LEN);
        let plain = self
            .aead
            .decrypt(Nonce::from_slice(nonce), cipher)
            .map_err(|_| CryptoError::Decrypt)?;

        String::from_utf8(plain).map_err(|_| CryptoError::Malformed)
    }
}

/// Lowercase hex SHA-256, used for the CPF and phone uniqueness indices.
pub fn hash_digits(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}
