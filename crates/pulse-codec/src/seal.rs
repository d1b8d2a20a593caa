use std::path::Path;

use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};

use crate::error::CodecError;

// PKCS#1 v1.5 spends 11 bytes of every block on padding.
const PADDING_OVERHEAD: usize = 11;

/// Chunk-wise RSA-PKCS1v15 encryption with the server's public key. Input
/// is split into blocks of key-size − 11 bytes; the encrypted blocks are
/// concatenated.
pub struct Sealer {
    key: RsaPublicKey,
}

impl Sealer {
    pub fn new(key: RsaPublicKey) -> Self {
        Self { key }
    }

    pub fn from_pem_file(path: impl AsRef<Path>) -> Result<Self, CodecError> {
        let pem = std::fs::read_to_string(path)?;
        let key = RsaPublicKey::from_pkcs1_pem(&pem).map_err(|e| CodecError::Key(e.to_string()))?;
        Ok(Self::new(key))
    }

    pub fn seal(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut rng = rand::thread_rng();
        let chunk_size = self.key.size() - PADDING_OVERHEAD;
        let mut sealed = Vec::with_capacity(data.len() + self.key.size());
        for chunk in data.chunks(chunk_size) {
            let block = self
                .key
                .encrypt(&mut rng, Pkcs1v15Encrypt, chunk)
                .map_err(|e| CodecError::Crypto(e.to_string()))?;
            sealed.extend_from_slice(&block);
        }
        Ok(sealed)
    }
}

/// The decrypting half, held by the server. Blocks are key-size bytes each.
pub struct Opener {
    key: RsaPrivateKey,
}

impl Opener {
    pub fn new(key: RsaPrivateKey) -> Self {
        Self { key }
    }

    pub fn from_pem_file(path: impl AsRef<Path>) -> Result<Self, CodecError> {
        let pem = std::fs::read_to_string(path)?;
        let key =
            RsaPrivateKey::from_pkcs1_pem(&pem).map_err(|e| CodecError::Key(e.to_string()))?;
        Ok(Self::new(key))
    }

    pub fn open(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        let block_size = self.key.size();
        let mut opened = Vec::with_capacity(data.len());
        for block in data.chunks(block_size) {
            let chunk = self
                .key
                .decrypt(Pkcs1v15Encrypt, block)
                .map_err(|e| CodecError::Crypto(e.to_string()))?;
            opened.extend_from_slice(&chunk);
        }
        Ok(opened)
    }
}
