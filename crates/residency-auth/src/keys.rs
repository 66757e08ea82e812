//! Ed25519 keypairs for signing admin sessions.

use crate::error::AuthError;
use biscuit_auth::{Algorithm, KeyPair as BiscuitKeyPair, PrivateKey, PublicKey};
use rand::RngCore;
use std::path::Path;

pub struct KeyPair {
    inner: BiscuitKeyPair,
}

impl KeyPair {
    /// Generate a new random keypair.
    pub fn generate() -> Result<Self, AuthError> {
        let mut rng = rand::rng();
        let mut bytes = [0u8; 32];
        rng.fill_bytes(&mut bytes);

        let private_key = PrivateKey::from_bytes(&bytes, Algorithm::Ed25519)
            .map_err(|e| AuthError::KeyGenerationFailed(e.to_string()))?;
        Ok(Self {
            inner: BiscuitKeyPair::from(&private_key),
        })
    }

    /// Load a keypair from a hex-encoded private key string.
    pub fn from_private_key_hex(hex: &str) -> Result<Self, AuthError> {
        let private_key = PrivateKey::from_bytes_hex(hex.trim(), Algorithm::Ed25519)
            .map_err(|e| AuthError::InvalidPrivateKey(e.to_string()))?;
        Ok(Self {
            inner: BiscuitKeyPair::from(&private_key),
        })
    }

    pub fn load_from_file(path: &Path) -> Result<Self, AuthError> {
        let hex = std::fs::read_to_string(path)?;
        Self::from_private_key_hex(&hex)
    }

    pub(crate) fn inner(&self) -> &BiscuitKeyPair {
        &self.inner
    }

    pub fn public_key(&self) -> PublicKey {
        self.inner.public()
    }

    pub fn private_key_hex(&self) -> String {
        self.inner.private().to_bytes_hex()
    }

    pub fn public_key_hex(&self) -> String {
        self.inner.public().to_bytes_hex()
    }

    /// Write the private key (and optionally the public key) as hex.
    pub fn save_to_files(
        &self,
        private_key_path: &Path,
        public_key_path: Option<&Path>,
    ) -> Result<(), AuthError> {
        std::fs::write(private_key_path, self.private_key_hex())?;
        if let Some(path) = public_key_path {
            std::fs::write(path, self.public_key_hex())?;
        }
        Ok(())
    }
}
