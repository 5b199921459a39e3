use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Errors produced by cipher implementations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CipherError {
    /// The call did not finish within the operation timeout.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),
    /// No usable credentials for the remote service.
    #[error("credentials error: {0}")]
    Credentials(String),
    /// Transport-level failure talking to the remote service.
    #[error("request failed: {0}")]
    Request(String),
    /// The remote service answered with a non-success status.
    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },
    /// The remote payload could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
}

/// Encrypt/decrypt capability delegated to an external key-management service.
///
/// Implementations may perform network I/O. Callers bound each call with their
/// own timeout, so implementations do not need one.
#[async_trait]
pub trait Cipher: Send + Sync {
    /// Short name used for logging.
    fn name(&self) -> &'static str;

    async fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CipherError>;

    async fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CipherError>;
}

/// XOR cipher for tests and smoke runs.
/// This is not cryptographically secure and is never wired into the binary.
#[derive(Debug, Clone, Copy)]
pub struct MaskingCipher {
    mask: u8,
}

impl MaskingCipher {
    pub fn new(mask: u8) -> Self {
        Self { mask }
    }

    fn apply(&self, input: &[u8]) -> Vec<u8> {
        input.iter().map(|b| b ^ self.mask).collect()
    }
}

impl Default for MaskingCipher {
    fn default() -> Self {
        Self::new(0xA5)
    }
}

#[async_trait]
impl Cipher for MaskingCipher {
    fn name(&self) -> &'static str {
        "masking"
    }

    async fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CipherError> {
        Ok(self.apply(plaintext))
    }

    async fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CipherError> {
        // XOR twice restores the original.
        Ok(self.apply(ciphertext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn masking_round_trips_and_hides_plaintext() {
        let cipher = MaskingCipher::default();
        let secret = b"s.topsecrettoken\n";

        let ciphertext = cipher.encrypt(secret).await.expect("encrypt");
        assert_ne!(ciphertext, secret.to_vec());

        let plaintext = cipher.decrypt(&ciphertext).await.expect("decrypt");
        assert_eq!(plaintext, secret);
    }

    #[tokio::test]
    async fn different_masks_do_not_share_ciphertext() {
        let a = MaskingCipher::new(0x01);
        let b = MaskingCipher::new(0x02);
        let ciphertext = a.encrypt(b"token").await.expect("encrypt");

        let wrong = b.decrypt(&ciphertext).await.expect("decrypt");
        assert_ne!(wrong, b"token".to_vec());
    }
}
