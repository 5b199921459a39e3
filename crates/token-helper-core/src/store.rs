use std::{
    future::Future,
    io,
    path::{Path, PathBuf},
    time::Duration,
};

use thiserror::Error;
use tracing::{debug, instrument};

use crate::{
    cipher::{Cipher, CipherError},
    token_file::EncryptedTokenFile,
};

/// Errors surfaced by `TokenStore` operations.
#[derive(Debug, Error)]
pub enum TokenStoreError {
    #[error("failed to encrypt plaintext")]
    Encrypt(#[source] CipherError),
    #[error("failed to decrypt ciphertext")]
    Decrypt(#[source] CipherError),
    #[error("failed to {action} encrypted token file {}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Keeps one token encrypted at rest, delegating all cryptography to `C`.
///
/// Every operation is a single request/response cycle: no retries, and a
/// failure leaves the file exactly as it was.
pub struct TokenStore<C: Cipher> {
    cipher: C,
    file: EncryptedTokenFile,
    timeout: Duration,
}

impl<C: Cipher> TokenStore<C> {
    pub fn new(cipher: C, path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            cipher,
            file: EncryptedTokenFile::new(path),
            timeout,
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Encrypt `plaintext` and replace the stored token with the ciphertext.
    #[instrument(skip_all, fields(cipher = self.cipher.name()))]
    pub async fn store(&self, plaintext: &[u8]) -> Result<(), TokenStoreError> {
        let ciphertext = self
            .bounded(self.cipher.encrypt(plaintext))
            .await
            .map_err(TokenStoreError::Encrypt)?;

        self.file
            .write(&ciphertext)
            .map_err(|source| self.io_err("write", source))?;
        debug!(
            path = %self.path().display(),
            bytes = ciphertext.len(),
            "stored encrypted token"
        );
        Ok(())
    }

    /// Decrypt the stored token. `None` means nothing has been stored, which is
    /// distinct from a stored empty token.
    #[instrument(skip_all, fields(cipher = self.cipher.name()))]
    pub async fn get(&self) -> Result<Option<Vec<u8>>, TokenStoreError> {
        let Some(ciphertext) = self
            .file
            .read()
            .map_err(|source| self.io_err("read", source))?
        else {
            debug!(path = %self.path().display(), "no encrypted token on disk");
            return Ok(None);
        };

        let plaintext = self
            .bounded(self.cipher.decrypt(&ciphertext))
            .await
            .map_err(TokenStoreError::Decrypt)?;
        Ok(Some(plaintext))
    }

    /// Remove the stored token (idempotent).
    #[instrument(skip_all)]
    pub async fn erase(&self) -> Result<(), TokenStoreError> {
        self.file
            .remove()
            .map_err(|source| self.io_err("remove", source))
    }

    async fn bounded<F>(&self, call: F) -> Result<Vec<u8>, CipherError>
    where
        F: Future<Output = Result<Vec<u8>, CipherError>>,
    {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| CipherError::Timeout(self.timeout))?
    }

    fn io_err(&self, action: &'static str, source: io::Error) -> TokenStoreError {
        TokenStoreError::Io {
            action,
            path: self.path().to_path_buf(),
            source,
        }
    }
}
