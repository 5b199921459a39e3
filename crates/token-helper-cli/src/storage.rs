use color_eyre::Result;
use token_helper_core::store::TokenStore;
use token_helper_kms::{
    credentials::CredentialSource,
    gcp::{GcpKmsCipher, GcpKmsSettings},
};
use tracing::debug;

use crate::{config::Config, version};

/// Build the production store: Cloud KMS cipher, credentials discovered lazily.
pub fn store_from_config(config: &Config) -> Result<TokenStore<GcpKmsCipher>> {
    debug!(
        key_id = %config.key_id,
        path = %config.token_path.display(),
        timeout = ?config.timeout,
        "initializing token store"
    );
    let cipher = GcpKmsCipher::new(GcpKmsSettings {
        key_id: config.key_id.clone(),
        endpoint: config.endpoint.clone(),
        user_agent: version::user_agent(),
        credentials: CredentialSource::Auto,
    })?;
    Ok(TokenStore::new(
        cipher,
        config.token_path.clone(),
        config.timeout,
    ))
}

/// Helper for tests to construct a store at `path` with the masking cipher.
#[cfg(test)]
pub fn test_store(
    path: impl Into<std::path::PathBuf>,
) -> TokenStore<token_helper_core::cipher::MaskingCipher> {
    TokenStore::new(
        token_helper_core::cipher::MaskingCipher::default(),
        path,
        crate::config::DEFAULT_TIMEOUT,
    )
}
