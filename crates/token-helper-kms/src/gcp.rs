use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use token_helper_core::cipher::{Cipher, CipherError};
use tracing::{debug, instrument};

use crate::credentials::CredentialSource;

pub const DEFAULT_ENDPOINT: &str = "https://cloudkms.googleapis.com";

/// Settings for a Cloud KMS cipher bound to one crypto key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GcpKmsSettings {
    /// Full resource id, e.g. `projects/p/locations/global/keyRings/r/cryptoKeys/k`.
    pub key_id: String,
    /// Base URL override (emulators, private endpoints).
    pub endpoint: Option<String>,
    pub user_agent: String,
    pub credentials: CredentialSource,
}

/// `Cipher` backed by the Cloud KMS `encrypt`/`decrypt` REST methods.
pub struct GcpKmsCipher {
    key_id: String,
    endpoint: String,
    credentials: CredentialSource,
    http: Client,
}

#[derive(Debug, Serialize)]
struct EncryptRequest {
    plaintext: String,
}

#[derive(Debug, Deserialize)]
struct EncryptResponse {
    ciphertext: Option<String>,
}

#[derive(Debug, Serialize)]
struct DecryptRequest {
    ciphertext: String,
}

#[derive(Debug, Deserialize)]
struct DecryptResponse {
    // KMS omits the field entirely for an empty plaintext.
    #[serde(default)]
    plaintext: String,
}

impl GcpKmsCipher {
    pub fn new(settings: GcpKmsSettings) -> Result<Self, CipherError> {
        let http = Client::builder()
            .user_agent(settings.user_agent)
            .build()
            .map_err(|e| CipherError::Request(format!("failed to create http client: {e}")))?;

        Ok(Self {
            key_id: settings.key_id,
            endpoint: settings
                .endpoint
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
                .trim_end_matches('/')
                .to_string(),
            credentials: settings.credentials,
            http,
        })
    }

    fn url(&self, method: &str) -> String {
        format!("{}/v1/{}:{method}", self.endpoint, self.key_id)
    }

    async fn call<Req, Resp>(
        &self,
        method: &str,
        field: &str,
        body: &Req,
    ) -> Result<Resp, CipherError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let token = self.credentials.access_token(&self.http).await?;
        let response = self
            .http
            .post(self.url(method))
            .query(&[("fields", field)])
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|e| CipherError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CipherError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| CipherError::Decode(format!("{method} response: {e}")))
    }
}

#[async_trait]
impl Cipher for GcpKmsCipher {
    fn name(&self) -> &'static str {
        "gcp-kms"
    }

    #[instrument(skip_all, fields(key_id = %self.key_id))]
    async fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CipherError> {
        let request = EncryptRequest {
            plaintext: BASE64.encode(plaintext),
        };
        let response: EncryptResponse = self.call("encrypt", "ciphertext", &request).await?;
        let encoded = response.ciphertext.ok_or_else(|| {
            CipherError::Decode("encrypt response did not include ciphertext".to_string())
        })?;

        let ciphertext = BASE64
            .decode(encoded)
            .map_err(|e| CipherError::Decode(format!("ciphertext: {e}")))?;
        debug!(bytes = ciphertext.len(), "kms encrypt succeeded");
        Ok(ciphertext)
    }

    #[instrument(skip_all, fields(key_id = %self.key_id))]
    async fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CipherError> {
        let request = DecryptRequest {
            ciphertext: BASE64.encode(ciphertext),
        };
        let response: DecryptResponse = self.call("decrypt", "plaintext", &request).await?;

        let plaintext = BASE64
            .decode(response.plaintext)
            .map_err(|e| CipherError::Decode(format!("plaintext: {e}")))?;
        debug!(bytes = plaintext.len(), "kms decrypt succeeded");
        Ok(plaintext)
    }
}
