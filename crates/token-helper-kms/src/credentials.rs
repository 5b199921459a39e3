use std::{
    fs,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use token_helper_core::cipher::CipherError;
use tracing::debug;

/// Static access token override, as understood by gcloud and terraform.
pub const ACCESS_TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";
/// Path to an application default credentials file.
pub const APPLICATION_CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const CLOUD_KMS_SCOPE: &str = "https://www.googleapis.com/auth/cloudkms";
pub const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: u64 = 3600;
pub const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Where the OAuth2 access token for Cloud KMS comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// Discover a source from the environment on first use.
    Auto,
    /// A ready-to-use bearer token.
    Static(String),
    /// gcloud user credentials exchanged through the refresh-token grant.
    AuthorizedUser(AuthorizedUser),
    /// Service account key exchanged through a signed JWT-bearer assertion.
    ServiceAccount(ServiceAccount),
    /// GCE/GKE metadata server.
    Metadata { url: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizedUser {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    pub token_uri: String,
}

#[derive(Clone, PartialEq, Eq)]
pub struct ServiceAccount {
    pub client_email: String,
    pub private_key_id: Option<String>,
    /// PEM-encoded RSA key, as shipped in the key file.
    pub private_key: String,
    pub token_uri: String,
}

impl std::fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct CredentialsFile {
    #[serde(rename = "type")]
    kind: String,
    client_id: Option<String>,
    client_secret: Option<String>,
    refresh_token: Option<String>,
    client_email: Option<String>,
    private_key_id: Option<String>,
    private_key: Option<String>,
    token_uri: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct AssertionClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: u64,
    exp: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl CredentialSource {
    /// Fetch a bearer token, resolving `Auto` against the process environment.
    pub async fn access_token(&self, http: &Client) -> Result<String, CipherError> {
        match self {
            CredentialSource::Auto => {
                let source = discover(|name| std::env::var(name).ok(), well_known_file())?;
                source.fetch(http).await
            }
            other => other.fetch(http).await,
        }
    }

    async fn fetch(&self, http: &Client) -> Result<String, CipherError> {
        match self {
            CredentialSource::Auto => Err(CipherError::Credentials(
                "credential source was not resolved".to_string(),
            )),
            CredentialSource::Static(token) => Ok(token.clone()),
            CredentialSource::AuthorizedUser(user) => refresh_user_token(http, user).await,
            CredentialSource::ServiceAccount(account) => {
                service_account_token(http, account).await
            }
            CredentialSource::Metadata { url } => metadata_token(http, url).await,
        }
    }
}

/// Pick a credential source: explicit token, then a credentials file (env var
/// or gcloud's well-known location), then the metadata server.
pub fn discover<F>(lookup: F, well_known: Option<PathBuf>) -> Result<CredentialSource, CipherError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(token) = lookup(ACCESS_TOKEN_ENV).filter(|t| !t.trim().is_empty()) {
        debug!("using access token from {ACCESS_TOKEN_ENV}");
        return Ok(CredentialSource::Static(token.trim().to_string()));
    }

    if let Some(path) = lookup(APPLICATION_CREDENTIALS_ENV).filter(|p| !p.is_empty()) {
        debug!(%path, "using credentials file from {APPLICATION_CREDENTIALS_ENV}");
        return load_credentials_file(Path::new(&path));
    }

    if let Some(path) = well_known.filter(|p| p.is_file()) {
        debug!(path = %path.display(), "using gcloud application default credentials");
        return load_credentials_file(&path);
    }

    debug!("falling back to the metadata server");
    Ok(CredentialSource::Metadata {
        url: METADATA_TOKEN_URL.to_string(),
    })
}

/// gcloud's application default credentials location for this platform.
pub fn well_known_file() -> Option<PathBuf> {
    #[cfg(windows)]
    let base = dirs::config_dir()?;
    #[cfg(not(windows))]
    let base = dirs::home_dir()?.join(".config");

    Some(base.join("gcloud").join("application_default_credentials.json"))
}

pub fn load_credentials_file(path: &Path) -> Result<CredentialSource, CipherError> {
    let raw = fs::read(path).map_err(|e| {
        CipherError::Credentials(format!("failed to read {}: {e}", path.display()))
    })?;
    let file: CredentialsFile = serde_json::from_slice(&raw).map_err(|e| {
        CipherError::Credentials(format!("failed to parse {}: {e}", path.display()))
    })?;

    let missing = |field: &str| {
        CipherError::Credentials(format!("{} is missing {field}", path.display()))
    };
    let token_uri = file
        .token_uri
        .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string());

    match file.kind.as_str() {
        "authorized_user" => Ok(CredentialSource::AuthorizedUser(AuthorizedUser {
            client_id: file.client_id.ok_or_else(|| missing("client_id"))?,
            client_secret: file.client_secret.ok_or_else(|| missing("client_secret"))?,
            refresh_token: file.refresh_token.ok_or_else(|| missing("refresh_token"))?,
            token_uri,
        })),
        "service_account" => {
            let private_key = file.private_key.ok_or_else(|| missing("private_key"))?;
            // Reject unusable keys up front rather than on the first request.
            signing_key(&private_key)?;
            Ok(CredentialSource::ServiceAccount(ServiceAccount {
                client_email: file.client_email.ok_or_else(|| missing("client_email"))?,
                private_key_id: file.private_key_id,
                private_key,
                token_uri,
            }))
        }
        other => Err(CipherError::Credentials(format!(
            "unsupported credential type {other:?} in {}",
            path.display()
        ))),
    }
}

fn signing_key(pem: &str) -> Result<EncodingKey, CipherError> {
    EncodingKey::from_rsa_pem(pem.as_bytes())
        .map_err(|e| CipherError::Credentials(format!("invalid service account key: {e}")))
}

fn sign_assertion(account: &ServiceAccount, now: u64) -> Result<String, CipherError> {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = account.private_key_id.clone();
    let claims = AssertionClaims {
        iss: account.client_email.clone(),
        scope: CLOUD_KMS_SCOPE.to_string(),
        aud: account.token_uri.clone(),
        iat: now,
        exp: now + ASSERTION_LIFETIME_SECS,
    };

    jsonwebtoken::encode(&header, &claims, &signing_key(&account.private_key)?)
        .map_err(|e| CipherError::Credentials(format!("failed to sign assertion: {e}")))
}

async fn service_account_token(
    http: &Client,
    account: &ServiceAccount,
) -> Result<String, CipherError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| CipherError::Credentials(format!("system clock error: {e}")))?
        .as_secs();
    let assertion = sign_assertion(account, now)?;

    let response = http
        .post(&account.token_uri)
        .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
        .send()
        .await
        .map_err(|e| {
            CipherError::Credentials(format!("failed to exchange service account assertion: {e}"))
        })?;

    read_token_response(response, "token endpoint").await
}

async fn refresh_user_token(http: &Client, user: &AuthorizedUser) -> Result<String, CipherError> {
    let response = http
        .post(&user.token_uri)
        .form(&[
            ("client_id", user.client_id.as_str()),
            ("client_secret", user.client_secret.as_str()),
            ("refresh_token", user.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ])
        .send()
        .await
        .map_err(|e| CipherError::Credentials(format!("failed to refresh user token: {e}")))?;

    read_token_response(response, "token endpoint").await
}

async fn metadata_token(http: &Client, url: &str) -> Result<String, CipherError> {
    let response = http
        .get(url)
        .header("Metadata-Flavor", "Google")
        .send()
        .await
        .map_err(|e| CipherError::Credentials(format!("failed to request metadata token: {e}")))?;

    read_token_response(response, "metadata token endpoint").await
}

async fn read_token_response(
    response: reqwest::Response,
    origin: &str,
) -> Result<String, CipherError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(CipherError::Credentials(format!(
            "{origin} returned {}: {body}",
            status.as_u16()
        )));
    }

    let token: TokenResponse = response.json().await.map_err(|e| {
        CipherError::Credentials(format!("failed to decode {origin} response: {e}"))
    })?;
    if token.access_token.trim().is_empty() {
        return Err(CipherError::Credentials(format!(
            "{origin} response did not include an access token"
        )));
    }
    Ok(token.access_token)
}
