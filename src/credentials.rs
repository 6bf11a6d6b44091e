use std::path::{Path, PathBuf};

use google_gmail1::oauth2::{self, ApplicationSecret};
use hyper::{header, Body, Method, Request};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{MailError, MailResult};
use crate::gmail_client::https_client;

pub const SCOPES: [&str; 3] = [
    "https://mail.google.com/",
    "https://www.googleapis.com/auth/gmail.modify",
    "https://www.googleapis.com/auth/gmail.readonly",
];

/// Persisted OAuth2 credential (`authorized_user` token file)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredential {
    #[serde(rename = "type")]
    pub kind: String,
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

impl StoredCredential {
    pub fn authorized_user(secret: &ApplicationSecret, refresh_token: String) -> Self {
        Self {
            kind: "authorized_user".to_string(),
            client_id: secret.client_id.clone(),
            client_secret: secret.client_secret.clone(),
            refresh_token,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    refresh_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// Reads and writes the token file, and bootstraps it from a one-time code
#[derive(Debug, Clone)]
pub struct CredentialStore {
    credentials_path: PathBuf,
    token_path: PathBuf,
}

impl CredentialStore {
    pub fn new(credentials_path: impl Into<PathBuf>, token_path: impl Into<PathBuf>) -> Self {
        Self {
            credentials_path: credentials_path.into(),
            token_path: token_path.into(),
        }
    }

    pub fn token_path(&self) -> &Path {
        &self.token_path
    }

    /// Load the saved credential, `None` when absent or unreadable
    pub async fn load(&self) -> Option<StoredCredential> {
        let content = match tokio::fs::read_to_string(&self.token_path).await {
            Ok(content) => content,
            Err(e) => {
                info!("No saved credentials found at {:?}: {}", self.token_path, e);
                return None;
            }
        };

        match serde_json::from_str::<StoredCredential>(&content) {
            Ok(credential) => Some(credential),
            Err(e) => {
                warn!("Ignoring malformed token file {:?}: {}", self.token_path, e);
                None
            }
        }
    }

    pub async fn save(&self, credential: &StoredCredential) -> MailResult<()> {
        let payload = serde_json::to_string(credential)
            .map_err(|e| MailError::authorization(format!("unable to serialize credential: {}", e)))?;
        tokio::fs::write(&self.token_path, payload).await?;
        info!("💾 Credentials saved to {:?}", self.token_path);
        Ok(())
    }

    /// Return the saved credential, or exchange `auth_code` for a new one and persist it
    pub async fn authorize(&self, auth_code: Option<&str>) -> MailResult<StoredCredential> {
        if let Some(credential) = self.load().await {
            debug!("Using saved credentials");
            return Ok(credential);
        }

        let secret = self.read_application_secret().await?;
        let url = authorization_url(&secret)?;
        info!("🔑 Authorize this app by visiting this url: {}", url);
        info!("After authorizing, copy the code from the redirect URL into AUTH_CODE");

        let code = auth_code.ok_or_else(|| {
            MailError::authorization("no saved credentials and no AUTH_CODE supplied; visit the authorization URL first")
        })?;

        let credential = exchange_code(&secret, code).await?;
        self.save(&credential).await?;
        Ok(credential)
    }

    async fn read_application_secret(&self) -> MailResult<ApplicationSecret> {
        oauth2::read_application_secret(&self.credentials_path)
            .await
            .map_err(|e| {
                MailError::authorization(format!(
                    "unable to read OAuth2 client credentials file {:?}: {}",
                    self.credentials_path, e
                ))
            })
    }
}

fn redirect_uri(secret: &ApplicationSecret) -> MailResult<&str> {
    secret
        .redirect_uris
        .first()
        .map(String::as_str)
        .ok_or_else(|| MailError::authorization("client credentials file declares no redirect URI"))
}

/// Consent URL requesting offline access to the Gmail scopes
pub fn authorization_url(secret: &ApplicationSecret) -> MailResult<String> {
    let scope = SCOPES.join(" ");
    let url = url::Url::parse_with_params(
        &secret.auth_uri,
        &[
            ("client_id", secret.client_id.as_str()),
            ("redirect_uri", redirect_uri(secret)?),
            ("response_type", "code"),
            ("scope", scope.as_str()),
            ("access_type", "offline"),
            ("prompt", "consent"),
        ],
    )
    .map_err(|e| MailError::authorization(format!("invalid auth_uri '{}': {}", secret.auth_uri, e)))?;
    Ok(url.to_string())
}

/// Exchange a one-time authorization code at the token endpoint
pub async fn exchange_code(secret: &ApplicationSecret, code: &str) -> MailResult<StoredCredential> {
    info!("Exchanging authorization code for tokens");

    let form = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("code", code.trim())
        .append_pair("client_id", &secret.client_id)
        .append_pair("client_secret", &secret.client_secret)
        .append_pair("redirect_uri", redirect_uri(secret)?)
        .append_pair("grant_type", "authorization_code")
        .finish();

    let request = Request::builder()
        .method(Method::POST)
        .uri(secret.token_uri.as_str())
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form))
        .map_err(|e| MailError::authorization(format!("invalid token request: {}", e)))?;

    let response = https_client()
        .request(request)
        .await
        .map_err(|e| MailError::authorization(format!("token endpoint unreachable: {}", e)))?;
    let status = response.status();
    let bytes = hyper::body::to_bytes(response.into_body())
        .await
        .map_err(|e| MailError::authorization(format!("unable to read token response: {}", e)))?;

    let token: TokenResponse = serde_json::from_slice(&bytes)
        .map_err(|e| MailError::authorization(format!("unexpected token response ({}): {}", status, e)))?;

    if let Some(error) = token.error {
        return Err(MailError::authorization(format!(
            "token endpoint rejected the code: {} {}",
            error,
            token.error_description.unwrap_or_default()
        )));
    }

    let refresh_token = token
        .refresh_token
        .ok_or_else(|| MailError::authorization("token response carries no refresh token"))?;

    Ok(StoredCredential::authorized_user(secret, refresh_token))
}
