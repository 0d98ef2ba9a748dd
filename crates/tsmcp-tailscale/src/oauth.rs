//! OAuth client-credentials tokens for the control-plane API.
//!
//! A [`TokenManager`] owns the cached bearer token. The token is reused until
//! the control plane rejects it, then dropped and re-acquired. Re-acquisition
//! is bounded by `max_attempts`; a token that keeps being rejected ends in
//! `TailscaleError::AuthFailed`.

use std::fmt;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::api::ControlPlaneClient;
use crate::error::{Result, TailscaleError};

/// Default number of acquire-and-validate rounds in [`TokenManager::get_token`].
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// OAuth client identifier and secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    client_id: String,
    client_secret: String,
}

impl Credentials {
    /// Create credentials, rejecting blank values.
    ///
    /// # Errors
    ///
    /// Returns `TailscaleError::Config` if either value is blank.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Result<Self> {
        let client_id = client_id.into().trim().to_string();
        let client_secret = client_secret.into().trim().to_string();
        if client_id.is_empty() || client_secret.is_empty() {
            return Err(TailscaleError::config("client ID and secret are required"));
        }
        Ok(Self {
            client_id,
            client_secret,
        })
    }

    /// The OAuth client identifier.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Token response from `POST /oauth/token`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthToken {
    /// Bearer token.
    pub access_token: String,
    /// Lifetime in seconds, as reported by the server.
    #[serde(default)]
    pub expires_in: u64,
}

impl fmt::Debug for OAuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthToken")
            .field("access_token", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Acquires, caches and validates control-plane bearer tokens.
#[derive(Debug)]
pub struct TokenManager {
    api: ControlPlaneClient,
    credentials: Credentials,
    cache: Mutex<Option<OAuthToken>>,
    max_attempts: u32,
}

impl TokenManager {
    /// Create a manager with an empty cache.
    #[must_use]
    pub fn new(api: ControlPlaneClient, credentials: Credentials) -> Self {
        Self {
            api,
            credentials,
            cache: Mutex::new(None),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Set the number of acquire-and-validate rounds. Zero is treated as one.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Configured attempt bound.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// The control-plane client tokens are issued for.
    #[must_use]
    pub fn api(&self) -> &ControlPlaneClient {
        &self.api
    }

    /// Snapshot of the cached token.
    #[must_use]
    pub fn cached(&self) -> Option<OAuthToken> {
        self.cache.lock().clone()
    }

    /// Drop the cached token.
    pub fn invalidate(&self) {
        self.cache.lock().take();
    }

    /// Return the cached token, requesting a new one if the cache is empty.
    ///
    /// # Errors
    ///
    /// - `TailscaleError::AuthFailed` if the token endpoint refuses the credentials
    /// - `TailscaleError::Http` if the endpoint is unreachable
    /// - `TailscaleError::JsonParse` if the response is not a token
    pub async fn acquire(&self) -> Result<OAuthToken> {
        if let Some(token) = self.cached() {
            return Ok(token);
        }

        let token = self.request_token().await?;
        *self.cache.lock() = Some(token.clone());
        info!(
            client_id = %self.credentials.client_id,
            expires_in = token.expires_in,
            "acquired oauth token"
        );
        Ok(token)
    }

    /// Whether the control plane currently accepts `token`.
    pub async fn is_valid(&self, token: &str) -> bool {
        self.api.is_token_valid(token).await
    }

    /// Return a token the control plane accepts.
    ///
    /// Each round acquires (or reuses) a token and validates it; a rejected
    /// token is dropped from the cache before the next round.
    ///
    /// # Errors
    ///
    /// Returns `TailscaleError::AuthFailed` once `max_attempts` rounds have
    /// been rejected, or the first acquisition error.
    pub async fn get_token(&self) -> Result<String> {
        for attempt in 1..=self.max_attempts {
            let token = self.acquire().await?;
            if self.is_valid(&token.access_token).await {
                debug!(attempt, "oauth token accepted");
                return Ok(token.access_token);
            }

            warn!(
                attempt,
                max_attempts = self.max_attempts,
                "oauth token rejected by control plane"
            );
            self.invalidate();
        }

        Err(TailscaleError::auth_failed(format!(
            "token rejected after {} attempts",
            self.max_attempts
        )))
    }

    async fn request_token(&self) -> Result<OAuthToken> {
        let response = self
            .api
            .http()
            .post(self.api.url("/oauth/token"))
            .basic_auth(&self.credentials.client_id, Some(&self.credentials.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TailscaleError::auth_failed(format!(
                "token endpoint returned {status}: {}",
                body.trim()
            )));
        }

        let body = response.bytes().await?;
        let token: OAuthToken = serde_json::from_slice(&body).map_err(|e| {
            TailscaleError::json_parse(format!("failed to parse token response: {e}"))
        })?;

        if token.access_token.is_empty() {
            return Err(TailscaleError::auth_failed(
                "token endpoint returned an empty access token",
            ));
        }

        Ok(token)
    }
}
