//! Bearer-token session handling for the CivicSource API family.

use crate::utils::error::{ParserError, Result};
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use url::Url;

/// Tokens are treated as valid for a fixed window client-side; the API
/// does not return an explicit expiry.
pub const TOKEN_LIFETIME_HOURS: i64 = 24;

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    token: String,
}

/// Authenticated session against one CivicSource deployment.
pub struct AuthSession {
    client: Client,
    base_url: Url,
    credentials: Credentials,
    token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
}

impl AuthSession {
    pub fn new(client: Client, base_url: Url, credentials: Credentials) -> Self {
        Self {
            client,
            base_url,
            credentials,
            token: None,
            expires_at: None,
        }
    }

    pub fn bearer_token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now() >= expires_at,
            None => true,
        }
    }

    /// Adopt a previously issued token, e.g. one persisted across runs.
    pub fn set_token(&mut self, token: String, expires_at: DateTime<Utc>) {
        self.token = Some(token);
        self.expires_at = Some(expires_at);
    }

    /// Full login with the configured credentials.
    pub async fn authenticate(&mut self) -> Result<()> {
        let url = self.endpoint("auth/login")?;
        let response = self
            .client
            .post(url)
            .json(&json!({
                "email": self.credentials.email,
                "password": self.credentials.password,
            }))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                tracing::error!("Authentication failed: {}", e);
                ParserError::authentication(format!("Failed to authenticate: {}", e))
            })?;

        let auth: AuthResponse = response.json().await.map_err(|e| {
            ParserError::authentication(format!("Malformed authentication response: {}", e))
        })?;

        self.store_token(auth.token);
        Ok(())
    }

    /// Exchange the current token for a fresh one.
    pub async fn refresh(&mut self) -> Result<()> {
        let token = self.token.clone().ok_or_else(|| {
            ParserError::authentication("No token available to refresh".to_string())
        })?;

        let url = self.endpoint("auth/refresh")?;
        let response = self
            .client
            .post(url)
            .bearer_auth(&token)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                ParserError::authentication(format!("Failed to refresh session: {}", e))
            })?;

        let auth: AuthResponse = response.json().await.map_err(|e| {
            ParserError::authentication(format!("Malformed refresh response: {}", e))
        })?;

        self.store_token(auth.token);
        Ok(())
    }

    /// Make sure a usable token is in hand before a request proceeds.
    ///
    /// No token: authenticate. Expired token: exactly one refresh attempt,
    /// falling back to full re-authentication if the refresh fails. A
    /// still-valid token issues no request at all.
    pub async fn ensure_valid(&mut self) -> Result<()> {
        if self.token.is_none() {
            return self.authenticate().await;
        }

        if self.is_expired() {
            if let Err(e) = self.refresh().await {
                tracing::warn!("Session refresh failed, re-authenticating: {}", e);
                return self.authenticate().await;
            }
        }

        Ok(())
    }

    /// Confirm the account's email address with a verification code.
    pub async fn verify_email(&self, code: &str) -> Result<()> {
        let url = self.endpoint("auth/verify-email")?;
        self.client
            .post(url)
            .json(&json!({ "code": code }))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                tracing::error!("Email verification failed: {}", e);
                ParserError::authentication(format!("Failed to verify email: {}", e))
            })?;
        Ok(())
    }

    fn store_token(&mut self, token: String) {
        self.token = Some(token);
        self.expires_at = Some(Utc::now() + Duration::hours(TOKEN_LIFETIME_HOURS));
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Resolve an API path under the session's base URL.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).map_err(|e| ParserError::Config {
            message: format!("Invalid endpoint '{}': {}", path, e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> AuthSession {
        AuthSession::new(
            Client::new(),
            Url::parse("https://dekalb.civicsource.com/api/v2/").unwrap(),
            Credentials {
                email: "ops@example.com".to_string(),
                password: "hunter2".to_string(),
            },
        )
    }

    #[test]
    fn test_fresh_session_is_expired() {
        let session = session();
        assert!(session.bearer_token().is_none());
        assert!(session.is_expired());
    }

    #[test]
    fn test_set_token_controls_expiry() {
        let mut session = session();
        session.set_token("tok".to_string(), Utc::now() + Duration::hours(1));
        assert!(!session.is_expired());
        session.set_token("tok".to_string(), Utc::now() - Duration::seconds(1));
        assert!(session.is_expired());
    }

    #[test]
    fn test_endpoint_joins_under_base() {
        let session = session();
        assert_eq!(
            session.endpoint("auth/login").unwrap().as_str(),
            "https://dekalb.civicsource.com/api/v2/auth/login"
        );
    }
}
