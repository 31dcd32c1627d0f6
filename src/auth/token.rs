//! Cached credential and token endpoint calls

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::secrets::ClientSecrets;
use crate::error::{Error, Result};

/// Access tokens this close to expiry are treated as expired
const EXPIRY_SKEW_SECS: i64 = 10;

/// Authorized-user credential as stored in the token cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Access token
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub token_uri: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

/// Successful token endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

impl Credential {
    /// Build a fresh credential from a code exchange
    pub fn from_token_response(
        response: TokenResponse,
        secrets: &ClientSecrets,
        requested_scopes: &[&str],
        now: DateTime<Utc>,
    ) -> Self {
        let scopes = match response.scope {
            Some(ref granted) => granted.split_whitespace().map(str::to_string).collect(),
            None => requested_scopes.iter().map(|s| s.to_string()).collect(),
        };

        Self {
            token: response.access_token,
            refresh_token: response.refresh_token,
            token_uri: secrets.token_uri.clone(),
            client_id: secrets.client_id.clone(),
            client_secret: secrets.client_secret.clone(),
            scopes,
            expiry: response.expires_in.map(|secs| now + Duration::seconds(secs)),
        }
    }

    /// Load the cached credential, or `None` if no cache exists
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    /// Overwrite the cache with this credential
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string(self)?)?;
        debug!(path = %path.display(), "Saved credential cache");
        Ok(())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            Some(expiry) => expiry - Duration::seconds(EXPIRY_SKEW_SECS) <= now,
            None => false,
        }
    }

    /// Usable without refreshing
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.token.is_empty() && !self.is_expired_at(now)
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Exchange the refresh token for a new access token
    ///
    /// A single attempt; failures are returned as-is.
    pub fn refresh(&mut self, http: &Client, now: DateTime<Utc>) -> Result<()> {
        let refresh_token = self
            .refresh_token
            .clone()
            .ok_or_else(|| Error::TokenEndpoint("no refresh token".to_string()))?;

        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        let response = post_token_request(http, &self.token_uri, &params)?;

        self.token = response.access_token;
        self.expiry = response.expires_in.map(|secs| now + Duration::seconds(secs));
        if let Some(rotated) = response.refresh_token {
            self.refresh_token = Some(rotated);
        }

        info!("Refreshed access token");
        Ok(())
    }
}

/// Trade an authorization code for tokens
pub fn exchange_code(
    http: &Client,
    secrets: &ClientSecrets,
    code: &str,
    redirect_uri: &str,
    code_verifier: &str,
) -> Result<TokenResponse> {
    let params = [
        ("grant_type", "authorization_code"),
        ("code", code),
        ("client_id", secrets.client_id.as_str()),
        ("client_secret", secrets.client_secret.as_str()),
        ("redirect_uri", redirect_uri),
        ("code_verifier", code_verifier),
    ];
    post_token_request(http, &secrets.token_uri, &params)
}

fn post_token_request(http: &Client, token_uri: &str, params: &[(&str, &str)]) -> Result<TokenResponse> {
    let response = http.post(token_uri).form(params).send()?;
    let status = response.status();
    let body = response.text()?;

    if !status.is_success() {
        let message = match serde_json::from_str::<TokenErrorResponse>(&body) {
            Ok(TokenErrorResponse { error, error_description: Some(description) }) => {
                format!("{}: {}", error, description)
            }
            Ok(TokenErrorResponse { error, .. }) => error,
            Err(_) => format!("HTTP {}", status.as_u16()),
        };
        return Err(Error::TokenEndpoint(message));
    }

    Ok(serde_json::from_str(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn sample(expiry: Option<DateTime<Utc>>, refresh: Option<&str>) -> Credential {
        Credential {
            token: "ya29.token".to_string(),
            refresh_token: refresh.map(str::to_string),
            token_uri: "https://oauth2.googleapis.com/token".to_string(),
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            scopes: vec!["https://www.googleapis.com/auth/drive".to_string()],
            expiry,
        }
    }

    #[test]
    fn test_validity_follows_expiry() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();

        assert!(sample(None, None).is_valid_at(now));
        assert!(sample(Some(now + Duration::hours(1)), None).is_valid_at(now));
        assert!(!sample(Some(now - Duration::hours(1)), None).is_valid_at(now));
        // Inside the skew window counts as expired
        assert!(!sample(Some(now + Duration::seconds(5)), None).is_valid_at(now));
    }

    #[test]
    fn test_can_refresh() {
        assert!(sample(None, Some("1//refresh")).can_refresh());
        assert!(!sample(None, Some("")).can_refresh());
        assert!(!sample(None, None).can_refresh());
    }

    #[test]
    fn test_cache_reads_authorized_user_format() {
        let raw = r#"{"token":"ya29.a","refresh_token":"1//r","token_uri":"https://oauth2.googleapis.com/token",
            "client_id":"id","client_secret":"s","scopes":["https://www.googleapis.com/auth/drive"],
            "universe_domain":"googleapis.com","account":"","expiry":"2024-03-01T12:00:00.123456Z"}"#;

        let credential: Credential = serde_json::from_str(raw).unwrap();
        assert_eq!(credential.refresh_token.as_deref(), Some("1//r"));
        assert_eq!(
            credential.expiry.map(|e| e.timestamp()),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap().timestamp())
        );
    }

    #[test]
    fn test_save_overwrites_and_load_returns_same() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let path = dir.path().join("token.json");
        std::fs::write(&path, "stale").unwrap();

        let credential = sample(Some(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()), Some("r"));
        credential.save(&path).unwrap();

        assert_eq!(Credential::load(&path).unwrap(), Some(credential));
    }

    #[test]
    fn test_load_absent_cache() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        assert_eq!(Credential::load(&dir.path().join("token.json")).unwrap(), None);
    }

    #[test]
    fn test_from_token_response_uses_granted_scopes() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let secrets = ClientSecrets {
            client_id: "id".to_string(),
            client_secret: "s".to_string(),
            auth_uri: "https://accounts.google.com/o/oauth2/auth".to_string(),
            token_uri: "https://oauth2.googleapis.com/token".to_string(),
        };
        let response = TokenResponse {
            access_token: "a".to_string(),
            expires_in: Some(3599),
            refresh_token: Some("r".to_string()),
            scope: Some("scope-a scope-b".to_string()),
        };

        let credential = Credential::from_token_response(response, &secrets, &["requested"], now);
        assert_eq!(credential.scopes, vec!["scope-a", "scope-b"]);
        assert_eq!(credential.expiry, Some(now + Duration::seconds(3599)));
        assert_eq!(credential.client_id, "id");
    }
}
