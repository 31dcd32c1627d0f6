//! Authorization for the classroom and storage APIs
//!
//! The credential is cached on disk. A valid cached credential is used as-is,
//! an expired one with a refresh token is refreshed once, and anything else
//! goes through the interactive consent flow. Whatever was acquired is
//! written back to the cache.

pub mod flow;
pub mod secrets;
pub mod token;

use std::path::PathBuf;

use chrono::Utc;
use reqwest::blocking::Client;
use tracing::info;

use crate::config::PipelineConfig;
use crate::error::Result;

pub use secrets::ClientSecrets;
pub use token::{Credential, TokenResponse};

/// Scopes requested during consent
pub const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/classroom.courses.readonly",
    "https://www.googleapis.com/auth/classroom.announcements.readonly",
    "https://www.googleapis.com/auth/drive",
];

/// Obtains and caches the credential
#[derive(Debug, Clone)]
pub struct Authenticator {
    http: Client,
    token_path: PathBuf,
    client_secrets_path: PathBuf,
}

impl Authenticator {
    pub fn new(http: Client, token_path: impl Into<PathBuf>, client_secrets_path: impl Into<PathBuf>) -> Self {
        Self {
            http,
            token_path: token_path.into(),
            client_secrets_path: client_secrets_path.into(),
        }
    }

    pub fn from_config(http: Client, config: &PipelineConfig) -> Self {
        Self::new(http, &config.token_path, &config.client_secrets_path)
    }

    /// Return a usable credential, refreshing or prompting as needed
    pub fn get_credential(&self) -> Result<Credential> {
        let now = Utc::now();
        let cached = Credential::load(&self.token_path)?;

        let credential = match cached {
            Some(credential) if credential.is_valid_at(now) => return Ok(credential),
            Some(mut credential) if credential.can_refresh() => {
                credential.refresh(&self.http, now)?;
                credential
            }
            _ => self.authorize_interactively()?,
        };

        credential.save(&self.token_path)?;
        Ok(credential)
    }

    fn authorize_interactively(&self) -> Result<Credential> {
        info!(secrets = %self.client_secrets_path.display(), "Starting interactive authorization");
        let secrets = ClientSecrets::load(&self.client_secrets_path)?;
        let response = flow::run_local_server(&self.http, &secrets, SCOPES)?;
        Ok(Credential::from_token_response(response, &secrets, SCOPES, Utc::now()))
    }
}
