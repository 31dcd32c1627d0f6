//! Shared plumbing for the remote APIs
//!
//! A [`Session`] pairs an HTTP client with the bearer token from the
//! authenticator. It is passed explicitly to every API client.

use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Deserialize;

use crate::auth::Credential;
use crate::error::{Error, Result};

/// Authenticated handle for calling the remote APIs
#[derive(Debug, Clone)]
pub struct Session {
    http: Client,
    access_token: String,
}

impl Session {
    pub fn new(http: Client, access_token: impl Into<String>) -> Self {
        Self {
            http,
            access_token: access_token.into(),
        }
    }

    /// Build a session from a credential
    pub fn from_credential(http: Client, credential: &Credential) -> Self {
        Self::new(http, credential.token.clone())
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        self.http.get(url).bearer_auth(&self.access_token)
    }

    pub fn post(&self, url: &str) -> RequestBuilder {
        self.http.post(url).bearer_auth(&self.access_token)
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

/// Map a non-success response to [`Error::Api`]
pub fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().unwrap_or_default();
    Err(Error::Api {
        status: status.as_u16(),
        message: error_message(&body, status.canonical_reason().unwrap_or("request failed")),
    })
}

/// Extract the human-readable message from a Google-style error body
fn error_message(body: &str, fallback: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(ErrorEnvelope { error: ErrorBody { message: Some(message), .. } }) => message,
        Ok(ErrorEnvelope { error: ErrorBody { status: Some(status), .. } }) => status,
        _ if !body.trim().is_empty() => body.trim().to_string(),
        _ => fallback.to_string(),
    }
}
