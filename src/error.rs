//! Error types for the classroom slides pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the classroom slides library
#[derive(Error, Debug)]
pub enum Error {
    /// PDF processing error
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport-level HTTP failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON encoding/decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed URL
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Remote API answered with a non-success status
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Token endpoint rejected an exchange or refresh
    #[error("Token endpoint error: {0}")]
    TokenEndpoint(String),

    /// The user declined consent (or the provider reported an error on the callback)
    #[error("Authorization declined: {0}")]
    ConsentDenied(String),

    /// Callback request could not be understood
    #[error("Invalid authorization callback: {0}")]
    InvalidCallback(String),

    /// Client secret configuration is unusable
    #[error("Invalid client secrets in {}: {message}", .path.display())]
    InvalidClientSecrets { path: PathBuf, message: String },

    /// File not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Invalid PDF (no pages)
    #[error("PDF has no pages: {}", .0.display())]
    EmptyPdf(PathBuf),

    /// Course listing failed (the failure itself was already logged)
    #[error("Course listing is unavailable")]
    CoursesUnavailable,

    /// Named course is not among the listed courses
    #[error("Course not found: {0}")]
    CourseNotFound(String),

    /// Announcement listing failed (the failure itself was already logged)
    #[error("Materials for course {0} are unavailable")]
    MaterialsUnavailable(String),

    /// Destination folder could not be created
    #[error("Could not create folder: {0}")]
    FolderNotCreated(String),

    /// Nothing matched the title filter
    #[error("No materials matched both \"{topic}\" and \"{file_type}\"")]
    NoMatchingMaterials { topic: String, file_type: String },

    /// General error
    #[error("{0}")]
    General(String),
}
