//! Classroom Slides Library
//!
//! Collects PDF attachments from a classroom course and merges them into a
//! single handout. This library provides functionality to:
//! - Authorize against the classroom and storage APIs (cached token, refresh, consent flow)
//! - List courses and announcement materials
//! - Select materials by a case-sensitive dual keyword filter
//! - Copy matching files into a storage folder and download the copies
//! - Merge the downloads into one PDF
//!
//! # Example
//!
//! ```no_run
//! use classroom_slides::api::Session;
//! use classroom_slides::auth::Authenticator;
//! use classroom_slides::classroom::ClassroomClient;
//! use classroom_slides::drive::DriveClient;
//! use classroom_slides::{pipeline, PipelineConfig};
//!
//! let config = PipelineConfig::default();
//! let http = reqwest::blocking::Client::new();
//! let credential = Authenticator::from_config(http.clone(), &config)
//!     .get_credential()
//!     .expect("Failed to authorize");
//! let session = Session::from_credential(http, &credential);
//!
//! let report = pipeline::run(
//!     &ClassroomClient::new(session.clone()),
//!     &DriveClient::new(session),
//!     &config,
//! )
//! .expect("Pipeline failed");
//! println!("Merged PDF saved as {}.", report.output_path.display());
//! ```

pub mod api;
pub mod auth;
pub mod classroom;
pub mod config;
pub mod drive;
pub mod error;
pub mod pdf;
pub mod pipeline;
pub mod select;

// Re-export commonly used items
pub use config::{CopyNaming, PipelineConfig, TitleFilter};
pub use error::{Error, Result};
pub use pipeline::{run, PipelineReport};
