//! Blocking client for the cloud-drive REST API.
//!
//! The drive is addressed by opaque ids: folders and files live in a hierarchy
//! of parents and are located by query rather than by path. This crate only
//! speaks the protocol; deciding what to upload or delete is the job of
//! `carebook-core`.
//!
//! # Modules
//!
//! - [`client`]: [`DriveClient`] with list / create-folder / upload / download / delete
//! - [`query`]: filter expressions in the backend's query grammar
//! - [`multipart`]: `multipart/related` upload bodies
//! - [`models`]: wire types
//! - [`config`]: endpoint and timeout settings

pub mod client;
pub mod config;
pub mod models;
pub mod multipart;
pub mod query;

pub use client::DriveClient;
pub use config::DriveConfig;
pub use models::{RemoteFile, FOLDER_MIME_TYPE, JSON_MIME_TYPE, ROOT_FOLDER_ID};
pub use query::Query;

use thiserror::Error;

/// Drive API errors.
#[derive(Error, Debug)]
pub enum DriveError {
    #[error("Authorization rejected (HTTP {status}): {body}")]
    Auth { status: u16, body: String },

    #[error("Remote item not found: {0}")]
    NotFound(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Transport error: {0}")]
    Network(String),

    #[error("Unexpected response body: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for DriveError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            DriveError::Decode(e.to_string())
        } else {
            DriveError::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for DriveError {
    fn from(e: serde_json::Error) -> Self {
        DriveError::Decode(e.to_string())
    }
}

pub type DriveResult<T> = Result<T, DriveError>;

/// Map a non-success HTTP status to an error.
pub fn classify_status(status: u16, body: String) -> DriveError {
    match status {
        401 | 403 => DriveError::Auth { status, body },
        404 => DriveError::NotFound(body),
        _ => DriveError::Http { status, body },
    }
}
