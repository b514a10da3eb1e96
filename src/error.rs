// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Coarse classification shared by every error type in the crate.
///
/// Callers use this to decide between retrying (`NetworkFailure`) and
/// giving up (everything else) without matching on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed URL or argument supplied by the caller
    InvalidInput,
    /// Transport error, timeout or error status while talking to a provider
    NetworkFailure,
    /// A required provider field was absent
    MissingField,
    /// Timestamp, JSON or URL data from upstream could not be parsed
    ParseFailure,
    /// Local filesystem failure while reading or replacing state
    Storage,
}

/// Errors produced by the URL credential codec
#[derive(Error, Debug)]
pub enum UrlError {
    #[error("Credentials in {url} are not valid UTF-8 after percent-decoding")]
    InvalidEncoding { url: String },

    #[error("URL {url} has no authority component to carry credentials")]
    MissingAuthority { url: String },
}

impl UrlError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidInput
    }
}

/// Errors from the HTTP transport
#[derive(Error, Debug)]
pub enum HttpError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP error {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error(transparent)]
    Credentials(#[from] UrlError),
}

/// Errors that can occur while replacing a file atomically
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("Cannot replace {path}: path has no file name")]
    InvalidTarget { path: PathBuf },

    #[error("Temporary file {path} was never written")]
    MissingTemp { path: PathBuf },

    #[error("Failed to move {from} to {to}: {source}")]
    RenameFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove {path}: {source}")]
    RemoveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write temporary file {path}: {source}")]
    TempWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl WriteError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Storage
    }
}

/// Errors that can occur during a channel sync
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Failed to fetch track listing from {url}: {source}")]
    ListingFailed {
        url: String,
        #[source]
        source: HttpError,
    },

    #[error("Failed to parse track listing from {url}: {source}")]
    ListingParseFailed {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Metadata probe failed for {url}: {source}")]
    ProbeFailed {
        url: String,
        #[source]
        source: HttpError,
    },

    #[error("Track '{track}' is missing required field '{field}'")]
    MissingField { track: String, field: &'static str },

    #[error("Failed to parse timestamp '{value}' (expected YYYY/MM/DD HH:MM:SS)")]
    InvalidTimestamp { value: String },

    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error(transparent)]
    Credentials(#[from] UrlError),
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::ListingFailed { .. } | SyncError::ProbeFailed { .. } => {
                ErrorKind::NetworkFailure
            }
            SyncError::MissingField { .. } => ErrorKind::MissingField,
            SyncError::ListingParseFailed { .. }
            | SyncError::InvalidTimestamp { .. }
            | SyncError::InvalidUrl { .. } => ErrorKind::ParseFailure,
            SyncError::Credentials(e) => e.kind(),
        }
    }

    /// Whether retrying the whole channel later could succeed
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::NetworkFailure
    }
}

/// Errors that can occur when loading or saving channel state
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to read channel state {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse channel state JSON in {path}: {source}")]
    JsonParseFailed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize channel state: {0}")]
    JsonSerializeFailed(#[from] serde_json::Error),

    #[error("Failed to replace channel state: {0}")]
    Write(#[from] WriteError),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::JsonParseFailed { .. } => ErrorKind::ParseFailure,
            StoreError::ReadFailed { .. }
            | StoreError::JsonSerializeFailed(_)
            | StoreError::Write(_) => ErrorKind::Storage,
        }
    }
}
