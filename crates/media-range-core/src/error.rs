//! Error types for every fallible operation the crate exposes.
//!
//! Variant vocabulary (and the field-carrying style of `RangeBoundary`) is
//! grounded in `DiskError::OutOfBounds { offset, len, capacity }` and
//! `StreamingDiskError`'s `Protocol`/`Http`/`HttpStatus` variants from
//! `aero-storage`'s test suite.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("url scheme must be http:// or https://")]
    BadScheme,
    #[error("http request failed during resolution: {0}")]
    Http(String),
    #[error("server did not report a usable content length")]
    MissingContentLength,
    #[error("resolver probe received unexpected status {0}")]
    Status(u16),
}

#[derive(Debug, Error)]
pub enum OpenError {
    #[error("url scheme must be http:// or https://")]
    BadScheme,
    #[error("failed to resolve media: {0}")]
    ResolveFailed(#[from] ResolveError),
    #[error("resolver did not provide required field `{0}`")]
    MissingField(&'static str),
    #[error("failed to construct http client: {0}")]
    HttpClientUnavailable(String),
}

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("read range [{offset}, {offset}+{len}) out of bounds for content length {content_length}")]
    RangeBoundary {
        offset: u64,
        len: usize,
        content_length: u64,
    },
    #[error("transfer failed after exhausting retry budget: {0}")]
    Transfer(String),
    #[error("session was torn down while waiting for data")]
    TornDown,
}

pub type OpenResult<T> = Result<T, OpenError>;
pub type ReadResult<T> = Result<T, ReadError>;
