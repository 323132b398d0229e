//! A range-driven in-memory packet cache for exposing a remote HTTP media
//! stream as a synchronously, randomly seekable byte source.
//!
//! A background worker thread pulls the stream in over HTTP `Range`
//! requests, filling fixed-size packets as they arrive. Readers call
//! [`MediaResource::read`] with an arbitrary offset and length; the call
//! blocks only on the packets it actually needs, registering the worker's
//! attention on whatever is missing rather than waiting for the whole
//! stream to download.

pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod http_range;
pub mod packet;
pub mod promise;
pub mod resolver;
pub mod resource;
pub mod session;
pub mod share;

pub use config::MediaResourceConfig;
pub use error::{OpenError, OpenResult, ReadError, ReadResult, ResolveError};
pub use resolver::{DirectResolver, ResolveMedia, ResolvedMedia};
pub use resource::MediaResource;
pub use share::HttpShare;
