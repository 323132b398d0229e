//! The HTTP share handle.
//!
//! `original_source/quvif`'s `CURLSH*` needs an explicit array of mutexes,
//! one per `curl_lock_data` kind, because libcurl's share object is not
//! itself thread-safe without them. `hyper::Client<HttpsConnector<..>>` has
//! no such requirement: it is `Clone + Send + Sync` and already pools
//! connections and TLS sessions across clones of the same client
//! internally. `HttpShare` therefore only needs to own the one client and
//! hand out cheap clones — the *ownership shape* (constructed once by the
//! owning `MediaResource`, shared by every backend, released at teardown)
//! is preserved; the manual locking plumbing is not, because it would have
//! no purpose here.

use std::sync::Arc;

use hyper::client::HttpConnector;
use hyper::Client;
use hyper_rustls::HttpsConnector;

use crate::error::OpenError;

pub type HyperClient = Client<HttpsConnector<HttpConnector>>;

#[derive(Clone)]
pub struct HttpShare {
    client: Arc<HyperClient>,
}

impl HttpShare {
    pub fn new() -> Result<Self, OpenError> {
        let https = hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()
            .https_or_http()
            .enable_http1()
            .enable_http2()
            .build();
        let client = Client::builder().build::<_, hyper::Body>(https);
        Ok(Self {
            client: Arc::new(client),
        })
    }

    pub fn client(&self) -> &HyperClient {
        &self.client
    }
}
