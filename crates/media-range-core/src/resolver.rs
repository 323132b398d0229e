//! The resolver gateway: a one-shot call that turns an input URL into a
//! stream URL plus the metadata the core needs to size its cache.
//!
//! URL resolution is treated as an external collaborator (a real
//! extraction library like `original_source/`'s `quvi`). No such library
//! exists in this corpus, so [`ResolveMedia`] is a trait with one shipped
//! implementation, [`DirectResolver`], that treats the input URL as already
//! being the stream URL and discovers its length the way
//! `other_examples/6cc6ec10_dariusbakunas-audio-bridge__.../http_stream.rs`'s
//! `ensure_len` and `other_examples/77a2729e_opoojkk-Podium__.../range_source.rs`'s
//! `initialize`/`try_get_size_with_range_request` do: `HEAD` first, then a
//! `Range: bytes=0-0` probe if `HEAD` doesn't yield a usable length.

use async_trait::async_trait;
use hyper::header::{CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, RANGE};
use hyper::{Method, Request, StatusCode};
use tracing::debug;
use url::Url;

use crate::error::ResolveError;
use crate::http_range::parse_content_range_total;
use crate::share::HttpShare;

/// What the resolver gateway produces: everything the core needs and
/// nothing it would have to reach back into the resolver for later.
#[derive(Debug, Clone)]
pub struct ResolvedMedia {
    pub stream_url: Url,
    pub title: String,
    pub content_type: String,
    pub content_length: u64,
}

#[async_trait]
pub trait ResolveMedia: Send + Sync {
    async fn resolve(&self, share: &HttpShare, url: &Url) -> Result<ResolvedMedia, ResolveError>;
}

/// Accepted URL schemes, checked before any network call.
pub fn check_scheme(url: &Url) -> Result<(), ResolveError> {
    match url.scheme() {
        "http" | "https" => Ok(()),
        _ => Err(ResolveError::BadScheme),
    }
}

/// Default resolver: the input URL is already the stream to fetch.
pub struct DirectResolver;

#[async_trait]
impl ResolveMedia for DirectResolver {
    async fn resolve(&self, share: &HttpShare, url: &Url) -> Result<ResolvedMedia, ResolveError> {
        check_scheme(url)?;

        let title = default_title(url);

        if let Some((content_length, content_type)) = head_probe(share, url).await? {
            return Ok(ResolvedMedia {
                stream_url: url.clone(),
                title,
                content_type,
                content_length,
            });
        }

        let (content_length, content_type) = range_probe(share, url).await?;
        Ok(ResolvedMedia {
            stream_url: url.clone(),
            title,
            content_type,
            content_length,
        })
    }
}

fn default_title(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segs| segs.next_back())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| url.as_str().to_string())
}

/// `HEAD` the stream URL. Returns `Ok(None)` (not an error) when the server
/// doesn't answer `HEAD` usefully, so the caller can fall back to a ranged
/// `GET` probe.
async fn head_probe(
    share: &HttpShare,
    url: &Url,
) -> Result<Option<(u64, String)>, ResolveError> {
    let req = Request::builder()
        .method(Method::HEAD)
        .uri(url.as_str())
        .body(hyper::Body::empty())
        .map_err(|e| ResolveError::Http(e.to_string()))?;

    let resp = match share.client().request(req).await {
        Ok(resp) => resp,
        Err(e) => {
            debug!(error = %e, "HEAD probe failed, falling back to range probe");
            return Ok(None);
        }
    };

    if resp.status() != StatusCode::OK {
        debug!(status = %resp.status(), "HEAD probe returned non-200, falling back");
        return Ok(None);
    }

    let content_length = resp
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok());
    let content_type = resp
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();

    match content_length {
        Some(len) if len > 0 => Ok(Some((len, content_type))),
        _ => Ok(None),
    }
}

async fn range_probe(share: &HttpShare, url: &Url) -> Result<(u64, String), ResolveError> {
    let req = Request::builder()
        .method(Method::GET)
        .uri(url.as_str())
        .header(RANGE, "bytes=0-0")
        .body(hyper::Body::empty())
        .map_err(|e| ResolveError::Http(e.to_string()))?;

    let resp = share
        .client()
        .request(req)
        .await
        .map_err(|e| ResolveError::Http(e.to_string()))?;

    let status = resp.status();
    if status != StatusCode::PARTIAL_CONTENT && status != StatusCode::OK {
        return Err(ResolveError::Status(status.as_u16()));
    }

    let content_type = resp
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();

    let total = resp
        .headers()
        .get(CONTENT_RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_content_range_total)
        .or_else(|| {
            resp.headers()
                .get(CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
        });

    match total {
        Some(len) if len > 0 => Ok((len, content_type)),
        _ => Err(ResolveError::MissingContentLength),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_title_uses_last_path_segment() {
        let url = Url::parse("https://example.com/videos/clip.mp4?x=1").unwrap();
        assert_eq!(default_title(&url), "clip.mp4");
    }

    #[test]
    fn default_title_falls_back_to_full_url_when_path_is_empty() {
        let url = Url::parse("https://example.com").unwrap();
        assert_eq!(default_title(&url), "https://example.com/");
    }

    #[test]
    fn check_scheme_accepts_http_and_https() {
        assert!(check_scheme(&Url::parse("http://x/y").unwrap()).is_ok());
        assert!(check_scheme(&Url::parse("https://x/y").unwrap()).is_ok());
    }

    #[test]
    fn check_scheme_rejects_other_schemes() {
        assert!(matches!(
            check_scheme(&Url::parse("ftp://x/y").unwrap()),
            Err(ResolveError::BadScheme)
        ));
        assert!(matches!(
            check_scheme(&Url::parse("file:///etc/passwd").unwrap()),
            Err(ResolveError::BadScheme)
        ));
    }
}
