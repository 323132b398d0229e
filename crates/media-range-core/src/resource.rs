//! The public entry point: resolve a URL, size a session around it, and
//! hand back a handle with a synchronous random-access `read`.

use url::Url;

use crate::config::MediaResourceConfig;
use crate::error::{OpenError, OpenResult, ReadResult};
use crate::resolver::{DirectResolver, ResolveMedia};
use crate::session::MediaSession;
use crate::share::HttpShare;

/// A remote HTTP media resource exposed as a synchronously, randomly
/// seekable byte source, backed by a background range-fetching worker.
pub struct MediaResource {
    session: MediaSession,
    title: String,
    content_type: String,
}

impl MediaResource {
    /// Open `url` with the default resolver ([`DirectResolver`]).
    pub fn open(url: &str, config: MediaResourceConfig) -> OpenResult<Self> {
        Self::open_with_resolver(url, config, &DirectResolver)
    }

    /// Open `url`, resolving it with a caller-supplied [`ResolveMedia`]
    /// implementation instead of the default direct-URL resolver.
    pub fn open_with_resolver(
        url: &str,
        config: MediaResourceConfig,
        resolver: &dyn ResolveMedia,
    ) -> OpenResult<Self> {
        let parsed = Url::parse(url).map_err(|_| OpenError::BadScheme)?;
        crate::resolver::check_scheme(&parsed)?;

        let share = HttpShare::new()?;

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| OpenError::HttpClientUnavailable(e.to_string()))?;
        let resolved = rt.block_on(resolver.resolve(&share, &parsed))?;

        if resolved.content_length == 0 {
            return Err(OpenError::MissingField("content_length"));
        }

        let title = resolved.title.clone();
        let content_type = resolved.content_type.clone();
        let session = MediaSession::new(share, config, resolved);

        Ok(Self {
            session,
            title,
            content_type,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn content_length(&self) -> u64 {
        self.session.content_length()
    }

    /// Fill `dest` from `offset`, blocking until every requested byte has
    /// either arrived or definitively failed to.
    pub fn read(&self, offset: u64, dest: &mut [u8]) -> ReadResult<()> {
        self.session.read(offset, dest)
    }
}
