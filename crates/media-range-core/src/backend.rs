//! The fetch worker: picks a contiguous empty range, streams it in over one
//! HTTP `Range` request, and re-plans around newly registered promises.
//!
//! Loop shape, range selection, and the abort-when-a-newer-promise-jumps-too-
//! far discipline are grounded in `original_source/quvif/Quvi.cpp`'s
//! `FetchThread`/`ToCache`/`CurlCallback` trio: pick a range biased toward
//! the oldest pending promise, stream one `CURLOPT_RANGE` request, commit
//! full packets as they fill, and abort the transfer (not the whole worker)
//! the moment the front promise's index falls outside the near window of
//! the current write position. Retry-with-backoff around a single transfer
//! is new: it has no counterpart in the single-shot curl loop and is
//! grounded instead in `aero-storage`'s `ChunkedStreamingDiskConfig::max_retries`.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use hyper::body::HttpBody as _;
use hyper::header::{RANGE, USER_AGENT};
use hyper::{Method, Request, StatusCode};
use tracing::{debug, trace, warn};

use crate::http_range::bytes_range_header;
use crate::packet::Packet;
use crate::session::Inner;

/// Picks the next range to fetch under the session mutex. Bias toward the
/// oldest pending promise so a seeking reader is served before the worker
/// finishes whatever it was already doing; fall back to the lowest empty
/// slot when nobody is waiting.
pub(crate) fn pick_range(state: &mut crate::session::State) -> Option<(usize, usize)> {
    let left = match state.promises.front_index() {
        Some(front) => front,
        None => state.cache.first_empty()?,
    };
    let right = state.cache.end_of_empty_run(left);
    Some((left, right))
}

enum FeedOutcome {
    Continue,
    Abort,
}

enum StreamOutcome {
    Completed,
    AbortedForReplan,
    AbortedForTeardown,
}

/// How often `fetch_once` re-checks `inner.destroying` while it has no other
/// way to notice teardown: waiting on response headers, waiting on the next
/// body chunk. Small enough to keep `Drop` prompt, large enough not to spin.
const DESTROY_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Resolves once `inner.destroying` is set. Raced via `tokio::select!`
/// against whichever await point in `fetch_once` would otherwise block
/// uninterrupted on the network.
async fn wait_for_destroy(inner: &Inner) {
    loop {
        if inner.destroying.load(Ordering::Acquire) {
            return;
        }
        tokio::time::sleep(DESTROY_POLL_INTERVAL).await;
    }
}

/// Accumulates streamed response bytes into whole packets and commits each
/// one as it fills, deciding after every commit whether the transfer is
/// still worth continuing.
struct ChunkAssembler {
    scratch: Packet,
    storing: usize,
    current: usize,
    undone: usize,
    packet_size: usize,
}

impl ChunkAssembler {
    fn new(packet_size: usize, left: usize, right: usize) -> Self {
        Self {
            scratch: Packet::new(packet_size),
            storing: 0,
            current: left,
            undone: right - left,
            packet_size,
        }
    }

    fn feed(&mut self, inner: &Inner, mut chunk: &[u8]) -> FeedOutcome {
        while !chunk.is_empty() {
            if self.undone == 0 || inner.destroying.load(Ordering::Acquire) {
                return FeedOutcome::Abort;
            }

            let n = (self.packet_size - self.storing).min(chunk.len());
            self.scratch.as_mut_slice()[self.storing..self.storing + n]
                .copy_from_slice(&chunk[..n]);
            self.storing += n;
            chunk = &chunk[n..];

            if self.storing == self.packet_size {
                if let FeedOutcome::Abort = self.commit_and_schedule(inner) {
                    return FeedOutcome::Abort;
                }
            }
        }
        FeedOutcome::Continue
    }

    fn commit_and_schedule(&mut self, inner: &Inner) -> FeedOutcome {
        let packet = std::mem::replace(&mut self.scratch, Packet::new(self.packet_size));
        let mut state = inner.state.lock().unwrap();
        state.cache.commit(self.current, packet);
        state.promises.resolve_all(self.current);
        self.storing = 0;
        self.current += 1;
        self.undone -= 1;

        let should_abort = self.undone > 0
            && state.promises.front_index().is_some_and(|next| {
                next < self.current || next > self.current + inner.config.near_window
            });
        drop(state);

        if should_abort {
            FeedOutcome::Abort
        } else {
            FeedOutcome::Continue
        }
    }

    /// Commits whatever is left in `scratch` as the final, possibly short,
    /// eof-stub packet once the response body has ended cleanly with
    /// exactly one slot left to fill.
    fn commit_tail_if_pending(&mut self, inner: &Inner) {
        if self.undone == 1 && self.storing > 0 {
            let packet = std::mem::replace(&mut self.scratch, Packet::new(self.packet_size));
            let mut state = inner.state.lock().unwrap();
            state.cache.commit(self.current, packet);
            state.promises.resolve_all(self.current);
            self.current += 1;
            self.undone -= 1;
        }
    }
}

async fn fetch_once(
    inner: &Inner,
    byte_lo: u64,
    byte_hi: u64,
    assembler: &mut ChunkAssembler,
) -> Result<StreamOutcome, String> {
    let req = Request::builder()
        .method(Method::GET)
        .uri(inner.resolved.stream_url.as_str())
        .header(RANGE, bytes_range_header(byte_lo, byte_hi))
        .header(USER_AGENT, inner.config.user_agent.clone())
        .body(hyper::Body::empty())
        .map_err(|e| e.to_string())?;

    let resp = tokio::select! {
        res = tokio::time::timeout(inner.config.request_timeout, inner.share.client().request(req)) => {
            res.map_err(|_| "request timed out".to_string())?
                .map_err(|e| e.to_string())?
        }
        _ = wait_for_destroy(inner) => return Ok(StreamOutcome::AbortedForTeardown),
    };

    let status = resp.status();
    if status != StatusCode::PARTIAL_CONTENT && status != StatusCode::OK {
        return Err(format!("unexpected status {status} fetching bytes {byte_lo}-{byte_hi}"));
    }

    let mut body = resp.into_body();
    loop {
        let chunk = tokio::select! {
            chunk = body.data() => match chunk {
                Some(chunk) => chunk,
                None => break,
            },
            _ = wait_for_destroy(inner) => return Ok(StreamOutcome::AbortedForTeardown),
        };
        let chunk = chunk.map_err(|e| e.to_string())?;
        match assembler.feed(inner, &chunk) {
            FeedOutcome::Abort => return Ok(StreamOutcome::AbortedForReplan),
            FeedOutcome::Continue => {
                if assembler.undone == 0 {
                    return Ok(StreamOutcome::Completed);
                }
            }
        }
    }

    assembler.commit_tail_if_pending(inner);
    if assembler.undone == 0 {
        Ok(StreamOutcome::Completed)
    } else {
        Err(format!(
            "connection closed with {} packet(s) still undelivered",
            assembler.undone
        ))
    }
}

fn backoff_for_attempt(config: &crate::config::MediaResourceConfig, attempt: u32) -> Duration {
    let scale = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
    config
        .retry_backoff_base
        .saturating_mul(scale)
        .min(config.retry_backoff_max)
}

/// The worker thread body. Owns a small current-thread runtime so it can
/// drive `hyper` requests without requiring the reader-facing API to be
/// async at all; exits (rather than blocking) once there is nothing left to
/// fetch, and is respawned by the next reader that registers a promise
/// against an inactive worker (see `MediaSession::read`).
pub(crate) fn worker_loop(inner: Arc<Inner>) {
    let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            warn!(error = %e, "failed to start worker runtime, backend is inert");
            let mut state = inner.state.lock().unwrap();
            state.worker_inactive = true;
            state
                .promises
                .fail_range(0, state.cache.size(), "failed to start worker runtime");
            return;
        }
    };

    loop {
        if inner.destroying.load(Ordering::Acquire) {
            break;
        }

        let range = {
            let mut state = inner.state.lock().unwrap();
            pick_range(&mut state)
        };

        let (left, right) = match range {
            Some(r) => r,
            None => {
                let mut state = inner.state.lock().unwrap();
                state.worker_inactive = true;
                trace!("cache fully planned, worker going idle");
                break;
            }
        };

        let mut assembler = ChunkAssembler::new(inner.config.packet_size, left, right);
        let mut attempt = 0u32;

        loop {
            if inner.destroying.load(Ordering::Acquire) {
                break;
            }

            let byte_lo = assembler.current as u64 * inner.config.packet_size as u64;
            let byte_hi = ((right as u64) * inner.config.packet_size as u64)
                .min(inner.resolved.content_length)
                .saturating_sub(1);

            debug!(left = assembler.current, right, byte_lo, byte_hi, attempt, "fetching range");
            match rt.block_on(fetch_once(&inner, byte_lo, byte_hi, &mut assembler)) {
                Ok(StreamOutcome::Completed)
                | Ok(StreamOutcome::AbortedForReplan)
                | Ok(StreamOutcome::AbortedForTeardown) => break,
                Err(e) => {
                    attempt += 1;
                    if attempt > inner.config.max_retries {
                        warn!(error = %e, left = assembler.current, right, "retry budget exhausted");
                        let mut state = inner.state.lock().unwrap();
                        state.promises.fail_range(assembler.current, right, &e);
                        break;
                    }
                    let backoff = backoff_for_attempt(&inner.config, attempt);
                    debug!(attempt, ?backoff, error = %e, "retrying range after transfer failure");
                    std::thread::sleep(backoff);
                }
            }
        }
    }
}
