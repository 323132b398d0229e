//! The reading side: a packet cache, a promise registry, and the worker
//! thread that keeps them in sync, all reachable from any thread without
//! requiring an async runtime on the caller.
//!
//! Grounded in `original_source/quvif/Quvi.cpp`'s `QuviMedia`: one mutex
//! guards both the cache and the promise list together (so a promise can
//! never be registered against a slot that fills underneath it), the worker
//! thread is spawned lazily by the first reader that needs data the cache
//! doesn't have yet, and it exits (rather than parking) once there is
//! nothing left to plan, to be respawned the same way later.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use tracing::trace;

use crate::backend::worker_loop;
use crate::cache::PacketCache;
use crate::config::MediaResourceConfig;
use crate::error::{ReadError, ReadResult};
use crate::promise::{PromiseRegistry, Signal, SignalResult};
use crate::resolver::ResolvedMedia;
use crate::share::HttpShare;

/// Everything guarded by the single session mutex.
pub(crate) struct State {
    pub(crate) cache: PacketCache,
    pub(crate) promises: PromiseRegistry,
    pub(crate) worker_inactive: bool,
}

/// Shared, reference-counted session state reachable from the worker thread
/// and every reader.
pub(crate) struct Inner {
    pub(crate) state: Mutex<State>,
    pub(crate) destroying: AtomicBool,
    pub(crate) resolved: ResolvedMedia,
    pub(crate) share: HttpShare,
    pub(crate) config: MediaResourceConfig,
}

/// Owns the cache, the promise registry, and the worker thread(s) that have
/// ever served this session. Not `Clone`: a `MediaResource` holds exactly
/// one and tears it down on drop.
pub struct MediaSession {
    inner: Arc<Inner>,
    worker_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl MediaSession {
    pub fn new(share: HttpShare, config: MediaResourceConfig, resolved: ResolvedMedia) -> Self {
        let cache = PacketCache::new(resolved.content_length, config.packet_size);
        let inner = Arc::new(Inner {
            state: Mutex::new(State {
                cache,
                promises: PromiseRegistry::new(),
                worker_inactive: true,
            }),
            destroying: AtomicBool::new(false),
            resolved,
            share,
            config,
        });
        Self {
            inner,
            worker_handles: Mutex::new(Vec::new()),
        }
    }

    pub fn content_length(&self) -> u64 {
        self.inner.resolved.content_length
    }

    /// Fill `dest` from `offset`, blocking the calling thread on any slot
    /// the worker hasn't fetched yet. Restarts the worker if it had gone
    /// idle, per slot, the first time such a slot is touched.
    pub fn read(&self, offset: u64, dest: &mut [u8]) -> ReadResult<()> {
        let content_length = self.inner.resolved.content_length;
        let len = dest.len();
        if len == 0 {
            return Ok(());
        }
        let end = offset
            .checked_add(len as u64)
            .filter(|&end| end <= content_length);
        if end.is_none() {
            return Err(ReadError::RangeBoundary {
                offset,
                len,
                content_length,
            });
        }

        let packet_size = self.inner.config.packet_size as u64;
        let mut pos = offset;
        let mut written = 0usize;

        while written < len {
            let index = (pos / packet_size) as usize;
            let in_packet_offset = (pos % packet_size) as usize;
            let copy_len = (self.inner.config.packet_size - in_packet_offset).min(len - written);

            let wait = {
                let mut state = self.inner.state.lock().unwrap();
                if state.cache.is_filled(index) {
                    copy_from_packet(&state, index, in_packet_offset, &mut dest[written..written + copy_len]);
                    None
                } else {
                    let signal = state.promises.register(index);
                    let should_restart = state.worker_inactive;
                    if should_restart {
                        state.worker_inactive = false;
                    }
                    Some((signal, should_restart))
                }
            };

            match wait {
                None => {
                    written += copy_len;
                    pos += copy_len as u64;
                    continue;
                }
                Some((signal, should_restart)) => {
                    if should_restart {
                        self.respawn_worker();
                    }
                    block_on_signal(signal)?;

                    let state = self.inner.state.lock().unwrap();
                    copy_from_packet(&state, index, in_packet_offset, &mut dest[written..written + copy_len]);
                }
            }

            written += copy_len;
            pos += copy_len as u64;
        }

        Ok(())
    }

    fn respawn_worker(&self) {
        let inner = Arc::clone(&self.inner);
        let handle = std::thread::Builder::new()
            .name("media-range-worker".to_string())
            .spawn(move || worker_loop(inner))
            .expect("failed to spawn worker thread");
        self.worker_handles.lock().unwrap().push(handle);
    }
}

fn copy_from_packet(state: &State, index: usize, in_packet_offset: usize, dest: &mut [u8]) {
    let packet = state.cache.get(index);
    dest.copy_from_slice(&packet.as_slice()[in_packet_offset..in_packet_offset + dest.len()]);
}

fn block_on_signal(signal: Signal) -> ReadResult<()> {
    match signal.recv() {
        Ok(SignalResult::Filled) => Ok(()),
        Ok(SignalResult::TornDown) | Err(_) => Err(ReadError::TornDown),
        Ok(SignalResult::TransferFailed(reason)) => Err(ReadError::Transfer(reason)),
    }
}

impl Drop for MediaSession {
    fn drop(&mut self) {
        self.inner.destroying.store(true, Ordering::Release);
        {
            let mut state = self.inner.state.lock().unwrap();
            state.promises.drain_torn_down();
        }
        let handles = std::mem::take(&mut *self.worker_handles.lock().unwrap());
        for handle in handles {
            if handle.join().is_err() {
                trace!("worker thread panicked during teardown");
            }
        }
    }
}
