//! A `std::io::Read + std::io::Seek` facade over a [`media_range_core::MediaResource`],
//! for hosts (decoders, players) that want a plain seekable byte source
//! rather than the offset/slice call directly.
//!
//! Grounded in three independent implementations of exactly this shape:
//! `other_examples/6cc6ec10_dariusbakunas-audio-bridge__.../http_stream.rs`'s
//! `HttpRangeSource`, `other_examples/77a2729e_opoojkk-Podium__.../range_source.rs`'s
//! `HttpRangeSource`, and
//! `other_examples/2ec7de98_MoosicBox-MoosicBox__.../remote_bytestream.rs`'s
//! `RemoteByteStream` — all three wrap a range-fetched remote stream behind
//! `Read + Seek`, and two of the three also implement
//! `symphonia::core::io::MediaSource`, which this crate mirrors behind the
//! `symphonia-source` feature so `media-range-core` itself stays free of an
//! optional decoder dependency.

use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Arc;

use media_range_core::{MediaResource, ReadError};

/// Wraps a [`MediaResource`] with a cursor, turning its offset-addressed
/// `read` into the standard `Read + Seek` contract.
pub struct SeekableSource {
    resource: Arc<MediaResource>,
    pos: u64,
}

impl SeekableSource {
    pub fn new(resource: Arc<MediaResource>) -> Self {
        Self { resource, pos: 0 }
    }

    pub fn resource(&self) -> &MediaResource {
        &self.resource
    }

    pub fn position(&self) -> u64 {
        self.pos
    }
}

impl Read for SeekableSource {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }
        let content_length = self.resource.content_length();
        if self.pos >= content_length {
            return Ok(0);
        }

        let remaining = (content_length - self.pos) as usize;
        let to_read = remaining.min(out.len());
        self.resource
            .read(self.pos, &mut out[..to_read])
            .map_err(read_error_to_io)?;
        self.pos += to_read as u64;
        Ok(to_read)
    }
}

impl Seek for SeekableSource {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(x) => x,
            SeekFrom::Current(d) => add_signed(self.pos, d),
            SeekFrom::End(d) => add_signed(self.resource.content_length(), d),
        };
        self.pos = target;
        Ok(self.pos)
    }
}

fn read_error_to_io(err: ReadError) -> io::Error {
    match err {
        ReadError::RangeBoundary { .. } => io::Error::new(io::ErrorKind::UnexpectedEof, err),
        ReadError::Transfer(_) => io::Error::new(io::ErrorKind::Other, err),
        ReadError::TornDown => io::Error::new(io::ErrorKind::Interrupted, err),
    }
}

fn add_signed(base: u64, delta: i64) -> u64 {
    if delta >= 0 {
        base.saturating_add(delta as u64)
    } else {
        let neg = delta.checked_abs().unwrap_or(i64::MAX) as u64;
        base.saturating_sub(neg)
    }
}

#[cfg(feature = "symphonia-source")]
impl symphonia::core::io::MediaSource for SeekableSource {
    fn is_seekable(&self) -> bool {
        true
    }

    fn byte_len(&self) -> Option<u64> {
        Some(self.resource.content_length())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_signed_handles_positive_and_negative() {
        assert_eq!(add_signed(10, 5), 15);
        assert_eq!(add_signed(10, -3), 7);
    }

    #[test]
    fn add_signed_saturates_on_underflow() {
        assert_eq!(add_signed(5, -10), 0);
    }

    #[test]
    fn add_signed_saturates_on_overflow() {
        assert_eq!(add_signed(u64::MAX, 10), u64::MAX);
    }
}
