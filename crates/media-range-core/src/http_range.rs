//! Small helpers for building `Range` request headers and parsing
//! `Content-Range` response headers.
//!
//! Grounded in the `parse_content_range_total` helper duplicated across both
//! `other_examples/6cc6ec10_dariusbakunas-audio-bridge__.../http_stream.rs`
//! and `other_examples/77a2729e_opoojkk-Podium__.../range_source.rs` — two
//! independent implementations converging on the same minimal parse, which
//! is a strong signal this is the right amount of logic and no more.

/// Build the value of a `Range: bytes=lo-hi` header for an inclusive byte range.
pub fn bytes_range_header(byte_lo: u64, byte_hi: u64) -> String {
    format!("bytes={byte_lo}-{byte_hi}")
}

/// Extract the total length from a `Content-Range: bytes start-end/total` header.
/// Returns `None` for the unsatisfiable-total form (`bytes */total`'s inverse,
/// `bytes start-end/*`) or anything else that doesn't parse.
pub fn parse_content_range_total(header: &str) -> Option<u64> {
    let (_, total) = header.split_once('/')?;
    total.parse::<u64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_range_header_formats_inclusive_range() {
        assert_eq!(bytes_range_header(0, 65_535), "bytes=0-65535");
    }

    #[test]
    fn parse_content_range_total_reads_total() {
        assert_eq!(parse_content_range_total("bytes 0-99/12345"), Some(12345));
    }

    #[test]
    fn parse_content_range_total_rejects_star_total() {
        assert_eq!(parse_content_range_total("bytes 0-99/*"), None);
    }

    #[test]
    fn parse_content_range_total_requires_slash() {
        assert_eq!(parse_content_range_total("bytes 0-99"), None);
    }
}
