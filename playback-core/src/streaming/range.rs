//! HTTP byte-range parsing
//!
//! Supports the single-interval `bytes=<start>-[<end>]` form, and the bare
//! `bytes=<start>` form read to end of file. Suffix ranges (`bytes=-500`)
//! and multi-range lists are rejected as malformed.

use super::error::{RangeViolation, StreamError, StreamResult};

/// Unit prefix every accepted range header starts with.
pub const BYTES_UNIT_PREFIX: &str = "bytes=";

/// Inclusive byte interval into a file of known length.
///
/// Invariant: `start <= end < length`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
    /// Length of the whole file the interval was validated against.
    pub length: u64,
    /// Whether the client asked for this interval (206) or it defaulted to
    /// the whole file (200).
    pub partial: bool,
}

impl ByteRange {
    /// Whole-file interval, or `None` for an empty file.
    pub fn full(length: u64) -> Option<Self> {
        let end = length.checked_sub(1)?;
        Some(Self {
            start: 0,
            end,
            length,
            partial: false,
        })
    }

    /// Number of bytes in the interval.
    pub fn content_length(&self) -> u64 {
        self.end - self.start + 1
    }

    /// `Content-Range` value, e.g. `bytes 100-199/1000`.
    pub fn content_range(&self) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, self.length)
    }
}

/// Parse an optional `Range` header against a file of `length` bytes.
///
/// A missing header yields the whole file, marked as not partial.
///
/// # Examples
/// ```
/// use playback_core::streaming::parse_range;
///
/// let range = parse_range(Some("bytes=100-199"), 1000).unwrap();
/// assert_eq!((range.start, range.end, range.content_length()), (100, 199, 100));
/// assert!(range.partial);
/// ```
///
/// # Errors
///
/// - `StreamError::EmptyFile` - `length` is zero, no offset is satisfiable
/// - `StreamError::MalformedRange` - Missing unit, or non-digit offsets
/// - `StreamError::InvalidRange` - `start > end`, or `end >= length` (checked in that order)
pub fn parse_range(header: Option<&str>, length: u64) -> StreamResult<ByteRange> {
    let Some(full) = ByteRange::full(length) else {
        return Err(StreamError::EmptyFile);
    };

    let Some(header) = header else {
        return Ok(full);
    };

    let byte_range_set = header
        .strip_prefix(BYTES_UNIT_PREFIX)
        .ok_or(StreamError::MalformedRange {
            reason: "missing bytes= unit",
        })?;

    // No separator reads like an empty end: serve from start to EOF.
    let (start_str, end_str) = byte_range_set
        .split_once('-')
        .unwrap_or((byte_range_set, ""));

    let start = parse_offset(start_str).ok_or(StreamError::MalformedRange {
        reason: "start offset is not a non-negative integer",
    })?;

    let end = if end_str.is_empty() {
        full.end
    } else {
        parse_offset(end_str).ok_or(StreamError::MalformedRange {
            reason: "end offset is not a non-negative integer",
        })?
    };

    if start > end {
        return Err(StreamError::InvalidRange {
            violation: RangeViolation::StartAfterEnd,
            start,
            end,
            length,
        });
    }

    if end >= length {
        return Err(StreamError::InvalidRange {
            violation: RangeViolation::EndPastEof,
            start,
            end,
            length,
        });
    }

    Ok(ByteRange {
        start,
        end,
        length,
        partial: true,
    })
}

/// [`parse_range`] for a header value still in wire form.
///
/// Decoding happens here rather than at the HTTP edge so a bad header never
/// masks an identifier or lookup failure.
///
/// # Errors
///
/// - `StreamError::EmptyFile` - `length` is zero
/// - `StreamError::MalformedRange` - Header is not UTF-8, or as for [`parse_range`]
/// - `StreamError::InvalidRange` - As for [`parse_range`]
pub fn parse_range_bytes(header: Option<&[u8]>, length: u64) -> StreamResult<ByteRange> {
    if length == 0 {
        return Err(StreamError::EmptyFile);
    }

    let header = header
        .map(|raw| {
            std::str::from_utf8(raw).map_err(|_| StreamError::MalformedRange {
                reason: "header is not valid UTF-8",
            })
        })
        .transpose()?;

    parse_range(header, length)
}

/// Strict decimal parse: `u64::from_str` alone would accept a leading `+`.
fn parse_offset(digits: &str) -> Option<u64> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn violation(result: StreamResult<ByteRange>) -> Option<RangeViolation> {
        match result {
            Err(StreamError::InvalidRange { violation, .. }) => Some(violation),
            _ => None,
        }
    }

    #[test]
    fn test_missing_header_is_full_file() {
        let range = parse_range(None, 1000).unwrap();
        assert_eq!((range.start, range.end), (0, 999));
        assert_eq!(range.content_length(), 1000);
        assert!(!range.partial);
    }

    #[test]
    fn test_closed_range() {
        let range = parse_range(Some("bytes=100-199"), 1000).unwrap();
        assert_eq!((range.start, range.end), (100, 199));
        assert_eq!(range.content_length(), 100);
        assert_eq!(range.content_range(), "bytes 100-199/1000");
        assert!(range.partial);
    }

    #[test]
    fn test_open_ended_range_runs_to_eof() {
        let range = parse_range(Some("bytes=900-"), 1000).unwrap();
        assert_eq!((range.start, range.end), (900, 999));
        assert_eq!(range.content_length(), 100);
    }

    #[test]
    fn test_single_byte_range() {
        let range = parse_range(Some("bytes=999-999"), 1000).unwrap();
        assert_eq!(range.content_length(), 1);
    }

    #[test]
    fn test_start_after_end() {
        assert_eq!(
            violation(parse_range(Some("bytes=500-100"), 1000)),
            Some(RangeViolation::StartAfterEnd)
        );
    }

    #[test]
    fn test_end_past_eof() {
        assert_eq!(
            violation(parse_range(Some("bytes=0-1000"), 1000)),
            Some(RangeViolation::EndPastEof)
        );
        assert_eq!(
            violation(parse_range(Some("bytes=1000-"), 1000)),
            Some(RangeViolation::StartAfterEnd)
        );
    }

    #[test]
    fn test_start_after_end_is_checked_before_eof() {
        assert_eq!(
            violation(parse_range(Some("bytes=5000-2000"), 1000)),
            Some(RangeViolation::StartAfterEnd)
        );
    }

    #[test]
    fn test_malformed_headers() {
        for header in [
            "items=0-10",
            "bytes=",
            "bytes=abc-10",
            "bytes=10-xyz",
            "bytes=-500",
            "bytes=+5-10",
            "bytes= 5-10",
            "bytes=5-10-20",
            "bytes=0-10,20-30",
            "bytes=99999999999999999999999-",
        ] {
            assert!(
                matches!(
                    parse_range(Some(header), 1000),
                    Err(StreamError::MalformedRange { .. })
                ),
                "expected malformed for {header:?}"
            );
        }
    }

    #[test]
    fn test_start_without_separator_reads_to_eof() {
        let range = parse_range(Some("bytes=100"), 1000).unwrap();
        assert_eq!((range.start, range.end), (100, 999));
        assert!(range.partial);

        assert_eq!(
            violation(parse_range(Some("bytes=1000"), 1000)),
            Some(RangeViolation::StartAfterEnd)
        );
    }

    #[test]
    fn test_wire_header_decoding() {
        let range = parse_range_bytes(Some(b"bytes=10-19"), 100).unwrap();
        assert_eq!((range.start, range.end), (10, 19));
        assert!(!parse_range_bytes(None, 100).unwrap().partial);

        assert!(matches!(
            parse_range_bytes(Some(b"bytes=\xff-"), 100),
            Err(StreamError::MalformedRange { .. })
        ));
        assert!(matches!(
            parse_range_bytes(Some(b"bytes=\xff-"), 0),
            Err(StreamError::EmptyFile)
        ));
    }

    #[test]
    fn test_empty_file_is_never_satisfiable() {
        assert!(matches!(parse_range(None, 0), Err(StreamError::EmptyFile)));
        assert!(matches!(
            parse_range(Some("bytes=0-0"), 0),
            Err(StreamError::EmptyFile)
        ));
    }

    proptest! {
        #[test]
        fn prop_valid_intervals_parse_exactly(
            (length, start, end) in (1u64..1_000_000).prop_flat_map(|length| {
                (Just(length), 0..length).prop_flat_map(|(length, start)| {
                    (Just(length), Just(start), start..length)
                })
            })
        ) {
            let header = format!("bytes={start}-{end}");
            let range = parse_range(Some(&header), length).unwrap();
            prop_assert_eq!((range.start, range.end, range.length), (start, end, length));
            prop_assert_eq!(range.content_length(), end - start + 1);
        }

        #[test]
        fn prop_end_at_or_past_length_is_rejected(
            length in 1u64..10_000,
            overshoot in 0u64..10_000,
        ) {
            let header = format!("bytes=0-{}", length + overshoot);
            let rejected = matches!(
                parse_range(Some(&header), length),
                Err(StreamError::InvalidRange { .. })
            );
            prop_assert!(rejected);
        }
    }
}
