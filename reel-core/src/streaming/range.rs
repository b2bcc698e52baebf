//! HTTP `Range` header parsing for single byte ranges.
//!
//! Only the single-range form of RFC 7233 is understood:
//! `bytes=<start>-<end>`, `bytes=<start>-` and the suffix form `bytes=-<n>`.
//! Parsing separates headers that do not parse at all ([`RangeParse::Malformed`])
//! from well-formed ranges that fall outside the object
//! ([`RangeParse::Unsatisfiable`]); the two lead to different responses.

use axum::http::{HeaderMap, header};

/// Inclusive byte interval `[start, end]` inside an object.
///
/// Always satisfies `start <= end < total_length` for the length it was
/// built against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeSpec {
    start: u64,
    end: u64,
}

impl RangeSpec {
    /// Builds a range, or `None` unless `start <= end < total_length`.
    pub fn new(start: u64, end: u64, total_length: u64) -> Option<Self> {
        (start <= end && end < total_length).then_some(Self { start, end })
    }

    /// First byte offset.
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Last byte offset, inclusive.
    pub fn end(&self) -> u64 {
        self.end
    }

    /// Number of bytes covered.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Always false; a range covers at least one byte.
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Outcome of interpreting a `Range` header against an object length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeParse {
    /// No `Range` header was sent
    NoRange,
    /// A satisfiable single range
    Parsed(RangeSpec),
    /// The header does not follow the supported syntax
    Malformed,
    /// Well-formed, but the range does not fit inside the object
    Unsatisfiable,
}

/// A byte position as written in the header.
enum Position {
    Offset(u64),
    /// All digits, but larger than any representable length
    Overflow,
}

/// Interprets an optional `Range` header value against `total_length`.
///
/// # Examples
/// ```
/// use reel_core::streaming::{RangeParse, parse_range_header};
///
/// let RangeParse::Parsed(range) = parse_range_header(Some("bytes=500-599"), 1000) else {
///     panic!("expected a satisfiable range");
/// };
/// assert_eq!((range.start(), range.end(), range.len()), (500, 599, 100));
///
/// assert_eq!(parse_range_header(Some("bytes=1000-1010"), 1000), RangeParse::Unsatisfiable);
/// assert_eq!(parse_range_header(Some("pages=1-2"), 1000), RangeParse::Malformed);
/// assert_eq!(parse_range_header(None, 1000), RangeParse::NoRange);
/// ```
pub fn parse_range_header(header: Option<&str>, total_length: u64) -> RangeParse {
    let Some(raw) = header else {
        return RangeParse::NoRange;
    };

    // An empty object has no byte that any range could select.
    if total_length == 0 {
        return RangeParse::Unsatisfiable;
    }

    let Some(spec) = strip_bytes_unit(raw) else {
        return RangeParse::Malformed;
    };
    if spec.contains(',') {
        return RangeParse::Malformed;
    }
    let Some((first, last)) = spec.split_once('-') else {
        return RangeParse::Malformed;
    };
    let (first, last) = (first.trim(), last.trim());
    let last_index = total_length - 1;

    match (first.is_empty(), last.is_empty()) {
        (true, true) => RangeParse::Malformed,
        (true, false) => match parse_position(last) {
            None => RangeParse::Malformed,
            Some(Position::Offset(0)) => RangeParse::Unsatisfiable,
            Some(Position::Offset(suffix)) if suffix < total_length => {
                satisfiable(total_length - suffix, last_index, total_length)
            }
            // Suffix covering at least the whole object selects all of it.
            Some(_) => satisfiable(0, last_index, total_length),
        },
        (false, true) => match parse_position(first) {
            None => RangeParse::Malformed,
            Some(Position::Offset(start)) => satisfiable(start, last_index, total_length),
            Some(Position::Overflow) => RangeParse::Unsatisfiable,
        },
        (false, false) => match (parse_position(first), parse_position(last)) {
            (Some(Position::Offset(start)), Some(Position::Offset(end))) => {
                satisfiable(start, end, total_length)
            }
            (Some(_), Some(_)) => RangeParse::Unsatisfiable,
            _ => RangeParse::Malformed,
        },
    }
}

/// Reads the `Range` header from a request and interprets it.
///
/// A header value that is not visible ASCII counts as malformed.
pub fn parse_range_from_headers(headers: &HeaderMap, total_length: u64) -> RangeParse {
    match headers.get(header::RANGE) {
        None => RangeParse::NoRange,
        Some(value) => match value.to_str() {
            Ok(value) => parse_range_header(Some(value), total_length),
            Err(_) if total_length == 0 => RangeParse::Unsatisfiable,
            Err(_) => RangeParse::Malformed,
        },
    }
}

fn satisfiable(start: u64, end: u64, total_length: u64) -> RangeParse {
    RangeSpec::new(start, end, total_length)
        .map(RangeParse::Parsed)
        .unwrap_or(RangeParse::Unsatisfiable)
}

/// Returns the text after `bytes=`; the unit is matched case-insensitively.
fn strip_bytes_unit(raw: &str) -> Option<&str> {
    let (unit, spec) = raw.trim().split_once('=')?;
    unit.trim().eq_ignore_ascii_case("bytes").then_some(spec.trim())
}

fn parse_position(digits: &str) -> Option<Position> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(
        digits
            .parse::<u64>()
            .map(Position::Offset)
            .unwrap_or(Position::Overflow),
    )
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;
    use proptest::prelude::*;

    use super::*;

    fn parsed(header: &str, total: u64) -> (u64, u64) {
        match parse_range_header(Some(header), total) {
            RangeParse::Parsed(range) => (range.start(), range.end()),
            other => panic!("expected satisfiable range for {header:?}, got {other:?}"),
        }
    }

    #[test]
    fn test_closed_range() {
        assert_eq!(parsed("bytes=500-599", 1000), (500, 599));
        assert_eq!(parsed("bytes=0-0", 1000), (0, 0));
        assert_eq!(parsed("bytes=999-999", 1000), (999, 999));
    }

    #[test]
    fn test_open_ended_range() {
        assert_eq!(parsed("bytes=900-", 1000), (900, 999));
        assert_eq!(parsed("bytes=0-", 1), (0, 0));
    }

    #[test]
    fn test_suffix_range() {
        assert_eq!(parsed("bytes=-100", 1000), (900, 999));
        assert_eq!(parsed("bytes=-1000", 1000), (0, 999));
        assert_eq!(parsed("bytes=-5000", 1000), (0, 999));
        assert_eq!(
            parse_range_header(Some("bytes=-0"), 1000),
            RangeParse::Unsatisfiable
        );
    }

    #[test]
    fn test_lenient_syntax() {
        assert_eq!(parsed("Bytes=10-19", 100), (10, 19));
        assert_eq!(parsed("  bytes = 10 - 19 ", 100), (10, 19));
    }

    #[test]
    fn test_out_of_bounds_is_unsatisfiable() {
        for header in [
            "bytes=1000-1010",
            "bytes=1000-",
            "bytes=0-1000",
            "bytes=600-500",
            "bytes=99999999999999999999999-",
        ] {
            assert_eq!(
                parse_range_header(Some(header), 1000),
                RangeParse::Unsatisfiable,
                "{header}"
            );
        }
    }

    #[test]
    fn test_malformed_headers() {
        for header in [
            "",
            "invalid",
            "bytes",
            "bytes=",
            "bytes=-",
            "bytes=abc-def",
            "bytes=+5-10",
            "bytes=5.5-10",
            "bytes=0-10-20",
            "bytes=0-1,5-6",
            "items=0-10",
        ] {
            assert_eq!(
                parse_range_header(Some(header), 1000),
                RangeParse::Malformed,
                "{header:?}"
            );
        }
    }

    #[test]
    fn test_empty_object_rejects_any_range() {
        for header in ["bytes=0-", "bytes=0-0", "bytes=-1", "garbage"] {
            assert_eq!(
                parse_range_header(Some(header), 0),
                RangeParse::Unsatisfiable,
                "{header}"
            );
        }
        assert_eq!(parse_range_header(None, 0), RangeParse::NoRange);
    }

    #[test]
    fn test_from_headers() {
        let mut headers = HeaderMap::new();
        assert_eq!(parse_range_from_headers(&headers, 10), RangeParse::NoRange);

        headers.insert(header::RANGE, HeaderValue::from_static("bytes=2-3"));
        assert_eq!(
            parse_range_from_headers(&headers, 10),
            RangeParse::Parsed(RangeSpec::new(2, 3, 10).unwrap())
        );

        headers.insert(header::RANGE, HeaderValue::from_bytes(b"bytes=\xff-").unwrap());
        assert_eq!(parse_range_from_headers(&headers, 10), RangeParse::Malformed);
    }

    #[test]
    fn test_range_spec_bounds() {
        assert!(RangeSpec::new(0, 0, 1).is_some());
        assert!(RangeSpec::new(1, 0, 10).is_none());
        assert!(RangeSpec::new(0, 10, 10).is_none());
        assert_eq!(RangeSpec::new(3, 7, 10).unwrap().len(), 5);
    }

    proptest! {
        #[test]
        fn prop_valid_ranges_round_trip(total in 1u64..1_000_000, a in any::<u64>(), b in any::<u64>()) {
            let (lo, hi) = {
                let (x, y) = (a % total, b % total);
                (x.min(y), x.max(y))
            };
            let header = format!("bytes={lo}-{hi}");
            let result = parse_range_header(Some(&header), total);
            prop_assert_eq!(result, RangeParse::Parsed(RangeSpec::new(lo, hi, total).unwrap()));
        }

        #[test]
        fn prop_start_past_end_is_unsatisfiable(total in 0u64..1_000_000, extra in 0u64..1000) {
            let start = total + extra;
            let header = format!("bytes={start}-{}", start + 10);
            prop_assert_eq!(parse_range_header(Some(&header), total), RangeParse::Unsatisfiable);
        }
    }
}
