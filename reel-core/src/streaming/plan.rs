//! Response planning for retrieval requests.
//!
//! A [`TransferPlan`] is computed before anything is written to the client
//! and fully determines the status line and headers. Nothing in here does
//! I/O.

use std::ops::Range;
use std::str::FromStr;

use axum::http::{HeaderMap, HeaderValue, StatusCode, header};

use super::range::{RangeParse, RangeSpec};
use crate::storage::DEFAULT_CONTENT_TYPE;

/// How a `Range` header that fails to parse is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MalformedRangePolicy {
    /// Ignore the header and serve the full object
    #[default]
    Lenient,
    /// Refuse the request with 400 Bad Request
    Reject,
}

impl FromStr for MalformedRangePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lenient" => Ok(MalformedRangePolicy::Lenient),
            "reject" => Ok(MalformedRangePolicy::Reject),
            _ => Err(format!("Invalid malformed range policy: {s}")),
        }
    }
}

/// Raised only under [`MalformedRangePolicy::Reject`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("malformed Range header")]
pub struct RangeRejected;

/// What a retrieval response will contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferPlan {
    /// 200 with the whole object
    FullContent {
        /// Object length
        length: u64,
    },
    /// 206 with one byte range
    PartialContent {
        /// Selected bytes
        range: RangeSpec,
        /// Object length
        total_length: u64,
    },
    /// 416 with no body
    Unsatisfiable {
        /// Object length
        total_length: u64,
    },
}

/// Decides the response shape from a parsed `Range` header.
///
/// # Errors
///
/// - `RangeRejected` - The header is malformed and `policy` is
///   [`MalformedRangePolicy::Reject`]
pub fn plan_transfer(
    parse: RangeParse,
    total_length: u64,
    policy: MalformedRangePolicy,
) -> Result<TransferPlan, RangeRejected> {
    Ok(match parse {
        RangeParse::NoRange => TransferPlan::FullContent {
            length: total_length,
        },
        RangeParse::Malformed => match policy {
            MalformedRangePolicy::Lenient => TransferPlan::FullContent {
                length: total_length,
            },
            MalformedRangePolicy::Reject => return Err(RangeRejected),
        },
        RangeParse::Parsed(range) => TransferPlan::PartialContent {
            range,
            total_length,
        },
        RangeParse::Unsatisfiable => TransferPlan::Unsatisfiable { total_length },
    })
}

impl TransferPlan {
    /// Status code of the response.
    pub fn status(&self) -> StatusCode {
        match self {
            TransferPlan::FullContent { .. } => StatusCode::OK,
            TransferPlan::PartialContent { .. } => StatusCode::PARTIAL_CONTENT,
            TransferPlan::Unsatisfiable { .. } => StatusCode::RANGE_NOT_SATISFIABLE,
        }
    }

    /// Number of body bytes the response promises.
    pub fn content_length(&self) -> u64 {
        match self {
            TransferPlan::FullContent { length } => *length,
            TransferPlan::PartialContent { range, .. } => range.len(),
            TransferPlan::Unsatisfiable { .. } => 0,
        }
    }

    /// Object offsets to stream, or `None` if the response has no body.
    pub fn byte_range(&self) -> Option<Range<u64>> {
        match self {
            TransferPlan::FullContent { length } => Some(0..*length),
            TransferPlan::PartialContent { range, .. } => Some(range.start()..range.end() + 1),
            TransferPlan::Unsatisfiable { .. } => None,
        }
    }

    /// Value of the `Content-Range` header, if one is sent.
    pub fn content_range(&self) -> Option<String> {
        match self {
            TransferPlan::FullContent { .. } => None,
            TransferPlan::PartialContent {
                range,
                total_length,
            } => Some(format!(
                "bytes {}-{}/{}",
                range.start(),
                range.end(),
                total_length
            )),
            TransferPlan::Unsatisfiable { total_length } => Some(format!("bytes */{total_length}")),
        }
    }

    /// Headers to send with the response.
    ///
    /// `content_type` falls back to the default recording type when it is
    /// not a valid header value. Unsatisfiable responses carry no
    /// `Content-Type` since they have no body.
    pub fn response_headers(&self, content_type: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();

        headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
        headers.insert(
            header::CONTENT_LENGTH,
            HeaderValue::from(self.content_length()),
        );

        if let Some(content_range) = self.content_range()
            && let Ok(value) = HeaderValue::from_str(&content_range)
        {
            headers.insert(header::CONTENT_RANGE, value);
        }

        if !matches!(self, TransferPlan::Unsatisfiable { .. }) {
            let value = HeaderValue::from_str(content_type)
                .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
            headers.insert(header::CONTENT_TYPE, value);
        }

        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header<'a>(headers: &'a HeaderMap, name: header::HeaderName) -> Option<&'a str> {
        headers.get(name).and_then(|v| v.to_str().ok())
    }

    #[test]
    fn test_no_range_and_malformed_serve_full_content() {
        for parse in [RangeParse::NoRange, RangeParse::Malformed] {
            let plan = plan_transfer(parse, 1000, MalformedRangePolicy::Lenient).unwrap();
            assert_eq!(plan, TransferPlan::FullContent { length: 1000 });
            assert_eq!(plan.status(), StatusCode::OK);
            assert_eq!(plan.byte_range(), Some(0..1000));
        }
    }

    #[test]
    fn test_reject_policy_refuses_malformed_only() {
        assert_eq!(
            plan_transfer(RangeParse::Malformed, 10, MalformedRangePolicy::Reject),
            Err(RangeRejected)
        );
        assert!(plan_transfer(RangeParse::NoRange, 10, MalformedRangePolicy::Reject).is_ok());
    }

    #[test]
    fn test_partial_content_headers() {
        let range = RangeSpec::new(500, 599, 1000).unwrap();
        let plan = plan_transfer(
            RangeParse::Parsed(range),
            1000,
            MalformedRangePolicy::Lenient,
        )
        .unwrap();

        assert_eq!(plan.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(plan.byte_range(), Some(500..600));

        let headers = plan.response_headers("video/webm");
        assert_eq!(
            header(&headers, header::CONTENT_RANGE),
            Some("bytes 500-599/1000")
        );
        assert_eq!(header(&headers, header::CONTENT_LENGTH), Some("100"));
        assert_eq!(header(&headers, header::ACCEPT_RANGES), Some("bytes"));
        assert_eq!(header(&headers, header::CONTENT_TYPE), Some("video/webm"));
    }

    #[test]
    fn test_full_content_headers() {
        let plan = TransferPlan::FullContent { length: 42 };
        let headers = plan.response_headers("video/mp4");
        assert_eq!(header(&headers, header::CONTENT_LENGTH), Some("42"));
        assert_eq!(header(&headers, header::CONTENT_TYPE), Some("video/mp4"));
        assert!(headers.get(header::CONTENT_RANGE).is_none());
    }

    #[test]
    fn test_unsatisfiable_headers() {
        let plan = plan_transfer(RangeParse::Unsatisfiable, 0, MalformedRangePolicy::Lenient)
            .unwrap();
        assert_eq!(plan.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(plan.byte_range(), None);

        let headers = plan.response_headers("video/webm");
        assert_eq!(header(&headers, header::CONTENT_RANGE), Some("bytes */0"));
        assert_eq!(header(&headers, header::CONTENT_LENGTH), Some("0"));
        assert!(headers.get(header::CONTENT_TYPE).is_none());
    }

    #[test]
    fn test_invalid_content_type_falls_back() {
        let plan = TransferPlan::FullContent { length: 1 };
        let headers = plan.response_headers("video/webm\r\nX-Injected: 1");
        assert_eq!(header(&headers, header::CONTENT_TYPE), Some(DEFAULT_CONTENT_TYPE));
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!(
            "Reject".parse::<MalformedRangePolicy>(),
            Ok(MalformedRangePolicy::Reject)
        );
        assert!("strict".parse::<MalformedRangePolicy>().is_err());
    }
}
