//! Partial-content retrieval.
//!
//! Retrieval runs in three steps: the `Range` header is parsed against the
//! object length, the parse result is turned into a [`TransferPlan`] that
//! fixes status and headers, and the [`TransferEngine`] streams exactly the
//! planned bytes in bounded chunks.

pub mod plan;
pub mod range;
pub mod transfer;

pub use plan::{MalformedRangePolicy, RangeRejected, TransferPlan, plan_transfer};
pub use range::{RangeParse, RangeSpec, parse_range_from_headers, parse_range_header};
pub use transfer::{DEFAULT_CHUNK_SIZE, TransferEngine};
