//! Normalized market data plumbing: frame routing, normalizers, and the
//! per-category output queues consumed by the downstream book builder.

pub mod normalizers;
pub mod router;

use tokio::sync::mpsc;

use crate::exchanges::types::NormalizedMessage;

pub use normalizers::{normalize_snapshot, receipt_time, CoinstoreNormalizer};
pub use router::{classify, FrameClass, MarketDataRouter};

/// The consumer half of the pipeline: one unbounded, ordered queue per
/// message category. Within a queue, records for a given instrument are
/// in wire arrival order. No ordering holds across the two queues; use
/// the update marker for cross-category reconciliation.
pub struct MarketDataQueues {
    pub trades: mpsc::UnboundedReceiver<NormalizedMessage>,
    pub diffs: mpsc::UnboundedReceiver<NormalizedMessage>,
}
