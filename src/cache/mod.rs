//! Vetrina query cache
//!
//! Client-side cache of everything the site reads from the backend:
//!
//! - **Slots**: one [`QuerySlot`] per [`CacheKey`], each with at most one
//!   outstanding fetch shared by every concurrent reader
//! - **Planner**: the fixed mapping from a successful write to the keys it
//!   marks stale
//!
//! Reads go through the slot, writes go through the mutation dispatcher, and
//! an identity change resets every slot at once.

mod keys;
mod lock;
mod planner;
mod slot;
mod store;

pub use keys::{CacheKey, ReadPolicy};
pub use planner::{InvalidationPlan, MutationKind};
pub use slot::{QuerySlot, QuerySnapshot, QueryStatus};
pub use store::QueryCache;

pub(crate) use lock::{mutex_lock, rw_read, rw_write};

/// Metric names emitted by the cache.
pub mod metric_names {
    pub use super::slot::{
        METRIC_QUERY_ERROR, METRIC_QUERY_FETCH, METRIC_QUERY_FETCH_MS, METRIC_QUERY_HIT,
        METRIC_QUERY_JOIN,
    };
    pub use super::store::METRIC_CACHE_INVALIDATE;
}
