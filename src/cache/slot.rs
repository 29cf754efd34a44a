//! Per-key query slot with single-flight fetching.
//!
//! A slot holds the last successfully fetched value for one [`CacheKey`] and
//! at most one outstanding fetch. State machine:
//!
//! ```text
//! NotReady -> Fetching -> Fresh | Errored
//! Fresh    -> Stale          (invalidate)
//! Stale    -> Fetching -> Fresh | Errored
//! any      -> NotReady       (reset on identity change)
//! ```
//!
//! Every invalidation or reset bumps the slot `version`. A fetch only commits
//! its result when the version it started under is still current, so data
//! fetched before a write (or under a previous identity) is never promoted to
//! `Fresh` afterwards.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use futures::future::{BoxFuture, FutureExt, Shared};
use metrics::{counter, histogram};
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::application::error::SyncError;

use super::keys::CacheKey;
use super::lock::mutex_lock;

const SOURCE: &str = "cache::slot";

pub const METRIC_QUERY_HIT: &str = "vetrina_query_hit_total";
pub const METRIC_QUERY_FETCH: &str = "vetrina_query_fetch_total";
pub const METRIC_QUERY_JOIN: &str = "vetrina_query_join_total";
pub const METRIC_QUERY_ERROR: &str = "vetrina_query_error_total";
pub const METRIC_QUERY_FETCH_MS: &str = "vetrina_query_fetch_ms";

type FlightResult<T> = Result<Arc<T>, SyncError>;
type SharedFlight<T> = Shared<BoxFuture<'static, FlightResult<T>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    /// The gateway has not produced a handle for the current identity yet.
    NotReady,
    Fetching,
    Fresh,
    /// Last-known value may no longer reflect the backend.
    Stale,
    Errored,
}

/// Point-in-time view of a slot for rendering without suspending.
#[derive(Debug, Clone)]
pub struct QuerySnapshot<T> {
    pub status: QueryStatus,
    /// Last successfully fetched value, kept while stale or errored.
    pub data: Option<Arc<T>>,
    pub error: Option<SyncError>,
    pub updated_at: Option<OffsetDateTime>,
}

struct Flight<T> {
    id: u64,
    version: u64,
    result: SharedFlight<T>,
}

struct SlotState<T> {
    status: QueryStatus,
    data: Option<Arc<T>>,
    error: Option<SyncError>,
    updated_at: Option<OffsetDateTime>,
    epoch: u64,
    version: u64,
    next_flight: u64,
    flight: Option<Flight<T>>,
}

enum Step<T> {
    /// Attach to a fetch started under the current version.
    Join(SharedFlight<T>),
    /// Let a superseded fetch drain, then look again.
    Wait(SharedFlight<T>),
}

pub struct QuerySlot<T> {
    key: CacheKey,
    state: Arc<Mutex<SlotState<T>>>,
}

impl<T> Clone for QuerySlot<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key,
            state: Arc::clone(&self.state),
        }
    }
}

impl<T> QuerySlot<T>
where
    T: Send + Sync + 'static,
{
    pub fn new(key: CacheKey) -> Self {
        Self {
            key,
            state: Arc::new(Mutex::new(SlotState {
                status: QueryStatus::NotReady,
                data: None,
                error: None,
                updated_at: None,
                epoch: 0,
                version: 0,
                next_flight: 0,
                flight: None,
            })),
        }
    }

    pub fn key(&self) -> CacheKey {
        self.key
    }

    pub fn status(&self) -> QueryStatus {
        mutex_lock(&self.state, SOURCE, "status").status
    }

    pub fn snapshot(&self) -> QuerySnapshot<T> {
        let state = mutex_lock(&self.state, SOURCE, "snapshot");
        QuerySnapshot {
            status: state.status,
            data: state.data.clone(),
            error: state.error.clone(),
            updated_at: state.updated_at,
        }
    }

    /// Last-known value regardless of freshness.
    pub fn peek(&self) -> Option<Arc<T>> {
        mutex_lock(&self.state, SOURCE, "peek").data.clone()
    }

    /// Whether a fetch is currently outstanding.
    pub fn is_fetching(&self) -> bool {
        mutex_lock(&self.state, SOURCE, "is_fetching").flight.is_some()
    }

    /// Mark the slot stale. The last-known value stays readable through
    /// [`QuerySlot::snapshot`] but the next [`QuerySlot::read`] re-fetches.
    ///
    /// Returns true when the slot transitioned to `Stale`.
    pub fn invalidate(&self) -> bool {
        let mut state = mutex_lock(&self.state, SOURCE, "invalidate");
        state.version += 1;
        match state.status {
            QueryStatus::Fresh | QueryStatus::Fetching => {
                state.status = QueryStatus::Stale;
                true
            }
            QueryStatus::NotReady | QueryStatus::Stale | QueryStatus::Errored => false,
        }
    }

    /// Drop everything fetched so far and bind the slot to a new gateway epoch.
    ///
    /// An outstanding fetch is detached rather than awaited: it belongs to the
    /// previous identity, and its result fails the version check on completion.
    pub fn reset(&self, epoch: u64) {
        let mut state = mutex_lock(&self.state, SOURCE, "reset");
        state.epoch = epoch;
        state.version += 1;
        state.status = QueryStatus::NotReady;
        state.data = None;
        state.error = None;
        state.updated_at = None;
        state.flight = None;
    }

    /// Serve the fresh value or fetch it, sharing one fetch between concurrent readers.
    ///
    /// `epoch` is the gateway epoch the caller's handle belongs to; a handle
    /// from a torn-down identity gets [`SyncError::NotReady`]. The fetch runs on
    /// its own task, so it completes and populates the slot even if every
    /// reader stops waiting.
    pub async fn read<F, Fut>(&self, epoch: u64, fetch: F) -> Result<Arc<T>, SyncError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, SyncError>> + Send + 'static,
    {
        loop {
            let step = {
                let mut state = mutex_lock(&self.state, SOURCE, "read");
                if state.epoch != epoch {
                    return Err(SyncError::NotReady);
                }

                if state.status == QueryStatus::Fresh {
                    if let Some(data) = &state.data {
                        counter!(METRIC_QUERY_HIT, "key" => self.key.as_str()).increment(1);
                        return Ok(Arc::clone(data));
                    }
                }

                let current = state
                    .flight
                    .as_ref()
                    .map(|flight| (flight.version == state.version, flight.result.clone()));
                match current {
                    Some((true, result)) => {
                        counter!(METRIC_QUERY_JOIN, "key" => self.key.as_str()).increment(1);
                        Step::Join(result)
                    }
                    Some((false, result)) => Step::Wait(result),
                    None => Step::Join(self.launch(&mut state, fetch())),
                }
            };

            match step {
                Step::Join(result) => return result.await,
                Step::Wait(result) => {
                    let _ = result.await;
                }
            }
        }
    }

    fn launch<Fut>(&self, state: &mut SlotState<T>, fetch: Fut) -> SharedFlight<T>
    where
        Fut: Future<Output = Result<T, SyncError>> + Send + 'static,
    {
        let key = self.key;
        let id = state.next_flight;
        let version = state.version;
        state.next_flight += 1;
        state.status = QueryStatus::Fetching;

        counter!(METRIC_QUERY_FETCH, "key" => key.as_str()).increment(1);
        debug!(key = key.as_str(), flight = id, version, "Query fetch starting");

        let slot_state = Arc::clone(&self.state);
        let task = tokio::spawn(async move {
            let started_at = Instant::now();
            let outcome = match AssertUnwindSafe(fetch).catch_unwind().await {
                Ok(result) => result.map(Arc::new),
                Err(_) => Err(SyncError::remote(key.as_str(), "fetch panicked")),
            };
            histogram!(METRIC_QUERY_FETCH_MS, "key" => key.as_str())
                .record(started_at.elapsed().as_secs_f64() * 1000.0);

            let mut state = mutex_lock(&slot_state, SOURCE, "complete");
            Self::complete(&mut state, key, id, version, &outcome);
            outcome
        });

        let result = task
            .map(move |joined| {
                joined.unwrap_or_else(|err| {
                    Err(SyncError::remote(key.as_str(), format!("fetch task failed: {err}")))
                })
            })
            .boxed()
            .shared();

        state.flight = Some(Flight {
            id,
            version,
            result: result.clone(),
        });
        result
    }

    fn complete(
        state: &mut SlotState<T>,
        key: CacheKey,
        id: u64,
        version: u64,
        outcome: &FlightResult<T>,
    ) {
        if state.flight.as_ref().is_some_and(|flight| flight.id == id) {
            state.flight = None;
        }

        if state.version != version {
            debug!(
                key = key.as_str(),
                flight = id,
                started_version = version,
                current_version = state.version,
                "Discarding fetch result superseded by invalidation"
            );
            return;
        }

        match outcome {
            Ok(value) => {
                state.status = QueryStatus::Fresh;
                state.data = Some(Arc::clone(value));
                state.error = None;
                state.updated_at = Some(OffsetDateTime::now_utc());
                debug!(key = key.as_str(), flight = id, "Query fetch committed");
            }
            Err(err) => {
                state.status = QueryStatus::Errored;
                state.error = Some(err.clone());
                counter!(METRIC_QUERY_ERROR, "key" => key.as_str()).increment(1);
                warn!(key = key.as_str(), flight = id, error = %err, "Query fetch failed");
            }
        }
    }
}
