use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::application::mutations::{METRIC_MUTATION, METRIC_MUTATION_FAILED};
use crate::cache::metric_names;
use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
///
/// Events go to stderr so command output on stdout stays machine-readable.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            metric_names::METRIC_QUERY_HIT,
            Unit::Count,
            "Reads served from a fresh cache slot."
        );
        describe_counter!(
            metric_names::METRIC_QUERY_FETCH,
            Unit::Count,
            "Remote fetches started by the query cache."
        );
        describe_counter!(
            metric_names::METRIC_QUERY_JOIN,
            Unit::Count,
            "Reads that joined a fetch already in flight."
        );
        describe_counter!(
            metric_names::METRIC_QUERY_ERROR,
            Unit::Count,
            "Fetches that ended in an error."
        );
        describe_histogram!(
            metric_names::METRIC_QUERY_FETCH_MS,
            Unit::Milliseconds,
            "Remote fetch latency in milliseconds."
        );
        describe_counter!(
            metric_names::METRIC_CACHE_INVALIDATE,
            Unit::Count,
            "Cache keys marked stale."
        );
        describe_counter!(
            METRIC_MUTATION,
            Unit::Count,
            "Writes dispatched to the backend."
        );
        describe_counter!(
            METRIC_MUTATION_FAILED,
            Unit::Count,
            "Writes the backend rejected or never received."
        );
    });
}
