//! Metrics Sinks
//!
//! A sink receives stats codecs after reads and exports their counters.
//! Recording must not block the read path.

mod prometheus_recorder;

pub use prometheus_recorder::{PrometheusConfig, PrometheusRecorder};

use crate::codec::StatsCodec;
use std::sync::Arc;

/// Destination for codec statistics
pub trait MetricsRecorder: Send + Sync {
    /// Export the current counters of `codec`, labelled by its store type
    fn record_from_codec(&self, codec: &Arc<StatsCodec>);
}
