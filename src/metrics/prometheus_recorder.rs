//! Prometheus Recorder
//!
//! Exports codec counters as the gauge `<namespace>_collector` labelled
//! `service`, `store` and `metric`. Codecs are handed to a recorder task
//! through a bounded queue, so reads never wait on the registry.

use super::MetricsRecorder;
use crate::codec::StatsCodec;
use crate::error::{Error, Result};
use crate::queue::{WriteBackQueue, DEFAULT_QUEUE_CAPACITY};
use futures::FutureExt;
use prometheus::{GaugeVec, Opts, Registry};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

const COLLECTOR_NAME: &str = "collector";
const COLLECTOR_HELP: &str = "This represent the number of items in cache";
const COLLECTOR_LABELS: [&str; 3] = ["service", "store", "metric"];

/// Prometheus recorder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrometheusConfig {
    /// Value of the `service` label
    pub service: String,
    /// Metric namespace
    pub namespace: String,
    /// Codecs buffered before recordings are dropped
    pub channel_capacity: usize,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            service: "cache".to_string(),
            namespace: "cache".to_string(),
            channel_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl PrometheusConfig {
    pub fn for_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            ..Default::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.service.is_empty() {
            return Err(Error::Configuration("service label must not be empty".into()));
        }
        if self.namespace.is_empty() {
            return Err(Error::Configuration("namespace must not be empty".into()));
        }
        if self.channel_capacity == 0 {
            return Err(Error::Configuration("channel_capacity must be positive".into()));
        }
        Ok(())
    }
}

fn export(collector: &GaugeVec, service: &str, codec: &StatsCodec) {
    let store = codec.store_type();
    for (metric, value) in codec.stats().metrics() {
        collector
            .with_label_values(&[service, store, metric])
            .set(value as f64);
    }
}

/// [`MetricsRecorder`] backed by a Prometheus gauge vector
pub struct PrometheusRecorder {
    service: String,
    collector: GaugeVec,
    queue: WriteBackQueue<Arc<StatsCodec>>,
}

impl PrometheusRecorder {
    /// Create the collector, register it with `registry` and start the
    /// recorder task
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: PrometheusConfig, registry: &Registry) -> Result<Self> {
        config.validate()?;

        let collector = GaugeVec::new(
            Opts::new(COLLECTOR_NAME, COLLECTOR_HELP).namespace(config.namespace.clone()),
            &COLLECTOR_LABELS,
        )?;
        registry.register(Box::new(collector.clone()))?;

        let gauge = collector.clone();
        let service = config.service.clone();
        let queue = WriteBackQueue::spawn(
            "prometheus_recorder",
            config.channel_capacity,
            Box::new(move |codec: Arc<StatsCodec>| {
                export(&gauge, &service, &codec);
                async {}.boxed()
            }),
        );

        info!(
            service = %config.service,
            namespace = %config.namespace,
            "Prometheus recorder registered"
        );

        Ok(Self {
            service: config.service,
            collector,
            queue,
        })
    }

    /// Set one gauge directly
    pub fn record(&self, store: &str, metric: &str, value: f64) {
        self.collector
            .with_label_values(&[self.service.as_str(), store, metric])
            .set(value);
    }

    pub fn collector(&self) -> &GaugeVec {
        &self.collector
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// Stop the recorder task after it exported everything queued
    pub async fn close(&self) {
        self.queue.close().await;
    }
}

impl MetricsRecorder for PrometheusRecorder {
    fn record_from_codec(&self, codec: &Arc<StatsCodec>) {
        self.queue.try_enqueue(codec.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheInterface, CacheRef, MetricCache, TypedCache};
    use crate::store::{MemoryStore, SetOptions};

    fn gauge(recorder: &PrometheusRecorder, store: &str, metric: &str) -> f64 {
        recorder
            .collector()
            .with_label_values(&[recorder.service(), store, metric])
            .get()
    }

    #[tokio::test]
    async fn test_record_sets_gauge() {
        let registry = Registry::new();
        let recorder = PrometheusRecorder::new(PrometheusConfig::for_service("my-app"), &registry).unwrap();

        recorder.record("redis", "hit_count", 6.0);

        assert_eq!(gauge(&recorder, "redis", "hit_count"), 6.0);
        let families = registry.gather();
        assert_eq!(families.len(), 1);
        assert_eq!(families[0].get_name(), "cache_collector");
        recorder.close().await;
    }

    #[tokio::test]
    async fn test_record_from_codec_exports_every_counter() {
        let registry = Registry::new();
        let recorder = PrometheusRecorder::new(PrometheusConfig::for_service("my-app"), &registry).unwrap();

        let codec = Arc::new(StatsCodec::from_store(MemoryStore::new()));
        codec
            .set("k", "v".into(), &SetOptions::new())
            .await
            .unwrap();
        codec.get("k").await.unwrap();
        codec.get("absent").await.unwrap_err();

        recorder.record_from_codec(&codec);
        recorder.close().await;

        assert_eq!(gauge(&recorder, "memory", "hit_count"), 1.0);
        assert_eq!(gauge(&recorder, "memory", "miss_count"), 1.0);
        assert_eq!(gauge(&recorder, "memory", "set_success"), 1.0);
        assert_eq!(gauge(&recorder, "memory", "clear_error"), 0.0);
        assert_eq!(registry.gather()[0].get_metric().len(), 10);
    }

    #[tokio::test]
    async fn test_metric_cache_feeds_recorder() {
        let registry = Registry::new();
        let recorder = Arc::new(
            PrometheusRecorder::new(PrometheusConfig::for_service("my-app"), &registry).unwrap(),
        );
        let cache = MetricCache::new(
            recorder.clone(),
            Arc::new(TypedCache::<str, String>::from_store(MemoryStore::new())) as CacheRef<str, String>,
        );

        cache.get("absent").await.unwrap_err();
        recorder.close().await;

        assert_eq!(gauge(&recorder, "memory", "miss_count"), 1.0);
    }

    #[tokio::test]
    async fn test_duplicate_registration_fails() {
        let registry = Registry::new();
        let first = PrometheusRecorder::new(PrometheusConfig::default(), &registry).unwrap();

        let second = PrometheusRecorder::new(PrometheusConfig::default(), &registry);
        assert!(matches!(second, Err(Error::Prometheus(_))));
        first.close().await;
    }

    #[test]
    fn test_config_validation() {
        assert!(PrometheusConfig::default().validate().is_ok());

        let empty_service = PrometheusConfig::for_service("");
        assert!(matches!(empty_service.validate(), Err(Error::Configuration(_))));

        let no_buffer = PrometheusConfig {
            channel_capacity: 0,
            ..Default::default()
        };
        assert!(no_buffer.validate().is_err());
    }
}
