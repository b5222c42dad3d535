//! Prometheus metrics

use std::net::SocketAddr;
use std::time::Duration;

/// Counter metric types
#[derive(Debug, Clone, Copy)]
pub enum CounterMetric {
    /// Account notifications seen
    NotificationsReceived,
    /// Notifications let through the update gate
    NotificationsAdmitted,
    /// Notifications dropped by the update gate
    NotificationsDropped,
    /// Successfully decoded prices
    Observations,
    /// Account payloads that failed to decode
    DecodeErrors,
    /// Messages that failed to parse
    ParseErrors,
    /// Subscription requests sent
    SubscribeRequests,
}

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Last decoded price
    LastPrice,
    /// Slot of the last decoded price
    LastSlot,
}

/// Latency metric types
#[derive(Debug, Clone, Copy)]
pub enum LatencyMetric {
    /// Account payload decode time
    Decode,
}

impl CounterMetric {
    fn name(self) -> &'static str {
        match self {
            CounterMetric::NotificationsReceived => "oracle_notifications_received_total",
            CounterMetric::NotificationsAdmitted => "oracle_notifications_admitted_total",
            CounterMetric::NotificationsDropped => "oracle_notifications_dropped_total",
            CounterMetric::Observations => "oracle_price_observations_total",
            CounterMetric::DecodeErrors => "oracle_decode_errors_total",
            CounterMetric::ParseErrors => "oracle_parse_errors_total",
            CounterMetric::SubscribeRequests => "oracle_subscribe_requests_total",
        }
    }
}

/// Increment a counter by one
pub fn increment(metric: CounterMetric) {
    metrics::counter!(metric.name()).increment(1);
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    let metric_name = match metric {
        GaugeMetric::LastPrice => "oracle_last_price",
        GaugeMetric::LastSlot => "oracle_last_slot",
    };
    metrics::gauge!(metric_name).set(value);
}

/// Record a latency measurement in milliseconds
pub fn record_latency(metric: LatencyMetric, duration: Duration) {
    let metric_name = match metric {
        LatencyMetric::Decode => "oracle_decode_latency_ms",
    };
    metrics::histogram!(metric_name).record(duration.as_secs_f64() * 1_000.0);
}

/// Serve Prometheus metrics on `0.0.0.0:port`
pub fn install_exporter(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to start metrics exporter: {}", e))?;

    tracing::info!(%addr, "Prometheus metrics exporter listening");
    Ok(())
}
