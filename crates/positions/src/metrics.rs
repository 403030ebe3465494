use prometheus::{IntCounterVec, IntGaugeVec};

#[derive(prometheus_metric_storage::MetricStorage)]
#[metric(subsystem = "positions")]
pub struct Metrics {
    /// Aggregation runs that failed and reported an empty result.
    #[metric(labels("source"))]
    pub aggregation_failures: IntCounterVec,

    /// Stake reads that failed and were counted as zero.
    #[metric(labels("family"))]
    pub degraded_stakes: IntCounterVec,

    /// Positions reported by the last aggregation run.
    #[metric(labels("source"))]
    pub positions: IntGaugeVec,

    /// Off-chain registry fetches, by outcome.
    #[metric(labels("registry", "result"))]
    pub registry_fetches: IntCounterVec,
}

pub fn get() -> &'static Metrics {
    Metrics::instance(observe::metrics::get_storage_registry()).unwrap()
}

pub fn positions(source: &str, count: usize) {
    get()
        .positions
        .with_label_values(&[source])
        .set(i64::try_from(count).unwrap_or(i64::MAX));
}
