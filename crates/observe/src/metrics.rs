use {
    prometheus::Encoder,
    std::{collections::HashMap, net::SocketAddr, sync::OnceLock},
    tokio::task::{self, JoinHandle},
};

/// Global metrics registry used by all components.
static REGISTRY: OnceLock<prometheus_metric_storage::StorageRegistry> = OnceLock::new();

/// Configure global metrics registry.
///
/// This function allows specifying common prefix that will be added
/// to all metric names, as well as common labels.
///
/// This function can be called at most once, and it should be done before
/// any call to [`get_registry`], ideally in the very beginning
/// of the `main` function.
///
/// # Panics
///
/// This function panics if it's called twice, or if it's called after
/// any call to [`get_registry`]. This function also panics if registry
/// configuration is invalid.
pub fn setup_registry(prefix: Option<String>, labels: Option<HashMap<String, String>>) {
    let registry = prometheus::Registry::new_custom(prefix, labels).unwrap();
    let storage_registry = prometheus_metric_storage::StorageRegistry::new(registry);
    REGISTRY.set(storage_registry).unwrap();
}

/// Get the global instance of the metrics registry.
pub fn get_registry() -> &'static prometheus::Registry {
    get_storage_registry().registry()
}

/// Get the global instance of the metric storage registry.
///
/// If the global registry was not configured with [`setup_registry`] it gets
/// initialized with a default value. That way unit tests can record metrics
/// without any setup.
pub fn get_storage_registry() -> &'static prometheus_metric_storage::StorageRegistry {
    REGISTRY.get_or_init(prometheus_metric_storage::StorageRegistry::default)
}

pub fn encode(registry: &prometheus::Registry) -> String {
    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&registry.gather(), &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// `/metrics` route exposing encoded prometheus data to the monitoring system.
pub fn handle_metrics() -> axum::Router {
    async fn metrics_handler() -> String {
        encode(get_registry())
    }

    axum::Router::new().route("/metrics", axum::routing::get(metrics_handler))
}

pub fn serve_metrics(address: SocketAddr) -> JoinHandle<()> {
    task::spawn(async move {
        let listener = match tokio::net::TcpListener::bind(address).await {
            Ok(listener) => listener,
            Err(err) => {
                tracing::error!(%address, ?err, "failed to bind metrics listener");
                return;
            }
        };
        tracing::info!(%address, "serving metrics");
        if let Err(err) = axum::serve(listener, handle_metrics()).await {
            tracing::error!(?err, "metrics server stopped");
        }
    })
}

#[cfg(test)]
mod tests {
    use {super::*, prometheus::IntCounter};

    #[test]
    fn encodes_registered_metrics() {
        let registry = prometheus::Registry::new();
        let counter = IntCounter::new("fetches", "number of fetches").unwrap();
        registry.register(Box::new(counter.clone())).unwrap();
        counter.inc_by(3);

        let encoded = encode(&registry);
        assert!(encoded.contains("fetches 3"));
    }
}
