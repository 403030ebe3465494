//! This crate is intended to contain code that is required to provide or
//! improve the observability of the position aggregator. That includes
//! initialization logic for metrics and logging as well as the shutdown signal
//! handling of the polling services.
pub mod metrics;
pub mod shutdown;
pub mod tracing;
