//! Uniform shape for the results of batched contract reads.
//!
//! Every read the aggregation stages consume is wrapped into a [`CallState`].
//! The stages never look at transport details, they only see whether a value
//! is available, still pending or failed.

use alloy::primitives::U256;

/// The state of a single contract call within a batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallState<T> {
    /// The decoded return value. May be present while `loading` is set if
    /// the executor keeps the previous value around during a refetch.
    pub result: Option<T>,
    pub loading: bool,
    pub error: bool,
}

impl<T> CallState<T> {
    pub fn loaded(value: T) -> Self {
        Self {
            result: Some(value),
            loading: false,
            error: false,
        }
    }

    pub fn loading() -> Self {
        Self {
            result: None,
            loading: true,
            error: false,
        }
    }

    pub fn failed() -> Self {
        Self {
            result: None,
            loading: false,
            error: true,
        }
    }

    /// Returns the value if the call finished successfully.
    pub fn value(&self) -> Option<&T> {
        if self.loading || self.error {
            return None;
        }
        self.result.as_ref()
    }
}

impl CallState<U256> {
    /// Amount reads degrade to zero when they are pending or failed. Zero is a
    /// safe under-estimate when filtering for held positions.
    pub fn value_or_zero(&self) -> U256 {
        self.value().copied().unwrap_or_default()
    }
}

impl<T, E> From<Result<T, E>> for CallState<T>
where
    E: std::fmt::Debug,
{
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::loaded(value),
            Err(err) => {
                tracing::debug!(?err, "contract call failed");
                Self::failed()
            }
        }
    }
}

pub fn any_loading<T>(calls: &[CallState<T>]) -> bool {
    calls.iter().any(|call| call.loading)
}

pub fn any_error<T>(calls: &[CallState<T>]) -> bool {
    calls.iter().any(|call| call.error)
}
