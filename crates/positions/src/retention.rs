//! Anti-flicker retention of the last non-empty position list.
//!
//! Position lists are refetched whenever the account or the chain changes and
//! on every poll. Replacing the list naively shows an empty dashboard while a
//! refetch is in flight, so the last non-empty result of the same account is
//! kept around and served until fresh data arrives.

use {
    crate::{normalize::Normalized, position::PositionRecord},
    alloy::primitives::{Address, U256},
};

/// Holds exactly one snapshot: the last non-empty result.
#[derive(Debug, Default)]
pub struct Retention {
    /// Account observed on the previous call. `Some(None)` means the previous
    /// call had no account.
    previous_account: Option<Option<Address>>,
    snapshot: Option<Vec<PositionRecord>>,
}

impl Retention {
    /// Decides which result to show. Rules in order of precedence:
    /// 1. the account changed: the current result, stale data is invalid
    /// 2. nothing was retained yet: the current result
    /// 3. the number of token ids differs from the retained list: an empty
    ///    list, the next fetch populates it
    /// 4. the current result is empty: the retained list
    /// 5. otherwise the current result
    pub fn apply(
        &mut self,
        account: Option<Address>,
        token_ids: Option<&[U256]>,
        current: Normalized,
    ) -> Normalized {
        let account_changed = self.previous_account != Some(account);
        self.previous_account = Some(account);
        if account_changed {
            self.snapshot = None;
        }

        let previous = self.snapshot.clone();
        if !current.is_empty() {
            self.snapshot = current.positions.clone();
        }

        if account_changed {
            return current;
        }
        let Some(previous) = previous else {
            return current;
        };
        let count = token_ids.map(<[U256]>::len);
        if count.is_some_and(|count| count != previous.len()) {
            tracing::debug!(
                previous = previous.len(),
                current = ?count,
                "position set changed, waiting for the next fetch"
            );
            return Normalized::loaded(Vec::new());
        }
        if current.is_empty() {
            return Normalized::loaded(previous);
        }
        current
    }
}

/// Depth-1 memory for the position count: a total of zero falls back to the
/// total of the previous call.
#[derive(Debug, Default)]
pub struct CountRetention {
    previous: Option<usize>,
}

impl CountRetention {
    pub fn apply(&mut self, total: usize) -> usize {
        let previous = self.previous.replace(total);
        if total > 0 {
            total
        } else {
            previous.unwrap_or_default()
        }
    }
}
