//! Enumerates the position NFTs of an owner through the enumerable-ownership
//! interface (`balanceOf` followed by `tokenOfOwnerByIndex`).

use {
    crate::read::CallState,
    alloy::primitives::{Address, U256},
};

/// A single `tokenOfOwnerByIndex(owner, index)` lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IndexQuery {
    pub owner: Address,
    pub index: U256,
}

/// Upper bound on the positions enumerated for a single owner. Larger
/// balances come from a misconfigured or malicious manager.
pub const MAX_ENUMERATED_POSITIONS: u64 = 10_000;

/// Produces exactly `balance` index queries for `owner`, in index order.
///
/// No queries are produced without an owner or a balance, or for balances
/// above [`MAX_ENUMERATED_POSITIONS`].
pub fn index_queries(owner: Option<Address>, balance: Option<U256>) -> Vec<IndexQuery> {
    let (Some(owner), Some(balance)) = (owner, balance) else {
        return Vec::new();
    };
    let count = match u64::try_from(balance) {
        Ok(count) if count <= MAX_ENUMERATED_POSITIONS => count,
        _ => {
            tracing::warn!(?owner, %balance, "position balance out of range");
            return Vec::new();
        }
    };
    (0..count)
        .map(|index| IndexQuery {
            owner,
            index: U256::from(index),
        })
        .collect()
}

/// Collects the token ids returned by the index lookups, preserving query
/// order. Lookups that failed or returned nothing are skipped instead of
/// discarding the whole batch.
pub fn token_ids(owner: Option<Address>, results: &[CallState<U256>]) -> Vec<U256> {
    if owner.is_none() {
        return Vec::new();
    }
    results
        .iter()
        .filter(|call| !call.error)
        .filter_map(|call| call.result)
        .collect()
}
