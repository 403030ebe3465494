//! Positions deposited in a farming center.
//!
//! Deposited NFTs are owned by the farming center, so they never show up when
//! enumerating the account's wallet. The farming subgraphs know which ids were
//! deposited by whom.

use {
    alloy::primitives::{Address, U256},
    anyhow::Result,
};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FarmedPositions {
    /// Ids deposited in the current farming center.
    pub transferred: Vec<U256>,
    /// Ids deposited in the legacy farming center.
    pub old_transferred: Vec<U256>,
}

#[cfg_attr(any(test, feature = "test-util"), mockall::automock)]
#[async_trait::async_trait]
pub trait FarmDiscovery: Send + Sync {
    async fn positions_on_farmer(&self, account: Address) -> Result<FarmedPositions>;
}
