//! Seams to the batched contract-call executor.
//!
//! Each method issues one logical batch and returns one [`CallState`] per
//! input item, in input order.

use {
    crate::{
        enumerate::IndexQuery,
        position::RawPosition,
        read::CallState,
        vaults::{ichi::IchiTotals, unipilot},
    },
    alloy::primitives::{Address, U256},
};

#[cfg_attr(any(test, feature = "test-util"), mockall::automock)]
#[async_trait::async_trait]
pub trait PositionManagerReading: Send + Sync {
    /// `balanceOf(owner)` on the position manager.
    async fn balance_of(&self, manager: Address, owner: Address) -> CallState<U256>;

    /// `tokenOfOwnerByIndex(owner, index)` for every query.
    async fn token_of_owner_by_index(
        &self,
        manager: Address,
        queries: &[IndexQuery],
    ) -> Vec<CallState<U256>>;

    /// `positions(tokenId)` for every id.
    async fn positions(&self, manager: Address, token_ids: &[U256]) -> Vec<CallState<RawPosition>>;
}

/// A `userInfo(pid, user)` lookup on a MasterChef style farm.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChefQuery {
    pub pid: U256,
    pub user: Address,
}

/// The pair of tokens a vault manages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VaultTokens {
    pub token0: Address,
    pub token1: Address,
}

#[cfg_attr(any(test, feature = "test-util"), mockall::automock)]
#[async_trait::async_trait]
pub trait VaultReading: Send + Sync {
    /// `balanceOf(owner)` on each of the given share tokens.
    async fn balances(&self, tokens: &[Address], owner: Address) -> Vec<CallState<U256>>;

    /// The staked amount (`userInfo(pid, user).amount`) for every query on
    /// one chef.
    async fn chef_stakes(&self, chef: Address, queries: &[ChefQuery]) -> Vec<CallState<U256>>;

    /// The amount staked in a Unipilot reward farm. The farm contract is
    /// resolved per item, so this is a single call rather than a batch.
    async fn farm_stake(&self, farm: &unipilot::Farm, owner: Address) -> anyhow::Result<U256>;

    /// `symbol()` of each vault.
    async fn symbols(&self, vaults: &[Address]) -> Vec<CallState<String>>;

    /// `getVaultInfo()` of each Unipilot vault.
    async fn unipilot_vault_tokens(&self, vaults: &[Address]) -> Vec<CallState<VaultTokens>>;

    /// Underlying totals and share supply of each ICHI vault.
    async fn ichi_totals(&self, vaults: &[Address]) -> Vec<CallState<IchiTotals>>;
}
