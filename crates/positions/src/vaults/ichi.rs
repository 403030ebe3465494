//! ICHI single sided vaults. There are no farms, so a vault is held iff the
//! wallet balance is positive.

use {
    super::{Family, Phase, Stake, VaultAggregator, VaultPosition, VaultPositions},
    crate::{
        read::{CallState, any_loading},
        reader::VaultReading,
        tokens::TokenList,
    },
    alloy::primitives::{Address, U256},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IchiVault {
    pub address: Address,
    pub token_a: Address,
    pub token_b: Address,
}

/// `getTotalAmounts()` together with `totalSupply()` of a vault.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IchiTotals {
    pub total0: U256,
    pub total1: U256,
    pub supply: U256,
}

impl IchiTotals {
    /// The underlying amounts `balance` shares are worth, rounded down.
    pub fn user_amounts(&self, balance: U256) -> Option<(U256, U256)> {
        if self.supply.is_zero() {
            return None;
        }
        let amount = |total: U256| Some(total.checked_mul(balance)? / self.supply);
        Some((amount(self.total0)?, amount(self.total1)?))
    }
}

pub fn held(
    vaults: &[IchiVault],
    balances: &[CallState<U256>],
    tokens: &TokenList,
) -> Vec<VaultPosition> {
    vaults
        .iter()
        .zip(balances)
        .filter_map(|(vault, balance)| {
            let mut position = VaultPosition::held(
                Family::Ichi,
                vault.address,
                balance.value_or_zero(),
                Stake::NoFarm,
            )?;
            position.token0 = super::resolve(tokens, Some(vault.token_a));
            position.token1 = super::resolve(tokens, Some(vault.token_b));
            Some(position)
        })
        .collect()
}

/// Attaches the underlying token amounts to the held vaults. Vaults whose
/// totals failed to load keep `None`.
pub fn with_amounts(
    mut positions: Vec<VaultPosition>,
    totals: &[CallState<IchiTotals>],
) -> Vec<VaultPosition> {
    for (position, totals) in positions.iter_mut().zip(totals) {
        position.token_amounts = totals
            .value()
            .and_then(|totals| totals.user_amounts(position.lp_balance));
    }
    positions
}

pub async fn fetch(
    reader: &dyn VaultReading,
    vaults: &[IchiVault],
    account: Address,
    tokens: &TokenList,
    aggregator: &mut VaultAggregator,
) -> anyhow::Result<VaultPositions> {
    aggregator.enter(Phase::FetchingBalances);
    let addresses = vaults.iter().map(|vault| vault.address).collect::<Vec<_>>();
    let balances = reader.balances(&addresses, account).await;
    super::ensure_reachable(Family::Ichi, &balances)?;

    aggregator.enter(Phase::FetchingFarmDetails);
    let positions = held(vaults, &balances, tokens);
    let held_addresses = positions.iter().map(|position| position.address).collect::<Vec<_>>();
    let totals = reader.ichi_totals(&held_addresses).await;

    Ok(VaultPositions {
        loading: any_loading(&balances) || any_loading(&totals),
        positions: with_amounts(positions, &totals),
    })
}
