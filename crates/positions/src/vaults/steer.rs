//! Steer vaults. Both the vault list and the account's staked pools come
//! from the off-chain registry.

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
pub struct SteerVault {
    pub address: Address,
    pub token0: Option<Address>,
    pub token1: Option<Address>,
}

/// A staking pool the account has deposited vault shares in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SteerFarm {
    pub staking_token: Address,
    pub staked_amount: U256,
}

pub fn stake(farms: &[SteerFarm], vault: &Address) -> Stake {
    farms
        .iter()
        .find(|farm| farm.staking_token == *vault)
        .map_or(Stake::NoFarm, |farm| Stake::Staked(farm.staked_amount))
}

pub fn held(
    vaults: &[SteerVault],
    balances: &[CallState<U256>],
    farms: &[SteerFarm],
    tokens: &TokenList,
) -> Vec<VaultPosition> {
    vaults
        .iter()
        .zip(balances)
        .filter_map(|(vault, balance)| {
            let mut position = VaultPosition::held(
                Family::Steer,
                vault.address,
                balance.value_or_zero(),
                stake(farms, &vault.address),
            )?;
            position.token0 = super::resolve(tokens, vault.token0);
            position.token1 = super::resolve(tokens, vault.token1);
            Some(position)
        })
        .collect()
}

pub async fn fetch(
    reader: &dyn VaultReading,
    vaults: &[SteerVault],
    farms: &[SteerFarm],
    account: Address,
    tokens: &TokenList,
    aggregator: &mut VaultAggregator,
) -> anyhow::Result<VaultPositions> {
    aggregator.enter(Phase::FetchingBalances);
    let addresses = vaults.iter().map(|vault| vault.address).collect::<Vec<_>>();
    let balances = reader.balances(&addresses, account).await;
    super::ensure_reachable(Family::Steer, &balances)?;

    Ok(VaultPositions {
        loading: any_loading(&balances),
        positions: held(vaults, &balances, farms, tokens),
    })
}
