//! Gamma hypervisors, staked through MasterChef farms.

use {
    super::{Family, Phase, Stake, VaultAggregator, VaultPosition, VaultPositions},
    crate::{
        read::{CallState, any_loading},
        reader::VaultReading,
        tokens::TokenList,
    },
    alloy::primitives::{Address, U256},
    serde::Deserialize,
};

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct GammaPair {
    /// The hypervisor, which is also its share token.
    pub address: Address,
    pub pid: u64,
    /// Index into the chain's MasterChef list.
    #[serde(default)]
    pub master_chef_index: usize,
    #[serde(default)]
    pub token0: Option<Address>,
    #[serde(default)]
    pub token1: Option<Address>,
}

/// The chef of every pair, `None` when its index is out of range.
pub fn assignments(pairs: &[GammaPair], chefs: usize) -> Vec<Option<usize>> {
    pairs
        .iter()
        .map(|pair| (pair.master_chef_index < chefs).then_some(pair.master_chef_index))
        .collect()
}

pub fn held(
    pairs: &[GammaPair],
    lp_balances: &[CallState<U256>],
    stakes: &[Stake],
    tokens: &TokenList,
) -> Vec<VaultPosition> {
    pairs
        .iter()
        .zip(lp_balances)
        .zip(stakes)
        .filter_map(|((pair, lp), stake)| {
            let mut position =
                VaultPosition::held(Family::Gamma, pair.address, lp.value_or_zero(), *stake)?;
            position.token0 = super::resolve(tokens, pair.token0);
            position.token1 = super::resolve(tokens, pair.token1);
            Some(position)
        })
        .collect()
}

pub async fn fetch(
    reader: &dyn VaultReading,
    pairs: &[GammaPair],
    chefs: &[Address],
    account: Address,
    tokens: &TokenList,
    aggregator: &mut VaultAggregator,
) -> anyhow::Result<VaultPositions> {
    aggregator.enter(Phase::FetchingBalances);
    let addresses = pairs.iter().map(|pair| pair.address).collect::<Vec<_>>();
    let assignments = assignments(pairs, chefs.len());
    let pids = pairs.iter().map(|pair| U256::from(pair.pid)).collect::<Vec<_>>();
    let batches = super::chef_batches(&assignments, &pids, chefs.len(), account);

    let (lp_balances, staked) = futures::join!(
        reader.balances(&addresses, account),
        super::fetch_chef_stakes(reader, chefs, &batches)
    );
    super::ensure_reachable(Family::Gamma, &lp_balances)?;

    let stakes = super::stakes_from_chefs(Family::Gamma, &assignments, &staked);
    let loading = any_loading(&lp_balances) || staked.iter().any(|calls| any_loading(calls));
    Ok(VaultPositions {
        loading,
        positions: held(pairs, &lp_balances, &stakes, tokens),
    })
}
