//! DefiEdge strategies, some of them staked through a MiniChef.

use {
    super::{Family, Phase, Stake, VaultAggregator, VaultPosition, VaultPositions},
    crate::{
        read::{CallState, any_loading},
        reader::VaultReading,
        tokens::TokenList,
    },
    alloy::primitives::{Address, U256},
    itertools::Itertools,
    serde::Deserialize,
};

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct Strategy {
    /// The strategy contract, which is also its share token.
    pub id: Address,
    #[serde(default)]
    pub mini_chef_address: Option<Address>,
    #[serde(default)]
    pub pid: Option<u64>,
    #[serde(default)]
    pub token0: Option<Address>,
    #[serde(default)]
    pub token1: Option<Address>,
}

impl Strategy {
    /// The farm this strategy can be staked in. Strategies without a pool id
    /// cannot be looked up and count as not farmable.
    fn farm(&self) -> Option<(Address, u64)> {
        Some((self.mini_chef_address?, self.pid?))
    }
}

/// Distinct MiniChefs in first-seen order.
pub fn mini_chefs(strategies: &[Strategy]) -> Vec<Address> {
    strategies
        .iter()
        .filter_map(|strategy| strategy.farm().map(|(chef, _)| chef))
        .unique()
        .collect()
}

pub fn assignments(strategies: &[Strategy], chefs: &[Address]) -> Vec<Option<usize>> {
    strategies
        .iter()
        .map(|strategy| {
            let (chef, _) = strategy.farm()?;
            chefs.iter().position(|candidate| *candidate == chef)
        })
        .collect()
}

pub fn held(
    strategies: &[Strategy],
    lp_balances: &[CallState<U256>],
    stakes: &[Stake],
    tokens: &TokenList,
) -> Vec<VaultPosition> {
    strategies
        .iter()
        .zip(lp_balances)
        .zip(stakes)
        .filter_map(|((strategy, lp), stake)| {
            let mut position =
                VaultPosition::held(Family::DefiEdge, strategy.id, lp.value_or_zero(), *stake)?;
            position.token0 = super::resolve(tokens, strategy.token0);
            position.token1 = super::resolve(tokens, strategy.token1);
            Some(position)
        })
        .collect()
}

pub async fn fetch(
    reader: &dyn VaultReading,
    strategies: &[Strategy],
    account: Address,
    tokens: &TokenList,
    aggregator: &mut VaultAggregator,
) -> anyhow::Result<VaultPositions> {
    aggregator.enter(Phase::FetchingBalances);
    let addresses = strategies.iter().map(|strategy| strategy.id).collect::<Vec<_>>();
    let chefs = mini_chefs(strategies);
    let assignments = assignments(strategies, &chefs);
    let pids = strategies
        .iter()
        .map(|strategy| U256::from(strategy.pid.unwrap_or_default()))
        .collect::<Vec<_>>();
    let batches = super::chef_batches(&assignments, &pids, chefs.len(), account);

    let (lp_balances, staked) = futures::join!(
        reader.balances(&addresses, account),
        super::fetch_chef_stakes(reader, &chefs, &batches)
    );
    super::ensure_reachable(Family::DefiEdge, &lp_balances)?;

    let stakes = super::stakes_from_chefs(Family::DefiEdge, &assignments, &staked);
    let loading = any_loading(&lp_balances) || staked.iter().any(|calls| any_loading(calls));
    Ok(VaultPositions {
        loading,
        positions: held(strategies, &lp_balances, &stakes, tokens),
    })
}

#[cfg(test)]
mod tests {
    use {super::*, crate::reader::MockVaultReading};

    const ACCOUNT: Address = Address::repeat_byte(0xaa);

    fn strategy(byte: u8, chef: Option<u8>, pid: Option<u64>) -> Strategy {
        Strategy {
            id: Address::repeat_byte(byte),
            mini_chef_address: chef.map(Address::repeat_byte),
            pid,
            token0: None,
            token1: None,
        }
    }

    #[test]
    fn deduplicates_mini_chefs() {
        let strategies = [
            strategy(1, Some(0xc1), Some(0)),
            strategy(2, None, None),
            strategy(3, Some(0xc0), Some(1)),
            strategy(4, Some(0xc1), Some(2)),
            strategy(5, Some(0xc2), None),
        ];
        let chefs = mini_chefs(&strategies);
        assert_eq!(chefs, vec![Address::repeat_byte(0xc1), Address::repeat_byte(0xc0)]);
        assert_eq!(
            assignments(&strategies, &chefs),
            vec![Some(0), None, Some(1), Some(0), None]
        );
    }

    #[tokio::test]
    async fn sums_wallet_and_mini_chef_stakes() {
        let strategies = [
            strategy(1, Some(0xc1), Some(7)),
            strategy(2, None, None),
            strategy(3, Some(0xc1), Some(8)),
        ];

        let mut reader = MockVaultReading::new();
        reader.expect_balances().returning(|_, _| {
            vec![
                CallState::loaded(U256::from(1)),
                CallState::loaded(U256::ZERO),
                CallState::loaded(U256::ZERO),
            ]
        });
        reader
            .expect_chef_stakes()
            .withf(|chef, queries| {
                *chef == Address::repeat_byte(0xc1)
                    && queries
                        .iter()
                        .all(|query| query.user == ACCOUNT)
                    && queries
                        .iter()
                        .map(|query| query.pid)
                        .eq([U256::from(7), U256::from(8)])
            })
            .times(1)
            .returning(|_, _| {
                vec![CallState::loaded(U256::from(4)), CallState::loaded(U256::ZERO)]
            });

        let mut aggregator = VaultAggregator::new(Family::DefiEdge);
        let result = fetch(
            &reader,
            &strategies,
            ACCOUNT,
            &TokenList::default(),
            &mut aggregator,
        )
        .await
        .unwrap();

        assert_eq!(result.count().count, 1);
        let position = &result.positions[0];
        assert_eq!(position.address, Address::repeat_byte(1));
        assert_eq!(position.lp_balance, U256::from(1));
        assert_eq!(position.share, U256::from(5));
    }
}
