//! Unipilot strategy vaults with optional single or dual reward farms.

use {
    super::{Family, Phase, Stake, VaultAggregator, VaultPosition, VaultPositions},
    crate::{
        read::{CallState, any_loading},
        reader::{VaultReading, VaultTokens},
        tokens::TokenList,
    },
    alloy::primitives::{Address, U256},
    futures::future::join_all,
    serde::Deserialize,
};

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum RewardKind {
    #[default]
    Single,
    Dual,
}

/// A reward farm accepting the shares of one vault.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Farm {
    /// The farm contract.
    pub id: Address,
    /// The vault whose shares are staked.
    pub staking_address: Address,
    pub reward: RewardKind,
}

pub fn find_farm<'a>(farms: &'a [Farm], vault: &Address) -> Option<&'a Farm> {
    farms.iter().find(|farm| farm.staking_address == *vault)
}

/// Pairs every vault with its wallet balance and stake and keeps the ones
/// the account has exposure to.
pub fn held(
    vaults: &[Address],
    lp_balances: &[CallState<U256>],
    stakes: &[Stake],
) -> Vec<VaultPosition> {
    vaults
        .iter()
        .zip(lp_balances)
        .zip(stakes)
        .filter_map(|((vault, lp), stake)| {
            VaultPosition::held(Family::Unipilot, *vault, lp.value_or_zero(), *stake)
        })
        .collect()
}

/// Vault symbols end in the strategy id, e.g. `ULP-WMATIC-USDC-3`.
pub fn strategy_id(symbol: &str) -> Option<u64> {
    symbol.rsplit('-').next()?.trim().parse().ok()
}

/// Attaches strategy id and tokens to the held vaults. Metadata that failed
/// to load is left empty.
pub fn describe(
    mut positions: Vec<VaultPosition>,
    symbols: &[CallState<String>],
    vault_tokens: &[CallState<VaultTokens>],
    tokens: &TokenList,
) -> Vec<VaultPosition> {
    for (i, position) in positions.iter_mut().enumerate() {
        position.strategy_id = symbols
            .get(i)
            .and_then(CallState::value)
            .and_then(|symbol| strategy_id(symbol));
        if let Some(pair) = vault_tokens.get(i).and_then(CallState::value) {
            position.token0 = super::resolve(tokens, Some(pair.token0));
            position.token1 = super::resolve(tokens, Some(pair.token1));
        }
    }
    positions
}

pub async fn fetch(
    reader: &dyn VaultReading,
    vaults: &[Address],
    farms: &[Farm],
    account: Address,
    tokens: &TokenList,
    aggregator: &mut VaultAggregator,
) -> anyhow::Result<VaultPositions> {
    aggregator.enter(Phase::FetchingBalances);
    let lp_balances = reader.balances(vaults, account).await;
    super::ensure_reachable(Family::Unipilot, &lp_balances)?;

    aggregator.enter(Phase::FetchingFarmDetails);
    let stakes = join_all(vaults.iter().map(|vault| async move {
        let Some(farm) = find_farm(farms, vault) else {
            return Stake::NoFarm;
        };
        match reader.farm_stake(farm, account).await {
            Ok(amount) => Stake::Staked(amount),
            Err(err) => {
                tracing::warn!(?vault, farm = ?farm.id, ?err, "failed to read farm stake");
                super::degraded(Family::Unipilot);
                Stake::Failed
            }
        }
    }))
    .await;

    let positions = held(vaults, &lp_balances, &stakes);
    let addresses = positions.iter().map(|position| position.address).collect::<Vec<_>>();
    let (symbols, vault_tokens) = futures::join!(
        reader.symbols(&addresses),
        reader.unipilot_vault_tokens(&addresses)
    );

    Ok(VaultPositions {
        loading: any_loading(&lp_balances) || any_loading(&symbols) || any_loading(&vault_tokens),
        positions: describe(positions, &symbols, &vault_tokens, tokens),
    })
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{reader::MockVaultReading, tokens::Token},
        maplit::hashmap,
        mockall::predicate::eq,
    };

    const ACCOUNT: Address = Address::repeat_byte(0xaa);

    #[test]
    fn parses_strategy_ids() {
        assert_eq!(strategy_id("ULP-WMATIC-USDC-3"), Some(3));
        assert_eq!(strategy_id("42"), Some(42));
        assert_eq!(strategy_id("ULP-WMATIC-USDC"), None);
        assert_eq!(strategy_id(""), None);
    }

    #[test]
    fn wallet_balance_without_farm() {
        let vault = Address::repeat_byte(1);
        let positions = held(&[vault], &[CallState::loaded(U256::from(5))], &[Stake::NoFarm]);

        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].lp_balance, U256::from(5));
        assert_eq!(positions[0].stake.amount(), U256::ZERO);
        assert_eq!(positions[0].share, U256::from(5));
        assert!(!positions[0].is_farming());
    }

    #[test]
    fn staked_only() {
        let vault = Address::repeat_byte(1);
        let positions = held(
            &[vault],
            &[CallState::loaded(U256::ZERO)],
            &[Stake::Staked(U256::from(2))],
        );

        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].lp_balance, U256::ZERO);
        assert_eq!(positions[0].share, U256::from(2));
        assert!(positions[0].is_farming());
    }

    #[test]
    fn drops_vaults_without_exposure() {
        let vaults = [Address::repeat_byte(1), Address::repeat_byte(2)];
        let positions = held(
            &vaults,
            &[CallState::loaded(U256::ZERO), CallState::failed()],
            &[Stake::Staked(U256::ZERO), Stake::Failed],
        );
        assert!(positions.is_empty());
    }

    #[tokio::test]
    async fn fetches_stakes_and_metadata_for_held_vaults() {
        let held_vault = Address::repeat_byte(1);
        let empty_vault = Address::repeat_byte(2);
        let farm = Farm {
            id: Address::repeat_byte(3),
            staking_address: held_vault,
            reward: RewardKind::Dual,
        };
        let token0 = Address::repeat_byte(4);
        let token1 = Address::repeat_byte(5);

        let mut reader = MockVaultReading::new();
        reader
            .expect_balances()
            .withf(|vaults, owner| vaults.len() == 2 && *owner == ACCOUNT)
            .returning(|_, _| {
                vec![CallState::loaded(U256::from(1)), CallState::loaded(U256::ZERO)]
            });
        reader
            .expect_farm_stake()
            .with(eq(farm.clone()), eq(ACCOUNT))
            .times(1)
            .returning(|_, _| Ok(U256::from(9)));
        reader
            .expect_symbols()
            .withf(move |vaults| vaults.to_vec() == vec![held_vault])
            .returning(|_| vec![CallState::loaded("ULP-A-B-7".to_string())]);
        reader
            .expect_unipilot_vault_tokens()
            .returning(move |_| vec![CallState::loaded(VaultTokens { token0, token1 })]);

        let tokens = TokenList::new(hashmap! {
            token0 => Token {
                address: token0,
                symbol: "A".to_string(),
                name: "Token A".to_string(),
                decimals: 18,
            },
        });
        let mut aggregator = VaultAggregator::new(Family::Unipilot);
        let result = fetch(
            &reader,
            &[held_vault, empty_vault],
            &[farm],
            ACCOUNT,
            &tokens,
            &mut aggregator,
        )
        .await
        .unwrap();

        assert!(!result.loading);
        assert_eq!(result.positions.len(), 1);
        let position = &result.positions[0];
        assert_eq!(position.address, held_vault);
        assert_eq!(position.share, U256::from(10));
        assert_eq!(position.strategy_id, Some(7));
        assert_eq!(position.token0.as_ref().map(|token| token.symbol.as_str()), Some("A"));
        assert_eq!(position.token1, None);
    }

    #[tokio::test]
    async fn failed_farm_reads_count_as_zero() {
        let vault = Address::repeat_byte(1);
        let farm = Farm {
            id: Address::repeat_byte(3),
            staking_address: vault,
            reward: RewardKind::Single,
        };

        let mut reader = MockVaultReading::new();
        reader
            .expect_balances()
            .returning(|_, _| vec![CallState::loaded(U256::from(5))]);
        reader
            .expect_farm_stake()
            .returning(|_, _| Err(anyhow::anyhow!("execution reverted")));
        reader
            .expect_symbols()
            .returning(|_| vec![CallState::failed()]);
        reader
            .expect_unipilot_vault_tokens()
            .returning(|_| vec![CallState::failed()]);

        let mut aggregator = VaultAggregator::new(Family::Unipilot);
        let result = fetch(
            &reader,
            &[vault],
            &[farm],
            ACCOUNT,
            &TokenList::default(),
            &mut aggregator,
        )
        .await
        .unwrap();

        assert_eq!(result.positions.len(), 1);
        assert_eq!(result.positions[0].stake, Stake::Failed);
        assert_eq!(result.positions[0].share, U256::from(5));
        assert_eq!(result.positions[0].strategy_id, None);
    }
}
