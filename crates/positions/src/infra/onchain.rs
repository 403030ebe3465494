//! Contract reads over an alloy provider.
//!
//! Every item of a batch is its own `eth_call`; the calls are issued
//! concurrently and joined in input order. Combining them into fewer
//! requests is left to the transport.

use {
    crate::{
        enumerate::IndexQuery,
        position::RawPosition,
        read::CallState,
        reader::{ChefQuery, PositionManagerReading, VaultReading, VaultTokens},
        vaults::{
            ichi::IchiTotals,
            unipilot::{Farm, RewardKind},
        },
    },
    alloy::primitives::{Address, U256},
    anyhow::{Result, anyhow},
    contracts::{
        ERC20,
        IchiVault,
        MasterChef,
        NonfungiblePositionManager,
        Provider,
        UnipilotDualReward,
        UnipilotSingleReward,
        UnipilotVault,
    },
    futures::future::join_all,
    std::{fmt::Debug, future::IntoFuture},
};

#[derive(Clone)]
pub struct Onchain {
    provider: Provider,
}

impl Onchain {
    pub fn new(provider: Provider) -> Self {
        Self { provider }
    }

    pub fn connect(node_url: url::Url) -> Self {
        use alloy::providers::{Provider as _, ProviderBuilder};
        Self::new(ProviderBuilder::new().connect_http(node_url).erased())
    }

    pub fn provider(&self) -> &Provider {
        &self.provider
    }
}

/// Converts a decoded ABI integer into the width the records use.
fn convert<T, U>(value: T, field: &'static str) -> Result<U>
where
    U: TryFrom<T>,
    <U as TryFrom<T>>::Error: Debug,
{
    U::try_from(value).map_err(|err| anyhow!("{field} out of range: {err:?}"))
}

fn raw_position(
    position: NonfungiblePositionManager::NonfungiblePositionManager::positionsReturn,
) -> Result<RawPosition> {
    Ok(RawPosition {
        nonce: convert(position.nonce, "nonce")?,
        operator: position.operator,
        token0: position.token0,
        token1: position.token1,
        fee: convert(position.fee, "fee")?,
        tick_lower: convert(position.tickLower, "tickLower")?,
        tick_upper: convert(position.tickUpper, "tickUpper")?,
        liquidity: position.liquidity,
        fee_growth_inside0_last_x128: position.feeGrowthInside0LastX128,
        fee_growth_inside1_last_x128: position.feeGrowthInside1LastX128,
        tokens_owed0: position.tokensOwed0,
        tokens_owed1: position.tokensOwed1,
    })
}

#[async_trait::async_trait]
impl PositionManagerReading for Onchain {
    async fn balance_of(&self, manager: Address, owner: Address) -> CallState<U256> {
        NonfungiblePositionManager::Instance::new(manager, self.provider.clone())
            .balanceOf(owner)
            .call()
            .await
            .into()
    }

    async fn token_of_owner_by_index(
        &self,
        manager: Address,
        queries: &[IndexQuery],
    ) -> Vec<CallState<U256>> {
        let instance = NonfungiblePositionManager::Instance::new(manager, self.provider.clone());
        join_all(queries.iter().map(|query| {
            let call = instance.tokenOfOwnerByIndex(query.owner, query.index);
            async move { CallState::from(call.call().await) }
        }))
        .await
    }

    async fn positions(&self, manager: Address, token_ids: &[U256]) -> Vec<CallState<RawPosition>> {
        let instance = NonfungiblePositionManager::Instance::new(manager, self.provider.clone());
        join_all(token_ids.iter().map(|token_id| {
            let call = instance.positions(*token_id);
            async move {
                CallState::from(
                    call.call()
                        .await
                        .map_err(anyhow::Error::from)
                        .and_then(raw_position),
                )
            }
        }))
        .await
    }
}

#[async_trait::async_trait]
impl VaultReading for Onchain {
    async fn balances(&self, tokens: &[Address], owner: Address) -> Vec<CallState<U256>> {
        join_all(tokens.iter().map(|token| {
            let instance = ERC20::Instance::new(*token, self.provider.clone());
            async move { CallState::from(instance.balanceOf(owner).call().await) }
        }))
        .await
    }

    async fn chef_stakes(&self, chef: Address, queries: &[ChefQuery]) -> Vec<CallState<U256>> {
        let instance = MasterChef::Instance::new(chef, self.provider.clone());
        join_all(queries.iter().map(|query| {
            let call = instance.userInfo(query.pid, query.user);
            async move { CallState::from(call.call().await.map(|info| info.amount)) }
        }))
        .await
    }

    async fn farm_stake(&self, farm: &Farm, owner: Address) -> Result<U256> {
        let amount = match farm.reward {
            RewardKind::Single => {
                UnipilotSingleReward::Instance::new(farm.id, self.provider.clone())
                    .balanceOf(owner)
                    .call()
                    .await?
            }
            RewardKind::Dual => {
                UnipilotDualReward::Instance::new(farm.id, self.provider.clone())
                    .balanceOf(owner)
                    .call()
                    .await?
            }
        };
        Ok(amount)
    }

    async fn symbols(&self, vaults: &[Address]) -> Vec<CallState<String>> {
        join_all(vaults.iter().map(|vault| {
            let instance = ERC20::Instance::new(*vault, self.provider.clone());
            async move { CallState::from(instance.symbol().call().await) }
        }))
        .await
    }

    async fn unipilot_vault_tokens(&self, vaults: &[Address]) -> Vec<CallState<VaultTokens>> {
        join_all(vaults.iter().map(|vault| {
            let instance = UnipilotVault::Instance::new(*vault, self.provider.clone());
            async move {
                CallState::from(instance.getVaultInfo().call().await.map(|info| VaultTokens {
                    token0: info.token0,
                    token1: info.token1,
                }))
            }
        }))
        .await
    }

    async fn ichi_totals(&self, vaults: &[Address]) -> Vec<CallState<IchiTotals>> {
        join_all(vaults.iter().map(|vault| {
            let instance = IchiVault::Instance::new(*vault, self.provider.clone());
            async move {
                let total_amounts = instance.getTotalAmounts();
                let total_supply = instance.totalSupply();
                let (amounts, supply) = futures::join!(
                    total_amounts.call().into_future(),
                    total_supply.call().into_future()
                );
                CallState::from(amounts.and_then(|amounts| {
                    Ok(IchiTotals {
                        total0: amounts.total0,
                        total1: amounts.total1,
                        supply: supply?,
                    })
                }))
            }
        }))
        .await
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        alloy::primitives::aliases::{I24, U24, U96},
    };

    #[test]
    fn decodes_positions_in_abi_order() {
        let position = raw_position(
            NonfungiblePositionManager::NonfungiblePositionManager::positionsReturn {
                nonce: U96::from(7),
                operator: Address::with_last_byte(1),
                token0: Address::with_last_byte(2),
                token1: Address::with_last_byte(3),
                fee: U24::from(3000),
                tickLower: I24::try_from(-887_220_i32).unwrap(),
                tickUpper: I24::try_from(887_220_i32).unwrap(),
                liquidity: 1_000,
                feeGrowthInside0LastX128: U256::from(11),
                feeGrowthInside1LastX128: U256::from(12),
                tokensOwed0: 13,
                tokensOwed1: 14,
            },
        )
        .unwrap();

        assert_eq!(
            position,
            RawPosition {
                nonce: 7,
                operator: Address::with_last_byte(1),
                token0: Address::with_last_byte(2),
                token1: Address::with_last_byte(3),
                fee: 3000,
                tick_lower: -887_220,
                tick_upper: 887_220,
                liquidity: 1_000,
                fee_growth_inside0_last_x128: U256::from(11),
                fee_growth_inside1_last_x128: U256::from(12),
                tokens_owed0: 13,
                tokens_owed1: 14,
            }
        );
    }
}
