//! Aggregators for the vault integrations.
//!
//! Every family follows the same shape: read the wallet balance of each
//! candidate vault, add whatever is staked in the matching farm, keep the
//! vaults with a non-zero share and only then resolve descriptive metadata.

use {
    crate::{
        metrics,
        read::CallState,
        reader::{ChefQuery, VaultReading},
        tokens::{Token, TokenList},
    },
    alloy::primitives::{Address, U256},
    anyhow::{anyhow, ensure},
    std::{fmt, str::FromStr},
};

pub mod defiedge;
pub mod gamma;
pub mod ichi;
pub mod steer;
pub mod unipilot;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Family {
    Unipilot,
    Gamma,
    DefiEdge,
    Steer,
    Ichi,
}

impl Family {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unipilot => "unipilot",
            Self::Gamma => "gamma",
            Self::DefiEdge => "defiedge",
            Self::Steer => "steer",
            Self::Ichi => "ichi",
        }
    }
}

impl FromStr for Family {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        [Self::Unipilot, Self::Gamma, Self::DefiEdge, Self::Steer, Self::Ichi]
            .into_iter()
            .find(|family| family.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| anyhow!("unknown vault family {s:?}"))
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Amount of vault shares deposited in a farm.
///
/// Failed reads count as zero for the share but stay distinguishable from
/// vaults that have no farm at all.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Stake {
    #[default]
    NoFarm,
    Staked(U256),
    Failed,
}

impl Stake {
    pub fn amount(&self) -> U256 {
        match self {
            Self::Staked(amount) => *amount,
            Self::NoFarm | Self::Failed => U256::ZERO,
        }
    }

    pub fn is_farming(&self) -> bool {
        !self.amount().is_zero()
    }

    pub fn from_call(call: &CallState<U256>) -> Self {
        match call.value() {
            Some(amount) => Self::Staked(*amount),
            None => Self::Failed,
        }
    }
}

/// A vault the account holds shares of.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VaultPosition {
    pub family: Family,
    pub address: Address,
    pub lp_balance: U256,
    pub stake: Stake,
    /// `lp_balance + stake`, always non-zero.
    pub share: U256,
    pub token0: Option<Token>,
    pub token1: Option<Token>,
    pub strategy_id: Option<u64>,
    /// The account's underlying token amounts, where the family exposes them.
    pub token_amounts: Option<(U256, U256)>,
}

impl VaultPosition {
    /// Returns a position if the account has a non-zero share of the vault.
    pub fn held(family: Family, address: Address, lp_balance: U256, stake: Stake) -> Option<Self> {
        let share = lp_balance.saturating_add(stake.amount());
        if share.is_zero() {
            return None;
        }
        Some(Self {
            family,
            address,
            lp_balance,
            stake,
            share,
            token0: None,
            token1: None,
            strategy_id: None,
            token_amounts: None,
        })
    }

    pub fn is_farming(&self) -> bool {
        self.stake.is_farming()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VaultPositions {
    pub loading: bool,
    pub positions: Vec<VaultPosition>,
}

impl VaultPositions {
    pub fn count(&self) -> VaultCount {
        VaultCount {
            loading: self.loading,
            count: self.positions.len(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VaultCount {
    pub loading: bool,
    pub count: usize,
}

/// Fetch stages of one aggregator instance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    FetchingRegistry,
    FetchingBalances,
    FetchingFarmDetails,
    Ready,
}

/// Tracks the fetch stage of one vault family and turns the outcome of a run
/// into the externally visible result.
///
/// Callers only see `loading` and a list, so a failed run and a run without
/// positions look the same from the outside. The failure is kept in
/// [`VaultAggregator::last_error`].
#[derive(Debug)]
pub struct VaultAggregator {
    family: Family,
    phase: Phase,
    last_error: Option<String>,
}

impl VaultAggregator {
    pub fn new(family: Family) -> Self {
        Self {
            family,
            phase: Phase::Idle,
            last_error: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn enter(&mut self, phase: Phase) {
        tracing::trace!(family = %self.family, ?phase, "vault aggregation");
        self.phase = phase;
    }

    pub fn finish(&mut self, result: anyhow::Result<VaultPositions>) -> VaultPositions {
        match result {
            Ok(positions) => {
                self.phase = Phase::Ready;
                self.last_error = None;
                metrics::positions(self.family.as_str(), positions.positions.len());
                positions
            }
            Err(err) => {
                tracing::warn!(family = %self.family, ?err, "vault aggregation failed");
                metrics::get()
                    .aggregation_failures
                    .with_label_values(&[self.family.as_str()])
                    .inc();
                self.phase = Phase::Idle;
                self.last_error = Some(format!("{err:#}"));
                VaultPositions::default()
            }
        }
    }
}

/// Reads from farm contracts that are grouped per chef: every item assigned
/// to a chef gets one query in that chef's batch, in item order.
///
/// `assignments[i]` is the chef of item `i`. Returns one stake per item.
pub fn stakes_from_chefs(
    family: Family,
    assignments: &[Option<usize>],
    staked: &[Vec<CallState<U256>>],
) -> Vec<Stake> {
    let mut cursors = vec![0_usize; staked.len()];
    assignments
        .iter()
        .map(|chef| {
            let Some(chef) = *chef else {
                return Stake::NoFarm;
            };
            let Some(calls) = staked.get(chef) else {
                return Stake::NoFarm;
            };
            let position = cursors[chef];
            cursors[chef] += 1;
            let stake = calls.get(position).map_or(Stake::Failed, Stake::from_call);
            if stake == Stake::Failed {
                degraded(family);
            }
            stake
        })
        .collect()
}

/// Builds one `userInfo` batch per chef out of the chef assignment and pool
/// id of every item.
pub fn chef_batches(
    assignments: &[Option<usize>],
    pids: &[U256],
    chefs: usize,
    user: Address,
) -> Vec<Vec<ChefQuery>> {
    let mut batches = vec![Vec::new(); chefs];
    for (chef, pid) in assignments.iter().zip(pids) {
        if let Some(batch) = chef.and_then(|chef| batches.get_mut(chef)) {
            batch.push(ChefQuery { pid: *pid, user });
        }
    }
    batches
}

/// Issues the batches built by [`chef_batches`], one per chef, and joins the
/// results in chef order.
pub async fn fetch_chef_stakes(
    reader: &dyn VaultReading,
    chefs: &[Address],
    batches: &[Vec<ChefQuery>],
) -> Vec<Vec<CallState<U256>>> {
    futures::future::join_all(
        chefs
            .iter()
            .zip(batches)
            .map(|(chef, queries)| reader.chef_stakes(*chef, queries)),
    )
    .await
}

/// Fails if every balance read of a non-empty batch failed. That is a
/// failure of the fetch stage rather than an account without positions.
pub fn ensure_reachable<T>(family: Family, calls: &[CallState<T>]) -> anyhow::Result<()> {
    ensure!(
        calls.is_empty() || !calls.iter().all(|call| call.error),
        "all {family} balance reads failed"
    );
    Ok(())
}

pub fn resolve(tokens: &TokenList, address: Option<Address>) -> Option<Token> {
    address.and_then(|address| tokens.get(&address).cloned())
}

/// Records a stake read that was counted as zero.
pub fn degraded(family: Family) {
    metrics::get()
        .degraded_stakes
        .with_label_values(&[family.as_str()])
        .inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_exposure_is_not_held() {
        assert_eq!(
            VaultPosition::held(Family::Gamma, Address::ZERO, U256::ZERO, Stake::NoFarm),
            None
        );
        assert_eq!(
            VaultPosition::held(
                Family::Gamma,
                Address::ZERO,
                U256::ZERO,
                Stake::Staked(U256::ZERO)
            ),
            None
        );
        assert_eq!(
            VaultPosition::held(Family::Gamma, Address::ZERO, U256::ZERO, Stake::Failed),
            None
        );
    }

    #[test]
    fn share_sums_wallet_and_stake() {
        let position = VaultPosition::held(
            Family::Gamma,
            Address::ZERO,
            U256::from(3),
            Stake::Staked(U256::from(4)),
        )
        .unwrap();
        assert_eq!(position.share, U256::from(7));
        assert!(position.is_farming());
    }

    #[test]
    fn chef_stakes_follow_item_order_per_chef() {
        let assignments = [Some(1), None, Some(0), Some(1)];
        let staked = vec![
            vec![CallState::loaded(U256::from(5))],
            vec![CallState::loaded(U256::from(7)), CallState::failed()],
        ];
        assert_eq!(
            stakes_from_chefs(Family::Gamma, &assignments, &staked),
            vec![
                Stake::Staked(U256::from(7)),
                Stake::NoFarm,
                Stake::Staked(U256::from(5)),
                Stake::Failed,
            ]
        );
    }

    #[test]
    fn builds_batches_per_chef() {
        let user = Address::repeat_byte(1);
        let batches = chef_batches(
            &[Some(0), Some(1), None, Some(0), Some(5)],
            &[U256::from(1), U256::from(2), U256::from(3), U256::from(4), U256::from(5)],
            2,
            user,
        );
        assert_eq!(
            batches,
            vec![
                vec![
                    ChefQuery {
                        pid: U256::from(1),
                        user
                    },
                    ChefQuery {
                        pid: U256::from(4),
                        user
                    },
                ],
                vec![ChefQuery {
                    pid: U256::from(2),
                    user
                }],
            ]
        );
    }

    #[test]
    fn unreachable_batches() {
        assert!(ensure_reachable::<U256>(Family::Gamma, &[]).is_ok());
        assert!(
            ensure_reachable(
                Family::Gamma,
                &[CallState::failed(), CallState::loaded(U256::ZERO)]
            )
            .is_ok()
        );
        assert!(
            ensure_reachable::<U256>(Family::Gamma, &[CallState::failed(), CallState::failed()])
                .is_err()
        );
    }

    #[test]
    fn failed_runs_report_empty_results_but_remember_the_error() {
        let mut aggregator = VaultAggregator::new(Family::Steer);
        aggregator.enter(Phase::FetchingBalances);
        let result = aggregator.finish(Err(anyhow::anyhow!("registry down")));

        assert_eq!(result, VaultPositions::default());
        assert_eq!(aggregator.phase(), Phase::Idle);
        assert_eq!(aggregator.last_error(), Some("registry down"));

        aggregator.finish(Ok(VaultPositions::default()));
        assert_eq!(aggregator.phase(), Phase::Ready);
        assert_eq!(aggregator.last_error(), None);
    }
}
