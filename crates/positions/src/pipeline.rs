//! Composes the aggregation stages for one chain.
//!
//! The pipeline performs the reads through the reader traits and feeds the
//! results through the pure stages: enumerate, normalize, retain and merge.
//! Retention state lives in the pipeline, so one instance serves one
//! dashboard session.

use {
    crate::{
        count::{self, CountInputs, PositionCount},
        enumerate,
        farming::{FarmDiscovery, FarmedPositions},
        merge,
        metrics,
        normalize::{self, Normalized},
        position::{Namespace, PositionRecord},
        read::any_loading,
        reader::{PositionManagerReading, VaultReading},
        registry::{ChainRegistry, Directory},
        retention::{CountRetention, Retention},
        tokens::TokenList,
        vaults::{
            Family,
            Phase,
            VaultAggregator,
            VaultCount,
            VaultPositions,
            defiedge,
            gamma,
            ichi,
            steer,
            unipilot,
        },
    },
    alloy::primitives::{Address, U256},
    std::{collections::HashMap, sync::Arc},
};

/// Everything the pipeline reads from.
#[derive(Clone)]
pub struct Sources {
    pub chain: ChainRegistry,
    pub managers: Arc<dyn PositionManagerReading>,
    pub vaults: Arc<dyn VaultReading>,
    pub directory: Arc<dyn Directory>,
    pub farms: Arc<dyn FarmDiscovery>,
    pub tokens: Arc<TokenList>,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ViewOptions {
    pub hide_closed: bool,
    pub hide_farming: bool,
}

/// The result of one full aggregation run.
#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    /// Wallet, farmed and previously farmed positions of the native manager.
    pub positions: Normalized,
    pub alternate: Normalized,
    pub count: PositionCount,
    pub vaults: Vec<(Family, VaultPositions)>,
}

#[derive(Debug, Default)]
struct TokenIds {
    loading: bool,
    ids: Vec<U256>,
}

/// The native groups before merging.
struct NativeGroups {
    loading: bool,
    native: Normalized,
    farmed: Normalized,
    old_farmed: Normalized,
    farmed_ids: FarmedPositions,
}

pub struct Pipeline {
    sources: Sources,
    native: Retention,
    farmed: Retention,
    old_farmed: Retention,
    alternate: Retention,
    count: CountRetention,
    aggregators: HashMap<Family, VaultAggregator>,
}

pub const FAMILIES: [Family; 5] = [
    Family::Unipilot,
    Family::Gamma,
    Family::DefiEdge,
    Family::Steer,
    Family::Ichi,
];

impl Pipeline {
    pub fn new(sources: Sources) -> Self {
        Self {
            sources,
            native: Default::default(),
            farmed: Default::default(),
            old_farmed: Default::default(),
            alternate: Default::default(),
            count: Default::default(),
            aggregators: FAMILIES
                .into_iter()
                .map(|family| (family, VaultAggregator::new(family)))
                .collect(),
        }
    }

    pub fn aggregator(&self, family: Family) -> Option<&VaultAggregator> {
        self.aggregators.get(&family)
    }

    /// Wallet positions of the native manager followed by the ones deposited
    /// in the current and the legacy farming center.
    pub async fn positions(&mut self, account: Option<Address>) -> Normalized {
        let groups = self.native_groups(account).await;
        Self::merge_native(groups)
    }

    /// Positions of the alternate manager.
    pub async fn alternate_positions(&mut self, account: Option<Address>) -> Normalized {
        let manager = self.sources.chain.alternate_position_manager();
        let ids = self.token_ids(manager, account).await;
        let current = self
            .positions_from_token_ids(manager, Namespace::Alternate, &ids.ids)
            .await;
        let retained = self.alternate.apply(account, Some(ids.ids.as_slice()), current);
        let mut merged = merge::merge_alternate(retained);
        merged.loading |= ids.loading;
        merged
    }

    pub async fn position_count(
        &mut self,
        account: Option<Address>,
        options: ViewOptions,
    ) -> PositionCount {
        self.snapshot(account, options, &[]).await.count
    }

    /// Looks up a single position. `None` while loading, for unknown ids and
    /// on chains without the manager.
    pub async fn position_from_token_id(
        &self,
        token_id: Option<U256>,
        namespace: Namespace,
    ) -> (bool, Option<PositionRecord>) {
        let manager = match namespace {
            Namespace::Primary => self.sources.chain.position_manager(),
            Namespace::Alternate => self.sources.chain.alternate_position_manager(),
        };
        let (Some(manager), Some(token_id)) = (manager, token_id) else {
            return (false, None);
        };
        let results = self.sources.managers.positions(manager, &[token_id]).await;
        normalize::normalize_one(Some(token_id), results.first(), namespace)
    }

    /// Runs every aggregation for `account` and the given vault families.
    pub async fn snapshot(
        &mut self,
        account: Option<Address>,
        options: ViewOptions,
        families: &[Family],
    ) -> Snapshot {
        let groups = self.native_groups(account).await;
        let alternate = self.alternate_positions(account).await;

        let inputs = CountInputs {
            loading: groups.loading || alternate.loading,
            primary: groups.native.positions.as_deref(),
            alternate: alternate.positions.as_deref(),
            farmed: groups.farmed_ids.transferred.len(),
            old_farmed: groups.farmed_ids.old_transferred.len(),
            hide_closed: options.hide_closed,
            hide_farming: options.hide_farming,
        };
        let count = count::position_count(inputs, &mut self.count);
        let positions = Self::merge_native(groups);

        metrics::positions(Namespace::Primary.as_str(), positions.len());
        metrics::positions(Namespace::Alternate.as_str(), alternate.len());

        let mut vaults = Vec::with_capacity(families.len());
        for family in families {
            vaults.push((*family, self.vaults(*family, account).await));
        }

        tracing::debug!(
            ?account,
            positions = positions.len(),
            alternate = alternate.len(),
            count = count.count,
            loading = count.loading,
            "aggregated positions"
        );
        Snapshot {
            positions,
            alternate,
            count,
            vaults,
        }
    }

    /// Vault positions of one family. Failures are reported as an empty,
    /// not loading result; the aggregator keeps the error.
    pub async fn vaults(&mut self, family: Family, account: Option<Address>) -> VaultPositions {
        let Some(account) = account else {
            return VaultPositions::default();
        };
        let aggregator = self
            .aggregators
            .entry(family)
            .or_insert_with(|| VaultAggregator::new(family));
        let result = fetch_family(&self.sources, family, account, aggregator).await;
        aggregator.finish(result)
    }

    pub async fn vault_count(&mut self, family: Family, account: Option<Address>) -> VaultCount {
        self.vaults(family, account).await.count()
    }

    async fn native_groups(&mut self, account: Option<Address>) -> NativeGroups {
        let manager = self.sources.chain.position_manager();
        let (ids, farmed_ids) =
            futures::join!(self.token_ids(manager, account), self.farmed_ids(account));

        let (native, farmed, old_farmed) = futures::join!(
            self.positions_from_token_ids(manager, Namespace::Primary, &ids.ids),
            self.positions_from_token_ids(manager, Namespace::Primary, &farmed_ids.transferred),
            self.positions_from_token_ids(manager, Namespace::Primary, &farmed_ids.old_transferred),
        );

        NativeGroups {
            loading: ids.loading,
            native: self.native.apply(account, Some(ids.ids.as_slice()), native),
            farmed: self
                .farmed
                .apply(account, Some(farmed_ids.transferred.as_slice()), farmed),
            old_farmed: self
                .old_farmed
                .apply(account, Some(farmed_ids.old_transferred.as_slice()), old_farmed),
            farmed_ids,
        }
    }

    fn merge_native(groups: NativeGroups) -> Normalized {
        let mut merged = merge::merge(groups.native, groups.farmed, groups.old_farmed);
        merged.loading |= groups.loading;
        merged
    }

    async fn token_ids(&self, manager: Option<Address>, account: Option<Address>) -> TokenIds {
        let (Some(manager), Some(owner)) = (manager, account) else {
            return TokenIds::default();
        };
        let balance = self.sources.managers.balance_of(manager, owner).await;
        let queries = enumerate::index_queries(Some(owner), balance.value().copied());
        let results = if queries.is_empty() {
            Vec::new()
        } else {
            self.sources
                .managers
                .token_of_owner_by_index(manager, &queries)
                .await
        };
        TokenIds {
            loading: balance.loading || any_loading(&results),
            ids: enumerate::token_ids(Some(owner), &results),
        }
    }

    /// Without farm data the farmed groups are empty.
    async fn farmed_ids(&self, account: Option<Address>) -> FarmedPositions {
        let Some(account) = account else {
            return FarmedPositions::default();
        };
        match self.sources.farms.positions_on_farmer(account).await {
            Ok(positions) => positions,
            Err(err) => {
                tracing::warn!(?account, ?err, "failed to discover farmed positions");
                metrics::get()
                    .aggregation_failures
                    .with_label_values(&["farming"])
                    .inc();
                FarmedPositions::default()
            }
        }
    }

    async fn positions_from_token_ids(
        &self,
        manager: Option<Address>,
        namespace: Namespace,
        token_ids: &[U256],
    ) -> Normalized {
        let Some(manager) = manager else {
            return Normalized::loaded(Vec::new());
        };
        let results = if token_ids.is_empty() {
            Vec::new()
        } else {
            self.sources.managers.positions(manager, token_ids).await
        };
        normalize::normalize(Some(token_ids), &results, namespace)
    }
}

async fn fetch_family(
    sources: &Sources,
    family: Family,
    account: Address,
    aggregator: &mut VaultAggregator,
) -> anyhow::Result<VaultPositions> {
    let chain = &sources.chain;
    let reader = sources.vaults.as_ref();
    let tokens = sources.tokens.as_ref();
    aggregator.enter(Phase::FetchingRegistry);
    match family {
        Family::Unipilot => {
            let farms = sources.directory.unipilot_farms(chain.chain_id).await?;
            unipilot::fetch(
                reader,
                &chain.unipilot_vaults,
                &farms,
                account,
                tokens,
                aggregator,
            )
            .await
        }
        Family::Gamma => {
            gamma::fetch(
                reader,
                &chain.gamma_pairs,
                &chain.gamma_master_chefs,
                account,
                tokens,
                aggregator,
            )
            .await
        }
        Family::DefiEdge => {
            defiedge::fetch(reader, &chain.defiedge_strategies, account, tokens, aggregator).await
        }
        Family::Steer => {
            let (vaults, farms) = futures::try_join!(
                sources.directory.steer_vaults(chain.chain_id),
                sources.directory.steer_farms(chain.chain_id, account),
            )?;
            steer::fetch(reader, &vaults, &farms, account, tokens, aggregator).await
        }
        Family::Ichi => {
            let vaults = sources.directory.ichi_vaults(chain.chain_id).await?;
            ichi::fetch(reader, &vaults, account, tokens, aggregator).await
        }
    }
}
