//! Chain scoped registries of the vaults and farms the aggregators look at.
//!
//! Static entries (Unipilot vaults, Gamma pairs and chefs, DefiEdge
//! strategies, endpoints) are loaded once from a TOML file. Entries that
//! change over time come from a [`Directory`] and are cached through
//! [`Polled`] so they refresh independently of the balance polls.

use {
    crate::{
        metrics,
        vaults::{
            defiedge::Strategy,
            gamma::GammaPair,
            ichi::IchiVault,
            steer::{SteerFarm, SteerVault},
            unipilot,
        },
    },
    alloy::primitives::Address,
    anyhow::Result,
    moka::sync::Cache,
    serde::Deserialize,
    std::{collections::HashMap, hash::Hash, path::Path, sync::Arc, time::Duration},
    thiserror::Error,
    url::Url,
};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("I/O error while reading {path:?}: {source}")]
    Io {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error("invalid registry file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("chain {0} is listed more than once")]
    DuplicateChain(u64),
}

/// Registry entries of one chain.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ChainRegistry {
    pub chain_id: u64,

    /// Overrides the known deployment of the native position manager.
    #[serde(default)]
    pub position_manager: Option<Address>,

    /// Overrides the known deployment of the alternate position manager.
    #[serde(default)]
    pub alternate_position_manager: Option<Address>,

    /// Deposits in the current farming center.
    #[serde(default)]
    pub farming_subgraph: Option<Url>,

    /// Deposits in the legacy farming center.
    #[serde(default)]
    pub old_farming_subgraph: Option<Url>,

    #[serde(default)]
    pub unipilot_subgraph: Option<Url>,

    #[serde(default)]
    pub steer_subgraph: Option<Url>,

    #[serde(default)]
    pub ichi_subgraph: Option<Url>,

    #[serde(default)]
    pub unipilot_vaults: Vec<Address>,

    #[serde(default)]
    pub gamma_master_chefs: Vec<Address>,

    #[serde(default)]
    pub gamma_pairs: Vec<GammaPair>,

    #[serde(default)]
    pub defiedge_strategies: Vec<Strategy>,
}

impl ChainRegistry {
    pub fn position_manager(&self) -> Option<Address> {
        self.position_manager
            .or_else(|| contracts::NonfungiblePositionManager::deployment(self.chain_id))
    }

    pub fn alternate_position_manager(&self) -> Option<Address> {
        self.alternate_position_manager
            .or_else(|| contracts::UniswapV3PositionManager::deployment(self.chain_id))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct File {
    #[serde(default, rename = "chain")]
    chains: Vec<ChainRegistry>,
}

#[derive(Clone, Debug, Default)]
pub struct Registry {
    chains: HashMap<u64, ChainRegistry>,
}

impl Registry {
    pub async fn load(path: &Path) -> Result<Self, LoadError> {
        let data = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| LoadError::Io {
                path: path.to_owned(),
                source,
            })?;
        Self::from_toml(&data)
    }

    pub fn from_toml(data: &str) -> Result<Self, LoadError> {
        let file: File = toml::de::from_str(data)?;
        let mut chains = HashMap::new();
        for chain in file.chains {
            let id = chain.chain_id;
            if chains.insert(id, chain).is_some() {
                return Err(LoadError::DuplicateChain(id));
            }
        }
        Ok(Self { chains })
    }

    /// Chains without an entry have empty registries.
    pub fn chain(&self, chain_id: u64) -> ChainRegistry {
        self.chains.get(&chain_id).cloned().unwrap_or(ChainRegistry {
            chain_id,
            ..Default::default()
        })
    }
}

/// Off-chain registries.
#[cfg_attr(any(test, feature = "test-util"), mockall::automock)]
#[async_trait::async_trait]
pub trait Directory: Send + Sync {
    async fn unipilot_farms(&self, chain_id: u64) -> Result<Vec<unipilot::Farm>>;

    async fn steer_vaults(&self, chain_id: u64) -> Result<Vec<SteerVault>>;

    /// The staking pools `account` has deposited Steer vault shares in.
    async fn steer_farms(&self, chain_id: u64, account: Address) -> Result<Vec<SteerFarm>>;

    async fn ichi_vaults(&self, chain_id: u64) -> Result<Vec<IchiVault>>;
}

/// Results of a registry lookup, kept until the refresh interval elapsed.
///
/// Failed lookups are not cached so the next call retries.
pub struct Polled<K, V> {
    name: &'static str,
    cache: Cache<K, V>,
}

impl<K, V> Polled<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(name: &'static str, refresh_interval: Duration) -> Self {
        Self {
            name,
            cache: Cache::builder()
                .max_capacity(1_000)
                .time_to_live(refresh_interval)
                .build(),
        }
    }

    pub async fn get_or_fetch(
        &self,
        key: K,
        fetch: impl Future<Output = Result<V>>,
    ) -> Result<V> {
        if let Some(value) = self.cache.get(&key) {
            return Ok(value);
        }
        let result = fetch.await;
        let label = if result.is_ok() { "success" } else { "failure" };
        metrics::get()
            .registry_fetches
            .with_label_values(&[self.name, label])
            .inc();
        match result {
            Ok(value) => {
                self.cache.insert(key, value.clone());
                Ok(value)
            }
            Err(err) => {
                tracing::warn!(registry = self.name, ?err, "registry fetch failed");
                Err(err)
            }
        }
    }
}

/// A [`Directory`] serving every lookup from a [`Polled`] cache.
pub struct PolledDirectory {
    inner: Arc<dyn Directory>,
    unipilot_farms: Polled<u64, Vec<unipilot::Farm>>,
    steer_vaults: Polled<u64, Vec<SteerVault>>,
    steer_farms: Polled<(u64, Address), Vec<SteerFarm>>,
    ichi_vaults: Polled<u64, Vec<IchiVault>>,
}

impl PolledDirectory {
    pub fn new(inner: Arc<dyn Directory>, refresh_interval: Duration) -> Self {
        Self {
            inner,
            unipilot_farms: Polled::new("unipilot_farms", refresh_interval),
            steer_vaults: Polled::new("steer_vaults", refresh_interval),
            steer_farms: Polled::new("steer_farms", refresh_interval),
            ichi_vaults: Polled::new("ichi_vaults", refresh_interval),
        }
    }
}

#[async_trait::async_trait]
impl Directory for PolledDirectory {
    async fn unipilot_farms(&self, chain_id: u64) -> Result<Vec<unipilot::Farm>> {
        self.unipilot_farms
            .get_or_fetch(chain_id, self.inner.unipilot_farms(chain_id))
            .await
    }

    async fn steer_vaults(&self, chain_id: u64) -> Result<Vec<SteerVault>> {
        self.steer_vaults
            .get_or_fetch(chain_id, self.inner.steer_vaults(chain_id))
            .await
    }

    async fn steer_farms(&self, chain_id: u64, account: Address) -> Result<Vec<SteerFarm>> {
        self.steer_farms
            .get_or_fetch((chain_id, account), self.inner.steer_farms(chain_id, account))
            .await
    }

    async fn ichi_vaults(&self, chain_id: u64) -> Result<Vec<IchiVault>> {
        self.ichi_vaults
            .get_or_fetch(chain_id, self.inner.ichi_vaults(chain_id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        alloy::primitives::address,
        mockall::predicate::eq,
    };

    const REGISTRY: &str = r#"
        [[chain]]
        chain-id = 137
        farming-subgraph = "https://api.example.org/subgraphs/farming"
        unipilot-vaults = ["0x0000000000000000000000000000000000000001"]
        gamma-master-chefs = [
            "0x0000000000000000000000000000000000000002",
            "0x0000000000000000000000000000000000000003",
        ]

        [[chain.gamma-pairs]]
        address = "0x0000000000000000000000000000000000000004"
        pid = 3
        master-chef-index = 1

        [[chain.gamma-pairs]]
        address = "0x0000000000000000000000000000000000000005"
        pid = 0

        [[chain.defiedge-strategies]]
        id = "0x0000000000000000000000000000000000000006"
        mini-chef-address = "0x0000000000000000000000000000000000000007"
        pid = 1

        [[chain.defiedge-strategies]]
        id = "0x0000000000000000000000000000000000000008"

        [[chain]]
        chain-id = 1
        position-manager = "0x0000000000000000000000000000000000000009"
    "#;

    #[test]
    fn loads_chain_registries() {
        let registry = Registry::from_toml(REGISTRY).unwrap();

        let polygon = registry.chain(137);
        assert_eq!(polygon.unipilot_vaults.len(), 1);
        assert_eq!(polygon.gamma_master_chefs.len(), 2);
        assert_eq!(polygon.gamma_pairs[0].master_chef_index, 1);
        assert_eq!(polygon.gamma_pairs[1].master_chef_index, 0);
        assert_eq!(polygon.defiedge_strategies[1].mini_chef_address, None);
        assert_eq!(
            polygon.position_manager(),
            Some(address!("0x8eF88E4c7CfbbaC1C163f7eddd4B578792201de6"))
        );

        let mainnet = registry.chain(1);
        assert_eq!(
            mainnet.position_manager(),
            Some(address!("0x0000000000000000000000000000000000000009"))
        );
        assert_eq!(
            mainnet.alternate_position_manager(),
            Some(address!("0xC36442b4a4522E871399CD717aBDD847Ab11FE88"))
        );

        let unknown = registry.chain(5);
        assert_eq!(unknown.chain_id, 5);
        assert!(unknown.gamma_pairs.is_empty());
        assert_eq!(unknown.position_manager(), None);
    }

    #[test]
    fn rejects_duplicate_chains() {
        let result = Registry::from_toml("[[chain]]\nchain-id = 1\n[[chain]]\nchain-id = 1\n");
        assert!(matches!(result, Err(LoadError::DuplicateChain(1))));
    }

    #[test]
    fn rejects_unknown_fields() {
        let result = Registry::from_toml("[[chain]]\nchain-id = 1\nvaults = []\n");
        assert!(matches!(result, Err(LoadError::Toml(_))));
    }

    #[tokio::test]
    async fn caches_successful_lookups_only() {
        let mut inner = MockDirectory::new();
        let mut calls = mockall::Sequence::new();
        inner
            .expect_ichi_vaults()
            .with(eq(137))
            .times(1)
            .in_sequence(&mut calls)
            .returning(|_| Err(anyhow::anyhow!("subgraph unavailable")));
        inner
            .expect_ichi_vaults()
            .with(eq(137))
            .times(1)
            .in_sequence(&mut calls)
            .returning(|_| {
                Ok(vec![IchiVault {
                    address: Address::repeat_byte(1),
                    token_a: Address::repeat_byte(2),
                    token_b: Address::repeat_byte(3),
                }])
            });

        let directory = PolledDirectory::new(Arc::new(inner), Duration::from_secs(60));
        assert!(directory.ichi_vaults(137).await.is_err());
        assert_eq!(directory.ichi_vaults(137).await.unwrap().len(), 1);
        // Served from the cache, the mock would panic on a third call.
        assert_eq!(directory.ichi_vaults(137).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn steer_farms_are_cached_per_account() {
        let mut inner = MockDirectory::new();
        inner
            .expect_steer_farms()
            .times(2)
            .returning(|_, account| {
                Ok(vec![SteerFarm {
                    staking_token: account,
                    staked_amount: Default::default(),
                }])
            });

        let directory = PolledDirectory::new(Arc::new(inner), Duration::from_secs(60));
        let first = Address::repeat_byte(1);
        let second = Address::repeat_byte(2);
        for _ in 0..2 {
            assert_eq!(directory.steer_farms(137, first).await.unwrap()[0].staking_token, first);
            assert_eq!(directory.steer_farms(137, second).await.unwrap()[0].staking_token, second);
        }
    }
}
