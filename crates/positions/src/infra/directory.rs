//! Registries and farm deposits served by GraphQL subgraphs.

use {
    super::subgraph::{ContainsId, SubgraphClient},
    crate::{
        farming::{FarmDiscovery, FarmedPositions},
        registry::{ChainRegistry, Directory},
        vaults::{
            ichi::IchiVault,
            steer::{SteerFarm, SteerVault},
            unipilot::{Farm, RewardKind},
        },
    },
    alloy::primitives::{Address, U256},
    anyhow::{Context, Result},
    reqwest::Client,
    serde::Deserialize,
    serde_json::{Map, json},
    std::collections::HashMap,
    url::Url,
};

/// Subgraph clients of every configured chain. Registries without an
/// endpoint are empty.
pub struct SubgraphDirectory {
    unipilot: HashMap<u64, SubgraphClient>,
    steer: HashMap<u64, SubgraphClient>,
    ichi: HashMap<u64, SubgraphClient>,
}

impl SubgraphDirectory {
    pub fn new<'a>(
        chains: impl IntoIterator<Item = &'a ChainRegistry>,
        client: Client,
    ) -> Result<Self> {
        let mut directory = Self {
            unipilot: HashMap::new(),
            steer: HashMap::new(),
            ichi: HashMap::new(),
        };
        for chain in chains {
            let add = |clients: &mut HashMap<u64, SubgraphClient>,
                       url: &Option<Url>|
             -> Result<()> {
                if let Some(url) = url {
                    let subgraph = SubgraphClient::new(url.clone(), client.clone())?;
                    clients.insert(chain.chain_id, subgraph);
                }
                Ok(())
            };
            add(&mut directory.unipilot, &chain.unipilot_subgraph)?;
            add(&mut directory.steer, &chain.steer_subgraph)?;
            add(&mut directory.ichi, &chain.ichi_subgraph)?;
        }
        Ok(directory)
    }
}

const UNIPILOT_FARMS_QUERY: &str = r#"
    query Farms($pageSize: Int, $lastId: ID) {
        farms(first: $pageSize, orderBy: id, where: { id_gt: $lastId }) {
            id
            stakingAddress
            isDualReward
        }
    }
"#;

const STEER_VAULTS_QUERY: &str = r#"
    query Vaults($pageSize: Int, $lastId: ID) {
        vaults(first: $pageSize, orderBy: id, where: { id_gt: $lastId }) {
            id
            token0
            token1
        }
    }
"#;

const STEER_STAKES_QUERY: &str = r#"
    query Stakes($pageSize: Int, $lastId: ID, $account: String) {
        stakes(
            first: $pageSize
            orderBy: id
            where: { id_gt: $lastId, account: $account }
        ) {
            id
            stakingToken
            amount
        }
    }
"#;

const ICHI_VAULTS_QUERY: &str = r#"
    query Vaults($pageSize: Int, $lastId: ID) {
        ichiVaults(first: $pageSize, orderBy: id, where: { id_gt: $lastId }) {
            id
            tokenA
            tokenB
        }
    }
"#;

/// Subgraphs key entities by lower case hex addresses.
fn address_id(address: &Address) -> String {
    format!("{address:#x}")
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FarmData {
    id: Address,
    staking_address: Address,
    #[serde(default)]
    is_dual_reward: bool,
}

impl ContainsId for FarmData {
    fn get_id(&self) -> String {
        address_id(&self.id)
    }
}

#[derive(Debug, Deserialize)]
struct SteerVaultData {
    id: Address,
    token0: Option<Address>,
    token1: Option<Address>,
}

impl ContainsId for SteerVaultData {
    fn get_id(&self) -> String {
        address_id(&self.id)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StakeData {
    id: String,
    staking_token: Address,
    amount: U256,
}

impl ContainsId for StakeData {
    fn get_id(&self) -> String {
        self.id.clone()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IchiVaultData {
    id: Address,
    token_a: Address,
    token_b: Address,
}

impl ContainsId for IchiVaultData {
    fn get_id(&self) -> String {
        address_id(&self.id)
    }
}

#[async_trait::async_trait]
impl Directory for SubgraphDirectory {
    async fn unipilot_farms(&self, chain_id: u64) -> Result<Vec<Farm>> {
        let Some(client) = self.unipilot.get(&chain_id) else {
            return Ok(Vec::new());
        };
        let farms: Vec<FarmData> = client
            .paginated_query(UNIPILOT_FARMS_QUERY, Map::new())
            .await
            .context("unipilot farms")?;
        Ok(farms
            .into_iter()
            .map(|farm| Farm {
                id: farm.id,
                staking_address: farm.staking_address,
                reward: if farm.is_dual_reward {
                    RewardKind::Dual
                } else {
                    RewardKind::Single
                },
            })
            .collect())
    }

    async fn steer_vaults(&self, chain_id: u64) -> Result<Vec<SteerVault>> {
        let Some(client) = self.steer.get(&chain_id) else {
            return Ok(Vec::new());
        };
        let vaults: Vec<SteerVaultData> = client
            .paginated_query(STEER_VAULTS_QUERY, Map::new())
            .await
            .context("steer vaults")?;
        Ok(vaults
            .into_iter()
            .map(|vault| SteerVault {
                address: vault.id,
                token0: vault.token0,
                token1: vault.token1,
            })
            .collect())
    }

    async fn steer_farms(&self, chain_id: u64, account: Address) -> Result<Vec<SteerFarm>> {
        let Some(client) = self.steer.get(&chain_id) else {
            return Ok(Vec::new());
        };
        let mut variables = Map::new();
        variables.insert("account".to_string(), json!(address_id(&account)));
        let stakes: Vec<StakeData> = client
            .paginated_query(STEER_STAKES_QUERY, variables)
            .await
            .context("steer stakes")?;
        Ok(stakes
            .into_iter()
            .map(|stake| SteerFarm {
                staking_token: stake.staking_token,
                staked_amount: stake.amount,
            })
            .collect())
    }

    async fn ichi_vaults(&self, chain_id: u64) -> Result<Vec<IchiVault>> {
        let Some(client) = self.ichi.get(&chain_id) else {
            return Ok(Vec::new());
        };
        let vaults: Vec<IchiVaultData> = client
            .paginated_query(ICHI_VAULTS_QUERY, Map::new())
            .await
            .context("ichi vaults")?;
        Ok(vaults
            .into_iter()
            .map(|vault| IchiVault {
                address: vault.id,
                token_a: vault.token_a,
                token_b: vault.token_b,
            })
            .collect())
    }
}

const DEPOSITS_QUERY: &str = r#"
    query Deposits($pageSize: Int, $lastId: ID, $owner: String) {
        deposits(
            first: $pageSize
            orderBy: id
            where: { id_gt: $lastId, owner: $owner, onFarmingCenter: true }
        ) {
            id
        }
    }
"#;

/// A deposited position. The id is the token id as stored by the subgraph,
/// kept verbatim for paging.
#[derive(Debug, Deserialize)]
struct DepositData {
    id: String,
}

impl ContainsId for DepositData {
    fn get_id(&self) -> String {
        self.id.clone()
    }
}

impl DepositData {
    fn token_id(&self) -> Result<U256> {
        self.id
            .parse()
            .with_context(|| format!("invalid deposit id {:?}", self.id))
    }
}

/// Finds deposits through the subgraphs of the current and the legacy
/// farming center.
pub struct SubgraphFarmDiscovery {
    current: Option<SubgraphClient>,
    legacy: Option<SubgraphClient>,
}

impl SubgraphFarmDiscovery {
    pub fn new(chain: &ChainRegistry, client: Client) -> Result<Self> {
        let connect = |url: &Option<Url>| {
            url.as_ref()
                .map(|url| SubgraphClient::new(url.clone(), client.clone()))
                .transpose()
        };
        Ok(Self {
            current: connect(&chain.farming_subgraph)?,
            legacy: connect(&chain.old_farming_subgraph)?,
        })
    }

    async fn deposits(client: Option<&SubgraphClient>, account: Address) -> Result<Vec<U256>> {
        let Some(client) = client else {
            return Ok(Vec::new());
        };
        let mut variables = Map::new();
        variables.insert("owner".to_string(), json!(address_id(&account)));
        let deposits: Vec<DepositData> = client
            .paginated_query(DEPOSITS_QUERY, variables)
            .await
            .with_context(|| format!("deposits from {}", client.url()))?;
        deposits.iter().map(DepositData::token_id).collect()
    }
}

#[async_trait::async_trait]
impl FarmDiscovery for SubgraphFarmDiscovery {
    async fn positions_on_farmer(&self, account: Address) -> Result<FarmedPositions> {
        let (transferred, old_transferred) = futures::try_join!(
            Self::deposits(self.current.as_ref(), account),
            Self::deposits(self.legacy.as_ref(), account),
        )?;
        Ok(FarmedPositions {
            transferred,
            old_transferred,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_registry_entities() {
        let farm: FarmData = serde_json::from_value(json!({
            "id": "0x00000000000000000000000000000000000000AB",
            "stakingAddress": "0x0000000000000000000000000000000000000002",
            "isDualReward": true,
        }))
        .unwrap();
        assert_eq!(farm.staking_address, Address::with_last_byte(2));
        assert!(farm.is_dual_reward);
        assert_eq!(farm.get_id(), "0x00000000000000000000000000000000000000ab");

        let deposits: Vec<DepositData> =
            serde_json::from_value(json!([{ "id": "42" }, { "id": "0x2b" }])).unwrap();
        assert_eq!(deposits[1].get_id(), "0x2b");
        assert_eq!(
            deposits
                .iter()
                .map(|deposit| deposit.token_id().unwrap())
                .collect::<Vec<_>>(),
            vec![U256::from(42), U256::from(43)]
        );
        assert!(DepositData { id: "pool".to_string() }.token_id().is_err());
    }

    #[tokio::test]
    async fn chains_without_endpoints_are_empty() {
        let directory = SubgraphDirectory::new(std::iter::empty(), Client::new()).unwrap();
        assert!(directory.unipilot_farms(137).await.unwrap().is_empty());
        assert!(directory.steer_vaults(137).await.unwrap().is_empty());
        assert!(directory.ichi_vaults(137).await.unwrap().is_empty());

        let discovery =
            SubgraphFarmDiscovery::new(&ChainRegistry::default(), Client::new()).unwrap();
        assert_eq!(
            discovery.positions_on_farmer(Address::ZERO).await.unwrap(),
            FarmedPositions::default()
        );
    }
}
