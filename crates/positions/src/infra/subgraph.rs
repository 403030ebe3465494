//! A client for querying the GraphQL subgraphs the registries live in.

use {
    anyhow::{Context, Result, bail},
    reqwest::{Client, IntoUrl, Url},
    serde::{Deserialize, Serialize, de::DeserializeOwned},
    serde_json::{Map, Value, json},
    std::{collections::BTreeMap, future::Future},
    thiserror::Error,
};

/// Upper bound of entities a single subgraph query returns.
pub const MAX_PAGE_SIZE: usize = 1000;

/// Entities that can be paged through by their subgraph id.
pub trait ContainsId {
    fn get_id(&self) -> String;
}

pub struct SubgraphClient {
    client: Client,
    subgraph_url: Url,
}

impl SubgraphClient {
    pub fn new(subgraph_url: impl IntoUrl, client: Client) -> Result<Self> {
        Ok(Self {
            client,
            subgraph_url: subgraph_url.into_url()?,
        })
    }

    pub fn url(&self) -> &Url {
        &self.subgraph_url
    }

    /// Performs the specified GraphQL query on the subgraph.
    pub async fn query<T>(&self, query: &str, variables: Option<Map<String, Value>>) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.client
            .post(self.subgraph_url.clone())
            .json(&Query { query, variables })
            .send()
            .await?
            .error_for_status()?
            .json::<QueryResponse<T>>()
            .await?
            .into_result()
    }

    /// Fetches every entity of a query that pages with `first: $pageSize`
    /// and `where: { id_gt: $lastId }`, ordered by id.
    pub async fn paginated_query<T>(
        &self,
        query: &str,
        variables: Map<String, Value>,
    ) -> Result<Vec<T>>
    where
        T: ContainsId + DeserializeOwned,
    {
        paginate(MAX_PAGE_SIZE, variables, |variables| {
            self.query::<Page<T>>(query, Some(variables))
        })
        .await
    }
}

/// The data of a paged query: a single entity list under the entity name.
type Page<T> = BTreeMap<String, Vec<T>>;

async fn paginate<T, F, Fut>(
    page_size: usize,
    mut variables: Map<String, Value>,
    mut fetch: F,
) -> Result<Vec<T>>
where
    T: ContainsId,
    F: FnMut(Map<String, Value>) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let mut entities = Vec::new();
    let mut last_id = String::new();
    variables.insert("pageSize".to_string(), json!(page_size));
    loop {
        variables.insert("lastId".to_string(), json!(last_id));
        let page = fetch(variables.clone())
            .await?
            .into_values()
            .next()
            .context("query returned no entity list")?;
        let complete = page.len() < page_size;
        if let Some(last) = page.last() {
            last_id = last.get_id();
        }
        entities.extend(page);
        if complete {
            return Ok(entities);
        }
    }
}

#[derive(Serialize)]
struct Query<'a> {
    query: &'a str,
    variables: Option<Map<String, Value>>,
}

/// A GraphQL query response.
///
/// Responses with both data and errors, or with neither, are invalid.
#[derive(Debug, Deserialize)]
struct QueryResponse<T> {
    #[serde(default = "empty_data")]
    data: Option<T>,
    #[serde(default)]
    errors: Option<Vec<QueryError>>,
}

impl<T> QueryResponse<T> {
    fn into_result(self) -> Result<T> {
        match self {
            Self {
                data: Some(data),
                errors: None,
            } => Ok(data),
            Self {
                errors: Some(errors),
                data: None,
            } if !errors.is_empty() => {
                for error in &errors[1..] {
                    tracing::warn!("additional GraphQL error: {}", error.message);
                }
                bail!("{}", errors[0])
            }
            _ => bail!("invalid GraphQL response"),
        }
    }
}

#[derive(Debug, Deserialize, Error)]
#[error("{}", .message)]
struct QueryError {
    message: String,
}

/// `#[serde(default)]` on an `Option<T>` would require `T: Default`.
fn empty_data<T>() -> Option<T> {
    None
}
