//! The selected token list used to resolve token metadata.

use {
    alloy::primitives::Address,
    anyhow::Result,
    reqwest::{Client, IntoUrl},
    serde::Deserialize,
    std::collections::HashMap,
};

#[derive(Clone, Debug, Default)]
pub struct TokenList {
    tokens: HashMap<Address, Token>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub address: Address,
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
}

impl TokenList {
    pub async fn from_url(url: impl IntoUrl, chain_id: u64, client: Client) -> Result<Self> {
        let model: TokenListModel = client.get(url).send().await?.json().await?;
        Ok(Self::from_tokens(model.tokens, chain_id))
    }

    fn from_tokens(tokens: Vec<TokenModel>, chain_id: u64) -> Self {
        Self {
            tokens: tokens
                .into_iter()
                .filter(|token| token.chain_id == chain_id)
                .map(|token| (token.token.address, token.token))
                .collect(),
        }
    }

    pub fn new(tokens: HashMap<Address, Token>) -> Self {
        Self { tokens }
    }

    /// Addresses are compared as bytes so checksum casing never matters.
    pub fn get(&self, address: &Address) -> Option<&Token> {
        self.tokens.get(address)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Relevant parts of TokenList schema as defined in https://uniswap.org/tokenlist.schema.json
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct TokenListModel {
    name: String,
    tokens: Vec<TokenModel>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct TokenModel {
    chain_id: u64,
    #[serde(flatten)]
    token: Token,
}
