use alloy::primitives::{Address, U256};

/// The position-manager contract a token id belongs to. Token ids are only
/// unique within one namespace: the same number can exist in both.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Namespace {
    #[default]
    Primary,
    /// The Uniswap V3 position manager.
    Alternate,
}

impl Namespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Alternate => "alternate",
        }
    }
}

/// Who holds the position NFT.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Custody {
    #[default]
    Wallet,
    /// Deposited in the current farming center.
    Farming,
    /// Deposited in the legacy farming center.
    OldFarming,
}

/// Identity of a position across namespaces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PositionKey {
    pub namespace: Namespace,
    pub token_id: U256,
}

/// Decoded return value of `positions(uint256)`, in ABI field order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawPosition {
    pub nonce: u128,
    pub operator: Address,
    pub token0: Address,
    pub token1: Address,
    pub fee: u32,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub liquidity: u128,
    pub fee_growth_inside0_last_x128: U256,
    pub fee_growth_inside1_last_x128: U256,
    pub tokens_owed0: u128,
    pub tokens_owed1: u128,
}

/// One concentrated liquidity position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PositionRecord {
    pub token_id: U256,
    pub nonce: u128,
    pub operator: Address,
    /// `token0 < token1` is enforced by the position manager.
    pub token0: Address,
    pub token1: Address,
    pub fee: u32,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub liquidity: u128,
    pub fee_growth_inside0_last_x128: U256,
    pub fee_growth_inside1_last_x128: U256,
    pub tokens_owed0: u128,
    pub tokens_owed1: u128,
    pub namespace: Namespace,
    pub custody: Custody,
}

impl PositionRecord {
    pub fn new(token_id: U256, raw: RawPosition, namespace: Namespace) -> Self {
        Self {
            token_id,
            nonce: raw.nonce,
            operator: raw.operator,
            token0: raw.token0,
            token1: raw.token1,
            fee: raw.fee,
            tick_lower: raw.tick_lower,
            tick_upper: raw.tick_upper,
            liquidity: raw.liquidity,
            fee_growth_inside0_last_x128: raw.fee_growth_inside0_last_x128,
            fee_growth_inside1_last_x128: raw.fee_growth_inside1_last_x128,
            tokens_owed0: raw.tokens_owed0,
            tokens_owed1: raw.tokens_owed1,
            namespace,
            custody: Custody::Wallet,
        }
    }

    pub fn key(&self) -> PositionKey {
        PositionKey {
            namespace: self.namespace,
            token_id: self.token_id,
        }
    }

    /// Closed positions have no liquidity left but the NFT still exists.
    pub fn is_closed(&self) -> bool {
        self.liquidity == 0
    }

    /// The `isUni` flag of the dashboard.
    pub fn is_alternate(&self) -> bool {
        self.namespace == Namespace::Alternate
    }

    pub fn on_farming(&self) -> bool {
        self.custody == Custody::Farming
    }

    pub fn old_farming(&self) -> bool {
        self.custody == Custody::OldFarming
    }
}
