//! Bindings for every contract the position aggregator reads from.
//!
//! The interfaces only declare the view functions that are actually called,
//! in the field order of the deployed ABIs.

pub use ::alloy::providers::DynProvider as Provider;

pub mod networks {
    pub const MAINNET: u64 = 1;
    pub const POLYGON: u64 = 137;
    pub const ARBITRUM_ONE: u64 = 42161;
    pub const OPTIMISM: u64 = 10;
}

#[macro_export]
macro_rules! bindings {
    ($contract:ident { $($body:tt)* } $(, $deployment_info:expr)?) => {
        paste::paste! {
            // Generate the main bindings in a private module. That allows
            // us to re-export all items in our own module while also adding
            // some items ourselves.
            #[allow(non_snake_case)]
            mod [<$contract Private>] {
                ::alloy::sol! {
                    #[allow(missing_docs)]
                    #[sol(rpc)]
                    interface $contract {
                        $($body)*
                    }
                }
            }

            #[allow(non_snake_case)]
            pub mod $contract {
                use ::alloy::providers::DynProvider;

                pub use super::[<$contract Private>]::*;
                pub type Instance = $contract::[<$contract Instance>]<DynProvider>;

                $(
                use {
                    std::{sync::LazyLock, collections::HashMap},
                    ::alloy::primitives::{address, Address},
                    $crate::networks::*,
                };

                pub static DEPLOYMENT_INFO: LazyLock<HashMap<u64, Address>> = LazyLock::new(|| {
                    $deployment_info
                });

                /// Address of the deployment on the given chain, if any.
                pub fn deployment(chain_id: u64) -> Option<Address> {
                    DEPLOYMENT_INFO.get(&chain_id).copied()
                }
                )*
            }
        }
    };
}

// Position manager of the native concentrated liquidity protocol. The
// deployments are the defaults, the chain registry can override them.
bindings!(
    NonfungiblePositionManager {
        function balanceOf(address owner) external view returns (uint256 balance);
        function tokenOfOwnerByIndex(address owner, uint256 index) external view returns (uint256 tokenId);
        function positions(uint256 tokenId) external view returns (
            uint96 nonce,
            address operator,
            address token0,
            address token1,
            uint24 fee,
            int24 tickLower,
            int24 tickUpper,
            uint128 liquidity,
            uint256 feeGrowthInside0LastX128,
            uint256 feeGrowthInside1LastX128,
            uint128 tokensOwed0,
            uint128 tokensOwed1
        );
    },
    maplit::hashmap! {
        POLYGON => address!("0x8eF88E4c7CfbbaC1C163f7eddd4B578792201de6"),
    }
);

// The Uniswap V3 position manager shares the ABI, but its token ids live in a
// separate namespace.
bindings!(
    UniswapV3PositionManager {
        function balanceOf(address owner) external view returns (uint256 balance);
        function tokenOfOwnerByIndex(address owner, uint256 index) external view returns (uint256 tokenId);
        function positions(uint256 tokenId) external view returns (
            uint96 nonce,
            address operator,
            address token0,
            address token1,
            uint24 fee,
            int24 tickLower,
            int24 tickUpper,
            uint128 liquidity,
            uint256 feeGrowthInside0LastX128,
            uint256 feeGrowthInside1LastX128,
            uint128 tokensOwed0,
            uint128 tokensOwed1
        );
    },
    maplit::hashmap! {
        MAINNET => address!("0xC36442b4a4522E871399CD717aBDD847Ab11FE88"),
        POLYGON => address!("0xC36442b4a4522E871399CD717aBDD847Ab11FE88"),
        ARBITRUM_ONE => address!("0xC36442b4a4522E871399CD717aBDD847Ab11FE88"),
        OPTIMISM => address!("0xC36442b4a4522E871399CD717aBDD847Ab11FE88"),
    }
);

bindings!(ERC20 {
    function balanceOf(address account) external view returns (uint256 balance);
    function symbol() external view returns (string symbol);
});

bindings!(UnipilotVault {
    function getVaultInfo() external view returns (address token0, address token1, uint24 fee, address pool);
});

bindings!(UnipilotSingleReward {
    function balanceOf(address account) external view returns (uint256 balance);
});

bindings!(UnipilotDualReward {
    function balanceOf(address account) external view returns (uint256 balance);
});

// Used by both Gamma MasterChefs and DefiEdge MiniChefs. Only the staked
// amount is read, so the signedness of `rewardDebt` does not matter.
bindings!(MasterChef {
    function userInfo(uint256 pid, address user) external view returns (uint256 amount, int256 rewardDebt);
});

bindings!(IchiVault {
    function totalSupply() external view returns (uint256 supply);
    function getTotalAmounts() external view returns (uint256 total0, uint256 total1);
});
