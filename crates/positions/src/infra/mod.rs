pub mod directory;
pub mod onchain;
pub mod subgraph;

pub use {
    directory::{SubgraphDirectory, SubgraphFarmDiscovery},
    onchain::Onchain,
};
