pub mod arguments;
pub mod count;
pub mod enumerate;
pub mod farming;
pub mod infra;
pub mod merge;
pub mod metrics;
pub mod normalize;
pub mod pipeline;
pub mod position;
pub mod read;
pub mod reader;
pub mod registry;
pub mod retention;
mod run;
pub mod tokens;
pub mod vaults;

pub use run::{run, start};
