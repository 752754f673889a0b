// node/src/lib.rs
pub mod config;
pub mod genesis;
pub mod runtime;

pub use config::NodeConfig;
pub use genesis::{GenesisAccount, NodeGenesis};
pub use runtime::{Node, PoolSnapshot, PoolSnapshotHook};
