mod config;

pub use config::{Config, EconomyConfig, MatchConfig, NetworkConfig, StorageConfig};
