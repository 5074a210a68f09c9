//! Process configuration.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::path::Path;

fn default_max_players() -> u32 {
    8
}
fn default_min_players() -> u32 {
    2
}
fn default_countdown_secs() -> u64 {
    5
}
fn default_max_match_secs() -> u64 {
    300
}
fn default_house_fee() -> Decimal {
    dec!(0.0)
}
fn default_tick_hz() -> u32 {
    60
}
fn default_commission_l1() -> Decimal {
    dec!(0.05)
}
fn default_commission_l2() -> Decimal {
    dec!(0.03)
}
fn default_commission_l3() -> Decimal {
    dec!(0.01)
}
fn default_reconnect_grace_secs() -> u64 {
    15
}
fn default_kick_warnings() -> u32 {
    5
}
fn default_invite_code_len() -> usize {
    6
}
fn default_idle_timeout_secs() -> u64 {
    30
}
fn default_join_timeout_secs() -> u64 {
    2
}
fn default_slow_sub_budget() -> u32 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchConfig {
    #[serde(default = "default_max_players")]
    pub max_players: u32,
    #[serde(default = "default_min_players")]
    pub min_players: u32,
    #[serde(default = "default_countdown_secs")]
    pub countdown_secs: u64,
    #[serde(default = "default_max_match_secs")]
    pub max_match_secs: u64,
    #[serde(default = "default_tick_hz")]
    pub tick_hz: u32,
    #[serde(default = "default_invite_code_len")]
    pub invite_code_len: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            max_players: default_max_players(),
            min_players: default_min_players(),
            countdown_secs: default_countdown_secs(),
            max_match_secs: default_max_match_secs(),
            tick_hz: default_tick_hz(),
            invite_code_len: default_invite_code_len(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EconomyConfig {
    #[serde(default = "default_house_fee")]
    pub house_fee: Decimal,
    #[serde(default = "default_commission_l1")]
    pub commission_l1: Decimal,
    #[serde(default = "default_commission_l2")]
    pub commission_l2: Decimal,
    #[serde(default = "default_commission_l3")]
    pub commission_l3: Decimal,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            house_fee: default_house_fee(),
            commission_l1: default_commission_l1(),
            commission_l2: default_commission_l2(),
            commission_l3: default_commission_l3(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_reconnect_grace_secs")]
    pub reconnect_grace_secs: u64,
    #[serde(default = "default_kick_warnings")]
    pub kick_warnings: u32,
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_join_timeout_secs")]
    pub join_timeout_secs: u64,
    #[serde(default = "default_slow_sub_budget")]
    pub slow_sub_budget: u32,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    9944
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            reconnect_grace_secs: default_reconnect_grace_secs(),
            kick_warnings: default_kick_warnings(),
            idle_timeout_secs: default_idle_timeout_secs(),
            join_timeout_secs: default_join_timeout_secs(),
            slow_sub_budget: default_slow_sub_budget(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the sqlite database file; `:memory:` for an ephemeral store.
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

fn default_db_path() -> String {
    "driftrace.sqlite3".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { db_path: default_db_path() }
    }
}

impl StorageConfig {
    /// `db_path` with a leading `~` expanded to the user's home directory.
    /// Left alone for the `:memory:` sentinel.
    pub fn resolved_db_path(&self) -> String {
        if self.db_path == ":memory:" {
            return self.db_path.clone();
        }
        shellexpand::tilde(&self.db_path).into_owned()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub r#match: MatchConfig,
    #[serde(default)]
    pub economy: EconomyConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    pub fn from_str(s: &str) -> Result<Config, toml::de::Error> {
        toml::from_str(s)
    }

    pub async fn from_path(path: &Path) -> Config {
        tracing::info!(path = %path.display(), "loading configuration");
        let buf = tokio::fs::read_to_string(path)
            .await
            .expect("config file not found");
        match toml::from_str(&buf) {
            Ok(config) => config,
            Err(e) => panic!("invalid config file: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_used_for_empty_document() {
        let cfg = Config::from_str("").unwrap();
        assert_eq!(cfg.r#match.max_players, 8);
        assert_eq!(cfg.economy.house_fee, dec!(0.0));
    }

    #[test]
    fn partial_overrides_keep_remaining_defaults() {
        let cfg = Config::from_str(
            r#"
            [match]
            max_players = 4
            "#,
        )
        .unwrap();
        assert_eq!(cfg.r#match.max_players, 4);
        assert_eq!(cfg.r#match.min_players, 2);
    }
}
