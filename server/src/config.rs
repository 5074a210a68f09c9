use driftrace_room::RoomConfig;
use std::time::Duration;

pub use driftrace_env::Config;

/// Project the match-related subset of the loaded configuration into the
/// shape a room actor needs, independent of how it was loaded.
pub fn room_config(config: &Config) -> RoomConfig {
    RoomConfig {
        max_players: config.r#match.max_players as usize,
        min_players: config.r#match.min_players as usize,
        countdown: Duration::from_secs(config.r#match.countdown_secs),
        max_match: Duration::from_secs(config.r#match.max_match_secs),
        tick_hz: config.r#match.tick_hz,
        house_fee: config.economy.house_fee,
        slow_sub_budget: config.network.slow_sub_budget,
        kick_warnings: config.network.kick_warnings,
    }
}
