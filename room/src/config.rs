use rust_decimal::Decimal;
use std::time::Duration;

/// The subset of process configuration a room actor needs, independent
/// of how the caller loaded it. The `server` crate builds this from
/// `driftrace_env::Config`.
#[derive(Debug, Clone)]
pub struct RoomConfig {
    pub max_players: usize,
    pub min_players: usize,
    pub countdown: Duration,
    pub max_match: Duration,
    pub tick_hz: u32,
    pub house_fee: Decimal,
    /// Broadcast channel capacity; a subscriber more than this many
    /// ticks behind gets `Lagged` from `tokio::sync::broadcast` and the
    /// gateway drops its session.
    pub slow_sub_budget: u32,
    /// Anti-cheat warning count past which a player is kicked from the room.
    pub kick_warnings: u32,
}

impl RoomConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_hz as f64)
    }
}
