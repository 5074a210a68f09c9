use chrono::{DateTime, Utc};
use driftrace_core::domain::{RoomId, RoomPlayer, RoomStatus, UserId};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct RankEntry {
    pub player_id: UserId,
    pub distance: f64,
    pub time_alive: f64,
    pub eliminated: bool,
    pub is_winner: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrizeEntry {
    pub player_id: UserId,
    pub amount: Decimal,
}

/// Server-to-client frames a room broadcasts. Subscribers (one per
/// connected session, via the gateway) receive every variant and filter
/// client-side; `PlayerError` is nominally addressed but still fanned
/// out on the shared channel like everything else.
#[derive(Debug, Clone, Serialize)]
pub enum RoomEvent {
    LobbyInfo {
        room_id: RoomId,
        seed: u64,
        bet_amount: Decimal,
        status: RoomStatus,
        countdown_deadline: Option<u64>,
        prize_pool: Decimal,
        invite_code: Option<String>,
        players: Vec<RoomPlayer>,
    },
    PositionUpdate {
        tick: u64,
        players: Vec<RoomPlayer>,
    },
    MatchStarted {
        started_at: DateTime<Utc>,
    },
    MatchFinished {
        winner_id: Option<UserId>,
        ranking: Vec<RankEntry>,
        prizes: Vec<PrizeEntry>,
    },
    PlayerError {
        player_id: UserId,
        code: &'static str,
        message: String,
    },
}
