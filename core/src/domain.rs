//! Core domain entities shared by every other crate.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type UserId = String;
pub type RoomId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Player,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ban {
    pub banned_by: UserId,
    pub reason: String,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Immutable identity + mutable profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub display_name: String,
    pub role: Role,
    pub referral_code: String,
    pub referred_by: Option<UserId>,
    pub withdraw_key: Option<String>,
    pub car_color: String,
    pub ban: Option<Ban>,
}

impl User {
    pub fn is_banned(&self) -> bool {
        match &self.ban {
            None => false,
            Some(ban) => match ban.expires_at {
                None => true,
                Some(expiry) => expiry > Utc::now(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LedgerKind {
    Deposit,
    Withdrawal,
    GameTicket,
    GameReward,
    AffiliateL1,
    AffiliateL2,
    AffiliateL3,
    AdminAdjust,
}

/// Append-only ledger row. `id` doubles as the idempotency key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: String,
    pub user_id: UserId,
    pub amount: Decimal,
    pub kind: LedgerKind,
    pub description: String,
    pub reference_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomType {
    Public,
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Waiting,
    Countdown,
    Racing,
    Finished,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Player's record inside a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomPlayer {
    pub player_id: UserId,
    pub display_name: String,
    pub platform_user_id: String,
    pub position: Position,
    pub heading: f64,
    pub pressing: bool,
    pub steering: f64,
    pub steering_intensity: f64,
    pub distance: f64,
    pub opacity: f64,
    pub eliminated: bool,
    pub time_alive: f64,
    pub bet_amount: Decimal,
    pub ready: bool,
    pub is_winner: bool,
}

impl RoomPlayer {
    pub fn new(player_id: UserId, display_name: String, platform_user_id: String, bet_amount: Decimal) -> Self {
        Self {
            player_id,
            display_name,
            platform_user_id,
            position: Position::default(),
            heading: 0.0,
            pressing: false,
            steering: 0.0,
            steering_intensity: 0.0,
            distance: 0.0,
            opacity: 1.0,
            eliminated: false,
            time_alive: 0.0,
            bet_amount,
            ready: false,
            is_winner: false,
        }
    }
}

/// A single match instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub seed: u64,
    pub room_type: RoomType,
    pub bet_amount: Decimal,
    pub invite_code: Option<String>,
    pub host_player_id: UserId,
    pub status: RoomStatus,
    pub players: HashMap<UserId, RoomPlayer>,
    pub prize_pool: Decimal,
    /// Monotonic millis deadline for the countdown, set on `waiting -> countdown`.
    pub countdown_deadline: Option<u64>,
    pub winner_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

impl Room {
    pub fn new(id: RoomId, seed: u64, room_type: RoomType, bet_amount: Decimal, host_player_id: UserId, invite_code: Option<String>) -> Self {
        Self {
            id,
            seed,
            room_type,
            bet_amount,
            invite_code,
            host_player_id,
            status: RoomStatus::Waiting,
            players: HashMap::new(),
            prize_pool: Decimal::ZERO,
            countdown_deadline: None,
            winner_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn ready_count(&self) -> usize {
        self.players.values().filter(|p| p.ready).count()
    }

    pub fn live_count(&self) -> usize {
        self.players.values().filter(|p| !p.eliminated).count()
    }
}
