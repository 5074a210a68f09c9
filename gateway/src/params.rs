use driftrace_core::domain::{RoomId, RoomStatus, RoomType, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinParams {
    pub user_id: UserId,
    pub display_name: String,
    pub platform_user_id: String,
    pub room_type: RoomType,
    /// Required when creating a public room or a fresh private room;
    /// ignored when `invite_code` names an existing room.
    pub bet_amount: Option<Decimal>,
    pub invite_code: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinResult {
    pub room_id: RoomId,
    pub bet_amount: Decimal,
    pub status: RoomStatus,
    pub invite_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomScopedParams {
    pub user_id: UserId,
    pub room_id: RoomId,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyParams {
    pub user_id: UserId,
    pub room_id: RoomId,
    pub ready: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputParams {
    pub user_id: UserId,
    pub room_id: RoomId,
    pub pressing: bool,
    pub steering: f64,
    pub steering_intensity: f64,
    pub timestamp_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionParams {
    pub user_id: UserId,
    pub room_id: RoomId,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f64,
    pub distance: f64,
    pub velocity: f64,
    pub on_track: bool,
    pub timestamp_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeRoomParams {
    pub room_id: RoomId,
}
