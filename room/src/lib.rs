//! Per-room actor: a fixed-rate tick loop driving the lobby/countdown/
//! race/settlement state machine, anti-cheat-gated position updates,
//! and elimination physics sampled against the procedural track.

mod actor;
mod command;
mod config;
mod event;
mod handle;
mod physics;

pub use command::{InputReport, PositionReport, RoomCommand};
pub use config::RoomConfig;
pub use driftrace_core::error::{Error, Result};
pub use event::{PrizeEntry, RankEntry, RoomEvent};
pub use handle::{spawn_room, NewRoomParams, RoomRef};
pub use physics::{COLLISION_RADIUS, FADE_DURATION, LATERAL_MARGIN, OFF_TRACK_GRACE};
