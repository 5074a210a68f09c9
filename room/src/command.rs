use driftrace_core::domain::{Position, UserId};
use rust_decimal::Decimal;
use tokio::sync::oneshot;

/// A client's steering/throttle intent, sent continuously. Carried
/// straight onto the affected `RoomPlayer`'s fields so other clients can
/// render it; it does not itself move the authoritative position.
#[derive(Debug, Clone, Copy)]
pub struct InputReport {
    pub pressing: bool,
    pub steering: f64,
    pub steering_intensity: f64,
    pub timestamp_ms: u64,
}

/// A client's self-reported authoritative position, subject to anti-cheat
/// validation before it is adopted.
#[derive(Debug, Clone, Copy)]
pub struct PositionReport {
    pub position: Position,
    pub heading: f64,
    pub distance: f64,
    pub velocity: f64,
    pub on_track: bool,
    pub timestamp_ms: u64,
}

/// Messages the gateway sends into a room's actor. `Join` and
/// `SetReady` carry a reply channel since the caller needs to know
/// whether the mutation was accepted before it tells the client.
#[derive(Debug)]
pub enum RoomCommand {
    Join {
        player_id: UserId,
        display_name: String,
        platform_user_id: String,
        bet_amount: Decimal,
        reply: oneshot::Sender<crate::Result<()>>,
    },
    Rejoin {
        player_id: UserId,
        reply: oneshot::Sender<crate::Result<()>>,
    },
    Leave {
        player_id: UserId,
    },
    SetReady {
        player_id: UserId,
        ready: bool,
        reply: oneshot::Sender<crate::Result<()>>,
    },
    Input {
        player_id: UserId,
        input: InputReport,
    },
    Position {
        player_id: UserId,
        report: PositionReport,
    },
}
