use driftrace_core::domain::{RoomId, RoomStatus, RoomType, UserId};
use rust_decimal::Decimal;
use tokio::sync::watch;

/// The part of a room's state the registry needs to evaluate matching
/// and lookups, published by the room actor so the registry never has
/// to ask it a question and block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomSnapshot {
    pub status: RoomStatus,
    pub player_count: usize,
}

/// An opaque reference to a running room. `T` is whatever the owning
/// crate (the per-room actor) needs to route messages to it — the
/// registry never inspects it.
#[derive(Debug, Clone)]
pub struct RoomHandle<T> {
    pub room_id: RoomId,
    pub room_type: RoomType,
    pub bet_amount: Decimal,
    pub invite_code: Option<String>,
    pub host_player_id: UserId,
    pub(crate) created_seq: u64,
    pub snapshot: watch::Receiver<RoomSnapshot>,
    pub inner: T,
}

impl<T> RoomHandle<T> {
    /// Build a handle for a freshly spawned room. `created_seq` starts
    /// at 0; the registry overwrites it with the real sequence number
    /// once the handle is registered, so callers outside this crate
    /// never need to set it themselves.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        room_id: RoomId,
        room_type: RoomType,
        bet_amount: Decimal,
        invite_code: Option<String>,
        host_player_id: UserId,
        snapshot: watch::Receiver<RoomSnapshot>,
        inner: T,
    ) -> Self {
        Self {
            room_id,
            room_type,
            bet_amount,
            invite_code,
            host_player_id,
            created_seq: 0,
            snapshot,
            inner,
        }
    }

    pub fn status(&self) -> RoomStatus {
        self.snapshot.borrow().status
    }

    pub fn player_count(&self) -> usize {
        self.snapshot.borrow().player_count
    }
}
