use crate::actor::RoomActor;
use crate::command::{InputReport, PositionReport, RoomCommand};
use crate::config::RoomConfig;
use crate::event::RoomEvent;
use driftrace_core::domain::{RoomId, RoomStatus, RoomType, UserId};
use driftrace_core::error::{Error, Result};
use driftrace_registry::{RoomHandle, RoomRegistry, RoomSnapshot};
use driftrace_wallet::WalletLedger;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};

const COMMAND_CHANNEL_CAPACITY: usize = 256;

/// A cheap, cloneable reference to a running room actor's command
/// channel and event bus. This is the opaque `T` the registry's
/// `RoomHandle<T>` carries — the registry never looks inside it, only
/// the gateway does.
#[derive(Clone)]
pub struct RoomRef {
    tx: mpsc::Sender<RoomCommand>,
    events: broadcast::Sender<RoomEvent>,
}

impl RoomRef {
    pub fn subscribe(&self) -> broadcast::Receiver<RoomEvent> {
        self.events.subscribe()
    }

    pub async fn join(&self, player_id: UserId, display_name: String, platform_user_id: String, bet_amount: Decimal) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(RoomCommand::Join { player_id, display_name, platform_user_id, bet_amount, reply })
            .await
            .map_err(|_| Error::Unavailable)?;
        rx.await.map_err(|_| Error::Unavailable)?
    }

    pub async fn rejoin(&self, player_id: UserId) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(RoomCommand::Rejoin { player_id, reply }).await.map_err(|_| Error::Unavailable)?;
        rx.await.map_err(|_| Error::Unavailable)?
    }

    pub async fn leave(&self, player_id: UserId) {
        let _ = self.tx.send(RoomCommand::Leave { player_id }).await;
    }

    pub async fn set_ready(&self, player_id: UserId, ready: bool) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(RoomCommand::SetReady { player_id, ready, reply }).await.map_err(|_| Error::Unavailable)?;
        rx.await.map_err(|_| Error::Unavailable)?
    }

    pub async fn input(&self, player_id: UserId, input: InputReport) {
        let _ = self.tx.send(RoomCommand::Input { player_id, input }).await;
    }

    pub async fn position(&self, player_id: UserId, report: PositionReport) {
        let _ = self.tx.send(RoomCommand::Position { player_id, report }).await;
    }
}

/// Everything needed to spawn a fresh room actor. Built by the gateway
/// (via the registry's `join_public`/`create_private` closures) once a
/// matching or creation decision has already been made.
pub struct NewRoomParams {
    pub room_id: RoomId,
    pub seed: u64,
    pub room_type: RoomType,
    pub bet_amount: Decimal,
    pub host_player_id: UserId,
    pub invite_code: Option<String>,
    pub config: RoomConfig,
    pub wallet: Arc<WalletLedger>,
    pub registry: Arc<RoomRegistry<RoomRef>>,
}

/// Construct a room actor and spawn its tick loop, returning the
/// registry-facing handle. The registry overwrites `created_seq` once
/// the handle is registered.
pub fn spawn_room(params: NewRoomParams) -> RoomHandle<RoomRef> {
    let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
    let (events_tx, _events_rx) = broadcast::channel(params.config.slow_sub_budget.max(1) as usize);
    let (snapshot_tx, snapshot_rx) = watch::channel(RoomSnapshot { status: RoomStatus::Waiting, player_count: 0 });

    let room_ref = RoomRef { tx, events: events_tx.clone() };

    let actor = RoomActor::new(
        params.room_id.clone(),
        params.seed,
        params.room_type,
        params.bet_amount,
        params.host_player_id.clone(),
        params.invite_code.clone(),
        params.config,
        params.wallet,
        params.registry,
        rx,
        events_tx,
        snapshot_tx,
    );
    tokio::spawn(actor.run());

    RoomHandle::new(params.room_id, params.room_type, params.bet_amount, params.invite_code, params.host_player_id, snapshot_rx, room_ref)
}
