use crate::command::RoomCommand;
use crate::config::RoomConfig;
use crate::event::{PrizeEntry, RankEntry, RoomEvent};
use crate::handle::RoomRef;
use crate::physics::{PhysicsState, LATERAL_MARGIN};
use driftrace_anticheat::{PositionUpdate, Validator};
use driftrace_core::domain::{LedgerKind, Position, Room, RoomId, RoomPlayer, RoomStatus, RoomType, UserId};
use driftrace_core::error::{Error, Result};
use driftrace_core::money::apply_house_fee;
use driftrace_registry::{RoomRegistry, RoomSnapshot};
use driftrace_wallet::WalletLedger;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::interval;
use tracing::{debug, info, warn};

/// How long a `finished` room stays registered before the registry
/// forgets it, giving late subscribers a chance to read `MatchFinished`.
const GC_GRACE_SECS: f64 = 10.0;

const PRIZE_RETRY_BACKOFFS_MS: [u64; 3] = [100, 400, 1200];

/// Owns one match's authoritative state and drives it forward. Spawned
/// once per room by [`crate::spawn_room`] and torn down when its
/// command channel closes or the post-finish grace window elapses.
pub struct RoomActor {
    room: Room,
    track: driftrace_track::Track,
    physics: PhysicsState,
    validator: Validator,
    config: RoomConfig,
    wallet: Arc<WalletLedger>,
    registry: Arc<RoomRegistry<RoomRef>>,
    rx: mpsc::Receiver<RoomCommand>,
    events_tx: broadcast::Sender<RoomEvent>,
    snapshot_tx: watch::Sender<RoomSnapshot>,
    pending_positions: HashMap<UserId, crate::command::PositionReport>,
    /// Timestamp of each player's last *accepted* position update, used
    /// to integrate `distance` server-side rather than trusting the
    /// client's reported value.
    last_position_ts: HashMap<UserId, u64>,
    /// Monotonically advancing tick index, stamped on every
    /// `PositionUpdate` snapshot so subscribers can detect gaps.
    tick: u64,
    match_elapsed: f64,
    finished_elapsed: f64,
    debited_players: Vec<UserId>,
    removed_from_registry: bool,
    start: Instant,
}

impl RoomActor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        room_id: RoomId,
        seed: u64,
        room_type: RoomType,
        bet_amount: Decimal,
        host_player_id: UserId,
        invite_code: Option<String>,
        config: RoomConfig,
        wallet: Arc<WalletLedger>,
        registry: Arc<RoomRegistry<RoomRef>>,
        rx: mpsc::Receiver<RoomCommand>,
        events_tx: broadcast::Sender<RoomEvent>,
        snapshot_tx: watch::Sender<RoomSnapshot>,
    ) -> Self {
        Self {
            room: Room::new(room_id, seed, room_type, bet_amount, host_player_id, invite_code),
            track: driftrace_track::Track::new(seed),
            physics: PhysicsState::new(),
            validator: Validator::new(),
            config,
            wallet,
            registry,
            rx,
            events_tx,
            snapshot_tx,
            pending_positions: HashMap::new(),
            last_position_ts: HashMap::new(),
            tick: 0,
            match_elapsed: 0.0,
            finished_elapsed: 0.0,
            debited_players: Vec::new(),
            removed_from_registry: false,
            start: Instant::now(),
        }
    }

    pub async fn run(mut self) {
        let mut ticker = interval(self.config.tick_interval());
        loop {
            tokio::select! {
                cmd = self.rx.recv() => {
                    match cmd {
                        Some(cmd) => self.handle_command(cmd).await,
                        None => {
                            debug!(room_id = %self.room.id, "command channel closed, stopping room actor");
                            break;
                        }
                    }
                }
                _ = ticker.tick() => {
                    self.track.ensure_distance(self.furthest_distance() + 200.0);
                    self.run_tick().await;
                    if self.removed_from_registry {
                        break;
                    }
                }
            }
        }
    }

    fn furthest_distance(&self) -> f64 {
        self.room.players.values().map(|p| p.distance).fold(0.0, f64::max)
    }

    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    async fn handle_command(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Join { player_id, display_name, platform_user_id, bet_amount, reply } => {
                let result = self.join(player_id, display_name, platform_user_id, bet_amount);
                if result.is_ok() {
                    self.broadcast_lobby_info();
                }
                let _ = reply.send(result);
            }
            RoomCommand::Rejoin { player_id, reply } => {
                let result = match self.room.players.get(&player_id) {
                    Some(p) if !p.eliminated => Ok(()),
                    Some(_) => Err(Error::Forbidden),
                    None => Err(Error::NotFound(player_id.clone())),
                };
                let _ = reply.send(result);
            }
            RoomCommand::Leave { player_id } => {
                self.room.players.remove(&player_id);
                self.validator.reset(&player_id);
                self.physics.remove(&player_id);
                self.last_position_ts.remove(&player_id);
                self.broadcast_lobby_info();
            }
            RoomCommand::SetReady { player_id, ready, reply } => {
                let result = match self.room.players.get_mut(&player_id) {
                    Some(p) => {
                        p.ready = ready;
                        Ok(())
                    }
                    None => Err(Error::NotFound(player_id.clone())),
                };
                if result.is_ok() {
                    self.broadcast_lobby_info();
                }
                let _ = reply.send(result);
            }
            RoomCommand::Input { player_id, input } => {
                if let Some(p) = self.room.players.get_mut(&player_id) {
                    p.pressing = input.pressing;
                    p.steering = input.steering;
                    p.steering_intensity = input.steering_intensity;
                }
                if !self.validator.validate_input_rate(&player_id, input.timestamp_ms) {
                    debug!(room_id = %self.room.id, player_id, "input rate exceeded");
                }
            }
            RoomCommand::Position { player_id, report } => {
                self.pending_positions.insert(player_id, report);
            }
        }
    }

    fn join(&mut self, player_id: UserId, display_name: String, platform_user_id: String, bet_amount: Decimal) -> Result<()> {
        if self.room.status != RoomStatus::Waiting {
            return Err(Error::RoomLocked);
        }
        if self.room.players.len() >= self.config.max_players {
            return Err(Error::RoomFull);
        }
        self.room.players.insert(player_id.clone(), RoomPlayer::new(player_id, display_name, platform_user_id, bet_amount));
        Ok(())
    }

    async fn run_tick(&mut self) {
        let dt = self.config.tick_interval().as_secs_f64();
        self.tick += 1;
        self.apply_pending_positions();

        match self.room.status {
            RoomStatus::Waiting => self.try_start_countdown(),
            RoomStatus::Countdown => self.evaluate_countdown().await,
            RoomStatus::Racing => self.simulate_racing(dt).await,
            RoomStatus::Finished => self.finished_elapsed += dt,
        }

        self.publish_snapshot();
        self.broadcast_positions();

        if self.room.status == RoomStatus::Finished && self.finished_elapsed > GC_GRACE_SECS && !self.removed_from_registry {
            self.registry.remove_room(&self.room.id).await;
            self.removed_from_registry = true;
        }
    }

    fn apply_pending_positions(&mut self) {
        let pending = std::mem::take(&mut self.pending_positions);
        let mut kicked = Vec::new();
        for (player_id, report) in pending {
            let still_in_room = self.room.players.get(&player_id).is_some_and(|p| !p.eliminated);
            if !still_in_room {
                continue;
            }
            let update = PositionUpdate {
                position: (report.position.x, report.position.y, report.position.z),
                yaw: report.heading,
                velocity: report.velocity,
                timestamp_ms: report.timestamp_ms,
                on_track: report.on_track,
            };
            if self.validator.validate_position(&player_id, update) {
                let last_ts = self.last_position_ts.insert(player_id.clone(), report.timestamp_ms);
                if let Some(player) = self.room.players.get_mut(&player_id) {
                    let dt = match last_ts {
                        Some(last_ts) if report.timestamp_ms > last_ts => (report.timestamp_ms - last_ts) as f64 / 1000.0,
                        _ => 0.0,
                    };
                    let distance = player.distance + report.velocity.max(0.0) * dt;

                    if let Some(sample) = self.track.sample_at(distance) {
                        let dx = report.position.x - sample.position.x;
                        let dy = report.position.y - sample.position.y;
                        let dz = report.position.z - sample.position.z;
                        let lateral = dx * sample.right.x + dy * sample.right.y + dz * sample.right.z;
                        let limit = sample.width / 2.0 + LATERAL_MARGIN;
                        let clamped = lateral.clamp(-limit, limit);
                        player.position = Position {
                            x: sample.position.x + clamped * sample.right.x,
                            y: sample.position.y + clamped * sample.right.y,
                            z: sample.position.z + clamped * sample.right.z,
                        };
                    } else {
                        player.position = report.position;
                    }
                    player.heading = report.heading;
                    player.distance = distance;
                }
            } else {
                debug!(room_id = %self.room.id, player_id, "position update rejected by anti-cheat");
                if self.validator.warning_count(&player_id) >= self.config.kick_warnings {
                    kicked.push(player_id);
                }
            }
        }
        for player_id in kicked {
            self.kick(&player_id);
        }
    }

    fn kick(&mut self, player_id: &str) {
        if self.room.players.remove(player_id).is_none() {
            return;
        }
        self.validator.reset(player_id);
        self.physics.remove(player_id);
        self.last_position_ts.remove(player_id);
        warn!(room_id = %self.room.id, player_id, "player kicked for repeated anti-cheat violations");
        let _ = self.events_tx.send(RoomEvent::PlayerError {
            player_id: player_id.to_string(),
            code: Error::Kicked.code(),
            message: Error::Kicked.to_string(),
        });
        self.broadcast_lobby_info();
    }

    fn try_start_countdown(&mut self) {
        let ready = self.room.ready_count();
        let total = self.room.players.len();
        if ready >= self.config.min_players && total >= self.config.min_players {
            self.room.status = RoomStatus::Countdown;
            self.room.countdown_deadline = Some(self.now_ms() + self.config.countdown.as_millis() as u64);
            info!(room_id = %self.room.id, "countdown started");
            self.broadcast_lobby_info();
        }
    }

    async fn evaluate_countdown(&mut self) {
        let ready = self.room.ready_count();
        let total = self.room.players.len();
        if ready < self.config.min_players || total < self.config.min_players {
            self.room.status = RoomStatus::Waiting;
            self.room.countdown_deadline = None;
            info!(room_id = %self.room.id, "countdown aborted, below minimum players");
            self.broadcast_lobby_info();
            return;
        }

        let Some(deadline) = self.room.countdown_deadline else { return };
        if self.now_ms() < deadline {
            return;
        }

        self.registry.revoke_invite_code(&self.room.id).await;

        let mut debited = Decimal::ZERO;
        let player_ids: Vec<UserId> = self.room.players.keys().cloned().collect();
        for player_id in player_ids {
            let bet_amount = self.room.players[&player_id].bet_amount;
            let key = format!("{}:{}:ticket", self.room.id, player_id);
            match self
                .wallet
                .debit(&player_id, bet_amount, LedgerKind::GameTicket, "Race ticket", &key, Some(self.room.id.as_str()))
                .await
            {
                Ok(_) => {
                    debited += bet_amount;
                    self.debited_players.push(player_id);
                }
                Err(e) => {
                    warn!(room_id = %self.room.id, player_id, error = %e, "ticket debit failed, player pre-eliminated");
                    if let Some(player) = self.room.players.get_mut(&player_id) {
                        player.eliminated = true;
                    }
                }
            }
        }

        let (_fee, distributable) = apply_house_fee(debited, self.config.house_fee);
        self.room.prize_pool = distributable;
        self.room.status = RoomStatus::Racing;
        self.match_elapsed = 0.0;
        info!(room_id = %self.room.id, prize_pool = %self.room.prize_pool, "race started");
        let _ = self.events_tx.send(RoomEvent::MatchStarted { started_at: chrono::Utc::now() });
    }

    async fn simulate_racing(&mut self, dt: f64) {
        self.match_elapsed += dt;

        let live: Vec<(UserId, Position, f64)> =
            self.room.players.values().filter(|p| !p.eliminated).map(|p| (p.player_id.clone(), p.position, p.distance)).collect();

        for (player_id, _, _) in &live {
            if let Some(player) = self.room.players.get_mut(player_id) {
                player.time_alive += dt;
            }
        }

        for player_id in self.physics.advance_off_track(&self.track, &live, dt) {
            self.eliminate(&player_id, "off track");
        }
        for player_id in self.physics.check_collisions(&self.track, &live) {
            self.eliminate(&player_id, "collision");
        }

        let eliminated_ids: Vec<UserId> = self.room.players.values().filter(|p| p.eliminated).map(|p| p.player_id.clone()).collect();
        for player_id in eliminated_ids {
            let opacity = self.physics.advance_fade(&player_id, dt);
            if let Some(player) = self.room.players.get_mut(&player_id) {
                player.opacity = opacity;
            }
        }

        let live_count = self.room.live_count();
        let expired = self.match_elapsed > self.config.max_match.as_secs_f64();
        let empty = self.room.players.is_empty();
        if live_count <= 1 || expired || empty {
            self.finish_match().await;
        }
    }

    fn eliminate(&mut self, player_id: &str, reason: &str) {
        if let Some(player) = self.room.players.get_mut(player_id) {
            if !player.eliminated {
                player.eliminated = true;
                debug!(room_id = %self.room.id, player_id, reason, "player eliminated");
            }
        }
    }

    async fn finish_match(&mut self) {
        let mut players: Vec<&RoomPlayer> = self.room.players.values().collect();
        players.sort_by(|a, b| {
            a.eliminated
                .cmp(&b.eliminated)
                .then_with(|| b.distance.partial_cmp(&a.distance).unwrap_or(std::cmp::Ordering::Equal))
                .then_with(|| b.time_alive.partial_cmp(&a.time_alive).unwrap_or(std::cmp::Ordering::Equal))
        });

        let winner_id = players.first().filter(|p| !p.eliminated).map(|p| p.player_id.clone());

        let ranking: Vec<RankEntry> = players
            .iter()
            .enumerate()
            .map(|(idx, p)| RankEntry {
                player_id: p.player_id.clone(),
                distance: p.distance,
                time_alive: p.time_alive,
                eliminated: p.eliminated,
                is_winner: idx == 0 && winner_id.as_deref() == Some(p.player_id.as_str()),
            })
            .collect();

        if let Some(winner) = &winner_id {
            if let Some(player) = self.room.players.get_mut(winner) {
                player.is_winner = true;
            }
        }

        let mut final_winner = winner_id.clone();
        let mut prizes = Vec::new();
        if let Some(winner) = winner_id {
            let key = format!("{}:{}:prize", self.room.id, winner);
            match self.credit_with_retry(&winner, self.room.prize_pool, LedgerKind::GameReward, "Race prize", &key).await {
                Ok(_) => {
                    prizes.push(PrizeEntry { player_id: winner.clone(), amount: self.room.prize_pool });
                    let payouts = self.wallet.process_affiliate_chain(&winner, self.room.prize_pool, &self.room.id).await;
                    for payout in payouts {
                        prizes.push(PrizeEntry { player_id: payout.user_id, amount: payout.amount });
                    }
                }
                Err(e) => {
                    warn!(room_id = %self.room.id, error = %e, "prize credit failed persistently, refunding debited players");
                    final_winner = None;
                    self.refund_debited_players().await;
                }
            }
        }

        self.room.winner_id = final_winner.clone();
        self.room.status = RoomStatus::Finished;
        info!(room_id = %self.room.id, winner = ?final_winner, "match finished");
        let _ = self.events_tx.send(RoomEvent::MatchFinished { winner_id: final_winner, ranking, prizes });
    }

    async fn credit_with_retry(&self, user_id: &str, amount: Decimal, kind: LedgerKind, description: &str, key: &str) -> Result<Decimal> {
        let mut last_err = None;
        for (attempt, backoff_ms) in PRIZE_RETRY_BACKOFFS_MS.iter().enumerate() {
            match self.wallet.credit(user_id, amount, kind, description, key, Some(self.room.id.as_str())).await {
                Ok(balance) => return Ok(balance),
                Err(e @ Error::RepositoryError(_)) => {
                    warn!(room_id = %self.room.id, attempt, error = %e, "prize credit attempt failed, retrying");
                    last_err = Some(e);
                    tokio::time::sleep(Duration::from_millis(*backoff_ms)).await;
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_err.unwrap_or(Error::Unavailable))
    }

    async fn refund_debited_players(&self) {
        for player_id in &self.debited_players {
            let bet_amount = self.room.players.get(player_id).map(|p| p.bet_amount).unwrap_or_default();
            let key = format!("{}:{}:refund", self.room.id, player_id);
            if let Err(e) = self.wallet.credit(player_id, bet_amount, LedgerKind::GameReward, "Match aborted", &key, Some(self.room.id.as_str())).await {
                warn!(room_id = %self.room.id, player_id, error = %e, "refund failed");
            }
        }
    }

    fn publish_snapshot(&self) {
        let _ = self.snapshot_tx.send(RoomSnapshot { status: self.room.status, player_count: self.room.players.len() });
    }

    fn broadcast_positions(&self) {
        if self.room.players.is_empty() {
            return;
        }
        let players: Vec<RoomPlayer> = self.room.players.values().cloned().collect();
        if self.events_tx.send(RoomEvent::PositionUpdate { tick: self.tick, players }).is_err() {
            debug!(room_id = %self.room.id, "no subscribers for position update");
        }
    }

    fn broadcast_lobby_info(&self) {
        let players: Vec<RoomPlayer> = self.room.players.values().cloned().collect();
        let _ = self.events_tx.send(RoomEvent::LobbyInfo {
            room_id: self.room.id.clone(),
            seed: self.room.seed,
            bet_amount: self.room.bet_amount,
            status: self.room.status,
            countdown_deadline: self.room.countdown_deadline,
            prize_pool: self.room.prize_pool,
            invite_code: self.room.invite_code.clone(),
            players,
        });
    }
}
