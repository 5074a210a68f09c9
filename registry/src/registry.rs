use crate::handle::RoomHandle;
use driftrace_core::domain::{RoomId, RoomStatus, RoomType};
use driftrace_core::error::{Error, Result};
use rand::Rng;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use tracing::{info, warn};

const INVITE_CODE_LEN: usize = 6;
const INVITE_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const INVITE_CODE_MAX_RETRIES: usize = 10;

fn next_seed(counter: u64) -> u64 {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos() as u64;
    now ^ counter
}

fn generate_invite_code() -> String {
    let mut rng = rand::thread_rng();
    (0..INVITE_CODE_LEN)
        .map(|_| INVITE_CODE_ALPHABET[rng.gen_range(0..INVITE_CODE_ALPHABET.len())] as char)
        .collect()
}

struct Inner<T> {
    rooms: HashMap<RoomId, RoomHandle<T>>,
    invite_codes: HashMap<String, RoomId>,
}

/// Matches players into public rooms, creates private rooms with invite
/// codes, and looks rooms up by id or code. Holds handles, never
/// simulation state; the handle's `inner` payload is whatever the room
/// actor's owner (the gateway) needs to route a message to it.
pub struct RoomRegistry<T> {
    inner: Arc<Mutex<Inner<T>>>,
    seq: AtomicU64,
}

impl<T> Default for RoomRegistry<T> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner { rooms: HashMap::new(), invite_codes: HashMap::new() })),
            seq: AtomicU64::new(0),
        }
    }
}

impl<T: Clone> RoomRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    pub fn new_seed(&self) -> u64 {
        next_seed(self.next_seq())
    }

    /// Find an open public room accepting `bet_amount` with room under
    /// `max_players`, in creation order. If none exists, `spawn` is
    /// called with a fresh seed to create one, which is registered and
    /// returned.
    pub async fn join_public(
        &self,
        bet_amount: Decimal,
        max_players: usize,
        spawn: impl FnOnce(u64) -> RoomHandle<T>,
    ) -> RoomHandle<T> {
        let mut guard = self.inner.lock().await;

        let mut candidates: Vec<&RoomHandle<T>> = guard
            .rooms
            .values()
            .filter(|h| {
                h.room_type == RoomType::Public
                    && h.status() == RoomStatus::Waiting
                    && h.bet_amount == bet_amount
                    && h.player_count() < max_players
            })
            .collect();
        candidates.sort_by_key(|h| h.created_seq);

        if let Some(handle) = candidates.first() {
            return (*handle).clone();
        }

        let seed = self.new_seed();
        let mut handle = spawn(seed);
        handle.created_seq = self.next_seq();
        info!(room_id = %handle.room_id, %bet_amount, "spawned public room");
        guard.rooms.insert(handle.room_id.clone(), handle.clone());
        handle
    }

    /// Create a fresh private room with a freshly generated invite code.
    pub async fn create_private(
        &self,
        bet_amount: Decimal,
        spawn: impl FnOnce(u64, String) -> RoomHandle<T>,
    ) -> Result<RoomHandle<T>> {
        let mut guard = self.inner.lock().await;

        let mut code = None;
        for _ in 0..INVITE_CODE_MAX_RETRIES {
            let candidate = generate_invite_code();
            if !guard.invite_codes.contains_key(&candidate) {
                code = Some(candidate);
                break;
            }
        }
        let Some(code) = code else {
            warn!(%bet_amount, "invite code space exhausted after retries");
            return Err(Error::CodeExhausted);
        };

        let seed = self.new_seed();
        let mut handle = spawn(seed, code.clone());
        handle.created_seq = self.next_seq();
        handle.invite_code = Some(code.clone());
        info!(room_id = %handle.room_id, %code, "created private room");
        guard.invite_codes.insert(code, handle.room_id.clone());
        guard.rooms.insert(handle.room_id.clone(), handle.clone());
        Ok(handle)
    }

    /// Invite codes are normalised to uppercase, so lookup is
    /// case-insensitive on the caller's input.
    pub async fn join_private(&self, invite_code: &str) -> Result<RoomHandle<T>> {
        let invite_code = invite_code.to_uppercase();
        let guard = self.inner.lock().await;
        let room_id = guard.invite_codes.get(&invite_code).ok_or_else(|| Error::NotFound(invite_code.clone()))?;
        guard.rooms.get(room_id).cloned().ok_or_else(|| Error::NotFound(room_id.clone()))
    }

    pub async fn lookup(&self, room_id: &str) -> Result<RoomHandle<T>> {
        let guard = self.inner.lock().await;
        guard.rooms.get(room_id).cloned().ok_or_else(|| Error::NotFound(room_id.to_string()))
    }

    /// Revoke a private room's invite code without removing the room
    /// itself. Called on the `countdown -> racing` transition.
    pub async fn revoke_invite_code(&self, room_id: &str) {
        let mut guard = self.inner.lock().await;
        if let Some(handle) = guard.rooms.get_mut(room_id) {
            if let Some(code) = handle.invite_code.take() {
                guard.invite_codes.remove(&code);
            }
        }
    }

    pub async fn remove_room(&self, room_id: &str) {
        let mut guard = self.inner.lock().await;
        if let Some(handle) = guard.rooms.remove(room_id) {
            if let Some(code) = handle.invite_code {
                guard.invite_codes.remove(&code);
            }
        }
        info!(room_id, "room removed from registry");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::RoomSnapshot;
    use driftrace_core::domain::RoomType;
    use rust_decimal_macros::dec;
    use tokio::sync::watch;

    fn make_handle(room_id: &str, room_type: RoomType, bet_amount: Decimal, status: RoomStatus, player_count: usize) -> RoomHandle<()> {
        let (_tx, rx) = watch::channel(RoomSnapshot { status, player_count });
        RoomHandle {
            room_id: room_id.to_string(),
            room_type,
            bet_amount,
            invite_code: None,
            host_player_id: "host".to_string(),
            created_seq: 0,
            snapshot: rx,
            inner: (),
        }
    }

    #[tokio::test]
    async fn join_public_creates_room_when_none_open() {
        let registry: RoomRegistry<()> = RoomRegistry::new();
        let handle = registry
            .join_public(dec!(5.00), 8, |seed| make_handle(&format!("room-{seed}"), RoomType::Public, dec!(5.00), RoomStatus::Waiting, 0))
            .await;
        assert_eq!(handle.bet_amount, dec!(5.00));
    }

    #[tokio::test]
    async fn join_public_reuses_existing_open_room() {
        let registry: RoomRegistry<()> = RoomRegistry::new();
        let first = registry
            .join_public(dec!(5.00), 8, |_seed| make_handle("room-a", RoomType::Public, dec!(5.00), RoomStatus::Waiting, 1))
            .await;

        let mut spawned_new = false;
        let second = registry
            .join_public(dec!(5.00), 8, |_seed| {
                spawned_new = true;
                make_handle("room-b", RoomType::Public, dec!(5.00), RoomStatus::Waiting, 1)
            })
            .await;

        assert_eq!(first.room_id, second.room_id);
        assert!(!spawned_new);
    }

    #[tokio::test]
    async fn join_public_skips_full_room_and_spawns_new_one() {
        let registry: RoomRegistry<()> = RoomRegistry::new();
        {
            let mut guard = registry.inner.lock().await;
            let handle = make_handle("room-full", RoomType::Public, dec!(5.00), RoomStatus::Waiting, 8);
            guard.rooms.insert(handle.room_id.clone(), handle);
        }

        let handle = registry
            .join_public(dec!(5.00), 8, |seed| make_handle(&format!("room-{seed}"), RoomType::Public, dec!(5.00), RoomStatus::Waiting, 0))
            .await;
        assert_ne!(handle.room_id, "room-full");
    }

    #[tokio::test]
    async fn create_private_assigns_an_invite_code() {
        let registry: RoomRegistry<()> = RoomRegistry::new();
        let handle = registry
            .create_private(dec!(10.00), |seed, code| {
                let mut h = make_handle(&format!("room-{seed}"), RoomType::Private, dec!(10.00), RoomStatus::Waiting, 1);
                h.invite_code = Some(code);
                h
            })
            .await
            .unwrap();
        assert_eq!(handle.invite_code.as_ref().map(|c| c.len()), Some(6));
    }

    #[tokio::test]
    async fn join_private_finds_room_by_code() {
        let registry: RoomRegistry<()> = RoomRegistry::new();
        let created = registry
            .create_private(dec!(10.00), |seed, code| {
                let mut h = make_handle(&format!("room-{seed}"), RoomType::Private, dec!(10.00), RoomStatus::Waiting, 1);
                h.invite_code = Some(code);
                h
            })
            .await
            .unwrap();
        let code = created.invite_code.clone().unwrap();

        let found = registry.join_private(&code).await.unwrap();
        assert_eq!(found.room_id, created.room_id);
    }

    #[tokio::test]
    async fn join_private_unknown_code_is_not_found() {
        let registry: RoomRegistry<()> = RoomRegistry::new();
        let err = registry.join_private("ZZZZZZ").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn remove_room_also_frees_invite_code() {
        let registry: RoomRegistry<()> = RoomRegistry::new();
        let created = registry
            .create_private(dec!(10.00), |seed, code| {
                let mut h = make_handle(&format!("room-{seed}"), RoomType::Private, dec!(10.00), RoomStatus::Waiting, 1);
                h.invite_code = Some(code);
                h
            })
            .await
            .unwrap();
        let code = created.invite_code.clone().unwrap();

        registry.remove_room(&created.room_id).await;
        let err = registry.join_private(&code).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
