use driftrace_core::domain::{Role, RoomType, User};
use driftrace_core::repo::Repository;
use driftrace_core::repo_sqlite::SqliteRepository;
use driftrace_registry::RoomRegistry;
use driftrace_room::{spawn_room, NewRoomParams, RoomConfig, RoomEvent, RoomRef};
use driftrace_wallet::{CommissionRates, WalletLedger};
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::Receiver;

fn user(id: &str) -> User {
    User {
        id: id.to_string(),
        display_name: id.to_string(),
        role: Role::Player,
        referral_code: format!("ref-{id}"),
        referred_by: None,
        withdraw_key: None,
        car_color: "red".to_string(),
        ban: None,
    }
}

fn fast_config() -> RoomConfig {
    RoomConfig {
        max_players: 8,
        min_players: 2,
        countdown: Duration::from_millis(20),
        max_match: Duration::from_secs(5),
        tick_hz: 200,
        house_fee: dec!(0.0),
        slow_sub_budget: 30,
        kick_warnings: 5,
    }
}

async fn recv_until<F: Fn(&RoomEvent) -> bool>(rx: &mut Receiver<RoomEvent>, pred: F) -> RoomEvent {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let event = rx.recv().await.expect("room actor dropped its event channel");
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("expected event was never broadcast")
}

/// Two funded players join, ready up, and the race starts. Both players
/// spawn at the same default position, so the first racing tick's
/// collision check eliminates the trailing one (ties broken by the
/// lower player id) and the match settles in a single tick.
#[tokio::test]
async fn happy_race_debits_tickets_and_pays_the_survivor() {
    let repo = Arc::new(SqliteRepository::try_new_mem().unwrap());
    repo.upsert_user(&user("u1")).await.unwrap();
    repo.upsert_user(&user("u2")).await.unwrap();
    let wallet = Arc::new(WalletLedger::new(repo.clone(), CommissionRates::default()));
    wallet.credit("u1", dec!(10.00), driftrace_core::domain::LedgerKind::Deposit, "top up", "seed-u1", None).await.unwrap();
    wallet.credit("u2", dec!(10.00), driftrace_core::domain::LedgerKind::Deposit, "top up", "seed-u2", None).await.unwrap();

    let registry: Arc<RoomRegistry<RoomRef>> = Arc::new(RoomRegistry::new());
    let handle = spawn_room(NewRoomParams {
        room_id: "room-1".to_string(),
        seed: 1,
        room_type: RoomType::Public,
        bet_amount: dec!(5.00),
        host_player_id: "u1".to_string(),
        invite_code: None,
        config: fast_config(),
        wallet: wallet.clone(),
        registry: registry.clone(),
    });
    let mut events = handle.inner.subscribe();

    handle.inner.join("u1".to_string(), "U1".to_string(), "plat-u1".to_string(), dec!(5.00)).await.unwrap();
    handle.inner.join("u2".to_string(), "U2".to_string(), "plat-u2".to_string(), dec!(5.00)).await.unwrap();
    handle.inner.set_ready("u1".to_string(), true).await.unwrap();
    handle.inner.set_ready("u2".to_string(), true).await.unwrap();

    recv_until(&mut events, |e| matches!(e, RoomEvent::MatchStarted { .. })).await;

    let finished = recv_until(&mut events, |e| matches!(e, RoomEvent::MatchFinished { .. })).await;
    let RoomEvent::MatchFinished { winner_id, prizes, .. } = finished else { unreachable!() };
    assert_eq!(winner_id.as_deref(), Some("u2"));
    assert_eq!(prizes.len(), 1);
    assert_eq!(prizes[0].player_id, "u2");
    assert_eq!(prizes[0].amount, dec!(10.00));

    let balance = wallet.balance("u2").await.unwrap();
    assert_eq!(balance, dec!(15.00));
}

/// A player who can't cover the ticket is pre-eliminated at race start
/// instead of being refused entry outright; the race still runs (and
/// immediately finishes, since only one funded player remains live) and
/// the prize pool reflects only the players who actually paid in.
#[tokio::test]
async fn insufficient_funds_player_is_pre_eliminated_not_refused() {
    let repo = Arc::new(SqliteRepository::try_new_mem().unwrap());
    repo.upsert_user(&user("funded")).await.unwrap();
    repo.upsert_user(&user("broke")).await.unwrap();
    let wallet = Arc::new(WalletLedger::new(repo.clone(), CommissionRates::default()));
    wallet.credit("funded", dec!(10.00), driftrace_core::domain::LedgerKind::Deposit, "top up", "seed-funded", None).await.unwrap();

    let registry: Arc<RoomRegistry<RoomRef>> = Arc::new(RoomRegistry::new());
    let handle = spawn_room(NewRoomParams {
        room_id: "room-2".to_string(),
        seed: 2,
        room_type: RoomType::Public,
        bet_amount: dec!(5.00),
        host_player_id: "funded".to_string(),
        invite_code: None,
        config: fast_config(),
        wallet: wallet.clone(),
        registry: registry.clone(),
    });
    let mut events = handle.inner.subscribe();

    handle.inner.join("funded".to_string(), "Funded".to_string(), "plat-funded".to_string(), dec!(5.00)).await.unwrap();
    handle.inner.join("broke".to_string(), "Broke".to_string(), "plat-broke".to_string(), dec!(5.00)).await.unwrap();
    handle.inner.set_ready("funded".to_string(), true).await.unwrap();
    handle.inner.set_ready("broke".to_string(), true).await.unwrap();

    recv_until(&mut events, |e| matches!(e, RoomEvent::MatchStarted { .. })).await;

    let finished = recv_until(&mut events, |e| matches!(e, RoomEvent::MatchFinished { .. })).await;
    let RoomEvent::MatchFinished { winner_id, prizes, .. } = finished else { unreachable!() };
    assert_eq!(winner_id.as_deref(), Some("funded"));
    assert_eq!(prizes[0].amount, dec!(5.00));
}

/// A private room's invite code stops resolving once the countdown
/// elapses and the race begins, closing the window for late joiners.
#[tokio::test]
async fn private_room_invite_code_is_revoked_once_the_race_starts() {
    let repo = Arc::new(SqliteRepository::try_new_mem().unwrap());
    repo.upsert_user(&user("host")).await.unwrap();
    repo.upsert_user(&user("guest")).await.unwrap();
    let wallet = Arc::new(WalletLedger::new(repo.clone(), CommissionRates::default()));
    wallet.credit("host", dec!(10.00), driftrace_core::domain::LedgerKind::Deposit, "top up", "seed-host", None).await.unwrap();
    wallet.credit("guest", dec!(10.00), driftrace_core::domain::LedgerKind::Deposit, "top up", "seed-guest", None).await.unwrap();

    let registry: Arc<RoomRegistry<RoomRef>> = Arc::new(RoomRegistry::new());
    let config = fast_config();
    let handle = registry
        .create_private(dec!(5.00), |seed, code| {
            spawn_room(NewRoomParams {
                room_id: "room-3".to_string(),
                seed,
                room_type: RoomType::Private,
                bet_amount: dec!(5.00),
                host_player_id: "host".to_string(),
                invite_code: Some(code),
                config: config.clone(),
                wallet: wallet.clone(),
                registry: registry.clone(),
            })
        })
        .await
        .unwrap();
    let code = handle.invite_code.clone().expect("private room must carry an invite code");

    let mut events = handle.inner.subscribe();
    handle.inner.join("host".to_string(), "Host".to_string(), "plat-host".to_string(), dec!(5.00)).await.unwrap();
    handle.inner.join("guest".to_string(), "Guest".to_string(), "plat-guest".to_string(), dec!(5.00)).await.unwrap();
    handle.inner.set_ready("host".to_string(), true).await.unwrap();
    handle.inner.set_ready("guest".to_string(), true).await.unwrap();

    recv_until(&mut events, |e| matches!(e, RoomEvent::MatchStarted { .. })).await;

    let err = registry.join_private(&code).await.unwrap_err();
    assert!(matches!(err, driftrace_core::error::Error::NotFound(_)));
}
