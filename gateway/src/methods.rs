use crate::context::GatewayContext;
use crate::error::{to_call_error, to_rpc_error};
use crate::params::{InputParams, JoinParams, JoinResult, PositionParams, ReadyParams, RoomScopedParams, SubscribeRoomParams};
use driftrace_core::domain::RoomType;
use driftrace_core::error::Error;
use driftrace_room::{InputReport, NewRoomParams, PositionReport};
use jsonrpsee::core::error::{Error as RpcError, SubscriptionClosed};
use jsonrpsee::types::{Params, SubscriptionEmptyError};
use jsonrpsee::SubscriptionSink;
use std::sync::Arc;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, warn};

async fn authenticate(context: &GatewayContext, user_id: &str) -> Result<(), Error> {
    let user = context.repo.get_user(user_id).await?.ok_or(Error::Unauthenticated)?;
    if user.is_banned() {
        return Err(Error::UserBanned);
    }
    Ok(())
}

fn room_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub async fn join(params: Params<'_>, context: Arc<GatewayContext>) -> Result<JoinResult, RpcError> {
    let p: JoinParams = params.parse()?;
    join_inner(p, context).await.map_err(to_rpc_error)
}

async fn join_inner(p: JoinParams, context: Arc<GatewayContext>) -> Result<JoinResult, Error> {
    authenticate(&context, &p.user_id).await?;

    let registry = context.registry.clone();
    let room_config = context.room_config.clone();

    let handle = match (p.room_type, &p.invite_code) {
        (RoomType::Public, _) => {
            let bet_amount = p.bet_amount.ok_or_else(|| Error::InvalidMessage("bet_amount required for a public room".to_string()))?;
            let max_players = room_config.max_players;
            let wallet = context.wallet.clone();
            let registry_for_spawn = registry.clone();
            let host = p.user_id.clone();
            tokio::time::timeout(context.config.join_timeout, async move {
                registry
                    .join_public(bet_amount, max_players, move |seed| {
                        driftrace_room::spawn_room(NewRoomParams {
                            room_id: room_id(),
                            seed,
                            room_type: RoomType::Public,
                            bet_amount,
                            host_player_id: host,
                            invite_code: None,
                            config: room_config,
                            wallet,
                            registry: registry_for_spawn,
                        })
                    })
                    .await
            })
            .await
            .map_err(|_| Error::Unavailable)?
        }
        (RoomType::Private, Some(code)) => {
            let code = code.clone();
            tokio::time::timeout(context.config.join_timeout, async move { registry.join_private(&code).await })
                .await
                .map_err(|_| Error::Unavailable)??
        }
        (RoomType::Private, None) => {
            let bet_amount = p.bet_amount.ok_or_else(|| Error::InvalidMessage("bet_amount required to create a private room".to_string()))?;
            let wallet = context.wallet.clone();
            let registry_for_spawn = registry.clone();
            let host = p.user_id.clone();
            tokio::time::timeout(context.config.join_timeout, async move {
                registry
                    .create_private(bet_amount, move |seed, code| {
                        driftrace_room::spawn_room(NewRoomParams {
                            room_id: room_id(),
                            seed,
                            room_type: RoomType::Private,
                            bet_amount,
                            host_player_id: host,
                            invite_code: Some(code),
                            config: room_config,
                            wallet,
                            registry: registry_for_spawn,
                        })
                    })
                    .await
            })
            .await
            .map_err(|_| Error::Unavailable)??
        }
    };

    handle.inner.join(p.user_id, p.display_name, p.platform_user_id, handle.bet_amount).await?;

    Ok(JoinResult { room_id: handle.room_id, bet_amount: handle.bet_amount, status: handle.status(), invite_code: handle.invite_code })
}

pub async fn leave(params: Params<'_>, context: Arc<GatewayContext>) -> Result<(), RpcError> {
    let p: RoomScopedParams = params.parse()?;
    let handle = context.registry.lookup(&p.room_id).await.map_err(to_rpc_error)?;
    handle.inner.leave(p.user_id).await;
    Ok(())
}

pub async fn ready(params: Params<'_>, context: Arc<GatewayContext>) -> Result<(), RpcError> {
    let p: ReadyParams = params.parse()?;
    let handle = context.registry.lookup(&p.room_id).await.map_err(to_rpc_error)?;
    handle.inner.set_ready(p.user_id, p.ready).await.map_err(to_rpc_error)
}

pub async fn input(params: Params<'_>, context: Arc<GatewayContext>) -> Result<(), RpcError> {
    let p: InputParams = params.parse()?;
    let handle = context.registry.lookup(&p.room_id).await.map_err(to_rpc_error)?;
    handle
        .inner
        .input(p.user_id, InputReport { pressing: p.pressing, steering: p.steering, steering_intensity: p.steering_intensity, timestamp_ms: p.timestamp_ms })
        .await;
    Ok(())
}

pub async fn position(params: Params<'_>, context: Arc<GatewayContext>) -> Result<(), RpcError> {
    let p: PositionParams = params.parse()?;
    let handle = context.registry.lookup(&p.room_id).await.map_err(to_rpc_error)?;
    handle
        .inner
        .position(
            p.user_id,
            PositionReport {
                position: driftrace_core::domain::Position { x: p.x, y: p.y, z: p.z },
                heading: p.yaw,
                distance: p.distance,
                velocity: p.velocity,
                on_track: p.on_track,
                timestamp_ms: p.timestamp_ms,
            },
        )
        .await;
    Ok(())
}

/// Re-join a room within the reconnect grace window, restoring the
/// player instead of running through `join` again.
pub async fn rejoin(params: Params<'_>, context: Arc<GatewayContext>) -> Result<(), RpcError> {
    let p: RoomScopedParams = params.parse()?;
    let handle = context.registry.lookup(&p.room_id).await.map_err(to_rpc_error)?;
    handle.inner.rejoin(p.user_id).await.map_err(to_rpc_error)
}

pub fn subscribe_room(params: Params<'_>, mut sink: SubscriptionSink, context: Arc<GatewayContext>) -> Result<(), SubscriptionEmptyError> {
    let p: SubscribeRoomParams = params.parse().or(Err(SubscriptionEmptyError))?;

    tokio::spawn(async move {
        let handle = match context.registry.lookup(&p.room_id).await {
            Ok(h) => h,
            Err(e) => {
                sink.close(SubscriptionClosed::Failed(to_call_error(e).into()));
                return;
            }
        };

        info!(room_id = %p.room_id, "subscribed to room events");
        let rx = BroadcastStream::new(handle.inner.subscribe());

        match sink.pipe_from_try_stream(rx).await {
            SubscriptionClosed::Success => sink.close(SubscriptionClosed::Success),
            SubscriptionClosed::RemotePeerAborted => warn!(room_id = %p.room_id, "subscriber aborted"),
            SubscriptionClosed::Failed(err) => {
                warn!(room_id = %p.room_id, ?err, "room subscription failed");
                sink.close(err);
            }
        }
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftrace_core::domain::{Ban, Role, RoomStatus, User};
    use driftrace_core::repo_sqlite::SqliteRepository;
    use driftrace_room::RoomConfig;
    use driftrace_wallet::{CommissionRates, WalletLedger};
    use rust_decimal_macros::dec;
    use std::time::Duration;

    fn user(id: &str, banned: bool) -> User {
        User {
            id: id.to_string(),
            display_name: id.to_string(),
            role: Role::Player,
            referral_code: format!("ref-{id}"),
            referred_by: None,
            withdraw_key: None,
            car_color: "red".to_string(),
            ban: if banned { Some(Ban { banned_by: "admin".to_string(), reason: "cheating".to_string(), expires_at: None }) } else { None },
        }
    }

    fn test_context(repo: Arc<SqliteRepository>) -> Arc<GatewayContext> {
        Arc::new(GatewayContext::new(
            repo.clone(),
            Arc::new(WalletLedger::new(repo, CommissionRates::default())),
            Arc::new(driftrace_registry::RoomRegistry::new()),
            RoomConfig {
                max_players: 8,
                min_players: 2,
                countdown: Duration::from_secs(5),
                max_match: Duration::from_secs(300),
                tick_hz: 60,
                house_fee: dec!(0.0),
                slow_sub_budget: 30,
                kick_warnings: 5,
            },
            GatewayConfig { port: 0, idle_timeout: Duration::from_secs(30), join_timeout: Duration::from_secs(2) },
        ))
    }

    #[tokio::test]
    async fn join_creates_and_enters_a_public_room() {
        let repo = Arc::new(SqliteRepository::try_new_mem().unwrap());
        repo.upsert_user(&user("u1", false)).await.unwrap();
        let context = test_context(repo);

        let result = join_inner(
            JoinParams {
                user_id: "u1".to_string(),
                display_name: "Racer".to_string(),
                platform_user_id: "plat-u1".to_string(),
                room_type: RoomType::Public,
                bet_amount: Some(dec!(5.00)),
                invite_code: None,
            },
            context,
        )
        .await
        .unwrap();

        assert_eq!(result.bet_amount, dec!(5.00));
        assert_eq!(result.status, RoomStatus::Waiting);
    }

    #[tokio::test]
    async fn banned_user_cannot_join() {
        let repo = Arc::new(SqliteRepository::try_new_mem().unwrap());
        repo.upsert_user(&user("u1", true)).await.unwrap();
        let context = test_context(repo);

        let err = join_inner(
            JoinParams {
                user_id: "u1".to_string(),
                display_name: "Racer".to_string(),
                platform_user_id: "plat-u1".to_string(),
                room_type: RoomType::Public,
                bet_amount: Some(dec!(5.00)),
                invite_code: None,
            },
            context,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::UserBanned));
    }

    #[tokio::test]
    async fn creating_a_private_room_returns_an_invite_code() {
        let repo = Arc::new(SqliteRepository::try_new_mem().unwrap());
        repo.upsert_user(&user("host", false)).await.unwrap();
        let context = test_context(repo);

        let result = join_inner(
            JoinParams {
                user_id: "host".to_string(),
                display_name: "Host".to_string(),
                platform_user_id: "plat-host".to_string(),
                room_type: RoomType::Private,
                bet_amount: Some(dec!(10.00)),
                invite_code: None,
            },
            context,
        )
        .await
        .unwrap();

        assert_eq!(result.invite_code.map(|c| c.len()), Some(6));
    }
}
