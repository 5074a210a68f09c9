use driftrace_core::repo::Repository;
use driftrace_registry::RoomRegistry;
use driftrace_room::RoomConfig;
use driftrace_room::RoomRef;
use driftrace_wallet::WalletLedger;
use std::sync::Arc;
use std::time::Duration;

/// Transport-level tunables the room actors themselves don't need to
/// know about.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub port: u16,
    pub idle_timeout: Duration,
    pub join_timeout: Duration,
}

/// Shared state handed to every RPC method, the same way the teacher's
/// `ApplicationContext` is handed to every `server.rs` handler.
pub struct GatewayContext {
    pub repo: Arc<dyn Repository>,
    pub wallet: Arc<WalletLedger>,
    pub registry: Arc<RoomRegistry<RoomRef>>,
    pub room_config: RoomConfig,
    pub config: GatewayConfig,
}

impl GatewayContext {
    pub fn new(
        repo: Arc<dyn Repository>,
        wallet: Arc<WalletLedger>,
        registry: Arc<RoomRegistry<RoomRef>>,
        room_config: RoomConfig,
        config: GatewayConfig,
    ) -> Self {
        Self { repo, wallet, registry, room_config, config }
    }
}
