//! jsonrpsee RPC and pub-sub server: the wire boundary between client
//! transports and room actors. Binds a session to at most one room,
//! authenticates and ban-checks at `join`, and otherwise just routes.

mod context;
mod error;
mod methods;
mod params;
mod server;

pub use context::{GatewayConfig, GatewayContext};
pub use params::{InputParams, JoinParams, JoinResult, PositionParams, ReadyParams, RoomScopedParams, SubscribeRoomParams};
pub use server::run_server;
