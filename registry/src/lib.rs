//! Process-wide room matcher and invite-code registry. Guards a single
//! map plus the invite-code map behind a short critical section; never
//! blocks on I/O, and never owns a room's simulation state — only a
//! handle to it.

mod handle;
mod registry;

pub use handle::{RoomHandle, RoomSnapshot};
pub use registry::RoomRegistry;
