pub const MAX_VEL: f64 = 35.0;
pub const MAX_ACCEL: f64 = 15.0;
/// Floor added to the velocity-scaled position-jump threshold; not given a
/// numeric default elsewhere, chosen to be comfortably above normal
/// per-tick movement at `TICK_HZ = 60`.
pub const MAX_JUMP: f64 = 5.0;
pub const TELEPORT_THRESH: f64 = 20.0;
pub const MAX_YAW_RATE: f64 = 3.0 * std::f64::consts::PI;
/// Not given a numeric default; a few centimeters of reported motion is
/// indistinguishable from sensor noise, so anything below this is "not
/// moving" for the purposes of the stuck-while-accelerating rule.
pub const STUCK_THRESH: f64 = 0.05;
pub const STUCK_VELOCITY_FLOOR: f64 = 5.0;
pub const MAX_INPUT_RATE: u32 = 50;
pub const INPUT_RATE_WINDOW_MS: u64 = 1_000;

/// Violations within this window decay trust fastest (0.05 each).
pub const RECENT_WINDOW_MS: u64 = 5_000;
/// Violations within this window but older than `RECENT_WINDOW_MS` count
/// as "historical" (0.02 each, capped).
pub const VALIDATION_WINDOW_MS: u64 = 30_000;

pub const MAX_RECONNECT_GAP_MS: u64 = 1_000;

pub const SUSPICIOUS_WARNING_THRESHOLD: u32 = 3;
pub const HISTORICAL_DECAY_CAP: f64 = 0.3;
