use crate::constants::*;
use crate::profile::PlayerValidationProfile;
use crate::types::{PositionUpdate, Rule, Violation};
use std::collections::HashMap;
use tracing::debug;

fn distance(a: (f64, f64, f64), b: (f64, f64, f64)) -> f64 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    let dz = a.2 - b.2;
    (dx * dx + dy * dy + dz * dz).sqrt()
}

fn yaw_delta(from: f64, to: f64) -> f64 {
    let mut d = to - from;
    while d > std::f64::consts::PI {
        d -= 2.0 * std::f64::consts::PI;
    }
    while d < -std::f64::consts::PI {
        d += 2.0 * std::f64::consts::PI;
    }
    d
}

/// Per-player statistical validator. Keeps no persistent store: state
/// lives only in this in-process map and is lost on restart.
#[derive(Debug, Default)]
pub struct Validator {
    profiles: HashMap<String, PlayerValidationProfile>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    fn profile_mut(&mut self, player_id: &str) -> &mut PlayerValidationProfile {
        self.profiles.entry(player_id.to_string()).or_default()
    }

    /// Validate a reported position/velocity/yaw update. Returns `false`
    /// if any high-severity rule fails; the caller (the room's match
    /// engine) decides whether to snap the player back, log, or finish
    /// the room.
    pub fn validate_position(&mut self, player_id: &str, update: PositionUpdate) -> bool {
        let profile = self.profile_mut(player_id);

        let Some(last) = profile.last_accepted else {
            profile.last_accepted = Some(update);
            return true;
        };

        let dt_ms = update.timestamp_ms.saturating_sub(last.timestamp_ms);
        if update.timestamp_ms <= last.timestamp_ms || dt_ms > MAX_RECONNECT_GAP_MS {
            // Δt <= 0 or > 1s: reconnect tolerance, accept without validation.
            profile.last_accepted = Some(update);
            return true;
        }
        let dt = dt_ms as f64 / 1000.0;

        let mut violations: Vec<Rule> = Vec::new();

        if update.velocity > MAX_VEL {
            violations.push(Rule::Velocity);
        }

        let dvel = (update.velocity - last.velocity).abs();
        if dt > 0.0 && dvel / dt > MAX_ACCEL {
            violations.push(Rule::Acceleration);
        }

        let dpos = distance(update.position, last.position);
        let jump_threshold = (MAX_VEL * dt * 1.5).max(MAX_JUMP);
        if dpos > jump_threshold {
            violations.push(Rule::PositionJump);
        }

        if dpos > TELEPORT_THRESH {
            violations.push(Rule::Teleport);
        }

        let dyaw = yaw_delta(last.yaw, update.yaw).abs();
        if dt > 0.0 && dyaw / dt > MAX_YAW_RATE {
            violations.push(Rule::YawRate);
        }

        if dpos < STUCK_THRESH && update.velocity > STUCK_VELOCITY_FLOOR {
            violations.push(Rule::Stuck);
        }

        let mut accepted = true;
        for rule in &violations {
            profile.record_violation(Violation { rule: *rule, timestamp_ms: update.timestamp_ms });
            if rule.fails_update() {
                accepted = false;
            }
        }

        if !violations.is_empty() {
            debug!(player_id, ?violations, "anti-cheat violation(s) recorded");
        }

        if accepted {
            profile.last_accepted = Some(update);
        }
        // A failed update must not update the baseline: the next update
        // is still compared against the last *accepted* state.
        accepted
    }

    /// Check the player's input rate over the trailing 1 second.
    pub fn validate_input_rate(&mut self, player_id: &str, timestamp_ms: u64) -> bool {
        let profile = self.profile_mut(player_id);
        profile.record_input(timestamp_ms);
        if profile.input_rate() > MAX_INPUT_RATE {
            profile.record_violation(Violation { rule: Rule::InputRate, timestamp_ms });
            false
        } else {
            true
        }
    }

    pub fn trust_score(&self, player_id: &str) -> f64 {
        self.profiles.get(player_id).map(|p| p.trust_score()).unwrap_or(1.0)
    }

    pub fn is_suspicious(&self, player_id: &str) -> bool {
        self.profiles.get(player_id).map(|p| p.suspicious).unwrap_or(false)
    }

    pub fn warning_count(&self, player_id: &str) -> u32 {
        self.profiles.get(player_id).map(|p| p.warning_count).unwrap_or(0)
    }

    pub fn reset(&mut self, player_id: &str) {
        self.profiles.remove(player_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(t: u64, pos: (f64, f64, f64), velocity: f64, yaw: f64) -> PositionUpdate {
        PositionUpdate { position: pos, yaw, velocity, timestamp_ms: t, on_track: true }
    }

    #[test]
    fn first_update_is_always_accepted() {
        let mut v = Validator::new();
        assert!(v.validate_position("p1", update(0, (0.0, 0.0, 0.0), 10.0, 0.0)));
        assert_eq!(v.trust_score("p1"), 1.0);
    }

    #[test]
    fn single_teleport_snaps_back_but_does_not_kick() {
        let mut v = Validator::new();
        v.validate_position("p1", update(0, (0.0, 0.0, 0.0), 10.0, 0.0));
        let accepted = v.validate_position("p1", update(100, (50.0, 0.0, 0.0), 10.0, 0.0));
        assert!(!accepted);
        assert!(!v.is_suspicious("p1"));
        assert_eq!(v.warning_count("p1"), 1);
    }

    #[test]
    fn three_velocity_violations_in_five_seconds_trip_suspicious() {
        let mut v = Validator::new();
        v.validate_position("p1", update(0, (0.0, 0.0, 0.0), 10.0, 0.0));
        for i in 1..=3u64 {
            let t = i * 1000;
            let accepted = v.validate_position("p1", update(t, (0.0, 0.0, 0.0), 40.0, 0.0));
            assert!(!accepted);
        }
        assert!(v.is_suspicious("p1"));
        assert_eq!(v.warning_count("p1"), 3);
    }

    #[test]
    fn failed_update_does_not_move_baseline() {
        let mut v = Validator::new();
        v.validate_position("p1", update(0, (0.0, 0.0, 0.0), 10.0, 0.0));
        // Teleport: rejected, baseline stays at origin.
        v.validate_position("p1", update(100, (50.0, 0.0, 0.0), 10.0, 0.0));
        // A small move from the *original* baseline should be accepted.
        let accepted = v.validate_position("p1", update(200, (0.2, 0.0, 0.0), 10.0, 0.0));
        assert!(accepted);
    }

    #[test]
    fn reconnect_gap_is_tolerated() {
        let mut v = Validator::new();
        v.validate_position("p1", update(0, (0.0, 0.0, 0.0), 10.0, 0.0));
        let accepted = v.validate_position("p1", update(5_000, (500.0, 0.0, 0.0), 10.0, 0.0));
        assert!(accepted);
    }

    #[test]
    fn input_rate_rejects_past_threshold() {
        let mut v = Validator::new();
        for i in 0..MAX_INPUT_RATE {
            assert!(v.validate_input_rate("p1", i as u64 * 10));
        }
        assert!(!v.validate_input_rate("p1", MAX_INPUT_RATE as u64 * 10 + 5));
    }

    #[test]
    fn reset_clears_profile() {
        let mut v = Validator::new();
        v.validate_position("p1", update(0, (0.0, 0.0, 0.0), 10.0, 0.0));
        v.reset("p1");
        assert_eq!(v.trust_score("p1"), 1.0);
        assert!(!v.is_suspicious("p1"));
    }
}
