use driftrace_core::domain::{Position, UserId};
use driftrace_track::{Sample, Track};
use std::collections::HashMap;

pub const OFF_TRACK_GRACE: f64 = 0.8;
pub const COLLISION_RADIUS: f64 = 1.2;
pub const FADE_DURATION: f64 = 2.0;
/// Slack added to half the track width when clamping a player's
/// reported lateral offset, so a car hugging the edge isn't snapped
/// inward before the off-track grace timer has a chance to apply.
pub const LATERAL_MARGIN: f64 = 0.5;

fn lateral_offset(position: Position, sample: &Sample) -> f64 {
    let dx = position.x - sample.position.x;
    let dy = position.y - sample.position.y;
    let dz = position.z - sample.position.z;
    dx * sample.right.x + dy * sample.right.y + dz * sample.right.z
}

/// Per-player physics bookkeeping that has no place in the wire-level
/// `RoomPlayer` snapshot: how long a player has been continuously off
/// track, and how far along its opacity fade it has progressed.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlayerRuntime {
    off_track_elapsed: f64,
    fade_elapsed: f64,
}

#[derive(Debug, Default)]
pub struct PhysicsState {
    runtime: HashMap<UserId, PlayerRuntime>,
}

impl PhysicsState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remove(&mut self, player_id: &str) {
        self.runtime.remove(player_id);
    }

    /// Advance off-track timers for every live player and return the ids
    /// that have exceeded `OFF_TRACK_GRACE`. Players the track hasn't
    /// been extended far enough to sample are treated as on-track (no
    /// engine data to judge them against yet).
    pub fn advance_off_track(&mut self, track: &Track, players: &[(UserId, Position, f64)], dt: f64) -> Vec<UserId> {
        let mut eliminated = Vec::new();
        for (player_id, position, distance) in players {
            let runtime = self.runtime.entry(player_id.clone()).or_default();
            let Some(sample) = track.sample_at(*distance) else {
                runtime.off_track_elapsed = 0.0;
                continue;
            };
            let offset = lateral_offset(*position, &sample).abs();
            if offset > sample.width / 2.0 {
                runtime.off_track_elapsed += dt;
                if runtime.off_track_elapsed > OFF_TRACK_GRACE {
                    eliminated.push(player_id.clone());
                }
            } else {
                runtime.off_track_elapsed = 0.0;
            }
        }
        eliminated
    }

    /// Rear-end collisions: any pair of live players whose positions put
    /// them within `COLLISION_RADIUS` of each other both longitudinally
    /// (distance along track) and laterally. The trailing player
    /// (smaller `distance`) is eliminated; a tie is broken by the lower
    /// player id.
    pub fn check_collisions(&self, track: &Track, players: &[(UserId, Position, f64)]) -> Vec<UserId> {
        let mut laterals: Vec<(&UserId, f64, f64)> = Vec::new();
        for (player_id, position, distance) in players {
            if let Some(sample) = track.sample_at(*distance) {
                laterals.push((player_id, *distance, lateral_offset(*position, &sample)));
            }
        }

        let mut eliminated = Vec::new();
        for i in 0..laterals.len() {
            for j in (i + 1)..laterals.len() {
                let (id_a, dist_a, lat_a) = laterals[i];
                let (id_b, dist_b, lat_b) = laterals[j];
                if (dist_a - dist_b).abs() > COLLISION_RADIUS || (lat_a - lat_b).abs() > COLLISION_RADIUS {
                    continue;
                }
                let loser = match dist_a.partial_cmp(&dist_b) {
                    Some(std::cmp::Ordering::Less) => id_a,
                    Some(std::cmp::Ordering::Greater) => id_b,
                    _ => id_a.min(id_b),
                };
                eliminated.push(loser.clone());
            }
        }
        eliminated
    }

    /// Advance the opacity fade for an eliminated player and return the
    /// new opacity in `[0, 1]`.
    pub fn advance_fade(&mut self, player_id: &str, dt: f64) -> f64 {
        let runtime = self.runtime.entry(player_id.to_string()).or_default();
        runtime.fade_elapsed = (runtime.fade_elapsed + dt).min(FADE_DURATION);
        (1.0 - runtime.fade_elapsed / FADE_DURATION).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftrace_track::Track;

    fn track() -> Track {
        let mut t = Track::new(42);
        t.ensure_distance(500.0);
        t
    }

    #[test]
    fn on_track_player_resets_timer() {
        let track = track();
        let mut state = PhysicsState::new();
        let sample = track.sample_at(10.0).unwrap();
        let on_track_pos = sample.position;
        let eliminated = state.advance_off_track(&track, &[("p1".to_string(), on_track_pos, 10.0)], 1.0);
        assert!(eliminated.is_empty());
    }

    #[test]
    fn sustained_off_track_eliminates_after_grace() {
        let track = track();
        let mut state = PhysicsState::new();
        let sample = track.sample_at(10.0).unwrap();
        let far_off = Position {
            x: sample.position.x + sample.right.x * 1000.0,
            y: sample.position.y,
            z: sample.position.z + sample.right.z * 1000.0,
        };
        let players = vec![("p1".to_string(), far_off, 10.0)];
        assert!(state.advance_off_track(&track, &players, 0.5).is_empty());
        let eliminated = state.advance_off_track(&track, &players, 0.5);
        assert_eq!(eliminated, vec!["p1".to_string()]);
    }

    #[test]
    fn collision_eliminates_trailing_player() {
        let track = track();
        let state = PhysicsState::new();
        let sample = track.sample_at(50.0).unwrap();
        let players = vec![
            ("leader".to_string(), sample.position, 51.0),
            ("trailer".to_string(), sample.position, 50.0),
        ];
        let eliminated = state.check_collisions(&track, &players);
        assert_eq!(eliminated, vec!["trailer".to_string()]);
    }

    #[test]
    fn fade_reaches_zero_opacity_after_duration() {
        let mut state = PhysicsState::new();
        state.advance_fade("p1", 1.0);
        let opacity = state.advance_fade("p1", 1.0);
        assert_eq!(opacity, 0.0);
    }
}
