use crate::constants::*;
use crate::types::{PositionUpdate, Violation};
use std::collections::VecDeque;

/// Per-player state inside the validator. Cleared by `Validator::reset`
/// or when the player leaves all rooms.
#[derive(Debug, Clone)]
pub struct PlayerValidationProfile {
    pub last_accepted: Option<PositionUpdate>,
    pub input_timestamps: VecDeque<u64>,
    pub violations: VecDeque<Violation>,
    pub warning_count: u32,
    pub suspicious: bool,
}

impl Default for PlayerValidationProfile {
    fn default() -> Self {
        Self {
            last_accepted: None,
            input_timestamps: VecDeque::new(),
            violations: VecDeque::new(),
            warning_count: 0,
            suspicious: false,
        }
    }
}

impl PlayerValidationProfile {
    pub fn record_violation(&mut self, violation: Violation) {
        self.violations.push_back(violation);
        self.prune_violations(violation.timestamp_ms);
        self.warning_count += 1;
        if self.warning_count >= SUSPICIOUS_WARNING_THRESHOLD {
            self.suspicious = true;
        }
    }

    pub fn prune_violations(&mut self, now_ms: u64) {
        while let Some(front) = self.violations.front() {
            if now_ms.saturating_sub(front.timestamp_ms) > VALIDATION_WINDOW_MS {
                self.violations.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn record_input(&mut self, timestamp_ms: u64) {
        self.input_timestamps.push_back(timestamp_ms);
        while let Some(front) = self.input_timestamps.front() {
            if timestamp_ms.saturating_sub(*front) > INPUT_RATE_WINDOW_MS {
                self.input_timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn input_rate(&self) -> u32 {
        self.input_timestamps.len() as u32
    }

    pub fn trust_score(&self) -> f64 {
        let now_ms = self.last_accepted.map(|u| u.timestamp_ms).unwrap_or(0);
        let mut score = 1.0_f64;
        let mut historical_penalty = 0.0_f64;

        for violation in &self.violations {
            let age = now_ms.saturating_sub(violation.timestamp_ms);
            if age <= RECENT_WINDOW_MS {
                score -= 0.05;
            } else {
                historical_penalty += 0.02;
            }
        }

        score -= historical_penalty.min(HISTORICAL_DECAY_CAP);

        if self.suspicious {
            score -= 0.4;
        }

        score.clamp(0.0, 1.0)
    }
}
