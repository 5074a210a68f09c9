use crate::rng::Lcg;
use crate::types::{Direction, SegmentFamily, SegmentKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Straight,
    Curve,
}

/// Sequencing state driving the straight/curve alternation, turn-direction
/// inertia, and long-straight-after-sharp-turn preference.
#[derive(Debug, Clone)]
pub struct GeneratorState {
    phase: Phase,
    preferred_direction: Direction,
    last_was_sharp: bool,
}

impl GeneratorState {
    pub fn new(rng: &mut Lcg) -> Self {
        Self {
            phase: Phase::Straight,
            preferred_direction: if rng.chance(0.5) { Direction::Left } else { Direction::Right },
            last_was_sharp: false,
        }
    }

    pub fn next_kind(&mut self, rng: &mut Lcg) -> SegmentKind {
        match self.phase {
            Phase::Straight => {
                let long_straight_after_sharp = self.last_was_sharp && rng.chance(0.375);
                let family = if long_straight_after_sharp {
                    SegmentFamily::MediumStraight
                } else if rng.chance(0.5) {
                    SegmentFamily::ShortStraight
                } else {
                    SegmentFamily::MediumStraight
                };
                self.last_was_sharp = false;
                self.phase = Phase::Curve;
                SegmentKind::straight(family)
            }
            Phase::Curve => {
                if rng.chance(0.25) {
                    self.preferred_direction = self.preferred_direction.flipped();
                }
                let r = rng.next_f64();
                let family = if r < 0.4 {
                    SegmentFamily::GentleCurve
                } else if r < 0.75 {
                    SegmentFamily::MediumCurve
                } else {
                    SegmentFamily::SharpCurve
                };
                self.last_was_sharp = matches!(family, SegmentFamily::SharpCurve);

                // Curves alternate with at least one straight filler most of
                // the time, but occasionally chain directly into another curve.
                self.phase = if rng.chance(0.8) { Phase::Straight } else { Phase::Curve };

                SegmentKind::curve(family, self.preferred_direction)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_sequence_for_seed() {
        let mut rng_a = Lcg::new(42);
        let mut state_a = GeneratorState::new(&mut rng_a);
        let seq_a: Vec<_> = (0..50).map(|_| state_a.next_kind(&mut rng_a)).collect();

        let mut rng_b = Lcg::new(42);
        let mut state_b = GeneratorState::new(&mut rng_b);
        let seq_b: Vec<_> = (0..50).map(|_| state_b.next_kind(&mut rng_b)).collect();

        assert_eq!(seq_a.len(), seq_b.len());
        for (a, b) in seq_a.iter().zip(seq_b.iter()) {
            assert_eq!(a.family, b.family);
            assert_eq!(a.direction, b.direction);
        }
    }
}
