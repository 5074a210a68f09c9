use crate::vec3::Vec3;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SegmentFamily {
    ShortStraight,
    MediumStraight,
    GentleCurve,
    MediumCurve,
    SharpCurve,
}

impl SegmentFamily {
    pub fn is_curve(self) -> bool {
        !matches!(self, SegmentFamily::ShortStraight | SegmentFamily::MediumStraight)
    }

    /// Treated as the "long straight" family for the mid-segment pinch and
    /// the long-straight-after-sharp-turn preference; only two straight
    /// kinds exist, so the longer of the two plays that role.
    pub fn is_long_straight(self) -> bool {
        matches!(self, SegmentFamily::MediumStraight)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    pub fn flipped(self) -> Direction {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    pub fn sign(self) -> f64 {
        match self {
            Direction::Left => 1.0,
            Direction::Right => -1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentKind {
    pub family: SegmentFamily,
    pub direction: Option<Direction>,
}

impl SegmentKind {
    pub fn straight(family: SegmentFamily) -> Self {
        Self { family, direction: None }
    }

    pub fn curve(family: SegmentFamily, direction: Direction) -> Self {
        Self { family, direction: Some(direction) }
    }
}

/// One vertex of a segment's centerline, in world space, plus enough data
/// to derive `Sample::forward`/`right` and the left/right edges at that
/// point.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TrackPoint {
    pub position: Vec3,
    pub heading: f64,
    pub width: f64,
    pub banking: f64,
    /// Arc length from the start of the segment.
    pub local_length: f64,
}

impl TrackPoint {
    pub fn forward(&self) -> Vec3 {
        Vec3::new(self.heading.sin(), 0.0, self.heading.cos())
    }

    pub fn right(&self) -> Vec3 {
        Vec3::new(self.heading.cos(), 0.0, -self.heading.sin())
    }

    pub fn left_edge(&self) -> Vec3 {
        self.position - self.right() * (self.width / 2.0)
    }

    pub fn right_edge(&self) -> Vec3 {
        self.position + self.right() * (self.width / 2.0)
    }
}

/// Result of `Track::sample_at`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Sample {
    pub position: Vec3,
    pub forward: Vec3,
    pub right: Vec3,
    pub width: f64,
    pub segment_id: u64,
}
