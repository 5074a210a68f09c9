use crate::blueprint::Blueprint;
use crate::types::{Direction, SegmentKind, TrackPoint};
use crate::vec3::Vec3;

pub const BASE_WIDTH: f64 = 12.0;
pub const MAX_ELEV_DELTA: f64 = 0.5;

#[derive(Debug, Clone)]
pub struct TrackSegment {
    pub id: u64,
    pub kind: SegmentKind,
    pub start_position: Vec3,
    pub start_heading: f64,
    pub cum_start: f64,
    pub cum_end: f64,
    pub points: Vec<TrackPoint>,
}

impl TrackSegment {
    pub fn length(&self) -> f64 {
        self.cum_end - self.cum_start
    }
}

fn rotate_into_world(local_x: f64, local_z: f64, start_heading: f64) -> (f64, f64) {
    let world_x = local_x * start_heading.cos() + local_z * start_heading.sin();
    let world_z = -local_x * start_heading.sin() + local_z * start_heading.cos();
    (world_x, world_z)
}

/// Build a world-space segment from a cached, direction-agnostic
/// blueprint. Applies: direction mirroring, rotate-by-start-heading +
/// translate-by-start-position, deterministic narrowing, the
/// long-straight mid-segment pinch, and seam welding against the
/// previous segment's last point.
pub fn build_segment(
    id: u64,
    kind: SegmentKind,
    start_position: Vec3,
    start_heading: f64,
    cum_start: f64,
    blueprint: &Blueprint,
    prev_last_point: Option<&TrackPoint>,
) -> TrackSegment {
    let sign = kind.direction.map(Direction::sign).unwrap_or(1.0);

    let narrowing_mult = if cum_start > 100.0 {
        (0.8_f64.powi((cum_start / 1000.0).floor() as i32)).max(0.5)
    } else {
        1.0
    };
    let is_long_straight = kind.family.is_long_straight();

    let mut points: Vec<TrackPoint> = blueprint
        .points
        .iter()
        .map(|lp| {
            let local_x = lp.x * sign;
            let local_z = lp.z;
            let (world_dx, world_dz) = rotate_into_world(local_x, local_z, start_heading);
            let world_heading = start_heading + lp.heading_delta * sign;

            let t = if blueprint.length > 0.0 { lp.local_length / blueprint.length } else { 0.0 };
            let pinch = if is_long_straight { 1.0 - 0.5 * (std::f64::consts::PI * t).sin() } else { 1.0 };
            let width = BASE_WIDTH * narrowing_mult * pinch;

            TrackPoint {
                position: start_position + Vec3::new(world_dx, lp.y, world_dz),
                heading: world_heading,
                width,
                banking: lp.banking * sign,
                local_length: lp.local_length,
            }
        })
        .collect();

    if let Some(prev) = prev_last_point {
        // The first vertex must coincide with the previous segment's last
        // vertex; the transform above already guarantees x/z continuity
        // since `start_position` is set to that same point. Re-affirm Y
        // explicitly and smooth the following points into it.
        if let Some(first) = points.first_mut() {
            first.position.y = prev.position.y;
        }

        let blend_count = points.len().min(8);
        for i in 1..blend_count {
            let delta = points[i].position.y - points[i - 1].position.y;
            if delta.abs() > MAX_ELEV_DELTA {
                points[i].position.y = points[i - 1].position.y + delta.signum() * MAX_ELEV_DELTA;
            }
        }

        // 3-tap moving average over the interior, past the blended join.
        if points.len() > blend_count + 1 {
            let ys: Vec<f64> = points.iter().map(|p| p.position.y).collect();
            for i in blend_count..points.len() - 1 {
                points[i].position.y = (ys[i - 1] + ys[i] + ys[i + 1]) / 3.0;
            }
        }
    }

    let length = blueprint.length;
    TrackSegment {
        id,
        kind,
        start_position,
        start_heading,
        cum_start,
        cum_end: cum_start + length,
        points,
    }
}
