use crate::types::SegmentFamily;

pub const MIN_STEPS: usize = 80;

/// Base parameters per segment family.
pub struct FamilyParams {
    pub nominal_length: f64,
    /// Unsigned total turn angle over the segment, radians. Zero for straights.
    pub turn_angle: f64,
    pub elevation_gain: f64,
    pub banking_strength: f64,
}

pub fn family_params(family: SegmentFamily) -> FamilyParams {
    match family {
        SegmentFamily::ShortStraight => FamilyParams { nominal_length: 40.0, turn_angle: 0.0, elevation_gain: 0.0, banking_strength: 0.0 },
        SegmentFamily::MediumStraight => FamilyParams { nominal_length: 90.0, turn_angle: 0.0, elevation_gain: 0.0, banking_strength: 0.0 },
        SegmentFamily::GentleCurve => FamilyParams { nominal_length: 60.0, turn_angle: std::f64::consts::FRAC_PI_8, elevation_gain: 1.0, banking_strength: 0.15 },
        SegmentFamily::MediumCurve => FamilyParams { nominal_length: 50.0, turn_angle: std::f64::consts::FRAC_PI_4, elevation_gain: 1.5, banking_strength: 0.3 },
        SegmentFamily::SharpCurve => FamilyParams { nominal_length: 40.0, turn_angle: std::f64::consts::PI / 2.2, elevation_gain: 2.0, banking_strength: 0.5 },
    }
}

/// Reference curvature used to normalise the banking formula
/// (`banking_strength * curvature / reference_curvature`), taken from the
/// medium curve family.
pub fn reference_curvature() -> f64 {
    let p = family_params(SegmentFamily::MediumCurve);
    p.turn_angle / p.nominal_length
}

/// A single local-space vertex of a blueprint, before direction mirroring
/// or world-space transform is applied. `x`/`z` are in the segment's own
/// frame (forward initially along `+z`, heading starts at 0); `y` is
/// elevation; `heading_delta` is the unsigned heading turned since the
/// segment start.
#[derive(Debug, Clone, Copy)]
pub struct LocalPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub heading_delta: f64,
    pub banking: f64,
    pub local_length: f64,
}

#[derive(Debug, Clone)]
pub struct Blueprint {
    pub family: SegmentFamily,
    pub length: f64,
    pub points: Vec<LocalPoint>,
}

const MAX_CURVATURE_PER_STEP: f64 = std::f64::consts::PI / 180.0; // 1 degree

/// Build the direction-agnostic (unsigned curvature) blueprint for a
/// family. Curve direction is applied later by mirroring `x`/`heading`,
/// so the same blueprint is reused across both left and right segments of
/// that family via translation/rotation.
pub fn build_blueprint(family: SegmentFamily) -> Blueprint {
    let params = family_params(family);
    let steps = MIN_STEPS.max((params.nominal_length.ceil() as usize).max(MIN_STEPS));
    let step_length = params.nominal_length / steps as f64;
    let ease_len = (12.0_f64).min(0.15 * params.nominal_length).max(step_length);
    let reference_curvature = reference_curvature();

    let mut points = Vec::with_capacity(steps + 1);
    let mut x = 0.0_f64;
    let mut y = 0.0_f64;
    let mut z = 0.0_f64;
    let mut heading = 0.0_f64;

    points.push(LocalPoint { x, y, z, heading_delta: heading, banking: 0.0, local_length: 0.0 });

    for i in 1..=steps {
        let s = i as f64 * step_length;
        let ease = if s < ease_len {
            0.5 * (1.0 - (std::f64::consts::PI * s / ease_len).cos())
        } else if s > params.nominal_length - ease_len {
            0.5 * (1.0 - (std::f64::consts::PI * (params.nominal_length - s) / ease_len).cos())
        } else {
            1.0
        };

        let curvature_rate = if params.nominal_length > 0.0 { params.turn_angle / params.nominal_length } else { 0.0 };
        let mut dtheta = curvature_rate * ease * step_length;
        if dtheta > MAX_CURVATURE_PER_STEP {
            dtheta = MAX_CURVATURE_PER_STEP;
        }
        heading += dtheta;

        x += heading.sin() * step_length;
        z += heading.cos() * step_length;

        let t = s / params.nominal_length;
        y = params.elevation_gain * t;

        let curvature = if step_length > 0.0 { dtheta / step_length } else { 0.0 };
        let banking = (params.banking_strength * (curvature / reference_curvature)).clamp(-1.0, 1.0);

        points.push(LocalPoint { x, y, z, heading_delta: heading, banking, local_length: s });
    }

    Blueprint { family, length: params.nominal_length, points }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blueprint_has_minimum_resolution() {
        for family in [
            SegmentFamily::ShortStraight,
            SegmentFamily::MediumStraight,
            SegmentFamily::GentleCurve,
            SegmentFamily::MediumCurve,
            SegmentFamily::SharpCurve,
        ] {
            let bp = build_blueprint(family);
            assert!(bp.points.len() >= MIN_STEPS + 1);
        }
    }

    #[test]
    fn straight_blueprint_has_no_lateral_drift() {
        let bp = build_blueprint(SegmentFamily::ShortStraight);
        for p in &bp.points {
            assert!(p.x.abs() < 1e-9);
        }
    }

    #[test]
    fn curve_blueprint_turns_toward_total_angle() {
        let bp = build_blueprint(SegmentFamily::MediumCurve);
        let params = family_params(SegmentFamily::MediumCurve);
        let last = bp.points.last().unwrap();
        assert!((last.heading_delta - params.turn_angle).abs() < 0.05);
    }
}
