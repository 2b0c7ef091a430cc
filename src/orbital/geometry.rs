//! Orbit curves and easing functions
//!
//! Everything here is a pure function of its inputs. The body simulation relies on
//! that: the nominal position for a given phase must be reproducible frame after frame.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::f32::consts::{PI, TAU};

/// Roundness is clamped below 1.0 so the squircle never collapses onto its four corners.
pub const MAX_SQUIRCLE_ROUNDNESS: f32 = 0.98;

/// Step used for the numerical squircle tangent
const TANGENT_EPSILON: f32 = 1e-3;

/// Candidate count for the coarse nearest-phase scan
pub const NEAREST_PHASE_SAMPLES: usize = 128;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrbitShape {
    #[default]
    Circle,
    Squircle,
}

impl OrbitShape {
    /// Lenient parse used for API strings; anything unknown is a circle.
    pub fn from_api(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "squircle" => OrbitShape::Squircle,
            _ => OrbitShape::Circle,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrbitShape::Circle => "circle",
            OrbitShape::Squircle => "squircle",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Easing {
    #[default]
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
}

/// Shape parameters of one orbit
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrbitCurve {
    pub radius: f32,
    pub shape: OrbitShape,
    pub roundness: f32,
    pub vertical_offset: f32,
}

impl OrbitCurve {
    pub fn circle(radius: f32) -> Self {
        Self {
            radius,
            shape: OrbitShape::Circle,
            roundness: 0.0,
            vertical_offset: 0.0,
        }
    }

    pub fn position(&self, phase: f32) -> Vec3 {
        orbit_position(
            phase,
            self.radius,
            self.shape,
            self.roundness,
            self.vertical_offset,
        )
    }

    pub fn tangent(&self, phase: f32) -> Vec3 {
        orbit_tangent(phase, self.radius, self.shape, self.roundness)
    }
}

/// Sign that maps zero to zero (`f32::signum` maps +0.0 to 1.0).
fn sign(value: f32) -> f32 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Position on an orbit lying in the horizontal plane `y = vertical_offset`.
///
/// For a squircle, `roundness = 0` is a circle and values towards 1 square it off.
pub fn orbit_position(
    phase: f32,
    radius: f32,
    shape: OrbitShape,
    roundness: f32,
    vertical_offset: f32,
) -> Vec3 {
    let (sin, cos) = phase.sin_cos();
    match shape {
        OrbitShape::Circle => Vec3::new(cos * radius, vertical_offset, sin * radius),
        OrbitShape::Squircle => {
            let exponent = 1.0 - roundness.clamp(0.0, MAX_SQUIRCLE_ROUNDNESS);
            Vec3::new(
                radius * sign(cos) * cos.abs().powf(exponent),
                vertical_offset,
                radius * sign(sin) * sin.abs().powf(exponent),
            )
        }
    }
}

/// Unit direction of travel along the orbit at `phase` (increasing phase).
pub fn orbit_tangent(phase: f32, radius: f32, shape: OrbitShape, roundness: f32) -> Vec3 {
    let analytic = Vec3::new(-phase.sin(), 0.0, phase.cos());
    match shape {
        OrbitShape::Circle => analytic,
        OrbitShape::Squircle => {
            let ahead = orbit_position(phase + TANGENT_EPSILON, radius, shape, roundness, 0.0);
            let behind = orbit_position(phase - TANGENT_EPSILON, radius, shape, roundness, 0.0);
            // Zero radius gives a zero difference; keep the circle direction then.
            (ahead - behind).try_normalize().unwrap_or(analytic)
        }
    }
}

/// Phase on `curve` whose point is closest to `point`.
///
/// A coarse scan over [`NEAREST_PHASE_SAMPLES`] candidates is refined by a ternary
/// search inside the winning bracket, so a point already on the orbit maps back onto
/// itself without a visible jump. The result lies in `[0, TAU)`.
pub fn nearest_phase(point: Vec3, curve: &OrbitCurve) -> f32 {
    let distance = |phase: f32| curve.position(phase).distance_squared(point);
    let step = TAU / NEAREST_PHASE_SAMPLES as f32;

    let mut best = 0.0;
    let mut best_distance = f32::INFINITY;
    for i in 0..NEAREST_PHASE_SAMPLES {
        let phase = i as f32 * step;
        let d = distance(phase);
        if d < best_distance {
            best_distance = d;
            best = phase;
        }
    }

    let mut lo = best - step;
    let mut hi = best + step;
    for _ in 0..40 {
        let m1 = lo + (hi - lo) / 3.0;
        let m2 = hi - (hi - lo) / 3.0;
        if distance(m1) < distance(m2) {
            hi = m2;
        } else {
            lo = m1;
        }
    }
    let refined = (lo + hi) * 0.5;
    let phase = if distance(refined) <= best_distance {
        refined
    } else {
        best
    };
    phase.rem_euclid(TAU)
}

/// Map `t` in [0, 1] through an easing curve. Inputs outside the range are clamped.
pub fn apply_easing(t: f32, easing: Easing) -> f32 {
    let t = t.clamp(0.0, 1.0);
    match easing {
        Easing::Linear => t,
        Easing::EaseIn => t * t * t,
        Easing::EaseOut => 1.0 - (1.0 - t).powi(3),
        Easing::EaseInOut => {
            if t < 0.5 {
                4.0 * t * t * t
            } else {
                1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
            }
        }
    }
}

/// Smallest absolute distance between two angles, in [0, PI].
pub fn angle_distance(a: f32, b: f32) -> f32 {
    let d = (a - b).rem_euclid(TAU);
    if d > PI { TAU - d } else { d }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    const EASINGS: [Easing; 4] = [
        Easing::Linear,
        Easing::EaseIn,
        Easing::EaseOut,
        Easing::EaseInOut,
    ];

    #[test]
    fn test_circle_phase_zero_lies_on_x_axis() {
        let p = orbit_position(0.0, 5.0, OrbitShape::Circle, 0.0, 0.0);
        assert_relative_eq!(p.x, 5.0, epsilon = 1e-6);
        assert_relative_eq!(p.y, 0.0);
        assert_relative_eq!(p.z, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_squircle_is_squarer_than_circle_on_diagonal() {
        let phase = PI / 4.0;
        let circle = orbit_position(phase, 10.0, OrbitShape::Circle, 0.0, 0.0);
        let squircle = orbit_position(phase, 10.0, OrbitShape::Squircle, 0.8, 0.0);
        assert!(
            squircle.length() > circle.length(),
            "diagonal of a squircle should bulge past the circle: {} vs {}",
            squircle.length(),
            circle.length()
        );
    }

    #[test]
    fn test_squircle_axis_points_match_circle() {
        for phase in [0.0, PI / 2.0, PI, 3.0 * PI / 2.0] {
            let circle = orbit_position(phase, 7.0, OrbitShape::Circle, 0.0, 1.0);
            let squircle = orbit_position(phase, 7.0, OrbitShape::Squircle, 0.7, 1.0);
            assert!(circle.distance(squircle) < 1e-4, "phase {phase}");
        }
    }

    #[test]
    fn test_circle_tangent_is_analytic() {
        let t = orbit_tangent(0.0, 3.0, OrbitShape::Circle, 0.0);
        assert_relative_eq!(t.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(t.z, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_zero_radius_squircle_tangent_falls_back() {
        let t = orbit_tangent(1.0, 0.0, OrbitShape::Squircle, 0.5);
        assert!(t.is_finite());
        assert_relative_eq!(t.length(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_nearest_phase_recovers_point_on_orbit() {
        let curve = OrbitCurve {
            radius: 8.0,
            shape: OrbitShape::Squircle,
            roundness: 0.6,
            vertical_offset: 0.5,
        };
        for phase in [0.3_f32, 1.7, 2.9, 4.4, 6.0] {
            let point = curve.position(phase);
            let found = nearest_phase(point, &curve);
            assert!(
                curve.position(found).distance(point) < 1e-3,
                "phase {phase} recovered as {found}"
            );
        }
    }

    #[test]
    fn test_easing_endpoints() {
        for easing in EASINGS {
            assert_eq!(apply_easing(0.0, easing), 0.0, "{easing:?}");
            assert_relative_eq!(apply_easing(1.0, easing), 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_easing_clamps_out_of_range() {
        assert_eq!(apply_easing(-1.0, Easing::EaseOut), 0.0);
        assert_relative_eq!(apply_easing(3.0, Easing::EaseIn), 1.0);
    }

    #[test]
    fn test_angle_distance_wraps() {
        assert_relative_eq!(angle_distance(0.1, TAU - 0.1), 0.2, epsilon = 1e-5);
        assert_relative_eq!(angle_distance(PI, 0.0), PI, epsilon = 1e-6);
    }

    #[test]
    fn test_shape_from_api_is_lenient() {
        assert_eq!(OrbitShape::from_api("SQUIRCLE"), OrbitShape::Squircle);
        assert_eq!(OrbitShape::from_api(""), OrbitShape::Circle);
        assert_eq!(OrbitShape::from_api("hexagon"), OrbitShape::Circle);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn prop_circle_keeps_height_and_radius(
            phase in -20.0f32..20.0,
            radius in 0.1f32..50.0,
            y in -10.0f32..10.0,
        ) {
            let p = orbit_position(phase, radius, OrbitShape::Circle, 0.3, y);
            prop_assert_eq!(p.y, y);
            let horizontal = Vec2::new(p.x, p.z).length();
            prop_assert!((horizontal - radius).abs() < radius * 1e-5 + 1e-5);
        }

        #[test]
        fn prop_orbit_position_is_pure(
            phase in -20.0f32..20.0,
            radius in 0.0f32..50.0,
            roundness in 0.0f32..1.0,
        ) {
            let a = orbit_position(phase, radius, OrbitShape::Squircle, roundness, 2.0);
            let b = orbit_position(phase, radius, OrbitShape::Squircle, roundness, 2.0);
            prop_assert_eq!(a, b);
        }

        #[test]
        fn prop_squircle_roundness_zero_is_circle(phase in -20.0f32..20.0, radius in 0.1f32..50.0) {
            let circle = orbit_position(phase, radius, OrbitShape::Circle, 0.0, 0.0);
            let squircle = orbit_position(phase, radius, OrbitShape::Squircle, 0.0, 0.0);
            prop_assert!(circle.distance(squircle) < radius * 1e-5 + 1e-5);
        }

        #[test]
        fn prop_orbit_is_periodic(
            phase in -10.0f32..10.0,
            radius in 0.1f32..30.0,
            roundness in 0.0f32..1.0,
        ) {
            let a = orbit_position(phase, radius, OrbitShape::Squircle, roundness, 0.0);
            let b = orbit_position(phase + TAU, radius, OrbitShape::Squircle, roundness, 0.0);
            prop_assert!(a.distance(b) < radius * 1e-3);
        }

        #[test]
        fn prop_squircle_is_continuous(
            phase in 0.0f32..TAU,
            radius in 1.0f32..30.0,
            roundness in 0.0f32..0.5,
        ) {
            let a = orbit_position(phase, radius, OrbitShape::Squircle, roundness, 0.0);
            let b = orbit_position(phase + 1e-4, radius, OrbitShape::Squircle, roundness, 0.0);
            // Even crossing an axis, a small step moves at most |1e-4|^(1 - roundness).
            prop_assert!(a.distance(b) < radius * 0.05);
        }

        #[test]
        fn prop_easing_monotonic(a in 0.0f32..1.0, b in 0.0f32..1.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            for easing in EASINGS {
                prop_assert!(apply_easing(lo, easing) <= apply_easing(hi, easing) + 1e-6);
            }
        }
    }
}
