//! Point generation used by visibility precomputation and smart sampling:
//! Fibonacci-lattice points on a sphere, uniform points in a box, the
//! analytic distance-from-desired-size formula, and angle-to-axis.

use nalgebra::Vector3;
use rand::Rng;

/// Generates `n` roughly-evenly-distributed points on the unit sphere using
/// the Fibonacci lattice construction.
pub fn fibonacci_sphere(n: usize) -> Vec<Vector3<f32>> {
    if n == 0 {
        return Vec::new();
    }
    let golden_angle = std::f32::consts::PI * (3.0 - 5.0f32.sqrt());
    (0..n)
        .map(|i| {
            let y = 1.0 - (i as f32 / (n.max(2) - 1) as f32) * 2.0;
            let radius_at_y = (1.0 - y * y).max(0.0).sqrt();
            let theta = golden_angle * i as f32;
            Vector3::new(theta.cos() * radius_at_y, y, theta.sin() * radius_at_y)
        })
        .collect()
}

/// A uniform-random point inside the axis-aligned box `[min, max]`.
pub fn random_point_in_box<R: Rng + ?Sized>(rng: &mut R, min: Vector3<f32>, max: Vector3<f32>) -> Vector3<f32> {
    Vector3::new(
        rng.gen_range(min.x..=max.x.max(min.x + f32::EPSILON)),
        rng.gen_range(min.y..=max.y.max(min.y + f32::EPSILON)),
        rng.gen_range(min.z..=max.z.max(min.z + f32::EPSILON)),
    )
}

/// The kind of on-screen size a [`crate::spline`] preference is expressed
/// over, mirroring the Size property's mode.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SizeMode {
    Area,
    Width,
    Height,
}

/// Converts a desired on-screen size `s` (interpreted per `mode`) and a
/// target of the given `radius` into the camera distance that would achieve
/// it at vertical field of view `fov_radians`, for a viewport of the given
/// `aspect` ratio (width / height).
///
/// `s` is expressed as a fraction of the viewport (area fraction, width
/// fraction, or height fraction, matching `mode`). Returns `None` when the
/// desired size or fov make the projection degenerate (e.g. `s <= 0`).
pub fn distance_from_size(s: f32, mode: SizeMode, fov_radians: f32, aspect: f32, radius: f32) -> Option<f32> {
    if s <= 0.0 || fov_radians <= 0.0 || radius <= 0.0 {
        return None;
    }

    let half_height_viewport = match mode {
        SizeMode::Height => s * 0.5,
        SizeMode::Width => (s * aspect) * 0.5,
        SizeMode::Area => (s * aspect / std::f32::consts::PI).max(0.0).sqrt(),
    };
    if half_height_viewport <= 0.0 {
        return None;
    }

    // A sphere of `radius` projects to a viewport half-height of
    // `projected_radius` at unit distance; `half_world` is the world-space
    // half-height implied by the desired viewport fraction, and distance is
    // recovered from the vertical FOV's half-angle tangent.
    let projected_radius = half_height_viewport;
    let half_world = radius * 0.5 / projected_radius;
    Some(half_world / (fov_radians * 0.5).tan())
}

/// The axis of a local coordinate frame against which [`angle_with_axis`]
/// measures an angle.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FrameAxis {
    Right,
    Up,
    Forward,
    WorldUp,
}

/// The angle in degrees, `[0,180]`, between `vector` and the named axis of a
/// local frame `(right, up, forward)`, with `world_up` supplied separately
/// since it need not be one of the frame's own basis vectors.
pub fn angle_with_axis(
    vector: Vector3<f32>,
    right: Vector3<f32>,
    up: Vector3<f32>,
    forward: Vector3<f32>,
    world_up: Vector3<f32>,
    axis: FrameAxis,
) -> f32 {
    let axis_vec = match axis {
        FrameAxis::Right => right,
        FrameAxis::Up => up,
        FrameAxis::Forward => forward,
        FrameAxis::WorldUp => world_up,
    };
    let vn = vector.try_normalize(f32::EPSILON).unwrap_or(Vector3::z());
    let an = axis_vec.try_normalize(f32::EPSILON).unwrap_or(Vector3::z());
    vn.dot(&an).clamp(-1.0, 1.0).acos().to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fibonacci_sphere_points_are_unit_length() {
        for p in fibonacci_sphere(50) {
            assert!((p.norm() - 1.0).abs() < 1.0e-4);
        }
    }

    #[test]
    fn fibonacci_sphere_empty_for_zero() {
        assert!(fibonacci_sphere(0).is_empty());
    }

    #[test]
    fn random_point_in_box_is_contained() {
        let mut rng = rand::thread_rng();
        let min = Vector3::new(-1.0, -2.0, -3.0);
        let max = Vector3::new(1.0, 2.0, 3.0);
        for _ in 0..100 {
            let p = random_point_in_box(&mut rng, min, max);
            assert!(p.x >= min.x && p.x <= max.x);
            assert!(p.y >= min.y && p.y <= max.y);
            assert!(p.z >= min.z && p.z <= max.z);
        }
    }

    #[test]
    fn distance_from_size_matches_known_projection() {
        // A unit-radius sphere filling half the viewport height at 90deg fov.
        let d = distance_from_size(1.0, SizeMode::Height, std::f32::consts::FRAC_PI_2, 1.0, 1.0).unwrap();
        assert!(d > 0.0);
        // Larger desired size => smaller distance.
        let d_larger = distance_from_size(1.9, SizeMode::Height, std::f32::consts::FRAC_PI_2, 1.0, 1.0).unwrap();
        assert!(d_larger < d);
    }

    #[test]
    fn distance_from_size_rejects_degenerate_input() {
        assert!(distance_from_size(0.0, SizeMode::Area, 1.0, 1.0, 1.0).is_none());
        assert!(distance_from_size(0.5, SizeMode::Area, 0.0, 1.0, 1.0).is_none());
    }

    #[test]
    fn angle_with_axis_parallel_is_zero() {
        let angle = angle_with_axis(
            Vector3::new(0.0, 0.0, 1.0),
            Vector3::x(),
            Vector3::y(),
            Vector3::z(),
            Vector3::y(),
            FrameAxis::Forward,
        );
        assert!(angle.abs() < 1.0e-3);
    }

    #[test]
    fn angle_with_axis_opposite_is_180() {
        let angle = angle_with_axis(
            Vector3::new(0.0, 0.0, -1.0),
            Vector3::x(),
            Vector3::y(),
            Vector3::z(),
            Vector3::y(),
            FrameAxis::Forward,
        );
        assert!((angle - 180.0).abs() < 1.0e-2);
    }
}
