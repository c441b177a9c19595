//! Problem Domain: the bounded hyper-rectangle candidate parameter vectors
//! must satisfy (spec §3, §4.4).

use nalgebra::Vector3;
use rand::Rng;

use crate::oracle::{LayerMask, SceneOracle};

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Range {
    pub min: f32,
    pub max: f32,
}

impl Range {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, v: f32) -> bool {
        v >= self.min && v <= self.max
    }

    pub fn sample(&self, rng: &mut impl Rng) -> f32 {
        if self.max <= self.min {
            self.min
        } else {
            rng.gen_range(self.min..=self.max)
        }
    }

    pub fn span(&self) -> f32 {
        (self.max - self.min).max(0.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Box3 {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
}

impl Box3 {
    pub fn new(min: Vector3<f32>, max: Vector3<f32>) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, p: Vector3<f32>) -> bool {
        (0..3).all(|i| p[i] >= self.min[i] && p[i] <= self.max[i])
    }

    pub fn sample(&self, rng: &mut impl Rng) -> Vector3<f32> {
        viewpoint_math::random_point_in_box(rng, self.min, self.max)
    }
}

/// The two camera-parameterization variants spec §3/§4.5 names. Shared
/// fields (`min_geometry_clearance`, `layers_to_exclude`) live on the
/// enclosing [`Domain`] rather than duplicated per-variant.
pub enum DomainKind {
    LookAt {
        pos_box: Box3,
        lookat_box: Box3,
        roll_range: Range,
        fov_range: Range,
    },
    Orbit {
        pivot: Vector3<f32>,
        distance_range: Range,
        theta_range: Range,
        phi_range: Range,
        roll_range: Range,
        fov_range: Range,
    },
}

pub struct Domain {
    pub kind: DomainKind,
    pub min_geometry_clearance: f32,
    pub layers_to_exclude: LayerMask,
}

impl Domain {
    pub fn look_at(pos_box: Box3, lookat_box: Box3, roll_range: Range, fov_range: Range) -> Self {
        Self {
            kind: DomainKind::LookAt {
                pos_box,
                lookat_box,
                roll_range,
                fov_range,
            },
            min_geometry_clearance: 0.0,
            layers_to_exclude: 0,
        }
    }

    pub fn orbit(
        pivot: Vector3<f32>,
        distance_range: Range,
        theta_range: Range,
        phi_range: Range,
        roll_range: Range,
        fov_range: Range,
    ) -> Self {
        Self {
            kind: DomainKind::Orbit {
                pivot,
                distance_range,
                theta_range,
                phi_range,
                roll_range,
                fov_range,
            },
            min_geometry_clearance: 0.0,
            layers_to_exclude: 0,
        }
    }

    /// Parameter-vector dimensionality for this variant: `LookAt` spans
    /// `[px,py,pz, lx,ly,lz, roll, fov]` (8), `Orbit` spans
    /// `[distance, theta, phi, roll, fov]` (5).
    pub fn dimensions(&self) -> usize {
        match self.kind {
            DomainKind::LookAt { .. } => 8,
            DomainKind::Orbit { .. } => 5,
        }
    }

    /// Checks membership, per spec §4.4's ordered list of partial checks —
    /// a short parameter vector (as accepted by the camera-man binding) only
    /// checks the dimensions it actually carries.
    pub fn in_domain<O: SceneOracle + ?Sized>(&self, params: &[f32], oracle: &O) -> bool {
        self.in_domain_checked(params, oracle, true)
    }

    /// As [`Self::in_domain`], but lets the caller skip the
    /// `min_geometry_clearance` test for this call (the solver's
    /// `check_geometry` parameter, spec §6).
    pub fn in_domain_checked<O: SceneOracle + ?Sized>(&self, params: &[f32], oracle: &O, check_geometry: bool) -> bool {
        match &self.kind {
            DomainKind::LookAt {
                pos_box,
                lookat_box,
                roll_range,
                fov_range,
            } => {
                if params.len() < 3 {
                    return false;
                }
                let pos = Vector3::new(params[0], params[1], params[2]);
                if !pos_box.contains(pos) {
                    return false;
                }
                if params.len() >= 6 {
                    let lookat = Vector3::new(params[3], params[4], params[5]);
                    if !lookat_box.contains(lookat) {
                        return false;
                    }
                }
                if params.len() >= 7 && !roll_range.contains(params[6]) {
                    return false;
                }
                if params.len() >= 8 && !fov_range.contains(params[7]) {
                    return false;
                }
                !check_geometry || self.geometry_clearance_ok(pos, oracle)
            }
            DomainKind::Orbit {
                distance_range,
                theta_range,
                phi_range,
                roll_range,
                fov_range,
                pivot,
            } => {
                if params.is_empty() || !distance_range.contains(params[0]) {
                    return false;
                }
                if params.len() >= 2 && !theta_range.contains(params[1]) {
                    return false;
                }
                if params.len() >= 3 && !phi_range.contains(params[2]) {
                    return false;
                }
                if params.len() >= 4 && !roll_range.contains(params[3]) {
                    return false;
                }
                if params.len() >= 5 && !fov_range.contains(params[4]) {
                    return false;
                }
                if params.len() >= 3 {
                    let pos = orbit_position(*pivot, params[0], params[1], params[2]);
                    return !check_geometry || self.geometry_clearance_ok(pos, oracle);
                }
                true
            }
        }
    }

    fn geometry_clearance_ok<O: SceneOracle + ?Sized>(&self, pos: Vector3<f32>, oracle: &O) -> bool {
        if self.min_geometry_clearance <= 0.0 {
            return true;
        }
        !oracle.sphere_overlap(pos, self.min_geometry_clearance, self.layers_to_exclude)
    }

    /// Uniform-independent sample per dimension (spec §4.4).
    pub fn random_viewpoint(&self, rng: &mut impl Rng) -> Vec<f32> {
        match &self.kind {
            DomainKind::LookAt {
                pos_box,
                lookat_box,
                roll_range,
                fov_range,
            } => {
                let p = pos_box.sample(rng);
                let l = lookat_box.sample(rng);
                vec![p.x, p.y, p.z, l.x, l.y, l.z, roll_range.sample(rng), fov_range.sample(rng)]
            }
            DomainKind::Orbit {
                distance_range,
                theta_range,
                phi_range,
                roll_range,
                fov_range,
                ..
            } => vec![
                distance_range.sample(rng),
                theta_range.sample(rng),
                phi_range.sample(rng),
                roll_range.sample(rng),
                fov_range.sample(rng),
            ],
        }
    }

    /// Per-dimension `[min, max]`, used by the solver to size velocity
    /// clamps (spec §4.6 `ranges[D]`).
    pub fn ranges(&self) -> Vec<Range> {
        match &self.kind {
            DomainKind::LookAt {
                pos_box,
                lookat_box,
                roll_range,
                fov_range,
            } => vec![
                Range::new(pos_box.min.x, pos_box.max.x),
                Range::new(pos_box.min.y, pos_box.max.y),
                Range::new(pos_box.min.z, pos_box.max.z),
                Range::new(lookat_box.min.x, lookat_box.max.x),
                Range::new(lookat_box.min.y, lookat_box.max.y),
                Range::new(lookat_box.min.z, lookat_box.max.z),
                *roll_range,
                *fov_range,
            ],
            DomainKind::Orbit {
                distance_range,
                theta_range,
                phi_range,
                roll_range,
                fov_range,
                ..
            } => vec![*distance_range, *theta_range, *phi_range, *roll_range, *fov_range],
        }
    }
}

/// Converts orbit spherical coordinates `(distance, theta, phi)` about
/// `pivot` into a world position. `theta` is the azimuth about world-up,
/// `phi` the polar angle from world-up, both in radians.
pub fn orbit_position(pivot: Vector3<f32>, distance: f32, theta: f32, phi: f32) -> Vector3<f32> {
    let (sin_phi, cos_phi) = phi.sin_cos();
    let (sin_theta, cos_theta) = theta.sin_cos();
    pivot
        + Vector3::new(
            distance * sin_phi * cos_theta,
            distance * cos_phi,
            distance * sin_phi * sin_theta,
        )
}
