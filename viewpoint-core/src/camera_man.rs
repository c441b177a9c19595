//! Camera Man: binds an abstract parameter vector to a concrete camera pose,
//! and owns the property tree and target list the aggregator evaluates
//! against (spec §4.5).

use nalgebra::Vector3;
use rand::Rng;
use viewpoint_math::Rect;

use crate::domain::{orbit_position, Domain, DomainKind};
use crate::error::ViewpointError;
use crate::log;
use crate::oracle::{CameraPose, SceneOracle};
use crate::property::{evaluate_property, OrientationMode, Property, PropertyKind, PropertyScratch};
use crate::target::Target;

const SMART_SAMPLE_RETRIES: u32 = 30;

pub struct CameraMan {
    pub domain: Domain,
    /// Index 0 is always the root aggregator (spec §3).
    pub properties: Vec<Property>,
    pub targets: Vec<Target>,
    pub clip: Rect,
    pub default_aspect: f32,

    scratch: Vec<PropertyScratch>,
    camera: CameraPose,
    smart_sample_giveups: u32,
}

impl CameraMan {
    pub fn new(domain: Domain, properties: Vec<Property>, targets: Vec<Target>) -> Self {
        let scratch = vec![PropertyScratch::default(); properties.len()];
        Self {
            domain,
            properties,
            targets,
            clip: Rect::full_viewport(),
            default_aspect: 16.0 / 9.0,
            scratch,
            camera: CameraPose::look_at(Vector3::zeros(), Vector3::new(0.0, 0.0, 1.0), 0.0, 60.0f32.to_radians(), 16.0 / 9.0),
            smart_sample_giveups: 0,
        }
    }

    pub fn camera(&self) -> &CameraPose {
        &self.camera
    }

    pub fn smart_sample_giveups(&self) -> u32 {
        self.smart_sample_giveups
    }

    /// Binds `params` to a concrete [`CameraPose`]. Accepts any prefix down
    /// to the position (3 components); missing suffix dimensions fall back
    /// to sensible defaults (spec §4.5).
    pub fn update(&mut self, params: &[f32]) -> Result<(), ViewpointError> {
        if params.len() < 3 {
            return Err(ViewpointError::TooFewParameters { got: params.len(), need: 3 });
        }

        self.camera = match &self.domain.kind {
            DomainKind::LookAt { fov_range, .. } => {
                let position = Vector3::new(params[0], params[1], params[2]);
                let lookat = if params.len() >= 6 {
                    Vector3::new(params[3], params[4], params[5])
                } else {
                    position + Vector3::new(0.0, 0.0, 1.0)
                };
                let roll = params.get(6).copied().unwrap_or(0.0);
                let fov = params.get(7).copied().unwrap_or((fov_range.min + fov_range.max) * 0.5);
                CameraPose::look_at(position, lookat, roll, fov, self.default_aspect)
            }
            DomainKind::Orbit { pivot, fov_range, .. } => {
                let distance = params[0];
                let theta = params.get(1).copied().unwrap_or(0.0);
                let phi = params.get(2).copied().unwrap_or(std::f32::consts::FRAC_PI_2);
                let roll = params.get(3).copied().unwrap_or(0.0);
                let fov = params.get(4).copied().unwrap_or((fov_range.min + fov_range.max) * 0.5);
                let position = orbit_position(*pivot, distance, theta, phi);
                CameraPose::look_at(position, *pivot, roll, fov, self.default_aspect)
            }
        };
        Ok(())
    }

    /// Resets all per-evaluation scratch, then evaluates the root aggregator
    /// (property index 0) against the currently bound camera. Returns the
    /// sentinel-encoded satisfaction (spec §9 open question: `Eval`
    /// internally, `f32` with `-1`/`-2` at this boundary).
    pub fn evaluate<O: SceneOracle + ?Sized>(&mut self, oracle: &O, lazy_threshold: f32, rng: &mut impl Rng) -> f32 {
        for target in self.targets.iter_mut() {
            target.reset_scratch();
        }
        for s in self.scratch.iter_mut() {
            *s = PropertyScratch::default();
        }
        if self.properties.is_empty() {
            return 0.0;
        }
        evaluate_property(
            &self.properties,
            &mut self.scratch,
            &mut self.targets,
            0,
            lazy_threshold,
            &self.camera,
            oracle,
            self.clip,
            rng,
        )
        .to_sentinel()
    }

    /// Per-property satisfaction and in-screen-ratio snapshot after a full
    /// (non-pruned) [`Self::evaluate`] call, for the Viewpoint output record
    /// (spec §6).
    pub fn snapshot(&self) -> (Vec<f32>, Vec<f32>) {
        let satisfactions = self
            .scratch
            .iter()
            .map(|s| s.satisfaction.map(|e| e.to_sentinel()).unwrap_or(-1.0))
            .collect();
        let ratios = self.scratch.iter().map(|s| s.in_screen_ratio).collect();
        (satisfactions, ratios)
    }

    pub fn in_domain<O: SceneOracle + ?Sized>(&self, params: &[f32], oracle: &O) -> bool {
        self.domain.in_domain(params, oracle)
    }

    pub fn in_domain_checked<O: SceneOracle + ?Sized>(&self, params: &[f32], oracle: &O, check_geometry: bool) -> bool {
        self.domain.in_domain_checked(params, oracle, check_geometry)
    }

    pub fn random_viewpoint(&self, rng: &mut impl Rng) -> Vec<f32> {
        self.domain.random_viewpoint(rng)
    }

    pub fn dimensions(&self) -> usize {
        self.domain.dimensions()
    }

    /// Sample a viewpoint biased toward satisfying `target_index`'s size and
    /// orientation properties, for PSO seeding (spec §4.5 "smart random
    /// viewpoint"). Falls back to a uniform sample after 30 failed retries,
    /// incrementing the give-up counter spec §9's open question calls for
    /// surfacing as a diagnostic. Design note §9 limits smart sampling to
    /// `LookAt` domains; `Orbit` always falls back immediately.
    pub fn smart_random_viewpoint<O: SceneOracle + ?Sized>(
        &mut self,
        target_index: usize,
        oracle: &O,
        rng: &mut impl Rng,
    ) -> Vec<f32> {
        if !matches!(self.domain.kind, DomainKind::LookAt { .. }) {
            self.smart_sample_giveups += 1;
            log::warn(format!(
                "smart_random_viewpoint: orbit domains can't be smart-sampled, falling back to uniform for target {target_index}"
            ));
            return self.domain.random_viewpoint(rng);
        }

        for _ in 0..SMART_SAMPLE_RETRIES {
            if let Some(params) = self.try_smart_sample(target_index, oracle, rng) {
                if self.domain.in_domain(&params, oracle) {
                    return params;
                }
            }
        }
        self.smart_sample_giveups += 1;
        log::warn(format!(
            "smart_random_viewpoint: exhausted {SMART_SAMPLE_RETRIES} retries for target {target_index}, falling back to a uniform sample"
        ));
        self.domain.random_viewpoint(rng)
    }

    fn try_smart_sample<O: SceneOracle + ?Sized>(
        &self,
        target_index: usize,
        oracle: &O,
        rng: &mut impl Rng,
    ) -> Option<Vec<f32>> {
        let (roll_range, fov_range) = match &self.domain.kind {
            DomainKind::LookAt { roll_range, fov_range, .. } => (*roll_range, *fov_range),
            DomainKind::Orbit { .. } => return None,
        };

        let target = self.targets.get(target_index)?;

        let size_property = target.referencing_properties.iter().find_map(|&i| match &self.properties.get(i)?.kind {
            PropertyKind::Size { targets, mode } if targets.first() == Some(&target_index) => Some((i, *mode)),
            _ => None,
        });
        let (size_idx, mode) = size_property?;
        let desired_size = self.properties[size_idx].sat_function.sample_x(rng);

        let fov = fov_range.sample(rng);
        let radius = target.bounding_sphere_radius().max(1.0e-3);
        let distance = viewpoint_math::distance_from_size(desired_size, mode, fov, self.default_aspect, radius)?;
        if !distance.is_finite() || distance <= 0.0 {
            return None;
        }

        let (right, _up, forward, world_up) = oracle.local_axes(target.frame_object);

        let elevation_deg = target
            .referencing_properties
            .iter()
            .find_map(|&i| match &self.properties.get(i)?.kind {
                PropertyKind::Orientation {
                    target: t,
                    mode: OrientationMode::VerticalWorld,
                } if *t == target_index => Some(self.properties[i].sat_function.sample_x(rng)),
                _ => None,
            })
            .unwrap_or(90.0);
        let azimuth_deg = target
            .referencing_properties
            .iter()
            .find_map(|&i| match &self.properties.get(i)?.kind {
                PropertyKind::Orientation {
                    target: t,
                    mode: OrientationMode::HorizontalLocal,
                } if *t == target_index => Some(self.properties[i].sat_function.sample_x(rng)),
                _ => None,
            })
            .unwrap_or_else(|| rng.gen_range(0.0..360.0));

        let elevation = elevation_deg.to_radians();
        let azimuth = azimuth_deg.to_radians();
        let direction = (world_up * elevation.cos() + (forward * azimuth.cos() + right * azimuth.sin()) * elevation.sin()).normalize();

        let center = target.aabb().center();
        let position = center + direction * distance;
        let roll = roll_range.sample(rng);

        Some(vec![position.x, position.y, position.z, center.x, center.y, center.z, roll, fov])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Box3, Range};
    use crate::test_support::MockOracle;
    use viewpoint_math::{SatSpline, SizeMode};

    fn simple_camera_man() -> (CameraMan, MockOracle) {
        let mut oracle = MockOracle::new();
        let id = oracle.add_box(Vector3::zeros(), Vector3::new(2.0, 2.0, 2.0));

        let mut target = Target::new("cube", id, vec![id], vec![]);
        let mut rng = rand::thread_rng();
        target.update_bounds(&oracle, &mut rng);

        let size_spline = SatSpline::new(&[0.0, 0.25, 1.0], &[0.0, 1.0, 0.0]).unwrap();
        let size_property = Property::new("size", vec![0], 1.0, size_spline, PropertyKind::Size { targets: vec![0], mode: SizeMode::Area });
        let root = Property::aggregation("root", vec![1], &[1.0]).unwrap();

        let domain = Domain::look_at(
            Box3::new(Vector3::new(-10.0, -10.0, -10.0), Vector3::new(10.0, 10.0, 10.0)),
            Box3::new(Vector3::new(-1.0, -1.0, -1.0), Vector3::new(1.0, 1.0, 1.0)),
            Range::new(0.0, 0.0),
            Range::new(0.5, 1.5),
        );

        let mut camera_man = CameraMan::new(domain, vec![root, size_property], vec![target]);
        camera_man.targets[0].referencing_properties.push(1);
        (camera_man, oracle)
    }

    #[test]
    fn update_rejects_too_few_parameters() {
        let (mut camera_man, _oracle) = simple_camera_man();
        let err = camera_man.update(&[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, ViewpointError::TooFewParameters { got: 2, need: 3 }));
    }

    #[test]
    fn evaluate_returns_valid_satisfaction_in_range() {
        let (mut camera_man, oracle) = simple_camera_man();
        let mut rng = rand::thread_rng();
        camera_man.update(&[0.0, 0.0, -5.0, 0.0, 0.0, 0.0, 0.0, 1.0]).unwrap();
        let value = camera_man.evaluate(&oracle, f32::NEG_INFINITY, &mut rng);
        assert!((0.0..=1.0).contains(&value), "value={value}");
    }

    #[test]
    fn smart_random_viewpoint_falls_back_after_retries_when_infeasible() {
        let (mut camera_man, oracle) = simple_camera_man();
        // Shrink the position box so no smart sample can possibly land
        // inside it, forcing the 30-retry fallback.
        camera_man.domain = Domain::look_at(
            Box3::new(Vector3::new(1000.0, 1000.0, 1000.0), Vector3::new(1000.1, 1000.1, 1000.1)),
            Box3::new(Vector3::new(-1.0, -1.0, -1.0), Vector3::new(1.0, 1.0, 1.0)),
            Range::new(0.0, 0.0),
            Range::new(0.5, 1.5),
        );
        let mut rng = rand::thread_rng();
        let before = camera_man.smart_sample_giveups();
        let params = camera_man.smart_random_viewpoint(0, &oracle, &mut rng);
        assert_eq!(params.len(), 8);
        assert_eq!(camera_man.smart_sample_giveups(), before + 1);
    }
}
