//! Targets: named scene objects with derived bounds, precomputed visibility
//! points, and the per-camera projection/framing/occlusion machinery that
//! properties read from (spec §3, §4.1).

use nalgebra::{Vector2, Vector3};
use rand::Rng;
use viewpoint_math::{
    polygon::{bounds_of, order_convex_points, polygon_area, sutherland_hodgman_clip},
    AxisAlignedBoundingBox, FrameAxis, Rect,
};

use crate::oracle::{CameraPose, LayerGuard, ObjectId, SceneOracle, SELF_OCCLUSION_LAYER};

/// How a target's precomputed visibility points (ray destinations for
/// occlusion queries) are generated.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VisibilityMethod {
    /// Uniform-random points inside the AABB.
    Random,
    /// Fixed patterns anchored to the AABB's principal axes.
    UniformInBoundingBox,
    /// Outside-in raycasts from a Fibonacci sphere, keeping hits that land
    /// on the target's own geometry.
    OnMesh,
}

const MAX_VISIBILITY_POINTS: usize = 8;

/// Per-evaluation scratch produced by [`Target::render`]. Design note §9
/// calls for keeping this out of the target's persistent identity so a
/// problem could someday be evaluated from multiple threads; it is still
/// stored alongside the target for this single-threaded core (spec §5), but
/// it is always fully overwritten (never read-before-write) at the start of
/// each camera evaluation via [`Target::reset_scratch`].
#[derive(Clone, Debug, Default)]
pub struct RenderScratch {
    pub rendered: bool,
    pub behind_camera: bool,
    pub polygon: Vec<Vector2<f32>>,
    pub screen_min: Vector2<f32>,
    pub screen_max: Vector2<f32>,
    pub screen_area: f32,
    pub in_screen_ratio: f32,
}

pub struct Target {
    pub name: String,
    /// The object providing this target's stable local coordinate frame
    /// (spec §3 "a stable scene transform per target"), used by orientation
    /// properties and `ON_MESH` visibility sampling.
    pub frame_object: ObjectId,
    /// Objects whose union of AABBs determines on-screen size (renderables
    /// or colliders, per spec §3).
    pub size_sources: Vec<ObjectId>,
    /// Colliders that count as occluders of *other* targets but are ignored
    /// when testing this target's own occlusion.
    pub occluders: Vec<ObjectId>,
    pub n_rays: usize,
    pub visibility_method: VisibilityMethod,
    pub layers_to_exclude: u32,

    aabb: AxisAlignedBoundingBox,
    bounding_sphere_radius: f32,
    visibility_points: Vec<Vector3<f32>>,
    /// Indices into the owning `CameraMan`'s property arena that reference
    /// this target, used only by smart sampling (spec §9 design note).
    pub referencing_properties: Vec<usize>,

    pub scratch: RenderScratch,
}

impl Target {
    pub fn new(name: impl Into<String>, frame_object: ObjectId, size_sources: Vec<ObjectId>, occluders: Vec<ObjectId>) -> Self {
        Self {
            name: name.into(),
            frame_object,
            size_sources,
            occluders,
            n_rays: MAX_VISIBILITY_POINTS,
            visibility_method: VisibilityMethod::UniformInBoundingBox,
            layers_to_exclude: 0,
            aabb: AxisAlignedBoundingBox::default(),
            bounding_sphere_radius: 0.0,
            visibility_points: Vec::new(),
            referencing_properties: Vec::new(),
            scratch: RenderScratch::default(),
        }
    }

    pub fn aabb(&self) -> AxisAlignedBoundingBox {
        self.aabb
    }

    pub fn bounding_sphere_radius(&self) -> f32 {
        self.bounding_sphere_radius
    }

    pub fn visibility_points(&self) -> &[Vector3<f32>] {
        &self.visibility_points
    }

    pub fn reset_scratch(&mut self) {
        self.scratch = RenderScratch::default();
    }

    /// Recomputes the target's world AABB, bounding-sphere radius, and
    /// visibility points from the current scene state. Must be called
    /// whenever the scene moves (spec §3 lifecycle).
    pub fn update_bounds<O: SceneOracle + ?Sized>(&mut self, oracle: &O, rng: &mut impl Rng) {
        let mut aabb = AxisAlignedBoundingBox::default();
        for &id in &self.size_sources {
            let b = oracle.world_aabb(id);
            aabb.add_point(b.min);
            aabb.add_point(b.max);
        }
        if !aabb.is_valid() {
            aabb = AxisAlignedBoundingBox::from_point(Vector3::zeros());
        }
        self.aabb = aabb;
        self.bounding_sphere_radius = aabb.bounding_sphere_radius();
        self.visibility_points = self.generate_visibility_points(oracle, rng);
    }

    fn generate_visibility_points<O: SceneOracle + ?Sized>(&self, oracle: &O, rng: &mut impl Rng) -> Vec<Vector3<f32>> {
        let n = MAX_VISIBILITY_POINTS;
        match self.visibility_method {
            VisibilityMethod::Random => self.random_visibility_points(rng, n),
            VisibilityMethod::UniformInBoundingBox => self.structured_visibility_points(n, rng),
            VisibilityMethod::OnMesh => self.on_mesh_visibility_points(oracle, n),
        }
    }

    fn random_visibility_points(&self, rng: &mut impl Rng, n: usize) -> Vec<Vector3<f32>> {
        let mut points = Vec::with_capacity(n);
        // One point per occluding collider is seeded first when there are
        // more colliders than points to allocate (spec §4.1).
        for &id in self.occluders.iter().take(n) {
            let _ = id;
            points.push(viewpoint_math::random_point_in_box(rng, self.aabb.min, self.aabb.max));
        }
        while points.len() < n {
            points.push(viewpoint_math::random_point_in_box(rng, self.aabb.min, self.aabb.max));
        }
        points
    }

    fn structured_visibility_points(&self, n: usize, rng: &mut impl Rng) -> Vec<Vector3<f32>> {
        if n > 9 {
            return self.random_visibility_points(rng, n);
        }

        let center = self.aabb.center();
        let half = self.aabb.half_extents();
        let mut axes = [(0usize, half.x), (1usize, half.y), (2usize, half.z)];
        axes.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let offset_along = |axis: usize, t: f32| {
            let mut p = center;
            p[axis] = self.aabb.min[axis] + t * (self.aabb.max[axis] - self.aabb.min[axis]);
            p
        };

        let mut points = vec![center];
        let quarter_points: Vec<Vector3<f32>> = axes
            .iter()
            .flat_map(|&(axis, _)| [offset_along(axis, 0.25), offset_along(axis, 0.75)])
            .collect();
        points.extend(quarter_points);
        points.truncate(n.max(1));
        points
    }

    fn on_mesh_visibility_points<O: SceneOracle + ?Sized>(&self, oracle: &O, n: usize) -> Vec<Vector3<f32>> {
        let center = self.aabb.center();
        let radius = self.bounding_sphere_radius.max(1.0e-3);
        let mut hits = Vec::with_capacity(n);
        for dir in viewpoint_math::fibonacci_sphere(n) {
            let origin = center + dir * (radius * 2.0);
            if let Some(hit) = oracle.linecast(origin, center, 0) {
                if self.size_sources.contains(&hit.object_id) {
                    // Approximate the hit point as the ray's entry into the
                    // AABB along the cast direction, since the oracle
                    // reports the object hit, not the exact surface point.
                    hits.push(origin + (center - origin) * 0.5);
                }
            }
        }
        if hits.is_empty() {
            vec![center; n.max(1)]
        } else {
            while hits.len() < n {
                let i = hits.len() % hits.len().max(1);
                hits.push(hits[i]);
            }
            hits.truncate(n);
            hits
        }
    }

    /// Projects the target's silhouette for `camera` and stores the result
    /// in `self.scratch`. Idempotent per call site: callers (properties)
    /// check `scratch.rendered` first so a target is projected at most once
    /// per camera evaluation even when several properties reference it
    /// (spec §4.3).
    pub fn render<O: SceneOracle + ?Sized>(&mut self, camera: &CameraPose, oracle: &O, clip: Rect) {
        if self.scratch.rendered {
            return;
        }
        self.scratch.rendered = true;

        let visible_world = self.aabb.visible_vertices(camera.position);
        if visible_world.is_empty() {
            // Eye inside the AABB (spec §4.1 step 1).
            self.scratch.screen_area = 0.0;
            self.scratch.in_screen_ratio = 0.0;
            self.scratch.polygon.clear();
            self.scratch.screen_min = Vector2::zeros();
            self.scratch.screen_max = Vector2::zeros();
            return;
        }

        let mut behind_camera = false;
        let mut projected: Vec<Vector2<f32>> = Vec::with_capacity(visible_world.len());
        for world_vertex in &visible_world {
            let p = oracle.project(camera, *world_vertex);
            if p.z < 0.0 {
                behind_camera = true;
                continue;
            }
            projected.push(Vector2::new(p.x, p.y));
        }
        self.scratch.behind_camera = behind_camera;

        if projected.len() < 3 {
            self.scratch.screen_area = 0.0;
            self.scratch.in_screen_ratio = if behind_camera { 0.5 } else { 0.0 };
            self.scratch.polygon.clear();
            return;
        }

        order_convex_points(&mut projected);
        let unclipped_area = polygon_area(&projected).min(1.0);

        let clipped = sutherland_hodgman_clip(&projected, clip);
        let clipped_area = if clipped.len() < 3 {
            0.0
        } else {
            polygon_area(&clipped).min(1.0)
        };

        self.scratch.polygon = clipped.clone();
        self.scratch.screen_area = clipped_area;
        if let Some((min, max)) = bounds_of(&clipped) {
            self.scratch.screen_min = min;
            self.scratch.screen_max = max;
        } else {
            self.scratch.screen_min = Vector2::zeros();
            self.scratch.screen_max = Vector2::zeros();
        }

        let was_clipped = clipped.len() != projected.len()
            || (clipped_area - unclipped_area).abs() > 1.0e-6;

        self.scratch.in_screen_ratio = if behind_camera && !was_clipped {
            0.5
        } else if unclipped_area < 1.0e-5 {
            0.0
        } else {
            let ratio = clipped_area / unclipped_area;
            if ratio > 1.0 {
                if was_clipped {
                    0.0
                } else {
                    1.0
                }
            } else {
                ratio
            }
        };
    }

    /// Ratio of the target's already-clipped silhouette that also falls
    /// inside `frame` (spec §4.1 "Framing ratio").
    pub fn framing_ratio(&self, frame: Rect) -> f32 {
        if self.scratch.screen_area < 1.0e-5 {
            return 0.0;
        }
        let clipped = sutherland_hodgman_clip(&self.scratch.polygon, frame);
        if clipped.len() < 3 {
            return 0.0;
        }
        (polygon_area(&clipped) / self.scratch.screen_area).min(1.0)
    }

    /// Fraction of `n_rays` visibility-point rays blocked by scene geometry
    /// other than this target's own colliders (spec §4.1 "Occlusion").
    pub fn compute_occlusion<O: SceneOracle + ?Sized>(
        &self,
        camera_pos: Vector3<f32>,
        oracle: &O,
        n_rays: usize,
        double_sided: bool,
        random_rays: bool,
        rng: &mut impl Rng,
    ) -> f32 {
        if self.visibility_points.is_empty() {
            return 0.0;
        }
        let n_rays = n_rays.min(self.visibility_points.len()).max(1);

        // Own colliders move to a reserved bit the linecast mask below always
        // excludes, independent of the caller's `layers_to_exclude`, so a
        // target's own geometry never self-occludes its own rays.
        let guards: Vec<LayerGuard<'_, O>> = self
            .occluders
            .iter()
            .chain(self.size_sources.iter())
            .map(|&id| LayerGuard::new(oracle, id, SELF_OCCLUSION_LAYER))
            .collect();
        let mask = self.layers_to_exclude | SELF_OCCLUSION_LAYER;

        let points: Vec<Vector3<f32>> = if random_rays {
            (0..n_rays)
                .map(|_| self.visibility_points[rng.gen_range(0..self.visibility_points.len())])
                .collect()
        } else {
            self.visibility_points.iter().take(n_rays).copied().collect()
        };

        let mut occluded = 0usize;
        for point in points {
            let forward_blocked = oracle.linecast(camera_pos, point, mask).is_some();
            let blocked = if double_sided {
                forward_blocked || oracle.linecast(point, camera_pos, mask).is_some()
            } else {
                forward_blocked
            };
            if blocked {
                occluded += 1;
            }
        }

        drop(guards);
        (occluded as f32 / n_rays as f32).min(1.0)
    }

    /// Angle in degrees between `vector` and the named local axis of this
    /// target's frame, as reported by the oracle (spec §4.1 "Angle with axis").
    pub fn angle_with_axis<O: SceneOracle + ?Sized>(&self, vector: Vector3<f32>, oracle: &O, axis: FrameAxis) -> f32 {
        let (right, up, forward, world_up) = oracle.local_axes(self.frame_object);
        viewpoint_math::angle_with_axis(vector, right, up, forward, world_up, axis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockOracle;

    #[test]
    fn eye_inside_target_has_zero_area_and_ratio() {
        let mut oracle = MockOracle::new();
        let id = oracle.add_box(Vector3::zeros(), Vector3::new(1.0, 1.0, 1.0));
        let mut target = Target::new("t", id, vec![id], vec![]);
        let mut rng = rand::thread_rng();
        target.update_bounds(&oracle, &mut rng);

        let camera = CameraPose::look_at(
            Vector3::zeros(),
            Vector3::new(0.0, 0.0, 1.0),
            0.0,
            60.0f32.to_radians(),
            1.0,
        );
        target.render(&camera, &oracle, Rect::full_viewport());
        assert_eq!(target.scratch.screen_area, 0.0);
        assert_eq!(target.scratch.in_screen_ratio, 0.0);
    }

    #[test]
    fn fully_visible_box_has_ratio_near_one() {
        let mut oracle = MockOracle::new();
        let id = oracle.add_box(Vector3::new(0.0, 0.0, 5.0), Vector3::new(1.0, 1.0, 1.0));
        let mut target = Target::new("t", id, vec![id], vec![]);
        let mut rng = rand::thread_rng();
        target.update_bounds(&oracle, &mut rng);

        let camera = CameraPose::look_at(
            Vector3::new(0.0, 0.0, -5.0),
            Vector3::new(0.0, 0.0, 5.0),
            0.0,
            90.0f32.to_radians(),
            1.0,
        );
        target.render(&camera, &oracle, Rect::full_viewport());
        assert!(target.scratch.in_screen_ratio > 0.9, "ratio={}", target.scratch.in_screen_ratio);
    }

    #[test]
    fn render_is_idempotent_per_evaluation() {
        let mut oracle = MockOracle::new();
        let id = oracle.add_box(Vector3::new(0.0, 0.0, 5.0), Vector3::new(1.0, 1.0, 1.0));
        let mut target = Target::new("t", id, vec![id], vec![]);
        let mut rng = rand::thread_rng();
        target.update_bounds(&oracle, &mut rng);

        let camera = CameraPose::look_at(Vector3::new(0.0, 0.0, -5.0), Vector3::new(0.0, 0.0, 5.0), 0.0, 1.0, 1.0);
        target.render(&camera, &oracle, Rect::full_viewport());
        let area_first = target.scratch.screen_area;
        // A second render() call with a different camera must not overwrite
        // scratch until reset_scratch() is called.
        let other_camera = CameraPose::look_at(Vector3::new(10.0, 10.0, -5.0), Vector3::new(0.0, 0.0, 5.0), 0.0, 1.0, 1.0);
        target.render(&other_camera, &oracle, Rect::full_viewport());
        assert_eq!(target.scratch.screen_area, area_first);
    }
}
