//! The Scene Oracle: the interface this crate consumes from the host 3D
//! engine. Scene geometry, rendering, and raycasting are out of scope
//! (spec §1) and are specified here only by the shape of the port the core
//! calls through.

use nalgebra::Vector3;
use viewpoint_math::AxisAlignedBoundingBox;

/// Opaque identifier for a renderable or collider in the host scene. The
/// core never interprets this beyond equality and hashing.
pub type ObjectId = u64;

/// Bitmask of physics/visibility layers, used to exclude the target's own
/// geometry from occlusion queries and to implement `layers_to_exclude`.
pub type LayerMask = u32;

/// Reserved bit a [`crate::target::Target`] moves its own colliders to while
/// casting its own occlusion rays, and always adds to the linecast mask
/// alongside the user-facing `layers_to_exclude` (spec §4.1's self-occlusion
/// note). Kept out of the user-facing layer space so a target's own rays
/// are never self-occluding even when `layers_to_exclude == 0`.
pub const SELF_OCCLUSION_LAYER: LayerMask = 1 << 31;

/// A concrete camera pose bound from a parameter vector by [`crate::camera_man::CameraMan`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CameraPose {
    pub position: Vector3<f32>,
    pub right: Vector3<f32>,
    pub up: Vector3<f32>,
    pub forward: Vector3<f32>,
    /// Vertical field of view, in radians.
    pub fov: f32,
    /// Viewport aspect ratio, width / height.
    pub aspect: f32,
}

impl CameraPose {
    /// Builds a pose looking from `position` toward `target`, with `roll`
    /// (radians) applied about the forward axis after the initial
    /// orientation is established — the construction spec §4.5 names for
    /// the `LookAt` camera-man variant.
    pub fn look_at(position: Vector3<f32>, target: Vector3<f32>, roll: f32, fov: f32, aspect: f32) -> Self {
        let mut forward = target - position;
        if forward.norm_squared() < 1.0e-12 {
            forward = Vector3::new(0.0, 0.0, 1.0);
        }
        let forward = forward.normalize();

        let world_up = Vector3::new(0.0, 1.0, 0.0);
        let reference_up = if forward.cross(&world_up).norm_squared() < 1.0e-9 {
            Vector3::new(0.0, 0.0, 1.0)
        } else {
            world_up
        };

        let right = forward.cross(&reference_up).normalize();
        let up = right.cross(&forward).normalize();

        let (sin_r, cos_r) = roll.sin_cos();
        let rolled_right = right * cos_r + up * sin_r;
        let rolled_up = up * cos_r - right * sin_r;

        Self {
            position,
            right: rolled_right,
            up: rolled_up,
            forward,
            fov,
            aspect,
        }
    }
}

/// Result of a [`SceneOracle::linecast`] query.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Hit {
    pub object_id: ObjectId,
}

/// The external collaborator providing scene geometry, projection, and
/// raycast services (spec §6). The core treats every call as infallible —
/// an implementation backed by something that can fail (e.g. a networked
/// scene) must map failures to the `Degenerate` policy of spec §7 (zero
/// satisfaction for the affected property) rather than propagating an error
/// through this trait.
pub trait SceneOracle {
    /// World-space axis-aligned bounds of a renderable or collider.
    fn world_aabb(&self, object_id: ObjectId) -> AxisAlignedBoundingBox;

    /// Projects `world_point` into viewport coordinates for `camera`.
    /// `x`/`y` are in `[0,1]` when the point lands on screen; `z < 0`
    /// indicates the point is behind the camera.
    fn project(&self, camera: &CameraPose, world_point: Vector3<f32>) -> Vector3<f32>;

    /// Casts a line segment from `a` to `b`, ignoring objects whose layer is
    /// set in `layer_mask`. Returns the first blocking hit, if any.
    fn linecast(&self, a: Vector3<f32>, b: Vector3<f32>, layer_mask: LayerMask) -> Option<Hit>;

    /// True if a sphere at `center` with the given `radius` overlaps any
    /// scene geometry not excluded by `layer_mask`.
    fn sphere_overlap(&self, center: Vector3<f32>, radius: f32, layer_mask: LayerMask) -> bool;

    /// Sets `object_id`'s layer, returning the previous value so a caller
    /// can restore it.
    fn set_object_layer(&self, object_id: ObjectId, layer: LayerMask) -> LayerMask;

    /// Reads `object_id`'s current layer.
    fn get_object_layer(&self, object_id: ObjectId) -> LayerMask;

    /// The local `(right, up, forward, world_up)` axes of `object_id`'s
    /// transform, used by orientation properties and visibility-point
    /// precomputation.
    fn local_axes(&self, object_id: ObjectId) -> (Vector3<f32>, Vector3<f32>, Vector3<f32>, Vector3<f32>);

    /// Transforms a point from `object_id`'s local space to world space.
    fn transform_point(&self, object_id: ObjectId, local: Vector3<f32>) -> Vector3<f32>;

    /// A uniform-random point inside the world-space box `[min, max]`.
    /// Exposed through the oracle (rather than sampled locally) so a host
    /// engine that prefers its own RNG/thread-safety story can supply it;
    /// the default implementation delegates to this crate's own RNG usage
    /// pattern via `rand`.
    fn random_point_in_box(&self, min: Vector3<f32>, max: Vector3<f32>) -> Vector3<f32> {
        viewpoint_math::random_point_in_box(&mut rand::thread_rng(), min, max)
    }
}

/// RAII guard that restores an object's scene layer on drop, used by
/// occlusion queries to temporarily move a target's own colliders out of the
/// way without leaking the mutation on an early return or a panic mid-cast
/// (spec §5, §9).
pub struct LayerGuard<'a, O: SceneOracle + ?Sized> {
    oracle: &'a O,
    object_id: ObjectId,
    previous: LayerMask,
}

impl<'a, O: SceneOracle + ?Sized> LayerGuard<'a, O> {
    pub fn new(oracle: &'a O, object_id: ObjectId, temporary: LayerMask) -> Self {
        let previous = oracle.set_object_layer(object_id, temporary);
        Self {
            oracle,
            object_id,
            previous,
        }
    }
}

impl<O: SceneOracle + ?Sized> Drop for LayerGuard<'_, O> {
    fn drop(&mut self) {
        self.oracle.set_object_layer(self.object_id, self.previous);
    }
}
