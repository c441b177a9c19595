//! A deterministic pinhole-camera [`SceneOracle`] used by this crate's own
//! tests and by the `tests/` integration scenarios (spec §8). Not part of
//! the public API surface consumers are expected to build against.

use std::cell::RefCell;
use std::collections::HashMap;

use nalgebra::Vector3;
use viewpoint_math::AxisAlignedBoundingBox;

use crate::oracle::{CameraPose, Hit, LayerMask, ObjectId, SceneOracle};

pub struct MockOracle {
    objects: HashMap<ObjectId, AxisAlignedBoundingBox>,
    layers: RefCell<HashMap<ObjectId, LayerMask>>,
    next_id: RefCell<ObjectId>,
}

impl MockOracle {
    pub fn new() -> Self {
        Self {
            objects: HashMap::new(),
            layers: RefCell::new(HashMap::new()),
            next_id: RefCell::new(1),
        }
    }

    /// Adds a box centered at `center` with the given full `size`, returning
    /// its id.
    pub fn add_box(&mut self, center: Vector3<f32>, size: Vector3<f32>) -> ObjectId {
        let half = size * 0.5;
        let id = {
            let mut next = self.next_id.borrow_mut();
            let id = *next;
            *next += 1;
            id
        };
        self.objects.insert(
            id,
            AxisAlignedBoundingBox::from_min_max(center - half, center + half),
        );
        self.layers.borrow_mut().insert(id, 0);
        id
    }

    fn ray_box_t(&self, origin: Vector3<f32>, dir: Vector3<f32>, aabb: &AxisAlignedBoundingBox) -> Option<f32> {
        let mut t_min = 0.0f32;
        let mut t_max = 1.0f32;
        for axis in 0..3 {
            let o = origin[axis];
            let d = dir[axis];
            let (min, max) = (aabb.min[axis], aabb.max[axis]);
            if d.abs() < 1.0e-9 {
                if o < min || o > max {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / d;
            let mut t1 = (min - o) * inv;
            let mut t2 = (max - o) * inv;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }
            t_min = t_min.max(t1);
            t_max = t_max.min(t2);
            if t_min > t_max {
                return None;
            }
        }
        Some(t_min.max(0.0))
    }
}

impl Default for MockOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneOracle for MockOracle {
    fn world_aabb(&self, object_id: ObjectId) -> AxisAlignedBoundingBox {
        self.objects
            .get(&object_id)
            .copied()
            .unwrap_or_else(AxisAlignedBoundingBox::default)
    }

    fn project(&self, camera: &CameraPose, world_point: Vector3<f32>) -> Vector3<f32> {
        let rel = world_point - camera.position;
        let x_cam = rel.dot(&camera.right);
        let y_cam = rel.dot(&camera.up);
        let z_cam = rel.dot(&camera.forward);

        if z_cam <= 1.0e-6 {
            return Vector3::new(0.5, 0.5, -1.0);
        }

        let half_height = (camera.fov * 0.5).tan();
        let half_width = half_height * camera.aspect;

        let x = (x_cam / (z_cam * half_width)) * 0.5 + 0.5;
        let y = (y_cam / (z_cam * half_height)) * 0.5 + 0.5;
        Vector3::new(x, y, z_cam)
    }

    fn linecast(&self, a: Vector3<f32>, b: Vector3<f32>, layer_mask: LayerMask) -> Option<Hit> {
        let dir = b - a;
        let mut best: Option<(f32, ObjectId)> = None;
        for (&id, aabb) in &self.objects {
            let layer = *self.layers.borrow().get(&id).unwrap_or(&0);
            if layer & layer_mask != 0 {
                continue;
            }
            if let Some(t) = self.ray_box_t(a, dir, aabb) {
                if t > 1.0e-4 && t < 1.0 {
                    if best.map(|(bt, _)| t < bt).unwrap_or(true) {
                        best = Some((t, id));
                    }
                }
            }
        }
        best.map(|(_, id)| Hit { object_id: id })
    }

    fn sphere_overlap(&self, center: Vector3<f32>, radius: f32, layer_mask: LayerMask) -> bool {
        self.objects.iter().any(|(&id, aabb)| {
            let layer = *self.layers.borrow().get(&id).unwrap_or(&0);
            layer & layer_mask == 0 && aabb.is_intersects_sphere(center, radius)
        })
    }

    fn set_object_layer(&self, object_id: ObjectId, layer: LayerMask) -> LayerMask {
        let mut layers = self.layers.borrow_mut();
        let previous = *layers.get(&object_id).unwrap_or(&0);
        layers.insert(object_id, layer);
        previous
    }

    fn get_object_layer(&self, object_id: ObjectId) -> LayerMask {
        *self.layers.borrow().get(&object_id).unwrap_or(&0)
    }

    fn local_axes(&self, _object_id: ObjectId) -> (Vector3<f32>, Vector3<f32>, Vector3<f32>, Vector3<f32>) {
        (Vector3::x(), Vector3::y(), Vector3::z(), Vector3::y())
    }

    fn transform_point(&self, object_id: ObjectId, local: Vector3<f32>) -> Vector3<f32> {
        self.world_aabb(object_id).center() + local
    }
}
