use nalgebra::Vector3;

/// Axis-aligned bounding box, along with the eye-classification machinery
/// needed to extract the silhouette of a box as seen from an external point.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AxisAlignedBoundingBox {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
}

impl Default for AxisAlignedBoundingBox {
    #[inline]
    fn default() -> Self {
        Self {
            min: Vector3::new(f32::MAX, f32::MAX, f32::MAX),
            max: Vector3::new(-f32::MAX, -f32::MAX, -f32::MAX),
        }
    }
}

impl AxisAlignedBoundingBox {
    #[inline]
    pub const fn from_min_max(min: Vector3<f32>, max: Vector3<f32>) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn from_point(point: Vector3<f32>) -> Self {
        Self {
            min: point,
            max: point,
        }
    }

    #[inline]
    pub fn from_points(points: &[Vector3<f32>]) -> Self {
        let mut aabb = Self::default();
        for p in points {
            aabb.add_point(*p);
        }
        aabb
    }

    #[inline]
    pub fn add_point(&mut self, a: Vector3<f32>) {
        self.min.x = self.min.x.min(a.x);
        self.min.y = self.min.y.min(a.y);
        self.min.z = self.min.z.min(a.z);
        self.max.x = self.max.x.max(a.x);
        self.max.y = self.max.y.max(a.y);
        self.max.z = self.max.z.max(a.z);
    }

    #[inline]
    pub fn center(&self) -> Vector3<f32> {
        (self.max + self.min).scale(0.5)
    }

    #[inline]
    pub fn half_extents(&self) -> Vector3<f32> {
        (self.max - self.min).scale(0.5)
    }

    /// Half-diagonal of the box, used as the target's bounding-sphere radius.
    #[inline]
    pub fn bounding_sphere_radius(&self) -> f32 {
        self.half_extents().norm()
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.max.x >= self.min.x && self.max.y >= self.min.y && self.max.z >= self.min.z
    }

    #[inline]
    pub fn is_contains_point(&self, point: Vector3<f32>) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    #[inline]
    pub fn is_intersects_sphere(&self, position: Vector3<f32>, radius: f32) -> bool {
        let r2 = radius.powi(2);
        let mut dmin = 0.0;

        if position.x < self.min.x {
            dmin += (position.x - self.min.x).powi(2);
        } else if position.x > self.max.x {
            dmin += (position.x - self.max.x).powi(2);
        }
        if position.y < self.min.y {
            dmin += (position.y - self.min.y).powi(2);
        } else if position.y > self.max.y {
            dmin += (position.y - self.max.y).powi(2);
        }
        if position.z < self.min.z {
            dmin += (position.z - self.min.z).powi(2);
        } else if position.z > self.max.z {
            dmin += (position.z - self.max.z).powi(2);
        }

        dmin <= r2 || self.is_contains_point(position)
    }

    /// The 8 corners of the box, in a fixed order.
    #[inline]
    pub fn corners(&self) -> [Vector3<f32>; 8] {
        [
            Vector3::new(self.min.x, self.min.y, self.min.z),
            Vector3::new(self.max.x, self.min.y, self.min.z),
            Vector3::new(self.min.x, self.max.y, self.min.z),
            Vector3::new(self.max.x, self.max.y, self.min.z),
            Vector3::new(self.min.x, self.min.y, self.max.z),
            Vector3::new(self.max.x, self.min.y, self.max.z),
            Vector3::new(self.min.x, self.max.y, self.max.z),
            Vector3::new(self.max.x, self.max.y, self.max.z),
        ]
    }

    /// Classifies `eye` against the box's 6 half-spaces into a 6-bit region
    /// code (bit per half-space: -x,+x,-y,+y,-z,+z). Zero means the eye is
    /// inside the box. At most one bit per axis can be set.
    #[inline]
    pub fn eye_region_code(&self, eye: Vector3<f32>) -> u8 {
        let mut code = 0u8;
        if eye.x < self.min.x {
            code |= 1 << 0;
        } else if eye.x > self.max.x {
            code |= 1 << 1;
        }
        if eye.y < self.min.y {
            code |= 1 << 2;
        } else if eye.y > self.max.y {
            code |= 1 << 3;
        }
        if eye.z < self.min.z {
            code |= 1 << 4;
        } else if eye.z > self.max.z {
            code |= 1 << 5;
        }
        code
    }

    /// Returns the vertices of the box visible from `eye`, unordered.
    ///
    /// An empty result means the eye is inside the box (code 0). Each set bit
    /// of the region code names one of the box's faces as front-facing; the
    /// visible vertex set is the union of those faces' corners, minus the
    /// single corner that all three faces share when exactly three faces are
    /// visible (that corner always projects inside the silhouette formed by
    /// the other six, so it never contributes to the outline).
    pub fn visible_vertices(&self, eye: Vector3<f32>) -> Vec<Vector3<f32>> {
        let code = self.eye_region_code(eye);
        if code == 0 {
            return Vec::new();
        }

        let mut faces: Vec<(usize, bool)> = Vec::with_capacity(3);
        if code & (1 << 0) != 0 {
            faces.push((0, false));
        }
        if code & (1 << 1) != 0 {
            faces.push((0, true));
        }
        if code & (1 << 2) != 0 {
            faces.push((1, false));
        }
        if code & (1 << 3) != 0 {
            faces.push((1, true));
        }
        if code & (1 << 4) != 0 {
            faces.push((2, false));
        }
        if code & (1 << 5) != 0 {
            faces.push((2, true));
        }

        let belongs = |v: Vector3<f32>, axis: usize, is_max: bool| -> bool {
            let target = if is_max { self.max[axis] } else { self.min[axis] };
            (v[axis] - target).abs() <= f32::EPSILON.max(target.abs() * 1.0e-5)
        };

        self.corners()
            .into_iter()
            .filter(|&c| {
                let touching = faces.iter().filter(|&&(a, m)| belongs(c, a, m)).count();
                touching > 0 && !(faces.len() == 3 && touching == 3)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_invalid() {
        assert!(!AxisAlignedBoundingBox::default().is_valid());
    }

    #[test]
    fn from_points_covers_all() {
        let pts = [
            Vector3::new(-1.0, -1.0, -1.0),
            Vector3::new(0.0, 2.0, 0.0),
            Vector3::new(1.0, 1.0, 1.0),
        ];
        let b = AxisAlignedBoundingBox::from_points(&pts);
        assert_eq!(b.min, Vector3::new(-1.0, -1.0, -1.0));
        assert_eq!(b.max, Vector3::new(1.0, 2.0, 1.0));
    }

    #[test]
    fn eye_inside_has_no_visible_vertices() {
        let b = AxisAlignedBoundingBox::from_min_max(
            Vector3::new(-1.0, -1.0, -1.0),
            Vector3::new(1.0, 1.0, 1.0),
        );
        assert!(b.visible_vertices(Vector3::new(0.0, 0.0, 0.0)).is_empty());
    }

    #[test]
    fn eye_facing_single_face_sees_four_vertices() {
        let b = AxisAlignedBoundingBox::from_min_max(
            Vector3::new(-1.0, -1.0, -1.0),
            Vector3::new(1.0, 1.0, 1.0),
        );
        // Eye straight out along +z, well within x/y range: only +z face visible.
        let verts = b.visible_vertices(Vector3::new(0.0, 0.0, 5.0));
        assert_eq!(verts.len(), 4);
        assert!(verts.iter().all(|v| (v.z - 1.0).abs() < 1.0e-6));
    }

    #[test]
    fn eye_facing_edge_sees_six_vertices() {
        let b = AxisAlignedBoundingBox::from_min_max(
            Vector3::new(-1.0, -1.0, -1.0),
            Vector3::new(1.0, 1.0, 1.0),
        );
        // Eye beyond +x and +y, within z range: edge-on view of two faces.
        let verts = b.visible_vertices(Vector3::new(5.0, 5.0, 0.0));
        assert_eq!(verts.len(), 6);
    }

    #[test]
    fn eye_facing_corner_sees_six_vertices_excluding_near_and_far() {
        let b = AxisAlignedBoundingBox::from_min_max(
            Vector3::new(-1.0, -1.0, -1.0),
            Vector3::new(1.0, 1.0, 1.0),
        );
        let verts = b.visible_vertices(Vector3::new(5.0, 5.0, 5.0));
        assert_eq!(verts.len(), 6);
        // Neither the near corner (1,1,1) nor the far corner (-1,-1,-1) is in the set.
        assert!(!verts.iter().any(|v| (*v - Vector3::new(1.0, 1.0, 1.0)).norm() < 1.0e-6));
        assert!(!verts
            .iter()
            .any(|v| (*v - Vector3::new(-1.0, -1.0, -1.0)).norm() < 1.0e-6));
    }

    #[test]
    fn sphere_intersection() {
        let b = AxisAlignedBoundingBox::from_min_max(
            Vector3::new(-1.0, -1.0, -1.0),
            Vector3::new(1.0, 1.0, 1.0),
        );
        assert!(b.is_intersects_sphere(Vector3::new(0.0, 0.0, 0.0), 0.1));
        assert!(b.is_intersects_sphere(Vector3::new(2.0, 0.0, 0.0), 1.5));
        assert!(!b.is_intersects_sphere(Vector3::new(10.0, 10.0, 10.0), 1.0));
    }
}
