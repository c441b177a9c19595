//! Geometry and satisfaction-curve primitives for viewpoint planning:
//! bounding boxes with silhouette extraction, polygon clipping, the
//! satisfaction spline, and sampling helpers. Kept free of any notion of a
//! scene, a target, or a camera — those live in `viewpoint-core`, which
//! depends on this crate the way `fyrox-core` depends on `fyrox-math`.

pub mod aabb;
pub mod polygon;
pub mod sampling;
pub mod spline;

pub use aabb::AxisAlignedBoundingBox;
pub use polygon::Rect;
pub use sampling::{angle_with_axis, distance_from_size, fibonacci_sphere, random_point_in_box, FrameAxis, SizeMode};
pub use spline::{SatKey, SatSpline, SatSplineError};
