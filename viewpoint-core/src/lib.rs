//! Viewpoint evaluator and PSO-based camera placement optimizer.
//!
//! The crate is split the way `fyrox-core` separates generic engine
//! plumbing from the scene graph that consumes it: [`oracle`] defines the
//! port this crate expects a host 3D engine to implement, and everything
//! else ([`target`], [`property`], [`domain`], [`camera_man`], [`solver`])
//! is pure evaluation and search logic with no rendering or physics
//! dependency of its own.

pub mod camera_man;
pub mod candidate;
pub mod domain;
pub mod error;
pub mod log;
pub mod oracle;
pub mod property;
pub mod solver;
pub mod target;

#[cfg(any(test, feature = "testing"))]
pub mod test_support;

pub use camera_man::CameraMan;
pub use candidate::Candidate;
pub use domain::{Box3, Domain, DomainKind, Range};
pub use error::ViewpointError;
pub use oracle::{CameraPose, Hit, LayerGuard, LayerMask, ObjectId, SceneOracle, SELF_OCCLUSION_LAYER};
pub use property::{Eval, Property, PropertyKind, PropertyScratch};
pub use solver::{ExitCondition, PsoSolver, Viewpoint};
pub use target::{RenderScratch, Target, VisibilityMethod};
