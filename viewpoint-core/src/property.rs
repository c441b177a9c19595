//! Visual properties: pure functions of `(camera, target(s)) -> [0,1]`, plus
//! the lazily-evaluated aggregator that sums them into the objective
//! (spec §3, §4.3). Re-expressed as a tagged variant rather than trait
//! objects (spec §9 design note) so the hot evaluation loop is a match, not
//! virtual dispatch.

use nalgebra::{UnitQuaternion, Vector2, Vector3};
use rand::Rng;
use viewpoint_math::{FrameAxis, Rect, SatSpline, SizeMode};

use crate::oracle::{CameraPose, SceneOracle};
use crate::target::Target;

/// The result of evaluating a property or the aggregator. Spec §9's open
/// question recommends this sum type over colliding `-1`/`-2` sentinels;
/// only [`Eval::to_sentinel`] re-introduces those literals, at the public
/// API boundary spec §6/§8 requires them at.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Eval {
    Valid(f32),
    Pruned,
    OutOfDomain,
}

impl Eval {
    pub fn to_sentinel(self) -> f32 {
        match self {
            Eval::Valid(v) => v,
            Eval::Pruned => -1.0,
            Eval::OutOfDomain => -2.0,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Eval::Valid(_))
    }

    pub fn value(&self) -> f32 {
        match self {
            Eval::Valid(v) => *v,
            Eval::Pruned | Eval::OutOfDomain => 0.0,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OrientationMode {
    HorizontalLocal,
    VerticalLocal,
    VerticalWorld,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RelativeDirection {
    Left,
    Right,
    Above,
    Below,
}

/// The discriminated payload of a [`Property`], one variant per kind named
/// in spec §3.
pub enum PropertyKind {
    /// Weighted, normalized sum of child properties (also doubles as the
    /// "TradeOff" construct spec §3 lists alongside it — both are the same
    /// normalized-weighted-sum machinery).
    Aggregation { children: Vec<usize>, weights: Vec<f32> },
    /// Compares target(s) on-screen size to the viewport, or to a second
    /// target when exactly two are given.
    Size { targets: Vec<usize>, mode: SizeMode },
    Occlusion {
        target: usize,
        double_sided: bool,
        random_rays: bool,
    },
    Orientation { target: usize, mode: OrientationMode },
    Framing { target: usize, rect: Rect },
    RelativePosition {
        target: usize,
        other: usize,
        direction: RelativeDirection,
    },
    TargetPosition { target: usize, point: Vector2<f32> },
    CameraOrientation {
        reference_right: Vector3<f32>,
        reference_up: Vector3<f32>,
        reference_forward: Vector3<f32>,
    },
    CameraFOV,
}

/// Per-evaluation scratch for one property, stored in a parallel array keyed
/// by property index rather than on the property itself (spec §9 design
/// note), so the same problem definition could later be evaluated
/// concurrently without per-property locking.
#[derive(Copy, Clone, Debug, Default)]
pub struct PropertyScratch {
    pub evaluated: bool,
    pub satisfaction: Option<Eval>,
    pub in_screen_ratio: f32,
}

pub struct Property {
    pub name: String,
    pub targets: Vec<usize>,
    /// Relative computational-cost hint; aggregation children must be
    /// ordered by increasing cost by the caller (spec §4.3).
    pub cost: f32,
    pub sat_function: SatSpline,
    pub kind: PropertyKind,
}

impl Property {
    pub fn new(name: impl Into<String>, targets: Vec<usize>, cost: f32, sat_function: SatSpline, kind: PropertyKind) -> Self {
        Self {
            name: name.into(),
            targets,
            cost,
            sat_function,
            kind,
        }
    }

    /// Builds an `Aggregation`/`TradeOff` property, normalizing `weights` to
    /// sum to 1 (spec §3). `children` must already be ordered by increasing
    /// evaluation cost by the caller (spec §4.3) — this constructor does not
    /// reorder them.
    pub fn aggregation(
        name: impl Into<String>,
        children: Vec<usize>,
        weights: &[f32],
    ) -> Result<Self, crate::error::ViewpointError> {
        if weights.len() != children.len() {
            return Err(crate::error::ViewpointError::WeightCountMismatch {
                weights: weights.len(),
                children: children.len(),
            });
        }
        let normalized = normalize_weights(weights)?;
        Ok(Self::new(
            name,
            Vec::new(),
            0.0,
            SatSpline::constant(1.0),
            PropertyKind::Aggregation {
                children,
                weights: normalized,
            },
        ))
    }
}

fn basis_to_quaternion(right: Vector3<f32>, up: Vector3<f32>, forward: Vector3<f32>) -> UnitQuaternion<f32> {
    let rotation = nalgebra::Rotation3::from_matrix_unchecked(nalgebra::Matrix3::from_columns(&[right, up, forward]));
    UnitQuaternion::from_rotation_matrix(&rotation)
}

/// Evaluates property `index`, recursing into children for `Aggregation`.
/// `threshold` is the lazy-pruning bound (spec §4.3); leaf properties ignore
/// it, as only the running partial sum of an aggregation can be bounded.
#[allow(clippy::too_many_arguments)]
pub fn evaluate_property<O: SceneOracle + ?Sized>(
    defs: &[Property],
    scratch: &mut [PropertyScratch],
    targets: &mut [Target],
    index: usize,
    threshold: f32,
    camera: &CameraPose,
    oracle: &O,
    clip: Rect,
    rng: &mut impl Rng,
) -> Eval {
    if scratch[index].evaluated {
        return scratch[index].satisfaction.unwrap_or(Eval::Pruned);
    }

    let (result, ratio) = match &defs[index].kind {
        PropertyKind::Aggregation { children, weights } => {
            evaluate_aggregation(defs, scratch, targets, children, weights, threshold, camera, oracle, clip, rng)
        }
        _ => evaluate_leaf(defs, targets, index, camera, oracle, clip, rng),
    };

    scratch[index].evaluated = true;
    scratch[index].satisfaction = Some(result);
    scratch[index].in_screen_ratio = ratio;
    result
}

/// Returns the evaluation plus an `in_screen_ratio` diagnostic — the
/// combined `Π child.in_screen_ratio` for an aggregation (spec §4.3), or the
/// underlying target's ratio for a leaf property that renders one.
#[allow(clippy::too_many_arguments)]
fn evaluate_aggregation<O: SceneOracle + ?Sized>(
    defs: &[Property],
    scratch: &mut [PropertyScratch],
    targets: &mut [Target],
    children: &[usize],
    weights: &[f32],
    threshold: f32,
    camera: &CameraPose,
    oracle: &O,
    clip: Rect,
    rng: &mut impl Rng,
) -> (Eval, f32) {
    let mut acc_sat = 0.0f32;
    let mut remaining_weight = 1.0f32;
    let mut ratio_product = 1.0f32;

    for (&child, &w) in children.iter().zip(weights) {
        let child_eval = evaluate_property(defs, scratch, targets, child, threshold, camera, oracle, clip, rng);
        // A pruned or out-of-domain child contributes nothing known; it is
        // still removed from `remaining_weight` so the upper bound tightens.
        let s = child_eval.value();

        acc_sat += w * s;
        remaining_weight -= w;
        ratio_product *= scratch[child].in_screen_ratio;

        let upper_bound = acc_sat + remaining_weight;
        if upper_bound < threshold {
            return (Eval::Pruned, ratio_product);
        }
    }

    (Eval::Valid(acc_sat.clamp(0.0, 1.0)), ratio_product)
}

#[allow(clippy::too_many_arguments)]
fn evaluate_leaf<O: SceneOracle + ?Sized>(
    defs: &[Property],
    targets: &mut [Target],
    index: usize,
    camera: &CameraPose,
    oracle: &O,
    clip: Rect,
    rng: &mut impl Rng,
) -> (Eval, f32) {
    let def = &defs[index];
    match &def.kind {
        PropertyKind::Aggregation { .. } => unreachable!("aggregation handled by evaluate_aggregation"),

        PropertyKind::Size { targets: ts, mode } => {
            for &t in ts {
                targets[t].render(camera, oracle, clip);
            }
            let measured = if ts.len() == 2 {
                let a = targets[ts[0]].scratch.screen_area;
                let b = targets[ts[1]].scratch.screen_area.max(1.0e-6);
                match mode {
                    SizeMode::Area => a / b,
                    SizeMode::Width => {
                        let wa = targets[ts[0]].scratch.screen_max.x - targets[ts[0]].scratch.screen_min.x;
                        let wb = (targets[ts[1]].scratch.screen_max.x - targets[ts[1]].scratch.screen_min.x).max(1.0e-6);
                        wa / wb
                    }
                    SizeMode::Height => {
                        let ha = targets[ts[0]].scratch.screen_max.y - targets[ts[0]].scratch.screen_min.y;
                        let hb = (targets[ts[1]].scratch.screen_max.y - targets[ts[1]].scratch.screen_min.y).max(1.0e-6);
                        ha / hb
                    }
                }
            } else {
                let t0 = &targets[ts[0]];
                match mode {
                    SizeMode::Area => t0.scratch.screen_area,
                    SizeMode::Width => t0.scratch.screen_max.x - t0.scratch.screen_min.x,
                    SizeMode::Height => t0.scratch.screen_max.y - t0.scratch.screen_min.y,
                }
            };
            let ratio = targets[ts[0]].scratch.in_screen_ratio;
            (Eval::Valid(def.sat_function.eval(measured).clamp(0.0, 1.0)), ratio)
        }

        PropertyKind::Occlusion {
            target,
            double_sided,
            random_rays,
        } => {
            let t = &targets[*target];
            let occluded = t.compute_occlusion(camera.position, oracle, t.n_rays, *double_sided, *random_rays, rng);
            (Eval::Valid(def.sat_function.eval(occluded).clamp(0.0, 1.0)), 1.0 - occluded)
        }

        PropertyKind::Orientation { target, mode } => {
            let t = &targets[*target];
            let vector = camera.position - t.aabb().center();
            let axis = match mode {
                OrientationMode::HorizontalLocal => FrameAxis::Forward,
                OrientationMode::VerticalLocal => FrameAxis::Up,
                OrientationMode::VerticalWorld => FrameAxis::WorldUp,
            };
            let angle = t.angle_with_axis(vector, oracle, axis);
            (Eval::Valid(def.sat_function.eval(angle).clamp(0.0, 1.0)), 1.0)
        }

        PropertyKind::Framing { target, rect } => {
            targets[*target].render(camera, oracle, clip);
            let ratio = targets[*target].framing_ratio(*rect);
            (Eval::Valid(def.sat_function.eval(ratio).clamp(0.0, 1.0)), ratio)
        }

        PropertyKind::RelativePosition { target, other, direction } => {
            targets[*target].render(camera, oracle, clip);
            targets[*other].render(camera, oracle, clip);
            let a = &targets[*target].scratch;
            let b = &targets[*other].scratch;
            let measured = match direction {
                RelativeDirection::Left => b.screen_min.x - a.screen_max.x,
                RelativeDirection::Right => a.screen_min.x - b.screen_max.x,
                RelativeDirection::Above => a.screen_min.y - b.screen_max.y,
                RelativeDirection::Below => b.screen_min.y - a.screen_max.y,
            };
            let ratio = a.in_screen_ratio;
            (Eval::Valid(def.sat_function.eval(measured).clamp(0.0, 1.0)), ratio)
        }

        PropertyKind::TargetPosition { target, point } => {
            targets[*target].render(camera, oracle, clip);
            let t = &targets[*target].scratch;
            let centroid = (t.screen_min + t.screen_max) * 0.5;
            let distance = (centroid - point).norm();
            let ratio = t.in_screen_ratio;
            (Eval::Valid(def.sat_function.eval(distance).clamp(0.0, 1.0)), ratio)
        }

        PropertyKind::CameraOrientation {
            reference_right,
            reference_up,
            reference_forward,
        } => {
            let q_camera = basis_to_quaternion(camera.right, camera.up, camera.forward);
            let q_reference = basis_to_quaternion(*reference_right, *reference_up, *reference_forward);
            let angle = q_camera.rotation_to(&q_reference).angle().to_degrees();
            (Eval::Valid(def.sat_function.eval(angle).clamp(0.0, 1.0)), 1.0)
        }

        PropertyKind::CameraFOV => (Eval::Valid(def.sat_function.eval(camera.fov.to_degrees()).clamp(0.0, 1.0)), 1.0),
    }
}

/// Normalizes a weight vector to sum to 1 (spec §3 "weights owned by the
/// aggregator, after normalization"). Returns an error when the total is
/// non-positive.
pub fn normalize_weights(weights: &[f32]) -> Result<Vec<f32>, crate::error::ViewpointError> {
    let total: f32 = weights.iter().sum();
    if total <= 0.0 {
        return Err(crate::error::ViewpointError::NonPositiveWeights);
    }
    Ok(weights.iter().map(|w| w / total).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_weights_sums_to_one() {
        let w = normalize_weights(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        let sum: f32 = w.iter().sum();
        assert!((sum - 1.0).abs() < 1.0e-6);
    }

    #[test]
    fn normalize_weights_preserves_ratios() {
        let w = normalize_weights(&[1.0, 1.0]).unwrap();
        assert!((w[0] - 0.5).abs() < 1.0e-6);
        assert!((w[1] - 0.5).abs() < 1.0e-6);
    }

    #[test]
    fn normalize_weights_rejects_non_positive_total() {
        assert!(normalize_weights(&[0.0, 0.0]).is_err());
        assert!(normalize_weights(&[-1.0, 0.5]).is_err());
    }

    #[test]
    fn eval_sentinel_values_match_spec() {
        assert_eq!(Eval::Pruned.to_sentinel(), -1.0);
        assert_eq!(Eval::OutOfDomain.to_sentinel(), -2.0);
        assert_eq!(Eval::Valid(0.42).to_sentinel(), 0.42);
    }
}
