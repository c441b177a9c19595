//! Construction-time error type. Evaluation-time sentinels (pruned,
//! out-of-domain) are not errors — see [`crate::property::Eval`] — this type
//! is only for malformed inputs the caller should fix before solving.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum ViewpointError {
    /// A parameter vector was shorter than the domain variant requires.
    TooFewParameters { got: usize, need: usize },
    /// An aggregator's children/weights vectors had mismatched lengths.
    WeightCountMismatch { weights: usize, children: usize },
    /// All of an aggregator's weights were zero or negative; normalization
    /// is undefined.
    NonPositiveWeights,
    /// A satisfaction spline was malformed.
    Spline(viewpoint_math::SatSplineError),
}

impl fmt::Display for ViewpointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewpointError::TooFewParameters { got, need } => {
                write!(f, "camera parameter vector has {got} components, need at least {need}")
            }
            ViewpointError::WeightCountMismatch { weights, children } => {
                write!(f, "{weights} weights given for {children} child properties")
            }
            ViewpointError::NonPositiveWeights => {
                write!(f, "aggregation weights must sum to a positive value")
            }
            ViewpointError::Spline(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ViewpointError {}

impl From<viewpoint_math::SatSplineError> for ViewpointError {
    fn from(e: viewpoint_math::SatSplineError) -> Self {
        ViewpointError::Spline(e)
    }
}
