//! A piecewise-linear satisfaction curve: `x -> y` in `[0,1]`, with monotone
//! `x` control points. Grounded on the key/curve split of
//! `fyrox-core::curve::{Curve, CurveKey}`, specialized to strictly linear
//! segments and extended with CDF-based inverse sampling of `x`.

/// One control point of a [`SatSpline`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SatKey {
    pub x: f32,
    pub y: f32,
}

impl SatKey {
    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A monotone-indexed piecewise-linear spline mapping `x` to a satisfaction
/// value in `[0,1]`. Queries outside `[x_min, x_max]` clamp to the nearest
/// endpoint value (no extrapolation). Also precomputes the cumulative area
/// under the curve so `x` can be sampled with probability proportional to
/// `y` via inverse-transform sampling.
#[derive(Clone, Debug, PartialEq)]
pub struct SatSpline {
    keys: Vec<SatKey>,
    /// `cumulative[i]` is the trapezoidal area under the curve over
    /// `[keys[0].x, keys[i].x]`.
    cumulative: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SatSplineError {
    TooFewKeys,
    NonMonotoneX,
    YOutOfRange,
}

impl std::fmt::Display for SatSplineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SatSplineError::TooFewKeys => write!(f, "a satisfaction spline needs at least 2 keys"),
            SatSplineError::NonMonotoneX => write!(f, "satisfaction spline x values must be strictly increasing"),
            SatSplineError::YOutOfRange => write!(f, "satisfaction spline y values must lie in [0,1]"),
        }
    }
}

impl std::error::Error for SatSplineError {}

impl SatSpline {
    /// Builds a spline from parallel `x`/`y` vectors. Validates the
    /// invariants named in the spec: at least 2 keys, strictly increasing
    /// `x`, `y` in `[0,1]`.
    pub fn new(xs: &[f32], ys: &[f32]) -> Result<Self, SatSplineError> {
        if xs.len() != ys.len() || xs.len() < 2 {
            return Err(SatSplineError::TooFewKeys);
        }
        if ys.iter().any(|y| !(0.0..=1.0).contains(y)) {
            return Err(SatSplineError::YOutOfRange);
        }
        for w in xs.windows(2) {
            if w[1] <= w[0] {
                return Err(SatSplineError::NonMonotoneX);
            }
        }
        let keys: Vec<SatKey> = xs.iter().zip(ys).map(|(&x, &y)| SatKey::new(x, y)).collect();
        Ok(Self::from_keys(keys))
    }

    fn from_keys(keys: Vec<SatKey>) -> Self {
        let mut cumulative = Vec::with_capacity(keys.len());
        let mut area = 0.0;
        cumulative.push(0.0);
        for w in keys.windows(2) {
            let dx = w[1].x - w[0].x;
            area += 0.5 * (w[0].y + w[1].y) * dx;
            cumulative.push(area);
        }
        Self { keys, cumulative }
    }

    /// A constant spline returning `value` everywhere — used by properties
    /// that have no configured preference curve.
    pub fn constant(value: f32) -> Self {
        Self::from_keys(vec![SatKey::new(0.0, value.clamp(0.0, 1.0)), SatKey::new(1.0, value.clamp(0.0, 1.0))])
    }

    #[inline]
    pub fn domain(&self) -> (f32, f32) {
        (self.keys[0].x, self.keys[self.keys.len() - 1].x)
    }

    #[inline]
    pub fn keys(&self) -> &[SatKey] {
        &self.keys
    }

    /// Evaluates the spline at `x`, clamping to the domain endpoints.
    pub fn eval(&self, x: f32) -> f32 {
        let (lo, hi) = self.domain();
        let x = x.clamp(lo, hi);

        match self
            .keys
            .binary_search_by(|k| k.x.partial_cmp(&x).unwrap_or(std::cmp::Ordering::Equal))
        {
            Ok(i) => self.keys[i].y,
            Err(i) => {
                if i == 0 {
                    self.keys[0].y
                } else if i >= self.keys.len() {
                    self.keys[self.keys.len() - 1].y
                } else {
                    let a = self.keys[i - 1];
                    let b = self.keys[i];
                    let t = (x - a.x) / (b.x - a.x);
                    a.y + t * (b.y - a.y)
                }
            }
        }
    }

    fn total_area(&self) -> f32 {
        *self.cumulative.last().unwrap_or(&0.0)
    }

    /// Draws an `x` value with probability density proportional to `y(x)`.
    /// Falls back to a uniform sample over the domain when the curve is
    /// degenerate (zero total area, i.e. `y` is constantly zero).
    pub fn sample_x<R: rand::Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        let total = self.total_area();
        let (lo, hi) = self.domain();
        if total <= f32::EPSILON {
            return rng.gen_range(lo..=hi);
        }

        let u = rng.gen_range(0.0..total);
        // Binary search the segment whose cumulative area straddles `u`.
        let seg = match self
            .cumulative
            .binary_search_by(|c| c.partial_cmp(&u).unwrap_or(std::cmp::Ordering::Equal))
        {
            Ok(i) => i.min(self.keys.len() - 2),
            Err(i) => i.saturating_sub(1).min(self.keys.len() - 2),
        };

        let a = self.keys[seg];
        let b = self.keys[seg + 1];
        let area_before = self.cumulative[seg];
        let local_u = u - area_before;
        let dx = b.x - a.x;

        if dx <= f32::EPSILON {
            return a.x;
        }

        // Invert the area-under-trapezoid(0..t) = local_u for t in [0,dx]:
        // area(t) = a.y * t + 0.5 * (b.y - a.y) / dx * t^2
        let slope = (b.y - a.y) / dx;
        let t = if slope.abs() < 1.0e-6 {
            if a.y > f32::EPSILON {
                local_u / a.y
            } else {
                0.0
            }
        } else {
            let aa = 0.5 * slope;
            let bb = a.y;
            let cc = -local_u;
            let disc = (bb * bb - 4.0 * aa * cc).max(0.0).sqrt();
            let t1 = (-bb + disc) / (2.0 * aa);
            let t2 = (-bb - disc) / (2.0 * aa);
            if (0.0..=dx).contains(&t1) {
                t1
            } else {
                t2
            }
        };

        a.x + t.clamp(0.0, dx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn rejects_too_few_keys() {
        assert_eq!(SatSpline::new(&[0.0], &[1.0]), Err(SatSplineError::TooFewKeys));
    }

    #[test]
    fn rejects_non_monotone_x() {
        assert_eq!(
            SatSpline::new(&[1.0, 0.0], &[0.0, 1.0]),
            Err(SatSplineError::NonMonotoneX)
        );
    }

    #[test]
    fn rejects_y_out_of_range() {
        assert_eq!(
            SatSpline::new(&[0.0, 1.0], &[0.0, 1.5]),
            Err(SatSplineError::YOutOfRange)
        );
    }

    #[test]
    fn eval_clamps_outside_domain() {
        let s = SatSpline::new(&[0.0, 1.0], &[0.2, 0.8]).unwrap();
        assert_eq!(s.eval(-10.0), 0.2);
        assert_eq!(s.eval(10.0), 0.8);
    }

    #[test]
    fn eval_interpolates_linearly() {
        let s = SatSpline::new(&[0.0, 1.0], &[0.0, 1.0]).unwrap();
        assert!((s.eval(0.5) - 0.5).abs() < 1.0e-6);
    }

    #[test]
    fn scenario_c_size_spline_values() {
        let s = SatSpline::new(
            &[0.0, 0.002, 0.1, 0.4, 0.5, 1.0],
            &[0.0, 0.1, 0.8, 1.0, 0.1, 0.0],
        )
        .unwrap();
        assert!((s.eval(0.1) - 0.8).abs() < 1.0e-6);
        assert!(s.eval(0.25) > 0.7 && s.eval(0.25) < 1.0);
    }

    #[test]
    fn zero_pdf_falls_back_to_uniform() {
        let s = SatSpline::new(&[0.0, 1.0], &[0.0, 0.0]).unwrap();
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let mut histogram = [0u32; 10];
        for _ in 0..10_000 {
            let x = s.sample_x(&mut rng);
            let bucket = ((x * 10.0) as usize).min(9);
            histogram[bucket] += 1;
        }
        // Roughly uniform: no bucket should be wildly off from the 1000 mean.
        for count in histogram {
            assert!(count > 600 && count < 1400, "bucket count {count} not roughly uniform");
        }
    }

    #[test]
    fn sampling_is_biased_toward_high_satisfaction() {
        let s = SatSpline::new(&[0.0, 0.5, 1.0], &[0.0, 1.0, 0.0]).unwrap();
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let mut near_peak = 0;
        let n = 20_000;
        for _ in 0..n {
            let x = s.sample_x(&mut rng);
            if (0.25..0.75).contains(&x) {
                near_peak += 1;
            }
        }
        // Middle half of the domain holds the bulk of the triangular pdf's mass.
        assert!(near_peak as f32 / n as f32 > 0.7);
    }

    #[test]
    fn constant_spline_is_flat() {
        let s = SatSpline::constant(0.42);
        assert!((s.eval(-5.0) - 0.42).abs() < 1.0e-6);
        assert!((s.eval(5.0) - 0.42).abs() < 1.0e-6);
    }
}
