//! Cubic spline interpolation along one axis.
//!
//! The spline is stored in second-derivative ("moment") form: for knots
//! `x_0 < x_1 < ... < x_{n-1}` with values `y_i` and moments `M_i`, the piece
//! on `[x_i, x_{i+1}]` is
//!
//! ```text
//! S(x) = a*y_i + b*y_{i+1} + ((a^3 - a)*M_i + (b^3 - b)*M_{i+1}) * h^2 / 6
//! a = (x_{i+1} - x) / h,  b = (x - x_i) / h,  h = x_{i+1} - x_i
//! ```
//!
//! That expression is a cubic polynomial in `x`, so evaluating the first or
//! last piece outside `[x_0, x_{n-1}]` extrapolates it rather than clamping.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{LacunaError, Result};

/// End conditions closing the spline system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BoundaryCondition {
    /// Third derivative continuous at the second and penultimate knots.
    ///
    /// With four knots this is the single cubic through all of them; with
    /// three it is the parabola through them.
    #[default]
    NotAKnot,
    /// Second derivative zero at both end knots
    Natural,
}

impl BoundaryCondition {
    /// Get the name of this boundary condition
    pub fn name(&self) -> &'static str {
        match self {
            BoundaryCondition::NotAKnot => "not-a-knot",
            BoundaryCondition::Natural => "natural",
        }
    }
}

impl fmt::Display for BoundaryCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BoundaryCondition {
    type Err = LacunaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "not-a-knot" | "not_a_knot" | "notaknot" => Ok(BoundaryCondition::NotAKnot),
            "natural" => Ok(BoundaryCondition::Natural),
            _ => Err(LacunaError::invalid_argument(
                "boundary",
                format!(
                    "Unknown boundary condition: {}. Must be one of: not-a-knot, natural",
                    s
                ),
            )),
        }
    }
}

/// A piecewise cubic interpolant through a set of samples
#[derive(Debug, Clone)]
pub struct CubicSpline {
    xs: Vec<f64>,
    ys: Vec<f64>,
    moments: Vec<f64>,
}

impl CubicSpline {
    /// Fit a spline through `(xs[i], ys[i])`.
    ///
    /// `xs` must be finite and strictly increasing, `ys` the same length, and
    /// at least two points are required. Two points give the straight line
    /// through them regardless of `boundary`.
    pub fn new(xs: Vec<f64>, ys: Vec<f64>, boundary: BoundaryCondition) -> Result<Self> {
        if xs.len() != ys.len() {
            return Err(LacunaError::invalid_argument(
                "ys",
                format!(
                    "Length mismatch: {} knots but {} values",
                    xs.len(),
                    ys.len()
                ),
            ));
        }
        if xs.len() < 2 {
            return Err(LacunaError::invalid_argument(
                "xs",
                format!("Need at least 2 points, got {}", xs.len()),
            ));
        }
        if xs.iter().any(|x| !x.is_finite()) {
            return Err(LacunaError::invalid_argument("xs", "Knots must be finite"));
        }
        if let Some(i) = xs.windows(2).position(|w| w[1] <= w[0]) {
            return Err(LacunaError::invalid_argument(
                "xs",
                format!("Knots must be strictly increasing at index {}", i + 1),
            ));
        }

        let moments = match (xs.len(), boundary) {
            (2, _) => vec![0.0; 2],
            (3, BoundaryCondition::NotAKnot) => parabola_moments(&xs, &ys),
            (_, BoundaryCondition::NotAKnot) => not_a_knot_moments(&xs, &ys),
            (_, BoundaryCondition::Natural) => natural_moments(&xs, &ys),
        };

        Ok(Self { xs, ys, moments })
    }

    /// Number of knots
    pub fn len(&self) -> usize {
        self.xs.len()
    }

    /// Always false; a spline has at least two knots
    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    /// Knot positions
    pub fn knots(&self) -> &[f64] {
        &self.xs
    }

    /// Evaluate the spline at `x`, extrapolating the end pieces outside the knots
    pub fn evaluate(&self, x: f64) -> f64 {
        let n = self.xs.len();
        let upper = self.xs.partition_point(|&k| k <= x);
        let i = upper.saturating_sub(1).min(n - 2);

        let h = self.xs[i + 1] - self.xs[i];
        let a = (self.xs[i + 1] - x) / h;
        let b = (x - self.xs[i]) / h;

        a * self.ys[i]
            + b * self.ys[i + 1]
            + ((a * a * a - a) * self.moments[i] + (b * b * b - b) * self.moments[i + 1]) * h * h
                / 6.0
    }
}

/// Interval widths and divided differences
fn widths_and_slopes(xs: &[f64], ys: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let h: Vec<f64> = xs.windows(2).map(|w| w[1] - w[0]).collect();
    let d: Vec<f64> = ys
        .windows(2)
        .zip(&h)
        .map(|(w, h)| (w[1] - w[0]) / h)
        .collect();
    (h, d)
}

/// Three knots under not-a-knot collapse to one parabola: constant moment
fn parabola_moments(xs: &[f64], ys: &[f64]) -> Vec<f64> {
    let (h, d) = widths_and_slopes(xs, ys);
    let curvature = 2.0 * (d[1] - d[0]) / (h[0] + h[1]);
    vec![curvature; 3]
}

fn natural_moments(xs: &[f64], ys: &[f64]) -> Vec<f64> {
    let n = xs.len();
    let (h, d) = widths_and_slopes(xs, ys);
    let k = n - 2;

    let mut sub = vec![0.0; k];
    let mut diag = vec![0.0; k];
    let mut sup = vec![0.0; k];
    let mut rhs = vec![0.0; k];
    for j in 0..k {
        let i = j + 1;
        sub[j] = h[i - 1];
        diag[j] = 2.0 * (h[i - 1] + h[i]);
        sup[j] = h[i];
        rhs[j] = 6.0 * (d[i] - d[i - 1]);
    }

    let inner = solve_tridiagonal(&sub, &diag, &sup, &rhs);
    let mut moments = Vec::with_capacity(n);
    moments.push(0.0);
    moments.extend(inner);
    moments.push(0.0);
    moments
}

/// Not-a-knot for n >= 4.
///
/// The end conditions `(M1 - M0)/h0 = (M2 - M1)/h1` (and the mirror image at
/// the far end) are substituted into the first and last interior rows, which
/// leaves a tridiagonal system in `M_1 ..= M_{n-2}`.
fn not_a_knot_moments(xs: &[f64], ys: &[f64]) -> Vec<f64> {
    let n = xs.len();
    let (h, d) = widths_and_slopes(xs, ys);
    let k = n - 2;

    let mut sub = vec![0.0; k];
    let mut diag = vec![0.0; k];
    let mut sup = vec![0.0; k];
    let mut rhs = vec![0.0; k];
    for j in 0..k {
        let i = j + 1;
        sub[j] = h[i - 1];
        diag[j] = 2.0 * (h[i - 1] + h[i]);
        sup[j] = h[i];
        rhs[j] = 6.0 * (d[i] - d[i - 1]);
    }

    let (h0, h1) = (h[0], h[1]);
    diag[0] = (h0 + h1) * (h0 + 2.0 * h1) / h1;
    sup[0] = (h1 * h1 - h0 * h0) / h1;

    let (ha, hb) = (h[n - 3], h[n - 2]);
    sub[k - 1] = (ha * ha - hb * hb) / ha;
    diag[k - 1] = (ha + hb) * (2.0 * ha + hb) / ha;

    let inner = solve_tridiagonal(&sub, &diag, &sup, &rhs);

    let first = ((h0 + h1) * inner[0] - h0 * inner[1]) / h1;
    let last = ((ha + hb) * inner[k - 1] - hb * inner[k - 2]) / ha;

    let mut moments = Vec::with_capacity(n);
    moments.push(first);
    moments.extend(inner);
    moments.push(last);
    moments
}

/// Thomas algorithm. `sub[0]` and `sup[last]` are ignored.
fn solve_tridiagonal(sub: &[f64], diag: &[f64], sup: &[f64], rhs: &[f64]) -> Vec<f64> {
    let n = diag.len();
    let mut c = vec![0.0; n];
    let mut r = vec![0.0; n];

    c[0] = if n > 1 { sup[0] / diag[0] } else { 0.0 };
    r[0] = rhs[0] / diag[0];
    for i in 1..n {
        let denom = diag[i] - sub[i] * c[i - 1];
        if i + 1 < n {
            c[i] = sup[i] / denom;
        }
        r[i] = (rhs[i] - sub[i] * r[i - 1]) / denom;
    }

    let mut x = r;
    for i in (0..n - 1).rev() {
        x[i] -= c[i] * x[i + 1];
    }
    x
}
