//! Polynomial fitting and evaluation shared by the orbit and baseline models.

use crate::types::{SarError, SarResult};
use nalgebra::DMatrix;
use num_traits::Float;

/// Relative size of a QR diagonal element below which the design matrix is
/// treated as rank deficient
const RANK_TOLERANCE: f64 = 1e-12;

/// Maximum residual at the data points (m) before a fit is reported as poor
const MAX_FIT_RESIDUAL: f64 = 0.02;

/// Map `data` from `[min, max]` onto `[-2, 2]`
pub fn normalize2(data: f64, min: f64, max: f64) -> f64 {
    (data - 0.5 * (min + max)) / (0.25 * (max - min))
}

/// Orbit time normalization: seconds from `reference`, in units of 10 s
pub fn normalize_time(t: f64, reference: f64) -> f64 {
    (t - reference) / 10.0
}

/// Linear least squares `design * x = rhs` for every column of `rhs`.
///
/// Uses a Householder QR of the design matrix rather than forming the normal
/// equations, so the conditioning is that of `design`, not its square.
pub fn least_squares(design: &DMatrix<f64>, rhs: &DMatrix<f64>) -> SarResult<DMatrix<f64>> {
    let (rows, cols) = design.shape();
    if rows < cols {
        return Err(SarError::InsufficientData { required: cols, available: rows });
    }
    if rhs.nrows() != rows {
        return Err(SarError::InvalidInput(format!(
            "right-hand side has {} rows, design matrix {}",
            rhs.nrows(),
            rows
        )));
    }

    let qr = design.clone().qr();
    let r = qr.r();

    let max_diag = r.diagonal().amax();
    if !max_diag.is_finite() || max_diag == 0.0 {
        return Err(SarError::DegenerateFit("design matrix is zero or not finite".to_string()));
    }
    if let Some(k) = r.diagonal().iter().position(|d| d.abs() <= RANK_TOLERANCE * max_diag) {
        return Err(SarError::DegenerateFit(format!(
            "design matrix rank deficient at column {} of {}",
            k, cols
        )));
    }

    let qtb = qr.q().transpose() * rhs;
    r.solve_upper_triangular(&qtb)
        .ok_or_else(|| SarError::DegenerateFit("singular triangular factor".to_string()))
}

/// Vandermonde design matrix `A[i][k] = t_i^k`, `k = 0..=degree`
fn vandermonde(t: &[f64], degree: usize) -> DMatrix<f64> {
    DMatrix::from_fn(t.len(), degree + 1, |i, k| t[i].powi(k as i32))
}

/// Least-squares polynomial fit of every series in `series` against `t`.
///
/// Returns one coefficient vector per series, constant term first.
pub fn polyfit_series(t: &[f64], series: &[&[f64]], degree: usize) -> SarResult<Vec<Vec<f64>>> {
    let num_points = t.len();
    let num_unknowns = degree + 1;

    log::debug!("Degree of interpolating polynomial: {}", degree);
    log::debug!("Number of unknowns: {}, data points: {}", num_unknowns, num_points);

    if num_points < num_unknowns {
        return Err(SarError::InsufficientData {
            required: num_unknowns,
            available: num_points,
        });
    }
    if let Some(bad) = series.iter().find(|s| s.len() != num_points) {
        return Err(SarError::InvalidInput(format!(
            "polyfit: series of length {} does not match {} sample times",
            bad.len(),
            num_points
        )));
    }
    if t.iter().chain(series.iter().flat_map(|s| s.iter())).any(|v| !v.is_finite()) {
        return Err(SarError::InvalidInput("polyfit: non-finite sample".to_string()));
    }

    let design = vandermonde(t, degree);
    let rhs = DMatrix::from_fn(num_points, series.len(), |i, j| series[j][i]);
    let solution = least_squares(&design, &rhs)?;

    let residuals = &rhs - &design * &solution;
    let max_error = residuals.amax();
    if max_error > MAX_FIT_RESIDUAL {
        log::warn!("Max. polyfit approximation error at data points: {:.6}", max_error);
    } else {
        log::debug!("Max. polyfit approximation error at data points: {:.3e}", max_error);
    }

    Ok(solution
        .column_iter()
        .map(|column| column.iter().copied().collect())
        .collect())
}

/// Least-squares fit of `y = a0 + a1 t + ... + ad t^d`
pub fn polyfit(t: &[f64], y: &[f64], degree: usize) -> SarResult<Vec<f64>> {
    let mut coeffs = polyfit_series(t, &[y], degree)?;
    Ok(coeffs.remove(0))
}

/// Fit against orbit-normalized time (relative to the middle sample, in 10 s)
pub fn polyfit_normalized(t: &[f64], y: &[f64], degree: usize) -> SarResult<Vec<f64>> {
    let reference = t.get(t.len() / 2).copied().ok_or(SarError::InsufficientData {
        required: degree + 1,
        available: 0,
    })?;
    let normalized: Vec<f64> = t.iter().map(|&ti| normalize_time(ti, reference)).collect();
    polyfit(&normalized, y, degree)
}

/// Horner evaluation of `sum c_k x^k`
pub fn polyval1d<T: Float>(x: T, coeffs: &[T]) -> T {
    coeffs.iter().rev().fold(T::zero(), |sum, &c| sum * x + c)
}

/// Value of the `order`-th derivative of `sum c_k x^k` at `x`
pub fn polyval1d_derivative(x: f64, coeffs: &[f64], order: usize) -> f64 {
    coeffs
        .iter()
        .enumerate()
        .skip(order)
        .rev()
        .fold(0.0, |sum, (k, &c)| {
            // k! / (k - order)!
            let falling: f64 = ((k - order + 1)..=k).map(|i| i as f64).product();
            sum * x + c * falling
        })
}
