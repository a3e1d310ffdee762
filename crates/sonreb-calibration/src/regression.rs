//! Ordinary least squares on a mean-centred design via QR.
//!
//! Centring removes the intercept column, which keeps the system well
//! conditioned when log-regressors have large means (ln UPV ≈ 8.3). The
//! intercept is recovered as `ȳ − Σ bⱼ·x̄ⱼ`.

use nalgebra::{DMatrix, DVector};

use sonreb_core::DegenerateReason;

/// A column whose `R` diagonal falls below this fraction of its starting
/// norm is treated as linearly dependent on earlier columns.
pub const RANK_TOLERANCE: f64 = 1e-10;

/// Result of a centred least-squares solve.
#[derive(Debug, Clone, PartialEq)]
pub struct LeastSquares {
    /// Fitted intercept.
    pub intercept: f64,
    /// One slope per regressor column, in input order.
    pub slopes: Vec<f64>,
}

/// Arithmetic mean. Zero for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Fit `y ≈ intercept + Σ slopes[j]·columns[j]`.
///
/// Every column must have the same length as `y`. Constant columns are
/// expected to have been rejected by the caller; a column that is constant
/// or a linear combination of earlier ones reports `RankDeficient`.
pub fn fit_centred(columns: &[Vec<f64>], y: &[f64]) -> Result<LeastSquares, DegenerateReason> {
    let n = y.len();
    let p = columns.len();
    if n <= p || columns.iter().any(|c| c.len() != n) {
        return Err(DegenerateReason::RankDeficient);
    }

    let x_means: Vec<f64> = columns.iter().map(|c| mean(c)).collect();
    let y_mean = mean(y);

    let design = DMatrix::from_fn(n, p, |i, j| columns[j][i] - x_means[j]);
    let target = DVector::from_iterator(n, y.iter().map(|v| v - y_mean));

    let col_norms: Vec<f64> = design.column_iter().map(|c| c.norm()).collect();
    let qr = design.qr();
    let r = qr.r();
    for (k, norm) in col_norms.iter().enumerate() {
        if *norm == 0.0 || r[(k, k)].abs() <= RANK_TOLERANCE * norm {
            return Err(DegenerateReason::RankDeficient);
        }
    }

    let qt_b = qr.q().transpose() * target;
    let slopes: Vec<f64> = r
        .solve_upper_triangular(&qt_b)
        .ok_or(DegenerateReason::RankDeficient)?
        .iter()
        .copied()
        .collect();

    let intercept = y_mean
        - slopes
            .iter()
            .zip(&x_means)
            .map(|(s, m)| s * m)
            .sum::<f64>();

    if !intercept.is_finite() || slopes.iter().any(|s| !s.is_finite()) {
        return Err(DegenerateReason::NonFiniteCoefficients);
    }

    Ok(LeastSquares { intercept, slopes })
}

/// Coefficient of determination and root-mean-square error of `predicted`
/// against `measured`.
///
/// `r2` is not clamped. With zero total variance it is 1.0 for a perfect fit
/// and 0.0 otherwise. Both are 0.0 for empty input.
pub fn goodness_of_fit(predicted: &[f64], measured: &[f64]) -> (f64, f64) {
    let n = predicted.len().min(measured.len());
    if n == 0 {
        return (0.0, 0.0);
    }
    let measured = &measured[..n];
    let predicted = &predicted[..n];

    let m_mean = mean(measured);
    let ss_res: f64 = predicted
        .iter()
        .zip(measured)
        .map(|(p, m)| (m - p) * (m - p))
        .sum();
    let ss_tot: f64 = measured.iter().map(|m| (m - m_mean) * (m - m_mean)).sum();

    let r2 = if ss_tot == 0.0 {
        if ss_res == 0.0 {
            1.0
        } else {
            0.0
        }
    } else {
        1.0 - ss_res / ss_tot
    };
    let rmse = (ss_res / n as f64).sqrt();
    (r2, rmse)
}
