//! Small numeric helpers shared by the metric calculators.
//!
//! All functions are pure and operate on plain `f64` slices so they can be
//! tested against hand-computed values without building a dataset.

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divisor `n`, not `n - 1`).
pub fn population_std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Ordinary least squares over the implicit index series `x = 0, 1, 2, ...`.
/// Returns `(slope, intercept)`; degenerate inputs yield a flat fit.
pub fn linear_regression(y: &[f64]) -> (f64, f64) {
    let n = y.len();
    if n < 2 {
        return (0.0, y.first().copied().unwrap_or(0.0));
    }
    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = mean(y);

    let mut ss_xy = 0.0;
    let mut ss_xx = 0.0;
    for (i, value) in y.iter().enumerate() {
        let dx = i as f64 - x_mean;
        ss_xy += dx * (value - y_mean);
        ss_xx += dx * dx;
    }

    if ss_xx == 0.0 {
        return (0.0, y_mean);
    }
    let slope = ss_xy / ss_xx;
    let intercept = y_mean - slope * x_mean;
    (slope, intercept)
}

/// Coefficient of determination for a line fitted over `x = 0, 1, 2, ...`.
pub fn r_squared(y: &[f64], slope: f64, intercept: f64) -> f64 {
    if y.len() < 2 {
        return 0.0;
    }
    let y_mean = mean(y);
    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    for (i, value) in y.iter().enumerate() {
        let predicted = slope * i as f64 + intercept;
        ss_res += (value - predicted).powi(2);
        ss_tot += (value - y_mean).powi(2);
    }
    if ss_tot == 0.0 {
        // Constant series: a flat fit explains it perfectly.
        return if ss_res < f64::EPSILON { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

/// Pearson correlation between the index series `0, 1, 2, ...` and `y`.
/// Returns 0.0 when either side has no variance.
pub fn index_correlation(y: &[f64]) -> f64 {
    let n = y.len();
    if n < 2 {
        return 0.0;
    }
    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = mean(y);

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (i, value) in y.iter().enumerate() {
        let dx = i as f64 - x_mean;
        let dy = value - y_mean;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return 0.0;
    }
    cov / (var_x.sqrt() * var_y.sqrt())
}

/// Linear-interpolation percentile, `q` in `[0, 1]`. Matches the behavior of
/// the usual dataframe `quantile` with its default interpolation.
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted: Vec<f64> = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let q = q.clamp(0.0, 1.0);
    let rank = q * (sorted.len() - 1) as f64;
    let low = rank.floor() as usize;
    let high = rank.ceil() as usize;
    if low == high {
        return sorted[low];
    }
    let fraction = rank - low as f64;
    sorted[low] + (sorted[high] - sorted[low]) * fraction
}
