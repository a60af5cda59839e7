//! Numerical integration over sampled curves.

/// Integrate `ys` over the abscissae `xs` with the composite trapezoidal rule.
///
/// `xs` need not be evenly spaced; repeated abscissae contribute a zero-width
/// panel. Fewer than two points integrate to 0. Mismatched lengths return NaN.
pub fn trapezoid(ys: &[f64], xs: &[f64]) -> f64 {
    if ys.len() != xs.len() {
        return f64::NAN;
    }
    if xs.len() < 2 {
        return 0.0;
    }
    xs.windows(2)
        .zip(ys.windows(2))
        .map(|(x, y)| (x[1] - x[0]) * (y[0] + y[1]) * 0.5)
        .sum()
}

/// Integrate a function sampled on `grid` with the trapezoidal rule.
pub fn trapezoid_fn<F>(grid: &[f64], f: F) -> f64
where
    F: Fn(f64) -> f64,
{
    let ys: Vec<f64> = grid.iter().map(|&x| f(x)).collect();
    trapezoid(&ys, grid)
}

/// `n` evenly spaced points covering `[lo, hi]` inclusive.
pub fn linspace(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![lo],
        _ => {
            let step = (hi - lo) / (n - 1) as f64;
            (0..n).map(|i| lo + step * i as f64).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        if a.is_nan() || b.is_nan() {
            return false;
        }
        (a - b).abs() <= tol
    }

    #[test]
    fn trapezoid_exact_for_linear() {
        let xs = [0.0, 1.0, 3.0, 4.0];
        let ys: Vec<f64> = xs.iter().map(|x| 2.0 * x + 1.0).collect();
        // integral of 2x+1 over [0,4] = 16 + 4
        assert!(approx_eq(trapezoid(&ys, &xs), 20.0, 1e-12));
    }

    #[test]
    fn trapezoid_repeated_abscissa_is_zero_width() {
        let xs = [0.0, 1.0, 1.0, 2.0];
        let ys = [1.0, 1.0, 5.0, 5.0];
        // panels: [0,1] area 1, [1,1] area 0, [1,2] area 5
        assert!(approx_eq(trapezoid(&ys, &xs), 6.0, 1e-12));
    }

    #[test]
    fn trapezoid_degenerate_inputs() {
        assert_eq!(trapezoid(&[], &[]), 0.0);
        assert_eq!(trapezoid(&[3.0], &[1.0]), 0.0);
        assert!(trapezoid(&[1.0, 2.0], &[1.0]).is_nan());
    }

    #[test]
    fn trapezoid_fn_approximates_quadratic() {
        let grid = linspace(0.0, 1.0, 1001);
        let area = trapezoid_fn(&grid, |x| x * x);
        assert!(approx_eq(area, 1.0 / 3.0, 1e-6));
    }

    #[test]
    fn linspace_endpoints() {
        let v = linspace(-1.0, 1.0, 5);
        assert_eq!(v.len(), 5);
        assert!(approx_eq(v[0], -1.0, 1e-15));
        assert!(approx_eq(v[4], 1.0, 1e-15));
        assert!(approx_eq(v[2], 0.0, 1e-15));
        assert!(linspace(0.0, 1.0, 0).is_empty());
        assert_eq!(linspace(2.0, 5.0, 1), vec![2.0]);
    }
}
