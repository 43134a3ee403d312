//! Quadrature rules for the one-dimensional domain `[-1, 1]`.

use crate::Rule;
use nalgebra::{DMatrix, SymmetricEigen};
use std::f64::consts::PI;

/// Recurrence relation for Legendre polynomials.
///
/// Note: we use a formula for which derivatives are *not* defined at |x| == 1, so it is only
/// suitable for evaluation in the open interval (-1, 1).
#[derive(Debug, Default)]
struct LegendreRecurrence {
    n: usize,
    x: f64,
    // p_n(x)
    p1: f64,
    // p_{n - 1}(x)
    p2: f64,
}

impl LegendreRecurrence {
    pub fn evaluate(n: usize, x: f64) -> Self {
        //  m P_m(x) = (2m - 1) * x P_{m - 1}(x) - (m - 1) P_{m - 2}(x)
        let (mut p1, mut p2) = (1.0, 0.0);
        for m in 1..=n {
            let m = m as f64;
            let p3 = p2;
            p2 = p1;
            p1 = ((2.0 * m - 1.0) * x * p2 - (m - 1.0) * p3) / m;
        }

        Self { n, x, p1, p2 }
    }

    fn value(&self) -> f64 {
        self.p1
    }

    fn derivative(&self) -> f64 {
        let Self { n, x, p1, p2 } = &self;
        let n = *n as f64;
        // dp_n/dx (x) = n * (x * p_n(x) - p_{n - 1}(x)) / (x^2 - 1)
        n * (x * p1 - p2) / (x * x - 1.0)
    }
}

/// Gauss(-Legendre) quadrature for the reference interval [-1, 1].
///
/// Given `n` points, the rule integrates polynomials of order up to `2 n - 1` exactly.
/// Points are returned in ascending order.
///
/// # Panics
///
/// Panics if zero points are requested.
pub fn gauss(num_points: usize) -> Rule<1> {
    let n = num_points;
    assert!(n > 0, "number of points must be positive");

    // Newton iteration from the asymptotic root estimates, only for the roots in (0, 1).
    // The remaining roots follow by symmetry.
    let m = (n + 1) / 2;
    let mut positive_half = Vec::with_capacity(m);
    for i in 0..m {
        let mut x = (PI * (i as f64 + 0.75) / (n as f64 + 0.5)).cos();
        let mut recurrence = LegendreRecurrence::evaluate(n, x);
        for _ in 0..100 {
            let dx = -recurrence.value() / recurrence.derivative();
            x += dx;
            recurrence = LegendreRecurrence::evaluate(n, x);
            if dx.abs() <= 1e-15 {
                break;
            }
        }
        let dp = recurrence.derivative();
        positive_half.push((x, 2.0 / ((1.0 - x * x) * dp * dp)));
    }

    // The middle root of an odd rule is exactly zero, don't duplicate it
    let mirrored = positive_half[..n / 2].iter().map(|&(x, w)| (-x, w));
    let mut rule: Vec<(f64, f64)> = positive_half
        .iter()
        .copied()
        .chain(mirrored)
        .collect();
    rule.sort_by(|a, b| a.0.total_cmp(&b.0));
    assert_eq!(rule.len(), n, "Internal error: incorrect number of points produced");

    rule.into_iter().map(|(x, w)| (w, [x])).unzip()
}

/// Gauss-Jacobi quadrature on [-1, 1] for the weight function `(1 - x)^alpha`.
///
/// Given `n` points, the rule integrates `(1 - x)^alpha p(x)` exactly for polynomials `p`
/// of order up to `2 n - 1`. The nodes and weights are computed with the Golub-Welsch
/// algorithm from the Jacobi matrix of the three-term recurrence. Points are returned in
/// ascending order.
///
/// # Panics
///
/// Panics if zero points are requested.
pub fn gauss_jacobi(num_points: usize, alpha: u32) -> Rule<1> {
    let n = num_points;
    assert!(n > 0, "number of points must be positive");

    let a = alpha as f64;
    // beta = 0 throughout, which simplifies the recurrence coefficients
    let diagonal = |k: usize| {
        if k == 0 {
            -a / (a + 2.0)
        } else {
            let s = 2.0 * k as f64 + a;
            -a * a / (s * (s + 2.0))
        }
    };
    let off_diagonal = |k: usize| {
        let k = k as f64;
        let s = 2.0 * k + a;
        (4.0 * k * (k + a) * k * (k + a) / (s * s * (s + 1.0) * (s - 1.0))).sqrt()
    };

    let mut jacobi_matrix = DMatrix::zeros(n, n);
    for k in 0..n {
        jacobi_matrix[(k, k)] = diagonal(k);
        if k > 0 {
            let b = off_diagonal(k);
            jacobi_matrix[(k, k - 1)] = b;
            jacobi_matrix[(k - 1, k)] = b;
        }
    }

    // Integral of the weight function over [-1, 1]
    let mu0 = 2.0f64.powi(alpha as i32 + 1) / (a + 1.0);
    let eigen = SymmetricEigen::new(jacobi_matrix);
    let mut rule: Vec<(f64, f64)> = (0..n)
        .map(|i| {
            let v0 = eigen.eigenvectors[(0, i)];
            (eigen.eigenvalues[i], mu0 * v0 * v0)
        })
        .collect();
    rule.sort_by(|a, b| a.0.total_cmp(&b.0));

    rule.into_iter().map(|(x, w)| (w, [x])).unzip()
}
