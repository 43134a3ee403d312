//! Quadrature rules on the unit reference cells.
//!
//! Every rule is parametrized by the total polynomial degree it should integrate exactly.
//! Tensor cells use `m^d` Gauss points, simplices use the same number of points obtained by
//! collapsing the unit square or cube onto the simplex (Duffy transform), with the
//! Jacobian of the collapse absorbed into Gauss-Jacobi weights.

use crate::univariate::{gauss, gauss_jacobi};
use crate::{points_per_direction, Rule};

/// Maps a rule for `[-1, 1]` with weight `(1 - x)^alpha` to a rule for `[0, 1]` with
/// weight `(1 - x)^alpha`.
fn collapsed_direction(num_points: usize, alpha: u32) -> Vec<(f64, f64)> {
    let (weights, points) = if alpha == 0 {
        gauss(num_points)
    } else {
        gauss_jacobi(num_points, alpha)
    };
    let scale = 0.5f64.powi(alpha as i32 + 1);
    weights
        .into_iter()
        .zip(points)
        .map(|(w, [x])| (scale * w, 0.5 * (1.0 + x)))
        .collect()
}

/// A Gauss rule for the unit interval `[0, 1]`.
pub fn interval(degree: usize) -> Rule<1> {
    collapsed_direction(points_per_direction(degree), 0)
        .into_iter()
        .map(|(w, x)| (w, [x]))
        .unzip()
}

/// A tensor-product Gauss rule for the unit square.
pub fn quadrilateral(degree: usize) -> Rule<2> {
    let rule1d = collapsed_direction(points_per_direction(degree), 0);
    let mut weights = Vec::with_capacity(rule1d.len().pow(2));
    let mut points = Vec::with_capacity(rule1d.len().pow(2));
    for &(wx, x) in &rule1d {
        for &(wy, y) in &rule1d {
            weights.push(wx * wy);
            points.push([x, y]);
        }
    }
    (weights, points)
}

/// A tensor-product Gauss rule for the unit cube.
pub fn hexahedron(degree: usize) -> Rule<3> {
    let rule1d = collapsed_direction(points_per_direction(degree), 0);
    let mut weights = Vec::with_capacity(rule1d.len().pow(3));
    let mut points = Vec::with_capacity(rule1d.len().pow(3));
    for &(wx, x) in &rule1d {
        for &(wy, y) in &rule1d {
            for &(wz, z) in &rule1d {
                weights.push(wx * wy * wz);
                points.push([x, y, z]);
            }
        }
    }
    (weights, points)
}

/// A collapsed Gauss-Jacobi rule for the reference triangle `(0, 0), (1, 0), (0, 1)`.
pub fn triangle(degree: usize) -> Rule<2> {
    let m = points_per_direction(degree);
    let rule_u = collapsed_direction(m, 0);
    let rule_v = collapsed_direction(m, 1);
    let mut weights = Vec::with_capacity(m * m);
    let mut points = Vec::with_capacity(m * m);
    for &(wu, u) in &rule_u {
        for &(wv, v) in &rule_v {
            weights.push(wu * wv);
            points.push([u * (1.0 - v), v]);
        }
    }
    (weights, points)
}

/// A collapsed Gauss-Jacobi rule for the reference tetrahedron
/// `(0, 0, 0), (1, 0, 0), (0, 1, 0), (0, 0, 1)`.
pub fn tetrahedron(degree: usize) -> Rule<3> {
    let m = points_per_direction(degree);
    let rule_u = collapsed_direction(m, 0);
    let rule_v = collapsed_direction(m, 1);
    let rule_w = collapsed_direction(m, 2);
    let mut weights = Vec::with_capacity(m * m * m);
    let mut points = Vec::with_capacity(m * m * m);
    for &(wu, u) in &rule_u {
        for &(wv, v) in &rule_v {
            for &(ww, w) in &rule_w {
                weights.push(wu * wv * ww);
                points.push([u * (1.0 - v) * (1.0 - w), v * (1.0 - w), w]);
            }
        }
    }
    (weights, points)
}
