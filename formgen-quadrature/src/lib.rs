//! Quadrature rules for finite element reference cells.
//!
//! The main purpose of this crate is to supply the quadrature rules tabulated by `formgen`
//! in generated element kernels. The rules can however be used independently of `formgen`.
//!
//! Two families of domains are covered:
//!
//! - the canonical interval `[-1, 1]`, see [`univariate`],
//! - the unit reference cells, i.e. the unit interval `[0, 1]`, the triangle with vertices
//!   `(0, 0), (1, 0), (0, 1)`, the tetrahedron with vertices `(0, 0, 0), (1, 0, 0), (0, 1, 0), (0, 0, 1)`
//!   and the unit square and cube, see [`reference`].
//!
//! Rules on simplices are obtained by collapsing a tensor product of Gauss-Jacobi rules onto
//! the simplex, which gives positive weights and points in the interior of the cell.

use std::fmt;
use std::fmt::{Display, Formatter};

pub mod reference;
pub mod univariate;

/// Library-wide error type.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// Indicates that a rule satisfying the given requirements is not available.
    NoRuleAvailable,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRuleAvailable => {
                write!(
                    f,
                    "There is no quadrature rule satisfying the requirements available"
                )
            }
        }
    }
}

impl std::error::Error for Error {}

/// A D-dimensional point.
pub type Point<const D: usize> = [f64; D];

/// A one-dimensional point.
pub type Point1 = Point<1>;

/// A two-dimensional point.
pub type Point2 = Point<2>;

/// A three-dimensional point.
pub type Point3 = Point<3>;

/// A D-dimensional rule, stored as weights and points.
pub type Rule<const D: usize> = (Vec<f64>, Vec<Point<D>>);

/// A one-dimensional quadrature rule.
pub type Rule1d = Rule<1>;

/// A two-dimensional quadrature rule.
pub type Rule2d = Rule<2>;

/// A three-dimensional rule.
pub type Rule3d = Rule<3>;

/// Approximates the integral of `f` with the given rule.
pub fn integrate<const D: usize>(rule: &Rule<D>, f: impl Fn(&Point<D>) -> f64) -> f64 {
    let (weights, points) = rule;
    weights
        .iter()
        .zip(points)
        .map(|(w, p)| w * f(p))
        .sum()
}

/// The number of points per coordinate direction needed to integrate polynomials of
/// total degree `degree` exactly with a Gauss-type tensor or collapsed rule.
pub fn points_per_direction(degree: usize) -> usize {
    (degree + 2) / 2
}
