//! Quadrature rules tabulated in generated code.
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use formgen_quadrature::{reference, Rule};

/// Errors returned by quadrature rule providers.
pub use formgen_quadrature::Error as QuadratureError;

use crate::element::CellShape;

/// A quadrature rule on a reference cell.
///
/// Points are stored as the rows of an `N x dim` matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuadratureRule {
    points: DMatrix<f64>,
    weights: Vec<f64>,
}

impl QuadratureRule {
    /// # Panics
    ///
    /// Panics if the number of weights does not match the number of points.
    pub fn new(points: DMatrix<f64>, weights: Vec<f64>) -> Self {
        assert_eq!(
            points.nrows(),
            weights.len(),
            "Number of points and weights must be the same"
        );
        Self { points, weights }
    }

    pub fn from_rule<const D: usize>(rule: Rule<D>) -> Self {
        let (weights, points) = rule;
        let points = DMatrix::from_fn(points.len(), D, |i, j| points[i][j]);
        Self::new(points, weights)
    }

    /// The rule consisting of the origin of a zero-dimensional cell with unit weight.
    pub fn point() -> Self {
        Self::new(DMatrix::zeros(1, 0), vec![1.0])
    }

    pub fn num_points(&self) -> usize {
        self.weights.len()
    }

    /// The dimension of the points.
    pub fn dim(&self) -> usize {
        self.points.ncols()
    }

    pub fn points(&self) -> &DMatrix<f64> {
        &self.points
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn point_at(&self, index: usize) -> Vec<f64> {
        self.points.row(index).iter().copied().collect()
    }

    /// The point coordinates in row-major order, i.e. all coordinates of the first point,
    /// then all coordinates of the second point and so on.
    pub fn flattened_points(&self) -> Vec<f64> {
        self.points
            .row_iter()
            .flat_map(|row| row.iter().copied().collect::<Vec<_>>())
            .collect()
    }
}

/// Supplies quadrature rules for reference cells.
pub trait QuadratureRuleProvider {
    /// Returns a rule that integrates polynomials of total degree `degree` exactly on the
    /// reference cell of the given shape.
    fn create_rule(&self, cell: CellShape, degree: usize) -> Result<QuadratureRule, QuadratureError>;
}

/// Gauss rules on the unit reference cells, collapsed onto simplices.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceQuadrature {
    max_degree: usize,
}

impl Default for ReferenceQuadrature {
    fn default() -> Self {
        Self { max_degree: 30 }
    }
}

impl ReferenceQuadrature {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limits the degree of the rules this provider creates.
    pub fn with_max_degree(self, max_degree: usize) -> Self {
        Self { max_degree }
    }

    pub fn max_degree(&self) -> usize {
        self.max_degree
    }
}

impl QuadratureRuleProvider for ReferenceQuadrature {
    fn create_rule(&self, cell: CellShape, degree: usize) -> Result<QuadratureRule, QuadratureError> {
        if degree > self.max_degree {
            return Err(QuadratureError::NoRuleAvailable);
        }
        let rule = match cell {
            CellShape::Vertex => QuadratureRule::point(),
            CellShape::Interval => QuadratureRule::from_rule(reference::interval(degree)),
            CellShape::Triangle => QuadratureRule::from_rule(reference::triangle(degree)),
            CellShape::Quadrilateral => QuadratureRule::from_rule(reference::quadrilateral(degree)),
            CellShape::Tetrahedron => QuadratureRule::from_rule(reference::tetrahedron(degree)),
            CellShape::Hexahedron => QuadratureRule::from_rule(reference::hexahedron(degree)),
        };
        Ok(rule)
    }
}

impl<const D: usize> From<Rule<D>> for QuadratureRule {
    fn from(rule: Rule<D>) -> Self {
        Self::from_rule(rule)
    }
}

