//! Errors raised while transforming monomials and generating code.
//!
//! Every error is fatal for the monomial or integral being processed: no partial output is
//! produced for that unit.
use std::error::Error;
use std::fmt;

use crate::element::ElementError;
use crate::monomial::IntegralType;

/// Error raised by the monomial transformer.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransformError {
    /// A factor resolved to more than one component index. Only scalar and vector valued
    /// factors are supported.
    Rank { num_components: usize },
    /// A component spans sub-elements with different mappings.
    MappingConflict { component_range: Vec<usize> },
    /// A summation index does not appear exactly twice.
    Contraction {
        range: Vec<usize>,
        num_internal: usize,
        num_external: usize,
    },
    /// A component refers to a value component the element does not have.
    InvalidComponent { component: usize, value_dimension: usize },
    /// A fixed component lies before the first component of its sub-element.
    InvalidOffset { component: usize, offset: usize },
    Element(ElementError),
}

impl fmt::Display for TransformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rank { num_components } => write!(
                f,
                "Can only handle rank 0 or rank 1 tensors, but factor has {num_components} components"
            ),
            Self::MappingConflict { component_range } => write!(
                f,
                "Unable to handle different mappings for component range {component_range:?}"
            ),
            Self::Contraction {
                range,
                num_internal,
                num_external,
            } => write!(
                f,
                "Summation index with range {range:?} does not appear exactly twice \
                 ({num_internal} internal, {num_external} external occurrence(s))"
            ),
            Self::InvalidComponent {
                component,
                value_dimension,
            } => write!(
                f,
                "Component {component} is out of bounds for element with value dimension {value_dimension}"
            ),
            Self::InvalidOffset { component, offset } => write!(
                f,
                "Component {component} precedes the sub-element offset {offset} reported by the element"
            ),
            Self::Element(err) => write!(f, "Failed to create element: {err}"),
        }
    }
}

impl Error for TransformError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Element(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ElementError> for TransformError {
    fn from(err: ElementError) -> Self {
        Self::Element(err)
    }
}

/// Error raised while generating code for an integral.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CodegenError {
    /// The integral type does not describe an integration, or is not supported.
    UnsupportedIntegralKind(IntegralType),
    /// The IR references a quadrature rule with the given number of points that is not present.
    MissingQuadratureRule { num_points: usize },
    /// The IR is inconsistent.
    MalformedIr(String),
    /// The backend cannot express the operator.
    UnsupportedOperator { operator: &'static str, backend: &'static str },
}

impl fmt::Display for CodegenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedIntegralKind(integral_type) => {
                write!(f, "Code generation for {integral_type} integrals is not supported")
            }
            Self::MissingQuadratureRule { num_points } => {
                write!(f, "No quadrature rule with {num_points} point(s) available")
            }
            Self::MalformedIr(reason) => write!(f, "Malformed integral IR: {reason}"),
            Self::UnsupportedOperator { operator, backend } => {
                write!(f, "Operator {operator} is not supported by the {backend} backend")
            }
        }
    }
}

impl Error for CodegenError {}
