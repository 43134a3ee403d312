//! Element metadata consumed by the monomial transformer.
//!
//! The transformer never evaluates basis functions. It only needs to know the dimensions of
//! an element and how each value component maps from the reference cell to the physical
//! cell. This module describes that contract ([`FiniteElement`], [`ElementProvider`]) and
//! provides [`ReferenceElementProvider`], which derives the metadata for the common element
//! families from an [`ElementDescriptor`].
use std::error::Error;
use std::fmt;

use formgen_quadrature::points_per_direction;
use serde::{Deserialize, Serialize};

/// The shape of a reference cell.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CellShape {
    Vertex,
    Interval,
    Triangle,
    Quadrilateral,
    Tetrahedron,
    Hexahedron,
}

impl CellShape {
    pub fn topological_dimension(&self) -> usize {
        match self {
            CellShape::Vertex => 0,
            CellShape::Interval => 1,
            CellShape::Triangle | CellShape::Quadrilateral => 2,
            CellShape::Tetrahedron | CellShape::Hexahedron => 3,
        }
    }

    pub fn num_vertices(&self) -> usize {
        match self {
            CellShape::Vertex => 1,
            CellShape::Interval => 2,
            CellShape::Triangle => 3,
            CellShape::Quadrilateral | CellShape::Tetrahedron => 4,
            CellShape::Hexahedron => 8,
        }
    }

    pub fn num_facets(&self) -> usize {
        match self {
            CellShape::Vertex => 0,
            CellShape::Interval => 2,
            CellShape::Triangle => 3,
            CellShape::Quadrilateral | CellShape::Tetrahedron => 4,
            CellShape::Hexahedron => 6,
        }
    }

    pub fn is_simplex(&self) -> bool {
        matches!(
            self,
            CellShape::Vertex | CellShape::Interval | CellShape::Triangle | CellShape::Tetrahedron
        )
    }
}

impl fmt::Display for CellShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CellShape::Vertex => "vertex",
            CellShape::Interval => "interval",
            CellShape::Triangle => "triangle",
            CellShape::Quadrilateral => "quadrilateral",
            CellShape::Tetrahedron => "tetrahedron",
            CellShape::Hexahedron => "hexahedron",
        };
        write!(f, "{name}")
    }
}

/// How values of an element are mapped from the reference cell to the physical cell.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mapping {
    Affine,
    /// `phi(x) = (det J)^{-1} J Phi(X)`
    ContravariantPiola,
    /// `phi(x) = J^{-T} Phi(X)`
    CovariantPiola,
}

/// The mapping of a single value component, together with the offset of the first
/// component of the (sub-)element the component belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentElement {
    pub mapping: Mapping,
    pub offset: usize,
}

/// Symbolic description of a finite element, as it appears in a variational form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementDescriptor {
    Lagrange { cell: CellShape, degree: usize },
    DiscontinuousLagrange { cell: CellShape, degree: usize },
    RaviartThomas { cell: CellShape, degree: usize },
    BrezziDouglasMarini { cell: CellShape, degree: usize },
    /// Nedelec element of the first kind.
    Nedelec { cell: CellShape, degree: usize },
    /// Global constants.
    Real { cell: CellShape },
    /// Values stored directly at the quadrature points of a rule of the given degree.
    Quadrature { cell: CellShape, degree: usize },
    /// Copies of a scalar element, one per component. If `dim` is not given,
    /// the geometric dimension of the cell is used.
    Vector { base: Box<ElementDescriptor>, dim: Option<usize> },
    Mixed(Vec<ElementDescriptor>),
}

impl ElementDescriptor {
    pub fn lagrange(cell: CellShape, degree: usize) -> Self {
        Self::Lagrange { cell, degree }
    }

    pub fn vector_lagrange(cell: CellShape, degree: usize) -> Self {
        Self::Vector {
            base: Box::new(Self::lagrange(cell, degree)),
            dim: None,
        }
    }

    /// The family name of the element.
    pub fn family(&self) -> &'static str {
        match self {
            Self::Lagrange { .. } => "Lagrange",
            Self::DiscontinuousLagrange { .. } => "Discontinuous Lagrange",
            Self::RaviartThomas { .. } => "Raviart-Thomas",
            Self::BrezziDouglasMarini { .. } => "Brezzi-Douglas-Marini",
            Self::Nedelec { .. } => "Nedelec 1st kind H(curl)",
            Self::Real { .. } => "Real",
            Self::Quadrature { .. } => "Quadrature",
            Self::Vector { .. } => "Vector",
            Self::Mixed(_) => "Mixed",
        }
    }

    /// The cell of the element. Returns `None` for an empty mixed element.
    pub fn cell(&self) -> Option<CellShape> {
        match self {
            Self::Lagrange { cell, .. }
            | Self::DiscontinuousLagrange { cell, .. }
            | Self::RaviartThomas { cell, .. }
            | Self::BrezziDouglasMarini { cell, .. }
            | Self::Nedelec { cell, .. }
            | Self::Real { cell }
            | Self::Quadrature { cell, .. } => Some(*cell),
            Self::Vector { base, .. } => base.cell(),
            Self::Mixed(elements) => elements.first().and_then(|e| e.cell()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ElementError {
    InvalidDegree { family: &'static str, degree: usize },
    UnsupportedCell { family: &'static str, cell: CellShape },
    NonScalarVectorBase,
    EmptyMixedElement,
    CellMismatch { expected: CellShape, found: CellShape },
}

impl fmt::Display for ElementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDegree { family, degree } => {
                write!(f, "{family} elements are not defined for degree {degree}")
            }
            Self::UnsupportedCell { family, cell } => {
                write!(f, "{family} elements are not available on a {cell}")
            }
            Self::NonScalarVectorBase => write!(f, "Vector elements must be built from scalar elements"),
            Self::EmptyMixedElement => write!(f, "Mixed elements must have at least one sub-element"),
            Self::CellMismatch { expected, found } => write!(
                f,
                "All sub-elements of a mixed element must be defined on the same cell \
                 (expected {expected}, found {found})"
            ),
        }
    }
}

impl Error for ElementError {}

/// Metadata of a finite element needed to transform monomials.
pub trait FiniteElement {
    /// The number of value components.
    fn value_dimension(&self) -> usize;

    /// The number of basis functions.
    fn space_dimension(&self) -> usize;

    /// The dimension of the reference cell.
    fn topological_dimension(&self) -> usize;

    /// The dimension of the physical cell.
    fn geometric_dimension(&self) -> usize;

    fn num_sub_elements(&self) -> usize;

    /// The mapping and sub-element offset of the given value component, or `None` if the
    /// component is out of bounds.
    fn component_element(&self, component: usize) -> Option<ComponentElement>;

    fn cell_shape(&self) -> CellShape;
}

/// Resolves element descriptors into element metadata.
pub trait ElementProvider {
    type Element: FiniteElement;

    fn create_element(&self, descriptor: &ElementDescriptor) -> Result<Self::Element, ElementError>;
}

impl<P: ElementProvider> ElementProvider for &P {
    type Element = P::Element;

    fn create_element(&self, descriptor: &ElementDescriptor) -> Result<Self::Element, ElementError> {
        P::create_element(self, descriptor)
    }
}

/// Element metadata computed by [`ReferenceElementProvider`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementInfo {
    cell: CellShape,
    space_dimension: usize,
    num_sub_elements: usize,
    components: Vec<ComponentElement>,
}

impl FiniteElement for ElementInfo {
    fn value_dimension(&self) -> usize {
        self.components.len()
    }

    fn space_dimension(&self) -> usize {
        self.space_dimension
    }

    fn topological_dimension(&self) -> usize {
        self.cell.topological_dimension()
    }

    fn geometric_dimension(&self) -> usize {
        self.cell.topological_dimension()
    }

    fn num_sub_elements(&self) -> usize {
        self.num_sub_elements
    }

    fn component_element(&self, component: usize) -> Option<ComponentElement> {
        self.components.get(component).copied()
    }

    fn cell_shape(&self) -> CellShape {
        self.cell
    }
}

/// Derives element metadata from closed-form dimension counts of the element families on
/// their reference cells.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ReferenceElementProvider;

impl ElementProvider for ReferenceElementProvider {
    type Element = ElementInfo;

    fn create_element(&self, descriptor: &ElementDescriptor) -> Result<ElementInfo, ElementError> {
        element_info(descriptor)
    }
}

fn binomial(n: usize, k: usize) -> usize {
    (1..=k).fold(1, |acc, i| acc * (n - k + i) / i)
}

fn simple_element(cell: CellShape, space_dimension: usize, value_dimension: usize, mapping: Mapping) -> ElementInfo {
    ElementInfo {
        cell,
        space_dimension,
        num_sub_elements: 1,
        components: vec![ComponentElement { mapping, offset: 0 }; value_dimension],
    }
}

fn lagrange_dimension(cell: CellShape, degree: usize) -> usize {
    let d = cell.topological_dimension();
    if cell.is_simplex() {
        binomial(degree + d, d)
    } else {
        (degree + 1).pow(d as u32)
    }
}

fn element_info(descriptor: &ElementDescriptor) -> Result<ElementInfo, ElementError> {
    use ElementDescriptor::*;
    let family = descriptor.family();
    match descriptor {
        &Lagrange { cell, degree } => {
            if degree == 0 {
                return Err(ElementError::InvalidDegree { family, degree });
            }
            Ok(simple_element(cell, lagrange_dimension(cell, degree), 1, Mapping::Affine))
        }
        &DiscontinuousLagrange { cell, degree } => {
            Ok(simple_element(cell, lagrange_dimension(cell, degree), 1, Mapping::Affine))
        }
        &RaviartThomas { cell, degree } | &BrezziDouglasMarini { cell, degree } | &Nedelec { cell, degree } => {
            if degree == 0 {
                return Err(ElementError::InvalidDegree { family, degree });
            }
            let k = degree;
            let space_dimension = match (descriptor, cell) {
                (RaviartThomas { .. }, CellShape::Triangle) => k * (k + 2),
                (RaviartThomas { .. }, CellShape::Tetrahedron) => k * (k + 1) * (k + 3) / 2,
                (BrezziDouglasMarini { .. }, CellShape::Triangle) => (k + 1) * (k + 2),
                (BrezziDouglasMarini { .. }, CellShape::Tetrahedron) => (k + 1) * (k + 2) * (k + 3) / 2,
                (Nedelec { .. }, CellShape::Triangle) => k * (k + 2),
                (Nedelec { .. }, CellShape::Tetrahedron) => k * (k + 2) * (k + 3) / 2,
                _ => return Err(ElementError::UnsupportedCell { family, cell }),
            };
            let mapping = match descriptor {
                Nedelec { .. } => Mapping::CovariantPiola,
                _ => Mapping::ContravariantPiola,
            };
            Ok(simple_element(cell, space_dimension, cell.topological_dimension(), mapping))
        }
        &Real { cell } => Ok(simple_element(cell, 1, 1, Mapping::Affine)),
        &Quadrature { cell, degree } => {
            let num_points = points_per_direction(degree).pow(cell.topological_dimension() as u32);
            Ok(simple_element(cell, num_points, 1, Mapping::Affine))
        }
        Vector { base, dim } => {
            let base = element_info(base)?;
            if base.value_dimension() != 1 {
                return Err(ElementError::NonScalarVectorBase);
            }
            let dim = (*dim).unwrap_or_else(|| base.geometric_dimension());
            let mapping = base.components[0].mapping;
            Ok(ElementInfo {
                cell: base.cell,
                space_dimension: dim * base.space_dimension,
                num_sub_elements: dim,
                components: (0..dim)
                    .map(|offset| ComponentElement { mapping, offset })
                    .collect(),
            })
        }
        Mixed(elements) => {
            let sub_elements = elements
                .iter()
                .map(element_info)
                .collect::<Result<Vec<_>, _>>()?;
            let cell = sub_elements
                .first()
                .map(|e| e.cell)
                .ok_or(ElementError::EmptyMixedElement)?;
            if let Some(other) = sub_elements.iter().find(|e| e.cell != cell) {
                return Err(ElementError::CellMismatch {
                    expected: cell,
                    found: other.cell,
                });
            }

            let mut components = Vec::new();
            for sub_element in &sub_elements {
                let sub_offset = components.len();
                components.extend(sub_element.components.iter().map(|c| ComponentElement {
                    mapping: c.mapping,
                    offset: sub_offset + c.offset,
                }));
            }
            Ok(ElementInfo {
                cell,
                space_dimension: sub_elements.iter().map(|e| e.space_dimension).sum(),
                num_sub_elements: sub_elements.len(),
                components,
            })
        }
    }
}
