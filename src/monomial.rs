//! Raw monomials, the input of the monomial transformer.
//!
//! A monomial is a scalar coefficient times a product of factors. Each factor is a basis
//! function of a form argument or a coefficient function, possibly indexed by a component
//! and differentiated in a number of directions. Components and directions are identified
//! by [`ComponentKey`]: equal free keys within one monomial denote the same summation index.
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::element::ElementDescriptor;

/// Identity of a component or derivative direction before index resolution.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ComponentKey {
    /// A literal component or direction.
    Fixed(usize),
    /// A free index, identified by a number unique within the monomial.
    Free(usize),
}

/// Whether a factor is a basis function of an argument or a coefficient function.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FactorOrigin {
    /// Basis function of the argument with the given number (0 for the test function,
    /// 1 for the trial function, ...).
    Argument(usize),
    /// The coefficient function with the given count.
    Coefficient(usize),
}

/// Side of an interior facet a quantity is evaluated on.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Restriction {
    Plus,
    Minus,
}

impl Restriction {
    /// The position of the side in the pair of cells sharing a facet.
    pub fn side(&self) -> usize {
        match self {
            Restriction::Plus => 0,
            Restriction::Minus => 1,
        }
    }
}

impl fmt::Display for Restriction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Restriction::Plus => write!(f, "+"),
            Restriction::Minus => write!(f, "-"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MonomialFactor {
    pub element: ElementDescriptor,
    pub origin: FactorOrigin,
    pub components: Vec<ComponentKey>,
    pub derivatives: Vec<ComponentKey>,
    pub restriction: Option<Restriction>,
}

impl MonomialFactor {
    pub fn new(element: ElementDescriptor, origin: FactorOrigin) -> Self {
        Self {
            element,
            origin,
            components: Vec::new(),
            derivatives: Vec::new(),
            restriction: None,
        }
    }

    pub fn argument(number: usize, element: ElementDescriptor) -> Self {
        Self::new(element, FactorOrigin::Argument(number))
    }

    pub fn coefficient(count: usize, element: ElementDescriptor) -> Self {
        Self::new(element, FactorOrigin::Coefficient(count))
    }

    pub fn with_component(mut self, component: ComponentKey) -> Self {
        self.components.push(component);
        self
    }

    pub fn with_derivative(mut self, direction: ComponentKey) -> Self {
        self.derivatives.push(direction);
        self
    }

    pub fn with_restriction(self, restriction: Restriction) -> Self {
        Self {
            restriction: Some(restriction),
            ..self
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMonomial {
    pub coefficient: f64,
    pub factors: Vec<MonomialFactor>,
}

impl RawMonomial {
    pub fn new(coefficient: f64) -> Self {
        Self {
            coefficient,
            factors: Vec::new(),
        }
    }

    pub fn with_factor(mut self, factor: MonomialFactor) -> Self {
        self.factors.push(factor);
        self
    }
}

/// The kind of domain an integral is taken over.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IntegralType {
    Cell,
    ExteriorFacet,
    InteriorFacet,
    /// Point evaluation at a vertex.
    Vertex,
    Custom,
    Cutcell,
    Interface,
    Overlap,
    /// Pointwise evaluation of an expression. Not an integral.
    Expression,
}

impl IntegralType {
    pub fn name(&self) -> &'static str {
        match self {
            IntegralType::Cell => "cell",
            IntegralType::ExteriorFacet => "exterior_facet",
            IntegralType::InteriorFacet => "interior_facet",
            IntegralType::Vertex => "vertex",
            IntegralType::Custom => "custom",
            IntegralType::Cutcell => "cutcell",
            IntegralType::Interface => "interface",
            IntegralType::Overlap => "overlap",
            IntegralType::Expression => "expression",
        }
    }

    /// Whether the quadrature rule of the integral is known at compile time.
    ///
    /// Runtime integrals receive their points and weights as arguments, and vertex
    /// integrals are point evaluations.
    pub fn has_static_quadrature(&self) -> bool {
        !matches!(
            self,
            IntegralType::Vertex
                | IntegralType::Custom
                | IntegralType::Cutcell
                | IntegralType::Interface
                | IntegralType::Overlap
        )
    }
}

impl fmt::Display for IntegralType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Integral type and subdomain of an integral.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Measure {
    pub integral_type: IntegralType,
    pub subdomain_id: Option<usize>,
}

impl Measure {
    pub fn new(integral_type: IntegralType) -> Self {
        Self {
            integral_type,
            subdomain_id: None,
        }
    }

    pub fn with_subdomain(self, subdomain_id: usize) -> Self {
        Self {
            subdomain_id: Some(subdomain_id),
            ..self
        }
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.subdomain_id {
            Some(id) => write!(f, "{}({})", self.integral_type, id),
            None => write!(f, "{}", self.integral_type),
        }
    }
}

/// A sum of monomials integrated over a single measure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonomialIntegral {
    pub measure: Measure,
    pub monomials: Vec<RawMonomial>,
}

/// A variational form expanded into sums of monomials, one sum per measure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonomialForm {
    pub integrals: Vec<MonomialIntegral>,
}

impl MonomialForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_integral(mut self, measure: Measure, monomials: Vec<RawMonomial>) -> Self {
        self.integrals.push(MonomialIntegral { measure, monomials });
        self
    }
}
