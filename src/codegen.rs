//! Generation of element kernel bodies from the factorized integral representation.
//!
//! Code generation is target independent. The target language is abstracted by the
//! [`Language`] trait (emission primitives) and the [`Backend`] trait (symbols, operator
//! translation and terminal access). [`IntegralGenerator`] drives the generation for a single
//! integral:
//!
//! 1. static tables of quadrature weights, points and element basis values,
//! 2. reset of the element tensor,
//! 3. for every quadrature point count: the piecewise partition and its dof blocks,
//!    followed by the quadrature loop computing the varying partition and its dof blocks.
use serde::{Deserialize, Serialize};

mod dofblock;
mod generator;
mod language;
mod partition;

pub use generator::{generate_integral, GeneratedIntegral, IntegralGenerator};
pub use language::{ArrayDecl, Backend, Language};

/// Options for code generation.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorOptions {
    /// Byte alignment of generated arrays, if any.
    pub alignas: Option<usize>,
}

impl GeneratorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_alignas(self, alignas: usize) -> Self {
        Self {
            alignas: Some(alignas),
            ..self
        }
    }
}
