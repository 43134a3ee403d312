//! Generation of element tensor kernels for multilinear variational forms.
//!
//! The crate covers two stages of a form compiler backend:
//!
//! - [`transform`] resolves monomials (products of basis functions, coefficients and their
//!   derivatives) into their reference cell representation, inserting Jacobian and Piola
//!   factors and classifying every summation index,
//! - [`codegen`] generates the body of an element kernel from a factorized integrand
//!   ([`ir`]), hoisting quadrature-invariant computations out of the quadrature loop.
//!
//! Target languages are provided by [`backend`].
pub mod backend;
pub mod codegen;
pub mod element;
pub mod error;
pub mod index;
pub mod ir;
pub mod monomial;
pub mod quadrature;
pub mod transform;

pub extern crate formgen_quadrature;
pub extern crate nalgebra;
