//! Transformation of monomials to the reference cell.
//!
//! [`transform_monomial`] resolves a [`RawMonomial`] into a [`TransformedMonomial`]: a
//! product of a scalar, a power of the Jacobian determinant, coefficient references,
//! Jacobian and inverse Jacobian entries and reference basis functions, with every summation
//! index classified as secondary, internal or external.
use std::fmt;

use eyre::Context;
use log::debug;
use rustc_hash::FxHashMap;

use crate::element::{ElementProvider, FiniteElement, Mapping};
use crate::error::TransformError;
use crate::index::{IndexArena, IndexCounters, IndexHandle, IndexRole, MonomialIndex};
use crate::monomial::{ComponentKey, FactorOrigin, Measure, MonomialForm, RawMonomial, Restriction};

mod classify;

pub use classify::{classify, classify_indices};

/// The factor `|det F'| (det F')^power`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct MonomialDeterminant {
    pub power: i32,
    pub restriction: Option<Restriction>,
}

impl fmt::Display for MonomialDeterminant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.power {
            0 => write!(f, "|det F'|"),
            1 => write!(f, "|det F'| (det F')"),
            p => write!(f, "|det F'| (det F')^{p}"),
        }
    }
}

/// Reference to the expansion coefficients of the coefficient function `number`, indexed by
/// `index`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MonomialCoefficient {
    pub index: IndexHandle,
    pub number: usize,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TransformKind {
    /// `dx_i/dX_j`
    J,
    /// `dX_i/dx_j`
    JInverse,
}

/// An entry of the Jacobian or its inverse, linking two indices.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MonomialTransform {
    pub index0: IndexHandle,
    pub index1: IndexHandle,
    pub kind: TransformKind,
    pub restriction: Option<Restriction>,
    pub offset: usize,
}

impl MonomialTransform {
    /// Creates a transform between two indices.
    ///
    /// Fixed endpoints are replaced by new fixed indices with `offset` subtracted, so that
    /// they refer to components local to the sub-element. The original records are left as
    /// they are. A fixed endpoint smaller than `offset` is an [`TransformError::InvalidOffset`].
    pub fn new(
        indices: &mut IndexArena,
        index0: IndexHandle,
        index1: IndexHandle,
        kind: TransformKind,
        restriction: Option<Restriction>,
        offset: usize,
    ) -> Result<Self, TransformError> {
        let mut localize = |handle: IndexHandle| {
            let index = &indices[handle];
            if !index.is_fixed() {
                return Ok(handle);
            }
            let component = index.range()[0];
            if component < offset {
                return Err(TransformError::InvalidOffset { component, offset });
            }
            let local = index - offset;
            Ok(indices.insert(local))
        };
        let index0 = localize(index0)?;
        let index1 = localize(index1)?;
        Ok(Self {
            index0,
            index1,
            kind,
            restriction,
            offset,
        })
    }
}

/// A reference basis function, possibly indexed by a component and differentiated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonomialBasisFunction<E> {
    pub element: E,
    pub index: IndexHandle,
    pub components: Vec<IndexHandle>,
    pub derivatives: Vec<IndexHandle>,
    pub restriction: Option<Restriction>,
}

/// A monomial expressed on the reference cell.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformedMonomial<E> {
    coefficient: f64,
    determinant: MonomialDeterminant,
    coefficients: Vec<MonomialCoefficient>,
    transforms: Vec<MonomialTransform>,
    basis_functions: Vec<MonomialBasisFunction<E>>,
    indices: IndexArena,
}

impl<E> TransformedMonomial<E> {
    pub fn coefficient(&self) -> f64 {
        self.coefficient
    }

    pub fn determinant(&self) -> &MonomialDeterminant {
        &self.determinant
    }

    pub fn coefficients(&self) -> &[MonomialCoefficient] {
        &self.coefficients
    }

    pub fn transforms(&self) -> &[MonomialTransform] {
        &self.transforms
    }

    pub fn basis_functions(&self) -> &[MonomialBasisFunction<E>] {
        &self.basis_functions
    }

    /// The storage of all indices referenced by the monomial.
    pub fn indices(&self) -> &IndexArena {
        &self.indices
    }

    pub fn index(&self, handle: IndexHandle) -> &MonomialIndex {
        &self.indices[handle]
    }

    fn internal_footprint(&self) -> Vec<IndexHandle> {
        internal_footprint(&self.basis_functions)
    }

    fn external_footprint(&self) -> Vec<IndexHandle> {
        external_footprint(&self.coefficients, &self.transforms)
    }

    fn filter_role(&self, handles: Vec<IndexHandle>, role: IndexRole) -> Vec<IndexHandle> {
        handles
            .into_iter()
            .filter(|&h| self.indices[h].role() == Some(role))
            .collect()
    }

    /// Occurrences of indices of the given role inside the integral, i.e. as value,
    /// component or derivative index of a basis function.
    pub fn extract_internal_indices(&self, role: IndexRole) -> Vec<IndexHandle> {
        self.filter_role(self.internal_footprint(), role)
    }

    /// Occurrences of indices of the given role outside the integral, i.e. in coefficients
    /// and transforms.
    pub fn extract_external_indices(&self, role: IndexRole) -> Vec<IndexHandle> {
        self.filter_role(self.external_footprint(), role)
    }

    /// All occurrences of indices of the given role, internal occurrences first.
    pub fn extract_indices(&self, role: IndexRole) -> Vec<IndexHandle> {
        let mut indices = self.extract_internal_indices(role);
        indices.extend(self.extract_external_indices(role));
        indices
    }

    /// The indices of the given role, unique with respect to role and id (not range), in order
    /// of first occurrence. Fixed indices are never considered equal to each other.
    pub fn extract_unique_indices(&self, role: IndexRole) -> Vec<IndexHandle> {
        let mut unique: Vec<IndexHandle> = Vec::new();
        for handle in self.extract_indices(role) {
            let index = &self.indices[handle];
            let seen = unique.iter().any(|&other| {
                other == handle
                    || (!index.is_fixed()
                        && self.indices[other].role() == index.role()
                        && self.indices[other].id() == index.id())
            });
            if !seen {
                unique.push(handle);
            }
        }
        unique
    }
}

fn internal_footprint<E>(basis_functions: &[MonomialBasisFunction<E>]) -> Vec<IndexHandle> {
    basis_functions
        .iter()
        .flat_map(|v| {
            std::iter::once(v.index)
                .chain(v.components.iter().copied())
                .chain(v.derivatives.iter().copied())
        })
        .collect()
}

fn external_footprint(coefficients: &[MonomialCoefficient], transforms: &[MonomialTransform]) -> Vec<IndexHandle> {
    coefficients
        .iter()
        .map(|c| c.index)
        .chain(transforms.iter().map(|t| t.index0))
        .chain(transforms.iter().map(|t| t.index1))
        .collect()
}

fn restriction_suffix(restriction: Option<Restriction>) -> String {
    restriction.map(|r| format!("({r})")).unwrap_or_default()
}

impl<E> fmt::Display for TransformedMonomial<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let indices = &self.indices;
        let mut factors = Vec::new();
        if self.coefficient != 1.0 {
            factors.push(format!("{:?}", self.coefficient));
        }
        factors.push(self.determinant.to_string());
        factors.extend(
            self.coefficients
                .iter()
                .map(|c| format!("c_{}", indices[c.index])),
        );
        factors.extend(self.transforms.iter().map(|t| {
            let r = restriction_suffix(t.restriction);
            match t.kind {
                TransformKind::J => format!("dx_{}/dX_{}{r}", indices[t.index0], indices[t.index1]),
                TransformKind::JInverse => format!("dX_{}/dx_{}{r}", indices[t.index0], indices[t.index1]),
            }
        }));

        let basis_functions = self.basis_functions.iter().map(|v| {
            let components = if v.components.is_empty() {
                String::new()
            } else {
                format!("[{}]", indices.format_list(&v.components))
            };
            let (d0, d1) = if v.derivatives.is_empty() {
                (String::new(), "")
            } else {
                let d = v
                    .derivatives
                    .iter()
                    .map(|&d| format!("d/dX_{}", indices[d]))
                    .collect::<Vec<_>>()
                    .join(" ");
                (format!("({d} "), ")")
            };
            format!(
                "{d0}V_{}{}{components}{d1}",
                indices[v.index],
                restriction_suffix(v.restriction)
            )
        });

        write!(
            f,
            "{} | {}",
            factors.join(" * "),
            basis_functions.collect::<Vec<_>>().join(" * ")
        )
    }
}

/// State of a single monomial transformation.
///
/// Holds the index storage, the per-role id counters and the map from raw component keys to
/// resolved indices. Every context starts out empty, so independent transformations never
/// share ids or indices.
#[derive(Debug, Default)]
pub struct TransformContext {
    indices: IndexArena,
    counters: IndexCounters,
    resolved: FxHashMap<ComponentKey, IndexHandle>,
}

impl TransformContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn indices(&self) -> &IndexArena {
        &self.indices
    }

    pub fn counters(&self) -> &IndexCounters {
        &self.counters
    }

    /// Resolves a component key. Free keys are resolved once per context, every fixed key
    /// produces a new fixed index.
    fn resolve_component(&mut self, key: ComponentKey, value_dimension: usize) -> IndexHandle {
        match key {
            ComponentKey::Fixed(value) => self.indices.insert(MonomialIndex::fixed(value)),
            ComponentKey::Free(_) => self.resolve_free(key, value_dimension),
        }
    }

    /// Resolves a derivative direction key.
    fn resolve_direction(&mut self, key: ComponentKey, geometric_dimension: usize) -> IndexHandle {
        match key {
            ComponentKey::Fixed(value) => {
                let direction = MonomialIndex::new(Some(IndexRole::Fixed), vec![value], Some(value));
                self.indices.insert(direction)
            }
            ComponentKey::Free(_) => self.resolve_free(key, geometric_dimension),
        }
    }

    fn resolve_free(&mut self, key: ComponentKey, dim: usize) -> IndexHandle {
        let indices = &mut self.indices;
        *self
            .resolved
            .entry(key)
            .or_insert_with(|| indices.insert(MonomialIndex::unclassified(0..dim)))
    }

    /// Transforms a monomial, consuming the context.
    pub fn transform<P: ElementProvider>(
        mut self,
        monomial: &RawMonomial,
        provider: &P,
    ) -> Result<TransformedMonomial<P::Element>, TransformError> {
        let mut determinant = MonomialDeterminant::default();
        let mut coefficients = Vec::new();
        let mut transforms = Vec::new();
        let mut basis_functions = Vec::new();

        for factor in &monomial.factors {
            let element = provider.create_element(&factor.element)?;
            let vdim = element.value_dimension();
            let sdim = element.space_dimension();
            let gdim = element.geometric_dimension();
            let restriction = factor.restriction;

            let index = match factor.origin {
                FactorOrigin::Argument(number) => self.indices.insert(MonomialIndex::primary(number, 0..sdim)),
                FactorOrigin::Coefficient(number) => {
                    let index = self.indices.insert(MonomialIndex::unclassified(0..sdim));
                    coefficients.push(MonomialCoefficient { index, number });
                    index
                }
            };

            let mut components: Vec<_> = factor
                .components
                .iter()
                .map(|&key| self.resolve_component(key, vdim))
                .collect();
            if components.len() > 1 {
                return Err(TransformError::Rank {
                    num_components: components.len(),
                });
            }

            if let Some(&component) = components.first() {
                let component_range = self.indices[component].range().to_vec();
                let component_elements = component_range
                    .iter()
                    .map(|&c| {
                        element
                            .component_element(c)
                            .ok_or(TransformError::InvalidComponent {
                                component: c,
                                value_dimension: vdim,
                            })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                let (mapping, offset) = match component_elements.split_first() {
                    Some((first, rest)) => {
                        if rest.iter().any(|c| c.mapping != first.mapping) {
                            return Err(TransformError::MappingConflict { component_range });
                        }
                        (first.mapping, first.offset)
                    }
                    None => (Mapping::Affine, 0),
                };

                match mapping {
                    Mapping::Affine => {}
                    Mapping::ContravariantPiola => {
                        // phi(x) = (det J)^{-1} J Phi(X)
                        let reference = self
                            .indices
                            .insert(MonomialIndex::unclassified(0..gdim) + offset);
                        let transform = MonomialTransform::new(
                            &mut self.indices,
                            component,
                            reference,
                            TransformKind::J,
                            restriction,
                            offset,
                        )?;
                        transforms.push(transform);
                        determinant.power -= 1;
                        components[0] = reference;
                    }
                    Mapping::CovariantPiola => {
                        // phi(x) = J^{-T} Phi(X)
                        let reference = self
                            .indices
                            .insert(MonomialIndex::unclassified(0..gdim) + offset);
                        let transform = MonomialTransform::new(
                            &mut self.indices,
                            reference,
                            component,
                            TransformKind::JInverse,
                            restriction,
                            offset,
                        )?;
                        transforms.push(transform);
                        components[0] = reference;
                    }
                }
            }

            let mut derivatives = Vec::with_capacity(factor.derivatives.len());
            for &key in &factor.derivatives {
                let gradient = self.indices.insert(MonomialIndex::unclassified(0..gdim));
                let direction = self.resolve_direction(key, gdim);
                let transform = MonomialTransform::new(
                    &mut self.indices,
                    gradient,
                    direction,
                    TransformKind::JInverse,
                    restriction,
                    0,
                )?;
                transforms.push(transform);
                derivatives.push(gradient);
            }

            basis_functions.push(MonomialBasisFunction {
                element,
                index,
                components,
                derivatives,
                restriction,
            });
        }

        let internal = internal_footprint(&basis_functions);
        let external = external_footprint(&coefficients, &transforms);
        classify_indices(&mut self.indices, &internal, &external, &mut self.counters)?;

        let transformed = TransformedMonomial {
            coefficient: monomial.coefficient,
            determinant,
            coefficients,
            transforms,
            basis_functions,
            indices: self.indices,
        };
        debug!("Transformed monomial: {transformed}");
        Ok(transformed)
    }
}

/// Transforms a single monomial to the reference cell, using a fresh [`TransformContext`].
pub fn transform_monomial<P: ElementProvider>(
    monomial: &RawMonomial,
    provider: &P,
) -> Result<TransformedMonomial<P::Element>, TransformError> {
    TransformContext::new().transform(monomial, provider)
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransformedIntegral<E> {
    pub measure: Measure,
    pub monomials: Vec<TransformedMonomial<E>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransformedForm<E> {
    pub integrals: Vec<TransformedIntegral<E>>,
}

/// Transforms every monomial of a form.
///
/// Stops at the first monomial that fails to transform. The returned error records which
/// integral and monomial failed.
pub fn transform_monomial_form<P: ElementProvider>(
    form: &MonomialForm,
    provider: &P,
) -> eyre::Result<TransformedForm<P::Element>> {
    let integrals = form
        .integrals
        .iter()
        .enumerate()
        .map(|(i, integral)| {
            let monomials = integral
                .monomials
                .iter()
                .enumerate()
                .map(|(j, monomial)| {
                    transform_monomial(monomial, provider).wrap_err_with(|| {
                        format!(
                            "failed to transform monomial {j} of integral {i} ({})",
                            integral.measure
                        )
                    })
                })
                .collect::<eyre::Result<Vec<_>>>()?;
            debug!(
                "Transformed {} monomial(s) of integral {i} ({})",
                monomials.len(),
                integral.measure
            );
            Ok(TransformedIntegral {
                measure: integral.measure,
                monomials,
            })
        })
        .collect::<eyre::Result<Vec<_>>>()?;
    Ok(TransformedForm { integrals })
}
