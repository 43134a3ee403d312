use std::collections::BTreeSet;

use log::{debug, warn};
use rustc_hash::FxHashMap;

use crate::codegen::{ArrayDecl, Backend, GeneratorOptions};
use crate::error::CodegenError;
use crate::ir::{ExprIr, IntegralIr, NodeId, Partition};
use crate::monomial::IntegralType;

/// The generated kernel body.
#[derive(Debug)]
pub struct GeneratedIntegral<S> {
    pub body: S,
    /// Names of the operators the body uses, see [`Operator::name`](crate::ir::Operator::name).
    pub used_operators: BTreeSet<&'static str>,
}

/// Generates the body of an element kernel for a single integral.
///
/// A generator is consumed by [`generate`](Self::generate), so every integral is generated
/// with fresh state.
#[derive(Debug)]
pub struct IntegralGenerator<'a, B: Backend> {
    pub(super) ir: &'a IntegralIr,
    pub(super) backend: &'a B,
    pub(super) options: GeneratorOptions,
    /// Accesses of the nodes computed so far for the current quadrature point count.
    pub(super) accesses: FxHashMap<NodeId, B::Expr>,
    pub(super) used_operators: BTreeSet<&'static str>,
}

impl<'a, B: Backend> IntegralGenerator<'a, B> {
    pub fn new(ir: &'a IntegralIr, backend: &'a B) -> Self {
        Self {
            ir,
            backend,
            options: GeneratorOptions::default(),
            accesses: FxHashMap::default(),
            used_operators: BTreeSet::new(),
        }
    }

    pub fn with_options(self, options: GeneratorOptions) -> Self {
        Self { options, ..self }
    }

    pub fn generate(mut self) -> Result<GeneratedIntegral<B::Stmt>, CodegenError> {
        let lang = self.backend;
        // Expressions are evaluated at points rather than integrated
        if self.ir.integral_type == IntegralType::Expression {
            return Err(CodegenError::UnsupportedIntegralKind(self.ir.integral_type));
        }
        for expr_ir in self.ir.expr_irs.values() {
            expr_ir.validate()?;
        }

        let mut parts = Vec::new();
        parts.extend(self.generate_quadrature_tables()?);
        parts.extend(self.generate_element_tables());
        parts.extend(self.generate_tensor_reset());

        let all_num_points: Vec<usize> = self.ir.expr_irs.keys().copied().collect();
        for &num_points in &all_num_points {
            debug!(
                "Generating {} integral code for {num_points} quadrature point(s)",
                self.ir.integral_type
            );
            self.accesses.clear();

            let mut body = Vec::new();
            body.extend(self.generate_unstructured_partition(num_points, Partition::Piecewise)?);
            body.extend(self.generate_dofblock_partition(num_points, Partition::Piecewise)?);
            body.extend(self.generate_quadrature_loops(num_points)?);

            if all_num_points.len() > 1 {
                parts.push(lang.scope(body));
            } else {
                parts.extend(body);
            }
        }

        Ok(GeneratedIntegral {
            body: lang.statement_list(parts),
            used_operators: self.used_operators,
        })
    }

    pub(super) fn expr_ir(&self, num_points: usize) -> Result<&'a ExprIr, CodegenError> {
        self.ir.expr_irs.get(&num_points).ok_or_else(|| {
            CodegenError::MalformedIr(format!("no expression IR for {num_points} quadrature point(s)"))
        })
    }

    fn generate_quadrature_tables(&self) -> Result<Vec<B::Stmt>, CodegenError> {
        let lang = self.backend;
        let integral_type = self.ir.integral_type;
        if !integral_type.has_static_quadrature() {
            return Ok(Vec::new());
        }

        for &num_points in self.ir.expr_irs.keys() {
            if !self.ir.quadrature_rules.contains_key(&num_points) {
                return Err(CodegenError::MissingQuadratureRule { num_points });
            }
        }

        let mut parts = Vec::new();
        for (&num_points, rule) in &self.ir.quadrature_rules {
            if rule.num_points() != num_points {
                return Err(CodegenError::MalformedIr(format!(
                    "quadrature rule registered for {num_points} point(s) has {} point(s)",
                    rule.num_points()
                )));
            }
            let Some(expr_ir) = self.ir.expr_irs.get(&num_points) else {
                warn!("Quadrature rule with {num_points} point(s) is not used by any integrand");
                continue;
            };

            if expr_ir.need_weights {
                let decl = ArrayDecl::table(
                    lang.weights_array_name(num_points),
                    vec![num_points],
                    rule.weights().to_vec(),
                );
                parts.push(lang.array_decl(decl.with_alignas(self.options.alignas)));
            }

            let pdim = rule.dim();
            if pdim > 0 && expr_ir.need_points {
                let decl = ArrayDecl::table(
                    lang.points_array_name(num_points),
                    vec![num_points * pdim],
                    rule.flattened_points(),
                );
                parts.push(lang.array_decl(decl.with_alignas(self.options.alignas)));
            }
        }

        Ok(lang.commented(&["Section for quadrature weights and points"], parts))
    }

    fn generate_element_tables(&self) -> Vec<B::Stmt> {
        let lang = self.backend;
        let mut parts = Vec::new();
        for (&num_points, expr_ir) in &self.ir.expr_irs {
            let tables = &expr_ir.unique_tables;
            if tables.is_empty() {
                continue;
            }
            parts.push(lang.comment(&format!(
                "Definitions of {} tables for {num_points} quadrature points",
                tables.len()
            )));
            for (name, table) in tables {
                let decl = ArrayDecl::table(name.clone(), table.shape().to_vec(), table.values().to_vec());
                parts.push(lang.array_decl(decl.with_alignas(self.options.alignas)));
            }
        }
        lang.commented(
            &[
                "Section for precomputed element basis function values",
                "Table dimensions: num_entities, num_points, num_dofs",
            ],
            parts,
        )
    }

    fn generate_tensor_reset(&self) -> Vec<B::Stmt> {
        let lang = self.backend;
        let tensor = lang.element_tensor();
        let size = self.ir.tensor_size();

        let reset = if size == 1 {
            lang.assign(lang.array_access(tensor, vec![lang.literal_int(0)]), lang.literal_float(0.0))
        } else {
            lang.zero_fill(tensor, size)
        };
        vec![lang.comment("Reset element tensor"), reset]
    }

    fn generate_quadrature_loops(&mut self, num_points: usize) -> Result<Vec<B::Stmt>, CodegenError> {
        let lang = self.backend;

        let setup = self.generate_unstructured_partition(num_points, Partition::Varying)?;
        let setup_comment = format!("Quadrature loop body setup (num_points={num_points})");
        let mut body = lang.commented(&[setup_comment.as_str()], setup);
        body.extend(self.generate_dofblock_partition(num_points, Partition::Varying)?);

        let parts = if body.is_empty() {
            Vec::new()
        } else if num_points == 1 {
            lang.commented(&["Only 1 quadrature point, no loop"], vec![lang.scope(body)])
        } else {
            let iq = lang.quadrature_loop_index(num_points);
            vec![lang.for_range(iq, 0, num_points, body)]
        };
        Ok(parts)
    }
}

/// Generates the kernel body of an integral with the given backend.
pub fn generate_integral<B: Backend>(
    ir: &IntegralIr,
    backend: &B,
    options: GeneratorOptions,
) -> Result<GeneratedIntegral<B::Stmt>, CodegenError> {
    IntegralGenerator::new(ir, backend)
        .with_options(options)
        .generate()
}
