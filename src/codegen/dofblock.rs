use crate::codegen::{Backend, IntegralGenerator};
use crate::error::CodegenError;
use crate::ir::{Partition, TableType};

impl<'a, B: Backend> IntegralGenerator<'a, B> {
    /// Generates the accumulation of the contributions of a partition into the element tensor.
    ///
    /// Every contribution becomes an update `A[flat_index] += factor * tables` nested in one
    /// loop per tensor axis over the dof range of its block. Axes of quadrature tables are
    /// indexed by the quadrature loop counter and get no loop of their own.
    pub(super) fn generate_dofblock_partition(
        &mut self,
        num_points: usize,
        partition: Partition,
    ) -> Result<Vec<B::Stmt>, CodegenError> {
        let lang = self.backend;
        let expr_ir = self.expr_ir(num_points)?;
        let tensor = lang.element_tensor();
        let tensor_shape = &self.ir.tensor_shape;

        let mut blocks: Vec<_> = expr_ir.block_contributions.get(partition).iter().collect();
        blocks.sort_by(|(a, _), (b, _)| a.cmp(b));

        let mut parts = Vec::new();
        for (dofblock, contributions) in blocks {
            for contribution in contributions {
                let rank = contribution.table_ranges.len();
                if dofblock.len() != rank || contribution.argument_indices.len() != rank || tensor_shape.len() != rank
                {
                    return Err(CodegenError::MalformedIr(format!(
                        "contribution to block {dofblock:?} does not match the rank {} of the element tensor",
                        tensor_shape.len()
                    )));
                }

                let mut factors = Vec::new();
                if !expr_ir.graph.is_literal_one(contribution.factor) {
                    let factor = self
                        .accesses
                        .get(&contribution.factor)
                        .cloned()
                        .ok_or_else(|| {
                            CodegenError::MalformedIr(format!(
                                "factor {} is not computed before it is used",
                                contribution.factor
                            ))
                        })?;
                    factors.push(factor);
                }

                let indices: Vec<_> = contribution
                    .table_ranges
                    .iter()
                    .enumerate()
                    .map(|(axis, range)| match range.table_type {
                        TableType::Quadrature => lang.quadrature_loop_index(num_points),
                        _ => lang.argument_loop_index(axis),
                    })
                    .collect();

                for (axis, (range, &argument)) in contribution
                    .table_ranges
                    .iter()
                    .zip(&contribution.argument_indices)
                    .enumerate()
                {
                    // Arguments are read at `ia - begin` of their table, so the loop over the
                    // block must cover exactly the table range
                    let (begin, end) = dofblock[axis];
                    let reads_table = !matches!(range.table_type, TableType::Quadrature | TableType::Ones);
                    if reads_table && (range.begin, range.end) != (begin, end) {
                        return Err(CodegenError::MalformedIr(format!(
                            "axis {axis} of block {dofblock:?} does not match the range {}..{} of table {}",
                            range.begin, range.end, range.table
                        )));
                    }

                    match range.table_type {
                        TableType::Zeros => {
                            return Err(CodegenError::MalformedIr(format!(
                                "contribution to block {dofblock:?} uses the zero table {}",
                                range.table
                            )))
                        }
                        TableType::Quadrature | TableType::Ones => {}
                        _ => {
                            let modified_argument = expr_ir.modified_arguments.get(argument).ok_or_else(|| {
                                CodegenError::MalformedIr(format!("no modified argument with index {argument}"))
                            })?;
                            factors.push(lang.terminal_access(modified_argument, Some(range), num_points)?);
                        }
                    }
                }

                let term = if factors.is_empty() {
                    lang.literal_float(1.0)
                } else {
                    lang.product(factors)
                };
                let flat_index = lang.flattened_indices(&indices, tensor_shape);
                let mut body = lang.assign_add(lang.array_access(tensor.clone(), vec![flat_index]), term);

                for axis in (0..rank).rev() {
                    if contribution.table_ranges[axis].table_type != TableType::Quadrature {
                        let (begin, end) = dofblock[axis];
                        body = lang.for_range(indices[axis].clone(), begin, end, vec![body]);
                    }
                }
                parts.push(body);
            }
        }
        Ok(parts)
    }
}
