use log::trace;

use crate::codegen::{ArrayDecl, Backend, IntegralGenerator};
use crate::error::CodegenError;
use crate::ir::{ExprNode, NodeId, Partition};

impl<'a, B: Backend> IntegralGenerator<'a, B> {
    /// Generates the computations of one partition of the expression graph.
    ///
    /// Terminals are read through the backend, along with the definitions they require.
    /// Every operator node is stored in a slot of the intermediate array of the partition,
    /// except conditions, which are inlined into the expressions using them.
    pub(super) fn generate_unstructured_partition(
        &mut self,
        num_points: usize,
        partition: Partition,
    ) -> Result<Vec<B::Stmt>, CodegenError> {
        let lang = self.backend;
        let expr_ir = self.expr_ir(num_points)?;
        let array_name = lang.intermediate_array_name(partition, num_points);
        let array = lang.symbol(&array_name);

        let mut definitions = Vec::new();
        let mut intermediates = Vec::new();

        for (id, node) in expr_ir.partition_nodes(partition) {
            let access = match node {
                ExprNode::Terminal(terminal) => {
                    let table = expr_ir.table_ranges[id.index()].as_ref();
                    let access = lang.terminal_access(terminal, table, num_points)?;
                    definitions.extend(lang.terminal_definitions(terminal, table, num_points, &access)?);
                    access
                }
                ExprNode::Operator { op, operands } => {
                    let operands = operands
                        .iter()
                        .map(|&operand| self.operand_access(operand, id))
                        .collect::<Result<Vec<_>, _>>()?;
                    self.used_operators.insert(op.name());
                    let expr = lang.translate_operator(*op, operands)?;

                    if op.is_condition() {
                        expr
                    } else {
                        let slot = lang.array_access(array.clone(), vec![lang.literal_int(intermediates.len() as i64)]);
                        intermediates.push(lang.assign(slot.clone(), expr));
                        slot
                    }
                }
            };
            trace!("Node {id} of {partition} partition ({num_points} point(s)): {access:?}");
            self.accesses.insert(id, access);
        }

        let mut parts = definitions;
        if !intermediates.is_empty() {
            let decl = ArrayDecl::new(array_name, vec![intermediates.len()]).with_alignas(self.options.alignas);
            parts.push(lang.array_decl(decl));
            parts.extend(intermediates);
        }
        let comment = format!("Unstructured {partition} computations");
        Ok(lang.commented(&[comment.as_str()], parts))
    }

    fn operand_access(&self, operand: NodeId, user: NodeId) -> Result<B::Expr, CodegenError> {
        if operand >= user {
            return Err(CodegenError::MalformedIr(format!(
                "node {user} uses operand {operand}, which does not precede it"
            )));
        }
        self.accesses.get(&operand).cloned().ok_or_else(|| {
            CodegenError::MalformedIr(format!(
                "operand {operand} of node {user} is not computed before it is used"
            ))
        })
    }
}
