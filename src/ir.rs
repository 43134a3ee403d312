//! The factorized integral representation consumed by code generation.
//!
//! An [`IntegralIr`] holds, per quadrature point count, an [`ExprIr`]: an expression graph
//! whose nodes are marked as piecewise (constant over the quadrature points of a cell) or
//! varying, and a list of contributions to blocks of the element tensor, each scaling a
//! product of argument table entries by a factor node of the graph.
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CodegenError;
use crate::monomial::{IntegralType, Restriction};
use crate::quadrature::QuadratureRule;

/// Position of a node in an [`ExpressionGraph`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Operators that may appear in an expression graph.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Operator {
    Sum,
    Product,
    Division,
    Power,
    Abs,
    Sqrt,
    Exp,
    Ln,
    Cos,
    Sin,
    Tan,
    Acos,
    Asin,
    Atan,
    Atan2,
    Cosh,
    Sinh,
    Tanh,
    Erf,
    /// Bessel function of the first kind, `(nu, x)`.
    BesselJ,
    /// Bessel function of the second kind, `(nu, x)`.
    BesselY,
    /// Modified Bessel function of the first kind, `(nu, x)`.
    BesselI,
    /// Modified Bessel function of the second kind, `(nu, x)`.
    BesselK,
    MinValue,
    MaxValue,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    AndCondition,
    OrCondition,
    NotCondition,
    /// `(condition, true_value, false_value)`
    Conditional,
}

impl Operator {
    pub fn name(&self) -> &'static str {
        use Operator::*;
        match self {
            Sum => "sum",
            Product => "product",
            Division => "division",
            Power => "power",
            Abs => "abs",
            Sqrt => "sqrt",
            Exp => "exp",
            Ln => "ln",
            Cos => "cos",
            Sin => "sin",
            Tan => "tan",
            Acos => "acos",
            Asin => "asin",
            Atan => "atan",
            Atan2 => "atan_2",
            Cosh => "cosh",
            Sinh => "sinh",
            Tanh => "tanh",
            Erf => "erf",
            BesselJ => "bessel_j",
            BesselY => "bessel_y",
            BesselI => "bessel_i",
            BesselK => "bessel_k",
            MinValue => "min_value",
            MaxValue => "max_value",
            Eq => "eq",
            Ne => "ne",
            Lt => "lt",
            Le => "le",
            Gt => "gt",
            Ge => "ge",
            AndCondition => "and_condition",
            OrCondition => "or_condition",
            NotCondition => "not_condition",
            Conditional => "conditional",
        }
    }

    /// The number of operands the operator takes.
    pub fn arity(&self) -> usize {
        use Operator::*;
        match self {
            Abs | Sqrt | Exp | Ln | Cos | Sin | Tan | Acos | Asin | Atan | Cosh | Sinh | Tanh | Erf
            | NotCondition => 1,
            Conditional => 3,
            Sum | Product | Division | Power | Atan2 | BesselJ | BesselY | BesselI | BesselK | MinValue
            | MaxValue | Eq | Ne | Lt | Le | Gt | Ge | AndCondition | OrCondition => 2,
        }
    }

    /// Whether the operator produces a boolean.
    pub fn is_condition(&self) -> bool {
        use Operator::*;
        matches!(
            self,
            Eq | Ne | Lt | Le | Gt | Ge | AndCondition | OrCondition | NotCondition
        )
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Terminal {
    /// Basis function of the argument with the given number.
    Argument { number: usize },
    Coefficient { count: usize },
    SpatialCoordinate,
    Jacobian,
    FacetNormal,
    CellVolume,
    QuadratureWeight,
    FloatValue(f64),
    IntValue(i64),
    Zero,
}

/// A terminal together with the modifiers applied to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifiedTerminal {
    pub terminal: Terminal,
    /// Flattened value component.
    pub component: usize,
    /// Number of derivatives in each reference direction.
    pub local_derivatives: Vec<usize>,
    pub restriction: Option<Restriction>,
}

impl ModifiedTerminal {
    pub fn new(terminal: Terminal) -> Self {
        Self {
            terminal,
            component: 0,
            local_derivatives: Vec::new(),
            restriction: None,
        }
    }

    pub fn with_component(self, component: usize) -> Self {
        Self { component, ..self }
    }

    pub fn with_local_derivatives(self, local_derivatives: Vec<usize>) -> Self {
        Self {
            local_derivatives,
            ..self
        }
    }

    pub fn with_restriction(self, restriction: Restriction) -> Self {
        Self {
            restriction: Some(restriction),
            ..self
        }
    }

    /// Whether the terminal is the literal value one, without derivatives.
    pub fn is_literal_one(&self) -> bool {
        let is_one = match self.terminal {
            Terminal::FloatValue(value) => value == 1.0,
            Terminal::IntValue(value) => value == 1,
            _ => false,
        };
        is_one && self.local_derivatives.iter().all(|&d| d == 0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprNode {
    Terminal(ModifiedTerminal),
    Operator { op: Operator, operands: Vec<NodeId> },
}

/// An expression DAG stored in topological order.
///
/// Nodes can only be added after their operands, so iterating over the nodes visits every
/// operand before the nodes using it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpressionGraph {
    nodes: Vec<ExprNode>,
}

impl ExpressionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn push_terminal(&mut self, terminal: ModifiedTerminal) -> NodeId {
        self.nodes.push(ExprNode::Terminal(terminal));
        NodeId(self.nodes.len() - 1)
    }

    /// Adds an operator node.
    ///
    /// Fails if the number of operands does not match the arity of the operator, or if an
    /// operand is not already part of the graph.
    pub fn push_operator(&mut self, op: Operator, operands: Vec<NodeId>) -> Result<NodeId, CodegenError> {
        if operands.len() != op.arity() {
            return Err(CodegenError::MalformedIr(format!(
                "operator {op} expects {} operand(s), got {}",
                op.arity(),
                operands.len()
            )));
        }
        if let Some(missing) = operands.iter().find(|id| id.0 >= self.nodes.len()) {
            return Err(CodegenError::MalformedIr(format!(
                "operand {missing} of operator {op} is not in the graph"
            )));
        }
        self.nodes.push(ExprNode::Operator { op, operands });
        Ok(NodeId(self.nodes.len() - 1))
    }

    pub fn get(&self, id: NodeId) -> Option<&ExprNode> {
        self.nodes.get(id.0)
    }

    /// Iterates over the nodes in topological order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &ExprNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (NodeId(i), node))
    }

    pub fn is_literal_one(&self, id: NodeId) -> bool {
        matches!(self.get(id), Some(ExprNode::Terminal(mt)) if mt.is_literal_one())
    }
}

/// Classification of an element table by the structure of its values.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TableType {
    /// All values are zero.
    Zeros,
    /// All values are one.
    Ones,
    /// The table is the identity between quadrature points and dofs.
    Quadrature,
    /// Constant over quadrature points.
    Piecewise,
    /// Constant over entities.
    Uniform,
    /// Constant over both quadrature points and entities.
    Fixed,
    Varying,
}

impl TableType {
    /// Whether the values of the table vary between quadrature points.
    pub fn is_varying(&self) -> bool {
        matches!(self, TableType::Uniform | TableType::Varying | TableType::Quadrature)
    }
}

/// A range `begin..end` of the dofs of an element table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TableRange {
    pub table: String,
    pub begin: usize,
    pub end: usize,
    pub table_type: TableType,
}

impl TableRange {
    pub fn new(table: impl Into<String>, begin: usize, end: usize, table_type: TableType) -> Self {
        Self {
            table: table.into(),
            begin,
            end,
            table_type,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.begin
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.begin
    }
}

/// Basis function values tabulated with dimensions `[num_entities, num_points, num_dofs]`,
/// stored in row-major order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementTable {
    shape: [usize; 3],
    values: Vec<f64>,
}

impl ElementTable {
    /// # Panics
    ///
    /// Panics if the number of values does not match the shape.
    pub fn new(shape: [usize; 3], values: Vec<f64>) -> Self {
        assert_eq!(
            shape.iter().product::<usize>(),
            values.len(),
            "Number of table values must match table shape"
        );
        Self { shape, values }
    }

    pub fn from_fn(shape: [usize; 3], mut f: impl FnMut(usize, usize, usize) -> f64) -> Self {
        let [num_entities, num_points, num_dofs] = shape;
        let mut values = Vec::with_capacity(num_entities * num_points * num_dofs);
        for entity in 0..num_entities {
            for point in 0..num_points {
                for dof in 0..num_dofs {
                    values.push(f(entity, point, dof));
                }
            }
        }
        Self { shape, values }
    }

    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, entity: usize, point: usize, dof: usize) -> Option<f64> {
        let [num_entities, num_points, num_dofs] = self.shape;
        if entity < num_entities && point < num_points && dof < num_dofs {
            self.values
                .get((entity * num_points + point) * num_dofs + dof)
                .copied()
        } else {
            None
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Partition {
    /// Constant over the quadrature points of a cell.
    Piecewise,
    /// Varying between quadrature points.
    Varying,
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Partition::Piecewise => write!(f, "piecewise"),
            Partition::Varying => write!(f, "varying"),
        }
    }
}

/// The dof range `(begin, end)` of every axis of a block of the element tensor.
pub type DofBlock = Vec<(usize, usize)>;

/// A contribution `factor * prod_i table_i` to a block of the element tensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockContribution {
    /// For every axis, the position of its argument in [`ExprIr::modified_arguments`].
    pub argument_indices: Vec<usize>,
    pub factor: NodeId,
    /// For every axis, the table range of its argument.
    pub table_ranges: Vec<TableRange>,
}

/// Contributions grouped by dof block, per partition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockContributions {
    pub piecewise: Vec<(DofBlock, Vec<BlockContribution>)>,
    pub varying: Vec<(DofBlock, Vec<BlockContribution>)>,
}

impl BlockContributions {
    pub fn get(&self, partition: Partition) -> &[(DofBlock, Vec<BlockContribution>)] {
        match partition {
            Partition::Piecewise => &self.piecewise,
            Partition::Varying => &self.varying,
        }
    }

    /// Adds a contribution, keeping the blocks sorted.
    pub fn insert(&mut self, partition: Partition, block: DofBlock, contribution: BlockContribution) {
        let blocks = match partition {
            Partition::Piecewise => &mut self.piecewise,
            Partition::Varying => &mut self.varying,
        };
        match blocks.binary_search_by(|(b, _)| b.cmp(&block)) {
            Ok(pos) => blocks[pos].1.push(contribution),
            Err(pos) => blocks.insert(pos, (block, vec![contribution])),
        }
    }
}

/// The factorized integrand for a single quadrature rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExprIr {
    pub graph: ExpressionGraph,
    /// The partition of every node, or `None` if the node is not computed.
    pub partitions: Vec<Option<Partition>>,
    /// The table range of every terminal node that is evaluated through a table.
    pub table_ranges: Vec<Option<TableRange>>,
    pub modified_arguments: Vec<ModifiedTerminal>,
    pub block_contributions: BlockContributions,
    pub unique_tables: BTreeMap<String, ElementTable>,
    pub need_weights: bool,
    pub need_points: bool,
}

impl ExprIr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_terminal(
        &mut self,
        terminal: ModifiedTerminal,
        partition: Option<Partition>,
        table_range: Option<TableRange>,
    ) -> NodeId {
        self.partitions.push(partition);
        self.table_ranges.push(table_range);
        self.graph.push_terminal(terminal)
    }

    pub fn push_operator(
        &mut self,
        op: Operator,
        operands: Vec<NodeId>,
        partition: Option<Partition>,
    ) -> Result<NodeId, CodegenError> {
        let id = self.graph.push_operator(op, operands)?;
        self.partitions.push(partition);
        self.table_ranges.push(None);
        Ok(id)
    }

    /// Registers the modified terminal of an argument and returns its position.
    pub fn push_argument(&mut self, argument: ModifiedTerminal) -> usize {
        self.modified_arguments.push(argument);
        self.modified_arguments.len() - 1
    }

    pub fn insert_table(&mut self, name: impl Into<String>, table: ElementTable) {
        self.unique_tables.insert(name.into(), table);
    }

    pub fn add_block_contribution(&mut self, partition: Partition, block: DofBlock, contribution: BlockContribution) {
        self.block_contributions
            .insert(partition, block, contribution);
    }

    /// The nodes of the given partition, in topological order.
    pub fn partition_nodes(&self, partition: Partition) -> impl Iterator<Item = (NodeId, &ExprNode)> {
        self.graph
            .iter()
            .filter(move |(id, _)| self.partitions.get(id.index()) == Some(&Some(partition)))
    }

    /// Checks that the per-node data is consistent with the graph.
    pub fn validate(&self) -> Result<(), CodegenError> {
        let num_nodes = self.graph.len();
        if self.partitions.len() != num_nodes || self.table_ranges.len() != num_nodes {
            return Err(CodegenError::MalformedIr(format!(
                "graph has {num_nodes} node(s), but {} partition marker(s) and {} table range(s)",
                self.partitions.len(),
                self.table_ranges.len()
            )));
        }
        for (name, table) in &self.unique_tables {
            if table.shape.iter().product::<usize>() != table.values.len() {
                return Err(CodegenError::MalformedIr(format!(
                    "table {name} has shape {:?} but {} value(s)",
                    table.shape,
                    table.values.len()
                )));
            }
        }
        Ok(())
    }
}

/// Everything needed to generate the body of an element kernel for one integral.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegralIr {
    pub integral_type: IntegralType,
    /// The shape of the element tensor, one dimension per argument.
    pub tensor_shape: Vec<usize>,
    /// Quadrature rules by number of points.
    pub quadrature_rules: BTreeMap<usize, QuadratureRule>,
    /// Factorized integrands by number of quadrature points.
    pub expr_irs: BTreeMap<usize, ExprIr>,
}

impl IntegralIr {
    pub fn new(integral_type: IntegralType, tensor_shape: Vec<usize>) -> Self {
        Self {
            integral_type,
            tensor_shape,
            quadrature_rules: BTreeMap::new(),
            expr_irs: BTreeMap::new(),
        }
    }

    pub fn with_quadrature_rule(mut self, rule: QuadratureRule) -> Self {
        self.quadrature_rules.insert(rule.num_points(), rule);
        self
    }

    pub fn with_expr_ir(mut self, num_points: usize, expr_ir: ExprIr) -> Self {
        self.expr_irs.insert(num_points, expr_ir);
        self
    }

    /// The number of entries of the element tensor.
    pub fn tensor_size(&self) -> usize {
        self.tensor_shape.iter().product()
    }
}
