use std::fmt::Debug;

use crate::error::CodegenError;
use crate::ir::{ModifiedTerminal, Operator, Partition, TableRange};

/// Declaration of an array, optionally initialized with values in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayDecl {
    pub name: String,
    pub sizes: Vec<usize>,
    pub values: Option<Vec<f64>>,
    /// Whether the array is a read-only table with static storage.
    pub constant: bool,
    pub alignas: Option<usize>,
}

impl ArrayDecl {
    /// A mutable, uninitialized array.
    pub fn new(name: impl Into<String>, sizes: Vec<usize>) -> Self {
        Self {
            name: name.into(),
            sizes,
            values: None,
            constant: false,
            alignas: None,
        }
    }

    /// A read-only table with the given values.
    pub fn table(name: impl Into<String>, sizes: Vec<usize>, values: Vec<f64>) -> Self {
        Self {
            values: Some(values),
            constant: true,
            ..Self::new(name, sizes)
        }
    }

    pub fn with_alignas(self, alignas: Option<usize>) -> Self {
        Self { alignas, ..self }
    }

    /// The total number of entries.
    pub fn len(&self) -> usize {
        self.sizes.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Emission primitives of a target language.
pub trait Language {
    type Expr: Clone + Debug;
    type Stmt: Debug;

    fn symbol(&self, name: &str) -> Self::Expr;
    fn literal_float(&self, value: f64) -> Self::Expr;
    fn literal_int(&self, value: i64) -> Self::Expr;
    fn array_access(&self, array: Self::Expr, indices: Vec<Self::Expr>) -> Self::Expr;
    fn product(&self, factors: Vec<Self::Expr>) -> Self::Expr;
    fn sum(&self, terms: Vec<Self::Expr>) -> Self::Expr;

    fn array_decl(&self, decl: ArrayDecl) -> Self::Stmt;
    fn assign(&self, target: Self::Expr, value: Self::Expr) -> Self::Stmt;
    fn assign_add(&self, target: Self::Expr, value: Self::Expr) -> Self::Stmt;
    /// Sets the first `size` entries of an array to zero.
    fn zero_fill(&self, array: Self::Expr, size: usize) -> Self::Stmt;
    /// A loop with `index` running over `begin..end`.
    fn for_range(&self, index: Self::Expr, begin: usize, end: usize, body: Vec<Self::Stmt>) -> Self::Stmt;
    fn scope(&self, body: Vec<Self::Stmt>) -> Self::Stmt;
    fn comment(&self, text: &str) -> Self::Stmt;
    fn statement_list(&self, statements: Vec<Self::Stmt>) -> Self::Stmt;

    /// Renders a statement as source code.
    fn format_statement(&self, statement: &Self::Stmt) -> String;

    /// The row-major flat index of `indices` into an array of the given shape.
    fn flattened_indices(&self, indices: &[Self::Expr], shape: &[usize]) -> Self::Expr {
        assert_eq!(indices.len(), shape.len(), "Index rank must match shape rank");
        match indices.split_last() {
            None => self.literal_int(0),
            Some((last, rest)) => {
                let mut flat = last.clone();
                let mut stride = shape[shape.len() - 1];
                for (index, &dim) in rest.iter().zip(shape).rev() {
                    let scaled = if stride == 1 {
                        index.clone()
                    } else {
                        self.product(vec![self.literal_int(stride as i64), index.clone()])
                    };
                    flat = self.sum(vec![scaled, flat]);
                    stride *= dim;
                }
                flat
            }
        }
    }

    /// Prefixes a non-empty list of statements with comments. An empty list stays empty.
    fn commented(&self, comments: &[&str], statements: Vec<Self::Stmt>) -> Vec<Self::Stmt> {
        if statements.is_empty() {
            return statements;
        }
        comments
            .iter()
            .map(|text| self.comment(text))
            .chain(statements)
            .collect()
    }
}

/// A target language together with the conventions of the generated kernel.
pub trait Backend: Language {
    /// Name of the backend, used in error messages.
    fn name(&self) -> &'static str;

    /// The element tensor written by the kernel.
    fn element_tensor(&self) -> Self::Expr {
        self.symbol("A")
    }

    fn weights_array_name(&self, num_points: usize) -> String {
        format!("weights{num_points}")
    }

    fn points_array_name(&self, num_points: usize) -> String {
        format!("points{num_points}")
    }

    /// The quadrature loop counter. With a single point there is no loop, and the counter is
    /// the literal zero.
    fn quadrature_loop_index(&self, num_points: usize) -> Self::Expr {
        if num_points == 1 {
            self.literal_int(0)
        } else {
            self.symbol("iq")
        }
    }

    /// The loop counter over the dofs of the given tensor axis.
    fn argument_loop_index(&self, axis: usize) -> Self::Expr {
        self.symbol(&format!("ia{axis}"))
    }

    /// The array holding the intermediate values of a partition.
    fn intermediate_array_name(&self, partition: Partition, num_points: usize) -> String {
        let prefix = match partition {
            Partition::Piecewise => "sp",
            Partition::Varying => "sv",
        };
        format!("{prefix}{num_points}")
    }

    /// Translates the application of an operator to already translated operands.
    fn translate_operator(&self, op: Operator, operands: Vec<Self::Expr>) -> Result<Self::Expr, CodegenError>;

    /// The expression reading the value of a modified terminal.
    fn terminal_access(
        &self,
        terminal: &ModifiedTerminal,
        table: Option<&TableRange>,
        num_points: usize,
    ) -> Result<Self::Expr, CodegenError>;

    /// Statements that must run before `access` can be read.
    fn terminal_definitions(
        &self,
        terminal: &ModifiedTerminal,
        table: Option<&TableRange>,
        num_points: usize,
        access: &Self::Expr,
    ) -> Result<Vec<Self::Stmt>, CodegenError>;
}
