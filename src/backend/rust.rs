//! Rust backend.
//!
//! Elementary functions are translated to methods of `f64`. The error function and Bessel
//! functions of the first and second kind are taken from the `libm` crate, which the crate
//! compiling the generated code must depend on.
use std::collections::BTreeSet;

use crate::backend::c::{check_arity, translate_common};
use crate::backend::cnodes::{impl_cnodes_language, CExpr, CStatement, Dialect, Renderer};
use crate::backend::{BackendOptions, TerminalAccess};
use crate::codegen::Backend;
use crate::error::CodegenError;
use crate::ir::{ModifiedTerminal, Operator, TableRange};
use crate::monomial::IntegralType;

const LIBM_OPERATORS: &[&str] = &["erf", "bessel_j", "bessel_y"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RustBackend {
    integral_type: IntegralType,
    options: BackendOptions,
}

impl RustBackend {
    pub fn new(integral_type: IntegralType, options: BackendOptions) -> Self {
        Self { integral_type, options }
    }

    pub fn options(&self) -> &BackendOptions {
        &self.options
    }

    pub fn renderer(&self) -> Renderer {
        Renderer::new(Dialect::Rust, self.options.float_precision)
    }

    /// The crates code using the given operators depends on.
    pub fn required_crates<'a>(used_operators: impl IntoIterator<Item = &'a str>) -> Vec<&'static str> {
        let used: BTreeSet<&str> = used_operators.into_iter().collect();
        if LIBM_OPERATORS.iter().any(|op| used.contains(op)) {
            vec!["libm"]
        } else {
            Vec::new()
        }
    }

    fn access(&self) -> TerminalAccess<'_, Self> {
        TerminalAccess {
            backend: self,
            integral_type: self.integral_type,
            options: self.options,
            dialect: Dialect::Rust,
        }
    }
}

impl_cnodes_language!(RustBackend);

impl Backend for RustBackend {
    fn name(&self) -> &'static str {
        "Rust"
    }

    fn translate_operator(&self, op: Operator, operands: Vec<CExpr>) -> Result<CExpr, CodegenError> {
        use Operator::*;
        check_arity(op, &operands)?;
        let unsupported = || CodegenError::UnsupportedOperator {
            operator: op.name(),
            backend: self.name(),
        };

        let method = match op {
            Power => "powf",
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
            Atan2 => "atan2",
            Cosh => "cosh",
            Sinh => "sinh",
            Tanh => "tanh",
            MinValue => "min",
            MaxValue => "max",
            Erf => return Ok(CExpr::call("libm::erf", operands)),
            BesselJ | BesselY => {
                let function = if op == BesselJ { "libm::jn" } else { "libm::yn" };
                let mut operands = operands.into_iter();
                let (nu, x) = operands.next().zip(operands.next()).ok_or_else(unsupported)?;
                let order = CExpr::Cast {
                    expr: Box::new(nu),
                    ty: "i32".to_string(),
                };
                return Ok(CExpr::call(function, vec![order, x]));
            }
            BesselI | BesselK => return Err(unsupported()),
            Sum | Product | Division | Eq | Ne | Lt | Le | Gt | Ge | AndCondition | OrCondition | NotCondition
            | Conditional => return translate_common(op, operands).ok_or_else(unsupported),
        };

        let mut operands = operands.into_iter();
        let receiver = operands.next().ok_or_else(unsupported)?;
        Ok(CExpr::method_call(receiver, method, operands.collect()))
    }

    fn terminal_access(
        &self,
        terminal: &ModifiedTerminal,
        table: Option<&TableRange>,
        num_points: usize,
    ) -> Result<CExpr, CodegenError> {
        self.access().access(terminal, table, num_points)
    }

    fn terminal_definitions(
        &self,
        terminal: &ModifiedTerminal,
        table: Option<&TableRange>,
        num_points: usize,
        access: &CExpr,
    ) -> Result<Vec<CStatement>, CodegenError> {
        self.access()
            .definitions(terminal, table, num_points, access)
    }
}
