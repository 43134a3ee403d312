//! C/C++ backend.
use std::collections::BTreeSet;

use crate::backend::cnodes::{impl_cnodes_language, BinOp, CExpr, CStatement, Dialect, Renderer};
use crate::backend::{BackendOptions, TerminalAccess};
use crate::codegen::Backend;
use crate::error::CodegenError;
use crate::ir::{ModifiedTerminal, Operator, TableRange};
use crate::monomial::IntegralType;

/// Operators translated to functions declared in `<cmath>`.
const CMATH_OPERATORS: &[&str] = &[
    "abs", "power", "sqrt", "exp", "ln", "cos", "sin", "tan", "acos", "asin", "atan", "atan_2", "cosh", "sinh",
    "tanh", "erf", "min_value", "max_value",
];

/// Operators translated to boost special functions.
const BOOST_MATH_OPERATORS: &[&str] = &["bessel_j", "bessel_y", "bessel_i", "bessel_k"];

/// Generates C++ kernel bodies using `<cmath>` and boost special functions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CBackend {
    integral_type: IntegralType,
    options: BackendOptions,
}

impl CBackend {
    pub fn new(integral_type: IntegralType, options: BackendOptions) -> Self {
        Self { integral_type, options }
    }

    pub fn options(&self) -> &BackendOptions {
        &self.options
    }

    pub fn renderer(&self) -> Renderer {
        Renderer::new(Dialect::C, self.options.float_precision)
    }

    /// The include directives needed by code using the given operators, sorted.
    pub fn includes<'a>(used_operators: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let used: BTreeSet<&str> = used_operators.into_iter().collect();
        let mut includes = BTreeSet::new();
        includes.insert("#include <cstring>");
        if CMATH_OPERATORS.iter().any(|op| used.contains(op)) {
            includes.insert("#include <cmath>");
        }
        if BOOST_MATH_OPERATORS.iter().any(|op| used.contains(op)) {
            includes.insert("#include <boost/math/special_functions.hpp>");
        }
        includes.into_iter().map(String::from).collect()
    }

    fn access(&self) -> TerminalAccess<'_, Self> {
        TerminalAccess {
            backend: self,
            integral_type: self.integral_type,
            options: self.options,
            dialect: Dialect::C,
        }
    }
}

impl_cnodes_language!(CBackend);

fn binary(operands: Vec<CExpr>) -> (CExpr, CExpr) {
    let mut operands = operands.into_iter();
    match (operands.next(), operands.next()) {
        (Some(a), Some(b)) => (a, b),
        _ => unreachable!("operand count is checked before translation"),
    }
}

pub(crate) fn check_arity(op: Operator, operands: &[CExpr]) -> Result<(), CodegenError> {
    if operands.len() == op.arity() {
        Ok(())
    } else {
        Err(CodegenError::MalformedIr(format!(
            "operator {op} expects {} operand(s), got {}",
            op.arity(),
            operands.len()
        )))
    }
}

/// Translations shared by the C and Rust backends.
pub(crate) fn translate_common(op: Operator, operands: Vec<CExpr>) -> Option<CExpr> {
    use Operator::*;
    let comparison = match op {
        Eq => Some(BinOp::Eq),
        Ne => Some(BinOp::Ne),
        Lt => Some(BinOp::Lt),
        Le => Some(BinOp::Le),
        Gt => Some(BinOp::Gt),
        Ge => Some(BinOp::Ge),
        AndCondition => Some(BinOp::And),
        OrCondition => Some(BinOp::Or),
        _ => None,
    };
    if let Some(binop) = comparison {
        let (a, b) = binary(operands);
        return Some(CExpr::binop(binop, a, b));
    }

    match op {
        Sum => Some(CExpr::Sum(operands)),
        Product => Some(CExpr::Product(operands)),
        Division => {
            let (a, b) = binary(operands);
            Some(CExpr::Division(Box::new(a), Box::new(b)))
        }
        NotCondition => operands.into_iter().next().map(|a| CExpr::Not(Box::new(a))),
        Conditional => {
            let mut operands = operands.into_iter();
            match (operands.next(), operands.next(), operands.next()) {
                (Some(condition), Some(true_value), Some(false_value)) => Some(CExpr::Conditional {
                    condition: Box::new(condition),
                    true_value: Box::new(true_value),
                    false_value: Box::new(false_value),
                }),
                _ => None,
            }
        }
        _ => None,
    }
}

impl Backend for CBackend {
    fn name(&self) -> &'static str {
        "C"
    }

    fn translate_operator(&self, op: Operator, operands: Vec<CExpr>) -> Result<CExpr, CodegenError> {
        use Operator::*;
        check_arity(op, &operands)?;
        let function = match op {
            Power => "std::pow",
            Abs => "std::abs",
            Sqrt => "std::sqrt",
            Exp => "std::exp",
            Ln => "std::log",
            Cos => "std::cos",
            Sin => "std::sin",
            Tan => "std::tan",
            Acos => "std::acos",
            Asin => "std::asin",
            Atan => "std::atan",
            Atan2 => "std::atan2",
            Cosh => "std::cosh",
            Sinh => "std::sinh",
            Tanh => "std::tanh",
            Erf => "std::erf",
            BesselJ => "boost::math::cyl_bessel_j",
            BesselY => "boost::math::cyl_neumann",
            BesselI => "boost::math::cyl_bessel_i",
            BesselK => "boost::math::cyl_bessel_k",
            MinValue => "std::fmin",
            MaxValue => "std::fmax",
            Sum | Product | Division | Eq | Ne | Lt | Le | Gt | Ge | AndCondition | OrCondition | NotCondition
            | Conditional => {
                return translate_common(op, operands).ok_or_else(|| CodegenError::UnsupportedOperator {
                    operator: op.name(),
                    backend: self.name(),
                })
            }
        };
        Ok(CExpr::call(function, operands))
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
