//! A small statement and expression tree for C-like target languages.
//!
//! The same tree is rendered either as C/C++ or as Rust source, see [`Dialect`]. Expressions
//! are parenthesized by operator precedence, so the tree never needs explicit grouping nodes.
use std::fmt::Write;

use itertools::Itertools;

use crate::codegen::ArrayDecl;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Dialect {
    C,
    Rust,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BinOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => precedence::RELATIONAL,
            BinOp::Eq | BinOp::Ne => precedence::EQUALITY,
            BinOp::And => precedence::AND,
            BinOp::Or => precedence::OR,
        }
    }

    fn is_associative(&self) -> bool {
        matches!(self, BinOp::And | BinOp::Or)
    }
}

mod precedence {
    pub const ATOM: u8 = 100;
    pub const UNARY: u8 = 90;
    pub const CAST: u8 = 85;
    pub const PRODUCT: u8 = 80;
    pub const SUM: u8 = 70;
    pub const RELATIONAL: u8 = 60;
    pub const EQUALITY: u8 = 55;
    pub const AND: u8 = 40;
    pub const OR: u8 = 30;
    pub const CONDITIONAL: u8 = 20;
    pub const LOWEST: u8 = 0;
}

#[derive(Debug, Clone, PartialEq)]
pub enum CExpr {
    Symbol(String),
    LiteralFloat(f64),
    LiteralInt(i64),
    LiteralBool(bool),
    ArrayAccess {
        array: Box<CExpr>,
        indices: Vec<CExpr>,
    },
    Sum(Vec<CExpr>),
    Product(Vec<CExpr>),
    Difference(Box<CExpr>, Box<CExpr>),
    Division(Box<CExpr>, Box<CExpr>),
    BinOp {
        op: BinOp,
        lhs: Box<CExpr>,
        rhs: Box<CExpr>,
    },
    Not(Box<CExpr>),
    Conditional {
        condition: Box<CExpr>,
        true_value: Box<CExpr>,
        false_value: Box<CExpr>,
    },
    Call {
        function: String,
        args: Vec<CExpr>,
    },
    MethodCall {
        receiver: Box<CExpr>,
        method: String,
        args: Vec<CExpr>,
    },
    Cast {
        expr: Box<CExpr>,
        ty: String,
    },
}

impl CExpr {
    pub fn symbol(name: impl Into<String>) -> Self {
        CExpr::Symbol(name.into())
    }

    pub fn array_access(array: CExpr, indices: Vec<CExpr>) -> Self {
        CExpr::ArrayAccess {
            array: Box::new(array),
            indices,
        }
    }

    /// `array[index]`
    pub fn index(array: CExpr, index: CExpr) -> Self {
        Self::array_access(array, vec![index])
    }

    /// `lhs + rhs`, omitting a literal zero on either side.
    pub fn add(lhs: CExpr, rhs: CExpr) -> Self {
        match (lhs, rhs) {
            (CExpr::LiteralInt(0), other) | (other, CExpr::LiteralInt(0)) => other,
            (lhs, rhs) => CExpr::Sum(vec![lhs, rhs]),
        }
    }

    /// `lhs - rhs`, omitting a literal zero on the right.
    pub fn sub(lhs: CExpr, rhs: CExpr) -> Self {
        match rhs {
            CExpr::LiteralInt(0) => lhs,
            rhs => CExpr::Difference(Box::new(lhs), Box::new(rhs)),
        }
    }

    /// `lhs * rhs`, omitting a literal one on either side.
    pub fn mul(lhs: CExpr, rhs: CExpr) -> Self {
        match (lhs, rhs) {
            (CExpr::LiteralInt(1), other) | (other, CExpr::LiteralInt(1)) => other,
            (lhs, rhs) => CExpr::Product(vec![lhs, rhs]),
        }
    }

    pub fn binop(op: BinOp, lhs: CExpr, rhs: CExpr) -> Self {
        CExpr::BinOp {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn call(function: impl Into<String>, args: Vec<CExpr>) -> Self {
        CExpr::Call {
            function: function.into(),
            args,
        }
    }

    pub fn method_call(receiver: CExpr, method: impl Into<String>, args: Vec<CExpr>) -> Self {
        CExpr::MethodCall {
            receiver: Box::new(receiver),
            method: method.into(),
            args,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CStatement {
    Comment(String),
    ArrayDecl(ArrayDecl),
    /// Declaration of a mutable floating point variable.
    VariableDecl {
        name: String,
        value: CExpr,
    },
    Assign {
        target: CExpr,
        value: CExpr,
    },
    AssignAdd {
        target: CExpr,
        value: CExpr,
    },
    ZeroFill {
        array: CExpr,
        size: usize,
    },
    ForRange {
        index: CExpr,
        begin: usize,
        end: usize,
        body: Vec<CStatement>,
    },
    Scope(Vec<CStatement>),
    List(Vec<CStatement>),
}

/// Formats a float with the given number of significant digits, such that the result is a
/// floating point literal in both C and Rust.
pub fn format_float(value: f64, precision: usize) -> String {
    let precision = precision.max(1);
    if value == 0.0 {
        return "0.0".to_string();
    }

    let magnitude = value.abs();
    if (1e-5..1e16).contains(&magnitude) {
        let exponent = magnitude.log10().floor() as i64;
        let decimals = (precision as i64 - 1 - exponent).max(1) as usize;
        let mut formatted = format!("{value:.decimals$}");
        if formatted.contains('.') {
            let trimmed_len = formatted.trim_end_matches('0').len();
            formatted.truncate(trimmed_len);
            if formatted.ends_with('.') {
                formatted.push('0');
            }
        }
        formatted
    } else {
        // The shortest representation that reads back as the same value
        let shortest = format!("{value:e}");
        let mantissa_digits = shortest
            .split('e')
            .next()
            .map_or(usize::MAX, |mantissa| mantissa.chars().filter(char::is_ascii_digit).count());
        if mantissa_digits <= precision {
            return shortest;
        }

        let formatted = format!("{:.*e}", precision - 1, value);
        match formatted.split_once('e') {
            Some((mantissa, exponent)) => {
                let mantissa = if mantissa.contains('.') {
                    mantissa.trim_end_matches('0').trim_end_matches('.')
                } else {
                    mantissa
                };
                format!("{mantissa}e{exponent}")
            }
            None => formatted,
        }
    }
}

/// Renders statements and expressions as source code of a dialect.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Renderer {
    dialect: Dialect,
    precision: usize,
    indent_width: usize,
}

impl Renderer {
    pub fn new(dialect: Dialect, precision: usize) -> Self {
        Self {
            dialect,
            precision,
            indent_width: 4,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn float(&self, value: f64) -> String {
        match (self.dialect, value) {
            (Dialect::C, v) if v.is_nan() => "NAN".to_string(),
            (Dialect::Rust, v) if v.is_nan() => "f64::NAN".to_string(),
            (Dialect::C, v) if v.is_infinite() => format!("{}INFINITY", if v < 0.0 { "-" } else { "" }),
            (Dialect::Rust, v) if v.is_infinite() => format!("{}f64::INFINITY", if v < 0.0 { "-" } else { "" }),
            (_, v) => format_float(v, self.precision),
        }
    }

    fn precedence(&self, expr: &CExpr) -> u8 {
        use precedence::*;
        match expr {
            CExpr::LiteralFloat(v) if v.is_sign_negative() && *v != 0.0 => UNARY,
            CExpr::LiteralInt(v) if *v < 0 => UNARY,
            CExpr::Symbol(_)
            | CExpr::LiteralFloat(_)
            | CExpr::LiteralInt(_)
            | CExpr::LiteralBool(_)
            | CExpr::ArrayAccess { .. }
            | CExpr::Call { .. }
            | CExpr::MethodCall { .. } => ATOM,
            CExpr::Sum(terms) if terms.len() == 1 => self.precedence(&terms[0]),
            CExpr::Product(factors) if factors.len() == 1 => self.precedence(&factors[0]),
            CExpr::Sum(terms) if terms.is_empty() => ATOM,
            CExpr::Product(factors) if factors.is_empty() => ATOM,
            CExpr::Sum(_) | CExpr::Difference(..) => SUM,
            CExpr::Product(_) | CExpr::Division(..) => PRODUCT,
            CExpr::BinOp { op, .. } => op.precedence(),
            CExpr::Not(_) => UNARY,
            CExpr::Conditional { .. } => CONDITIONAL,
            CExpr::Cast { .. } => match self.dialect {
                Dialect::C => UNARY,
                Dialect::Rust => CAST,
            },
        }
    }

    /// Renders an operand of an operator with the given precedence, adding parentheses if
    /// the operand binds less tightly.
    fn operand(&self, expr: &CExpr, min_precedence: u8) -> String {
        let rendered = self.expr(expr);
        if self.precedence(expr) < min_precedence {
            format!("({rendered})")
        } else {
            rendered
        }
    }

    fn args(&self, args: &[CExpr]) -> String {
        args.iter()
            .map(|arg| self.operand(arg, precedence::LOWEST))
            .join(", ")
    }

    pub fn expr(&self, expr: &CExpr) -> String {
        use precedence::*;
        match expr {
            CExpr::Symbol(name) => name.clone(),
            CExpr::LiteralFloat(value) => self.float(*value),
            CExpr::LiteralInt(value) => value.to_string(),
            CExpr::LiteralBool(value) => value.to_string(),
            CExpr::ArrayAccess { array, indices } => {
                let mut rendered = self.operand(array, ATOM);
                for index in indices {
                    write!(rendered, "[{}]", self.expr(index)).ok();
                }
                rendered
            }
            CExpr::Sum(terms) if terms.is_empty() => "0".to_string(),
            CExpr::Product(factors) if factors.is_empty() => "1".to_string(),
            CExpr::Sum(terms) => terms.iter().map(|t| self.operand(t, SUM)).join(" + "),
            CExpr::Product(factors) => factors
                .iter()
                .map(|f| self.operand(f, PRODUCT))
                .join(" * "),
            CExpr::Difference(lhs, rhs) => {
                format!("{} - {}", self.operand(lhs, SUM), self.operand(rhs, SUM + 1))
            }
            CExpr::Division(lhs, rhs) => {
                format!("{} / {}", self.operand(lhs, PRODUCT), self.operand(rhs, PRODUCT + 1))
            }
            CExpr::BinOp { op, lhs, rhs } => {
                let p = op.precedence();
                let min = if op.is_associative() { p } else { p + 1 };
                format!("{} {} {}", self.operand(lhs, min), op.symbol(), self.operand(rhs, min))
            }
            CExpr::Not(operand) => format!("!{}", self.operand(operand, UNARY)),
            CExpr::Conditional {
                condition,
                true_value,
                false_value,
            } => match self.dialect {
                Dialect::C => format!(
                    "{} ? {} : {}",
                    self.operand(condition, CONDITIONAL + 1),
                    self.operand(true_value, CONDITIONAL + 1),
                    self.operand(false_value, CONDITIONAL + 1)
                ),
                Dialect::Rust => format!(
                    "if {} {{ {} }} else {{ {} }}",
                    self.expr(condition),
                    self.expr(true_value),
                    self.expr(false_value)
                ),
            },
            CExpr::Call { function, args } => format!("{function}({})", self.args(args)),
            CExpr::MethodCall { receiver, method, args } => {
                let receiver = match (self.dialect, receiver.as_ref()) {
                    // Method calls on unsuffixed float literals are ambiguous in Rust
                    (Dialect::Rust, CExpr::LiteralFloat(value)) if self.precedence(receiver) == ATOM => {
                        format!("{}_f64", self.float(*value))
                    }
                    _ => self.operand(receiver, ATOM),
                };
                format!("{receiver}.{method}({})", self.args(args))
            }
            CExpr::Cast { expr, ty } => match self.dialect {
                Dialect::C => format!("({ty}){}", self.operand(expr, UNARY)),
                Dialect::Rust => format!("{} as {ty}", self.operand(expr, CAST)),
            },
        }
    }

    /// Renders a statement, one line per element of the returned string.
    pub fn statement(&self, statement: &CStatement) -> String {
        let mut lines = Vec::new();
        self.write_statement(statement, 0, &mut lines);
        lines.join("\n")
    }

    fn line(&self, indent: usize, text: impl AsRef<str>, lines: &mut Vec<String>) {
        lines.push(format!("{:width$}{}", "", text.as_ref(), width = indent * self.indent_width));
    }

    fn array_initializer(&self, sizes: &[usize], values: &[f64]) -> String {
        let (open, close) = match self.dialect {
            Dialect::C => ("{", "}"),
            Dialect::Rust => ("[", "]"),
        };
        match sizes.split_first() {
            None => values.first().map(|&v| self.float(v)).unwrap_or_default(),
            Some((_, [])) => format!("{open}{}{close}", values.iter().map(|&v| self.float(v)).join(", ")),
            Some((_, inner)) => {
                let chunk_len: usize = inner.iter().product();
                let chunks = if chunk_len == 0 {
                    Vec::new()
                } else {
                    values
                        .chunks(chunk_len)
                        .map(|chunk| self.array_initializer(inner, chunk))
                        .collect()
                };
                format!("{open}{}{close}", chunks.join(", "))
            }
        }
    }

    fn rust_array_type(&self, sizes: &[usize]) -> String {
        sizes
            .iter()
            .rev()
            .fold("f64".to_string(), |inner, size| format!("[{inner}; {size}]"))
    }

    fn array_decl(&self, decl: &ArrayDecl) -> String {
        match self.dialect {
            Dialect::C => {
                let alignas = decl
                    .alignas
                    .map(|n| format!("alignas({n}) "))
                    .unwrap_or_default();
                let ty = if decl.constant { "static const double" } else { "double" };
                let dims: String = decl.sizes.iter().map(|s| format!("[{s}]")).collect();
                match &decl.values {
                    Some(values) => format!(
                        "{alignas}{ty} {}{dims} = {};",
                        decl.name,
                        self.array_initializer(&decl.sizes, values)
                    ),
                    None => format!("{alignas}{ty} {}{dims};", decl.name),
                }
            }
            Dialect::Rust => {
                let ty = self.rust_array_type(&decl.sizes);
                let value = match &decl.values {
                    Some(values) => self.array_initializer(&decl.sizes, values),
                    None => decl
                        .sizes
                        .iter()
                        .rev()
                        .fold("0.0".to_string(), |inner, size| format!("[{inner}; {size}]")),
                };
                if decl.constant {
                    format!("static {}: {ty} = {value};", decl.name)
                } else {
                    format!("let mut {}: {ty} = {value};", decl.name)
                }
            }
        }
    }

    fn write_block(&self, body: &[CStatement], indent: usize, lines: &mut Vec<String>) {
        for statement in body {
            self.write_statement(statement, indent, lines);
        }
    }

    fn write_statement(&self, statement: &CStatement, indent: usize, lines: &mut Vec<String>) {
        match statement {
            CStatement::Comment(text) => self.line(indent, format!("// {text}"), lines),
            CStatement::ArrayDecl(decl) => self.line(indent, self.array_decl(decl), lines),
            CStatement::VariableDecl { name, value } => {
                let decl = match self.dialect {
                    Dialect::C => format!("double {name} = {};", self.expr(value)),
                    Dialect::Rust => format!("let mut {name}: f64 = {};", self.expr(value)),
                };
                self.line(indent, decl, lines)
            }
            CStatement::Assign { target, value } => {
                self.line(indent, format!("{} = {};", self.expr(target), self.expr(value)), lines)
            }
            CStatement::AssignAdd { target, value } => {
                self.line(indent, format!("{} += {};", self.expr(target), self.expr(value)), lines)
            }
            CStatement::ZeroFill { array, size } => {
                let array = self.operand(array, precedence::ATOM);
                let fill = match self.dialect {
                    Dialect::C => format!("memset({array}, 0, {size} * sizeof(*{array}));"),
                    Dialect::Rust => format!("{array}[..{size}].fill(0.0);"),
                };
                self.line(indent, fill, lines)
            }
            CStatement::ForRange {
                index,
                begin,
                end,
                body,
            } => {
                let index = self.expr(index);
                match self.dialect {
                    Dialect::C => {
                        self.line(
                            indent,
                            format!("for (int {index} = {begin}; {index} < {end}; ++{index})"),
                            lines,
                        );
                        let single_statement = matches!(
                            body.as_slice(),
                            [CStatement::Assign { .. } | CStatement::AssignAdd { .. } | CStatement::ForRange { .. }]
                        );
                        if single_statement {
                            self.write_block(body, indent + 1, lines);
                        } else {
                            self.line(indent, "{", lines);
                            self.write_block(body, indent + 1, lines);
                            self.line(indent, "}", lines);
                        }
                    }
                    Dialect::Rust => {
                        self.line(indent, format!("for {index} in {begin}..{end} {{"), lines);
                        self.write_block(body, indent + 1, lines);
                        self.line(indent, "}", lines);
                    }
                }
            }
            CStatement::Scope(body) => {
                self.line(indent, "{", lines);
                self.write_block(body, indent + 1, lines);
                self.line(indent, "}", lines);
            }
            CStatement::List(body) => self.write_block(body, indent, lines),
        }
    }
}

/// Implements [`Language`](crate::codegen::Language) for a backend rendering the tree of this
/// module. The backend must provide a `renderer()` method.
macro_rules! impl_cnodes_language {
    ($backend:ty) => {
        impl $crate::codegen::Language for $backend {
            type Expr = $crate::backend::cnodes::CExpr;
            type Stmt = $crate::backend::cnodes::CStatement;

            fn symbol(&self, name: &str) -> CExpr {
                CExpr::symbol(name)
            }

            fn literal_float(&self, value: f64) -> CExpr {
                CExpr::LiteralFloat(value)
            }

            fn literal_int(&self, value: i64) -> CExpr {
                CExpr::LiteralInt(value)
            }

            fn array_access(&self, array: CExpr, indices: Vec<CExpr>) -> CExpr {
                CExpr::array_access(array, indices)
            }

            fn product(&self, factors: Vec<CExpr>) -> CExpr {
                CExpr::Product(factors)
            }

            fn sum(&self, terms: Vec<CExpr>) -> CExpr {
                CExpr::Sum(terms)
            }

            fn array_decl(&self, decl: $crate::codegen::ArrayDecl) -> CStatement {
                CStatement::ArrayDecl(decl)
            }

            fn assign(&self, target: CExpr, value: CExpr) -> CStatement {
                CStatement::Assign { target, value }
            }

            fn assign_add(&self, target: CExpr, value: CExpr) -> CStatement {
                CStatement::AssignAdd { target, value }
            }

            fn zero_fill(&self, array: CExpr, size: usize) -> CStatement {
                CStatement::ZeroFill { array, size }
            }

            fn for_range(&self, index: CExpr, begin: usize, end: usize, body: Vec<CStatement>) -> CStatement {
                CStatement::ForRange {
                    index,
                    begin,
                    end,
                    body,
                }
            }

            fn scope(&self, body: Vec<CStatement>) -> CStatement {
                CStatement::Scope(body)
            }

            fn comment(&self, text: &str) -> CStatement {
                CStatement::Comment(text.to_string())
            }

            fn statement_list(&self, statements: Vec<CStatement>) -> CStatement {
                CStatement::List(statements)
            }

            fn format_statement(&self, statement: &CStatement) -> String {
                self.renderer().statement(statement)
            }
        }
    };
}

pub(crate) use impl_cnodes_language;
