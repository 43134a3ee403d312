//! Backends generating C and Rust source code.
//!
//! Both backends build the same [`cnodes`] tree and share the conventions of the generated
//! kernel, implemented by [`TerminalAccess`]. The kernel is assumed to receive
//!
//! - the element tensor `A`,
//! - the coefficient dofs `w[count][dof]`,
//! - the cell vertex coordinates `coordinate_dofs[gdim * vertex + component]`,
//! - the local entity number (`facet`, `facet_0`/`facet_1` for interior facets or `vertex`),
//! - facet normals `n` (`n_0`/`n_1`) and cell volumes `volume` (`volume_0`/`volume_1`).
use serde::{Deserialize, Serialize};

use crate::codegen::Backend;
use crate::error::CodegenError;
use crate::ir::{ModifiedTerminal, TableRange, TableType, Terminal};
use crate::monomial::{IntegralType, Restriction};

pub mod c;
pub mod cnodes;
pub mod rust;

pub use c::CBackend;
pub use rust::RustBackend;

use cnodes::{CExpr, CStatement, Dialect};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendOptions {
    pub geometric_dimension: usize,
    pub topological_dimension: usize,
    /// Number of significant digits of float literals.
    pub float_precision: usize,
}

impl Default for BackendOptions {
    fn default() -> Self {
        Self {
            geometric_dimension: 3,
            topological_dimension: 3,
            float_precision: 16,
        }
    }
}

impl BackendOptions {
    pub fn new(geometric_dimension: usize, topological_dimension: usize) -> Self {
        Self {
            geometric_dimension,
            topological_dimension,
            ..Self::default()
        }
    }

    pub fn with_float_precision(self, float_precision: usize) -> Self {
        Self {
            float_precision,
            ..self
        }
    }
}

/// Access to modified terminals in generated kernels.
///
/// Arrays and loop counters shared with the generator are named through `backend`.
#[derive(Debug)]
pub(crate) struct TerminalAccess<'a, B> {
    pub backend: &'a B,
    pub integral_type: IntegralType,
    pub options: BackendOptions,
    pub dialect: Dialect,
}

fn malformed(reason: impl Into<String>) -> CodegenError {
    CodegenError::MalformedIr(reason.into())
}

impl<'a, B: Backend<Expr = CExpr>> TerminalAccess<'a, B> {
    fn quadrature_index(&self, num_points: usize) -> CExpr {
        self.backend.quadrature_loop_index(num_points)
    }

    /// The local number of the entity integrated over.
    fn entity(&self, restriction: Option<Restriction>) -> CExpr {
        match self.integral_type {
            IntegralType::ExteriorFacet => CExpr::symbol("facet"),
            IntegralType::InteriorFacet => {
                let side = restriction.unwrap_or(Restriction::Plus).side();
                CExpr::symbol(format!("facet_{side}"))
            }
            IntegralType::Vertex => CExpr::symbol("vertex"),
            _ => CExpr::LiteralInt(0),
        }
    }

    fn restricted_symbol(&self, name: &str, restriction: Option<Restriction>) -> CExpr {
        match (self.integral_type, restriction) {
            (IntegralType::InteriorFacet, r) => {
                let side = r.unwrap_or(Restriction::Plus).side();
                CExpr::symbol(format!("{name}_{side}"))
            }
            _ => CExpr::symbol(name),
        }
    }

    /// `table[entity][iq][dof]`, with entity and point indices dropped to zero where the table
    /// is constant.
    fn table_value(&self, range: &TableRange, restriction: Option<Restriction>, num_points: usize, dof: CExpr) -> CExpr {
        let entity = match range.table_type {
            TableType::Uniform | TableType::Fixed => CExpr::LiteralInt(0),
            _ => self.entity(restriction),
        };
        let point = match range.table_type {
            TableType::Piecewise | TableType::Fixed => CExpr::LiteralInt(0),
            _ => self.quadrature_index(num_points),
        };
        CExpr::array_access(CExpr::symbol(range.table.as_str()), vec![entity, point, dof])
    }

    /// Name of the variable holding the value of a terminal.
    fn variable_name(&self, base: &str, terminal: &ModifiedTerminal) -> String {
        let mut name = format!("{base}_c{}", terminal.component);
        if terminal.local_derivatives.iter().any(|&d| d > 0) {
            name.push_str("_d");
            for d in &terminal.local_derivatives {
                name.push_str(&d.to_string());
            }
        }
        if let Some(r) = terminal.restriction {
            name.push_str(&format!("_r{}", r.side()));
        }
        name
    }

    fn coordinate_dof(&self, node: CExpr, component: usize) -> CExpr {
        let gdim = self.options.geometric_dimension as i64;
        let offset = CExpr::mul(CExpr::LiteralInt(gdim), node);
        CExpr::index(CExpr::symbol("coordinate_dofs"), CExpr::add(offset, CExpr::LiteralInt(component as i64)))
    }

    pub fn access(&self, mt: &ModifiedTerminal, table: Option<&TableRange>, num_points: usize) -> Result<CExpr, CodegenError> {
        if let Some(range) = table {
            match range.table_type {
                TableType::Zeros => return Ok(CExpr::LiteralFloat(0.0)),
                TableType::Ones if matches!(mt.terminal, Terminal::Argument { .. }) => {
                    return Ok(CExpr::LiteralFloat(1.0))
                }
                _ => {}
            }
        }

        match &mt.terminal {
            Terminal::Argument { number } => {
                let range = table.ok_or_else(|| malformed(format!("argument {number} has no table")))?;
                if range.table_type == TableType::Quadrature {
                    return Ok(CExpr::LiteralFloat(1.0));
                }
                let dof = CExpr::sub(
                    CExpr::symbol(format!("ia{number}")),
                    CExpr::LiteralInt(range.begin as i64),
                );
                Ok(self.table_value(range, mt.restriction, num_points, dof))
            }
            Terminal::Coefficient { count } => {
                let dofs = CExpr::index(CExpr::symbol("w"), CExpr::LiteralInt(*count as i64));
                match table {
                    None => Ok(CExpr::index(dofs, CExpr::LiteralInt(mt.component as i64))),
                    Some(range) if range.table_type == TableType::Ones && range.len() == 1 => {
                        Ok(CExpr::index(dofs, CExpr::LiteralInt(range.begin as i64)))
                    }
                    Some(range) if range.table_type == TableType::Quadrature => {
                        let dof = CExpr::add(self.quadrature_index(num_points), CExpr::LiteralInt(range.begin as i64));
                        Ok(CExpr::index(dofs, dof))
                    }
                    Some(_) => Ok(CExpr::symbol(self.variable_name(&format!("w{count}"), mt))),
                }
            }
            Terminal::SpatialCoordinate => match table {
                Some(_) => Ok(CExpr::symbol(self.variable_name("x", mt))),
                None if self.integral_type == IntegralType::Vertex => {
                    Ok(self.coordinate_dof(CExpr::symbol("vertex"), mt.component))
                }
                None => Err(malformed("spatial coordinate has no table")),
            },
            Terminal::Jacobian => match table {
                Some(_) => Ok(CExpr::symbol(self.variable_name("J", mt))),
                None => Err(malformed("Jacobian has no table")),
            },
            Terminal::FacetNormal => match self.integral_type {
                IntegralType::ExteriorFacet | IntegralType::InteriorFacet => Ok(CExpr::index(
                    self.restricted_symbol("n", mt.restriction),
                    CExpr::LiteralInt(mt.component as i64),
                )),
                other => Err(malformed(format!("facet normal in {other} integral"))),
            },
            Terminal::CellVolume => Ok(self.restricted_symbol("volume", mt.restriction)),
            Terminal::QuadratureWeight => Ok(CExpr::index(
                CExpr::symbol(self.backend.weights_array_name(num_points)),
                self.quadrature_index(num_points),
            )),
            Terminal::FloatValue(value) => Ok(CExpr::LiteralFloat(*value)),
            Terminal::IntValue(value) => match self.dialect {
                Dialect::C => Ok(CExpr::LiteralInt(*value)),
                Dialect::Rust => Ok(CExpr::LiteralFloat(*value as f64)),
            },
            Terminal::Zero => Ok(CExpr::LiteralFloat(0.0)),
        }
    }

    /// `name = sum_ic dofs(ic + begin) * table[entity][iq][ic]`
    fn expansion(
        &self,
        name: &str,
        range: &TableRange,
        restriction: Option<Restriction>,
        num_points: usize,
        dofs: impl Fn(CExpr) -> CExpr,
    ) -> Vec<CStatement> {
        let ic = CExpr::symbol("ic");
        let dof = CExpr::add(ic.clone(), CExpr::LiteralInt(range.begin as i64));
        let value = CExpr::Product(vec![dofs(dof), self.table_value(range, restriction, num_points, ic.clone())]);
        vec![
            CStatement::VariableDecl {
                name: name.to_string(),
                value: CExpr::LiteralFloat(0.0),
            },
            CStatement::ForRange {
                index: ic,
                begin: 0,
                end: range.len(),
                body: vec![CStatement::AssignAdd {
                    target: CExpr::symbol(name),
                    value,
                }],
            },
        ]
    }

    pub fn definitions(
        &self,
        mt: &ModifiedTerminal,
        table: Option<&TableRange>,
        num_points: usize,
        access: &CExpr,
    ) -> Result<Vec<CStatement>, CodegenError> {
        let (CExpr::Symbol(name), Some(range)) = (access, table) else {
            return Ok(Vec::new());
        };

        let definitions = match &mt.terminal {
            Terminal::Coefficient { count } => {
                let count = *count as i64;
                self.expansion(name, range, mt.restriction, num_points, |dof| {
                    CExpr::index(CExpr::index(CExpr::symbol("w"), CExpr::LiteralInt(count)), dof)
                })
            }
            Terminal::SpatialCoordinate => self.expansion(name, range, mt.restriction, num_points, |dof| {
                self.coordinate_dof(dof, mt.component)
            }),
            Terminal::Jacobian => {
                let tdim = self.options.topological_dimension.max(1);
                let component = mt.component / tdim;
                self.expansion(name, range, mt.restriction, num_points, |dof| {
                    self.coordinate_dof(dof, component)
                })
            }
            _ => Vec::new(),
        };
        Ok(definitions)
    }
}
