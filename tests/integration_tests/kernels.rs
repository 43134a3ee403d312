//! Kernels for P1 triangles generated from tables tabulated at reference quadrature points.
use formgen::backend::{BackendOptions, CBackend, RustBackend};
use formgen::codegen::{generate_integral, GeneratorOptions, Language};
use formgen::element::{CellShape, ElementDescriptor, ReferenceElementProvider};
use formgen::index::{IndexBindings, IndexRole};
use formgen::ir::{
    BlockContribution, ElementTable, ExprIr, IntegralIr, ModifiedTerminal, NodeId, Operator, Partition, TableRange,
    TableType, Terminal,
};
use formgen::monomial::{IntegralType, MonomialFactor, RawMonomial};
use formgen::nalgebra::DMatrix;
use formgen::quadrature::{QuadratureRule, QuadratureRuleProvider, ReferenceQuadrature};
use formgen::transform::transform_monomial;

use matrixcompare::assert_matrix_eq;

fn p1_basis(point: &[f64]) -> [f64; 3] {
    let (x, y) = (point[0], point[1]);
    [1.0 - x - y, x, y]
}

fn p1_table(rule: &QuadratureRule) -> ElementTable {
    ElementTable::from_fn([1, rule.num_points(), 3], |_, q, dof| p1_basis(&rule.point_at(q))[dof])
}

fn piecewise(expr_ir: &mut ExprIr, terminal: ModifiedTerminal, table: Option<TableRange>) -> NodeId {
    expr_ir.push_terminal(terminal, Some(Partition::Piecewise), table)
}

fn operator(expr_ir: &mut ExprIr, op: Operator, operands: Vec<NodeId>, partition: Partition) -> NodeId {
    expr_ir
        .push_operator(op, operands, Some(partition))
        .expect("operands are pushed before their operators")
}

/// `|det J|` of an affine triangle, computed from the Jacobian entries.
fn push_jacobian_determinant(expr_ir: &mut ExprIr) -> NodeId {
    let dx = TableRange::new("FE_D10", 0, 3, TableType::Fixed);
    let dy = TableRange::new("FE_D01", 0, 3, TableType::Fixed);
    let entry = |component, derivatives| {
        ModifiedTerminal::new(Terminal::Jacobian)
            .with_component(component)
            .with_local_derivatives(derivatives)
    };
    let j00 = piecewise(expr_ir, entry(0, vec![1, 0]), Some(dx.clone()));
    let j11 = piecewise(expr_ir, entry(3, vec![0, 1]), Some(dy.clone()));
    let j01 = piecewise(expr_ir, entry(1, vec![0, 1]), Some(dy));
    let j10 = piecewise(expr_ir, entry(2, vec![1, 0]), Some(dx));

    let diagonal = operator(expr_ir, Operator::Product, vec![j00, j11], Partition::Piecewise);
    let off_diagonal = operator(expr_ir, Operator::Product, vec![j01, j10], Partition::Piecewise);
    let minus_one = piecewise(expr_ir, ModifiedTerminal::new(Terminal::FloatValue(-1.0)), None);
    let negated = operator(expr_ir, Operator::Product, vec![minus_one, off_diagonal], Partition::Piecewise);
    let det = operator(expr_ir, Operator::Sum, vec![diagonal, negated], Partition::Piecewise);
    operator(expr_ir, Operator::Abs, vec![det], Partition::Piecewise)
}

/// The IR of `int w u v dx` for P1 triangles.
fn weighted_mass_ir() -> IntegralIr {
    let p1 = ElementDescriptor::lagrange(CellShape::Triangle, 1);
    let monomial = RawMonomial::new(1.0)
        .with_factor(MonomialFactor::coefficient(0, p1.clone()))
        .with_factor(MonomialFactor::argument(0, p1.clone()))
        .with_factor(MonomialFactor::argument(1, p1));
    let transformed = transform_monomial(&monomial, &ReferenceElementProvider).unwrap();
    // The coefficient is expanded in the basis functions, and the arguments span the tensor
    assert_eq!(transformed.extract_unique_indices(IndexRole::Secondary).len(), 1);
    let primary = transformed.extract_indices(IndexRole::Primary);
    let tensor_shape: Vec<_> = primary
        .iter()
        .map(|&handle| transformed.index(handle).range().len())
        .collect();

    let rule = ReferenceQuadrature::new()
        .create_rule(CellShape::Triangle, 3)
        .unwrap();
    let num_points = rule.num_points();

    let mut expr_ir = ExprIr::new();
    let det = push_jacobian_determinant(&mut expr_ir);

    let p1_range = TableRange::new("FE_P1", 0, 3, TableType::Varying);
    let weight = expr_ir.push_terminal(
        ModifiedTerminal::new(Terminal::QuadratureWeight),
        Some(Partition::Varying),
        None,
    );
    let w = expr_ir.push_terminal(
        ModifiedTerminal::new(Terminal::Coefficient { count: 0 }),
        Some(Partition::Varying),
        Some(p1_range.clone()),
    );
    let weighted = operator(&mut expr_ir, Operator::Product, vec![weight, w], Partition::Varying);
    let factor = operator(&mut expr_ir, Operator::Product, vec![weighted, det], Partition::Varying);

    let argument_indices = (0..2)
        .map(|number| expr_ir.push_argument(ModifiedTerminal::new(Terminal::Argument { number })))
        .collect();
    expr_ir.add_block_contribution(
        Partition::Varying,
        tensor_shape.iter().map(|&n| (0, n)).collect(),
        BlockContribution {
            argument_indices,
            factor,
            table_ranges: vec![p1_range.clone(), p1_range],
        },
    );
    expr_ir.insert_table("FE_P1", p1_table(&rule));
    expr_ir.insert_table("FE_D10", ElementTable::new([1, 1, 3], vec![-1.0, 1.0, 0.0]));
    expr_ir.insert_table("FE_D01", ElementTable::new([1, 1, 3], vec![-1.0, 0.0, 1.0]));
    expr_ir.need_weights = true;

    IntegralIr::new(IntegralType::Cell, tensor_shape)
        .with_quadrature_rule(rule)
        .with_expr_ir(num_points, expr_ir)
}

#[test]
fn tabulated_basis_integrates_reference_mass_matrix() {
    let ir = weighted_mass_ir();
    let (&num_points, expr_ir) = ir.expr_irs.iter().next().unwrap();
    let rule = &ir.quadrature_rules[&num_points];
    let table = &expr_ir.unique_tables["FE_P1"];

    let mass = DMatrix::from_fn(3, 3, |i, j| {
        (0..num_points)
            .map(|q| rule.weights()[q] * table.get(0, q, i).unwrap() * table.get(0, q, j).unwrap())
            .sum::<f64>()
    });
    let expected = DMatrix::from_fn(3, 3, |i, j| if i == j { 1.0 / 12.0 } else { 1.0 / 24.0 });
    assert_matrix_eq!(mass, expected, comp = abs, tol = 1e-14);
}

#[test]
fn primary_indices_address_the_element_tensor() {
    let ir = weighted_mass_ir();
    assert_eq!(ir.tensor_shape, vec![3, 3]);

    // Entry (i, j) of the tensor is stored at 3 * i + j
    let p1 = ElementDescriptor::lagrange(CellShape::Triangle, 1);
    let monomial = RawMonomial::new(1.0)
        .with_factor(MonomialFactor::argument(0, p1.clone()))
        .with_factor(MonomialFactor::argument(1, p1));
    let transformed = transform_monomial(&monomial, &ReferenceElementProvider).unwrap();
    let primary = transformed.extract_indices(IndexRole::Primary);
    let values = [2, 1];
    let bindings = IndexBindings::new().with_primary(&values);
    let position: Vec<_> = primary
        .iter()
        .map(|&handle| transformed.index(handle).evaluate(&bindings).unwrap())
        .collect();
    assert_eq!(position, vec![2, 1]);
    assert_eq!(position[0] * ir.tensor_shape[1] + position[1], 7);
}

#[test]
fn weighted_mass_c_kernel() {
    let ir = weighted_mass_ir();
    let backend = CBackend::new(IntegralType::Cell, BackendOptions::new(2, 2));
    let generated = generate_integral(&ir, &backend, GeneratorOptions::default()).unwrap();
    let code = backend.format_statement(&generated.body);

    let expected_snippets = [
        "static const double weights4[4] = {",
        "static const double FE_D01[1][1][3] = {{{-1.0, 0.0, 1.0}}};",
        "static const double FE_D10[1][1][3] = {{{-1.0, 1.0, 0.0}}};",
        "memset(A, 0, 9 * sizeof(*A));",
        "// Unstructured piecewise computations\ndouble J_c0_d10 = 0.0;",
        "for (int ic = 0; ic < 3; ++ic)\n    J_c0_d10 += coordinate_dofs[2 * ic] * FE_D10[0][0][ic];",
        "for (int ic = 0; ic < 3; ++ic)\n    J_c3_d01 += coordinate_dofs[2 * ic + 1] * FE_D01[0][0][ic];",
        "double sp4[5];",
        "sp4[0] = J_c0_d10 * J_c3_d01;",
        "sp4[1] = J_c1_d01 * J_c2_d10;",
        "sp4[2] = -1.0 * sp4[1];",
        "sp4[3] = sp4[0] + sp4[2];",
        "sp4[4] = std::abs(sp4[3]);",
        "for (int iq = 0; iq < 4; ++iq)\n{",
        "    double w0_c0 = 0.0;",
        "    for (int ic = 0; ic < 3; ++ic)\n        w0_c0 += w[0][ic] * FE_P1[0][iq][ic];",
        "    sv4[0] = weights4[iq] * w0_c0;",
        "    sv4[1] = sv4[0] * sp4[4];",
        "            A[3 * ia0 + ia1] += sv4[1] * FE_P1[0][iq][ia0] * FE_P1[0][iq][ia1];",
    ];
    for snippet in expected_snippets {
        assert!(code.contains(snippet), "missing {snippet:?} in\n{code}");
    }

    let used: Vec<_> = generated.used_operators.iter().copied().collect();
    assert_eq!(used, vec!["abs", "product", "sum"]);
    assert_eq!(
        CBackend::includes(used.iter().copied()),
        vec!["#include <cmath>", "#include <cstring>"]
    );
}

#[test]
fn weighted_mass_rust_kernel() {
    let ir = weighted_mass_ir();
    let backend = RustBackend::new(IntegralType::Cell, BackendOptions::new(2, 2));
    let generated = generate_integral(&ir, &backend, GeneratorOptions::default()).unwrap();
    let code = backend.format_statement(&generated.body);

    let expected_snippets = [
        "static weights4: [f64; 4] = [",
        "static FE_D10: [[[f64; 3]; 1]; 1] = [[[-1.0, 1.0, 0.0]]];",
        "A[..9].fill(0.0);",
        "let mut J_c0_d10: f64 = 0.0;",
        "let mut sp4: [f64; 5] = [0.0; 5];",
        "sp4[4] = sp4[3].abs();",
        "for iq in 0..4 {",
        "    let mut w0_c0: f64 = 0.0;",
        "    for ic in 0..3 {\n        w0_c0 += w[0][ic] * FE_P1[0][iq][ic];\n    }",
        "            A[3 * ia0 + ia1] += sv4[1] * FE_P1[0][iq][ia0] * FE_P1[0][iq][ia1];",
    ];
    for snippet in expected_snippets {
        assert!(code.contains(snippet), "missing {snippet:?} in\n{code}");
    }
    assert!(RustBackend::required_crates(generated.used_operators.iter().copied()).is_empty());
}
