use formgen::backend::cnodes::{format_float, BinOp, CExpr, CStatement, Dialect, Renderer};
use formgen::backend::{BackendOptions, CBackend, RustBackend};
use formgen::codegen::{Backend, Language};
use formgen::error::CodegenError;
use formgen::ir::{ModifiedTerminal, Operator, TableRange, TableType, Terminal};
use formgen::monomial::{IntegralType, Restriction};

fn sym(name: &str) -> CExpr {
    CExpr::symbol(name)
}

fn c() -> Renderer {
    Renderer::new(Dialect::C, 16)
}

fn rust() -> Renderer {
    Renderer::new(Dialect::Rust, 16)
}

fn c_backend(integral_type: IntegralType) -> CBackend {
    CBackend::new(integral_type, BackendOptions::new(2, 2))
}

fn rust_backend(integral_type: IntegralType) -> RustBackend {
    RustBackend::new(integral_type, BackendOptions::new(2, 2))
}

#[test]
fn expressions_are_parenthesized_by_precedence() {
    let sum = CExpr::Sum(vec![sym("a"), sym("b")]);
    let product = CExpr::Product(vec![sym("b"), sym("c")]);

    let expr = CExpr::Product(vec![sum.clone(), sym("c")]);
    assert_eq!(c().expr(&expr), "(a + b) * c");

    let expr = CExpr::Sum(vec![sym("a"), product.clone()]);
    assert_eq!(c().expr(&expr), "a + b * c");

    let expr = CExpr::Difference(Box::new(sym("a")), Box::new(sum.clone()));
    assert_eq!(c().expr(&expr), "a - (a + b)");

    let expr = CExpr::Difference(Box::new(sum), Box::new(sym("c")));
    assert_eq!(c().expr(&expr), "a + b - c");

    let expr = CExpr::Division(Box::new(sym("a")), Box::new(product));
    assert_eq!(c().expr(&expr), "a / (b * c)");

    let expr = CExpr::Product(vec![CExpr::LiteralFloat(-2.0), sym("a")]);
    assert_eq!(c().expr(&expr), "-2.0 * a");
}

#[test]
fn conditions_render_in_both_dialects() {
    let less = CExpr::binop(BinOp::Lt, sym("a"), sym("b"));
    let both = CExpr::binop(BinOp::And, less.clone(), CExpr::binop(BinOp::Ne, sym("a"), CExpr::LiteralFloat(0.0)));
    assert_eq!(c().expr(&both), "a < b && a != 0.0");

    let negated = CExpr::Not(Box::new(both));
    assert_eq!(c().expr(&negated), "!(a < b && a != 0.0)");

    let either = CExpr::binop(BinOp::Or, negated, sym("c"));
    assert_eq!(c().expr(&CExpr::binop(BinOp::And, either, sym("d"))), "(!(a < b && a != 0.0) || c) && d");

    let conditional = CExpr::Conditional {
        condition: Box::new(less),
        true_value: Box::new(sym("a")),
        false_value: Box::new(sym("b")),
    };
    assert_eq!(c().expr(&conditional), "a < b ? a : b");
    assert_eq!(rust().expr(&conditional), "if a < b { a } else { b }");

    let scaled = CExpr::Product(vec![conditional, sym("c")]);
    assert_eq!(c().expr(&scaled), "(a < b ? a : b) * c");
}

#[test]
fn float_literals_are_valid_in_both_dialects() {
    assert_eq!(c().float(3.0), "3.0");
    assert_eq!(c().float(f64::NAN), "NAN");
    assert_eq!(rust().float(f64::NEG_INFINITY), "-f64::INFINITY");
    assert_eq!(Renderer::new(Dialect::C, 3).float(2.0 / 3.0), "0.667");
    assert_eq!(format_float(123456.0, 16), "123456.0");
    assert_eq!(format_float(-1.5e-7, 16), "-1.5e-7");
}

#[test]
fn rust_method_calls_suffix_float_receivers() {
    let sqrt = CExpr::method_call(CExpr::LiteralFloat(2.0), "sqrt", vec![]);
    assert_eq!(rust().expr(&sqrt), "2.0_f64.sqrt()");

    let abs = CExpr::method_call(CExpr::LiteralFloat(-2.0), "abs", vec![]);
    assert_eq!(rust().expr(&abs), "(-2.0).abs()");

    let pow = CExpr::method_call(CExpr::Sum(vec![sym("a"), sym("b")]), "powf", vec![sym("c")]);
    assert_eq!(rust().expr(&pow), "(a + b).powf(c)");
}

#[test]
fn statements_render_as_blocks() {
    let body = vec![
        CStatement::VariableDecl {
            name: "t".to_string(),
            value: CExpr::LiteralFloat(0.0),
        },
        CStatement::AssignAdd {
            target: sym("t"),
            value: sym("x"),
        },
    ];
    let stmt = CStatement::ForRange {
        index: sym("i"),
        begin: 1,
        end: 4,
        body,
    };
    assert_eq!(
        c().statement(&stmt),
        "for (int i = 1; i < 4; ++i)\n{\n    double t = 0.0;\n    t += x;\n}"
    );
    assert_eq!(
        rust().statement(&stmt),
        "for i in 1..4 {\n    let mut t: f64 = 0.0;\n    t += x;\n}"
    );

    let fill = CStatement::ZeroFill {
        array: sym("A"),
        size: 6,
    };
    assert_eq!(c().statement(&fill), "memset(A, 0, 6 * sizeof(*A));");
    assert_eq!(rust().statement(&fill), "A[..6].fill(0.0);");
}

#[test]
fn c_operators_translate_to_std_and_boost() {
    let backend = c_backend(IntegralType::Cell);
    let render = |op, operands| backend.renderer().expr(&backend.translate_operator(op, operands).unwrap());

    assert_eq!(render(Operator::Power, vec![sym("x"), CExpr::LiteralFloat(2.0)]), "std::pow(x, 2.0)");
    assert_eq!(render(Operator::Ln, vec![sym("x")]), "std::log(x)");
    assert_eq!(render(Operator::MinValue, vec![sym("x"), sym("y")]), "std::fmin(x, y)");
    assert_eq!(render(Operator::BesselY, vec![sym("nu"), sym("x")]), "boost::math::cyl_neumann(nu, x)");
    assert_eq!(render(Operator::Ge, vec![sym("x"), sym("y")]), "x >= y");
    assert_eq!(render(Operator::Division, vec![sym("x"), sym("y")]), "x / y");
}

#[test]
fn rust_operators_translate_to_methods_and_libm() {
    let backend = rust_backend(IntegralType::Cell);
    let render = |op, operands| backend.renderer().expr(&backend.translate_operator(op, operands).unwrap());

    assert_eq!(render(Operator::Power, vec![sym("x"), CExpr::LiteralFloat(2.0)]), "x.powf(2.0)");
    assert_eq!(render(Operator::Ln, vec![sym("x")]), "x.ln()");
    assert_eq!(render(Operator::Atan2, vec![sym("y"), sym("x")]), "y.atan2(x)");
    assert_eq!(render(Operator::MaxValue, vec![sym("x"), sym("y")]), "x.max(y)");
    assert_eq!(render(Operator::Erf, vec![sym("x")]), "libm::erf(x)");
    assert_eq!(render(Operator::BesselJ, vec![sym("nu"), sym("x")]), "libm::jn(nu as i32, x)");
    let nu = CExpr::Sum(vec![sym("n"), CExpr::LiteralFloat(1.0)]);
    assert_eq!(render(Operator::BesselY, vec![nu, sym("x")]), "libm::yn((n + 1.0) as i32, x)");
}

#[test]
fn modified_bessel_functions_are_unsupported_in_rust() {
    let backend = rust_backend(IntegralType::Cell);
    for (op, name) in [(Operator::BesselI, "bessel_i"), (Operator::BesselK, "bessel_k")] {
        assert_eq!(
            backend.translate_operator(op, vec![sym("nu"), sym("x")]),
            Err(CodegenError::UnsupportedOperator {
                operator: name,
                backend: "Rust"
            })
        );
    }
}

#[test]
fn operand_count_is_checked() {
    let backend = c_backend(IntegralType::Cell);
    assert!(matches!(
        backend.translate_operator(Operator::Sqrt, vec![]),
        Err(CodegenError::MalformedIr(_))
    ));
    assert!(matches!(
        rust_backend(IntegralType::Cell).translate_operator(Operator::Conditional, vec![sym("a")]),
        Err(CodegenError::MalformedIr(_))
    ));
}

#[test]
fn includes_follow_used_operators() {
    assert_eq!(CBackend::includes(["sum", "product"]), vec!["#include <cstring>"]);
    assert_eq!(
        CBackend::includes(["power", "sum"]),
        vec!["#include <cmath>", "#include <cstring>"]
    );
    assert_eq!(
        CBackend::includes(["bessel_k", "sqrt"]),
        vec![
            "#include <boost/math/special_functions.hpp>",
            "#include <cmath>",
            "#include <cstring>"
        ]
    );
}

#[test]
fn required_crates_follow_used_operators() {
    assert!(RustBackend::required_crates(["sqrt", "power"]).is_empty());
    assert_eq!(RustBackend::required_crates(["erf"]), vec!["libm"]);
    assert_eq!(RustBackend::required_crates(["bessel_j", "bessel_y"]), vec!["libm"]);
}

#[test]
fn argument_access_uses_entity_and_point() {
    let argument = ModifiedTerminal::new(Terminal::Argument { number: 1 });
    let range = TableRange::new("FE3", 3, 6, TableType::Varying);

    let backend = c_backend(IntegralType::ExteriorFacet);
    let access = backend.terminal_access(&argument, Some(&range), 4).unwrap();
    assert_eq!(backend.renderer().expr(&access), "FE3[facet][iq][ia1 - 3]");

    let uniform = TableRange::new("FE3", 0, 3, TableType::Uniform);
    let access = backend.terminal_access(&argument, Some(&uniform), 4).unwrap();
    assert_eq!(backend.renderer().expr(&access), "FE3[0][iq][ia1]");

    let backend = c_backend(IntegralType::InteriorFacet);
    let restricted = argument.clone().with_restriction(Restriction::Minus);
    let fixed = TableRange::new("FE3", 0, 3, TableType::Piecewise);
    let access = backend.terminal_access(&restricted, Some(&fixed), 4).unwrap();
    assert_eq!(backend.renderer().expr(&access), "FE3[facet_1][0][ia1]");

    assert!(matches!(
        backend.terminal_access(&argument, None, 4),
        Err(CodegenError::MalformedIr(_))
    ));
}

#[test]
fn coefficients_are_expanded_in_basis_functions() {
    let backend = c_backend(IntegralType::Cell);
    let coefficient = ModifiedTerminal::new(Terminal::Coefficient { count: 0 });
    let range = TableRange::new("FE_P1", 0, 3, TableType::Varying);

    let access = backend.terminal_access(&coefficient, Some(&range), 2).unwrap();
    assert_eq!(access, CExpr::symbol("w0_c0"));
    let definitions = backend
        .terminal_definitions(&coefficient, Some(&range), 2, &access)
        .unwrap();
    let code: Vec<_> = definitions
        .iter()
        .map(|d| backend.format_statement(d))
        .collect();
    assert_eq!(
        code,
        vec![
            "double w0_c0 = 0.0;",
            "for (int ic = 0; ic < 3; ++ic)\n    w0_c0 += w[0][ic] * FE_P1[0][iq][ic];"
        ]
    );

    let backend = rust_backend(IntegralType::InteriorFacet);
    let derivative = ModifiedTerminal::new(Terminal::Coefficient { count: 1 })
        .with_component(1)
        .with_local_derivatives(vec![1, 0])
        .with_restriction(Restriction::Minus);
    let range = TableRange::new("FE_V", 3, 6, TableType::Varying);
    let access = backend.terminal_access(&derivative, Some(&range), 2).unwrap();
    assert_eq!(access, CExpr::symbol("w1_c1_d10_r1"));
    let definitions = backend
        .terminal_definitions(&derivative, Some(&range), 2, &access)
        .unwrap();
    assert_eq!(
        backend.format_statement(&definitions[1]),
        "for ic in 0..3 {\n    w1_c1_d10_r1 += w[1][ic + 3] * FE_V[facet_1][iq][ic];\n}"
    );
}

#[test]
fn coefficients_without_expansion_are_read_directly() {
    let backend = c_backend(IntegralType::Cell);
    let render = |terminal: &ModifiedTerminal, range: Option<&TableRange>| {
        let access = backend.terminal_access(terminal, range, 2).unwrap();
        assert!(backend
            .terminal_definitions(terminal, range, 2, &access)
            .unwrap()
            .is_empty());
        backend.renderer().expr(&access)
    };

    let constant = ModifiedTerminal::new(Terminal::Coefficient { count: 2 }).with_component(1);
    assert_eq!(render(&constant, None), "w[2][1]");

    let real = TableRange::new("FE_R", 4, 5, TableType::Ones);
    assert_eq!(render(&constant, Some(&real)), "w[2][4]");

    let quadrature = TableRange::new("FE_Q", 6, 8, TableType::Quadrature);
    assert_eq!(render(&constant, Some(&quadrature)), "w[2][iq + 6]");

    let zeros = TableRange::new("FE_Z", 0, 3, TableType::Zeros);
    assert_eq!(render(&constant, Some(&zeros)), "0.0");
}

#[test]
fn geometry_is_computed_from_coordinate_dofs() {
    let backend = c_backend(IntegralType::Cell);
    let jacobian = ModifiedTerminal::new(Terminal::Jacobian)
        .with_component(3)
        .with_local_derivatives(vec![0, 1]);
    let range = TableRange::new("FE_J", 0, 3, TableType::Piecewise);
    let access = backend.terminal_access(&jacobian, Some(&range), 2).unwrap();
    assert_eq!(access, CExpr::symbol("J_c3_d01"));
    let definitions = backend
        .terminal_definitions(&jacobian, Some(&range), 2, &access)
        .unwrap();
    assert_eq!(
        backend.format_statement(&definitions[1]),
        "for (int ic = 0; ic < 3; ++ic)\n    J_c3_d01 += coordinate_dofs[2 * ic + 1] * FE_J[0][0][ic];"
    );

    let backend = c_backend(IntegralType::Vertex);
    let x = ModifiedTerminal::new(Terminal::SpatialCoordinate).with_component(1);
    let access = backend.terminal_access(&x, None, 1).unwrap();
    assert_eq!(backend.renderer().expr(&access), "coordinate_dofs[2 * vertex + 1]");
}

#[test]
fn facet_quantities_depend_on_integral_type() {
    let normal = ModifiedTerminal::new(Terminal::FacetNormal).with_component(1);

    let backend = c_backend(IntegralType::ExteriorFacet);
    let access = backend.terminal_access(&normal, None, 1).unwrap();
    assert_eq!(backend.renderer().expr(&access), "n[1]");

    let backend = c_backend(IntegralType::InteriorFacet);
    let access = backend
        .terminal_access(&normal.clone().with_restriction(Restriction::Plus), None, 1)
        .unwrap();
    assert_eq!(backend.renderer().expr(&access), "n_0[1]");
    let volume = ModifiedTerminal::new(Terminal::CellVolume).with_restriction(Restriction::Minus);
    let access = backend.terminal_access(&volume, None, 1).unwrap();
    assert_eq!(backend.renderer().expr(&access), "volume_1");

    let backend = c_backend(IntegralType::Cell);
    assert!(matches!(
        backend.terminal_access(&normal, None, 1),
        Err(CodegenError::MalformedIr(_))
    ));
}

#[test]
fn integer_literals_are_floats_in_rust() {
    let three = ModifiedTerminal::new(Terminal::IntValue(3));
    let c_backend = c_backend(IntegralType::Cell);
    let rust_backend = rust_backend(IntegralType::Cell);
    let c_access = c_backend.terminal_access(&three, None, 1).unwrap();
    let rust_access = rust_backend.terminal_access(&three, None, 1).unwrap();
    assert_eq!(c_backend.renderer().expr(&c_access), "3");
    assert_eq!(rust_backend.renderer().expr(&rust_access), "3.0");
}
