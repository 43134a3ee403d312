use formgen::error::CodegenError;
use formgen::ir::{
    BlockContribution, ElementTable, ExprIr, ExprNode, IntegralIr, ModifiedTerminal, Operator, Partition, TableRange,
    TableType, Terminal,
};
use formgen::monomial::IntegralType;
use formgen::nalgebra::DMatrix;
use formgen::quadrature::QuadratureRule;

fn float(value: f64) -> ModifiedTerminal {
    ModifiedTerminal::new(Terminal::FloatValue(value))
}

#[test]
fn operators_require_matching_operand_count() {
    let mut expr_ir = ExprIr::new();
    let a = expr_ir.push_terminal(float(1.0), None, None);
    assert!(matches!(
        expr_ir.push_operator(Operator::Sum, vec![a], None),
        Err(CodegenError::MalformedIr(_))
    ));
    assert!(matches!(
        expr_ir.push_operator(Operator::Conditional, vec![a, a], None),
        Err(CodegenError::MalformedIr(_))
    ));
    assert_eq!(expr_ir.graph.len(), 1);
    assert_eq!(expr_ir.partitions.len(), 1);
}

#[test]
fn operands_must_precede_operators() {
    let mut expr_ir = ExprIr::new();
    let a = expr_ir.push_terminal(float(1.0), None, None);
    let sqrt = expr_ir.push_operator(Operator::Sqrt, vec![a], None).unwrap();
    assert_eq!(
        expr_ir.graph.get(sqrt),
        Some(&ExprNode::Operator {
            op: Operator::Sqrt,
            operands: vec![a]
        })
    );

    let mut other = ExprIr::new();
    other.push_terminal(float(1.0), None, None);
    assert!(matches!(
        other.push_operator(Operator::Product, vec![a, sqrt], None),
        Err(CodegenError::MalformedIr(_))
    ));
}

#[test]
fn operator_metadata() {
    assert_eq!(Operator::Atan2.name(), "atan_2");
    assert_eq!(Operator::Conditional.arity(), 3);
    assert_eq!(Operator::NotCondition.arity(), 1);
    assert!(Operator::Le.is_condition());
    assert!(!Operator::Conditional.is_condition());
    assert!(!Operator::Power.is_condition());
}

#[test]
fn literal_ones_are_detected() {
    assert!(float(1.0).is_literal_one());
    assert!(ModifiedTerminal::new(Terminal::IntValue(1)).is_literal_one());
    assert!(!float(2.0).is_literal_one());
    assert!(!float(1.0)
        .with_local_derivatives(vec![1, 0])
        .is_literal_one());
    assert!(!ModifiedTerminal::new(Terminal::CellVolume).is_literal_one());
}

#[test]
fn partition_nodes_are_filtered_in_order() {
    let mut expr_ir = ExprIr::new();
    let a = expr_ir.push_terminal(float(1.0), Some(Partition::Piecewise), None);
    let b = expr_ir.push_terminal(
        ModifiedTerminal::new(Terminal::QuadratureWeight),
        Some(Partition::Varying),
        None,
    );
    let _unused = expr_ir.push_terminal(float(3.0), None, None);
    let c = expr_ir
        .push_operator(Operator::Product, vec![a, b], Some(Partition::Varying))
        .unwrap();
    let d = expr_ir
        .push_operator(Operator::Exp, vec![a], Some(Partition::Piecewise))
        .unwrap();

    let piecewise: Vec<_> = expr_ir
        .partition_nodes(Partition::Piecewise)
        .map(|(id, _)| id)
        .collect();
    let varying: Vec<_> = expr_ir
        .partition_nodes(Partition::Varying)
        .map(|(id, _)| id)
        .collect();
    assert_eq!(piecewise, vec![a, d]);
    assert_eq!(varying, vec![b, c]);
}

#[test]
fn validation_detects_inconsistent_node_data() {
    let mut expr_ir = ExprIr::new();
    expr_ir.push_terminal(float(1.0), None, None);
    assert!(expr_ir.validate().is_ok());

    expr_ir.partitions.push(None);
    assert!(matches!(expr_ir.validate(), Err(CodegenError::MalformedIr(_))));
}

#[test]
fn element_tables_are_row_major() {
    let table = ElementTable::from_fn([2, 3, 4], |e, q, d| (100 * e + 10 * q + d) as f64);
    assert_eq!(table.shape(), [2, 3, 4]);
    assert_eq!(table.values().len(), 24);
    assert_eq!(table.get(1, 2, 3), Some(123.0));
    assert_eq!(table.get(0, 1, 0), Some(10.0));
    assert_eq!(table.get(2, 0, 0), None);
    assert_eq!(table, ElementTable::new([2, 3, 4], table.values().to_vec()));
}

#[test]
#[should_panic]
fn element_table_shape_must_match_values() {
    ElementTable::new([1, 2, 3], vec![0.0; 5]);
}

#[test]
fn table_types_and_ranges() {
    assert!(TableType::Varying.is_varying());
    assert!(TableType::Uniform.is_varying());
    assert!(TableType::Quadrature.is_varying());
    assert!(!TableType::Piecewise.is_varying());
    assert!(!TableType::Fixed.is_varying());

    let range = TableRange::new("FE", 2, 5, TableType::Fixed);
    assert_eq!(range.len(), 3);
    assert!(!range.is_empty());
    assert!(TableRange::new("FE", 2, 2, TableType::Zeros).is_empty());
}

#[test]
fn block_contributions_are_grouped_and_sorted() {
    let mut expr_ir = ExprIr::new();
    let one = expr_ir.push_terminal(float(1.0), Some(Partition::Piecewise), None);
    let contribution = |begin| BlockContribution {
        argument_indices: vec![0],
        factor: one,
        table_ranges: vec![TableRange::new("FE", begin, begin + 2, TableType::Piecewise)],
    };

    for begin in [4, 0, 2, 0] {
        expr_ir.add_block_contribution(Partition::Piecewise, vec![(begin, begin + 2)], contribution(begin));
    }

    let blocks = expr_ir.block_contributions.get(Partition::Piecewise);
    let keys: Vec<_> = blocks.iter().map(|(block, _)| block.clone()).collect();
    assert_eq!(keys, vec![vec![(0, 2)], vec![(2, 4)], vec![(4, 6)]]);
    assert_eq!(blocks[0].1.len(), 2);
    assert!(expr_ir
        .block_contributions
        .get(Partition::Varying)
        .is_empty());
}

#[test]
fn integral_ir_survives_json_round_trip() {
    let mut expr_ir = ExprIr::new();
    let weight = expr_ir.push_terminal(
        ModifiedTerminal::new(Terminal::QuadratureWeight),
        Some(Partition::Varying),
        None,
    );
    let coefficient = expr_ir.push_terminal(
        ModifiedTerminal::new(Terminal::Coefficient { count: 0 }).with_local_derivatives(vec![1, 0]),
        Some(Partition::Varying),
        Some(TableRange::new("FE_D10", 0, 3, TableType::Varying)),
    );
    let factor = expr_ir
        .push_operator(Operator::Product, vec![weight, coefficient], Some(Partition::Varying))
        .unwrap();
    let argument = expr_ir.push_argument(ModifiedTerminal::new(Terminal::Argument { number: 0 }));
    expr_ir.add_block_contribution(
        Partition::Varying,
        vec![(0, 3)],
        BlockContribution {
            argument_indices: vec![argument],
            factor,
            table_ranges: vec![TableRange::new("FE_P1", 0, 3, TableType::Varying)],
        },
    );
    expr_ir.insert_table("FE_P1", ElementTable::new([1, 2, 3], vec![0.5, 0.25, 0.25, 0.25, 0.5, 0.25]));
    expr_ir.insert_table("FE_D10", ElementTable::new([1, 2, 3], vec![-1.0, 1.0, 0.0, -1.0, 1.0, 0.0]));
    expr_ir.need_weights = true;

    let rule = QuadratureRule::new(DMatrix::from_element(2, 2, 0.25), vec![0.25, 0.25]);
    let ir = IntegralIr::new(IntegralType::Cell, vec![3])
        .with_quadrature_rule(rule)
        .with_expr_ir(2, expr_ir);
    assert_eq!(ir.tensor_size(), 3);

    let json = serde_json::to_string(&ir).unwrap();
    let deserialized: IntegralIr = serde_json::from_str(&json).unwrap();
    assert_eq!(deserialized, ir);
}
