use formgen::index::{BindingError, IndexArena, IndexBindings, IndexCounters, IndexRole, MonomialIndex};
use proptest::prelude::*;

#[test]
fn fixed_index_evaluates_to_its_value() {
    let index = MonomialIndex::fixed(2);
    assert_eq!(index.evaluate(&IndexBindings::new()), Ok(2));
    assert_eq!(index.to_string(), "2");
}

#[test]
fn indices_evaluate_with_role_bindings() {
    let primary = MonomialIndex::primary(1, 0..3);
    let secondary = MonomialIndex::new(Some(IndexRole::Secondary), vec![0, 1], Some(0));
    let internal = MonomialIndex::new(Some(IndexRole::Internal), vec![0, 1], Some(1));
    let external = MonomialIndex::new(Some(IndexRole::External), vec![0, 1], Some(0));

    let primary_values = [4, 7];
    let secondary_values = [5];
    let internal_values = [0, 9];
    let external_values = [3];
    let bindings = IndexBindings::new()
        .with_primary(&primary_values)
        .with_secondary(&secondary_values)
        .with_internal(&internal_values)
        .with_external(&external_values);

    assert_eq!(primary.evaluate(&bindings), Ok(7));
    assert_eq!(secondary.evaluate(&bindings), Ok(5));
    assert_eq!(internal.evaluate(&bindings), Ok(9));
    assert_eq!(external.evaluate(&bindings), Ok(3));
}

#[test]
fn evaluation_without_binding_fails() {
    let secondary = MonomialIndex::new(Some(IndexRole::Secondary), vec![0, 1], Some(0));
    let values = [1];
    let bindings = IndexBindings::new().with_primary(&values);
    assert_eq!(
        secondary.evaluate(&bindings),
        Err(BindingError::MissingBinding(IndexRole::Secondary))
    );

    let unclassified = MonomialIndex::unclassified(0..3);
    assert_eq!(unclassified.evaluate(&bindings), Err(BindingError::Unclassified));

    let primary = MonomialIndex::primary(3, 0..3);
    assert_eq!(
        primary.evaluate(&bindings),
        Err(BindingError::OutOfBounds {
            role: IndexRole::Primary,
            id: 3,
            num_bound: 1
        })
    );
}

#[test]
fn binding_error_names_role() {
    let message = BindingError::MissingBinding(IndexRole::Internal).to_string();
    assert!(message.contains("internal"), "{message}");
}

#[test]
fn offset_arithmetic_leaves_operand_untouched() {
    let index = MonomialIndex::unclassified(0..3);
    let shifted = &index + 2;
    assert_eq!(shifted.range(), &[2, 3, 4]);
    assert_eq!(index.range(), &[0, 1, 2]);

    let back = &shifted - 2;
    assert_eq!(back, index);
}

#[test]
fn offset_arithmetic_rewrites_fixed_value() {
    let index = MonomialIndex::fixed(3);
    let local = &index - 2;
    assert_eq!(local.evaluate(&IndexBindings::new()), Ok(1));
    assert_eq!(index.evaluate(&IndexBindings::new()), Ok(3));
}

#[test]
#[should_panic]
fn subtracting_beyond_range_panics() {
    let _ = MonomialIndex::fixed(1) - 2;
}

#[test]
#[should_panic]
fn fixed_index_without_value_is_rejected() {
    MonomialIndex::new(Some(IndexRole::Fixed), vec![], None);
}

#[test]
#[should_panic]
fn fixed_index_with_several_values_is_rejected() {
    MonomialIndex::new(Some(IndexRole::Fixed), vec![1, 2], None);
}

#[test]
fn display_uses_role_prefix() {
    let cases = [
        (IndexRole::Primary, "i_2"),
        (IndexRole::Secondary, "a_2"),
        (IndexRole::Internal, "g_2"),
        (IndexRole::External, "b_2"),
    ];
    for (role, expected) in cases {
        let index = MonomialIndex::new(Some(role), vec![0, 1], Some(2));
        assert_eq!(index.to_string(), expected);
    }
    assert_eq!(MonomialIndex::unclassified(0..2).to_string(), "?");
}

#[test]
fn indices_are_ordered_by_id() {
    let mut indices = vec![
        MonomialIndex::new(Some(IndexRole::Internal), vec![0], Some(2)),
        MonomialIndex::new(Some(IndexRole::Secondary), vec![0], Some(0)),
        MonomialIndex::new(Some(IndexRole::External), vec![0], Some(1)),
    ];
    indices.sort();
    let ids: Vec<_> = indices.iter().map(|i| i.id()).collect();
    assert_eq!(ids, vec![Some(0), Some(1), Some(2)]);
}

#[test]
fn arena_distinguishes_equal_records() {
    let mut arena = IndexArena::new();
    let a = arena.insert(MonomialIndex::fixed(1));
    let b = arena.insert(MonomialIndex::fixed(1));
    assert_ne!(a, b);
    assert_eq!(arena[a], arena[b]);
    assert_eq!(arena.len(), 2);
    assert_eq!(arena.format_list(&[a, b]), "1, 1");
}

#[test]
fn counters_start_at_zero_and_are_independent() {
    let mut counters = IndexCounters::new();
    assert_eq!(counters.next(IndexRole::Secondary), 0);
    assert_eq!(counters.next(IndexRole::Secondary), 1);
    assert_eq!(counters.next(IndexRole::Internal), 0);
    assert_eq!(counters.next(IndexRole::External), 0);
    assert_eq!(counters.count(IndexRole::Secondary), 2);

    let mut fresh = IndexCounters::new();
    assert_eq!(fresh.next(IndexRole::Secondary), 0);
}

#[test]
#[should_panic]
fn counters_do_not_number_primary_indices() {
    IndexCounters::new().next(IndexRole::Primary);
}

proptest! {
    #[test]
    fn add_then_subtract_is_identity(start in 0..10usize, len in 1..5usize, offset in 0..10usize) {
        let index = MonomialIndex::unclassified(start..start + len);
        let shifted = &index + offset;
        prop_assert!(shifted.range().iter().zip(index.range()).all(|(s, i)| *s == i + offset));
        prop_assert_eq!(shifted - offset, index);
    }
}
