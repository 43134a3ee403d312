//! Assignment of summation roles to the indices of a transformed monomial.
use log::trace;

use crate::error::TransformError;
use crate::index::{IndexArena, IndexCounters, IndexHandle, IndexRole};

/// Determines the summation role of an index from the number of times it occurs inside and
/// outside of the integral.
///
/// Returns `None` if the index does not appear exactly twice in one of the admissible
/// patterns.
pub fn classify(num_internal: usize, num_external: usize) -> Option<IndexRole> {
    match (num_internal, num_external) {
        (1, 1) => Some(IndexRole::Secondary),
        (2, 0) => Some(IndexRole::Internal),
        (0, 2) => Some(IndexRole::External),
        _ => None,
    }
}

/// Classifies every unclassified index occurring in the internal or external footprint.
///
/// Occurrences are counted by handle, so distinct index records are never unified even if
/// they have equal ranges. Indices are visited in footprint order (internal first), and each
/// newly classified index receives the next id of its role from `counters`.
pub fn classify_indices(
    indices: &mut IndexArena,
    internal: &[IndexHandle],
    external: &[IndexHandle],
    counters: &mut IndexCounters,
) -> Result<(), TransformError> {
    for &handle in internal.iter().chain(external) {
        if indices[handle].is_classified() {
            continue;
        }

        let num_internal = internal.iter().filter(|&&h| h == handle).count();
        let num_external = external.iter().filter(|&&h| h == handle).count();
        let role = classify(num_internal, num_external).ok_or_else(|| TransformError::Contraction {
            range: indices[handle].range().to_vec(),
            num_internal,
            num_external,
        })?;
        let id = counters.next(role);
        trace!(
            "Index {} ({num_internal} internal, {num_external} external) classified as {role} with id {id}",
            handle.arena_index()
        );
        indices.get_mut(handle).classify(role, id);
    }
    Ok(())
}
