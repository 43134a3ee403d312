//! Symbolic indices appearing in transformed monomials.
//!
//! A [`MonomialIndex`] is a role-tagged index with an ordered value range. Indices are
//! stored in an [`IndexArena`] and referred to by [`IndexHandle`], so that two occurrences
//! denote the same summation index exactly when they share a handle. In particular, two
//! fixed indices with the same value are distinct unless they share a handle.
use std::cmp::Ordering;
use std::error::Error;
use std::fmt;
use std::ops::{Add, Index, Sub};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// The role of an index in a transformed monomial.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IndexRole {
    /// A literal integer index.
    Fixed,
    /// The basis function index of an argument of the form.
    Primary,
    /// An index appearing both inside and outside of the integral.
    Secondary,
    /// An index appearing only inside the integral.
    Internal,
    /// An index appearing only outside the integral.
    External,
}

impl IndexRole {
    /// The prefix used when displaying indices of this role.
    pub fn prefix(&self) -> &'static str {
        match self {
            IndexRole::Fixed => "",
            IndexRole::Primary => "i",
            IndexRole::Secondary => "a",
            IndexRole::Internal => "g",
            IndexRole::External => "b",
        }
    }
}

impl fmt::Display for IndexRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IndexRole::Fixed => "fixed",
            IndexRole::Primary => "primary",
            IndexRole::Secondary => "secondary",
            IndexRole::Internal => "internal",
            IndexRole::External => "external",
        };
        write!(f, "{name}")
    }
}

/// Error returned when an index cannot be evaluated with the given bindings.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BindingError {
    /// No values were bound for indices of the given role.
    MissingBinding(IndexRole),
    /// The index has not yet been assigned a role.
    Unclassified,
    /// The index id exceeds the number of values bound for its role.
    OutOfBounds { role: IndexRole, id: usize, num_bound: usize },
}

impl fmt::Display for BindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingBinding(role) => write!(f, "Missing index values for {role} indices"),
            Self::Unclassified => write!(f, "Cannot evaluate an index that has not been classified"),
            Self::OutOfBounds { role, id, num_bound } => write!(
                f,
                "No value bound for {role} index {id} ({num_bound} value(s) bound)"
            ),
        }
    }
}

impl Error for BindingError {}

/// Values bound to the non-fixed index roles, indexed by index id.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct IndexBindings<'a> {
    pub primary: Option<&'a [usize]>,
    pub secondary: Option<&'a [usize]>,
    pub internal: Option<&'a [usize]>,
    pub external: Option<&'a [usize]>,
}

impl<'a> IndexBindings<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_primary(self, values: &'a [usize]) -> Self {
        Self {
            primary: Some(values),
            ..self
        }
    }

    pub fn with_secondary(self, values: &'a [usize]) -> Self {
        Self {
            secondary: Some(values),
            ..self
        }
    }

    pub fn with_internal(self, values: &'a [usize]) -> Self {
        Self {
            internal: Some(values),
            ..self
        }
    }

    pub fn with_external(self, values: &'a [usize]) -> Self {
        Self {
            external: Some(values),
            ..self
        }
    }

    fn values(&self, role: IndexRole) -> Option<&'a [usize]> {
        match role {
            IndexRole::Fixed => None,
            IndexRole::Primary => self.primary,
            IndexRole::Secondary => self.secondary,
            IndexRole::Internal => self.internal,
            IndexRole::External => self.external,
        }
    }
}

/// A symbolic index with a role, an ordered value range and a per-role id.
///
/// An index without a role is *unclassified*: it has been allocated during monomial
/// transformation, but its summation role has not yet been determined.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MonomialIndex {
    role: Option<IndexRole>,
    range: Vec<usize>,
    id: Option<usize>,
}

impl MonomialIndex {
    /// # Panics
    ///
    /// Panics if a fixed index is not given exactly one value.
    pub fn new(role: Option<IndexRole>, range: Vec<usize>, id: Option<usize>) -> Self {
        assert!(
            role != Some(IndexRole::Fixed) || range.len() == 1,
            "A fixed index holds exactly one value, but got range {range:?}"
        );
        Self { role, range, id }
    }

    /// A fixed index with the given value.
    pub fn fixed(value: usize) -> Self {
        Self::new(Some(IndexRole::Fixed), vec![value], None)
    }

    /// A primary index, i.e. the basis function index of argument number `id`.
    pub fn primary(id: usize, range: impl IntoIterator<Item = usize>) -> Self {
        Self::new(Some(IndexRole::Primary), range.into_iter().collect(), Some(id))
    }

    /// An index whose role is still to be determined.
    pub fn unclassified(range: impl IntoIterator<Item = usize>) -> Self {
        Self::new(None, range.into_iter().collect(), None)
    }

    pub fn role(&self) -> Option<IndexRole> {
        self.role
    }

    pub fn range(&self) -> &[usize] {
        &self.range
    }

    pub fn id(&self) -> Option<usize> {
        self.id
    }

    pub fn is_fixed(&self) -> bool {
        self.role == Some(IndexRole::Fixed)
    }

    pub fn is_classified(&self) -> bool {
        self.role.is_some()
    }

    /// Assigns a role and id to the index.
    pub(crate) fn classify(&mut self, role: IndexRole, id: usize) {
        self.role = Some(role);
        self.id = Some(id);
    }

    /// Evaluates the index at the given bindings.
    ///
    /// Fixed indices evaluate to their value. Any other index looks up its id in the values
    /// bound to its role.
    pub fn evaluate(&self, bindings: &IndexBindings) -> Result<usize, BindingError> {
        let role = self.role.ok_or(BindingError::Unclassified)?;
        if role == IndexRole::Fixed {
            return Ok(self.range[0]);
        }
        let values = bindings
            .values(role)
            .ok_or(BindingError::MissingBinding(role))?;
        let id = self.id.ok_or(BindingError::Unclassified)?;
        values
            .get(id)
            .copied()
            .ok_or(BindingError::OutOfBounds {
                role,
                id,
                num_bound: values.len(),
            })
    }
}

impl Add<usize> for &MonomialIndex {
    type Output = MonomialIndex;

    fn add(self, offset: usize) -> MonomialIndex {
        MonomialIndex {
            role: self.role,
            range: self.range.iter().map(|i| i + offset).collect(),
            id: self.id,
        }
    }
}

impl Add<usize> for MonomialIndex {
    type Output = MonomialIndex;

    fn add(self, offset: usize) -> MonomialIndex {
        &self + offset
    }
}

/// Subtracts an offset from every value of the range.
///
/// # Panics
///
/// Panics if the offset exceeds the smallest value in the range.
impl Sub<usize> for &MonomialIndex {
    type Output = MonomialIndex;

    fn sub(self, offset: usize) -> MonomialIndex {
        assert!(
            self.range.iter().all(|&i| i >= offset),
            "Index offset {offset} exceeds the values of index range {:?}",
            self.range
        );
        MonomialIndex {
            role: self.role,
            range: self.range.iter().map(|&i| i - offset).collect(),
            id: self.id,
        }
    }
}

impl Sub<usize> for MonomialIndex {
    type Output = MonomialIndex;

    fn sub(self, offset: usize) -> MonomialIndex {
        &self - offset
    }
}

/// Indices are ordered by id. Ties are broken by role and range, so that the order is total.
impl Ord for MonomialIndex {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id
            .cmp(&other.id)
            .then_with(|| self.role.cmp(&other.role))
            .then_with(|| self.range.cmp(&other.range))
    }
}

impl PartialOrd for MonomialIndex {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for MonomialIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.role, self.id) {
            (Some(IndexRole::Fixed), _) => write!(f, "{}", self.range[0]),
            (Some(role), Some(id)) => write!(f, "{}_{}", role.prefix(), id),
            _ => write!(f, "?"),
        }
    }
}

/// Handle to an index stored in an [`IndexArena`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IndexHandle(usize);

impl IndexHandle {
    pub fn arena_index(&self) -> usize {
        self.0
    }
}

/// Storage for the indices of a single transformation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexArena {
    indices: Vec<MonomialIndex>,
}

impl IndexArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, index: MonomialIndex) -> IndexHandle {
        self.indices.push(index);
        IndexHandle(self.indices.len() - 1)
    }

    pub fn get(&self, handle: IndexHandle) -> Option<&MonomialIndex> {
        self.indices.get(handle.0)
    }

    pub(crate) fn get_mut(&mut self, handle: IndexHandle) -> &mut MonomialIndex {
        &mut self.indices[handle.0]
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (IndexHandle, &MonomialIndex)> {
        self.indices
            .iter()
            .enumerate()
            .map(|(i, index)| (IndexHandle(i), index))
    }

    /// Formats a list of handles as a comma-separated list of indices.
    pub fn format_list(&self, handles: &[IndexHandle]) -> String {
        handles.iter().map(|&h| &self[h]).join(", ")
    }
}

impl Index<IndexHandle> for IndexArena {
    type Output = MonomialIndex;

    fn index(&self, handle: IndexHandle) -> &MonomialIndex {
        &self.indices[handle.0]
    }
}

/// Counters for the ids of the summation index roles.
///
/// A fresh set of counters must be used for every independent transformation.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct IndexCounters {
    secondary: usize,
    internal: usize,
    external: usize,
}

impl IndexCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next id for the given role and advances the counter.
    ///
    /// # Panics
    ///
    /// Panics if the role is not a summation role, since fixed and primary indices are
    /// never numbered from a counter.
    pub fn next(&mut self, role: IndexRole) -> usize {
        let counter = match role {
            IndexRole::Secondary => &mut self.secondary,
            IndexRole::Internal => &mut self.internal,
            IndexRole::External => &mut self.external,
            IndexRole::Fixed | IndexRole::Primary => {
                panic!("{role} indices are not numbered by counters")
            }
        };
        *counter += 1;
        *counter - 1
    }

    /// The number of ids handed out for the given role.
    pub fn count(&self, role: IndexRole) -> usize {
        match role {
            IndexRole::Secondary => self.secondary,
            IndexRole::Internal => self.internal,
            IndexRole::External => self.external,
            IndexRole::Fixed | IndexRole::Primary => 0,
        }
    }
}
