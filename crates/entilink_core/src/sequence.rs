//! Lazy sequences of entities.
//!
//! A [`LazySequence`] is addressed by an ordered id list. Entries are
//! fetched one at a time by [`LazySequence::get`] or all at once by
//! [`LazySequence::fetch_all`]; a resolved entry drops its id so that only
//! outstanding ids are ever requested again.

use crate::access::AccessHandle;
use crate::entity::EntityRef;
use crate::error::{AccessError, AccessResult};
use crate::model::EntityId;
use std::collections::HashMap;
use std::ops::Range;
use tracing::{error, warn};

/// Result of a list-returning controller call.
#[derive(Debug)]
pub enum EntityList {
    /// Fully materialized entities.
    Loaded(Vec<EntityRef>),
    /// Entities resolved on demand.
    Lazy(LazySequence),
}

impl EntityList {
    /// Number of entries.
    pub fn len(&self) -> usize {
        match self {
            Self::Loaded(list) => list.len(),
            Self::Lazy(seq) => seq.len(),
        }
    }

    /// Returns true if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true for the lazy variant.
    pub fn is_lazy(&self) -> bool {
        matches!(self, Self::Lazy(_))
    }

    /// Materializes every entry.
    ///
    /// Entries of a lazy sequence whose entity no longer exists are left out.
    pub fn into_vec(self) -> AccessResult<Vec<EntityRef>> {
        match self {
            Self::Loaded(list) => Ok(list),
            Self::Lazy(mut seq) => {
                seq.fetch_all()?;
                Ok(seq.values.into_iter().flatten().collect())
            }
        }
    }
}

impl From<Vec<EntityRef>> for EntityList {
    fn from(list: Vec<EntityRef>) -> Self {
        Self::Loaded(list)
    }
}

/// Ordered entities of one type, resolved on demand.
pub struct LazySequence {
    type_name: String,
    ids: Vec<Option<EntityId>>,
    values: Vec<Option<EntityRef>>,
    access: AccessHandle,
    lazy_iterator: bool,
    all_fetched: bool,
}

impl LazySequence {
    /// Creates a sequence over `ids`, none of them resolved.
    pub fn new(type_name: impl Into<String>, ids: Vec<EntityId>, access: AccessHandle) -> Self {
        let len = ids.len();
        Self {
            type_name: type_name.into(),
            ids: ids.into_iter().map(Some).collect(),
            values: vec![None; len],
            access,
            lazy_iterator: false,
            all_fetched: len == 0,
        }
    }

    /// Creates a sequence from parallel id and value lists.
    ///
    /// A `None` id marks an entry that is already resolved in place, so its
    /// value must be present. An entry carrying both keeps the value.
    pub fn with_entries(
        type_name: impl Into<String>,
        ids: Vec<Option<EntityId>>,
        values: Vec<Option<EntityRef>>,
        access: AccessHandle,
    ) -> AccessResult<Self> {
        let type_name = type_name.into();
        if ids.len() != values.len() {
            return Err(AccessError::invalid_operation(format!(
                "{} ids for {} values in a {type_name} sequence",
                ids.len(),
                values.len()
            )));
        }
        let mut entries = Vec::with_capacity(ids.len());
        for (index, (id, value)) in ids.into_iter().zip(values).enumerate() {
            match (id, value) {
                (_, Some(value)) => entries.push((None, Some(value))),
                (Some(id), None) => entries.push((Some(id), None)),
                (None, None) => {
                    return Err(AccessError::invalid_operation(format!(
                        "{type_name} sequence entry {index} has neither id nor value"
                    )))
                }
            }
        }
        let (ids, values): (Vec<_>, Vec<_>) = entries.into_iter().unzip();
        let all_fetched = ids.iter().all(Option::is_none);
        Ok(Self {
            type_name,
            ids,
            values,
            access,
            lazy_iterator: false,
            all_fetched,
        })
    }

    /// Chooses between the eager and the lazy iterator.
    #[must_use]
    pub fn with_lazy_iterator(mut self, lazy: bool) -> Self {
        self.lazy_iterator = lazy;
        self
    }

    /// Entity type of the entries.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns true if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Returns true if the entry at `index` is resolved.
    pub fn is_resolved(&self, index: usize) -> bool {
        self.values.get(index).is_some_and(Option::is_some)
    }

    /// Returns true once no id is outstanding.
    pub fn is_fully_fetched(&self) -> bool {
        self.all_fetched
    }

    /// Ids still waiting to be fetched, in order.
    pub fn outstanding_ids(&self) -> Vec<EntityId> {
        self.ids.iter().flatten().copied().collect()
    }

    /// Returns the entry at `index`, fetching only that entry if needed.
    ///
    /// Fetch failures are logged and yield `None`; the entry stays
    /// outstanding.
    pub fn get(&mut self, index: usize) -> Option<EntityRef> {
        if let Err(err) = self.fetch(index) {
            error!(type_name = %self.type_name, index, error = %err, "sequence entry fetch failed");
        }
        self.values.get(index).cloned().flatten()
    }

    /// Resolves the entry at `index`.
    pub fn fetch(&mut self, index: usize) -> AccessResult<()> {
        let Some(Some(id)) = self.ids.get(index).copied() else {
            return Ok(());
        };
        let entity = self.access.get()?.get_one(&self.type_name, id)?;
        self.values[index] = Some(entity);
        self.ids[index] = None;
        self.all_fetched = self.ids.iter().all(Option::is_none);
        Ok(())
    }

    /// Resolves every outstanding entry with one bulk fetch.
    pub fn fetch_all(&mut self) -> AccessResult<()> {
        if self.all_fetched {
            return Ok(());
        }
        let outstanding = self.outstanding_ids();
        if !outstanding.is_empty() {
            let fetched = self.access.get()?.get_many(&self.type_name, &outstanding)?;
            let by_id: HashMap<EntityId, EntityRef> =
                fetched.into_iter().map(|e| (e.id(), e)).collect();
            for (slot_id, value) in self.ids.iter_mut().zip(self.values.iter_mut()) {
                let Some(id) = *slot_id else { continue };
                match by_id.get(&id) {
                    Some(entity) => {
                        *value = Some(entity.clone());
                        *slot_id = None;
                    }
                    None => warn!(type_name = %self.type_name, %id, "sequence entry no longer exists"),
                }
            }
        }
        self.all_fetched = self.ids.iter().all(Option::is_none);
        Ok(())
    }

    /// Iterates over the entries.
    ///
    /// The eager iterator fetches everything up front; the lazy one
    /// fetches entry by entry. Entries that cannot be fetched are skipped.
    pub fn iter(&mut self) -> SequenceIter<'_> {
        if !self.lazy_iterator || self.all_fetched {
            if let Err(err) = self.fetch_all() {
                error!(type_name = %self.type_name, error = %err, "sequence fetch failed");
            }
        }
        SequenceIter {
            sequence: self,
            index: 0,
        }
    }

    /// Materializes all entries into a vector.
    pub fn to_vec(&mut self) -> Vec<EntityRef> {
        self.iter().collect()
    }

    /// Returns true if an entry has the identity of `entity`. Never fetches.
    pub fn contains(&self, entity: &EntityRef) -> bool {
        self.index_of(entity).is_some()
    }

    /// First position of `entity`'s identity. Never fetches.
    pub fn index_of(&self, entity: &EntityRef) -> Option<usize> {
        (0..self.len()).find(|&i| self.matches(i, entity))
    }

    /// Last position of `entity`'s identity. Never fetches.
    pub fn last_index_of(&self, entity: &EntityRef) -> Option<usize> {
        (0..self.len()).rev().find(|&i| self.matches(i, entity))
    }

    fn matches(&self, index: usize, entity: &EntityRef) -> bool {
        match (&self.ids[index], &self.values[index]) {
            (Some(id), _) => entity.type_name() == self.type_name && *id == entity.id(),
            (None, Some(value)) => value.ptr_eq(entity) || value.same_identity(entity),
            (None, None) => false,
        }
    }

    /// Appends a resolved entry.
    pub fn push(&mut self, entity: EntityRef) {
        self.ids.push(None);
        self.values.push(Some(entity));
    }

    /// Inserts a resolved entry at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`, like [`Vec::insert`].
    pub fn insert(&mut self, index: usize, entity: EntityRef) {
        self.ids.insert(index, None);
        self.values.insert(index, Some(entity));
    }

    /// Replaces the entry at `index` and returns the previous one.
    ///
    /// Returns `None` without changes if `index` is out of range.
    pub fn set(&mut self, index: usize, entity: EntityRef) -> Option<EntityRef> {
        if index >= self.len() {
            return None;
        }
        let previous = self.get(index);
        self.ids[index] = None;
        self.values[index] = Some(entity);
        self.all_fetched = self.ids.iter().all(Option::is_none);
        previous
    }

    /// Removes the entry at `index`, resolving it first so it can be returned.
    pub fn remove(&mut self, index: usize) -> Option<EntityRef> {
        if index >= self.len() {
            return None;
        }
        let removed = self.get(index);
        self.ids.remove(index);
        self.values.remove(index);
        self.all_fetched = self.ids.iter().all(Option::is_none);
        removed
    }

    /// Removes the first entry with `entity`'s identity.
    pub fn remove_entity(&mut self, entity: &EntityRef) -> bool {
        match self.index_of(entity) {
            Some(index) => {
                self.ids.remove(index);
                self.values.remove(index);
                self.all_fetched = self.ids.iter().all(Option::is_none);
                true
            }
            None => false,
        }
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.ids.clear();
        self.values.clear();
        self.all_fetched = true;
    }

    /// A new sequence over `range`, carrying over resolved entries.
    ///
    /// # Panics
    ///
    /// Panics if `range` is out of bounds.
    pub fn sub_sequence(&self, range: Range<usize>) -> LazySequence {
        let ids = self.ids[range.clone()].to_vec();
        let values = self.values[range].to_vec();
        let all_fetched = ids.iter().all(Option::is_none);
        LazySequence {
            type_name: self.type_name.clone(),
            ids,
            values,
            access: self.access.clone(),
            lazy_iterator: self.lazy_iterator,
            all_fetched,
        }
    }

    /// Bulk containment is not supported on a lazily backed sequence.
    pub fn contains_all(&self, _entities: &[EntityRef]) -> AccessResult<bool> {
        Err(AccessError::Unsupported {
            operation: "contains_all",
        })
    }

    /// Bulk removal is not supported on a lazily backed sequence.
    pub fn remove_all(&mut self, _entities: &[EntityRef]) -> AccessResult<bool> {
        Err(AccessError::Unsupported {
            operation: "remove_all",
        })
    }

    /// Bulk retention is not supported on a lazily backed sequence.
    pub fn retain_all(&mut self, _entities: &[EntityRef]) -> AccessResult<bool> {
        Err(AccessError::Unsupported {
            operation: "retain_all",
        })
    }
}

impl Extend<EntityRef> for LazySequence {
    fn extend<I: IntoIterator<Item = EntityRef>>(&mut self, iter: I) {
        for entity in iter {
            self.push(entity);
        }
    }
}

impl std::fmt::Debug for LazySequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazySequence")
            .field("type_name", &self.type_name)
            .field("len", &self.len())
            .field("outstanding", &self.outstanding_ids())
            .finish()
    }
}

/// Iterator over a [`LazySequence`].
pub struct SequenceIter<'a> {
    sequence: &'a mut LazySequence,
    index: usize,
}

impl Iterator for SequenceIter<'_> {
    type Item = EntityRef;

    fn next(&mut self) -> Option<EntityRef> {
        while self.index < self.sequence.len() {
            let index = self.index;
            self.index += 1;
            if let Some(entity) = self.sequence.get(index) {
                return Some(entity);
            }
        }
        None
    }
}
