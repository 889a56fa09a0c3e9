//! In-memory tables rebuilt from the journal.

use crate::record::JournalRecord;
use entilink_core::{EntityId, TransferObject, VersionToken};
use std::collections::{BTreeMap, HashMap};
use std::time::{SystemTime, UNIX_EPOCH};

/// Rows of every type, keyed by id.
#[derive(Debug, Default)]
pub struct Tables {
    rows: HashMap<String, BTreeMap<EntityId, TransferObject>>,
    next_ids: HashMap<String, i64>,
}

impl Tables {
    /// Applies one journal record.
    pub fn apply(&mut self, record: JournalRecord) {
        match record {
            JournalRecord::Put(row) => {
                let type_name = row.type_name.clone();
                self.observe_id(&type_name, row.id.raw() + 1);
                self.rows.entry(type_name).or_default().insert(row.id, row);
            }
            JournalRecord::Delete { type_name, id } => {
                if let Some(table) = self.rows.get_mut(&type_name) {
                    table.remove(&id);
                }
            }
            JournalRecord::Reserve { type_name, next_id } => {
                self.observe_id(&type_name, next_id);
            }
        }
    }

    fn observe_id(&mut self, type_name: &str, next: i64) {
        let slot = self.next_ids.entry(type_name.to_owned()).or_insert(0);
        *slot = (*slot).max(next);
    }

    /// The id the next created row of `type_name` receives.
    pub fn next_id(&self, type_name: &str) -> EntityId {
        EntityId::new(self.next_ids.get(type_name).copied().unwrap_or(0))
    }

    /// One row.
    pub fn row(&self, type_name: &str, id: EntityId) -> Option<&TransferObject> {
        self.rows.get(type_name)?.get(&id)
    }

    /// Mutable access to one row.
    pub fn row_mut(&mut self, type_name: &str, id: EntityId) -> Option<&mut TransferObject> {
        self.rows.get_mut(type_name)?.get_mut(&id)
    }

    /// All rows of a type in id order.
    pub fn rows(&self, type_name: &str) -> impl Iterator<Item = &TransferObject> {
        self.rows.get(type_name).into_iter().flat_map(BTreeMap::values)
    }

    /// All ids of a type in ascending order.
    pub fn ids(&self, type_name: &str) -> Vec<EntityId> {
        self.rows
            .get(type_name)
            .map(|t| t.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Number of rows of a type.
    pub fn count(&self, type_name: &str) -> usize {
        self.rows.get(type_name).map_or(0, BTreeMap::len)
    }

    /// Every row of every type.
    pub fn all_rows(&self) -> impl Iterator<Item = &TransferObject> {
        self.rows.values().flat_map(BTreeMap::values)
    }

    /// Id high-water marks per type.
    pub fn reservations(&self) -> impl Iterator<Item = (&str, i64)> {
        self.next_ids.iter().map(|(t, n)| (t.as_str(), *n))
    }

    /// Highest version token held by any row.
    pub fn max_version(&self) -> Option<VersionToken> {
        self.all_rows().filter_map(|r| r.version).max()
    }
}

/// Issues strictly increasing millisecond version tokens.
#[derive(Debug, Default)]
pub struct VersionClock {
    last: u64,
}

impl VersionClock {
    /// Makes sure future tokens are newer than `seen`.
    pub fn observe(&mut self, seen: VersionToken) {
        self.last = self.last.max(seen.raw());
    }

    /// Issues the next token.
    pub fn next(&mut self) -> VersionToken {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        self.last = now.max(self.last + 1);
        VersionToken::new(self.last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(type_name: &str, id: i64) -> TransferObject {
        TransferObject::new(type_name, EntityId::new(id))
    }

    #[test]
    fn ids_are_never_reused_after_delete() {
        let mut tables = Tables::default();
        tables.apply(JournalRecord::Put(row("Tag", 0)));
        tables.apply(JournalRecord::Put(row("Tag", 1)));
        tables.apply(JournalRecord::Delete {
            type_name: "Tag".into(),
            id: EntityId::new(1),
        });
        assert_eq!(tables.count("Tag"), 1);
        assert_eq!(tables.next_id("Tag"), EntityId::new(2));
        assert_eq!(tables.next_id("Book"), EntityId::new(0));
    }

    #[test]
    fn reservation_raises_the_high_water_mark() {
        let mut tables = Tables::default();
        tables.apply(JournalRecord::Reserve {
            type_name: "Tag".into(),
            next_id: 40,
        });
        tables.apply(JournalRecord::Put(row("Tag", 3)));
        assert_eq!(tables.next_id("Tag"), EntityId::new(40));
    }

    #[test]
    fn clock_is_strictly_increasing() {
        let mut clock = VersionClock::default();
        clock.observe(VersionToken::new(u64::MAX / 2));
        let a = clock.next();
        let b = clock.next();
        assert!(b > a);
        assert!(a.raw() > u64::MAX / 2);
    }
}
