//! The local persistence controller.

use crate::config::StoreConfig;
use crate::error::StoreResult;
use crate::journal::{FileJournal, Journal, MemoryJournal};
use crate::record::{decode_frames, encode_frame, JournalRecord};
use crate::table::{Tables, VersionClock};
use entilink_core::{
    AccessError, AccessResult, EntityAccess, EntityId, EntityList, EntityModel, EntityRef,
    FetchRegistry, LazyContext, ModelController, RelationKind, TransferObject, VersionToken,
};
use parking_lot::{Mutex, MutexGuard};
use std::path::Path;
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

/// Row counts and journal size of a store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Rows per type, in registry order.
    pub rows: Vec<(String, usize)>,
    /// Journal size in bytes.
    pub journal_bytes: u64,
}

/// Outcome of [`StoreController::compact`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactionStats {
    /// Journal size before compaction.
    pub before: u64,
    /// Journal size after compaction.
    pub after: u64,
    /// Rows rewritten.
    pub rows: usize,
}

struct StoreState {
    tables: Tables,
    journal: Box<dyn Journal>,
    clock: VersionClock,
    closed: bool,
}

impl StoreState {
    /// Journals `records`, then applies them to the tables.
    fn write(&mut self, records: Vec<JournalRecord>, sync: bool) -> StoreResult<()> {
        let mut bytes = Vec::new();
        for record in &records {
            bytes.extend(encode_frame(record)?);
        }
        self.journal.append(&bytes)?;
        if sync {
            self.journal.sync()?;
        }
        for record in records {
            self.tables.apply(record);
        }
        Ok(())
    }
}

/// Backend controller persisting rows in an append-only journal.
///
/// Every row is held in memory and rebuilt from the journal on open. Reads
/// hand out fresh stand-ins on every call; identity is the cache
/// decorator's business.
pub struct StoreController {
    context: LazyContext,
    state: Mutex<StoreState>,
    config: StoreConfig,
}

impl StoreController {
    /// Opens or creates a store in directory `path`.
    ///
    /// # Errors
    ///
    /// Fails if the directory is locked by another process, missing while
    /// `create_if_missing` is off, or holds a damaged journal.
    pub fn open(
        path: impl AsRef<Path>,
        registry: Arc<entilink_core::TypeRegistry>,
        config: StoreConfig,
    ) -> StoreResult<Arc<Self>> {
        let journal = FileJournal::open(path.as_ref(), config.create_if_missing)?;
        Self::with_journal(Box::new(journal), registry, config)
    }

    /// Creates an empty store that lives only in memory.
    pub fn in_memory(registry: Arc<entilink_core::TypeRegistry>) -> StoreResult<Arc<Self>> {
        Self::with_journal(
            Box::new(MemoryJournal::new()),
            registry,
            StoreConfig::default(),
        )
    }

    /// Opens a store over an arbitrary journal.
    ///
    /// A torn frame at the end of the journal is dropped and truncated
    /// away. Any other damage fails the open.
    pub fn with_journal(
        mut journal: Box<dyn Journal>,
        registry: Arc<entilink_core::TypeRegistry>,
        config: StoreConfig,
    ) -> StoreResult<Arc<Self>> {
        let replay = decode_frames(&journal.read_all()?)?;
        if replay.torn {
            warn!(valid_len = replay.valid_len, "dropping torn journal tail");
            journal.truncate(replay.valid_len)?;
        }

        let records = replay.records.len();
        let mut tables = Tables::default();
        for record in replay.records {
            tables.apply(record);
        }
        let mut clock = VersionClock::default();
        if let Some(version) = tables.max_version() {
            clock.observe(version);
        }
        info!(records, "store opened");

        let fetches = Arc::new(FetchRegistry::new(config.fetch_depth_limit));
        Ok(Arc::new_cyclic(|weak: &Weak<Self>| {
            let fallback: Weak<dyn EntityAccess> = weak.clone();
            Self {
                context: LazyContext::new(registry, fallback, fetches),
                state: Mutex::new(StoreState {
                    tables,
                    journal,
                    clock,
                    closed: false,
                }),
                config,
            }
        }))
    }

    /// The materialization context.
    pub fn context(&self) -> &LazyContext {
        &self.context
    }

    fn model(&self, type_name: &str) -> AccessResult<Arc<EntityModel>> {
        Ok(Arc::clone(self.context.registry().require(type_name)?))
    }

    fn state(&self) -> AccessResult<MutexGuard<'_, StoreState>> {
        let state = self.state.lock();
        if state.closed {
            return Err(AccessError::Closed);
        }
        Ok(state)
    }

    fn blank_row(model: &EntityModel, id: EntityId, version: Option<VersionToken>) -> TransferObject {
        let mut row = TransferObject::new(model.name(), id);
        row.version = version;
        for field in model.fields() {
            row.fields.insert(field.name.clone(), serde_json::Value::Null);
        }
        for relation in model.relations() {
            if relation.is_many() {
                row.many.insert(relation.name.clone(), Vec::new());
            } else {
                row.one.insert(relation.name.clone(), EntityId::UNASSIGNED);
            }
        }
        row
    }

    fn require_row(state: &StoreState, model: &EntityModel, id: EntityId) -> AccessResult<()> {
        if !id.is_assigned() {
            return Err(AccessError::malicious_id(model.name(), id));
        }
        if state.tables.row(model.name(), id).is_none() {
            return Err(AccessError::not_found(model.name(), id));
        }
        Ok(())
    }

    /// Rewrites the journal with one record per live row.
    ///
    /// Id high-water marks survive compaction, so deleted ids stay retired.
    pub fn compact(&self) -> AccessResult<CompactionStats> {
        let mut state = self.state()?;
        let before = state.journal.size()?;

        let mut records: Vec<JournalRecord> = state
            .tables
            .reservations()
            .map(|(type_name, next_id)| JournalRecord::Reserve {
                type_name: type_name.to_owned(),
                next_id,
            })
            .collect();
        let rows: Vec<TransferObject> = state.tables.all_rows().cloned().collect();
        let row_count = rows.len();
        records.extend(rows.into_iter().map(JournalRecord::Put));

        let mut bytes = Vec::new();
        for record in &records {
            bytes.extend(encode_frame(record)?);
        }
        state.journal.replace(&bytes)?;
        let after = state.journal.size()?;
        info!(before, after, rows = row_count, "journal compacted");
        Ok(CompactionStats {
            before,
            after,
            rows: row_count,
        })
    }

    /// Row counts per type and the journal size.
    pub fn stats(&self) -> AccessResult<StoreStats> {
        let state = self.state()?;
        let rows = self
            .context
            .registry()
            .models()
            .map(|m| (m.name().to_owned(), state.tables.count(m.name())))
            .collect();
        Ok(StoreStats {
            rows,
            journal_bytes: state.journal.size()?,
        })
    }

    /// Every row, grouped by type in registry order.
    pub fn export(&self) -> AccessResult<Vec<TransferObject>> {
        let state = self.state()?;
        Ok(self
            .context
            .registry()
            .models()
            .flat_map(|m| state.tables.rows(m.name()).cloned().collect::<Vec<_>>())
            .collect())
    }

    /// Writes rows with their ids preserved, replacing existing rows.
    ///
    /// Every row is validated against the model before anything is
    /// written. Versioned rows without a token receive a fresh one.
    /// Returns the number of rows written.
    pub fn import(&self, rows: &[TransferObject]) -> AccessResult<usize> {
        let mut normalized = Vec::with_capacity(rows.len());
        for row in rows {
            let model = self.model(&row.type_name)?;
            if !row.id.is_assigned() {
                return Err(AccessError::malicious_id(model.name(), row.id));
            }
            self.context.materialize(row)?;
            let mut row = row.clone();
            row.type_name = model.name().to_owned();
            normalized.push((model.is_versioned(), row));
        }

        let mut state = self.state()?;
        let records = normalized
            .into_iter()
            .map(|(versioned, mut row)| {
                match row.version {
                    Some(version) => state.clock.observe(version),
                    None if versioned => row.version = Some(state.clock.next()),
                    None => {}
                }
                JournalRecord::Put(row)
            })
            .collect::<Vec<_>>();
        let count = records.len();
        state.write(records, self.config.sync_on_write)?;
        info!(rows = count, "rows imported");
        Ok(count)
    }
}

impl ModelController for StoreController {
    fn get_entities(&self, type_name: &str) -> AccessResult<EntityList> {
        let model = self.model(type_name)?;
        let rows: Vec<TransferObject> = self.state()?.tables.rows(model.name()).cloned().collect();
        Ok(EntityList::Loaded(self.context.materialize_all(&rows)?))
    }

    fn get_ids(&self, type_name: &str) -> AccessResult<Vec<EntityId>> {
        let model = self.model(type_name)?;
        Ok(self.state()?.tables.ids(model.name()))
    }

    fn get_entity_count(&self, type_name: &str) -> AccessResult<usize> {
        let model = self.model(type_name)?;
        Ok(self.state()?.tables.count(model.name()))
    }

    fn get_entity_by_id(&self, type_name: &str, id: EntityId) -> AccessResult<EntityRef> {
        let model = self.model(type_name)?;
        let row = self
            .state()?
            .tables
            .row(model.name(), id)
            .cloned()
            .ok_or_else(|| AccessError::not_found(model.name(), id))?;
        self.context.materialize(&row)
    }

    fn get_entities_by_ids(&self, type_name: &str, ids: &[EntityId]) -> AccessResult<EntityList> {
        let model = self.model(type_name)?;
        let rows: Vec<TransferObject> = {
            let state = self.state()?;
            ids.iter()
                .filter_map(|id| state.tables.row(model.name(), *id).cloned())
                .collect()
        };
        debug!(type_name = model.name(), requested = ids.len(), found = rows.len(), "rows loaded");
        Ok(EntityList::Loaded(self.context.materialize_all(&rows)?))
    }

    fn create_new(&self, type_name: &str) -> AccessResult<EntityRef> {
        let model = self.model(type_name)?;
        let row = {
            let mut state = self.state()?;
            let id = state.tables.next_id(model.name());
            let version = model.is_versioned().then(|| state.clock.next());
            let row = Self::blank_row(&model, id, version);
            state.write(vec![JournalRecord::Put(row.clone())], self.config.sync_on_write)?;
            row
        };
        info!(type_name = model.name(), id = %row.id, "entity created");
        self.context.materialize(&row)
    }

    fn create_copy(&self, entity: &EntityRef) -> AccessResult<EntityRef> {
        let model = Arc::clone(entity.model());
        let source = TransferObject::from_entity(entity);

        let mut copy = Self::blank_row(&model, EntityId::UNASSIGNED, None);
        copy.fields = source.fields.clone();
        let mut parents = Vec::new();
        for relation in model.relations() {
            if relation.kind != RelationKind::ManyToOne {
                continue;
            }
            let parent = source.one.get(&relation.name).copied().unwrap_or_default();
            copy.one.insert(relation.name.clone(), parent);
            if let (Some(counter), true) = (&relation.counter, parent.is_assigned()) {
                let target = self.model(&relation.target)?;
                parents.push((target.name().to_owned(), parent, counter.clone()));
            }
        }

        let row = {
            let mut state = self.state()?;
            copy.id = state.tables.next_id(model.name());
            copy.version = model.is_versioned().then(|| state.clock.next());

            let mut records = vec![JournalRecord::Put(copy.clone())];
            for (target, parent_id, counter) in &parents {
                if let Some(parent) = state.tables.row(target, *parent_id) {
                    let mut parent = parent.clone();
                    let members = parent.many.entry(counter.clone()).or_default();
                    if !members.contains(&copy.id) {
                        members.push(copy.id);
                    }
                    records.push(JournalRecord::Put(parent));
                }
            }
            state.write(records, self.config.sync_on_write)?;
            copy
        };
        info!(type_name = model.name(), source = %entity.id(), id = %row.id, "entity copied");

        let created = self.context.materialize(&row)?;
        for relation in model.relations() {
            if relation.kind == RelationKind::ManyToOne {
                if let Err(err) = created.resolve(&relation.name) {
                    warn!(entity = %created, relation = %relation.name, error = %err, "copy parent not linked");
                }
            }
        }
        Ok(created)
    }

    fn update(&self, entities: &[EntityRef]) -> AccessResult<()> {
        let snapshots: Vec<(Arc<EntityModel>, TransferObject)> = entities
            .iter()
            .map(|e| (Arc::clone(e.model()), TransferObject::from_entity(e)))
            .collect();

        let versions = {
            let mut state = self.state()?;
            for (model, snapshot) in &snapshots {
                Self::require_row(&state, model, snapshot.id)?;
            }
            let mut records = Vec::with_capacity(snapshots.len());
            let mut versions = Vec::with_capacity(snapshots.len());
            for (model, mut snapshot) in snapshots {
                let version = model.is_versioned().then(|| state.clock.next());
                snapshot.version = version;
                versions.push(version);
                records.push(JournalRecord::Put(snapshot));
            }
            state.write(records, self.config.sync_on_write)?;
            versions
        };

        for (entity, version) in entities.iter().zip(versions) {
            entity.set_version(version);
        }
        debug!(count = entities.len(), "entities updated");
        Ok(())
    }

    fn delete(&self, entity: &EntityRef) -> AccessResult<()> {
        let model = Arc::clone(entity.model());
        let id = entity.id();
        let mut state = self.state()?;
        Self::require_row(&state, &model, id)?;
        state.write(
            vec![JournalRecord::Delete {
                type_name: model.name().to_owned(),
                id,
            }],
            self.config.sync_on_write,
        )?;
        info!(type_name = model.name(), %id, "entity deleted");
        Ok(())
    }

    fn version_of(&self, type_name: &str, id: EntityId) -> AccessResult<Option<VersionToken>> {
        let model = self.model(type_name)?;
        self.state()?
            .tables
            .row(model.name(), id)
            .map(|row| row.version)
            .ok_or_else(|| AccessError::not_found(model.name(), id))
    }

    fn bind_entity_access(&self, access: Weak<dyn EntityAccess>) {
        self.context.bind(access);
    }

    fn close(&self) -> AccessResult<()> {
        let mut state = self.state.lock();
        if state.closed {
            return Ok(());
        }
        state.journal.sync()?;
        state.closed = true;
        info!("store closed");
        Ok(())
    }
}

impl EntityAccess for StoreController {
    fn get_one(&self, type_name: &str, id: EntityId) -> AccessResult<EntityRef> {
        self.get_entity_by_id(type_name, id)
    }

    fn get_many(&self, type_name: &str, ids: &[EntityId]) -> AccessResult<Vec<EntityRef>> {
        self.get_entities_by_ids(type_name, ids)?.into_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entilink_core::{EntityDescription, ModelDescription, PrimitiveKind, TypeRegistry};

    fn registry() -> Arc<TypeRegistry> {
        let description = ModelDescription::new()
            .entity(
                EntityDescription::new("Author")
                    .field("name", PrimitiveKind::Text { max_len: 32 })
                    .relation("books", "Book", RelationKind::OneToMany, Some("author")),
            )
            .entity(
                EntityDescription::new("Book")
                    .versioned()
                    .field("title", PrimitiveKind::Text { max_len: 64 })
                    .relation("author", "Author", RelationKind::ManyToOne, Some("books")),
            );
        Arc::new(TypeRegistry::from_description(&description).unwrap())
    }

    #[test]
    fn create_assigns_sequential_ids_and_versions() {
        let store = StoreController::in_memory(registry()).unwrap();
        let a = store.create_new("Book").unwrap();
        let b = store.create_new("book").unwrap();
        assert_eq!(a.id(), EntityId::new(0));
        assert_eq!(b.id(), EntityId::new(1));
        assert!(a.version().is_some());
        assert!(b.version() > a.version());
        assert_eq!(store.get_entity_count("Book").unwrap(), 2);
    }

    #[test]
    fn update_persists_fields_and_bumps_version() {
        let store = StoreController::in_memory(registry()).unwrap();
        let book = store.create_new("Book").unwrap();
        let before = book.version();
        book.set_field("title", "Emma").unwrap();
        store.update(&[book.clone()]).unwrap();
        assert!(book.version() > before);

        let reloaded = store.get_entity_by_id("Book", book.id()).unwrap();
        assert_eq!(reloaded.field("title").unwrap().as_str(), Some("Emma"));
        assert_eq!(store.version_of("Book", book.id()).unwrap(), book.version());
    }

    #[test]
    fn unknown_rows_fail_writes() {
        let store = StoreController::in_memory(registry()).unwrap();
        let registry = registry();
        let model = Arc::clone(registry.require("Author").unwrap());
        let ghost = EntityRef::blank(model);
        assert!(matches!(
            store.update(&[ghost.clone()]),
            Err(AccessError::MaliciousId { .. })
        ));
        ghost.set_id(EntityId::new(9));
        assert!(matches!(store.delete(&ghost), Err(AccessError::NotFound { .. })));
    }

    #[test]
    fn delete_retires_the_id() {
        let store = StoreController::in_memory(registry()).unwrap();
        let first = store.create_new("Author").unwrap();
        store.delete(&first).unwrap();
        let second = store.create_new("Author").unwrap();
        assert_eq!(second.id(), EntityId::new(1));
        assert!(matches!(
            store.get_entity_by_id("Author", first.id()),
            Err(AccessError::NotFound { .. })
        ));
    }

    #[test]
    fn closed_store_refuses_calls() {
        let store = StoreController::in_memory(registry()).unwrap();
        store.close().unwrap();
        store.close().unwrap();
        assert!(matches!(store.get_ids("Book"), Err(AccessError::Closed)));
    }

    #[test]
    fn compaction_keeps_rows_and_high_water_marks() {
        let store = StoreController::in_memory(registry()).unwrap();
        let book = store.create_new("Book").unwrap();
        for _ in 0..3 {
            store.update(&[book.clone()]).unwrap();
        }
        let gone = store.create_new("Book").unwrap();
        store.delete(&gone).unwrap();

        let stats = store.compact().unwrap();
        assert!(stats.after < stats.before);
        assert_eq!(stats.rows, 1);
        assert_eq!(store.create_new("Book").unwrap().id(), EntityId::new(2));
    }
}
