//! Test fixtures and store helpers.
//!
//! Provides the library model used across the test suites, transfer-object
//! builders for its types, and temporary stores with automatic cleanup.

use entilink_core::{
    Config, ControllerBuilder, EntityDescription, EntityId, ModelController, ModelDescription,
    Pipeline, PrimitiveKind, RelationKind, TransferObject, TypeRegistry,
};
use entilink_store::{StoreConfig, StoreController};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Description of the library model.
///
/// - `Author { name }` with `books: OneToMany<Book>` (counter `author`)
/// - versioned `Book { title, pages }` with `author: ManyToOne<Author>`
///   and `tags: ManyToMany<Tag>`
/// - `Tag { label }` with `books: ManyToMany<Book>` (counter `tags`)
pub fn library_description() -> ModelDescription {
    ModelDescription::new()
        .entity(
            EntityDescription::new("Author")
                .field("name", PrimitiveKind::Text { max_len: 32 })
                .relation("books", "Book", RelationKind::OneToMany, Some("author")),
        )
        .entity(
            EntityDescription::new("Book")
                .versioned()
                .field("title", PrimitiveKind::Text { max_len: 64 })
                .field("pages", PrimitiveKind::Int)
                .relation("author", "Author", RelationKind::ManyToOne, Some("books"))
                .relation("tags", "Tag", RelationKind::ManyToMany, Some("books")),
        )
        .entity(
            EntityDescription::new("Tag")
                .field("label", PrimitiveKind::Text { max_len: 16 })
                .relation("books", "Book", RelationKind::ManyToMany, Some("tags")),
        )
}

/// The library model registry.
pub fn library() -> Arc<TypeRegistry> {
    Arc::new(
        TypeRegistry::from_description(&library_description()).expect("library model is valid"),
    )
}

/// An `Author` row without relations.
pub fn author_row(id: i64, name: &str) -> TransferObject {
    TransferObject::new("Author", EntityId::new(id)).with_field("name", json!(name))
}

/// A `Book` row without relations.
pub fn book_row(id: i64, title: &str) -> TransferObject {
    TransferObject::new("Book", EntityId::new(id))
        .with_field("title", json!(title))
        .with_field("pages", json!(100))
}

/// A `Tag` row without relations.
pub fn tag_row(id: i64, label: &str) -> TransferObject {
    TransferObject::new("Tag", EntityId::new(id)).with_field("label", json!(label))
}

/// Shorthand for a list of ids.
pub fn ids(raw: &[i64]) -> Vec<EntityId> {
    raw.iter().copied().map(EntityId::new).collect()
}

/// A store over the library model with automatic cleanup.
pub struct TestStore {
    /// The store instance.
    pub store: Arc<StoreController>,
    /// The registry the store was opened with.
    pub registry: Arc<TypeRegistry>,
    /// The temporary directory (kept alive to prevent cleanup).
    temp_dir: Option<TempDir>,
}

impl TestStore {
    /// Creates a new in-memory store.
    pub fn memory() -> Self {
        let registry = library();
        Self {
            store: StoreController::in_memory(Arc::clone(&registry))
                .expect("Failed to open in-memory store"),
            registry,
            temp_dir: None,
        }
    }

    /// Creates a new store in a temporary directory.
    pub fn file() -> Self {
        Self::file_with(StoreConfig::default())
    }

    /// Creates a new store in a temporary directory with `config`.
    pub fn file_with(config: StoreConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let registry = library();
        let store = StoreController::open(temp_dir.path(), Arc::clone(&registry), config)
            .expect("Failed to open file store");
        Self {
            store,
            registry,
            temp_dir: Some(temp_dir),
        }
    }

    /// Returns the store directory if file-based, None if in-memory.
    pub fn path(&self) -> Option<PathBuf> {
        self.temp_dir.as_ref().map(|d| d.path().to_path_buf())
    }

    /// Closes the store and opens the same directory again.
    ///
    /// Every other handle on the store must be dropped first so that the
    /// directory lock is released.
    pub fn reopen(self) -> Self {
        let Self {
            store,
            registry,
            temp_dir,
        } = self;
        store.close().expect("Failed to close store");
        drop(store);
        let dir = temp_dir.expect("Only file stores can be reopened");
        let store = StoreController::open(dir.path(), Arc::clone(&registry), StoreConfig::default())
            .expect("Failed to reopen store");
        Self {
            store,
            registry,
            temp_dir: Some(dir),
        }
    }

    /// Closes the store and hands back its directory, releasing the lock.
    ///
    /// Every other handle on the store must be dropped first.
    pub fn into_dir(self) -> TempDir {
        let Self {
            store, temp_dir, ..
        } = self;
        store.close().expect("Failed to close store");
        drop(store);
        temp_dir.expect("Only file stores have a directory")
    }

    /// The store as a backend controller.
    pub fn backend(&self) -> Arc<dyn ModelController> {
        Arc::clone(&self.store) as Arc<dyn ModelController>
    }

    /// A pipeline over the store with the default decorators.
    pub fn pipeline(&self) -> Pipeline {
        self.pipeline_with(&Config::default())
    }

    /// A pipeline over the store with the decorators enabled in `config`.
    pub fn pipeline_with(&self, config: &Config) -> Pipeline {
        ControllerBuilder::from_config(self.backend(), Arc::clone(&self.registry), config).build()
    }
}

impl std::ops::Deref for TestStore {
    type Target = StoreController;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

/// Runs a test with a temporary in-memory store.
pub fn with_temp_store<F, R>(f: F) -> R
where
    F: FnOnce(&TestStore) -> R,
{
    let store = TestStore::memory();
    f(&store)
}

/// Runs a test with a temporary file store.
pub fn with_file_store<F, R>(f: F) -> R
where
    F: FnOnce(&TestStore, &Path) -> R,
{
    let store = TestStore::file();
    let path = store.path().expect("File store should have a path");
    f(&store, &path)
}

/// Test scenario helpers.
pub mod scenarios {
    use entilink_core::{EntityRef, ModelController};

    /// One author with `books` titled books, all persisted.
    ///
    /// Returns the author followed by the books.
    pub fn author_with_books(
        controller: &dyn ModelController,
        name: &str,
        books: usize,
    ) -> (EntityRef, Vec<EntityRef>) {
        let author = controller.create_new("Author").expect("create author");
        author.set_field("name", name).expect("set name");
        let mut created = Vec::with_capacity(books);
        for i in 0..books {
            let book = controller.create_new("Book").expect("create book");
            book.set_field("title", format!("{name} #{i}")).expect("set title");
            book.set_related("author", Some(&author)).expect("link author");
            created.push(book);
        }
        let mut dirty = vec![author.clone()];
        dirty.extend(created.iter().cloned());
        controller.update(&dirty).expect("persist library");
        (author, created)
    }
}
