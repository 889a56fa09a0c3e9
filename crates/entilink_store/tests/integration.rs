//! Integration tests for the local store.

use entilink_core::{AccessError, ControllerBuilder, EntityId, ModelController};
use entilink_store::{
    decode_frames, encode_frame, JournalRecord, MemoryJournal, StoreConfig, StoreController,
    StoreError,
};
use entilink_testkit::prelude::*;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Arc;

#[test]
fn reopen_restores_rows_versions_and_relations() {
    let store = TestStore::file();
    let (author_id, book_ids, version) = {
        let pipeline = store.pipeline();
        let (author, books) = scenarios::author_with_books(&pipeline, "Eliot", 2);
        (
            author.id(),
            books.iter().map(|b| b.id()).collect::<Vec<_>>(),
            books[0].version(),
        )
    };

    let store = store.reopen();
    let pipeline = store.pipeline();
    let author = pipeline.get_entity_by_id("Author", author_id).unwrap();
    assert_eq!(author.field("name").unwrap().as_str(), Some("Eliot"));

    let books = author.related_many("books").unwrap();
    assert_eq!(books.iter().map(|b| b.id()).collect::<Vec<_>>(), book_ids);
    assert_eq!(books[0].version(), version);

    let back = books[0].related_one("author").unwrap().unwrap();
    assert!(back.ptr_eq(&author));
}

#[test]
fn ids_are_not_reused_across_reopen() {
    let store = TestStore::file();
    let first = store.create_new("Tag").unwrap();
    store.delete(&first).unwrap();

    let store = store.reopen();
    let second = store.create_new("Tag").unwrap();
    assert_eq!(second.id(), EntityId::new(1));
}

#[test]
fn torn_tail_is_truncated_on_open() {
    let store = TestStore::file();
    store.create_new("Tag").unwrap();
    let path = store.path().unwrap();
    let journal = path.join("journal.log");

    let frame = encode_frame(&JournalRecord::Put(tag_row(7, "late"))).unwrap();
    {
        let mut file = OpenOptions::new().append(true).open(&journal).unwrap();
        file.write_all(&frame[..frame.len() / 2]).unwrap();
    }
    let intact = std::fs::metadata(&journal).unwrap().len() - (frame.len() / 2) as u64;

    let store = store.reopen();
    assert_eq!(store.get_ids("Tag").unwrap(), ids(&[0]));
    assert_eq!(std::fs::metadata(&journal).unwrap().len(), intact);
}

#[test]
fn damaged_journal_fails_to_open() {
    let registry = library();
    let mut bytes = encode_frame(&JournalRecord::Put(tag_row(0, "a"))).unwrap();
    bytes.extend(encode_frame(&JournalRecord::Put(tag_row(1, "b"))).unwrap());
    bytes[10] ^= 0xFF;

    let result =
        StoreController::with_journal(Box::new(MemoryJournal::with_data(bytes)), registry, StoreConfig::default());
    assert!(matches!(result, Err(StoreError::ChecksumMismatch { .. })));
}

#[test]
fn second_open_of_a_locked_directory_fails() {
    with_file_store(|_store, path| {
        let result = StoreController::open(path, library(), StoreConfig::default());
        assert!(matches!(result, Err(StoreError::Locked)));
    });
}

#[test]
fn missing_directory_without_create_fails() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("absent");
    let result = StoreController::open(&path, library(), StoreConfig::new().create_if_missing(false));
    assert!(matches!(result, Err(StoreError::Missing(_))));
}

#[test]
fn copy_joins_the_parent_collection() {
    with_temp_store(|store| {
        let pipeline = store.pipeline();
        let (author, books) = scenarios::author_with_books(&pipeline, "Austen", 1);

        let copy = pipeline.create_copy(&books[0]).unwrap();
        assert_ne!(copy.id(), books[0].id());
        assert_eq!(copy.field("title").unwrap(), books[0].field("title").unwrap());
        assert!(copy.related_one("author").unwrap().unwrap().ptr_eq(&author));

        let members = author.related_many("books").unwrap();
        assert_eq!(members.len(), 2);
        assert!(members.iter().any(|b| b.ptr_eq(&copy)));

        let row = store
            .export()
            .unwrap()
            .into_iter()
            .find(|r| r.type_name == "Author")
            .unwrap();
        assert_eq!(row.many["books"], vec![books[0].id(), copy.id()]);
    });
}

#[test]
fn copy_leaves_to_many_relations_empty() {
    with_temp_store(|store| {
        let pipeline = store.pipeline();
        let book = pipeline.create_new("Book").unwrap();
        let tag = pipeline.create_new("Tag").unwrap();
        book.add_related("tags", &tag).unwrap();
        pipeline.update(&[book.clone(), tag.clone()]).unwrap();

        let copy = pipeline.create_copy(&book).unwrap();
        assert!(copy.related_many("tags").unwrap().is_empty());
        assert_eq!(tag.related_many("books").unwrap().len(), 1);
    });
}

#[test]
fn closed_store_rejects_pipeline_calls() {
    with_temp_store(|store| {
        let pipeline = store.pipeline();
        pipeline.close().unwrap();
        assert!(matches!(
            pipeline.create_new("Book"),
            Err(AccessError::Closed)
        ));
    });
}

#[test]
fn export_import_round_trip_into_a_fresh_store() {
    let source = TestStore::memory();
    scenarios::author_with_books(&source.pipeline(), "Woolf", 3);
    let rows = source.export().unwrap();

    let target = TestStore::memory();
    assert_eq!(target.import(&rows).unwrap(), rows.len());
    assert_eq!(target.export().unwrap(), rows);
    assert_eq!(target.create_new("Book").unwrap().id(), EntityId::new(3));
}

#[test]
fn import_rejects_rows_that_do_not_fit() {
    with_temp_store(|store| {
        let bad = book_row(0, "x").with_field("isbn", serde_json::json!("123"));
        assert!(matches!(
            store.import(&[bad]),
            Err(AccessError::UnknownField { .. })
        ));
        assert_eq!(store.get_entity_count("Book").unwrap(), 0);
    });
}

#[test]
fn stats_count_rows_per_type() {
    with_temp_store(|store| {
        scenarios::author_with_books(&store.pipeline(), "Shelley", 2);
        let stats = store.stats().unwrap();
        assert_eq!(
            stats.rows,
            vec![
                ("Author".to_owned(), 1),
                ("Book".to_owned(), 2),
                ("Tag".to_owned(), 0)
            ]
        );
        assert!(stats.journal_bytes > 0);
    });
}

#[test]
fn compacted_journal_replays_to_the_same_rows() {
    let store = TestStore::file();
    scenarios::author_with_books(&store.pipeline(), "Bronte", 2);
    let before = store.export().unwrap();
    store.compact().unwrap();

    let bytes = std::fs::read(store.path().unwrap().join("journal.log")).unwrap();
    let replay = decode_frames(&bytes).unwrap();
    assert!(!replay.torn);

    let store = store.reopen();
    assert_eq!(store.export().unwrap(), before);
}

#[test]
fn backend_alone_hands_out_fresh_instances() {
    with_temp_store(|store| {
        let created = store.create_new("Tag").unwrap();
        let a = store.get_entity_by_id("Tag", created.id()).unwrap();
        let b = store.get_entity_by_id("Tag", created.id()).unwrap();
        assert!(!a.ptr_eq(&b));

        let pipeline = ControllerBuilder::new(store.backend(), Arc::clone(&store.registry))
            .with_cache()
            .build();
        let c = pipeline.get_entity_by_id("Tag", created.id()).unwrap();
        let d = pipeline.get_entity_by_id("Tag", created.id()).unwrap();
        assert!(c.ptr_eq(&d));
    });
}
