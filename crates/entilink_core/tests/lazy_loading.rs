//! Stand-ins and lazy sequences against a recording access.

use entilink_core::{AccessError, EntityId, LazySequence};
use entilink_testkit::prelude::*;
use std::sync::Arc;

fn author_with_two_books(access: &RecordingAccess) -> entilink_core::EntityRef {
    access.insert(book_row(5, "Adam Bede").with_one("author", EntityId::new(1)));
    access.insert(book_row(7, "Romola").with_one("author", EntityId::new(1)));
    access.materialize(&author_row(1, "Eliot").with_many("books", ids(&[5, 7])))
}

#[test]
fn stand_in_defers_relations_until_first_access() {
    let access = RecordingAccess::new(library());
    let author = author_with_two_books(&access);

    assert_eq!(author.field("name").unwrap().as_str(), Some("Eliot"));
    assert!(!author.is_fully_resolved());
    assert!(access.calls().is_empty());

    let books = author.related_many("books").unwrap();
    assert_eq!(books.iter().map(|b| b.id()).collect::<Vec<_>>(), ids(&[5, 7]));
    assert_eq!(access.get_many_calls(), vec![ids(&[5, 7])]);

    author.related_many("books").unwrap();
    assert_eq!(access.calls().len(), 1);
    assert!(author.is_fully_resolved());
}

#[test]
fn resolved_members_point_back_without_fetching() {
    let access = RecordingAccess::new(library());
    let author = author_with_two_books(&access);
    let books = author.related_many("books").unwrap();
    access.reset_calls();

    for book in &books {
        let back = book.related_one("author").unwrap().unwrap();
        assert!(back.ptr_eq(&author));
    }
    assert!(access.calls().is_empty());
}

#[test]
fn to_one_stand_in_uses_a_single_fetch() {
    let access = RecordingAccess::new(library());
    access.insert(author_row(1, "Eliot"));
    let book = access.materialize(&book_row(5, "Adam Bede").with_one("author", EntityId::new(1)));

    let author = book.related_one("author").unwrap().unwrap();
    assert_eq!(author.id(), EntityId::new(1));
    assert_eq!(access.get_one_calls(), ids(&[1]));
    assert!(access.get_many_calls().is_empty());
}

#[test]
fn empty_relations_start_resolved() {
    let access = RecordingAccess::new(library());
    let tag = access.materialize(&tag_row(3, "classic").with_many("books", Vec::new()));
    assert!(tag.is_fully_resolved());
    assert!(tag.related_many("books").unwrap().is_empty());

    let book = access.materialize(&book_row(4, "Silas Marner").with_one("author", EntityId::UNASSIGNED));
    assert!(book.related_one("author").unwrap().is_none());
    assert!(access.calls().is_empty());
}

#[test]
fn vanished_members_are_dropped_from_the_slot() {
    let access = RecordingAccess::new(library());
    access.insert(book_row(5, "Adam Bede"));
    let author = access.materialize(&author_row(1, "Eliot").with_many("books", ids(&[5, 9])));

    let books = author.related_many("books").unwrap();
    assert_eq!(books.len(), 1);
    assert!(author.is_fully_resolved());
    assert_eq!(author.relation_ids("books").unwrap(), ids(&[5]));
}

#[test]
fn zero_fetch_depth_leaves_slots_pending() {
    let access = RecordingAccess::with_fetch_limit(library(), 0);
    let author = author_with_two_books(&access);

    assert!(author.related_many("books").unwrap().is_empty());
    assert!(!author.resolve("books").unwrap());
    assert_eq!(author.relation_ids("books").unwrap(), ids(&[5, 7]));
    assert!(access.calls().is_empty());
}

#[test]
fn dropped_access_detaches_the_stand_in() {
    let access = RecordingAccess::new(library());
    let author = author_with_two_books(&access);
    drop(access);

    assert!(matches!(author.resolve("books"), Err(AccessError::Detached)));
    assert!(author.related_many("books").unwrap().is_empty());
    assert_eq!(author.relation_ids("books").unwrap(), ids(&[5, 7]));
}

#[test]
fn failed_fetch_is_retried_on_next_access() {
    let access = RecordingAccess::new(library());
    let book = access.materialize(&book_row(5, "Adam Bede").with_one("author", EntityId::new(1)));

    assert!(matches!(book.resolve("author"), Err(AccessError::NotFound { .. })));
    assert!(book.related_one("author").unwrap().is_none());
    assert!(!book.is_resolved("author").unwrap());
    assert_eq!(book.relation_ids("author").unwrap(), ids(&[1]));

    access.insert(author_row(1, "Eliot"));
    let author = book.related_one("author").unwrap().unwrap();
    assert_eq!(author.id(), EntityId::new(1));
    assert!(book.is_fully_resolved());
    assert_eq!(access.get_one_calls(), ids(&[1, 1, 1]));
}

#[test]
fn refused_owner_slot_cannot_be_cleared() {
    let access = RecordingAccess::with_fetch_limit(library(), 0);
    access.insert(author_row(1, "Eliot"));
    let book = access.materialize(&book_row(5, "Adam Bede").with_one("author", EntityId::new(1)));

    assert!(matches!(
        book.set_related("author", None),
        Err(AccessError::Unresolved { .. })
    ));
    assert_eq!(book.relation_ids("author").unwrap(), ids(&[1]));
    assert!(access.calls().is_empty());
}

#[test]
fn adding_to_a_pending_collection_keeps_the_pending_ids() {
    let access = RecordingAccess::new(library());
    let author = author_with_two_books(&access);
    let extra = access.materialize(&book_row(8, "Felix Holt"));

    author.add_related("books", &extra).unwrap();
    let books = author.related_many("books").unwrap();
    assert_eq!(books.len(), 3);
    assert!(extra.related_one("author").unwrap().unwrap().ptr_eq(&author));
}

fn tag_sequence(access: &Arc<RecordingAccess>, raw: &[i64]) -> LazySequence {
    for &id in raw {
        access.insert(tag_row(id, &format!("t{id}")));
    }
    LazySequence::new("Tag", ids(raw), access.handle())
}

#[test]
fn sequence_fetches_single_entries_then_the_rest_in_bulk() {
    let access = RecordingAccess::new(library());
    let mut sequence = tag_sequence(&access, &[1, 2, 3]);
    assert!(access.calls().is_empty());

    let second = sequence.get(1).unwrap();
    assert_eq!(second.id(), EntityId::new(2));
    assert_eq!(access.calls(), vec![AccessCall::One("Tag".into(), EntityId::new(2))]);

    sequence.fetch_all().unwrap();
    assert_eq!(
        access.calls(),
        vec![
            AccessCall::One("Tag".into(), EntityId::new(2)),
            AccessCall::Many("Tag".into(), ids(&[1, 3])),
        ]
    );
    assert!(sequence.is_fully_fetched());
    assert!(sequence.get(1).unwrap().ptr_eq(&second));
    assert_eq!(access.calls().len(), 2);
}

#[test]
fn sequence_keeps_entries_resolved_in_place() {
    let access = RecordingAccess::new(library());
    for id in [2, 3] {
        access.insert(tag_row(id, &format!("t{id}")));
    }
    let first = access.materialize(&tag_row(1, "t1"));
    let mut sequence = LazySequence::with_entries(
        "Tag",
        vec![None, Some(EntityId::new(2)), Some(EntityId::new(3))],
        vec![Some(first.clone()), None, None],
        access.handle(),
    )
    .unwrap();

    assert!(sequence.is_resolved(0));
    assert_eq!(sequence.outstanding_ids(), ids(&[2, 3]));
    sequence.fetch_all().unwrap();
    assert_eq!(access.get_many_calls(), vec![ids(&[2, 3])]);
    assert!(sequence.get(0).unwrap().ptr_eq(&first));
    assert!(access.get_one_calls().is_empty());
}

#[test]
fn sequence_entries_need_an_id_or_a_value() {
    let access = RecordingAccess::new(library());
    let missing = LazySequence::with_entries("Tag", vec![None], vec![None], access.handle());
    assert!(matches!(missing, Err(AccessError::InvalidOperation { .. })));

    let uneven = LazySequence::with_entries(
        "Tag",
        vec![Some(EntityId::new(1))],
        Vec::new(),
        access.handle(),
    );
    assert!(uneven.is_err());
}

#[test]
fn eager_iterator_fetches_once_lazy_iterator_per_entry() {
    let access = RecordingAccess::new(library());
    let mut eager = tag_sequence(&access, &[1, 2, 3]);
    assert_eq!(eager.to_vec().len(), 3);
    assert_eq!(access.get_many_calls(), vec![ids(&[1, 2, 3])]);
    assert!(access.get_one_calls().is_empty());

    access.reset_calls();
    let mut lazy = tag_sequence(&access, &[1, 2, 3]).with_lazy_iterator(true);
    let first = lazy.iter().next().unwrap();
    assert_eq!(first.id(), EntityId::new(1));
    assert_eq!(access.get_one_calls(), ids(&[1]));
    assert!(access.get_many_calls().is_empty());
}

#[test]
fn lookups_never_fetch() {
    let access = RecordingAccess::new(library());
    let mut sequence = tag_sequence(&access, &[1, 2, 2, 3]);
    let needle = access.materialize(&tag_row(2, "t2"));

    assert!(sequence.contains(&needle));
    assert_eq!(sequence.index_of(&needle), Some(1));
    assert_eq!(sequence.last_index_of(&needle), Some(2));
    assert!(access.calls().is_empty());

    assert!(sequence.remove_entity(&needle));
    assert_eq!(sequence.outstanding_ids(), ids(&[1, 2, 3]));
}

#[test]
fn mutation_keeps_outstanding_entries() {
    let access = RecordingAccess::new(library());
    let mut sequence = tag_sequence(&access, &[1, 2, 3]);
    let extra = access.materialize(&tag_row(9, "new"));

    sequence.push(extra.clone());
    sequence.insert(0, extra.clone());
    assert_eq!(sequence.len(), 5);
    assert!(sequence.is_resolved(0));
    assert!(!sequence.is_resolved(1));

    let removed = sequence.remove(2).unwrap();
    assert_eq!(removed.id(), EntityId::new(2));
    assert_eq!(access.get_one_calls(), ids(&[2]));

    let sub = sequence.sub_sequence(1..3);
    assert_eq!(sub.outstanding_ids(), ids(&[1, 3]));

    sequence.clear();
    assert!(sequence.is_empty());
    assert!(sequence.is_fully_fetched());
}

#[test]
fn bulk_operations_are_unsupported() {
    let access = RecordingAccess::new(library());
    let mut sequence = tag_sequence(&access, &[1, 2]);
    assert!(matches!(
        sequence.contains_all(&[]),
        Err(AccessError::Unsupported { operation: "contains_all" })
    ));
    assert!(matches!(sequence.remove_all(&[]), Err(AccessError::Unsupported { .. })));
    assert!(matches!(sequence.retain_all(&[]), Err(AccessError::Unsupported { .. })));
    assert!(access.calls().is_empty());
}
