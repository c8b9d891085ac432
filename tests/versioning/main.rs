//! Integration tests for versioned documents (save, delete, remove, restore, retargeting).


use serde_json::json;
use versioned_rust::{
    DocumentClass, DocumentError, DocumentStore, DocumentType, DocumentsExt,
    InMemoryDocumentStore, Namespace, Query, StorageError, ValidationError, VersioningOptions,
};

use documents::{Bookmark, MyDoc, Page, Ticket};
use failing_store::{FailingStore, RacingStore};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn primary() -> Namespace {
    Namespace::new("test", "mongokit")
}

fn history() -> Namespace {
    Namespace::new("test", "versioned_mongokit")
}

#[test]
fn save_versioning() {
    init_tracing();
    let store = InMemoryDocumentStore::new();
    let docs = store.versioned::<MyDoc>().unwrap();

    let mut doc = docs.create().unwrap();
    doc.set("_id", "mydoc");
    doc.set("foo", "bla");
    assert_eq!(doc.save().unwrap(), 1);
    assert_eq!(doc["_revision"], 1);
    assert_eq!(doc.get_last_revision_id().unwrap(), 1);
    assert_eq!(
        doc.get_revision(1).unwrap().unwrap(),
        json!({"_id": "mydoc", "foo": "bla", "_revision": 1})
    );

    doc.set("foo", "bar");
    assert_eq!(doc.save().unwrap(), 2);
    assert_eq!(doc.get_last_revision_id().unwrap(), 2);
    assert_eq!(doc.get_revision(1).unwrap().unwrap()["foo"], "bla");
    assert_eq!(doc.get_revision(2).unwrap().unwrap()["foo"], "bar");
    assert!(doc.get_revision(3).unwrap().is_none());

    assert_eq!(
        store.find_one(&primary(), "mydoc").unwrap().unwrap(),
        json!({"_id": "mydoc", "foo": "bar", "_revision": 2})
    );

    let stored = store.dump(&history()).unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0]["id"], "mydoc");
    assert_eq!(stored[0]["revision"], 1);
    assert_eq!(
        stored[1]["doc"],
        json!({"_id": "mydoc", "foo": "bar", "_revision": 2})
    );

    let revisions: Vec<_> = doc
        .get_revisions()
        .unwrap()
        .map(|revision| revision.unwrap()["foo"].clone())
        .collect();
    assert_eq!(revisions, vec![json!("bla"), json!("bar")]);
}

#[test]
fn save_without_id() {
    let store = InMemoryDocumentStore::new();
    let docs = store.versioned::<MyDoc>().unwrap();

    let mut doc = docs.create().unwrap();
    doc.set("foo", "bla");
    assert_eq!(doc.save().unwrap(), 1);

    let id = doc.id().unwrap().to_string();
    assert!(!id.is_empty());
    assert_eq!(
        store.find_one(&primary(), &id).unwrap().unwrap(),
        json!({"_id": id.as_str(), "foo": "bla", "_revision": 1})
    );
    let history = docs.history().unwrap();
    let records = history.records(&id).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].doc["_id"], id.as_str());

    let loaded = docs.get_from_id(&id).unwrap().unwrap();
    assert_eq!(loaded["foo"], "bla");
    assert_eq!(loaded.get_last_revision_id().unwrap(), 1);
}

#[test]
fn delete_keeps_history() {
    let store = InMemoryDocumentStore::new();
    let docs = store.versioned::<MyDoc>().unwrap();

    let mut doc = docs.create().unwrap();
    doc.set("_id", "mydoc");
    doc.set("foo", "bla");
    doc.save().unwrap();
    doc.set("foo", "bar");
    doc.save().unwrap();

    assert!(doc.delete().unwrap());
    assert!(store.find_one(&primary(), "mydoc").unwrap().is_none());
    assert_eq!(doc.history().count("mydoc").unwrap(), 2);

    // a deleted document can still be brought back
    let mut revived = doc.restore(1).unwrap();
    assert_eq!(revived.save().unwrap(), 3);
    assert_eq!(
        store.find_one(&primary(), "mydoc").unwrap().unwrap(),
        json!({"_id": "mydoc", "foo": "bla", "_revision": 3})
    );
}

#[test]
fn delete_with_history() {
    let store = InMemoryDocumentStore::new();
    let docs = store.versioned::<MyDoc>().unwrap();

    let mut doc = docs.create().unwrap();
    doc.set("_id", "mydoc");
    doc.save().unwrap();
    doc.save().unwrap();

    let mut other = docs.create().unwrap();
    other.set("_id", "other");
    other.save().unwrap();

    assert!(doc.delete_with_history().unwrap());
    assert_eq!(doc.history().count("mydoc").unwrap(), 0);
    assert_eq!(doc.history().count("other").unwrap(), 1);
    assert_eq!(doc.get_revisions().unwrap().count(), 0);
}

#[test]
fn remove_with_history() {
    let store = InMemoryDocumentStore::new();
    let docs = store.versioned::<MyDoc>().unwrap();

    for (id, saves) in [("a", 1), ("b", 2), ("c", 3)] {
        let mut doc = docs.create().unwrap();
        doc.set("_id", id);
        doc.set("foo", "bla");
        for _ in 0..saves {
            doc.save().unwrap();
        }
    }
    let mut keep = docs.create().unwrap();
    keep.set("_id", "keep");
    keep.set("foo", "other");
    keep.save().unwrap();
    keep.save().unwrap();

    assert_eq!(store.dump(&history()).unwrap().len(), 8);
    let removed = docs
        .remove_with_history(&Query::new().eq("foo", "bla"))
        .unwrap();
    assert_eq!(removed, 3);

    assert_eq!(docs.count(&Query::new().eq("foo", "bla")).unwrap(), 0);
    let history = docs.history().unwrap();
    for id in ["a", "b", "c"] {
        assert_eq!(history.count(id).unwrap(), 0);
    }
    assert_eq!(history.count("keep").unwrap(), 2);
    assert_eq!(docs.count(&Query::all()).unwrap(), 1);
}

#[test]
fn remove_keeps_history() {
    let store = InMemoryDocumentStore::new();
    let docs = store.versioned::<MyDoc>().unwrap();

    for id in ["a", "b"] {
        let mut doc = docs.create().unwrap();
        doc.set("_id", id);
        doc.set("foo", "bla");
        doc.save().unwrap();
    }

    assert_eq!(docs.remove(&Query::new().eq("foo", "bla")).unwrap(), 2);
    assert_eq!(docs.count(&Query::all()).unwrap(), 0);
    assert_eq!(store.dump(&history()).unwrap().len(), 2);
}

#[test]
fn remove_from_instance_uses_its_history_target() {
    let store = InMemoryDocumentStore::new();
    let docs = store.versioned::<MyDoc>().unwrap();
    let options = VersioningOptions::new().collection("versioned_mongokit2");

    let mut doc = docs.create_with(options.clone()).unwrap();
    doc.set("_id", "mydoc");
    doc.set("foo", "bla");
    doc.save().unwrap();

    let removed = doc.remove_with_history(&Query::new().eq("foo", "bla")).unwrap();
    assert_eq!(removed, 1);
    assert!(store
        .dump(&Namespace::new("test", "versioned_mongokit2"))
        .unwrap()
        .is_empty());
}

#[test]
fn dynamic_versioning_database() {
    let store = InMemoryDocumentStore::new();
    let docs = store.versioned::<MyDoc>().unwrap();

    let mut doc = docs
        .create_with(VersioningOptions::new().database("versioned_test"))
        .unwrap();
    doc.set("_id", "mydoc");
    doc.set("foo", "bla");
    doc.save().unwrap();

    let target = Namespace::new("versioned_test", "versioned_mongokit");
    assert_eq!(doc.history_target(), &target);
    assert_eq!(store.dump(&target).unwrap().len(), 1);
    assert!(store.dump(&history()).unwrap().is_empty());

    // the class default is unaffected
    let mut plain = docs.create().unwrap();
    plain.set("_id", "plain");
    plain.save().unwrap();
    assert_eq!(store.dump(&history()).unwrap().len(), 1);
}

#[test]
fn dynamic_versioning_collection() {
    let store = InMemoryDocumentStore::new();
    let docs = store.versioned::<MyDoc>().unwrap();

    let mut doc = docs
        .create_with(VersioningOptions::new().collection("versioned_mongokit2"))
        .unwrap();
    doc.set("_id", "mydoc");
    doc.set("foo", "bla");
    doc.save().unwrap();
    doc.set("foo", "bar");
    doc.save().unwrap();

    let target = Namespace::new("test", "versioned_mongokit2");
    assert_eq!(store.dump(&target).unwrap().len(), 2);
    assert!(store.dump(&history()).unwrap().is_empty());

    // loading with the same options finds the same history
    let loaded = docs
        .get_from_id_with("mydoc", VersioningOptions::new().collection("versioned_mongokit2"))
        .unwrap()
        .unwrap();
    assert_eq!(loaded.get_revision(1).unwrap().unwrap()["foo"], "bla");
}

#[test]
fn class_level_versioning_database() {
    let store = InMemoryDocumentStore::new();
    let pages = store.versioned::<Page>().unwrap();

    let mut page = pages.create().unwrap();
    page.set("title", "Home");
    page.set("views", 3);
    page.save().unwrap();

    let target = Namespace::new("archive", "page_history");
    assert_eq!(page.history_target(), &target);
    assert_eq!(store.dump(&target).unwrap().len(), 1);
    assert_eq!(store.dump(&Namespace::new("test", "pages")).unwrap().len(), 1);

    let mut elsewhere = pages
        .create_with(VersioningOptions::new().database("tenant_a"))
        .unwrap();
    elsewhere.set("title", "Other");
    elsewhere.save().unwrap();
    assert_eq!(
        elsewhere.history_target(),
        &Namespace::new("tenant_a", "page_history")
    );
}

#[test]
fn declared_fields_are_validated() {
    let store = InMemoryDocumentStore::new();
    let pages = store.versioned::<Page>().unwrap();

    let mut page = pages.create().unwrap();
    page.set("views", 1);
    assert!(matches!(
        page.save(),
        Err(DocumentError::Validation(ValidationError::MissingField(_)))
    ));

    page.set("title", "Home");
    page.set("colour", "blue");
    assert!(matches!(
        page.save(),
        Err(DocumentError::Validation(ValidationError::UnknownField(_)))
    ));

    page.fields_mut().remove("colour");
    page.set("tags", json!(["a", "b"]));
    assert_eq!(page.save().unwrap(), 1);
    assert_eq!(store.dump(&Namespace::new("archive", "page_history")).unwrap().len(), 1);
}

#[test]
fn missing_versioning_collection_at_runtime() {
    let store = InMemoryDocumentStore::new();

    let err = DocumentClass::builder("test", "mongokit")
        .versioning()
        .build()
        .unwrap_err();
    assert!(matches!(err, DocumentError::Configuration(_)));

    let docs = store.versioned::<MyDoc>().unwrap();
    let err = docs
        .create_with(VersioningOptions::new().collection(""))
        .err()
        .unwrap();
    assert!(matches!(err, DocumentError::Configuration(_)));

    let err = docs
        .create_with(VersioningOptions::new().collection("mongokit"))
        .err()
        .unwrap();
    assert!(matches!(err, DocumentError::Configuration(_)));
}

#[test]
fn restore_forks_forward() {
    let store = InMemoryDocumentStore::new();
    let docs = store.versioned::<MyDoc>().unwrap();

    let mut doc = docs.create().unwrap();
    doc.set("_id", "mydoc");
    doc.set("foo", "bla");
    doc.save().unwrap();
    doc.set("foo", "bar");
    doc.save().unwrap();

    let mut restored = doc.restore(1).unwrap();
    assert_eq!(restored["_revision"], 1);
    assert_eq!(restored.save().unwrap(), 3);
    assert_eq!(
        restored.get_revision(3).unwrap().unwrap(),
        json!({"_id": "mydoc", "foo": "bla", "_revision": 3})
    );
    // the past is unchanged
    assert_eq!(
        restored.get_revision(1).unwrap().unwrap(),
        json!({"_id": "mydoc", "foo": "bla", "_revision": 1})
    );

    let loaded = docs.get_from_id("mydoc").unwrap().unwrap();
    assert_eq!(loaded.get_last_revision_id().unwrap(), 3);
    assert_eq!(loaded.get_revisions().unwrap().count(), 3);

    // the stale instance continues after the restored save too
    assert_eq!(doc.save().unwrap(), 4);
}

#[test]
fn restore_via_get_revision() {
    let store = InMemoryDocumentStore::new();
    let docs = store.versioned::<MyDoc>().unwrap();

    let mut doc = docs.create().unwrap();
    doc.set("_id", "mydoc");
    doc.set("foo", "bla");
    doc.save().unwrap();
    doc.set("foo", "bar");
    doc.save().unwrap();

    let snapshot = doc.get_revision(1).unwrap().unwrap();
    let mut restored = docs.from_document(snapshot).unwrap();
    assert_eq!(restored.save().unwrap(), 3);
    assert_eq!(restored["foo"], "bla");
}

#[test]
fn revisions_are_restartable() {
    let store = InMemoryDocumentStore::new();
    let docs = store.versioned::<MyDoc>().unwrap();

    let mut doc = docs.create().unwrap();
    doc.set("_id", "mydoc");
    for n in 0..3 {
        doc.set("n", n);
        doc.save().unwrap();
    }

    let mut revisions = doc.get_revisions().unwrap();
    let again = revisions.clone();
    assert_eq!(revisions.by_ref().count(), 3);
    assert_eq!(revisions.next().map(|r| r.is_ok()), None);

    revisions.restart();
    let numbers: Vec<_> = revisions
        .map(|revision| revision.unwrap().revision().unwrap())
        .collect();
    assert_eq!(numbers, vec![1, 2, 3]);
    assert_eq!(again.count(), 3);
}

#[test]
fn failed_history_write_is_reported() {
    init_tracing();
    let store = FailingStore::new();
    let docs = store.versioned::<MyDoc>().unwrap();

    let mut doc = docs.create().unwrap();
    doc.set("_id", "mydoc");
    doc.set("foo", "bla");
    doc.save().unwrap();

    store.fail_inserts(history());
    doc.set("foo", "bar");
    let err = doc.save().unwrap_err();
    assert!(matches!(
        err,
        DocumentError::Storage(StorageError::Backend(_))
    ));
    // primary is one revision ahead, the instance is not
    assert_eq!(
        store.inner().find_one(&primary(), "mydoc").unwrap().unwrap()["_revision"],
        2
    );
    assert_eq!(doc["_revision"], 1);
    assert_eq!(doc.history().count("mydoc").unwrap(), 1);

    // the next successful save records the missing revision
    store.heal();
    assert_eq!(doc.save().unwrap(), 2);
    assert_eq!(doc.get_revision(2).unwrap().unwrap()["foo"], "bar");
    assert_eq!(doc.history().count("mydoc").unwrap(), 2);
}

#[test]
fn concurrent_revision_is_a_conflict() {
    let store = RacingStore::new(primary(), history());
    let docs = store.versioned::<MyDoc>().unwrap();

    let mut doc = docs.create().unwrap();
    doc.set("_id", "mydoc");
    doc.set("foo", "bla");
    let err = doc.save().unwrap_err();
    assert_eq!(
        err,
        DocumentError::RevisionConflict {
            id: "mydoc".into(),
            revision: 1
        }
    );
    assert!(doc.get("_revision").is_none());

    // the competing record is kept, not overwritten
    let stored = doc.get_revision(1).unwrap().unwrap();
    assert_eq!(stored["writer"], "other");
    assert_eq!(store.inner().dump(&history()).unwrap().len(), 1);

    // the primary was already written and matches no history record
    let primary_doc = store.inner().find_one(&primary(), "mydoc").unwrap().unwrap();
    assert_eq!(primary_doc, json!({"_id": "mydoc", "foo": "bla", "_revision": 1}));
    assert_ne!(primary_doc, stored);
}

#[test]
fn plain_documents_are_not_versioned() {
    let store = InMemoryDocumentStore::new();
    let bookmarks = store.documents::<Bookmark>().unwrap();

    let mut bookmark = bookmarks.create();
    bookmark.set("url", "https://example.org");
    bookmark.set("score", 4);
    bookmark.save().unwrap();

    let id = bookmark.id().unwrap().to_string();
    let stored = store
        .find_one(&Namespace::new("test", "bookmarks"), &id)
        .unwrap()
        .unwrap();
    assert!(stored.get("_revision").is_none());
    assert_eq!(store.namespaces().unwrap().len(), 1);
    assert!(store.versioned_repository(Bookmark::class().unwrap()).is_err());
}

#[test]
fn unrecognised_field_types_accept_any_value() {
    let store = InMemoryDocumentStore::new();
    let tickets = store.versioned::<Ticket>().unwrap();

    let mut ticket = tickets.create().unwrap();
    ticket.set("status", "open");
    ticket.set("assignee", "0b6f1a8e-3c55-4b7e-9a7e-5d0c2f4e1a11");
    assert_eq!(ticket.save().unwrap(), 1);

    ticket.set("status", 3);
    assert_eq!(ticket.save().unwrap(), 2);
}
