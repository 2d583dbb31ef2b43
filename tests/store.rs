use chrono::{DateTime, Utc};
use doc_sync::{DocStore, Document, Error};
use serde_json::json;

fn scratch() -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.json");
    (dir, path)
}

fn stamp_millis(doc: &Document) -> i64 {
    DateTime::parse_from_rfc3339(doc.last_modified.as_deref().unwrap())
        .unwrap()
        .timestamp_millis()
}

// ---- first read seeds ------------------------------------------------------

#[test]
fn first_read_seeds_and_persists() {
    let (_dir, path) = scratch();
    let store = DocStore::open(&path);
    assert!(!path.exists());

    let doc = store.read().unwrap();
    assert!(path.exists());
    assert_eq!(doc.config["stats"]["members"], json!(1));
    assert_eq!(doc.config["stats"]["visits"], json!(0));
    assert_eq!(doc.config["particleImage"], json!(null));
    assert!(doc.contact_requests.is_empty());
    assert!(doc.last_modified.is_some());
}

#[test]
fn second_read_returns_same_seed() {
    let (_dir, path) = scratch();
    let store = DocStore::open(&path);

    let first = store.read().unwrap();
    let second = store.read().unwrap();
    assert_eq!(first, second);
}

#[test]
fn custom_seed() {
    let (_dir, path) = scratch();
    let mut seed = Document::default();
    seed.config.insert("greeting".into(), json!("hello"));
    let store = DocStore::builder(&path).seed(seed).build();

    let doc = store.read().unwrap();
    assert_eq!(doc.config["greeting"], json!("hello"));
}

// ---- replace ---------------------------------------------------------------

#[test]
fn replace_then_read_roundtrip() {
    let (_dir, path) = scratch();
    let store = DocStore::open(&path);

    let before = Utc::now().timestamp_millis();
    let mut doc = Document::default();
    doc.config.insert("theme".into(), json!("dark"));
    doc.contact_requests.push(json!({"name": "ada"}));
    doc.extra.insert("announcement".into(), json!("hi"));
    store.replace(doc).unwrap();

    let read = store.read().unwrap();
    assert_eq!(read.config["theme"], json!("dark"));
    assert_eq!(read.contact_requests, vec![json!({"name": "ada"})]);
    assert_eq!(read.extra["announcement"], json!("hi"));
    assert!(stamp_millis(&read) >= before);
}

#[test]
fn replace_drops_prior_content() {
    let (_dir, path) = scratch();
    let store = DocStore::open(&path);
    store.read().unwrap(); // seed with the default stats

    store.replace(Document::default()).unwrap();
    let read = store.read().unwrap();
    assert!(read.config.is_empty());
    assert!(read.extra.is_empty());
}

// ---- section update --------------------------------------------------------

#[test]
fn update_section_changes_only_that_field() {
    let (_dir, path) = scratch();
    let store = DocStore::open(&path);
    let before = store.read().unwrap();

    let updated = store
        .update_section("contactRequests", json!([{"name": "ada"}]))
        .unwrap();
    assert_eq!(updated.contact_requests, vec![json!({"name": "ada"})]);
    assert_eq!(updated.config, before.config);
    assert_ne!(updated.last_modified, before.last_modified);
}

#[test]
fn update_unknown_section_lands_in_extras() {
    let (_dir, path) = scratch();
    let store = DocStore::open(&path);

    store.update_section("announcement", json!("hi")).unwrap();
    let read = store.read().unwrap();
    assert_eq!(read.extra["announcement"], json!("hi"));
}

#[test]
fn update_section_rejects_mistyped_value() {
    let (_dir, path) = scratch();
    let store = DocStore::open(&path);
    let before = store.read().unwrap();

    let err = store
        .update_section("contactRequests", json!("not a list"))
        .unwrap_err();
    assert!(matches!(err, Error::Deserialize(_)));
    // the file is untouched on rejection
    assert_eq!(store.read().unwrap(), before);
}

// ---- persistence texture ---------------------------------------------------

#[test]
fn persists_pretty_by_default() {
    let (_dir, path) = scratch();
    let store = DocStore::open(&path);
    store.read().unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(raw.contains('\n'));
    assert!(raw.contains("  "));
}

#[test]
fn compact_when_asked() {
    let (_dir, path) = scratch();
    let store = DocStore::builder(&path).pretty(false).build();
    store.read().unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(!raw.contains('\n'));
}

#[test]
fn survives_reopen() {
    let (_dir, path) = scratch();
    {
        let store = DocStore::open(&path);
        store.update_section("config", json!({"theme": "dark"})).unwrap();
    }
    let store = DocStore::open(&path);
    assert_eq!(store.read().unwrap().config["theme"], json!("dark"));
}

#[test]
fn path_accessor() {
    let (_dir, path) = scratch();
    let store = DocStore::open(&path);
    assert_eq!(store.path(), path.as_path());
}

// ---- debug -----------------------------------------------------------------

#[test]
fn debug_impls_dont_panic() {
    let (_dir, path) = scratch();
    let store = DocStore::open(&path);
    assert!(format!("{store:?}").contains("DocStore"));

    let builder = DocStore::builder(&path);
    assert!(format!("{builder:?}").contains("DocStoreBuilder"));
}
