use doc_sync::{Document, LocalCache};
use serde_json::json;

fn scratch() -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.json");
    (dir, path)
}

// ---- key-value behavior ----------------------------------------------------

#[test]
fn set_get_remove() {
    let (_dir, path) = scratch();
    let cache = LocalCache::open(&path).unwrap();

    assert_eq!(cache.get_item("config"), None);
    cache.set_item("config", r#"{"theme":"dark"}"#).unwrap();
    assert_eq!(cache.get_item("config").as_deref(), Some(r#"{"theme":"dark"}"#));

    let prev = cache.remove_item("config").unwrap();
    assert_eq!(prev.as_deref(), Some(r#"{"theme":"dark"}"#));
    assert_eq!(cache.get_item("config"), None);
}

#[test]
fn writes_are_flushed_immediately() {
    let (_dir, path) = scratch();
    let cache = LocalCache::open(&path).unwrap();
    cache.set_item("config", "{}").unwrap();

    // a second handle on the same file sees the write
    let reopened = LocalCache::open(&path).unwrap();
    assert_eq!(reopened.get_item("config").as_deref(), Some("{}"));
}

#[test]
fn missing_file_starts_empty() {
    let (_dir, path) = scratch();
    let cache = LocalCache::open(&path).unwrap();
    assert_eq!(cache.get_item("anything"), None);
}

// ---- document assembly -----------------------------------------------------

#[test]
fn document_defaults_when_keys_absent() {
    let (_dir, path) = scratch();
    let cache = LocalCache::open(&path).unwrap();

    let doc = cache.document();
    assert!(doc.config.is_empty());
    assert!(doc.contact_requests.is_empty());
    assert!(doc.last_modified.is_some());
}

#[test]
fn document_defaults_when_keys_unparseable() {
    let (_dir, path) = scratch();
    let cache = LocalCache::open(&path).unwrap();
    cache.set_item("config", "not json").unwrap();
    cache.set_item("contactRequests", "also not json").unwrap();

    let doc = cache.document();
    assert!(doc.config.is_empty());
    assert!(doc.contact_requests.is_empty());
}

#[test]
fn store_document_mirrors_sections_separately() {
    let (_dir, path) = scratch();
    let cache = LocalCache::open(&path).unwrap();

    let mut doc = Document::default();
    doc.config.insert("theme".into(), json!("dark"));
    doc.contact_requests.push(json!({"name": "ada"}));
    doc.last_modified = Some("2026-01-01T00:00:00.000Z".into());
    cache.store_document(&doc).unwrap();

    let config: serde_json::Value =
        serde_json::from_str(&cache.get_item("config").unwrap()).unwrap();
    assert_eq!(config["theme"], json!("dark"));
    let requests: serde_json::Value =
        serde_json::from_str(&cache.get_item("contactRequests").unwrap()).unwrap();
    assert_eq!(requests, json!([{"name": "ada"}]));
    // the stamp is never cached
    assert_eq!(cache.get_item("lastModified"), None);
}

#[test]
fn roundtrip_through_document() {
    let (_dir, path) = scratch();
    let cache = LocalCache::open(&path).unwrap();

    let mut doc = Document::default();
    doc.config.insert("theme".into(), json!("dark"));
    doc.contact_requests.push(json!({"name": "ada"}));
    cache.store_document(&doc).unwrap();

    let assembled = cache.document();
    assert_eq!(assembled.config, doc.config);
    assert_eq!(assembled.contact_requests, doc.contact_requests);
}
