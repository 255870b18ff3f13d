//! End-to-end checks for the attachment blob store against a real
//! filesystem: durable write before reference handout, round-trip
//! identity, and best-effort deletion outcomes.

use tempfile::tempdir;
use ticketserver::shared::error::ApiError;
use ticketserver::storage::{BlobDeletion, BlobStore};

#[test]
fn uploaded_bytes_are_readable_immediately_and_identical() {
    let dir = tempdir().unwrap();
    let store = BlobStore::new(dir.path());

    let payload: Vec<u8> = (0u8..=255).cycle().take(64 * 1024).collect();
    let saved = store.save("blob.bin", &payload).unwrap();

    assert_eq!(saved.size, payload.len());
    assert_eq!(store.read(&saved.path).unwrap(), payload);
}

#[test]
fn references_use_the_canonical_uploads_root() {
    let dir = tempdir().unwrap();
    let store = BlobStore::new(dir.path());

    let saved = store.save("a.txt", b"0123456789").unwrap();

    assert!(saved.path.starts_with("/uploads/"));
    // The physical file sits under <data_dir>/uploads/, resolved through
    // the same helper reads and deletes use.
    let resolved = store.resolve(&saved.path);
    assert!(resolved.starts_with(dir.path().join("uploads")));
    assert!(resolved.is_file());
}

#[test]
fn concurrent_style_duplicate_names_never_collide() {
    let dir = tempdir().unwrap();
    let store = BlobStore::new(dir.path());

    let mut paths = std::collections::HashSet::new();
    for i in 0..50 {
        let saved = store.save("same-name.txt", format!("body {}", i).as_bytes()).unwrap();
        assert!(paths.insert(saved.path), "duplicate reference generated");
    }
}

#[test]
fn deleting_a_manually_removed_blob_is_tolerated() {
    let dir = tempdir().unwrap();
    let store = BlobStore::new(dir.path());

    let saved = store.save("victim.txt", b"bytes").unwrap();
    std::fs::remove_file(store.resolve(&saved.path)).unwrap();

    // Metadata-side deletion continues regardless; the store just reports
    // that the blob was already gone.
    assert!(matches!(store.delete(&saved.path), BlobDeletion::Missing));
}

#[test]
fn reading_a_manually_removed_blob_is_file_missing() {
    let dir = tempdir().unwrap();
    let store = BlobStore::new(dir.path());

    let saved = store.save("victim.txt", b"bytes").unwrap();
    std::fs::remove_file(store.resolve(&saved.path)).unwrap();

    match store.read(&saved.path) {
        Err(ApiError::FileMissing(_)) => {}
        other => panic!("expected FileMissing, got {:?}", other.map(|b| b.len())),
    }
}
