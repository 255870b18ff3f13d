use super::*;
use crate::tests::test_util;
use crate::{assert_err, assert_ok};
use tempfile::tempdir;

#[test]
fn save_then_read_round_trips_exact_bytes() {
    test_util::setup();
    let dir = tempdir().unwrap();
    let store = BlobStore::new(dir.path());

    let payload = b"0123456789";
    let saved = assert_ok!(store.save("a.txt", payload));

    assert!(saved.path.starts_with("/uploads/"));
    assert_eq!(saved.size, payload.len());
    assert_eq!(assert_ok!(store.read(&saved.path)), payload);
}

#[test]
fn save_creates_uploads_dir_when_absent() {
    test_util::setup();
    let dir = tempdir().unwrap();
    let store = BlobStore::new(dir.path().join("nested").join("data"));

    let saved = store.save("report.pdf", b"pdf bytes").unwrap();
    assert!(store.exists(&saved.path));
}

#[test]
fn ensure_root_tolerates_existing_dir() {
    test_util::setup();
    let dir = tempdir().unwrap();
    let store = BlobStore::new(dir.path());

    store.ensure_root().unwrap();
    store.ensure_root().unwrap();
}

#[test]
fn identical_filenames_get_distinct_paths() {
    test_util::setup();
    let dir = tempdir().unwrap();
    let store = BlobStore::new(dir.path());

    let first = store.save("dup.txt", b"one").unwrap();
    let second = store.save("dup.txt", b"two").unwrap();

    assert_ne!(first.path, second.path);
    assert_eq!(store.read(&first.path).unwrap(), b"one");
    assert_eq!(store.read(&second.path).unwrap(), b"two");
}

#[test]
fn unique_name_sanitizes_original() {
    let name = unique_name("my report (final).pdf");
    assert!(name.ends_with("my_report__final_.pdf"));
    assert!(!name.contains(' '));
    assert!(!name.contains('('));
}

#[test]
fn sanitize_keeps_dots_and_hyphens() {
    assert_eq!(sanitize_filename("a-b.c.txt"), "a-b.c.txt");
    assert_eq!(sanitize_filename("../../etc/passwd"), ".._.._etc_passwd");
    assert_eq!(sanitize_filename("snÖw man.png"), "sn_w_man.png");
}

#[test]
fn read_missing_blob_is_file_missing_not_storage_error() {
    test_util::setup();
    let dir = tempdir().unwrap();
    let store = BlobStore::new(dir.path());

    let err = assert_err!(store.read("/uploads/never-written.bin"));
    assert!(matches!(err, ApiError::FileMissing(_)));
}

#[test]
fn delete_reports_explicit_outcomes() {
    test_util::setup();
    let dir = tempdir().unwrap();
    let store = BlobStore::new(dir.path());

    let saved = store.save("gone.txt", b"bye").unwrap();
    assert!(matches!(store.delete(&saved.path), BlobDeletion::Removed));
    assert!(!store.exists(&saved.path));
    // Second delete of the same reference is a Missing, not a failure.
    assert!(matches!(store.delete(&saved.path), BlobDeletion::Missing));
}

#[test]
fn resolve_agrees_with_save_location() {
    test_util::setup();
    let dir = tempdir().unwrap();
    let store = BlobStore::new(dir.path());

    let saved = store.save("where.txt", b"x").unwrap();
    let resolved = store.resolve(&saved.path);
    assert!(resolved.starts_with(dir.path()));
    assert!(resolved.is_file());
}
