use std::fs;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use artist_catalog::domain::{ArtistRecord, ImageRef, RecordId};
use artist_catalog::error::CatalogError;
use artist_catalog::store::{Store, sanitize_file_name};

fn record(id: u64, name: &str) -> ArtistRecord {
    ArtistRecord {
        id: RecordId::new(id),
        name: name.to_string(),
        artist_ids: vec![format!("id{id}")],
        training_counts: vec![1],
        preview_image: ImageRef::artist_placeholder(),
        sample_images: Vec::new(),
        tags: Vec::new(),
        trigger_words: Vec::new(),
        style_description: String::new(),
        create_time: "2024-05-01".to_string(),
    }
}

fn open_store() -> (tempfile::TempDir, Store) {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().join("images")).unwrap();
    (temp, Store::open(root).unwrap())
}

#[test]
fn open_creates_directory_and_placeholders() {
    let (_temp, store) = open_store();
    assert!(store.root().join("placeholder-artist.png").as_std_path().is_file());
    assert!(store.root().join("placeholder-sample.png").as_std_path().is_file());
    assert!(store.list_records().unwrap().is_empty());
}

#[test]
fn document_named_after_record() {
    let (_temp, store) = open_store();
    let path = store.write_record(&record(42, "A/B: C?")).unwrap();
    assert!(path.ends_with("A_B_ C_-42.json"));
    assert_eq!(sanitize_file_name(r#"a\b*c"d<e>f|g"#), "a_b_c_d_e_f_g");
}

#[test]
fn rename_replaces_old_document() {
    let (_temp, store) = open_store();
    store.write_record(&record(7, "Old")).unwrap();
    store.write_record(&record(17, "Other")).unwrap();
    store.write_record(&record(7, "New")).unwrap();

    assert!(!store.root().join("Old-7.json").as_std_path().exists());
    assert!(store.root().join("Other-17.json").as_std_path().exists());
    let names = store
        .list_records()
        .unwrap()
        .into_iter()
        .map(|record| record.name)
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["New", "Other"]);
}

#[test]
fn failed_rename_keeps_previous_document() {
    let (_temp, store) = open_store();
    store.write_record(&record(7, "Old")).unwrap();

    let too_long = record(7, &"x".repeat(300));
    assert!(store.write_record(&too_long).is_err());

    assert!(store.root().join("Old-7.json").as_std_path().is_file());
    let records = store.list_records().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "Old");
}

#[test]
fn malformed_documents_are_skipped() {
    let (_temp, store) = open_store();
    store.write_record(&record(1, "Good")).unwrap();
    fs::write(store.root().join("Broken-2.json").as_std_path(), "{not json").unwrap();
    fs::write(store.root().join("notes.txt").as_std_path(), "ignored").unwrap();

    let records = store.list_records().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "Good");
}

#[test]
fn remove_and_find_missing() {
    let (_temp, store) = open_store();
    store.write_record(&record(3, "Gone")).unwrap();
    store.remove_record(RecordId::new(3)).unwrap();

    assert_matches!(
        store.find_record(RecordId::new(3)),
        Err(CatalogError::RecordNotFound(_))
    );
    assert_matches!(
        store.remove_record(RecordId::new(3)),
        Err(CatalogError::RecordNotFound(_))
    );
}

#[test]
fn next_id_skips_taken_ids() {
    let (_temp, store) = open_store();
    let first = store.next_id().unwrap();
    store.write_record(&record(first.as_u64(), "Foo")).unwrap();
    let second = store.next_id().unwrap();
    assert_ne!(first, second);
}
