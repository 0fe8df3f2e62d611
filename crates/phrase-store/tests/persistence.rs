use phrase_store::{Commit, PhraseStore, Section, StoreError};
use std::fs;
use tempfile::TempDir;

#[test]
fn accepted_phrase_survives_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let mut store = PhraseStore::open(dir.path()).unwrap();
        let mut commit = Commit::default();
        commit.push(Section::Improvements, "surfac allergen badg menu card", "allergen");
        commit.push(Section::MinorFriction, "fee breakdown hidden until review", "fees");
        commit.body = Some("## What Worked Well\n- fine".to_string());
        store.commit(commit).unwrap();
    }

    let reopened = PhraseStore::open(dir.path()).unwrap();
    assert!(reopened.contains(Section::Improvements, "surfac allergen badg menu card"));
    assert!(reopened.contains(Section::MinorFriction, "fee breakdown hidden until review"));
    assert_eq!(reopened.category_uses(Section::Improvements, "allergen"), 1);
    assert_eq!(reopened.bodies().len(), 1);
}

#[test]
fn every_mutation_is_flushed() {
    let dir = TempDir::new().unwrap();
    let mut store = PhraseStore::open(dir.path()).unwrap();
    store.record(Section::WorkedWell, "menu load quick", "speed").unwrap();

    let raw = fs::read_to_string(dir.path().join("worked_well.json")).unwrap();
    assert!(raw.contains("menu load quick"));
    assert!(dir.path().join("category_uses.json").exists());
    assert!(!dir.path().join("worked_well.json.tmp").exists());
}

#[test]
fn missing_directory_opens_empty() {
    let dir = TempDir::new().unwrap();
    let store = PhraseStore::open(dir.path().join("fresh")).unwrap();
    assert_eq!(store.phrase_count(Section::Improvements), 0);
    assert!(store.bodies().is_empty());
}

#[test]
fn corrupt_table_is_reported() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("improvements.json"), "{not json").unwrap();
    let err = PhraseStore::open(dir.path()).unwrap_err();
    assert!(matches!(err, StoreError::Corrupt { .. }));
}
