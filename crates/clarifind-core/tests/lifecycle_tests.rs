//! Lab result lifecycle integration tests.

use std::io::Write;

use chrono::{Duration, Utc};
use clarifind_core::db::{Database, StorageBackend};
use clarifind_core::models::find_doctor;
use clarifind_core::store::{is_reference, LabResultStore};
use clarifind_core::{LabResultPatch, ResultStatus, StoreError, UploadedFile};

fn pdf(name: &str) -> UploadedFile {
    UploadedFile::new(name, "application/pdf", b"%PDF-1.4 test".to_vec())
}

fn setup_store() -> LabResultStore<Database> {
    LabResultStore::new(Database::open_in_memory().unwrap())
}

#[test]
fn test_upload_review_and_send() {
    let store = setup_store();
    let doctor = find_doctor("doc-001").unwrap();

    let created = store.create(&pdf("CBC_Results.pdf"), "john.doe@email.com").unwrap();
    assert!(is_reference(&created.id));
    assert_eq!(created.status, ResultStatus::Pending);
    assert_eq!(created.test_type, "Complete Blood Count");

    let assigned = store.assign(&created.id, &doctor).unwrap().unwrap();
    assert_eq!(assigned.status, ResultStatus::InReview);
    assert_eq!(assigned.assigned_doctor.as_ref(), Some(&doctor));
    assert!(assigned.assigned_at.is_some());

    store.save_draft(&created.id, "Hemoglobin slightly low").unwrap();
    let sent = store
        .send_interpretation(&created.id, "Hemoglobin slightly low; recheck in 3 months.")
        .unwrap()
        .unwrap();
    assert_eq!(sent.status, ResultStatus::Completed);
    assert_eq!(
        sent.interpretation.as_deref(),
        Some("Hemoglobin slightly low; recheck in 3 months.")
    );
    assert!(sent.is_resolved());
}

#[test]
fn test_general_lab_test_fallback() {
    let store = setup_store();
    let created = store.create(&pdf("random_file.pdf"), "a@email.com").unwrap();
    assert_eq!(created.test_type, "General Lab Test");
}

#[test]
fn test_unassign_after_assign() {
    let store = setup_store();
    let id = store.create(&pdf("lipid.pdf"), "a@email.com").unwrap().id;

    store.assign(&id, &find_doctor("doc-002").unwrap()).unwrap();
    store.unassign(&id).unwrap();

    let result = store.get_by_id(&id).unwrap();
    assert_eq!(result.status, ResultStatus::Pending);
    assert!(result.assigned_doctor.is_none());
    assert!(result.assigned_at.is_none());
}

#[test]
fn test_sequential_assignments_keep_second() {
    let store = setup_store();
    let id = store.create(&pdf("tsh.pdf"), "a@email.com").unwrap().id;

    store.assign(&id, &find_doctor("doc-001").unwrap()).unwrap();
    store.assign(&id, &find_doctor("doc-003").unwrap()).unwrap();

    let result = store.get_by_id(&id).unwrap();
    assert_eq!(result.assigned_doctor.unwrap().id, "doc-003");
    assert!(store.by_doctor("doc-001").is_empty());
}

#[test]
fn test_empty_interpretation_leaves_record_unchanged() {
    let store = setup_store();
    let id = store.create(&pdf("a1c.pdf"), "a@email.com").unwrap().id;
    let before = store.get_by_id(&id).unwrap();

    assert!(matches!(
        store.send_interpretation(&id, ""),
        Err(StoreError::MissingInformation(_))
    ));
    assert_eq!(store.get_by_id(&id).unwrap(), before);
}

#[test]
fn test_fresh_includes_new_and_excludes_stale() {
    let store = setup_store();
    let now = Utc::now();
    let new = store.create_at(&pdf("new.pdf"), "a@email.com", now).unwrap();
    let stale = store
        .create_at(&pdf("old.pdf"), "b@email.com", now - Duration::hours(25))
        .unwrap();

    let fresh = store.fresh_at(now, None);
    assert!(fresh.iter().any(|r| r.id == new.id));
    assert!(!fresh.iter().any(|r| r.id == stale.id));
}

#[test]
fn test_collection_round_trip_preserves_order_and_merges() {
    let store = setup_store();
    let now = Utc::now();
    let mut expected = Vec::new();
    for (i, name) in ["cbc.pdf", "liver.pdf", "kidney.pdf"].iter().enumerate() {
        let at = now + Duration::milliseconds(i as i64 * 11);
        expected.push(store.create_at(&pdf(name), "a@email.com", at).unwrap());
    }

    let updated = store
        .update(&expected[1].id, LabResultPatch::default().interpretation("note"))
        .unwrap()
        .unwrap();
    expected[1] = updated;

    assert_eq!(store.get_all(), expected);
    assert_eq!(expected[1].file_name, "liver.pdf");
    assert_eq!(expected[1].test_type, "Liver Function");
}

#[test]
fn test_persisted_layout() {
    let store = setup_store();
    let id = store.create(&pdf("cbc.pdf"), "a@email.com").unwrap().id;

    let raw = store
        .backend()
        .get_item(store.storage_key())
        .unwrap()
        .unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let records = json.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["id"], id.as_str());
    assert_eq!(records[0]["status"], "pending");
    assert_eq!(records[0]["fileType"], "application/pdf");
    assert!(records[0].get("assignedDoctor").is_none());
}

#[test]
fn test_file_database_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clarifind.db");

    let id = {
        let store = LabResultStore::new(Database::open(&path).unwrap());
        let id = store.create(&pdf("cbc.pdf"), "a@email.com").unwrap().id;
        store.assign(&id, &find_doctor("doc-004").unwrap()).unwrap();
        id
    };

    let store = LabResultStore::new(Database::open(&path).unwrap());
    let result = store.get_by_id(&id).unwrap();
    assert_eq!(result.status, ResultStatus::InReview);
    assert_eq!(result.assigned_doctor.unwrap().id, "doc-004");
}

#[test]
fn test_two_writers_detect_lost_update() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shared.db");

    let tab_a = LabResultStore::new(Database::open(&path).unwrap());
    let tab_b = LabResultStore::new(Database::open(&path).unwrap());

    let id = tab_a.create(&pdf("cbc.pdf"), "a@email.com").unwrap().id;
    let seen_by_b = tab_b.get_by_id(&id).unwrap();

    tab_a.assign(&id, &find_doctor("doc-001").unwrap()).unwrap();

    let result = tab_b.update_checked(
        &id,
        seen_by_b.version,
        LabResultPatch::default().interpretation("stale edit"),
    );
    assert!(matches!(result, Err(StoreError::Conflict { .. })));
    assert!(tab_b.get_by_id(&id).unwrap().interpretation.is_none());
}

#[test]
fn test_create_from_path() {
    let store = setup_store();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Thyroid_Panel.pdf");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(b"%PDF-1.4").unwrap();

    let created = store
        .create_from_path(&path, "application/pdf", "a@email.com")
        .unwrap();
    assert_eq!(created.file_name, "Thyroid_Panel.pdf");
    assert_eq!(created.test_type, "Thyroid Function");
    assert_eq!(created.file_data, "data:application/pdf;base64,JVBERi0xLjQ=");
}

#[test]
fn test_create_from_missing_path_fails() {
    let store = setup_store();
    let result = store.create_from_path("/no/such/file.pdf", "application/pdf", "a@email.com");
    assert!(matches!(result, Err(StoreError::Upload(_))));
    assert!(store.get_all().is_empty());
}
