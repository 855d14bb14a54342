mod common;

use bearsync_core::{
    NoteRecord, NoteStore, NoteTree, SqliteBearStore, StoreError, StoreResult, StoreSnapshot,
    StoreTime, SyncError, SyncService,
};
use common::{
    bear_db, file_store_time, insert_note, note_count, note_row, set_mtime, tag_note,
    write_file,
};
use rusqlite::Connection;
use std::fs;
use std::path::Path;

fn service<'conn>(conn: &'conn Connection, root: &Path) -> SyncService<SqliteBearStore<'conn>> {
    let store = SqliteBearStore::try_new(conn).unwrap();
    let tree = NoteTree::open(root).unwrap();
    SyncService::new(store, tree)
}

#[test]
fn missing_file_is_created_and_store_adopts_its_mtime() {
    let conn = bear_db();
    insert_note(&conn, 42, "Plan", "A", 100.0, false);
    tag_note(&conn, 42, "work");
    let dir = tempfile::tempdir().unwrap();

    let report = service(&conn, dir.path()).run_pass().unwrap();

    let path = dir.path().join("work").join("Plan_42.md");
    assert_eq!(fs::read_to_string(&path).unwrap(), "A");
    let (content, modified_at) = note_row(&conn, 42);
    assert_eq!(content, "A");
    assert_eq!(modified_at, file_store_time(&path));
    assert_eq!(report.applied.files_created, 1);
    assert_eq!(report.applied.store_timestamp_updates, 1);
}

#[test]
fn newer_file_content_flows_into_store() {
    let conn = bear_db();
    insert_note(&conn, 7, "Draft", "old", 50.0, false);
    let dir = tempfile::tempdir().unwrap();
    write_file(&dir.path().join("Draft_7.md"), "new", 80.0);

    let report = service(&conn, dir.path()).run_pass().unwrap();

    assert_eq!(note_row(&conn, 7), ("new".to_string(), 80.0));
    assert_eq!(
        fs::read_to_string(dir.path().join("Draft_7.md")).unwrap(),
        "new"
    );
    assert_eq!(report.applied.store_content_updates, 1);
    assert_eq!(report.applied.files_written, 0);
}

#[test]
fn newer_store_content_overwrites_file() {
    let conn = bear_db();
    insert_note(&conn, 8, "Memo", "from bear", 90.0, false);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Memo_8.md");
    write_file(&path, "stale", 80.0);

    let report = service(&conn, dir.path()).run_pass().unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "from bear");
    let (content, modified_at) = note_row(&conn, 8);
    assert_eq!(content, "from bear");
    assert_eq!(modified_at, file_store_time(&path));
    assert_eq!(report.applied.files_written, 1);
    assert_eq!(report.applied.store_content_updates, 0);
}

#[test]
fn equal_timestamps_change_neither_side() {
    let conn = bear_db();
    insert_note(&conn, 9, "Same", "bear body", 80.0, false);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Same_9.md");
    write_file(&path, "file body", 80.0);

    let report = service(&conn, dir.path()).run_pass().unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "file body");
    assert_eq!(note_row(&conn, 9), ("bear body".to_string(), 80.0));
    assert_eq!(report.applied.mutation_count(), 0);
}

#[test]
fn second_pass_without_changes_performs_no_mutations() {
    let conn = bear_db();
    insert_note(&conn, 1, "Tagged", "one", 10.0, false);
    tag_note(&conn, 1, "work");
    insert_note(&conn, 2, "Root", "two", 20.0, false);
    insert_note(&conn, 3, "Trashed", "three", 30.0, true);
    insert_note(&conn, 4, "Edited", "four", 40.0, false);
    let dir = tempfile::tempdir().unwrap();
    write_file(&dir.path().join("Edited_4.md"), "four, edited", 45.0);
    write_file(&dir.path().join("old").join("Trashed_3.md"), "three", 30.0);
    let service = service(&conn, dir.path());

    let first = service.run_pass().unwrap();
    assert!(first.applied.mutation_count() > 0);

    let second = service.run_pass().unwrap();
    assert_eq!(second.applied.mutation_count(), 0);
    assert!(second.applied.failed.is_empty());
    assert_eq!(second.pruned_dirs, 0);
}

#[test]
fn every_live_note_converges_after_one_pass() {
    let conn = bear_db();
    insert_note(&conn, 1, "Fresh", "a", 10.0, false);
    insert_note(&conn, 2, "Behind", "b", 20.0, false);
    insert_note(&conn, 3, "Ahead", "c", 30.0, false);
    tag_note(&conn, 3, "misc");
    let dir = tempfile::tempdir().unwrap();
    write_file(&dir.path().join("Behind_2.md"), "b2", 25.0);
    write_file(&dir.path().join("misc").join("Ahead_3.md"), "c-old", 5.0);

    service(&conn, dir.path()).run_pass().unwrap();

    for (note_id, relative) in [
        (1, Path::new("Fresh_1.md").to_path_buf()),
        (2, Path::new("Behind_2.md").to_path_buf()),
        (3, Path::new("misc").join("Ahead_3.md")),
    ] {
        let path = dir.path().join(relative);
        let (content, modified_at) = note_row(&conn, note_id);
        assert_eq!(fs::read_to_string(&path).unwrap(), content);
        assert_eq!(modified_at, file_store_time(&path), "note {note_id}");
    }
}

#[test]
fn trashed_notes_lose_their_files_and_empty_folders_are_pruned() {
    let conn = bear_db();
    insert_note(&conn, 3, "Bin", "x", 30.0, true);
    tag_note(&conn, 3, "work");
    insert_note(&conn, 4, "NeverExported", "y", 40.0, true);
    let dir = tempfile::tempdir().unwrap();
    write_file(&dir.path().join("work").join("Bin_3.md"), "x", 30.0);

    let report = service(&conn, dir.path()).run_pass().unwrap();

    assert!(!dir.path().join("work").exists());
    assert!(dir.path().is_dir());
    assert_eq!(report.applied.files_removed, 1);
    assert_eq!(report.pruned_dirs, 1);
    assert_eq!(note_row(&conn, 3), ("x".to_string(), 30.0));
}

#[test]
fn renamed_tag_and_title_move_the_file_without_leaving_a_copy() {
    let conn = bear_db();
    insert_note(&conn, 5, "Plan", "body", 10.0, false);
    tag_note(&conn, 5, "work");
    let dir = tempfile::tempdir().unwrap();
    let service = service(&conn, dir.path());
    service.run_pass().unwrap();
    let old_path = dir.path().join("work").join("Plan_5.md");
    assert!(old_path.exists());
    let (_, synced_at) = note_row(&conn, 5);

    conn.execute_batch(
        "UPDATE ZSFNOTETAG SET ZTITLE = 'personal' WHERE ZTITLE = 'work';
         UPDATE ZSFNOTE SET ZTITLE = 'Roadmap' WHERE Z_PK = 5;",
    )
    .unwrap();
    let report = service.run_pass().unwrap();

    let new_path = dir.path().join("personal").join("Roadmap_5.md");
    assert!(!old_path.exists());
    assert!(!dir.path().join("work").exists());
    assert_eq!(fs::read_to_string(&new_path).unwrap(), "body");
    assert_eq!(file_store_time(&new_path), synced_at);
    assert_eq!(report.applied.files_relocated, 1);
    assert_eq!(report.applied.files_written, 0);
    assert_eq!(report.applied.store_timestamp_updates, 0);
}

#[test]
fn files_without_store_records_are_never_imported_or_touched() {
    let conn = bear_db();
    insert_note(&conn, 1, "Known", "k", 10.0, false);
    let dir = tempfile::tempdir().unwrap();
    let stray = dir.path().join("inbox").join("Stray_999.md");
    let readme = dir.path().join("README.txt");
    write_file(&stray, "stray", 12.0);
    write_file(&readme, "hello", 13.0);

    let report = service(&conn, dir.path()).run_pass().unwrap();

    assert_eq!(report.untracked, 1);
    assert_eq!(note_count(&conn), 1);
    assert_eq!(fs::read_to_string(&stray).unwrap(), "stray");
    assert_eq!(file_store_time(&stray), 12.0);
    assert_eq!(fs::read_to_string(&readme).unwrap(), "hello");
    assert_eq!(file_store_time(&readme), 13.0);
}

#[test]
fn filesystem_failure_skips_only_that_note() {
    let conn = bear_db();
    insert_note(&conn, 1, "Blocked", "b", 10.0, false);
    tag_note(&conn, 1, "blocked");
    insert_note(&conn, 2, "Fine", "f", 20.0, false);
    let dir = tempfile::tempdir().unwrap();
    // A plain file where the note's folder should be.
    fs::write(dir.path().join("blocked"), "not a folder").unwrap();

    let report = service(&conn, dir.path()).run_pass().unwrap();

    assert_eq!(report.applied.failed.len(), 1);
    assert_eq!(report.applied.failed[0].note_id, 1);
    assert_eq!(report.applied.failed[0].action, "create_file");
    assert_eq!(note_row(&conn, 1), ("b".to_string(), 10.0));
    assert_eq!(
        fs::read_to_string(dir.path().join("Fine_2.md")).unwrap(),
        "f"
    );
}

#[test]
fn quoted_file_content_reaches_store_verbatim() {
    let conn = bear_db();
    insert_note(&conn, 6, "Quotes", "plain", 10.0, false);
    let dir = tempfile::tempdir().unwrap();
    let body = "say \"cheese\" & it's fine'); --";
    write_file(&dir.path().join("Quotes_6.md"), body, 20.0);

    service(&conn, dir.path()).run_pass().unwrap();

    assert_eq!(note_row(&conn, 6), (body.to_string(), 20.0));
}

/// Serves a fixed snapshot and fails every content update.
#[test]
fn unreadable_file_is_held_instead_of_recreated() {
    let conn = bear_db();
    insert_note(&conn, 5, "Note", "store body", 10.0, false);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Note_5.md");
    fs::write(&path, b"new\xff").unwrap();
    set_mtime(&path, 20.0);

    let report = service(&conn, dir.path()).run_pass().unwrap();

    assert_eq!(fs::read(&path).unwrap(), b"new\xff".to_vec());
    assert_eq!(note_row(&conn, 5), ("store body".to_string(), 10.0));
    assert_eq!(report.scan_failures, 1);
    assert_eq!(report.held, 1);
    assert_eq!(report.applied.mutation_count(), 0);
}

#[test]
fn unreadable_copy_holds_its_readable_duplicate_too() {
    let conn = bear_db();
    insert_note(&conn, 5, "Note", "store body", 30.0, false);
    let dir = tempfile::tempdir().unwrap();
    let broken = dir.path().join("a").join("Note_5.md");
    fs::create_dir_all(dir.path().join("a")).unwrap();
    fs::write(&broken, b"\xff").unwrap();
    let readable = dir.path().join("Note_5.md");
    write_file(&readable, "older text", 20.0);

    let report = service(&conn, dir.path()).run_pass().unwrap();

    assert_eq!(fs::read_to_string(&readable).unwrap(), "older text");
    assert_eq!(fs::read(&broken).unwrap(), b"\xff".to_vec());
    assert_eq!(report.held, 1);
    assert_eq!(report.applied.mutation_count(), 0);
}

#[test]
fn duplicate_copy_at_target_path_is_never_overwritten() {
    let conn = bear_db();
    insert_note(&conn, 5, "Copy", "bear body", 10.0, false);
    tag_note(&conn, 5, "work");
    let dir = tempfile::tempdir().unwrap();
    let stale = dir.path().join("a").join("Copy_5.md");
    let edited = dir.path().join("work").join("Copy_5.md");
    write_file(&stale, "stale copy", 20.0);
    write_file(&edited, "real edits", 20.0);

    let report = service(&conn, dir.path()).run_pass().unwrap();

    assert_eq!(fs::read_to_string(&edited).unwrap(), "real edits");
    assert_eq!(fs::read_to_string(&stale).unwrap(), "stale copy");
    assert_eq!(note_row(&conn, 5), ("bear body".to_string(), 10.0));
    assert_eq!(report.applied.files_relocated, 0);
    assert_eq!(report.applied.failed.len(), 1);
    assert_eq!(report.applied.failed[0].action, "relocate_file");
}

struct BrokenStore {
    snapshot: StoreSnapshot,
}

impl NoteStore for BrokenStore {
    fn load_snapshot(&self) -> StoreResult<StoreSnapshot> {
        Ok(self.snapshot.clone())
    }

    fn update_content(&self, _note_id: i64, _content: &str) -> StoreResult<()> {
        Err(StoreError::InvalidData("database is locked".to_string()))
    }

    fn update_modified_at(&self, _note_id: i64, _modified_at: StoreTime) -> StoreResult<()> {
        Ok(())
    }
}

#[test]
fn store_failure_aborts_the_rest_of_the_pass() {
    let dir = tempfile::tempdir().unwrap();
    write_file(&dir.path().join("Edited_1.md"), "newer", 50.0);
    fs::create_dir_all(dir.path().join("leftover")).unwrap();
    let mut snapshot = StoreSnapshot::new();
    for (note_id, title, modified_at) in [(1, "Edited", 10.0), (2, "Pending", 10.0)] {
        snapshot.insert(
            note_id,
            NoteRecord {
                note_id,
                title: title.to_string(),
                content: "store".to_string(),
                org_path: String::new(),
                modified_at,
                trashed: false,
            },
        );
    }
    let service = SyncService::new(BrokenStore { snapshot }, NoteTree::open(dir.path()).unwrap());

    let err = service.run_pass().unwrap_err();

    assert!(matches!(err, SyncError::Store(StoreError::InvalidData(_))));
    assert!(!dir.path().join("Pending_2.md").exists());
    assert!(dir.path().join("leftover").is_dir());
}

#[test]
fn plan_reports_actions_without_applying_them() {
    let conn = bear_db();
    insert_note(&conn, 1, "Draft", "a", 10.0, false);
    let dir = tempfile::tempdir().unwrap();
    let service = service(&conn, dir.path());

    let plan = service.plan().unwrap();

    assert_eq!(plan.groups.len(), 1);
    assert_eq!(plan.action_count(), 2);
    assert!(!dir.path().join("Draft_1.md").exists());
    assert_eq!(note_row(&conn, 1), ("a".to_string(), 10.0));
}
