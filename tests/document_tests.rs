use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tickweave::engine::MockEngine;
use tickweave::{Document, DocumentEvent, SequenceEngine};

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("tickweave-doc-{}-{}", std::process::id(), name))
}

fn new_document() -> (Arc<MockEngine>, Document) {
    let engine = Arc::new(MockEngine::new());
    // Method-syntax clone, so the Arc<MockEngine> coerces to the trait
    // object at the argument position.
    let document = Document::new(engine.clone()).expect("initial snapshot");
    (engine, document)
}

/// One "edit": mutate the live engine state, then commit it.
fn edit_and_commit(engine: &Arc<MockEngine>, document: &mut Document, tick: u64, label: &str) {
    engine.add_event(tick, vec![0x90, 60, 100]);
    document
        .commit(label)
        .unwrap_or_else(|e| panic!("commit {} failed: {}", label, e));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_n_commits_undo_and_redo_exactly() {
        let (engine, mut document) = new_document();
        let n = 5;
        for i in 0..n {
            edit_and_commit(&engine, &mut document, i * 480, &format!("edit {}", i));
        }
        assert_eq!(engine.event_count(), n as usize);

        // n undos walk back to the initial snapshot exactly
        for i in (0..n).rev() {
            assert!(document.undo());
            assert_eq!(engine.event_count(), i as usize);
        }
        assert!(!document.undo(), "undo at the root must be a no-op");
        assert_eq!(engine.event_count(), 0);

        // n redos walk forward to the state after the nth commit
        for i in 1..=n {
            assert!(document.redo());
            assert_eq!(engine.event_count(), i as usize);
        }
        assert!(!document.redo(), "redo at the tip must be a no-op");
    }

    #[test]
    fn test_commit_discards_redo_branch_forever() {
        let (engine, mut document) = new_document();
        edit_and_commit(&engine, &mut document, 0, "A");
        edit_and_commit(&engine, &mut document, 480, "B");
        edit_and_commit(&engine, &mut document, 960, "C");

        assert!(document.undo());
        assert!(document.undo());
        assert_eq!(engine.event_count(), 1, "state equals state after A");

        edit_and_commit(&engine, &mut document, 1440, "D");
        assert_eq!(document.current_description(), "D");
        assert_eq!(engine.event_count(), 2);

        // B and C are unreachable now
        assert!(!document.redo());
        assert_eq!(engine.event_count(), 2, "state remains D");
        assert!(!document.redo());

        // initial, A, D
        assert_eq!(document.history().len(), 3);
        assert_eq!(document.history().position(), 2);
        assert!(document.history().can_undo());
        assert!(!document.history().can_redo());
    }

    #[test]
    fn test_failed_commit_reverts_live_state_and_history() {
        let (engine, mut document) = new_document();
        edit_and_commit(&engine, &mut document, 0, "A");

        // A live mutation that cannot be captured gets discarded.
        engine.add_event(480, vec![0x90, 64, 100]);
        engine.set_fail_snapshots(true);
        assert!(document.commit("B").is_err());
        engine.set_fail_snapshots(false);

        assert_eq!(engine.event_count(), 1, "live state reverted to A");
        assert_eq!(document.current_description(), "A");
        assert!(!document.redo(), "no revision was appended");
    }

    #[test]
    fn test_revert_discards_uncommitted_mutations() {
        let (engine, mut document) = new_document();
        edit_and_commit(&engine, &mut document, 0, "A");

        engine.add_event(480, vec![0x90, 64, 100]);
        assert_eq!(engine.event_count(), 2);
        document.revert();
        assert_eq!(engine.event_count(), 1);
    }

    #[test]
    fn test_save_clears_dirty_and_is_idempotent() {
        let (engine, mut document) = new_document();
        assert!(document.dirty(), "a fresh document was never saved");

        edit_and_commit(&engine, &mut document, 0, "A");
        let path = temp_path("save.twv");
        document.save_as(&path).expect("save");
        assert!(!document.dirty());
        assert_eq!(document.filename(), Some(path.as_path()));

        // A second save with no intervening commit changes nothing.
        document.save().expect("save again");
        assert!(!document.dirty());

        edit_and_commit(&engine, &mut document, 480, "B");
        assert!(document.dirty());
        document.save().expect("save B");
        assert!(!document.dirty());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_failed_save_keeps_document_dirty() {
        let (engine, mut document) = new_document();
        edit_and_commit(&engine, &mut document, 0, "A");

        let bad_path = temp_path("no-such-dir").join("out.twv");
        assert!(document.save_as(&bad_path).is_err());
        assert!(document.dirty());
        assert_eq!(document.filename(), None, "filename unchanged on failure");
    }

    #[test]
    fn test_undo_tracks_dirtiness_against_saved_revision() {
        let (engine, mut document) = new_document();
        edit_and_commit(&engine, &mut document, 0, "A");
        let path = temp_path("dirty.twv");
        document.save_as(&path).expect("save");

        assert!(document.undo());
        assert!(document.dirty(), "moved away from the saved revision");
        assert!(document.redo());
        assert!(!document.dirty(), "back on the saved revision");

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_open_missing_file_creates_no_document() {
        let engine = Arc::new(MockEngine::new());
        let result = Document::open(engine, temp_path("missing.twv"));
        assert!(result.is_err());
    }

    #[test]
    fn test_open_corrupt_file_creates_no_document() {
        let path = temp_path("corrupt.twv");
        fs::write(&path, "event zero nonsense\n").expect("write");
        let engine = Arc::new(MockEngine::new());
        assert!(Document::open(engine, &path).is_err());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_open_native_file_starts_clean() {
        let path = temp_path("native.twv");
        fs::write(&path, "tempo 0 500000\nevent 0 144 60 100\n").expect("write");

        let engine = Arc::new(MockEngine::new());
        let document = Document::open(engine.clone(), &path).expect("open");
        assert!(!document.dirty());
        assert_eq!(engine.event_count(), 1);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_open_foreign_format_starts_dirty() {
        let path = temp_path("foreign.txt");
        fs::write(&path, "event 0 144 60 100\n").expect("write");

        let engine = Arc::new(MockEngine::new());
        let document = Document::open(engine, &path).expect("open");
        assert!(document.dirty(), "imported foreign data is unsaved");
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_save_then_open_round_trips_state() {
        let (engine, mut document) = new_document();
        engine.set_tempo(0, tickweave::Tempo::from_bpm(90.0));
        edit_and_commit(&engine, &mut document, 0, "A");
        edit_and_commit(&engine, &mut document, 480, "B");

        let path = temp_path("roundtrip.twv");
        document.save_as(&path).expect("save");

        let reloaded = Arc::new(MockEngine::new());
        let document2 = Document::open(reloaded.clone(), &path).expect("open");
        assert!(!document2.dirty());
        assert_eq!(reloaded.event_count(), 2);
        assert_eq!(
            reloaded.tempo_at(0),
            tickweave::Tempo::from_bpm(90.0),
            "tempo map survives the round trip"
        );
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_notifications_fire_on_successful_operations_only() {
        let (engine, mut document) = new_document();
        let events = document.subscribe();

        edit_and_commit(&engine, &mut document, 0, "A");
        assert_eq!(events.try_recv(), Ok(DocumentEvent::Committed));

        assert!(document.undo());
        assert_eq!(events.try_recv(), Ok(DocumentEvent::Undone));
        assert!(!document.undo());
        assert!(events.try_recv().is_err(), "no event for a no-op undo");

        assert!(document.redo());
        assert_eq!(events.try_recv(), Ok(DocumentEvent::Redone));

        document.revert();
        assert_eq!(events.try_recv(), Ok(DocumentEvent::Reverted));

        engine.set_fail_snapshots(true);
        assert!(document.commit("fails").is_err());
        engine.set_fail_snapshots(false);
        assert!(events.try_recv().is_err(), "no event for a failed commit");
    }
}
