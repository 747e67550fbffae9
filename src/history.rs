//! Linear revision history over immutable snapshots.
//!
//! The chain is a simple path, never a tree: committing always replaces any
//! existing successor of the current revision, so the only branch operation
//! is "replace successor". Undo and redo just move the current pointer.

use crate::engine::Snapshot;

/// An immutable snapshot handle plus a human-readable description.
#[derive(Debug, Clone)]
pub struct Revision {
    snapshot: Snapshot,
    description: String,
}

impl Revision {
    pub fn new(snapshot: Snapshot, description: impl Into<String>) -> Self {
        Self {
            snapshot,
            description: description.into(),
        }
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

/// The revision chain with its current and saved pointers.
///
/// Stored as a Vec ordered root-first; the current pointer is an index.
/// Truncating the redo branch is `Vec::truncate`, which drops the discarded
/// suffix iteratively, so arbitrarily long histories never deepen the stack.
#[derive(Debug)]
pub struct RevisionChain {
    revisions: Vec<Revision>,
    current: usize,
    saved: Option<usize>,
}

impl RevisionChain {
    /// A new chain containing only the initial revision, which is current
    /// and not yet saved.
    pub fn new(initial: Revision) -> Self {
        Self {
            revisions: vec![initial],
            current: 0,
            saved: None,
        }
    }

    pub fn current(&self) -> &Revision {
        &self.revisions[self.current]
    }

    /// Installs `revision` as the sole successor of the current revision and
    /// advances to it. Any existing redo branch is destroyed, even when no
    /// undo happened since it was created.
    pub fn commit(&mut self, revision: Revision) {
        self.revisions.truncate(self.current + 1);
        if self.saved.is_some_and(|saved| saved > self.current) {
            // The saved revision was on the discarded branch; the document
            // stays dirty until the next successful save.
            self.saved = None;
        }
        self.revisions.push(revision);
        self.current += 1;
    }

    /// Moves to the predecessor, if any.
    pub fn undo(&mut self) -> Option<&Revision> {
        if self.current == 0 {
            return None;
        }
        self.current -= 1;
        Some(self.current())
    }

    /// Moves to the successor, if any.
    pub fn redo(&mut self) -> Option<&Revision> {
        if self.current + 1 == self.revisions.len() {
            return None;
        }
        self.current += 1;
        Some(self.current())
    }

    pub fn can_undo(&self) -> bool {
        self.current > 0
    }

    pub fn can_redo(&self) -> bool {
        self.current + 1 < self.revisions.len()
    }

    /// Marks the current revision as the one last persisted.
    pub fn mark_saved(&mut self) {
        self.saved = Some(self.current);
    }

    pub fn is_dirty(&self) -> bool {
        self.saved != Some(self.current)
    }

    /// Number of revisions in the chain, always at least 1.
    pub fn len(&self) -> usize {
        self.revisions.len()
    }

    /// Index of the current revision, root being 0.
    pub fn position(&self) -> usize {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn revision(label: &str) -> Revision {
        Revision::new(Snapshot::new(label.to_string()), label)
    }

    fn chain() -> RevisionChain {
        RevisionChain::new(revision("initial"))
    }

    #[test]
    fn new_chain_is_dirty_and_at_root() {
        let chain = chain();
        assert_eq!(chain.position(), 0);
        assert_eq!(chain.len(), 1);
        assert!(chain.is_dirty());
        assert!(!chain.can_undo());
        assert!(!chain.can_redo());
    }

    #[test]
    fn undo_redo_walk_the_chain() {
        let mut chain = chain();
        chain.commit(revision("a"));
        chain.commit(revision("b"));

        assert_eq!(chain.undo().unwrap().description(), "a");
        assert_eq!(chain.undo().unwrap().description(), "initial");
        assert!(chain.undo().is_none());

        assert_eq!(chain.redo().unwrap().description(), "a");
        assert_eq!(chain.redo().unwrap().description(), "b");
        assert!(chain.redo().is_none());
    }

    #[test]
    fn commit_destroys_redo_branch() {
        let mut chain = chain();
        chain.commit(revision("a"));
        chain.commit(revision("b"));
        chain.commit(revision("c"));
        chain.undo();
        chain.undo();
        assert!(chain.can_redo());

        chain.commit(revision("d"));
        assert!(!chain.can_redo());
        assert!(chain.redo().is_none());
        assert_eq!(chain.current().description(), "d");
        assert_eq!(chain.len(), 3); // initial, a, d
    }

    #[test]
    fn saved_pointer_tracks_dirtiness() {
        let mut chain = chain();
        chain.commit(revision("a"));
        chain.mark_saved();
        assert!(!chain.is_dirty());

        chain.undo();
        assert!(chain.is_dirty());
        chain.redo();
        assert!(!chain.is_dirty());
    }

    #[test]
    fn truncating_the_saved_revision_pins_dirty() {
        let mut chain = chain();
        chain.commit(revision("a"));
        chain.commit(revision("b"));
        chain.mark_saved();
        chain.undo();
        chain.undo();

        // "b" was the saved revision and is destroyed here.
        chain.commit(revision("c"));
        assert!(chain.is_dirty());
        chain.undo();
        assert!(chain.is_dirty());
    }
}
