//! Document: one revision chain plus filename and dirty bookkeeping.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crossbeam::channel::{unbounded, Receiver, Sender};
use log::{info, warn};

use crate::engine::{EngineError, Result, SequenceEngine};
use crate::history::{Revision, RevisionChain};

/// Fired after every successful state-affecting operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentEvent {
    Committed,
    Undone,
    Redone,
    Reverted,
    Saved,
}

/// Owns the revision chain for one live engine state and issues
/// commit/undo/redo/save against it.
pub struct Document {
    engine: Arc<dyn SequenceEngine>,
    history: RevisionChain,
    filename: Option<PathBuf>,
    subscribers: Vec<Sender<DocumentEvent>>,
}

impl Document {
    /// An empty document over the engine's current state. Fails when the
    /// initial snapshot cannot be captured.
    pub fn new(engine: Arc<dyn SequenceEngine>) -> Result<Self> {
        let snapshot = engine.snapshot()?;
        Ok(Self {
            engine,
            history: RevisionChain::new(Revision::new(snapshot, "")),
            filename: None,
            subscribers: Vec::new(),
        })
    }

    /// Imports `path` into the engine and wraps it in a document. Import
    /// failure is fatal to this attempt; no partial document is exposed.
    pub fn open(engine: Arc<dyn SequenceEngine>, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let native = engine.import(path)?;
        let mut document = Self::new(engine)?;
        document.filename = Some(path.to_path_buf());
        if native {
            document.history.mark_saved();
        }
        info!("Opened {} (native: {})", path.display(), native);
        Ok(document)
    }

    pub fn engine(&self) -> &Arc<dyn SequenceEngine> {
        &self.engine
    }

    /// Registers a listener for change notifications.
    pub fn subscribe(&mut self) -> Receiver<DocumentEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    fn notify(&mut self, event: DocumentEvent) {
        self.subscribers.retain(|tx| tx.send(event).is_ok());
    }

    /// Captures the live state as a new revision described by `description`.
    ///
    /// On success any redo branch is destroyed and the new revision becomes
    /// current. On failure the live state is reverted to the current
    /// revision and the history is left exactly as before.
    pub fn commit(&mut self, description: &str) -> Result<()> {
        let snapshot = match self.engine.snapshot() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Commit '{}' failed: {}", description, e);
                let current = self.history.current().snapshot().clone();
                self.engine.restore(&current);
                return Err(e);
            }
        };
        self.history.commit(Revision::new(snapshot, description));
        self.notify(DocumentEvent::Committed);
        Ok(())
    }

    /// Restores the predecessor revision. Returns whether a move occurred.
    pub fn undo(&mut self) -> bool {
        let Some(revision) = self.history.undo() else {
            return false;
        };
        let snapshot = revision.snapshot().clone();
        self.engine.restore(&snapshot);
        self.notify(DocumentEvent::Undone);
        true
    }

    /// Restores the successor revision. Returns whether a move occurred.
    pub fn redo(&mut self) -> bool {
        let Some(revision) = self.history.redo() else {
            return false;
        };
        let snapshot = revision.snapshot().clone();
        self.engine.restore(&snapshot);
        self.notify(DocumentEvent::Redone);
        true
    }

    /// Re-applies the current revision's snapshot, discarding live mutations
    /// that never got committed.
    pub fn revert(&mut self) {
        let snapshot = self.history.current().snapshot().clone();
        self.engine.restore(&snapshot);
        self.notify(DocumentEvent::Reverted);
    }

    /// Exports the live state to `path`; on success the current revision
    /// becomes the saved one and `path` becomes the document's filename.
    pub fn save_as(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.engine.export(path)?;
        self.filename = Some(path.to_path_buf());
        self.history.mark_saved();
        self.notify(DocumentEvent::Saved);
        info!("Saved {}", path.display());
        Ok(())
    }

    /// Exports to the stored filename.
    pub fn save(&mut self) -> Result<()> {
        let Some(path) = self.filename.clone() else {
            return Err(EngineError::Export("document has no filename".into()));
        };
        self.save_as(path)
    }

    /// Whether the document has edits not reflected in the last save.
    pub fn dirty(&self) -> bool {
        self.history.is_dirty()
    }

    pub fn filename(&self) -> Option<&Path> {
        self.filename.as_deref()
    }

    /// Description of the current revision, e.g. for undo menu labels.
    pub fn current_description(&self) -> &str {
        self.history.current().description()
    }

    pub fn history(&self) -> &RevisionChain {
        &self.history
    }
}
