//! The engine boundary for tickweave
//!
//! The note-storage engine and the byte-level output device sit behind two
//! traits, so the revision history and the player never depend on a concrete
//! storage or device implementation:
//! - [`SequenceEngine`] for snapshot/restore, tempo lookup and event
//!   enumeration
//! - [`OutputSink`] for emitting raw event bytes
//!
//! Concrete implementations:
//! - [`MidirSink`] for real MIDI device output via midir
//! - [`MockEngine`] and [`CaptureSink`] for testing and the demo pattern
//!
pub mod midir_sink;
pub mod mock_engine;

use std::any::Any;
use std::error::Error;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::timing::{Tempo, Tick};

// Re-export concrete implementations
pub use midir_sink::MidirSink;
pub use mock_engine::{CaptureSink, MockEngine};

/// Custom error type for engine operations
#[derive(Debug)]
pub enum EngineError {
    /// A state snapshot could not be captured
    Snapshot(String),
    /// A file could not be imported
    Import(String),
    /// Live state could not be exported to a file
    Export(String),
    /// An event could not be written to the output sink
    Output(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Snapshot(msg) => write!(f, "snapshot error: {}", msg),
            EngineError::Import(msg) => write!(f, "import error: {}", msg),
            EngineError::Export(msg) => write!(f, "export error: {}", msg),
            EngineError::Output(msg) => write!(f, "output error: {}", msg),
        }
    }
}

impl Error for EngineError {}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// An opaque, immutable capture of engine state usable for restore.
///
/// The payload is defined by the engine that created the snapshot; clones
/// share the same capture.
#[derive(Clone)]
pub struct Snapshot(Arc<dyn Any + Send + Sync>);

impl Snapshot {
    pub fn new<T: Any + Send + Sync>(state: T) -> Self {
        Self(Arc::new(state))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref()
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Snapshot(..)")
    }
}

/// Trait defining the interface to the note-storage engine.
///
/// Implementations are internally synchronized: the control thread commits
/// and restores snapshots while a playback worker may be enumerating events.
/// Edits made during playback take effect at the worker's next event fetch.
pub trait SequenceEngine: Send + Sync {
    /// Captures the current live state into an immutable snapshot
    fn snapshot(&self) -> Result<Snapshot>;

    /// Replaces the live state with a previously captured snapshot
    fn restore(&self, snapshot: &Snapshot);

    /// Resolution of the sequence in ticks per quarter note
    fn ticks_per_quarter(&self) -> u32;

    /// Tempo in effect at `tick` according to the tempo map
    fn tempo_at(&self, tick: Tick) -> Tempo;

    /// Returns the first occupied tick at or after `from`, together with
    /// every event byte string stored at that tick, in insertion order.
    fn next_events(&self, from: Tick) -> Option<(Tick, Vec<Vec<u8>>)>;

    /// Loads a file into the live state, returning whether it was in the
    /// engine's native format
    fn import(&self, path: &Path) -> Result<bool>;

    /// Writes the live state to a file
    fn export(&self, path: &Path) -> Result<()>;
}

/// Destination for emitted timed event bytes.
pub trait OutputSink: Send {
    /// Sends one raw event to the device
    fn emit(&mut self, bytes: &[u8]) -> Result<()>;

    /// Pushes out anything the device still buffers
    fn flush(&mut self);

    /// Silences every sounding note
    fn all_notes_off(&mut self);
}
