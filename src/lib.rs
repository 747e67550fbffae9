pub mod cli;
pub mod document;
pub mod engine;
pub mod history;
pub mod logging;
pub mod player;
pub mod timing;

pub use document::{Document, DocumentEvent};
pub use engine::{EngineError, OutputSink, SequenceEngine, Snapshot};
pub use player::{Player, PlayerEvent};
pub use timing::{Tempo, Tick};
