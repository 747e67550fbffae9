//! In-memory engine and capture sink used by the tests and the demo pattern.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use log::warn;

use crate::engine::{EngineError, OutputSink, Result, SequenceEngine, Snapshot};
use crate::timing::{Tempo, Tick, DEFAULT_TICKS_PER_QUARTER};

/// The whole sequence state; snapshots are plain clones of this.
#[derive(Debug, Clone, Default)]
struct SequenceState {
    /// Events sorted by tick, insertion order preserved within a tick
    events: Vec<(Tick, Vec<u8>)>,
    tempo_map: BTreeMap<Tick, Tempo>,
}

/// A sequence engine backed by a sorted in-memory event list and a
/// `BTreeMap` tempo map.
///
/// The native file format (`.twv` extension) is line-based text:
/// `tempo <tick> <micros_per_quarter>` and `event <tick> <byte> <byte> ...`.
pub struct MockEngine {
    state: Mutex<SequenceState>,
    ticks_per_quarter: u32,
    fail_snapshots: AtomicBool,
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEngine {
    pub fn new() -> Self {
        Self::with_resolution(DEFAULT_TICKS_PER_QUARTER)
    }

    pub fn with_resolution(ticks_per_quarter: u32) -> Self {
        Self {
            state: Mutex::new(SequenceState::default()),
            ticks_per_quarter,
            fail_snapshots: AtomicBool::new(false),
        }
    }

    /// Inserts an event, keeping the list sorted by tick.
    pub fn add_event(&self, tick: Tick, bytes: Vec<u8>) {
        let mut state = self.state.lock().unwrap();
        let at = state.events.partition_point(|(t, _)| *t <= tick);
        state.events.insert(at, (tick, bytes));
    }

    /// Sets the tempo taking effect at `tick`.
    pub fn set_tempo(&self, tick: Tick, tempo: Tempo) {
        self.state.lock().unwrap().tempo_map.insert(tick, tempo);
    }

    /// Makes every subsequent `snapshot()` call fail, for exercising the
    /// commit failure path.
    pub fn set_fail_snapshots(&self, fail: bool) {
        self.fail_snapshots.store(fail, Ordering::SeqCst);
    }

    pub fn event_count(&self) -> usize {
        self.state.lock().unwrap().events.len()
    }

    fn parse(path: &Path, text: &str) -> Result<SequenceState> {
        let mut state = SequenceState::default();
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line.split_whitespace();
            let kind = fields.next().unwrap_or_default();
            let err = |msg: &str| {
                EngineError::Import(format!("{}: line {}: {}", path.display(), lineno + 1, msg))
            };
            let tick: Tick = fields
                .next()
                .ok_or_else(|| err("missing tick"))?
                .parse()
                .map_err(|_| err("bad tick"))?;
            match kind {
                "tempo" => {
                    let micros: u32 = fields
                        .next()
                        .ok_or_else(|| err("missing tempo value"))?
                        .parse()
                        .map_err(|_| err("bad tempo value"))?;
                    if micros == 0 {
                        return Err(err("zero tempo"));
                    }
                    state
                        .tempo_map
                        .insert(tick, Tempo::from_micros_per_quarter(micros));
                }
                "event" => {
                    let bytes = fields
                        .map(|b| b.parse::<u8>().map_err(|_| err("bad event byte")))
                        .collect::<Result<Vec<u8>>>()?;
                    if bytes.is_empty() {
                        return Err(err("empty event"));
                    }
                    state.events.push((tick, bytes));
                }
                other => return Err(err(&format!("unknown record '{}'", other))),
            }
        }
        state.events.sort_by_key(|(tick, _)| *tick);
        Ok(state)
    }
}

impl SequenceEngine for MockEngine {
    fn snapshot(&self) -> Result<Snapshot> {
        if self.fail_snapshots.load(Ordering::SeqCst) {
            return Err(EngineError::Snapshot("snapshot capture refused".into()));
        }
        let state = self.state.lock().unwrap().clone();
        Ok(Snapshot::new(state))
    }

    fn restore(&self, snapshot: &Snapshot) {
        match snapshot.downcast_ref::<SequenceState>() {
            Some(captured) => *self.state.lock().unwrap() = captured.clone(),
            None => warn!("ignoring snapshot taken by a different engine"),
        }
    }

    fn ticks_per_quarter(&self) -> u32 {
        self.ticks_per_quarter
    }

    fn tempo_at(&self, tick: Tick) -> Tempo {
        self.state
            .lock()
            .unwrap()
            .tempo_map
            .range(..=tick)
            .next_back()
            .map(|(_, tempo)| *tempo)
            .unwrap_or_default()
    }

    fn next_events(&self, from: Tick) -> Option<(Tick, Vec<Vec<u8>>)> {
        let state = self.state.lock().unwrap();
        let start = state.events.partition_point(|(tick, _)| *tick < from);
        let (event_tick, _) = *state.events.get(start)?;
        let batch = state.events[start..]
            .iter()
            .take_while(|(tick, _)| *tick == event_tick)
            .map(|(_, bytes)| bytes.clone())
            .collect();
        Some((event_tick, batch))
    }

    fn import(&self, path: &Path) -> Result<bool> {
        let text = fs::read_to_string(path)
            .map_err(|e| EngineError::Import(format!("{}: {}", path.display(), e)))?;
        let parsed = Self::parse(path, &text)?;
        *self.state.lock().unwrap() = parsed;
        let native = path.extension().is_some_and(|ext| ext == "twv");
        Ok(native)
    }

    fn export(&self, path: &Path) -> Result<()> {
        let state = self.state.lock().unwrap();
        let mut out = String::new();
        for (tick, tempo) in &state.tempo_map {
            out.push_str(&format!("tempo {} {}\n", tick, tempo.micros_per_quarter()));
        }
        for (tick, bytes) in &state.events {
            out.push_str(&format!("event {}", tick));
            for byte in bytes {
                out.push_str(&format!(" {}", byte));
            }
            out.push('\n');
        }
        fs::write(path, out)
            .map_err(|e| EngineError::Export(format!("{}: {}", path.display(), e)))
    }
}

/// One event as seen by a [`CaptureSink`].
#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub at: Instant,
    pub bytes: Vec<u8>,
}

/// An output sink that records what was emitted and when.
///
/// Clones share the same recording, so a test can keep one handle while the
/// player owns the other.
#[derive(Debug, Clone, Default)]
pub struct CaptureSink {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
    notes_off_calls: Arc<AtomicUsize>,
    fail_emits: Arc<AtomicBool>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn event_count(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn notes_off_calls(&self) -> usize {
        self.notes_off_calls.load(Ordering::SeqCst)
    }

    pub fn set_fail_emits(&self, fail: bool) {
        self.fail_emits.store(fail, Ordering::SeqCst);
    }
}

impl OutputSink for CaptureSink {
    fn emit(&mut self, bytes: &[u8]) -> Result<()> {
        if self.fail_emits.load(Ordering::SeqCst) {
            return Err(EngineError::Output("emit refused".into()));
        }
        self.events.lock().unwrap().push(CapturedEvent {
            at: Instant::now(),
            bytes: bytes.to_vec(),
        });
        Ok(())
    }

    fn flush(&mut self) {}

    fn all_notes_off(&mut self) {
        self.notes_off_calls.fetch_add(1, Ordering::SeqCst);
    }
}
