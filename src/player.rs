//! Playback scheduling against wall clock.
//!
//! One worker thread at most. It repeatedly asks the engine for the next
//! event batch, sleeps until the computed deadline or a cancellation signal,
//! emits through the output sink, then commits the new logical position under
//! the time-state lock. `stop()` is synchronous: it joins the worker before
//! returning, so no event can be emitted after it returns.

use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam::channel::{unbounded, Receiver, Sender};
use log::{info, warn};

use crate::engine::{OutputSink, SequenceEngine};
use crate::timing::{duration_to_ticks, ticks_to_duration, Tempo, Tick};

/// Playback lifecycle notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    Started,
    /// Sent when the worker exits, whether it ran out of events or was
    /// cancelled.
    Finished,
}

/// The triple `time()` interpolates from. The worker rewrites it after each
/// emitted event; nobody holds the lock across a wait.
#[derive(Debug, Clone, Copy)]
struct TimeState {
    position: Tick,
    reference: Instant,
    tempo: Tempo,
}

struct PlayerShared {
    time_state: Mutex<TimeState>,
    // Cancellation is guarded separately so signaling it never waits for the
    // time-state lock.
    cancel: Mutex<bool>,
    cancel_cond: Condvar,
}

struct Session {
    engine: Arc<dyn SequenceEngine>,
    handle: JoinHandle<()>,
}

/// Drives at most one playback worker at a time.
///
/// `play` and `stop` take `&mut self`, so calls are serialized by the caller;
/// multi-caller setups wrap the player in their own lock.
pub struct Player {
    sink: Arc<Mutex<dyn OutputSink>>,
    shared: Arc<PlayerShared>,
    session: Option<Session>,
    subscribers: Arc<Mutex<Vec<Sender<PlayerEvent>>>>,
}

impl Player {
    pub fn new(sink: impl OutputSink + 'static) -> Self {
        Self {
            sink: Arc::new(Mutex::new(sink)),
            shared: Arc::new(PlayerShared {
                time_state: Mutex::new(TimeState {
                    position: 0,
                    reference: Instant::now(),
                    tempo: Tempo::default(),
                }),
                cancel: Mutex::new(false),
                cancel_cond: Condvar::new(),
            }),
            session: None,
            subscribers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Registers a listener for `Started`/`Finished` notifications.
    pub fn subscribe(&self) -> Receiver<PlayerEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.lock().unwrap().push(tx);
        rx
    }

    /// Starts playback of `engine` from `start`. Any previous session is
    /// stopped synchronously first, so at most one worker ever exists.
    /// Returns once the worker is spawned; it does not wait for playback.
    pub fn play(&mut self, engine: Arc<dyn SequenceEngine>, start: Tick) {
        self.stop();

        let tempo = engine.tempo_at(start);
        *self.shared.time_state.lock().unwrap() = TimeState {
            position: start,
            reference: Instant::now(),
            tempo,
        };
        *self.shared.cancel.lock().unwrap() = false;

        // Announce before spawning so Started always precedes the worker's
        // Finished in every subscriber's queue.
        info!("Playback started at tick {}", start);
        broadcast(&self.subscribers, PlayerEvent::Started);

        let worker_engine = Arc::clone(&engine);
        let sink = Arc::clone(&self.sink);
        let shared = Arc::clone(&self.shared);
        let subscribers = Arc::clone(&self.subscribers);
        let handle = thread::spawn(move || {
            run_session(worker_engine, sink, shared, subscribers, start);
        });
        self.session = Some(Session { engine, handle });
    }

    /// Stops playback. Idempotent; blocks until the worker has exited, after
    /// which no further output events occur.
    pub fn stop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        {
            let mut cancel = self.shared.cancel.lock().unwrap();
            *cancel = true;
            self.shared.cancel_cond.notify_all();
        }
        if session.handle.join().is_err() {
            warn!("Playback worker panicked");
        }
        *self.shared.cancel.lock().unwrap() = false;
        info!("Playback stopped");
    }

    /// The current logical position, interpolated from the last emitted
    /// event through the tempo then in effect. `None` while idle. Never
    /// blocks on the worker's sleep.
    pub fn time(&self) -> Option<Tick> {
        let session = self.session.as_ref()?;
        if session.handle.is_finished() {
            return None;
        }
        let ticks_per_quarter = session.engine.ticks_per_quarter();
        let state = self.shared.time_state.lock().unwrap();
        let elapsed = state.reference.elapsed();
        Some(state.position + duration_to_ticks(elapsed, state.tempo, ticks_per_quarter))
    }

    /// Whether a live session is currently playing this engine.
    pub fn is_playing<E>(&self, engine: &Arc<E>) -> bool
    where
        E: SequenceEngine + ?Sized,
    {
        // Compare allocation addresses; vtable pointers of trait-object Arcs
        // are not stable enough for identity.
        let target = Arc::as_ptr(engine) as *const ();
        self.session
            .as_ref()
            .is_some_and(|s| Arc::as_ptr(&s.engine) as *const () == target && !s.handle.is_finished())
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.stop();
    }
}

fn broadcast(subscribers: &Mutex<Vec<Sender<PlayerEvent>>>, event: PlayerEvent) {
    subscribers
        .lock()
        .unwrap()
        .retain(|tx| tx.send(event).is_ok());
}

/// Waits until `deadline` or cancellation, whichever comes first. Returns
/// true when cancelled. Deadlines already in the past are a zero wait.
fn wait_deadline_or_cancel(shared: &PlayerShared, deadline: Instant) -> bool {
    let mut cancelled = shared.cancel.lock().unwrap();
    loop {
        if *cancelled {
            return true;
        }
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        let (guard, _) = shared
            .cancel_cond
            .wait_timeout(cancelled, deadline - now)
            .unwrap();
        cancelled = guard;
    }
}

fn run_session(
    engine: Arc<dyn SequenceEngine>,
    sink: Arc<Mutex<dyn OutputSink>>,
    shared: Arc<PlayerShared>,
    subscribers: Arc<Mutex<Vec<Sender<PlayerEvent>>>>,
    start: Tick,
) {
    let ticks_per_quarter = engine.ticks_per_quarter();
    let mut next_from = start;

    loop {
        let Some((event_tick, events)) = engine.next_events(next_from) else {
            sink.lock().unwrap().all_notes_off();
            info!("Playback reached end of sequence");
            break;
        };

        let deadline = {
            let state = shared.time_state.lock().unwrap();
            state.reference
                + ticks_to_duration(event_tick - state.position, state.tempo, ticks_per_quarter)
        };

        if wait_deadline_or_cancel(&shared, deadline) {
            sink.lock().unwrap().all_notes_off();
            break;
        }

        {
            let mut sink = sink.lock().unwrap();
            for bytes in &events {
                // Output failures never kill the loop; playback continuity
                // beats one lost event.
                if let Err(e) = sink.emit(bytes) {
                    warn!("Output error at tick {}: {}", event_tick, e);
                }
            }
            sink.flush();
        }

        // Tempo is re-sampled only here, so an in-flight wait is never
        // retroactively altered by a tempo-map edit.
        let tempo = engine.tempo_at(event_tick);
        {
            let mut state = shared.time_state.lock().unwrap();
            state.position = event_tick;
            state.reference = deadline;
            state.tempo = tempo;
        }
        next_from = event_tick + 1;
    }

    broadcast(&subscribers, PlayerEvent::Finished);
}
