//! Logical tick time and tempo math.
//!
//! Everything the player schedules is expressed in ticks; the conversion to
//! wall-clock durations goes through the tempo in effect at that point of the
//! sequence.

use std::time::Duration;

/// Logical time unit used for note timing, independent of wall clock.
pub type Tick = u64;

/// Default resolution: how many ticks make one quarter note.
pub const DEFAULT_TICKS_PER_QUARTER: u32 = 480;

/// Tempo as microseconds per quarter note (MIDI convention).
///
/// 120 BPM is 500 000 microseconds per quarter note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tempo {
    micros_per_quarter: u32,
}

impl Tempo {
    /// A zero tempo would make tick/duration conversion divide by zero, so
    /// the value is floored at one microsecond per quarter note.
    pub const fn from_micros_per_quarter(micros: u32) -> Self {
        Self {
            micros_per_quarter: if micros == 0 { 1 } else { micros },
        }
    }

    /// Non-positive and NaN inputs floor to the fastest representable
    /// tempo instead of producing a zero divisor.
    pub fn from_bpm(bpm: f64) -> Self {
        Self {
            micros_per_quarter: (60_000_000.0 / bpm).max(1.0) as u32,
        }
    }

    pub const fn micros_per_quarter(self) -> u32 {
        self.micros_per_quarter
    }

    pub fn bpm(self) -> f64 {
        60_000_000.0 / self.micros_per_quarter as f64
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self::from_bpm(120.0)
    }
}

/// Converts a tick delta to the wall-clock duration it spans at `tempo`.
pub fn ticks_to_duration(delta: Tick, tempo: Tempo, ticks_per_quarter: u32) -> Duration {
    let micros = delta as u128 * tempo.micros_per_quarter() as u128 / ticks_per_quarter as u128;
    Duration::from_micros(micros as u64)
}

/// Converts an elapsed wall-clock duration back to ticks at `tempo`.
pub fn duration_to_ticks(elapsed: Duration, tempo: Tempo, ticks_per_quarter: u32) -> Tick {
    (elapsed.as_micros() * ticks_per_quarter as u128 / tempo.micros_per_quarter() as u128) as Tick
}
