//! A low-frequency oscillator that drives MIDI Control Change messages.
//!
//! The [Lfo] ticks on a background thread at a fixed sampling period. Every tick the phase is
//! advanced, shaped by the selected [Waveform] and quantized into the configured range. Only when
//! the quantized value changes is the change callback invoked and the value sent to the connected
//! MIDI output, either as a single 7-bit Control Change or as an MSB/LSB pair.
//!
//! ```rust
//! use midi_lfo::midi::memory::MemoryBackend;
//! use midi_lfo::{Lfo, Waveform};
//!
//! let backend = MemoryBackend::new(&["Synth"]);
//! let mut lfo = Lfo::builder()
//!     .with_backend(backend.clone())
//!     .with_waveform(Waveform::Triangle)
//!     .with_control(74)
//!     .build()
//!     .unwrap();
//!
//! lfo.connect("Synth");
//! lfo.start();
//! lfo.stop();
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};

pub mod back_end;
pub mod lfo;
pub mod midi;

pub use lfo::{
    ChangeValueCallback, Config, ConfigError, Lfo, LfoBuilder, Parameter, Resolution,
    ValueQuantizer, Waveform, WaveformShaper, MAX_PHASE,
};
pub use midi::{ControlChange, MidiBackend, MidiConnection, MidiError, MidiPort};

/// Locks a mutex, recovering the data if a previous holder panicked. Every piece of shared state
/// in this crate stays valid between statements, so a poisoned lock carries no broken invariant.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
