mod config;
mod oscillator;
mod parameter;
pub mod phase;
pub mod quantizer;
mod waveform;

pub use config::{
    Config, ConfigError, DEFAULT_CHANNEL, DEFAULT_CONTROL, DEFAULT_FREQUENCY,
    DEFAULT_LSB_CONTROL, DEFAULT_SAMPLING_PERIOD, MAX_SAMPLING_PERIOD,
};
pub use oscillator::{ChangeValueCallback, Emission, Lfo, LfoBuilder, OscillatorState};
pub use parameter::Parameter;
pub use phase::{PhaseAccumulator, MAX_PHASE};
pub use quantizer::{Encoded, Resolution, ValueQuantizer};
pub use waveform::{WaveMath, Waveform, WaveformShaper};

pub mod prelude {
    pub use crate::lfo::{Config, Lfo, LfoBuilder, Waveform};
}
