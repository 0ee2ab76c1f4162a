use crate::lfo::parameter::Parameter;
use crate::lfo::phase;
use crate::lfo::quantizer::{
    full_scale, Resolution, ValueQuantizer, MAX_TOTAL_BITS, MIN_TOTAL_BITS, SEVEN_BIT_MAX,
};
use crate::lfo::Waveform;
use simplelog::warn;
use thiserror::Error;

pub const DEFAULT_CHANNEL: u32 = 0;
pub const DEFAULT_CONTROL: u32 = 19;
/// MIDI pairs controller `n` (MSB) with `n + 32` (LSB).
pub const DEFAULT_LSB_CONTROL: u32 = DEFAULT_CONTROL + 32;
pub const DEFAULT_FREQUENCY: f64 = 0.125;
pub const DEFAULT_SAMPLING_PERIOD: f64 = 0.03;
/// Longest accepted tick interval, one day.
pub const MAX_SAMPLING_PERIOD: f64 = 86_400.0;

/// A tick interval in seconds must be positive and no longer than [MAX_SAMPLING_PERIOD].
pub fn is_valid_sampling_period(sampling_period: f64) -> bool {
    sampling_period > 0.0 && sampling_period <= MAX_SAMPLING_PERIOD
}

#[derive(Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("MIDI channel {0} out of range [0, 15]")]
    ChannelOutOfRange(u32),
    #[error("{tag} {value} out of range [0, 127]")]
    ControlOutOfRange { tag: &'static str, value: u32 },
    #[error("invalid output range: min {min} is greater than max {max}")]
    InvalidRange { min: u32, max: u32 },
    #[error("{tag} {value} exceeds the full scale {max} of the configured bit depth")]
    ValueOutOfRange {
        tag: &'static str,
        value: u32,
        max: u32,
    },
    #[error("sampling period must be a positive number of seconds, got {0}")]
    InvalidSamplingPeriod(f64),
    #[error("frequency must be a finite number of Hz, got {0}")]
    InvalidFrequency(f64),
    #[error("invalid bit depth: {total_bits} total bits with {lsb_bits} LSB bits")]
    InvalidBitDepth { total_bits: u32, lsb_bits: u32 },
    #[error("unknown waveform \"{0}\"")]
    UnknownWaveform(String),
}

/// The live settings of the LFO.
///
/// The oscillator thread takes a copy of the whole struct at the top of every tick, so related
/// fields (the bit depth and the range, the frequency and the sampling period) are always read
/// consistently.
///
/// # Invariants
/// * `frequency <= 1 / (2 * sampling_period)`, enforced by every setter touching either.
/// * `min <= max <= 2^total_bits - 1`.
/// * `lsb_bits <= total_bits - 7`.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    channel: Parameter,
    control: Parameter,
    msb_control: Parameter,
    lsb_control: Parameter,
    min: Parameter,
    max: Parameter,
    total_bits: Parameter,
    lsb_bits: Parameter,
    frequency: f64,
    sampling_period: f64,
    /// Phase advance per tick. Recomputed when the frequency or the sampling period change.
    increment: f64,
    waveform: Waveform,
}

impl Default for Config {
    fn default() -> Self {
        let mut config = Self {
            channel: Parameter::new("channel", 0, 15, DEFAULT_CHANNEL),
            control: Parameter::new("control", 0, SEVEN_BIT_MAX, DEFAULT_CONTROL),
            msb_control: Parameter::new("msb_control", 0, SEVEN_BIT_MAX, DEFAULT_CONTROL),
            lsb_control: Parameter::new("lsb_control", 0, SEVEN_BIT_MAX, DEFAULT_LSB_CONTROL),
            min: Parameter::new("min", 0, SEVEN_BIT_MAX, 0),
            max: Parameter::new("max", 0, SEVEN_BIT_MAX, SEVEN_BIT_MAX),
            total_bits: Parameter::new("total_bits", MIN_TOTAL_BITS, MAX_TOTAL_BITS, 7),
            lsb_bits: Parameter::new("lsb_bits", 0, 0, 0),
            frequency: DEFAULT_FREQUENCY,
            sampling_period: DEFAULT_SAMPLING_PERIOD,
            increment: 0.0,
            waveform: Waveform::default(),
        };
        config.set_frequency(DEFAULT_FREQUENCY);
        config
    }
}

impl Config {
    /// The Nyquist limit for the current sampling period.
    pub fn max_frequency(&self) -> f64 {
        1.0 / (2.0 * self.sampling_period)
    }

    /// Sets the tick interval in seconds and re-applies the current frequency against the new
    /// Nyquist limit.
    ///
    /// # Returns
    /// The frequency in effect afterwards.
    pub fn set_sampling_period(&mut self, sampling_period: f64) -> f64 {
        if !is_valid_sampling_period(sampling_period) {
            warn!("<b>Sampling period <yellow>rejected</><b>: {}</>", sampling_period);
            warn!("  |_ Value kept back: {}", self.sampling_period);
            return self.frequency;
        }

        self.sampling_period = sampling_period;
        self.set_frequency(self.frequency)
    }

    /// Sets the oscillator frequency in Hz, clamped into `[0, 1 / (2 * sampling_period)]`.
    ///
    /// # Returns
    /// The frequency actually applied.
    pub fn set_frequency(&mut self, frequency: f64) -> f64 {
        if frequency.is_nan() {
            warn!("<b>Frequency <yellow>rejected</><b>: not a number</>");
            return self.frequency;
        }

        self.frequency = frequency.clamp(0.0, self.max_frequency());
        self.increment = phase::increment(self.frequency, self.sampling_period);
        self.frequency
    }

    pub fn set_channel(&mut self, channel: u32) -> bool {
        self.channel.set(channel)
    }

    pub fn set_control(&mut self, control: u32) -> bool {
        self.control.set(control)
    }

    pub fn set_msb_control(&mut self, control: u32) -> bool {
        self.msb_control.set(control)
    }

    pub fn set_lsb_control(&mut self, control: u32) -> bool {
        self.lsb_control.set(control)
    }

    /// Sets the lower end of the output range. Must not exceed the current maximum.
    pub fn set_min(&mut self, min: u32) -> bool {
        let accepted = self.min.set(min);
        self.update_range_bounds();
        accepted
    }

    /// Sets the upper end of the output range. Must not be below the current minimum nor above
    /// the full scale of the bit depth.
    pub fn set_max(&mut self, max: u32) -> bool {
        let accepted = self.max.set(max);
        self.update_range_bounds();
        accepted
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    /// Sets the bit depth, in `[7, 14]`. Above 7 bits the value is sent as an MSB/LSB pair.
    ///
    /// The output range is rescaled to cover the same fraction of the new full scale, and the
    /// LSB width is clamped so that the MSB keeps at least 7 bits.
    pub fn set_total_bits(&mut self, total_bits: u32) -> bool {
        let old_scale = full_scale(self.total_bits.get_value());
        if !self.total_bits.set(total_bits) {
            return false;
        }
        let new_scale = full_scale(total_bits);

        let rescale = |value: u32| -> u32 {
            (f64::from(value) * f64::from(new_scale) / f64::from(old_scale)).round() as u32
        };
        let min = rescale(self.min.get_value());
        let max = rescale(self.max.get_value()).min(new_scale);
        self.min.set_bounds(0, max);
        self.max.set_bounds(min, new_scale);
        self.max.force(max);
        self.min.force(min.min(max));
        self.update_range_bounds();

        self.lsb_bits.set_bounds(0, total_bits - MIN_TOTAL_BITS);
        true
    }

    /// Sets how many of the bits go to the LSB message, in `[0, total_bits - 7]`.
    pub fn set_lsb_bits(&mut self, lsb_bits: u32) -> bool {
        self.lsb_bits.set(lsb_bits)
    }

    // min bounded by max and the other way around
    fn update_range_bounds(&mut self) {
        let scale = full_scale(self.total_bits.get_value());
        self.min.set_bounds(0, self.max.get_value());
        self.max.set_bounds(self.min.get_value(), scale);
    }

    pub fn channel(&self) -> u32 {
        self.channel.get_value()
    }

    pub fn control(&self) -> u32 {
        self.control.get_value()
    }

    pub fn msb_control(&self) -> u32 {
        self.msb_control.get_value()
    }

    pub fn lsb_control(&self) -> u32 {
        self.lsb_control.get_value()
    }

    pub fn min(&self) -> u32 {
        self.min.get_value()
    }

    pub fn max(&self) -> u32 {
        self.max.get_value()
    }

    pub fn total_bits(&self) -> u32 {
        self.total_bits.get_value()
    }

    pub fn lsb_bits(&self) -> u32 {
        self.lsb_bits.get_value()
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn sampling_period(&self) -> f64 {
        self.sampling_period
    }

    pub fn increment(&self) -> f64 {
        self.increment
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    pub fn resolution(&self) -> Resolution {
        if self.total_bits() == MIN_TOTAL_BITS {
            Resolution::SevenBit
        } else {
            Resolution::Split {
                total_bits: self.total_bits(),
                lsb_bits: self.lsb_bits(),
            }
        }
    }

    pub fn quantizer(&self) -> ValueQuantizer {
        ValueQuantizer::new(self.min(), self.max(), self.resolution())
    }

    /// All the parameters, for display purposes.
    pub fn parameters(&self) -> [&Parameter; 8] {
        [
            &self.channel,
            &self.control,
            &self.msb_control,
            &self.lsb_control,
            &self.min,
            &self.max,
            &self.total_bits,
            &self.lsb_bits,
        ]
    }
}
