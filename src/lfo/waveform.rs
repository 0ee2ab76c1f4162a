use crate::lfo::ConfigError;
use rand::Rng;
use std::f64::consts::TAU;
use std::fmt;
use std::str::FromStr;

/// The shapes the LFO can follow. Every shape maps the position inside the cycle to an
/// amplitude in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Waveform {
    #[default]
    Sine,
    Triangle,
    SawUp,
    SawDown,
    Square,
    /// A random level held for a whole cycle.
    SampleHold,
    /// A fresh random level on every tick.
    Noise,
}

impl Waveform {
    pub const ALL: [Waveform; 7] = [
        Waveform::Sine,
        Waveform::Triangle,
        Waveform::SawUp,
        Waveform::SawDown,
        Waveform::Square,
        Waveform::SampleHold,
        Waveform::Noise,
    ];

    /// Maps the position of the wave selector of the desktop application to a waveform.
    /// # Example
    /// ```
    /// use midi_lfo::Waveform;
    ///
    /// assert_eq!(Waveform::from_index(4), Some(Waveform::Sine));
    /// ```
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Noise),
            1 => Some(Self::SampleHold),
            2 => Some(Self::SawDown),
            3 => Some(Self::SawUp),
            4 => Some(Self::Sine),
            5 => Some(Self::Square),
            6 => Some(Self::Triangle),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Sine => "sine",
            Self::Triangle => "triangle",
            Self::SawUp => "saw-up",
            Self::SawDown => "saw-down",
            Self::Square => "square",
            Self::SampleHold => "sample-hold",
            Self::Noise => "noise",
        }
    }

    /// Whether the waveform draws from the random source.
    pub fn is_random(&self) -> bool {
        matches!(self, Self::SampleHold | Self::Noise)
    }
}

impl fmt::Display for Waveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Waveform {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|waveform| waveform.name() == wanted)
            .or(match wanted.as_str() {
                "sin" => Some(Self::Sine),
                "tri" => Some(Self::Triangle),
                "saw" => Some(Self::SawUp),
                "snh" | "s&h" => Some(Self::SampleHold),
                _ => None,
            })
            .ok_or_else(|| ConfigError::UnknownWaveform(s.to_string()))
    }
}

/// The deterministic shapes, evaluated on the position inside the cycle (`[0, 1)`).
pub trait WaveMath {
    fn sine(self) -> Self;
    fn tri(self) -> Self;
    fn saw_up(self) -> Self;
    fn saw_down(self) -> Self;
    fn sqr(self) -> Self;
}

impl WaveMath for f64 {
    fn sine(self) -> Self {
        0.5 * (self * TAU).sin() + 0.5
    }

    // Starts at the midpoint like the sine so that switching shapes does not jump
    fn tri(self) -> Self {
        if self < 0.25 {
            0.5 + 2.0 * self
        } else if self < 0.75 {
            1.0 - (self - 0.25) * 2.0
        } else {
            (self - 0.75) * 2.0
        }
    }

    fn saw_up(self) -> Self {
        self
    }

    fn saw_down(self) -> Self {
        1.0 - self
    }

    fn sqr(self) -> Self {
        if self < 0.5 {
            0.0
        } else {
            1.0
        }
    }
}

/// Turns the position inside the cycle into an amplitude.
///
/// The shaper owns the random source of the random waveforms and the level currently held by
/// [Waveform::SampleHold]. The held level is drawn once on creation, so a sample and hold
/// oscillator has a level to output before its first cycle wraps.
#[derive(Debug, Clone)]
pub struct WaveformShaper<R: Rng> {
    held_sample: f64,
    rng: R,
}

impl<R: Rng> WaveformShaper<R> {
    pub fn new(mut rng: R) -> Self {
        let held_sample = rng.gen::<f64>();
        Self { held_sample, rng }
    }

    pub fn held_sample(&self) -> f64 {
        self.held_sample
    }

    /// # Arguments
    /// * `fraction` - position inside the cycle, in `[0, 1)`.
    /// * `wrapped` - whether a new cycle started on this tick.
    ///
    /// # Returns
    /// The amplitude, in `[0, 1]`.
    pub fn shape(&mut self, waveform: Waveform, fraction: f64, wrapped: bool) -> f64 {
        match waveform {
            Waveform::Sine => fraction.sine(),
            Waveform::Triangle => fraction.tri(),
            Waveform::SawUp => fraction.saw_up(),
            Waveform::SawDown => fraction.saw_down(),
            Waveform::Square => fraction.sqr(),
            Waveform::SampleHold => {
                if wrapped {
                    self.held_sample = self.rng.gen::<f64>();
                }
                self.held_sample
            }
            Waveform::Noise => self.rng.gen::<f64>(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    const TOLERANCE: f64 = 1e-9;

    fn get_shaper() -> WaveformShaper<Pcg64> {
        WaveformShaper::new(Pcg64::seed_from_u64(7))
    }

    fn assert_close(actual: f64, expected: f64, what: &str) {
        assert!(
            (actual - expected).abs() < TOLERANCE,
            "{}: expected {}, got {}",
            what,
            expected,
            actual
        );
    }

    mod waveform_tests {
        use super::*;

        #[test]
        fn test_from_index() {
            let order: Vec<Waveform> = (0..7).filter_map(Waveform::from_index).collect();

            assert_eq!(
                order,
                vec![
                    Waveform::Noise,
                    Waveform::SampleHold,
                    Waveform::SawDown,
                    Waveform::SawUp,
                    Waveform::Sine,
                    Waveform::Square,
                    Waveform::Triangle,
                ]
            );
            assert_eq!(Waveform::from_index(7), None);
        }

        #[test]
        fn test_names() {
            for waveform in Waveform::ALL {
                let parsed: Waveform = waveform.to_string().parse().unwrap();
                assert_eq!(parsed, waveform, "Name of {:?} does not parse back", waveform);
            }

            assert_eq!("SAW_DOWN".parse::<Waveform>().unwrap(), Waveform::SawDown);
            assert_eq!("snh".parse::<Waveform>().unwrap(), Waveform::SampleHold);
            assert!("wobble".parse::<Waveform>().is_err());
        }

        #[test]
        fn test_is_random() {
            assert!(Waveform::Noise.is_random());
            assert!(Waveform::SampleHold.is_random());
            assert!(!Waveform::Sine.is_random());
        }
    }

    mod shaper_tests {
        use super::*;

        #[test]
        fn test_sine() {
            let mut shaper = get_shaper();

            assert_close(shaper.shape(Waveform::Sine, 0.0, false), 0.5, "sine(0)");
            assert_close(shaper.shape(Waveform::Sine, 0.25, false), 1.0, "sine(0.25)");
            assert_close(shaper.shape(Waveform::Sine, 0.5, false), 0.5, "sine(0.5)");
            assert_close(shaper.shape(Waveform::Sine, 0.75, true), 0.0, "sine(0.75)");
        }

        #[test]
        fn test_triangle() {
            let mut shaper = get_shaper();

            assert_close(shaper.shape(Waveform::Triangle, 0.0, false), 0.5, "tri(0)");
            assert_close(shaper.shape(Waveform::Triangle, 0.25, false), 1.0, "tri(0.25)");
            assert_close(shaper.shape(Waveform::Triangle, 0.5, false), 0.5, "tri(0.5)");
            assert_close(shaper.shape(Waveform::Triangle, 0.75, false), 0.0, "tri(0.75)");
            assert_close(shaper.shape(Waveform::Triangle, 1.0, false), 0.5, "tri(1)");
        }

        #[test]
        fn test_saws() {
            let mut shaper = get_shaper();

            for step in 0..100 {
                let x = f64::from(step) / 100.0;
                assert_close(shaper.shape(Waveform::SawUp, x, false), x, "saw up");
                assert_close(shaper.shape(Waveform::SawDown, x, false), 1.0 - x, "saw down");
            }
        }

        #[test]
        fn test_square() {
            let mut shaper = get_shaper();

            assert_eq!(shaper.shape(Waveform::Square, 0.0, false), 0.0);
            assert_eq!(shaper.shape(Waveform::Square, 0.4999, false), 0.0);
            assert_eq!(shaper.shape(Waveform::Square, 0.5, false), 1.0);
            assert_eq!(shaper.shape(Waveform::Square, 0.99, false), 1.0);
        }

        #[test]
        fn test_sample_hold_changes_only_on_wrap() {
            let mut shaper = get_shaper();
            let seeded = shaper.held_sample();

            for step in 0..50 {
                let value = shaper.shape(Waveform::SampleHold, f64::from(step) / 50.0, false);
                assert_eq!(value, seeded, "Held level changed inside the cycle");
            }

            let redrawn = shaper.shape(Waveform::SampleHold, 0.01, true);
            assert_ne!(redrawn, seeded, "Held level not redrawn on wrap");
            assert!((0.0..1.0).contains(&redrawn));

            for _ in 0..10 {
                assert_eq!(shaper.shape(Waveform::SampleHold, 0.5, false), redrawn);
            }
        }

        #[test]
        fn test_noise() {
            let mut shaper = get_shaper();
            let values: Vec<f64> = (0..32)
                .map(|_| shaper.shape(Waveform::Noise, 0.3, false))
                .collect();

            assert!(values.iter().all(|v| (0.0..1.0).contains(v)));
            assert!(values.windows(2).any(|w| w[0] != w[1]), "Noise is constant");
        }

        #[test]
        fn test_seeded_shapers_agree() {
            let mut a = get_shaper();
            let mut b = get_shaper();

            assert_eq!(a.held_sample(), b.held_sample());
            for _ in 0..16 {
                assert_eq!(
                    a.shape(Waveform::Noise, 0.0, false),
                    b.shape(Waveform::Noise, 0.0, false)
                );
            }
        }

        #[test]
        fn test_every_shape_in_unit_range() {
            let mut shaper = get_shaper();

            for waveform in Waveform::ALL {
                for step in 0..=1000 {
                    let fraction = f64::from(step) / 1001.0;
                    let value = shaper.shape(waveform, fraction, step % 100 == 0);
                    assert!(
                        (0.0..=1.0).contains(&value),
                        "{} gives {} at {}",
                        waveform,
                        value,
                        fraction
                    );
                }
            }
        }
    }
}
