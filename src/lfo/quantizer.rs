use crate::lfo::ConfigError;

/// Largest value a single Control Change can carry.
pub const SEVEN_BIT_MAX: u32 = 127;
/// Bit depth of a plain Control Change.
pub const MIN_TOTAL_BITS: u32 = 7;
/// Two Control Change messages carry at most 14 bits.
pub const MAX_TOTAL_BITS: u32 = 14;

/// How the quantized value is transmitted.
///
/// * [Resolution::SevenBit] sends one Control Change carrying the value as is.
/// * [Resolution::Split] computes the value over `total_bits` and sends it as two Control Change
/// messages: the most significant part first, then the `lsb_bits` wide least significant part.
///
/// # Split encoding
/// For a value `v` and `w = total_bits - lsb_bits` (always at least 7):
/// * MSB field: `v >> lsb_bits`, transmitted as its top 7 bits (`msb >> (w - 7)`).
/// * LSB field: `v & (2^lsb_bits - 1)`, left aligned into 7 bits (`lsb << (7 - lsb_bits)`).
///
/// With 14 total bits and 7 LSB bits this is the usual 14-bit MIDI controller pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resolution {
    #[default]
    SevenBit,
    Split { total_bits: u32, lsb_bits: u32 },
}

impl Resolution {
    /// Picks the resolution for a bit depth. Anything above 7 bits is split in two messages.
    pub fn new(total_bits: u32, lsb_bits: u32) -> Result<Self, ConfigError> {
        if !(MIN_TOTAL_BITS..=MAX_TOTAL_BITS).contains(&total_bits)
            || lsb_bits > total_bits - MIN_TOTAL_BITS
        {
            return Err(ConfigError::InvalidBitDepth {
                total_bits,
                lsb_bits,
            });
        }

        if total_bits == MIN_TOTAL_BITS {
            Ok(Self::SevenBit)
        } else {
            Ok(Self::Split {
                total_bits,
                lsb_bits,
            })
        }
    }

    pub fn total_bits(&self) -> u32 {
        match *self {
            Self::SevenBit => MIN_TOTAL_BITS,
            Self::Split { total_bits, .. } => total_bits,
        }
    }

    /// The widest LSB field `total_bits` allows, which keeps the MSB at exactly 7 bits.
    pub fn widest_lsb_bits(total_bits: u32) -> u32 {
        total_bits
            .clamp(MIN_TOTAL_BITS, MAX_TOTAL_BITS)
            .saturating_sub(MIN_TOTAL_BITS)
    }

    /// Largest value representable at this resolution.
    pub fn full_scale(&self) -> u32 {
        full_scale(self.total_bits())
    }

    pub fn is_split(&self) -> bool {
        matches!(self, Self::Split { .. })
    }
}

/// Largest value representable with `total_bits` bits.
pub fn full_scale(total_bits: u32) -> u32 {
    (1 << total_bits) - 1
}

/// Maps an amplitude in `[0, 1]` to an integer in `[min, max]`.
///
/// Truncates toward `min`: the maximum is only reached with a full amplitude.
pub fn quantize(amplitude: f64, min: u32, max: u32) -> u32 {
    if max <= min {
        return min;
    }
    let span = f64::from(max - min);
    let offset = (amplitude.clamp(0.0, 1.0) * span).floor() as u32;
    (offset + min).clamp(min, max)
}

/// Splits `value` into the MSB and LSB data bytes. See [Resolution] for the layout.
pub fn split(value: u32, total_bits: u32, lsb_bits: u32) -> (u8, u8) {
    let value = value & full_scale(total_bits);
    let msb_width = total_bits - lsb_bits;
    let msb = (value >> lsb_bits) >> (msb_width - MIN_TOTAL_BITS);
    let lsb = (value & full_scale(lsb_bits)) << (MIN_TOTAL_BITS - lsb_bits);

    ((msb & SEVEN_BIT_MAX) as u8, (lsb & SEVEN_BIT_MAX) as u8)
}

/// The data bytes of an emitted value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoded {
    Single(u8),
    Split { msb: u8, lsb: u8 },
}

/// Maps amplitudes to output values for a given range and resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueQuantizer {
    min: u32,
    max: u32,
    resolution: Resolution,
}

impl ValueQuantizer {
    /// `min` and `max` are clamped into the range of the resolution.
    pub fn new(min: u32, max: u32, resolution: Resolution) -> Self {
        let full_scale = resolution.full_scale();
        let max = max.min(full_scale);
        Self {
            min: min.min(max),
            max,
            resolution,
        }
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn quantize(&self, amplitude: f64) -> u32 {
        quantize(amplitude, self.min, self.max)
    }

    pub fn encode(&self, value: u32) -> Encoded {
        match self.resolution {
            Resolution::SevenBit => Encoded::Single(value.min(SEVEN_BIT_MAX) as u8),
            Resolution::Split {
                total_bits,
                lsb_bits,
            } => {
                let (msb, lsb) = split(value, total_bits, lsb_bits);
                Encoded::Split { msb, lsb }
            }
        }
    }

    /// The value as a fraction of the full scale of the resolution (`value / 127` for 7 bits).
    pub fn normalize(&self, value: u32) -> f64 {
        f64::from(value) / f64::from(self.resolution.full_scale())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod resolution_tests {
        use super::*;

        #[test]
        fn test_seven_bit() {
            let resolution = Resolution::new(7, 0).unwrap();

            assert_eq!(resolution, Resolution::SevenBit);
            assert_eq!(resolution.full_scale(), 127);
            assert!(!resolution.is_split());
        }

        #[test]
        fn test_split() {
            let resolution = Resolution::new(14, 7).unwrap();

            assert_eq!(resolution.total_bits(), 14);
            assert_eq!(resolution.full_scale(), 16383);
            assert!(resolution.is_split());
        }

        #[test]
        fn test_invalid_depths() {
            assert!(Resolution::new(6, 0).is_err(), "Below 7 bits accepted");
            assert!(Resolution::new(15, 0).is_err(), "Above 14 bits accepted");
            assert!(Resolution::new(7, 1).is_err(), "LSB bits without room accepted");
            assert!(Resolution::new(10, 4).is_err(), "MSB narrower than 7 bits accepted");
            assert!(Resolution::new(10, 3).is_ok());
        }

        #[test]
        fn test_widest_lsb_bits() {
            assert_eq!(Resolution::widest_lsb_bits(7), 0);
            assert_eq!(Resolution::widest_lsb_bits(10), 3);
            assert_eq!(Resolution::widest_lsb_bits(14), 7);
            assert_eq!(Resolution::widest_lsb_bits(20), 7);

            let widest = Resolution::widest_lsb_bits(14);
            assert!(Resolution::new(14, widest).is_ok());
            // Every bit reaches the wire.
            assert_eq!(split(16383, 14, widest), (127, 127));
            assert_eq!(split(1, 14, widest), (0, 1));
        }
    }

    mod quantize_tests {
        use super::*;

        #[test]
        fn test_bounds() {
            assert_eq!(quantize(0.0, 10, 20), 10);
            assert_eq!(quantize(1.0, 10, 20), 20);
            assert_eq!(quantize(0.0, 0, 127), 0);
            assert_eq!(quantize(1.0, 0, 127), 127);
        }

        #[test]
        fn test_truncates() {
            // 0.5 * 127 = 63.5
            assert_eq!(quantize(0.5, 0, 127), 63);
            assert_eq!(quantize(0.999, 10, 20), 19);
            assert_eq!(quantize(0.0999, 0, 10), 0);
        }

        #[test]
        fn test_always_in_range() {
            for step in 0..=10_000 {
                let amplitude = f64::from(step) / 10_000.0;
                let value = quantize(amplitude, 10, 20);
                assert!((10..=20).contains(&value), "{} -> {}", amplitude, value);
            }
        }

        #[test]
        fn test_degenerate_input() {
            assert_eq!(quantize(1.5, 10, 20), 20);
            assert_eq!(quantize(-0.5, 10, 20), 10);
            assert_eq!(quantize(f64::NAN, 10, 20), 10);
            assert_eq!(quantize(0.7, 42, 42), 42);
        }
    }

    mod split_tests {
        use super::*;

        #[test]
        fn test_fourteen_bit_pair() {
            assert_eq!(split(0, 14, 7), (0, 0));
            assert_eq!(split(16383, 14, 7), (127, 127));
            assert_eq!(split(8192, 14, 7), (64, 0));
            assert_eq!(split(0x1FFF, 14, 7), (63, 127));
            assert_eq!(split(200, 14, 7), (1, 72));
        }

        #[test]
        fn test_narrow_lsb_is_left_aligned() {
            // 10 bits: 7 in the MSB, 3 in the LSB
            assert_eq!(split(1023, 10, 3), (127, 112));
            assert_eq!(split(0b0000001_001, 10, 3), (1, 16));
        }

        #[test]
        fn test_wide_msb_keeps_top_bits() {
            // 14 bits with a 3 bit LSB: the MSB field is 11 bits wide
            assert_eq!(split(16383, 14, 3), (127, 112));
            assert_eq!(split(0b1000000_0000_000, 14, 3), (64, 0));
        }

        #[test]
        fn test_no_lsb_bits() {
            assert_eq!(split(255, 8, 0), (127, 0));
            assert_eq!(split(2, 8, 0), (1, 0));
        }
    }

    mod quantizer_tests {
        use super::*;

        #[test]
        fn test_seven_bit_encoding() {
            let quantizer = ValueQuantizer::new(0, 127, Resolution::SevenBit);

            assert_eq!(quantizer.quantize(1.0), 127);
            assert_eq!(quantizer.encode(64), Encoded::Single(64));
            assert!((quantizer.normalize(127) - 1.0).abs() < 1e-12);
            assert!((quantizer.normalize(0)).abs() < 1e-12);
        }

        #[test]
        fn test_split_encoding() {
            let resolution = Resolution::new(14, 7).unwrap();
            let quantizer = ValueQuantizer::new(0, 16383, resolution);

            let value = quantizer.quantize(0.5);
            assert_eq!(value, 8191);
            assert_eq!(quantizer.encode(value), Encoded::Split { msb: 63, lsb: 127 });
            assert!((quantizer.normalize(16383) - 1.0).abs() < 1e-12);
        }

        #[test]
        fn test_range_clamped_to_resolution() {
            let quantizer = ValueQuantizer::new(100, 500, Resolution::SevenBit);

            assert_eq!(quantizer.quantize(1.0), 127);
            assert_eq!(quantizer.quantize(0.0), 100);
        }
    }
}
