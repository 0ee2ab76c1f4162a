/// Upper bound of the phase counter. One full cycle of the waveform spans `[0, MAX_PHASE)`.
///
/// The phase is kept in a large integer-like range rather than `[0, 1)` so that the wrap test
/// keeps enough floating point resolution at very low frequencies.
pub const MAX_PHASE: f64 = 1_000_000.0;

/// Phase advance per tick for the given frequency (Hz) and sampling period (seconds).
pub fn increment(frequency: f64, sampling_period: f64) -> f64 {
    MAX_PHASE * frequency * sampling_period
}

/// Advances `phase` by `increment`, wrapping at [MAX_PHASE].
///
/// # Returns
/// The new phase and whether a cycle boundary was crossed on this step.
pub fn advance(phase: f64, increment: f64) -> (f64, bool) {
    let next = phase + increment;
    if next >= MAX_PHASE {
        // The increment never exceeds half a cycle, a single subtraction is enough.
        (next - MAX_PHASE, true)
    } else {
        (next, false)
    }
}

/// The phase counter of a running oscillator.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PhaseAccumulator {
    phase: f64,
}

impl PhaseAccumulator {
    pub fn new() -> Self {
        Self { phase: 0.0 }
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Position inside the current cycle, in `[0, 1)`.
    pub fn fraction(&self) -> f64 {
        self.phase / MAX_PHASE
    }

    /// Moves the counter one tick forward.
    ///
    /// # Returns
    /// The normalized position after the step and the wrap flag.
    pub fn advance(&mut self, increment: f64) -> (f64, bool) {
        let (phase, wrapped) = advance(self.phase, increment);
        self.phase = phase;
        (self.fraction(), wrapped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-6;

    #[test]
    fn test_increment() {
        // Defaults of the application: 0.125 Hz sampled every 30 ms
        assert!((increment(0.125, 0.03) - 3750.0).abs() < TOLERANCE);
        assert_eq!(increment(0.0, 0.03), 0.0);
    }

    #[test]
    fn test_advance_without_wrap() {
        let (phase, wrapped) = advance(1000.0, 250.0);

        assert_eq!(phase, 1250.0);
        assert!(!wrapped, "No wrap expected");
    }

    #[test]
    fn test_advance_wraps() {
        let (phase, wrapped) = advance(MAX_PHASE - 100.0, 300.0);

        assert!((phase - 200.0).abs() < TOLERANCE, "Phase after wrap: {}", phase);
        assert!(wrapped, "Wrap expected");
    }

    #[test]
    fn test_advance_exact_boundary_stays_in_range() {
        let (phase, wrapped) = advance(MAX_PHASE - 500.0, 500.0);

        assert_eq!(phase, 0.0);
        assert!(wrapped);
    }

    #[test]
    fn test_accumulator_matches_modulo() {
        let inc = increment(0.37, 0.011);
        let mut accumulator = PhaseAccumulator::new();
        let mut wraps = 0;

        for n in 1..=10_000u32 {
            let (fraction, wrapped) = accumulator.advance(inc);
            if wrapped {
                wraps += 1;
            }

            let expected = (f64::from(n) * inc) % MAX_PHASE;
            let diff = (accumulator.phase() - expected).abs();
            // Either side of the boundary is the same point of the cycle
            let diff = diff.min(MAX_PHASE - diff);
            assert!(diff < 1e-3, "tick {}: {} vs {}", n, accumulator.phase(), expected);
            assert!((0.0..1.0).contains(&fraction), "Fraction out of range");
        }

        let expected_wraps = (10_000.0 * inc / MAX_PHASE).floor() as u32;
        assert!(wraps == expected_wraps || wraps == expected_wraps + 1);
    }

    #[test]
    fn test_reset() {
        let mut accumulator = PhaseAccumulator::new();
        accumulator.advance(1234.0);
        accumulator.reset();

        assert_eq!(accumulator.phase(), 0.0);
        assert_eq!(accumulator.fraction(), 0.0);
    }
}
