use simplelog::warn;

/// Parameters are the integer knobs of the LFO: the MIDI channel, the controller numbers, the
/// output range and the bit depth. Each one carries its own valid range so that the values read
/// by the oscillator thread are always transmittable.
///
/// A parameter never holds a value outside `[min, max]`. Out of range requests are rejected and
/// the previous value is kept back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parameter {
    /// Maximum value that the parameter can reach.
    max: u32,
    /// Minimum value that the parameter can reach.
    min: u32,
    /// The starting (or default) value of the parameter.
    default: u32,
    /// The runtime value of the parameter.
    current: u32,
    /// The tag of the parameter. Works as identifier in the log output.
    tag: &'static str,
}

impl Parameter {
    /// Creates a parameter. The default gets clamped into `[min, max]`.
    pub(crate) const fn new(tag: &'static str, min: u32, max: u32, default: u32) -> Self {
        let default = if default < min {
            min
        } else if default > max {
            max
        } else {
            default
        };

        Self {
            max,
            min,
            default,
            current: default,
            tag,
        }
    }

    pub fn get_tag(&self) -> &'static str {
        self.tag
    }

    pub fn get_value(&self) -> u32 {
        self.current
    }

    pub fn get_default(&self) -> u32 {
        self.default
    }

    pub fn get_min(&self) -> u32 {
        self.min
    }

    pub fn get_max(&self) -> u32 {
        self.max
    }

    pub fn in_range(&self, value: u32) -> bool {
        value <= self.max && value >= self.min
    }

    /// Sets the value of a parameter. Returns `false` when the value was kept back.
    pub fn set(&mut self, value: u32) -> bool {
        if self.in_range(value) {
            self.current = value;
            true
        } else {
            warn!("<b>Value <yellow>out of range</><b>.</>");
            warn!("  |_ Parameter: <yellow>{}</>", self.tag);
            warn!("  |_ Input value: <red>{}</>", value);
            warn!("  |_ Valid range: <green>[{}, {}]</>", self.min, self.max);
            warn!("  |_ Value kept back.");
            false
        }
    }

    /// Moves the valid range of the parameter. The current value is clamped into it.
    pub(crate) fn set_bounds(&mut self, min: u32, max: u32) {
        self.min = min;
        self.max = max.max(min);
        self.current = self.current.clamp(self.min, self.max);
    }

    /// Writes a value without range checking. Only for values already clamped by the caller.
    pub(crate) fn force(&mut self, value: u32) {
        self.current = value;
    }
}
