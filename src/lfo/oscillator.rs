use crate::back_end::{self, DEFAULT_CLIENT_NAME};
use crate::lfo::config::is_valid_sampling_period;
use crate::lfo::quantizer::{full_scale, Encoded, SEVEN_BIT_MAX};
use crate::lfo::{
    Config, ConfigError, PhaseAccumulator, Resolution, Waveform, WaveformShaper,
    DEFAULT_SAMPLING_PERIOD,
};
use crate::lock;
use crate::midi::{ControlChange, MidiBackend, MidiPort};
use crossbeam::channel::{self, Receiver, Sender};
use crossbeam::select;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use simplelog::{debug, error, info, warn};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

#[cfg(feature = "verbose_ticks")]
use simplelog::trace;

/// Receives the new output value, normalized to `[0, 1]`, whenever it changes. Runs on the
/// oscillator thread: hand the value over to another thread if it has to be shown elsewhere.
pub type ChangeValueCallback = Box<dyn FnMut(f64) + Send + 'static>;

/// What a tick produced when its value differed from the one before.
#[derive(Debug, Clone, PartialEq)]
pub struct Emission {
    /// The quantized value, in `[min, max]`.
    pub value: u32,
    /// The value as a fraction of the full scale of the bit depth.
    pub normalized: f64,
    /// One Control Change in 7-bit mode, the MSB and then the LSB in split mode.
    pub messages: Vec<ControlChange>,
}

/// The state of one run of the oscillator. Created on start, dropped on stop.
pub struct OscillatorState<R: Rng> {
    phase: PhaseAccumulator,
    /// `None` until the first tick, so the first value is always emitted.
    last_value: Option<u32>,
    shaper: WaveformShaper<R>,
}

impl<R: Rng> OscillatorState<R> {
    pub fn new(rng: R) -> Self {
        Self {
            phase: PhaseAccumulator::new(),
            last_value: None,
            shaper: WaveformShaper::new(rng),
        }
    }

    pub fn phase(&self) -> f64 {
        self.phase.phase()
    }

    pub fn last_value(&self) -> Option<u32> {
        self.last_value
    }

    /// Advances the oscillator one sampling period using the settings in `config`.
    ///
    /// # Returns
    /// What to emit, or `None` when the quantized value did not change.
    pub fn tick(&mut self, config: &Config) -> Option<Emission> {
        let (fraction, wrapped) = self.phase.advance(config.increment());
        let amplitude = self.shaper.shape(config.waveform(), fraction, wrapped);
        let quantizer = config.quantizer();
        let value = quantizer.quantize(amplitude);

        #[cfg(feature = "verbose_ticks")]
        trace!(
            "phase {:.1} | amplitude {:.4} | value {}",
            self.phase.phase(),
            amplitude,
            value
        );

        if self.last_value == Some(value) {
            return None;
        }
        self.last_value = Some(value);

        Some(Emission {
            value,
            normalized: quantizer.normalize(value),
            messages: control_changes(config, quantizer.encode(value)),
        })
    }
}

fn control_changes(config: &Config, encoded: Encoded) -> Vec<ControlChange> {
    let channel = config.channel();
    let messages = match encoded {
        Encoded::Single(value) => {
            vec![ControlChange::new(channel, config.control(), value.into())]
        }
        Encoded::Split { msb, lsb } => vec![
            ControlChange::new(channel, config.msb_control(), msb.into()),
            ControlChange::new(channel, config.lsb_control(), lsb.into()),
        ],
    };

    messages
        .into_iter()
        .filter_map(|message| match message {
            Ok(message) => Some(message),
            Err(e) => {
                error!("<b>Message <red>dropped</><b>: {}</>", e);
                None
            }
        })
        .collect()
}

/// Everything the control side and the oscillator thread share.
struct Shared {
    config: Mutex<Config>,
    port: MidiPort,
    callback: Mutex<Option<ChangeValueCallback>>,
}

struct Worker {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

/// A MIDI low-frequency oscillator.
///
/// # Usage
/// To create one, use the [LfoBuilder] (`Lfo::builder()`). Every setter can be called at any
/// time, also while running: the oscillator thread picks the new settings up on its next tick.
///
/// # Behaviour
/// Once started, a background thread ticks every sampling period:
/// 1. The phase advances by `MAX_PHASE * frequency * sampling_period`.
/// 2. The selected [Waveform] turns the phase into an amplitude.
/// 3. The amplitude is quantized into `[min, max]`.
/// 4. If the value differs from the last one, the change callback runs and the Control Change
/// message(s) go out through the connected port.
///
/// The thread sleeps a full sampling period after each tick; the time spent ticking is not
/// compensated, so the effective rate is slightly below the nominal one.
///
/// # Failures
/// MIDI failures are logged and never stop the oscillator. With no port connected the values are
/// still computed and reported to the callback, but nothing is sent.
pub struct Lfo {
    shared: Arc<Shared>,
    seed: Option<u64>,
    worker: Option<Worker>,
}

impl Lfo {
    pub fn builder() -> LfoBuilder {
        LfoBuilder::new()
    }

    /// A copy of the current settings.
    pub fn config(&self) -> Config {
        lock(&self.shared.config).clone()
    }

    pub fn frequency(&self) -> f64 {
        lock(&self.shared.config).frequency()
    }

    pub fn sampling_period(&self) -> f64 {
        lock(&self.shared.config).sampling_period()
    }

    pub fn max_frequency(&self) -> f64 {
        lock(&self.shared.config).max_frequency()
    }

    /// Sets the tick interval (seconds). The frequency is clamped again to the new limit.
    ///
    /// # Returns
    /// The frequency in effect afterwards.
    pub fn set_sampling_period(&self, sampling_period: f64) -> f64 {
        lock(&self.shared.config).set_sampling_period(sampling_period)
    }

    /// Sets the frequency (Hz), silently clamped to half the sampling rate.
    ///
    /// # Returns
    /// The frequency actually applied.
    pub fn set_frequency(&self, frequency: f64) -> f64 {
        lock(&self.shared.config).set_frequency(frequency)
    }

    pub fn set_channel(&self, channel: u32) -> bool {
        lock(&self.shared.config).set_channel(channel)
    }

    pub fn set_control(&self, control: u32) -> bool {
        lock(&self.shared.config).set_control(control)
    }

    pub fn set_msb_control(&self, control: u32) -> bool {
        lock(&self.shared.config).set_msb_control(control)
    }

    pub fn set_lsb_control(&self, control: u32) -> bool {
        lock(&self.shared.config).set_lsb_control(control)
    }

    pub fn set_min(&self, min: u32) -> bool {
        lock(&self.shared.config).set_min(min)
    }

    pub fn set_max(&self, max: u32) -> bool {
        lock(&self.shared.config).set_max(max)
    }

    pub fn set_waveform(&self, waveform: Waveform) {
        lock(&self.shared.config).set_waveform(waveform)
    }

    pub fn set_total_bits(&self, total_bits: u32) -> bool {
        lock(&self.shared.config).set_total_bits(total_bits)
    }

    pub fn set_lsb_bits(&self, lsb_bits: u32) -> bool {
        lock(&self.shared.config).set_lsb_bits(lsb_bits)
    }

    /// Registers the function told about every change of the output value.
    pub fn set_change_value_callback<F>(&self, callback: F)
    where
        F: FnMut(f64) + Send + 'static,
    {
        *lock(&self.shared.callback) = Some(Box::new(callback));
    }

    pub fn clear_change_value_callback(&self) {
        *lock(&self.shared.callback) = None;
    }

    /// Names of the MIDI output ports available.
    pub fn port_names(&self) -> Vec<String> {
        back_end::output_port_names(self.shared.port.backend())
    }

    /// Opens `device` for output, closing the current connection first.
    ///
    /// # Returns
    /// Whether the device could be opened. On failure nothing is connected, the error is logged.
    pub fn connect(&self, device: &str) -> bool {
        debug!("Connecting to {}...", device);
        match self.shared.port.open(device) {
            Ok(()) => {
                info!("<b>Connected to <green>{}</>", device);
                true
            }
            Err(e) => {
                error!("<b>Error while connecting: <red>{}</>", e);
                false
            }
        }
    }

    /// Closes the current connection, if any. Close errors are logged.
    pub fn disconnect(&self) {
        if let Some(device) = self.shared.port.device() {
            debug!("Disconnecting from {}...", device);
            if let Err(e) = self.shared.port.close() {
                error!("<b>Error while disconnecting: <red>{}</>", e);
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.shared.port.is_open()
    }

    /// Starts the oscillator thread from phase zero. Starting a running oscillator does nothing.
    pub fn start(&mut self) {
        if let Some(worker) = &self.worker {
            if !worker.handle.is_finished() {
                warn!("<b>LFO <yellow>already running</><b>, start ignored.</>");
                return;
            }
            // The previous thread died on its own; reap it before starting over.
            self.stop();
        }

        let rng = match self.seed {
            Some(seed) => Pcg64::seed_from_u64(seed),
            None => Pcg64::from_entropy(),
        };
        let state = OscillatorState::new(rng);
        let (stop, stop_rx) = channel::bounded(1);
        let shared = self.shared.clone();

        let spawned = thread::Builder::new()
            .name("lfo".to_string())
            .spawn(move || lfo_loop(&shared, state, &stop_rx));

        match spawned {
            Ok(handle) => {
                debug!("LFO started");
                self.worker = Some(Worker { stop, handle });
            }
            Err(e) => error!("<b>Could <red>not start</><b> the LFO thread: {}</>", e),
        }
    }

    /// Stops the oscillator thread and waits for it to finish. No message is sent after this
    /// returns. Stopping an idle oscillator does nothing.
    pub fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            // A full or disconnected channel means the thread is already on its way out.
            let _ = worker.stop.try_send(());
            if worker.handle.join().is_err() {
                error!("<b>The LFO thread <red>panicked</>");
            }
            debug!("LFO stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .map_or(false, |worker| !worker.handle.is_finished())
    }
}

impl Drop for Lfo {
    fn drop(&mut self) {
        self.stop();
        self.disconnect();
    }
}

fn lfo_loop<R: Rng>(shared: &Shared, mut state: OscillatorState<R>, stop: &Receiver<()>) {
    loop {
        let config = lock(&shared.config).clone();

        if let Some(emission) = state.tick(&config) {
            if let Some(callback) = lock(&shared.callback).as_mut() {
                callback(emission.normalized);
            }
            for message in &emission.messages {
                if let Err(e) = shared.port.send(message) {
                    error!("<b>Error while sending <yellow>{}</><b>: <red>{}</>", message, e);
                }
            }
        }

        let period = Duration::try_from_secs_f64(config.sampling_period())
            .unwrap_or_else(|_| Duration::from_secs_f64(DEFAULT_SAMPLING_PERIOD));
        select! {
            recv(stop) -> _ => break,
            default(period) => {}
        }
    }
}

/// The [LfoBuilder] is the proper way of generating an [Lfo].
/// # Usage
/// ```rust
/// use midi_lfo::midi::memory::MemoryBackend;
/// use midi_lfo::{Lfo, Waveform};
///
/// let lfo = Lfo::builder().build().unwrap(); // Default LFO
///
/// let lfo = Lfo::builder() // With most values
///     .with_backend(MemoryBackend::new(&["Synth"]))
///     .with_channel(2)
///     .with_control(74)
///     .with_min(20)
///     .with_max(100)
///     .with_frequency(0.5)
///     .with_waveform(Waveform::Triangle)
///     .build()
///     .unwrap();
/// ```
#[derive(Default)]
pub struct LfoBuilder {
    channel: Option<u32>,
    control: Option<u32>,
    msb_control: Option<u32>,
    lsb_control: Option<u32>,
    min: Option<u32>,
    max: Option<u32>,
    frequency: Option<f64>,
    sampling_period: Option<f64>,
    waveform: Option<Waveform>,
    total_bits: Option<u32>,
    lsb_bits: Option<u32>,
    seed: Option<u64>,
    backend: Option<Arc<dyn MidiBackend>>,
    client_name: Option<String>,
}

impl LfoBuilder {
    /// Sets the defaults for the LFO.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the MIDI channel, in `[0, 15]`.
    pub fn with_channel(mut self, channel: u32) -> Self {
        self.channel = Some(channel);
        self
    }

    /// Sets the controller number used in 7-bit mode.
    pub fn with_control(mut self, control: u32) -> Self {
        self.control = Some(control);
        self
    }

    /// Sets the controller number carrying the MSB in split mode.
    pub fn with_msb_control(mut self, control: u32) -> Self {
        self.msb_control = Some(control);
        self
    }

    /// Sets the controller number carrying the LSB in split mode.
    pub fn with_lsb_control(mut self, control: u32) -> Self {
        self.lsb_control = Some(control);
        self
    }

    pub fn with_min(mut self, min: u32) -> Self {
        self.min = Some(min);
        self
    }

    pub fn with_max(mut self, max: u32) -> Self {
        self.max = Some(max);
        self
    }

    /// Sets the frequency in Hz. Clamped to half the sampling rate like [Lfo::set_frequency].
    pub fn with_frequency(mut self, frequency: f64) -> Self {
        self.frequency = Some(frequency);
        self
    }

    /// Sets the tick interval in seconds.
    pub fn with_sampling_period(mut self, sampling_period: f64) -> Self {
        self.sampling_period = Some(sampling_period);
        self
    }

    pub fn with_waveform(mut self, waveform: Waveform) -> Self {
        self.waveform = Some(waveform);
        self
    }

    /// Sets the bit depth, in `[7, 14]`. Min and max are read on that scale.
    pub fn with_total_bits(mut self, total_bits: u32) -> Self {
        self.total_bits = Some(total_bits);
        self
    }

    pub fn with_lsb_bits(mut self, lsb_bits: u32) -> Self {
        self.lsb_bits = Some(lsb_bits);
        self
    }

    /// Seeds the random source of the noise and sample and hold waveforms. Every start replays
    /// the same sequence.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_backend<B: MidiBackend + 'static>(mut self, backend: B) -> Self {
        self.backend = Some(Arc::new(backend));
        self
    }

    /// Sets the client name the default backend registers with.
    pub fn with_client_name(mut self, name: &str) -> Self {
        self.client_name = Some(name.to_string());
        self
    }

    /// Tries to generate an [Lfo] from the given configuration.
    ///
    /// # Default values:
    /// * Channel 0, control 19 (MSB 19, LSB 51)
    /// * Range 0 to 127 (the full scale of the bit depth)
    /// * 0.125 Hz sampled every 30 ms
    /// * Sine waveform, 7 bits
    /// * The [default backend](crate::back_end::default_backend)
    ///
    /// # Expected errors
    /// * Channel, controller numbers, range or bit depth out of range.
    /// * A sampling period that is not positive or longer than a day.
    pub fn build(self) -> Result<Lfo, ConfigError> {
        let mut config = Config::default();

        if let Some(sampling_period) = self.sampling_period {
            if !is_valid_sampling_period(sampling_period) {
                return Err(ConfigError::InvalidSamplingPeriod(sampling_period));
            }
            config.set_sampling_period(sampling_period);
        }
        if let Some(frequency) = self.frequency {
            if !frequency.is_finite() {
                return Err(ConfigError::InvalidFrequency(frequency));
            }
            config.set_frequency(frequency);
        }

        let total_bits = self.total_bits.unwrap_or(config.total_bits());
        let lsb_bits = self.lsb_bits.unwrap_or(0);
        if Resolution::new(total_bits, lsb_bits)?.is_split() && lsb_bits == 0 {
            warn!(
                "<b>{} bit values with <yellow>no</> <b>LSB bits: only the top 7 bits are sent.</>",
                total_bits
            );
        }
        config.set_total_bits(total_bits);
        config.set_lsb_bits(lsb_bits);

        if let Some(channel) = self.channel {
            if !config.set_channel(channel) {
                return Err(ConfigError::ChannelOutOfRange(channel));
            }
        }
        let controls = [
            ("control", self.control),
            ("msb_control", self.msb_control),
            ("lsb_control", self.lsb_control),
        ];
        for (tag, control) in controls {
            if let Some(value) = control {
                if value > SEVEN_BIT_MAX {
                    return Err(ConfigError::ControlOutOfRange { tag, value });
                }
            }
        }
        if let Some(control) = self.control {
            config.set_control(control);
        }
        if let Some(control) = self.msb_control {
            config.set_msb_control(control);
        }
        if let Some(control) = self.lsb_control {
            config.set_lsb_control(control);
        }

        let scale = full_scale(total_bits);
        let min = self.min.unwrap_or(0);
        let max = self.max.unwrap_or(scale);
        if max > scale {
            return Err(ConfigError::ValueOutOfRange {
                tag: "max",
                value: max,
                max: scale,
            });
        }
        if min > max {
            return Err(ConfigError::InvalidRange { min, max });
        }
        config.set_max(max);
        config.set_min(min);

        if let Some(waveform) = self.waveform {
            config.set_waveform(waveform);
        }

        let backend = match self.backend {
            Some(backend) => backend,
            None => back_end::default_backend(
                self.client_name.as_deref().unwrap_or(DEFAULT_CLIENT_NAME),
            ),
        };

        Ok(Lfo {
            shared: Arc::new(Shared {
                config: Mutex::new(config),
                port: MidiPort::new(backend),
                callback: Mutex::new(None),
            }),
            seed: self.seed,
            worker: None,
        })
    }
}
