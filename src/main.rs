use anyhow::{anyhow, bail};
use clap::Parser;
use std::io;
use std::thread::sleep;
use std::time::Duration;

// DEBUGGING, LOGGING
use simplelog::__private::paris::Logger;
use simplelog::{debug, info, ColorChoice, LevelFilter, TermLogger, TerminalMode};

// MY STUFF
use midi_lfo::back_end::{get_preferred_port, output_port_names, DEFAULT_CLIENT_NAME};
use midi_lfo::lfo::prelude::*;
use midi_lfo::lfo::{Resolution, DEFAULT_CONTROL, DEFAULT_FREQUENCY, DEFAULT_SAMPLING_PERIOD};
use midi_lfo::midi::midir_backend::MidirBackend;

const METER_WIDTH: usize = 40;

/// Sends a low-frequency oscillator as MIDI Control Change messages.
#[derive(Parser, Debug)]
#[command(name = "midi-lfo", version, about)]
struct Args {
    /// Log what is going on
    #[arg(short, long)]
    verbose: bool,

    /// List the MIDI output ports and exit
    #[arg(short, long)]
    list: bool,

    /// Output port. Defaults to the first one
    #[arg(short, long)]
    device: Option<String>,

    /// Frequency in Hz, at most half the sampling rate
    #[arg(short, long, default_value_t = DEFAULT_FREQUENCY)]
    frequency: f64,

    /// sine, triangle, saw-up, saw-down, square, sample-hold or noise
    #[arg(short, long, default_value_t = Waveform::Sine)]
    waveform: Waveform,

    /// MIDI channel, 0 to 15
    #[arg(short, long, default_value_t = 0)]
    channel: u32,

    /// Controller number (7-bit mode)
    #[arg(long, default_value_t = DEFAULT_CONTROL)]
    control: u32,

    /// Controller number of the MSB (above 7 total bits)
    #[arg(long)]
    msb_control: Option<u32>,

    /// Controller number of the LSB (above 7 total bits)
    #[arg(long)]
    lsb_control: Option<u32>,

    /// Lowest value sent. Defaults to 0
    #[arg(long)]
    min: Option<u32>,

    /// Highest value sent. Defaults to the full scale of the bit depth
    #[arg(long)]
    max: Option<u32>,

    /// Seconds between two ticks
    #[arg(long, default_value_t = DEFAULT_SAMPLING_PERIOD)]
    period: f64,

    /// Resolution of the value, 7 to 14 bits. Above 7 an MSB/LSB pair is sent
    #[arg(long, default_value_t = 7)]
    total_bits: u32,

    /// Bits sent in the LSB message, at most total bits minus 7. Defaults to total bits minus 7
    #[arg(long)]
    lsb_bits: Option<u32>,

    /// Seed for the random waveforms
    #[arg(long)]
    seed: Option<u64>,

    /// Run for this many seconds instead of until Enter is pressed
    #[arg(long)]
    duration: Option<f64>,
}

fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();

    // LOGGER INIT
    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Error
    };
    TermLogger::init(
        level,
        simplelog::Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )?;

    let backend = MidirBackend::new(DEFAULT_CLIENT_NAME);
    let ports = output_port_names(&backend);

    if args.list {
        for port in ports.iter() {
            println!("{}", port);
        }
        return Ok(());
    }

    let device = get_preferred_port(&ports, args.device.as_deref())
        .ok_or_else(|| anyhow!("no MIDI output port to connect to"))?;

    let mut lfo = build_lfo(&args, backend)?;
    lfo.set_change_value_callback(|value| debug!("{}", meter(value)));

    if !lfo.connect(&device) {
        bail!("could not connect to {}", device);
    }

    info!(
        "<b>Running <blue>{}</> <b>at <u>{} Hz</> <b>on <u>{}</>",
        args.waveform,
        lfo.frequency(),
        device
    );
    let mut logger = Logger::new();
    lfo.start();

    match args.duration {
        Some(seconds) => {
            let duration = match Duration::try_from_secs_f64(seconds) {
                Ok(duration) => duration,
                Err(e) => {
                    lfo.stop();
                    bail!("invalid duration {}: {}", seconds, e);
                }
            };
            logger.loading(format!("<blue><info></><b> Running for {} seconds</>", seconds));
            sleep(duration);
        }
        None => {
            logger.loading("<blue><info></><b> Running, press <u>Enter</><b> to stop</>");
            let mut line = String::new();
            io::stdin().read_line(&mut line)?;
        }
    }

    lfo.stop();
    lfo.disconnect();
    logger.done();

    info!("<green><tick></> <b>LFO stopped</>");
    Ok(())
}

fn build_lfo(args: &Args, backend: MidirBackend) -> Result<Lfo, anyhow::Error> {
    let lsb_bits = args
        .lsb_bits
        .unwrap_or_else(|| Resolution::widest_lsb_bits(args.total_bits));
    let mut builder = Lfo::builder()
        .with_backend(backend)
        .with_channel(args.channel)
        .with_control(args.control)
        .with_sampling_period(args.period)
        .with_frequency(args.frequency)
        .with_waveform(args.waveform)
        .with_total_bits(args.total_bits)
        .with_lsb_bits(lsb_bits);

    if let Some(control) = args.msb_control {
        builder = builder.with_msb_control(control);
    }
    if let Some(control) = args.lsb_control {
        builder = builder.with_lsb_control(control);
    }
    if let Some(min) = args.min {
        builder = builder.with_min(min);
    }
    if let Some(max) = args.max {
        builder = builder.with_max(max);
    }
    if let Some(seed) = args.seed {
        builder = builder.with_seed(seed);
    }

    Ok(builder.build()?)
}

/// A text bar for the current value
fn meter(value: f64) -> String {
    let filled = (value.clamp(0.0, 1.0) * METER_WIDTH as f64).round() as usize;
    format!(
        "[{}{}] {:.3}",
        "#".repeat(filled),
        " ".repeat(METER_WIDTH - filled),
        value
    )
}
