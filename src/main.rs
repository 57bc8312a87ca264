//! Simulate the DCF77 time signal using simple audio output.
//!
//! This application transmits [DCF77] over the device's default audio output. This works by taking
//! advantage of stray RF signals created by audio hardware as a side effect of their operation --
//! the audio output itself is not useful as clocks listening for the signal use RF rather than
//! audio. A 15.5 kHz tone, the fifth subharmonic of the 77.5 kHz carrier, is keyed off for 100ms
//! or 200ms at the start of every second to send each bit.
//!
//! [DCF77]: https://en.wikipedia.org/wiki/DCF77
//!
//! # Command Line Arguments
//!
//! General form: `dcf77sim [options...]`
//!
//! | Short form | Long form       | Argument            | Default                      | Description                           |
//! | ---------- | --------------- | ------------------- | ---------------------------- | ------------------------------------- |
//! | `-n`, `-c` | `--count`       | Integer > 0         | Unbounded, 1 with `--output` | The number of minutes to transmit     |
//! | `-z`       | `--timezone`    | [TZ string]         | `CET-1CEST,M3.5.0,M10.5.0/3` | The [timezone] of the transmitted time |
//! | `-t`       | `--time`        | [Date time string]  | Current time                 | The starting time to transmit         |
//! | `-r`       | `--sample-rate` | Integer > 0         | 48000                        | Output sample rate in Hz              |
//! |            | `--dst`         | `differential`, `rule` | `differential`            | How daylight saving time is decided   |
//! |            | `--clean`       |                     | Off                          | Use a clean sine tone                 |
//! | `-o`       | `--output`      | Path                | None                         | Write a WAV file instead of playing   |
//!
//! The first minute counted is the remainder of the minute transmission starts in, so `-n 2`
//! started at 12:00:45 ends at 12:02:00.
//!
//! Log verbosity is controlled through the `RUST_LOG` environment variable, defaulting to `info`.
//!
//! [timezone]: time::tz
//! [TZ string]: time::tz::parse_tzstring
//! [date time string]: time::parse::parse_timestamp
//!
//! # Examples
//!
//! Transmit until interrupted
//! ```sh
//! dcf77sim
//! ```
//!
//! Transmit for 8 minutes
//! ```sh
//! dcf77sim -n 8
//! ```
//!
//! Transmit a simulated time, with verbose logging
//! ```sh
//! RUST_LOG=debug dcf77sim -t "2024-10-27 02:55 +02:00"
//! ```
//!
//! Write three minutes to a file
//! ```sh
//! dcf77sim -n 3 -o dcf77.wav
//! ```

use std::num::NonZero;
use std::process::ExitCode;
use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use args::Arguments;
use transmitter::{start_transmission, TransmitConfig, Transmission};
use wav::{write_wav, WavConfig};

mod args;
mod error;
mod transmitter;
mod wav;

/// Start transmitting, retrying once if the audio device could not be acquired.
fn start(config: &TransmitConfig) -> Result<Transmission> {
	match start_transmission(config) {
		Err(e) if e.is_resource() => {
			warn!("{}, retrying", e);
			start_transmission(config).context("Failed to start transmission")
		},
		r => r.context("Failed to start transmission")
	}
}

/// Transmit over the default audio output device until done.
fn play(args: &Arguments) -> Result<()> {
	let config = TransmitConfig {
		timezone: args.timezone,
		dst_method: args.dst.into(),
		waveform: args.waveform(),
		sample_rate: args.sample_rate,
		count: args.count,
		start: args.time
	};
	let transmission = start(&config)?;
	match args.count {
		Some(n) => info!("Transmitting {} minutes", n),
		None => info!("Transmitting until interrupted")
	}

	let outcome = transmission.wait();
	transmission.stop()?;
	outcome.context("Transmission failed")
}

/// Write the signal to the file named by `args.output`.
fn write(args: &Arguments) -> Result<()> {
	let Some(path) = args.output.as_deref() else {
		return Ok(())
	};
	let start = match args.time {
		Some(t) => t,
		None => time::now().context("Failed to get current system time")?
	};
	let config = WavConfig {
		timezone: args.timezone,
		dst_method: args.dst.into(),
		waveform: args.waveform(),
		sample_rate: args.sample_rate,
		count: args.count.unwrap_or(NonZero::<u32>::MIN),
		start
	};
	write_wav(path, &config).with_context(|| format!("Failed to write {}", path.display()))?;
	Ok(())
}

fn main() -> ExitCode {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
	let subscriber = FmtSubscriber::builder()
		.with_env_filter(filter)
		.finish();
	if tracing::subscriber::set_global_default(subscriber).is_err() {
		eprintln!("Failed to set up logging");
	}

	let args = Arguments::parse();
	let result = if args.output.is_some() { write(&args) } else { play(&args) };
	match result {
		Ok(()) => ExitCode::SUCCESS,
		Err(e) => {
			error!("{:#}", e);
			ExitCode::FAILURE
		}
	}
}
