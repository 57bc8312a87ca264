//! Support for command line argument parsing.
//!
//! See [crate] documentation for details on command line arguments and examples.

use std::num::NonZero;
use std::path::PathBuf;
use std::str::FromStr;
use clap::{Parser, ValueEnum};
use dcf77::{DstMethod, Waveform};
use time::tz::Timezone;
use time::{parse_timestamp, ParseError, TimeSpec};

/// How to decide whether daylight saving time is in effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum DstArg {
	/// Compare the offset with the zone's January and July offsets
	Differential,
	/// Use the TZ rule's own daylight saving flag
	Rule
}

impl From<DstArg> for DstMethod {
	fn from(value: DstArg) -> Self {
		match value {
			DstArg::Differential => DstMethod::Differential,
			DstArg::Rule => DstMethod::Rule
		}
	}
}

fn parse_time(s: &str) -> Result<TimeSpec, ParseError> {
	parse_timestamp(s)
}

/// Parsed command line arguments.
#[derive(Debug, PartialEq, Parser)]
#[command(name = "dcf77sim", version)]
#[command(about = "Simulate the DCF77 time signal to set radio-controlled clocks with no extra hardware.")]
#[command(after_help = "\
Examples:
  dcf77sim -n 8
  dcf77sim -z \"CET-1CEST,M3.5.0,M10.5.0/3\" --dst rule
  dcf77sim -t \"2024-04-12 10:27:00.519 +02:00\"
  dcf77sim -n 3 -r 44100 -o dcf77.wav")]
pub struct Arguments {
	/// The number of minutes to transmit [default: unbounded, 1 with --output]
	#[arg(short = 'n', visible_short_alias = 'c', long)]
	pub count: Option<NonZero<u32>>,

	/// POSIX TZ string for the transmitted civil time
	#[arg(short = 'z', long, default_value = "CET-1CEST,M3.5.0,M10.5.0/3", value_parser = Timezone::from_str)]
	pub timezone: Timezone,

	/// The starting time, `YYYY-MM-DD[ HH:MM[:SS[.mmm]]][ ±HH:MM|Z]` [default: now]
	#[arg(short, long, value_parser = parse_time)]
	pub time: Option<TimeSpec>,

	/// Output sample rate in Hz
	#[arg(short = 'r', long, default_value_t = 48000, value_parser = clap::value_parser!(u32).range(1..))]
	pub sample_rate: u32,

	/// How to decide whether daylight saving time is in effect
	#[arg(long, value_enum, default_value_t = DstArg::Differential)]
	pub dst: DstArg,

	/// Use a clean sine tone instead of the quantized one
	#[arg(long)]
	pub clean: bool,

	/// Write a WAV file instead of playing
	#[arg(short, long)]
	pub output: Option<PathBuf>
}

impl Arguments {
	pub fn waveform(&self) -> Waveform {
		if self.clean { Waveform::Clean } else { Waveform::Quantized }
	}
}
