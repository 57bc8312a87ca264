//! Write the signal to a WAV file instead of an audio device.

use std::num::NonZero;
use std::path::Path;
use dcf77::{DstMethod, MinuteRenderer, Scheduler, Synthesizer, Waveform};
use hound::{SampleFormat, WavSpec, WavWriter};
use time::{tz::Timezone, TimeSpec, SECONDS_PER_MINUTE};
use tracing::{debug, info};
use crate::error::TransmitError;

/// Samples per scheduler write, matching the live output buffer size.
const CHUNK: usize = 1024;

/// Configuration for [`write_wav`].
#[derive(Clone, Debug)]
pub struct WavConfig {
	pub timezone: Timezone,
	pub dst_method: DstMethod,
	pub waveform: Waveform,
	pub sample_rate: u32,
	/// Minute boundaries to write through, the first minute being the remainder of `start`'s.
	pub count: NonZero<u32>,
	pub start: TimeSpec
}

/// Write exactly what a live transmission started at `config.start` would play, as mono 32-bit
/// float samples.
///
/// Returns the number of samples written.
///
/// # Errors
///
/// Returns [`TransmitError::Wav`] if the file cannot be written, or [`TransmitError::Render`] if a
/// minute cannot be rendered.
pub fn write_wav(path: &Path, config: &WavConfig) -> Result<u64, TransmitError> {
	let renderer = MinuteRenderer::new(
		config.timezone,
		config.dst_method,
		Synthesizer::new(config.sample_rate, config.waveform)
	);
	let slot = config.start.minute_start();
	let mut scheduler = Scheduler::new(config.sample_rate);
	scheduler.prime(renderer.render(slot)?, renderer.render(slot + SECONDS_PER_MINUTE)?)?;
	let position = scheduler.start(config.start)?;
	let total = (config.count.get() as u64 * scheduler.minute_len() as u64)
		.saturating_sub(position.offset as u64);

	let spec = WavSpec {
		channels: 1,
		sample_rate: config.sample_rate,
		bits_per_sample: 32,
		sample_format: SampleFormat::Float
	};
	let mut writer = WavWriter::create(path, spec)?;
	info!("Writing {} samples to {}", total, path.display());

	let mut chunk = [0.; CHUNK];
	let mut remaining = total;
	while remaining > 0 {
		if let Some(next) = scheduler.wants() {
			scheduler.offer(renderer.render(next)?)?;
			debug!(slot = next, "Queued minute");
		}
		let n = remaining.min(CHUNK as u64) as usize;
		scheduler.write(&mut chunk[..n]);
		for &sample in &chunk[..n] {
			writer.write_sample(sample)?;
		}
		remaining -= n as u64;
	}
	scheduler.stop();
	writer.finalize()?;

	info!("Wrote {:.1}s of signal to {}", total as f64 / config.sample_rate as f64, path.display());
	Ok(total)
}
