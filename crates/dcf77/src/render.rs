//! Turn minute slots into playable buffers.

use time::{tz::Timezone, SECONDS_PER_MINUTE};
use tracing::debug;
use crate::civil::{CivilTime, CivilTimeError, DstMethod};
use crate::frame::{encode, MinuteFrame};
use crate::synth::{MinuteBuffer, Synthesizer};

/// Renders the buffer played during a given minute.
///
/// A DCF77 minute announces the time at its end marker, so the buffer played during the minute
/// starting at `t` encodes the civil time at `t + 60`.
///
/// # Examples
///
/// ```
/// # use dcf77::{DstMethod, MinuteRenderer, Synthesizer, Waveform};
/// # use time::tz::CENTRAL_EUROPE;
/// let renderer = MinuteRenderer::new(CENTRAL_EUROPE, DstMethod::Differential, Synthesizer::new(8000, Waveform::Quantized));
///
/// // Fri, Mar 15, 2024. 12:36 UTC, announcing 13:37 CET
/// let minute = renderer.render(1710506160).unwrap();
/// assert_eq!(minute.start(), 1710506160);
/// assert_eq!(minute.len(), 8000 * 60);
/// assert_eq!(
/// 	renderer.frame(1710506160).unwrap().to_string(),
/// 	"00011101111101000010111101101110010110101010111000001001001-"
/// );
/// ```
#[derive(Clone, Debug)]
pub struct MinuteRenderer {
	timezone: Timezone,
	dst_method: DstMethod,
	synthesizer: Synthesizer
}

impl MinuteRenderer {
	pub fn new(timezone: Timezone, dst_method: DstMethod, synthesizer: Synthesizer) -> MinuteRenderer {
		MinuteRenderer { timezone, dst_method, synthesizer }
	}

	pub fn sample_rate(&self) -> u32 {
		self.synthesizer.sample_rate()
	}

	/// The civil time announced during the minute containing `slot_start`.
	///
	/// # Errors
	///
	/// Returns [`CivilTimeError::UnsupportedTime`] if the announced time is before the Unix epoch.
	pub fn announced(&self, slot_start: i64) -> Result<CivilTime, CivilTimeError> {
		let slot = slot_start - slot_start.rem_euclid(SECONDS_PER_MINUTE);
		CivilTime::at(slot + SECONDS_PER_MINUTE, &self.timezone, self.dst_method)
	}

	/// The frame played during the minute containing `slot_start`.
	///
	/// # Errors
	///
	/// Returns [`CivilTimeError::UnsupportedTime`] if the announced time is before the Unix epoch.
	pub fn frame(&self, slot_start: i64) -> Result<MinuteFrame, CivilTimeError> {
		self.announced(slot_start).map(|t| encode(&t))
	}

	/// The buffer played during the minute containing `slot_start`, tagged with the minute's start.
	///
	/// # Errors
	///
	/// Returns [`CivilTimeError::UnsupportedTime`] if the announced time is before the Unix epoch.
	pub fn render(&self, slot_start: i64) -> Result<MinuteBuffer, CivilTimeError> {
		let slot = slot_start - slot_start.rem_euclid(SECONDS_PER_MINUTE);
		let time = self.announced(slot)?;
		let frame = encode(&time);
		debug!(slot, %time, %frame, "Rendered minute");
		Ok(self.synthesizer.minute(&frame, slot))
	}
}
