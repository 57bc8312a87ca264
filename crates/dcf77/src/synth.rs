//! Render frames as audio.
//!
//! Each second starts with a silent notch whose length carries the bit: 100ms for a zero, 200ms for
//! a one, and the whole second for the minute marker. The rest of the second is a tone at
//! [`CARRIER_HZ`], the fifth subharmonic of the real 77.5 kHz carrier, since 77.5 kHz cannot be
//! sampled at common audio output rates. Stray emissions from audio hardware at the harmonics of
//! the tone are what a nearby receiver picks up.
//!
//! The tone's phase restarts at every second, so every second of a given bit is identical. This
//! lets [`Synthesizer`] render the three possible seconds once and build minutes by copying.
//!
//! # Examples
//!
//! ```
//! # use dcf77::{encode, synthesize_minute, CivilTime};
//! let t = CivilTime::new(24, 3, 15, 5, 13, 37, false).unwrap();
//! let minute = synthesize_minute(&encode(&t), 8000);
//! assert_eq!(minute.len(), 8000 * 60);
//!
//! // The first second is a zero: 100ms of silence, then the tone
//! assert!(minute.samples()[..800].iter().all(|&s| s == 0.));
//! assert!(minute.samples()[800..8000].iter().any(|&s| s != 0.));
//! ```

use std::{f64::consts::TAU, ops::Deref, sync::Arc};
use crate::frame::{Bit, MinuteFrame, FRAME_LEN};
use crate::CARRIER_HZ;

/// Shape of the tone.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Waveform {
	/// Sine quantized down to steps of `3 / sample_rate`.
	#[default]
	Quantized,
	/// Plain sine.
	Clean
}

/// Number of silent samples at the start of a second carrying `bit`.
///
/// Rounds up, so any sample rate gets at least the nominal notch.
///
/// ```
/// # use dcf77::{frame::Bit, synth::notch_len};
/// assert_eq!(notch_len(Bit::Zero, 48000), 4800);
/// assert_eq!(notch_len(Bit::One, 48000), 9600);
/// assert_eq!(notch_len(Bit::Marker, 48000), 48000);
/// assert_eq!(notch_len(Bit::Zero, 44101), 4411);
/// ```
pub const fn notch_len(bit: Bit, sample_rate: u32) -> usize {
	let tenths = match bit {
		Bit::Zero => 1,
		Bit::One => 2,
		Bit::Marker => 10
	};
	(sample_rate as usize * tenths).div_ceil(10)
}

/// One second of audio for a single frame position.
#[derive(Clone, Debug, PartialEq)]
pub struct SecondWaveform(Box<[f32]>);

impl Deref for SecondWaveform {
	type Target = [f32];

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

/// Synthesize one second of audio for `bit`.
///
/// Returns `sample_rate` samples. The first [`notch_len`] samples are zero; sample `i` after that
/// is the tone at phase `i / (sample_rate / carrier_hz / 2π)`.
///
/// # Panics
///
/// Panics if `sample_rate` is zero.
pub fn synthesize_second(bit: Bit, carrier_hz: f64, sample_rate: u32, waveform: Waveform) -> SecondWaveform {
	assert!(sample_rate > 0, "sample rate must be positive");
	let notch = notch_len(bit, sample_rate);
	let samples_per_radian = sample_rate as f64 / carrier_hz / TAU;
	let depth = sample_rate as f64 / 3.;

	SecondWaveform((0..sample_rate as usize)
		.map(|i| {
			if i < notch {
				return 0.
			}
			let s = (i as f64 / samples_per_radian).sin();
			match waveform {
				Waveform::Quantized => ((s * depth).floor() / depth) as f32,
				Waveform::Clean => s as f32
			}
		})
		.collect())
}

/// One minute of audio, tagged with the Unix timestamp of the minute it is played in.
///
/// Cloning shares the samples.
#[derive(Clone, Debug, PartialEq)]
pub struct MinuteBuffer {
	start: i64,
	samples: Arc<[f32]>
}

impl MinuteBuffer {
	pub fn new(start: i64, samples: Arc<[f32]>) -> MinuteBuffer {
		MinuteBuffer { start, samples }
	}

	/// Retag the buffer for the minute starting at `start`.
	pub fn with_start(self, start: i64) -> MinuteBuffer {
		MinuteBuffer { start, ..self }
	}

	/// Unix timestamp of the start of the minute this buffer is played in.
	pub fn start(&self) -> i64 {
		self.start
	}

	pub fn samples(&self) -> &[f32] {
		&self.samples
	}

	pub fn len(&self) -> usize {
		self.samples.len()
	}

	pub fn is_empty(&self) -> bool {
		self.samples.is_empty()
	}
}

/// Renders minutes at a fixed sample rate from cached seconds.
#[derive(Clone, Debug)]
pub struct Synthesizer {
	sample_rate: u32,
	zero: SecondWaveform,
	one: SecondWaveform,
	marker: SecondWaveform
}

impl Synthesizer {
	/// A synthesizer using the standard [`CARRIER_HZ`] tone.
	///
	/// # Panics
	///
	/// Panics if `sample_rate` is zero.
	pub fn new(sample_rate: u32, waveform: Waveform) -> Synthesizer {
		Synthesizer::with_carrier(CARRIER_HZ, sample_rate, waveform)
	}

	/// A synthesizer using a tone at `carrier_hz`.
	///
	/// # Panics
	///
	/// Panics if `sample_rate` is zero.
	pub fn with_carrier(carrier_hz: f64, sample_rate: u32, waveform: Waveform) -> Synthesizer {
		Synthesizer {
			sample_rate,
			zero: synthesize_second(Bit::Zero, carrier_hz, sample_rate, waveform),
			one: synthesize_second(Bit::One, carrier_hz, sample_rate, waveform),
			marker: synthesize_second(Bit::Marker, carrier_hz, sample_rate, waveform)
		}
	}

	pub fn sample_rate(&self) -> u32 {
		self.sample_rate
	}

	/// Number of samples in one minute.
	pub fn minute_len(&self) -> usize {
		self.sample_rate as usize * FRAME_LEN
	}

	/// The cached second for `bit`.
	pub fn second(&self, bit: Bit) -> &SecondWaveform {
		match bit {
			Bit::Zero => &self.zero,
			Bit::One => &self.one,
			Bit::Marker => &self.marker
		}
	}

	/// Render `frame` as the minute starting at Unix timestamp `start`.
	pub fn minute(&self, frame: &MinuteFrame, start: i64) -> MinuteBuffer {
		let mut samples = Vec::with_capacity(self.minute_len());
		for &bit in frame.bits() {
			samples.extend_from_slice(self.second(bit));
		}
		MinuteBuffer::new(start, samples.into())
	}
}

/// Synthesize one minute for `frame` with the standard tone and default waveform.
///
/// The buffer is tagged with start `0`; see [`MinuteBuffer::with_start`].
///
/// # Panics
///
/// Panics if `sample_rate` is zero.
pub fn synthesize_minute(frame: &MinuteFrame, sample_rate: u32) -> MinuteBuffer {
	Synthesizer::new(sample_rate, Waveform::default()).minute(frame, 0)
}

#[cfg(test)]
mod tests {
	use approx::assert_abs_diff_eq;
	use super::*;
	use crate::{encode, CivilTime};

	fn frame() -> MinuteFrame {
		encode(&CivilTime::new(24, 3, 15, 5, 13, 37, false).unwrap())
	}

	fn power(buffer: &[f32]) -> f64 {
		buffer.iter().map(|&s| s.abs() as f64).sum::<f64>() / buffer.len() as f64
	}

	#[test]
	fn second_test() {
		for (bit, notch) in [(Bit::Zero, 4800), (Bit::One, 9600)] {
			let s = synthesize_second(bit, CARRIER_HZ, 48000, Waveform::Quantized);
			assert_eq!(s.len(), 48000);
			assert!(s[..notch].iter().all(|&v| v == 0.));
			// Mean absolute value of a sine is 2/pi
			assert_abs_diff_eq!(power(&s[notch..]), 2. / std::f64::consts::PI, epsilon = 0.01);
			assert!(s.iter().all(|&v| (-1. ..=1.).contains(&v)));
		}

		let s = synthesize_second(Bit::Marker, CARRIER_HZ, 48000, Waveform::Quantized);
		assert!(s.iter().all(|&v| v == 0.));
	}

	#[test]
	fn phase_test() {
		let s = synthesize_second(Bit::Zero, CARRIER_HZ, 48000, Waveform::Clean);
		for i in [4800, 4801, 12345, 47999] {
			let expected = (TAU * CARRIER_HZ * i as f64 / 48000.).sin();
			assert_abs_diff_eq!(s[i] as f64, expected, epsilon = 1e-6);
		}

		// Quantized samples sit on the grid just below the clean sine
		let q = synthesize_second(Bit::Zero, CARRIER_HZ, 48000, Waveform::Quantized);
		for i in 4800..48000 {
			let diff = s[i] as f64 - q[i] as f64;
			assert!((-1e-6..3. / 48000. + 1e-6).contains(&diff), "sample {} off by {}", i, diff);
		}
	}

	#[test]
	fn minute_test() {
		let f = frame();
		for rate in [1, 7, 8000, 44100, 48000] {
			let m = synthesize_minute(&f, rate);
			assert_eq!(m.len(), rate as usize * 60);
			assert_eq!(m.start(), 0);
		}

		let synth = Synthesizer::new(8000, Waveform::Quantized);
		let m = synth.minute(&f, 1710506160);
		assert_eq!(m.start(), 1710506160);
		for (i, &bit) in f.bits().iter().enumerate() {
			assert_eq!(&m.samples()[i * 8000..(i + 1) * 8000], &synth.second(bit)[..]);
		}
		// The marker second is silent
		assert!(m.samples()[59 * 8000..].iter().all(|&v| v == 0.));
	}

	#[test]
	fn idempotent_test() {
		let f = frame();
		assert_eq!(synthesize_minute(&f, 8000), synthesize_minute(&f, 8000));
		let synth = Synthesizer::new(8000, Waveform::Clean);
		assert_eq!(synth.minute(&f, 60), synth.minute(&f, 0).with_start(60));
	}
}
