//! Double buffered playback of rendered minutes.
//!
//! A [`Scheduler`] holds at most two [`MinuteBuffer`]s: the one playing (`current`) and the one
//! that follows it (`next`). Playback position is tracked in wall clock terms, as the minute being
//! played plus a sample offset into it, so a missing buffer only ever costs silence and a late
//! buffer picks up exactly where the clock is.
//!
//! The scheduler does no I/O and never blocks. It is meant to be owned by an audio callback, with
//! buffers arriving from a render thread through [`Scheduler::offer`] whenever
//! [`Scheduler::wants`] asks for one.
//!
//! # Examples
//!
//! ```
//! # use dcf77::{MinuteBuffer, Scheduler};
//! # use time::TimeSpec;
//! let minute = |start| MinuteBuffer::new(start, vec![0.5; 60].into());
//! let mut scheduler = Scheduler::new(1);
//! scheduler.prime(minute(0), minute(60)).unwrap();
//!
//! // Start 45 seconds into the first minute
//! scheduler.start(TimeSpec::from_secs(45)).unwrap();
//! let mut out = [0.; 20];
//! let report = scheduler.write(&mut out);
//! assert_eq!((report.written, report.swaps), (20, 1));
//! assert_eq!(scheduler.wants(), Some(120));
//!
//! scheduler.offer(minute(120)).unwrap();
//! assert_eq!(scheduler.wants(), None);
//! ```

use thiserror::Error;
use time::{TimeSpec, NANOS_PER_SECOND, SECONDS_PER_MINUTE};
use crate::synth::MinuteBuffer;

/// Where playback is: the minute being played and the sample offset into it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlaybackPosition {
	/// Unix timestamp of the start of the minute.
	pub slot: i64,
	/// Samples already played in the minute.
	pub offset: usize
}

/// Scheduler life cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
	/// Accepting buffers, not yet playing. Writes silence.
	Idle,
	/// Playing at the given position.
	Playing(PlaybackPosition),
	/// Stopped for good. Writes silence and rejects buffers.
	Stopped
}

/// What happened during one [`Scheduler::write`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WriteReport {
	/// Samples copied from buffers.
	pub written: usize,
	/// Minute boundaries crossed.
	pub swaps: usize,
	/// Silent samples written while playing because no buffer covered them.
	pub underrun: usize
}

/// Error type for scheduling buffers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ScheduleError {
	#[error("Scheduler is not idle")]
	NotIdle,
	#[error("Scheduler is stopped")]
	Stopped,
	#[error("No minute has been primed")]
	NotPrimed,
	/// The clock is outside the primed minutes. The payload is the clock's minute.
	#[error("Time {0} is not covered by the primed minutes")]
	Misaligned(i64),
	/// Buffers must cover consecutive minutes.
	#[error("Minute {found} does not follow minute {after}")]
	NotConsecutive {
		after: i64,
		found: i64
	},
	/// A buffer for a minute that has already been played.
	#[error("Minute {slot} has already been played")]
	Stale {
		slot: i64
	},
	/// A buffer for a minute more than one minute ahead of playback.
	#[error("Minute {slot} is too far ahead of minute {playing}")]
	Early {
		slot: i64,
		playing: i64
	},
	/// The slot for this buffer is already filled.
	#[error("Already holding a buffer for minute {0}")]
	Full(i64),
	#[error("Buffer has {found} samples, expected {expected}")]
	Length {
		expected: usize,
		found: usize
	}
}

/// Plays consecutive minutes from two buffer slots.
#[derive(Debug)]
pub struct Scheduler {
	sample_rate: u32,
	state: State,
	current: Option<MinuteBuffer>,
	next: Option<MinuteBuffer>
}

impl Scheduler {
	/// # Panics
	///
	/// Panics if `sample_rate` is zero.
	pub fn new(sample_rate: u32) -> Scheduler {
		assert!(sample_rate > 0, "sample rate must be positive");
		Scheduler {
			sample_rate,
			state: State::Idle,
			current: None,
			next: None
		}
	}

	pub fn state(&self) -> State {
		self.state
	}

	/// Samples per minute.
	pub fn minute_len(&self) -> usize {
		self.sample_rate as usize * SECONDS_PER_MINUTE as usize
	}

	/// The current playback position, if playing.
	pub fn position(&self) -> Option<PlaybackPosition> {
		match self.state {
			State::Playing(p) => Some(p),
			_ => None
		}
	}

	/// Minute starts of the buffers held, `current` first.
	pub fn buffered(&self) -> (Option<i64>, Option<i64>) {
		(self.current.as_ref().map(MinuteBuffer::start), self.next.as_ref().map(MinuteBuffer::start))
	}

	fn check_len(&self, buffer: &MinuteBuffer) -> Result<(), ScheduleError> {
		if buffer.len() == self.minute_len() {
			Ok(())
		} else {
			Err(ScheduleError::Length { expected: self.minute_len(), found: buffer.len() })
		}
	}

	/// Load the first two minutes before playback starts.
	///
	/// # Errors
	///
	/// Returns [`ScheduleError::NotIdle`] unless idle, or an error describing why the buffers do not
	/// fit: wrong length or not consecutive minutes.
	pub fn prime(&mut self, current: MinuteBuffer, next: MinuteBuffer) -> Result<(), ScheduleError> {
		if self.state != State::Idle {
			return Err(ScheduleError::NotIdle)
		}
		self.check_len(&current)?;
		self.check_len(&next)?;
		if next.start() != current.start() + SECONDS_PER_MINUTE {
			return Err(ScheduleError::NotConsecutive { after: current.start(), found: next.start() })
		}
		self.current = Some(current);
		self.next = Some(next);
		Ok(())
	}

	/// Begin playback at wall clock time `now`.
	///
	/// Playback starts at the sample matching `now` within its minute. If `now` has already moved
	/// into the `next` minute, it is promoted and the `current` one is dropped.
	///
	/// # Errors
	///
	/// Returns [`ScheduleError::NotIdle`] unless idle, [`ScheduleError::NotPrimed`] without a
	/// current buffer, or [`ScheduleError::Misaligned`] if `now` is outside the buffered minutes.
	pub fn start(&mut self, now: TimeSpec) -> Result<PlaybackPosition, ScheduleError> {
		if self.state != State::Idle {
			return Err(ScheduleError::NotIdle)
		}
		let current = self.current.as_ref().ok_or(ScheduleError::NotPrimed)?.start();
		let slot = now.minute_start();
		if slot != current {
			if self.next.as_ref().map(MinuteBuffer::start) != Some(slot) {
				return Err(ScheduleError::Misaligned(slot))
			}
			self.current = self.next.take();
		}

		let nanos = now.nanos_into_minute() as i128;
		let offset = (nanos * self.sample_rate as i128 / NANOS_PER_SECOND as i128) as usize;
		let position = PlaybackPosition { slot, offset };
		self.state = State::Playing(position);
		Ok(position)
	}

	/// The minute that should be rendered next, if there is room for it.
	///
	/// While playing, this is the playing minute if its buffer is missing, otherwise the following
	/// minute if that buffer is missing. While idle, it is the minute after the current buffer.
	pub fn wants(&self) -> Option<i64> {
		match self.state {
			State::Playing(p) => match (&self.current, &self.next) {
				(None, _) => Some(p.slot),
				(Some(_), None) => Some(p.slot + SECONDS_PER_MINUTE),
				(Some(_), Some(_)) => None
			},
			State::Idle => match (&self.current, &self.next) {
				(Some(c), None) => Some(c.start() + SECONDS_PER_MINUTE),
				_ => None
			},
			State::Stopped => None
		}
	}

	/// Hand a rendered minute to the scheduler.
	///
	/// While playing, buffers are accepted for the playing minute (a late buffer, played from the
	/// current position) or the minute after it. While idle, buffers are accepted in order.
	///
	/// # Errors
	///
	/// Returns an error describing why the buffer was rejected. The buffer is dropped.
	pub fn offer(&mut self, buffer: MinuteBuffer) -> Result<(), ScheduleError> {
		self.check_len(&buffer)?;
		let slot = buffer.start();
		let into_next = match self.state {
			State::Stopped => return Err(ScheduleError::Stopped),
			State::Idle => match self.current.as_ref().map(MinuteBuffer::start) {
				None => false,
				Some(c) if c + SECONDS_PER_MINUTE == slot => true,
				Some(c) => return Err(ScheduleError::NotConsecutive { after: c, found: slot })
			},
			State::Playing(p) => {
				if slot < p.slot {
					return Err(ScheduleError::Stale { slot })
				} else if slot == p.slot {
					false
				} else if slot == p.slot + SECONDS_PER_MINUTE {
					true
				} else {
					return Err(ScheduleError::Early { slot, playing: p.slot })
				}
			}
		};

		let target = if into_next { &mut self.next } else { &mut self.current };
		if target.is_some() {
			return Err(ScheduleError::Full(slot))
		}
		*target = Some(buffer);
		Ok(())
	}

	/// Fill `out` with the next samples.
	///
	/// Writes silence unless playing. While playing, the position always advances by `out.len()`,
	/// with silence wherever a buffer is missing, so playback stays aligned to the wall clock.
	pub fn write(&mut self, out: &mut [f32]) -> WriteReport {
		let mut report = WriteReport::default();
		let State::Playing(mut pos) = self.state else {
			out.fill(0.);
			return report
		};

		let minute_len = self.minute_len();
		let mut out = out;
		while !out.is_empty() {
			let n = out.len().min(minute_len - pos.offset);
			let (head, tail) = std::mem::take(&mut out).split_at_mut(n);
			match &self.current {
				Some(buffer) => {
					head.copy_from_slice(&buffer.samples()[pos.offset..pos.offset + n]);
					report.written += n;
				},
				None => {
					head.fill(0.);
					report.underrun += n;
				}
			}
			out = tail;

			pos.offset += n;
			if pos.offset == minute_len {
				pos = PlaybackPosition { slot: pos.slot + SECONDS_PER_MINUTE, offset: 0 };
				self.current = self.next.take();
				report.swaps += 1;
			}
		}

		self.state = State::Playing(pos);
		report
	}

	/// Stop playback and release both buffers.
	pub fn stop(&mut self) {
		self.state = State::Stopped;
		self.current = None;
		self.next = None;
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const RATE: u32 = 2;
	const LEN: usize = RATE as usize * 60;

	/// A minute whose samples are `start + offset`, so output reveals its source.
	fn minute(start: i64) -> MinuteBuffer {
		MinuteBuffer::new(start, (0..LEN).map(|i| (start + i as i64) as f32).collect::<Vec<_>>().into())
	}

	fn expected(slot: i64, offset: usize) -> f32 {
		(slot + offset as i64) as f32
	}

	fn primed(start: i64) -> Scheduler {
		let mut s = Scheduler::new(RATE);
		s.prime(minute(start), minute(start + 60)).unwrap();
		s
	}

	#[test]
	#[should_panic(expected = "sample rate must be positive")]
	fn zero_rate_test() {
		Scheduler::new(0);
	}

	#[test]
	fn prime_test() {
		let mut s = Scheduler::new(RATE);
		assert_eq!(s.prime(minute(0), minute(120)), Err(ScheduleError::NotConsecutive { after: 0, found: 120 }));
		let short = MinuteBuffer::new(60, vec![0.; 3].into());
		assert_eq!(s.prime(minute(0), short), Err(ScheduleError::Length { expected: LEN, found: 3 }));
		assert_eq!(s.buffered(), (None, None));
		assert_eq!(s.start(TimeSpec::from_secs(0)), Err(ScheduleError::NotPrimed));

		s.prime(minute(0), minute(60)).unwrap();
		assert_eq!(s.buffered(), (Some(0), Some(60)));
		assert_eq!(s.wants(), None);
		s.start(TimeSpec::from_secs(0)).unwrap();
		assert_eq!(s.prime(minute(60), minute(120)), Err(ScheduleError::NotIdle));
	}

	#[test]
	fn start_test() {
		let mut s = primed(600);
		let p = s.start(TimeSpec { sec: 612, nsec: 750_000_000 }).unwrap();
		assert_eq!(p, PlaybackPosition { slot: 600, offset: 25 });
		assert_eq!(s.state(), State::Playing(p));
		assert_eq!(s.start(TimeSpec::from_secs(612)), Err(ScheduleError::NotIdle));

		// The clock already moved on to the next minute
		let mut s = primed(600);
		let p = s.start(TimeSpec::from_secs(661)).unwrap();
		assert_eq!(p, PlaybackPosition { slot: 660, offset: 2 });
		assert_eq!(s.buffered(), (Some(660), None));
		assert_eq!(s.wants(), Some(720));

		let mut s = primed(600);
		assert_eq!(s.start(TimeSpec::from_secs(720)), Err(ScheduleError::Misaligned(720)));
		assert_eq!(s.start(TimeSpec::from_secs(599)), Err(ScheduleError::Misaligned(540)));
	}

	#[test]
	fn playback_test() {
		let mut s = primed(0);
		s.start(TimeSpec::from_secs(50)).unwrap();

		// Writes span the minute boundary
		let mut out = [0.; 30];
		let r = s.write(&mut out);
		assert_eq!(r, WriteReport { written: 30, swaps: 1, underrun: 0 });
		assert_eq!(out[0], expected(0, 100));
		assert_eq!(out[19], expected(0, 119));
		assert_eq!(out[20], expected(60, 0));
		assert_eq!(out[29], expected(60, 9));
		assert_eq!(s.position(), Some(PlaybackPosition { slot: 60, offset: 10 }));

		// Render thread keeps up, one minute ahead
		for slot in [120, 180, 240] {
			assert_eq!(s.wants(), Some(slot));
			s.offer(minute(slot)).unwrap();
			assert_eq!(s.wants(), None);
			assert_eq!(s.offer(minute(slot)), Err(ScheduleError::Full(slot)));

			let mut out = [0.; LEN];
			let r = s.write(&mut out);
			assert_eq!(r, WriteReport { written: LEN, swaps: 1, underrun: 0 });
			assert_eq!(out[LEN - 11], expected(slot - 60, LEN - 1));
			assert_eq!(out[LEN - 10], expected(slot, 0));
			assert_eq!(out[LEN - 1], expected(slot, 9));
		}
	}

	#[test]
	fn underrun_test() {
		let mut s = primed(0);
		s.start(TimeSpec::from_secs(0)).unwrap();

		let mut out = [1.; LEN + LEN / 2];
		let r = s.write(&mut out);
		assert_eq!(r, WriteReport { written: LEN * 3 / 2, swaps: 1, underrun: 0 });
		let mut out = [1.; LEN];
		let r = s.write(&mut out);
		assert_eq!(r, WriteReport { written: LEN / 2, swaps: 1, underrun: LEN / 2 });
		assert!(out[LEN / 2..].iter().all(|&v| v == 0.));
		assert_eq!(s.position(), Some(PlaybackPosition { slot: 120, offset: LEN / 2 }));

		// Late minutes are rejected, the playing one resumes where the clock is
		assert_eq!(s.wants(), Some(120));
		assert_eq!(s.offer(minute(60)), Err(ScheduleError::Stale { slot: 60 }));
		assert_eq!(s.offer(minute(240)), Err(ScheduleError::Early { slot: 240, playing: 120 }));
		s.offer(minute(120)).unwrap();
		assert_eq!(s.wants(), Some(180));

		let mut out = [0.; 4];
		let r = s.write(&mut out);
		assert_eq!(r, WriteReport { written: 4, swaps: 0, underrun: 0 });
		assert_eq!(out[0], expected(120, LEN / 2));
	}

	#[test]
	fn never_more_than_two_test() {
		let mut s = Scheduler::new(RATE);
		assert_eq!(s.wants(), None);
		s.offer(minute(0)).unwrap();
		assert_eq!(s.wants(), Some(60));
		assert_eq!(s.offer(minute(120)), Err(ScheduleError::NotConsecutive { after: 0, found: 120 }));
		s.offer(minute(60)).unwrap();
		assert_eq!(s.offer(minute(60)), Err(ScheduleError::Full(60)));
		assert_eq!(s.buffered(), (Some(0), Some(60)));

		s.start(TimeSpec::from_secs(30)).unwrap();
		let mut out = [0.; 7];
		for _ in 0..100 {
			s.write(&mut out);
			let (current, next) = s.buffered();
			let playing = s.position().unwrap().slot;
			assert_eq!(current, Some(playing));
			assert!(next.is_none() || next == Some(playing + 60));
			if let Some(slot) = s.wants() {
				s.offer(minute(slot)).unwrap();
			}
		}
	}

	#[test]
	fn stop_test() {
		let mut s = primed(0);
		s.start(TimeSpec::from_secs(0)).unwrap();
		s.stop();
		assert_eq!(s.state(), State::Stopped);
		assert_eq!(s.buffered(), (None, None));
		assert_eq!(s.wants(), None);
		assert_eq!(s.offer(minute(0)), Err(ScheduleError::Stopped));

		let mut out = [1.; 8];
		assert_eq!(s.write(&mut out), WriteReport::default());
		assert!(out.iter().all(|&v| v == 0.));
	}
}
