//! Live transmission over the default audio output device.
//!
//! Two threads cooperate. The audio callback owns a [`Scheduler`] and copies samples out of it;
//! a render thread renders upcoming minutes and hands them over a rendezvous channel. The render
//! thread blocks in `send` holding one finished minute until the scheduler has room for it, so it
//! always works one minute ahead of playback without ever buffering more.

use std::num::NonZero;
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Instant;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use dcf77::{DstMethod, MinuteBuffer, MinuteRenderer, PlaybackPosition, Scheduler, State, Synthesizer, Waveform};
use time::{tz::Timezone, Nanoseconds, Seconds, TimeSpec, SECONDS_PER_MINUTE};
use tracing::{debug, error, info, warn};
use crate::error::TransmitError;

/// Samples per audio callback.
const BUFFER_SIZE: u32 = 1024;

/// Configuration for [`start_transmission`].
#[derive(Clone, Debug)]
pub struct TransmitConfig {
	pub timezone: Timezone,
	pub dst_method: DstMethod,
	pub waveform: Waveform,
	pub sample_rate: u32,
	/// Minutes to transmit, the first one being the remainder of the current minute. `None`
	/// transmits until stopped.
	pub count: Option<NonZero<u32>>,
	/// Simulated starting time, or `None` for the system clock.
	pub start: Option<TimeSpec>
}

/// Wall clock time, either the system's or a simulated clock running from a fixed start.
#[derive(Clone, Copy, Debug)]
pub struct Clock {
	origin: Option<(TimeSpec, Instant)>
}

impl Clock {
	pub fn system() -> Clock {
		Clock { origin: None }
	}

	/// A clock that reads `start` now and advances in real time.
	pub fn starting_at(start: TimeSpec) -> Clock {
		Clock { origin: Some((start, Instant::now())) }
	}

	/// # Errors
	///
	/// Returns [`TransmitError::Clock`] if the system time is unavailable.
	pub fn now(&self) -> Result<TimeSpec, TransmitError> {
		match self.origin {
			None => time::now().ok_or(TransmitError::Clock),
			Some((start, started)) => {
				let elapsed = started.elapsed();
				Ok(start + Seconds(elapsed.as_secs() as i64) + Nanoseconds(elapsed.subsec_nanos() as i64))
			}
		}
	}
}

/// Simple multi-threaded flag using a condition variable, carrying how the transmission ended.
///
/// The first outcome wins; later calls to [`Flagger::notify`] are ignored.
struct Flagger {
	/// `None` while the transmission is running.
	mutex: Mutex<Option<Result<(), String>>>,
	cond: Condvar
}

impl Flagger {
	fn new() -> Arc<Flagger> {
		Arc::new(Flagger {
			mutex: Mutex::new(None),
			cond: Condvar::new()
		})
	}

	/// Block until another thread calls [`Flagger::notify`] and return its outcome.
	fn wait(&self) -> Result<(), TransmitError> {
		let guard = self.mutex.lock().unwrap_or_else(PoisonError::into_inner);
		let outcome = self.cond.wait_while(guard, |outcome| outcome.is_none())
			.unwrap_or_else(PoisonError::into_inner);
		match outcome.as_ref() {
			Some(Err(e)) => Err(TransmitError::Stream(e.clone())),
			_ => Ok(())
		}
	}

	fn notify(&self, outcome: Result<(), String>) {
		let mut guard = self.mutex.lock().unwrap_or_else(PoisonError::into_inner);
		if guard.is_none() {
			*guard = Some(outcome);
		}
		self.cond.notify_all();
	}
}

/// State owned by the audio callback.
///
/// The scheduler is started on the first fill, so playback is aligned to the clock at the moment
/// audio actually starts flowing. After `count` minute boundaries the scheduler is stopped and
/// `flagger` notified.
struct Feeder {
	scheduler: Scheduler,
	rx: Receiver<MinuteBuffer>,
	clock: Clock,
	flagger: Arc<Flagger>,
	count: Option<NonZero<u32>>,
	played: u32,
	underrun: bool
}

impl Feeder {
	fn new(
		scheduler: Scheduler,
		rx: Receiver<MinuteBuffer>,
		clock: Clock,
		flagger: Arc<Flagger>,
		count: Option<NonZero<u32>>
	) -> Feeder {
		Feeder { scheduler, rx, clock, flagger, count, played: 0, underrun: false }
	}

	fn start(&mut self) -> Result<PlaybackPosition, TransmitError> {
		let now = self.clock.now()?;
		Ok(self.scheduler.start(now)?)
	}

	fn fill(&mut self, data: &mut [f32]) {
		if self.scheduler.state() == State::Idle {
			match self.start() {
				Ok(p) => info!(slot = p.slot, offset = p.offset, "Transmission started"),
				Err(e) => {
					error!("Failed to start playback: {}", e);
					self.scheduler.stop();
					self.flagger.notify(Err(e.to_string()));
				}
			}
		}

		// Take a rendered minute only when there is room, leaving the render thread blocked otherwise
		if self.scheduler.wants().is_some() {
			if let Ok(buffer) = self.rx.try_recv() {
				let slot = buffer.start();
				match self.scheduler.offer(buffer) {
					Ok(()) => debug!(slot, "Queued minute"),
					Err(e) => warn!("Dropped minute {}: {}", slot, e)
				}
			}
		}

		let report = self.scheduler.write(data);
		if report.underrun > 0 && !self.underrun {
			warn!("No minute ready, transmitting silence");
		} else if report.underrun == 0 && self.underrun {
			info!("Transmission resumed");
		}
		self.underrun = report.underrun > 0;

		if report.swaps > 0 {
			self.played += report.swaps as u32;
			debug!(played = self.played, "Finished minute");
			if self.count.is_some_and(|c| self.played >= c.get()) {
				self.scheduler.stop();
				self.flagger.notify(Ok(()));
			}
		}
	}
}

/// Make the audio callback.
fn make_writer(mut feeder: Feeder) -> impl FnMut(&mut [f32], &cpal::OutputCallbackInfo) + Send + 'static {
	move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| feeder.fill(data)
}

/// Render consecutive minutes starting at `slot` and send them until the receiver hangs up.
///
/// Minutes the clock has already passed are skipped.
fn spawn_renderer(
	renderer: MinuteRenderer,
	tx: SyncSender<MinuteBuffer>,
	clock: Clock,
	mut slot: i64,
	flagger: Arc<Flagger>
) -> Result<JoinHandle<()>, TransmitError> {
	let handle = thread::Builder::new()
		.name("render".into())
		.spawn(move || {
			loop {
				if let Ok(now) = clock.now() {
					slot = slot.max(now.minute_start());
				}
				match renderer.render(slot) {
					Ok(buffer) => {
						if tx.send(buffer).is_err() {
							break
						}
					},
					Err(e) => {
						error!("Failed to render minute {}: {}", slot, e);
						flagger.notify(Err(e.to_string()));
						break
					}
				}
				slot += SECONDS_PER_MINUTE;
			}
			debug!("Render thread exiting");
		})?;
	Ok(handle)
}

/// A running transmission.
///
/// Dropping this value without calling [`Transmission::stop`] stops audio but leaves the render
/// thread to exit on its own.
pub struct Transmission {
	stream: cpal::Stream,
	renderer: JoinHandle<()>,
	flagger: Arc<Flagger>
}

impl Transmission {
	/// Block until the configured number of minutes has played or the stream failed.
	///
	/// # Errors
	///
	/// Returns [`TransmitError::Stream`] if playback failed.
	pub fn wait(&self) -> Result<(), TransmitError> {
		self.flagger.wait()
	}

	/// Halt playback, release the audio device, and join the render thread.
	///
	/// # Errors
	///
	/// Returns [`TransmitError::RenderPanicked`] if the render thread panicked.
	pub fn stop(self) -> Result<(), TransmitError> {
		let Transmission { stream, renderer, flagger } = self;
		if let Err(e) = stream.pause() {
			warn!("Failed to pause output stream: {}", e);
		}
		// Dropping the stream drops the receiver, which unblocks the render thread
		drop(stream);
		flagger.notify(Ok(()));
		renderer.join().map_err(|_| TransmitError::RenderPanicked)?;
		info!("Transmission stopped");
		Ok(())
	}
}

/// Start transmitting over the default audio output device.
///
/// Creates and configures mono `f32` output at `config.sample_rate` with 1024 sample buffers,
/// renders the current and next minute, and starts playback aligned to the clock. Returns once
/// audio is playing; use [`Transmission::wait`] to block until done.
///
/// # Errors
///
/// Returns [`TransmitError`] if no output device is available, the stream cannot be built or
/// played, the clock is unavailable, or the first minutes cannot be rendered.
pub fn start_transmission(config: &TransmitConfig) -> Result<Transmission, TransmitError> {
	let clock = config.start.map_or_else(Clock::system, Clock::starting_at);
	let renderer = MinuteRenderer::new(
		config.timezone,
		config.dst_method,
		Synthesizer::new(config.sample_rate, config.waveform)
	);

	// Set up output device
	let host = cpal::default_host();
	let device = host.default_output_device().ok_or(TransmitError::NoOutputDevice)?;
	info!("Audio output device: {}", device.name().unwrap_or_default());
	let stream_config = cpal::StreamConfig {
		channels: 1,
		sample_rate: cpal::SampleRate(config.sample_rate),
		buffer_size: cpal::BufferSize::Fixed(BUFFER_SIZE)
	};

	// Render the first two minutes up front
	let slot = clock.now()?.minute_start();
	let mut scheduler = Scheduler::new(config.sample_rate);
	scheduler.prime(renderer.render(slot)?, renderer.render(slot + SECONDS_PER_MINUTE)?)?;

	// Set up thread synchronization
	let (tx, rx) = sync_channel::<MinuteBuffer>(0);
	let flagger = Flagger::new();

	let stream_flagger = flagger.clone();
	let stream = device.build_output_stream(
		&stream_config,
		make_writer(Feeder::new(scheduler, rx, clock, flagger.clone(), config.count)),
		move |e| {
			error!("Error occurred on the stream: {}", e);
			stream_flagger.notify(Err(e.to_string()));
		},
		None
	)?;
	stream.play()?;

	let renderer = spawn_renderer(renderer, tx, clock, slot + 2 * SECONDS_PER_MINUTE, flagger.clone())?;
	Ok(Transmission { stream, renderer, flagger })
}

#[cfg(test)]
mod tests {
	use super::*;
	use time::tz::CENTRAL_EUROPE;

	const RATE: u32 = 100;

	fn renderer() -> MinuteRenderer {
		MinuteRenderer::new(CENTRAL_EUROPE, DstMethod::Differential, Synthesizer::new(RATE, Waveform::Quantized))
	}

	#[test]
	fn clock_test() {
		let start = TimeSpec { sec: 1710506185, nsec: 900_000_000 };
		let clock = Clock::starting_at(start);
		let now = clock.now().unwrap();
		assert!(now >= start);
		assert!(now.sec - start.sec < 5);
		assert!(Clock::system().now().unwrap().sec > 1710506185);
	}

	#[test]
	fn flagger_test() {
		let flagger = Flagger::new();
		let other = flagger.clone();
		let handle = thread::spawn(move || other.notify(Err(String::from("device unplugged"))));
		assert!(matches!(flagger.wait(), Err(TransmitError::Stream(e)) if e == "device unplugged"));
		handle.join().unwrap();

		// First outcome wins
		flagger.notify(Ok(()));
		assert!(flagger.wait().is_err());
	}

	#[test]
	fn feeder_test() {
		// Two seconds into the minute
		let start = TimeSpec { sec: 1710506162, nsec: 0 };
		let slot = start.minute_start();
		let r = renderer();
		let mut scheduler = Scheduler::new(RATE);
		scheduler.prime(r.render(slot).unwrap(), r.render(slot + 60).unwrap()).unwrap();
		scheduler.start(start).unwrap();

		let clock = Clock::starting_at(start);
		let (tx, rx) = sync_channel(0);
		let flagger = Flagger::new();
		let producer = spawn_renderer(renderer(), tx, clock, slot + 120, flagger.clone()).unwrap();
		let mut feeder = Feeder::new(scheduler, rx, clock, flagger.clone(), NonZero::new(2));

		// One second per fill, until two minute boundaries have passed
		let mut expected = r.render(slot).unwrap().samples()[RATE as usize * 2..].to_vec();
		expected.extend_from_slice(r.render(slot + 60).unwrap().samples());
		let mut played = Vec::new();
		let mut data = [0.; RATE as usize];
		while feeder.scheduler.state() != State::Stopped {
			feeder.fill(&mut data);
			played.extend_from_slice(&data);
			assert!(played.len() <= expected.len());
		}
		assert_eq!(played, expected);
		assert_eq!(feeder.played, 2);
		flagger.wait().unwrap();

		// Stopped, writes silence and the render thread exits once the receiver is gone
		data.fill(1.);
		feeder.fill(&mut data);
		assert!(data.iter().all(|&s| s == 0.));
		drop(feeder);
		producer.join().unwrap();
	}

	#[test]
	fn feeder_start_error_test() {
		let (_tx, rx) = sync_channel(0);
		let flagger = Flagger::new();
		let clock = Clock::starting_at(TimeSpec::from_secs(1710506162));
		let mut feeder = Feeder::new(Scheduler::new(RATE), rx, clock, flagger.clone(), None);

		let mut data = [1.; RATE as usize];
		feeder.fill(&mut data);
		assert_eq!(feeder.scheduler.state(), State::Stopped);
		assert!(data.iter().all(|&s| s == 0.));
		assert!(matches!(flagger.wait(), Err(TransmitError::Stream(_))));
	}

	#[test]
	fn renderer_skips_past_minutes_test() {
		let start = TimeSpec::from_secs(1710506162);
		let (tx, rx) = sync_channel(0);
		let producer = spawn_renderer(renderer(), tx, Clock::starting_at(start), 0, Flagger::new()).unwrap();
		assert_eq!(rx.recv().unwrap().start(), 1710506160);
		assert_eq!(rx.recv().unwrap().start(), 1710506220);
		drop(rx);
		producer.join().unwrap();
	}
}
