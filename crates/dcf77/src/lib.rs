//! Simulate the DCF77 time signal as audio.
//!
//! [DCF77] is a longwave time signal broadcast from Mainflingen, Germany. Once per second the
//! carrier drops for 100ms (a zero bit) or 200ms (a one bit); the 59 bits of each minute encode the
//! civil time in Germany at the start of the following minute.
//!
//! This crate produces that signal as audio samples, in four steps:
//! 1. [`civil`]: a Unix timestamp and [`time::tz::Timezone`] become a [`CivilTime`].
//! 2. [`frame`]: a [`CivilTime`] is encoded into a 60 position [`MinuteFrame`].
//! 3. [`synth`]: a [`MinuteFrame`] is synthesized into a [`MinuteBuffer`] of one minute of audio.
//! 4. [`schedule`]: a [`Scheduler`] plays consecutive [`MinuteBuffer`]s aligned to the wall clock.
//!
//! [`MinuteRenderer`] combines the first three steps for a given minute slot.
//!
//! [DCF77]: https://en.wikipedia.org/wiki/DCF77
//!
//! # Examples
//!
//! ```
//! # use dcf77::{DstMethod, MinuteRenderer, Scheduler, Synthesizer, Waveform};
//! # use time::{tz::CENTRAL_EUROPE, TimeSpec};
//! let renderer = MinuteRenderer::new(CENTRAL_EUROPE, DstMethod::Differential, Synthesizer::new(8000, Waveform::Quantized));
//! let now = TimeSpec { sec: 1710506185, nsec: 500_000_000 };
//! let slot = now.minute_start();
//!
//! let mut scheduler = Scheduler::new(renderer.sample_rate());
//! scheduler.prime(renderer.render(slot).unwrap(), renderer.render(slot + 60).unwrap()).unwrap();
//! scheduler.start(now).unwrap();
//!
//! // Fill an audio buffer
//! let mut buf = [0.; 1024];
//! scheduler.write(&mut buf);
//! ```

pub mod civil;
pub mod frame;
pub mod synth;
pub mod schedule;
pub mod render;

pub use civil::{CivilTime, CivilTimeError, DstMethod};
pub use frame::{encode, Bit, MinuteFrame};
pub use synth::{synthesize_minute, synthesize_second, MinuteBuffer, SecondWaveform, Synthesizer, Waveform};
pub use schedule::{PlaybackPosition, ScheduleError, Scheduler, State, WriteReport};
pub use render::MinuteRenderer;

/// Frequency of the synthesized tone: the fifth subharmonic of the 77.5 kHz DCF77 carrier.
pub const CARRIER_HZ: f64 = 77500. / 5.;
