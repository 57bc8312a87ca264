//! Error types used across modules.

use dcf77::{CivilTimeError, ScheduleError};
use thiserror::Error;

/// The error type for transmitting the signal, live or to a file.
#[derive(Debug, Error)]
pub enum TransmitError {
	#[error("Failed to get default audio output device")]
	NoOutputDevice,
	#[error("Failed to build output stream: {0}")]
	BuildStream(#[from] cpal::BuildStreamError),
	#[error("Failed to play output stream: {0}")]
	PlayStream(#[from] cpal::PlayStreamError),
	/// The stream failed after playback started. The payload is the stream's error message.
	#[error("Error occurred on the stream: {0}")]
	Stream(String),
	#[error("Failed to get current system time")]
	Clock,
	#[error("Failed to render minute: {0}")]
	Render(#[from] CivilTimeError),
	#[error("Failed to schedule minute: {0}")]
	Schedule(#[from] ScheduleError),
	#[error("Failed to start render thread: {0}")]
	Spawn(#[from] std::io::Error),
	#[error("Render thread panicked")]
	RenderPanicked,
	#[error("Failed to write WAV file: {0}")]
	Wav(#[from] hound::Error)
}

impl TransmitError {
	/// Whether the error came from acquiring the audio device, which may succeed on a retry.
	pub fn is_resource(&self) -> bool {
		matches!(self,
			TransmitError::NoOutputDevice | TransmitError::BuildStream(_) | TransmitError::PlayStream(_))
	}
}
