//! Civil time as announced by a DCF77 minute.
//!
//! A [`CivilTime`] holds exactly the fields that are encoded in a frame: the local wall clock time
//! to the minute, the date with a two digit year, and whether daylight saving time is in effect.

use std::fmt;
use thiserror::Error;
use time::{tz::{Timezone, TzInfo}, y_from_timestamp};

/// How to decide whether daylight saving time is in effect.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DstMethod {
	/// Compare the UTC offset at the instant with the zone's offsets on January 1 and July 1 of the
	/// same year. The smaller of the two is standard time; any larger offset is daylight saving time.
	#[default]
	Differential,
	/// Use the daylight saving flag of the zone's rule directly.
	Rule
}

/// Error type for building a [`CivilTime`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum CivilTimeError {
	/// A field was outside its allowed range.
	#[error("{field} out of range: {value}")]
	OutOfRange {
		field: &'static str,
		value: u8
	},
	/// The local time is before the Unix epoch (Jan 1, 1970) and not supported. The payload is the
	/// rejected Unix timestamp.
	#[error("Unsupported time {0}, must be after Jan 1, 1970")]
	UnsupportedTime(i64)
}

/// Local civil time to the minute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CivilTime {
	/// Year within the century, ranged [0, 99].
	pub year: u8,
	/// Month, ranged [1, 12].
	pub month: u8,
	/// Day of month, ranged [1, 31].
	pub day: u8,
	/// Day of week, ranged [0, 6] => Sunday-Saturday.
	pub weekday: u8,
	/// Hour, ranged [0, 23].
	pub hour: u8,
	/// Minute, ranged [0, 59].
	pub minute: u8,
	/// Whether daylight saving time is in effect.
	pub dst: bool
}

impl CivilTime {
	/// Construct a civil time from its fields.
	///
	/// # Errors
	///
	/// Returns [`CivilTimeError::OutOfRange`] naming the first field outside its range.
	///
	/// # Examples
	///
	/// ```
	/// # use dcf77::{CivilTime, CivilTimeError};
	/// let t = CivilTime::new(24, 3, 15, 5, 13, 37, false).unwrap();
	/// assert_eq!(t.to_string(), "15.03.24 13:37 (standard time)");
	/// assert_eq!(
	/// 	CivilTime::new(24, 3, 15, 5, 24, 0, false),
	/// 	Err(CivilTimeError::OutOfRange { field: "hour", value: 24 })
	/// );
	/// ```
	pub fn new(year: u8, month: u8, day: u8, weekday: u8, hour: u8, minute: u8, dst: bool)
		-> Result<CivilTime, CivilTimeError>
	{
		let t = CivilTime { year, month, day, weekday, hour, minute, dst };
		t.validate()?;
		Ok(t)
	}

	/// The civil time at the Unix timestamp `time` in `timezone`.
	///
	/// Seconds are truncated. The local date is derived from the same offset that decides the
	/// daylight saving flag, so the two always agree.
	///
	/// # Errors
	///
	/// Returns [`CivilTimeError::UnsupportedTime`] if the local time is before the Unix epoch.
	///
	/// # Examples
	///
	/// ```
	/// # use dcf77::{CivilTime, DstMethod};
	/// # use time::tz::CENTRAL_EUROPE;
	/// // Fri, Mar 15, 2024. 12:37 UTC.
	/// let t = CivilTime::at(1710506220, &CENTRAL_EUROPE, DstMethod::Differential).unwrap();
	/// assert_eq!((t.hour, t.minute, t.weekday, t.dst), (13, 37, 5, false));
	/// ```
	pub fn at(time: i64, timezone: &Timezone, method: DstMethod) -> Result<CivilTime, CivilTimeError> {
		let info = match method {
			DstMethod::Rule => timezone.info(time),
			DstMethod::Differential => differential_info(time, timezone)
		};
		let date = timezone.date_with(time, info).ok_or(CivilTimeError::UnsupportedTime(time))?;

		Ok(CivilTime {
			year: (date.tm.year % 100) as u8,
			month: date.tm.mon,
			day: date.tm.day,
			weekday: date.tm.wday,
			hour: date.tm.hour,
			minute: date.tm.min,
			dst: info.isdst
		})
	}

	/// Check every field against its range.
	///
	/// # Errors
	///
	/// Returns [`CivilTimeError::OutOfRange`] naming the first field outside its range.
	pub fn validate(&self) -> Result<(), CivilTimeError> {
		let check = |field, value, range: std::ops::RangeInclusive<u8>| {
			if range.contains(&value) {
				Ok(())
			} else {
				Err(CivilTimeError::OutOfRange { field, value })
			}
		};
		check("year", self.year, 0..=99)?;
		check("month", self.month, 1..=12)?;
		check("day", self.day, 1..=31)?;
		check("weekday", self.weekday, 0..=6)?;
		check("hour", self.hour, 0..=23)?;
		check("minute", self.minute, 0..=59)
	}
}

impl fmt::Display for CivilTime {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:02}.{:02}.{:02} {:02}:{:02} ({})",
			self.day, self.month, self.year, self.hour, self.minute,
			if self.dst { "daylight saving time" } else { "standard time" })
	}
}

/// Offset information where daylight saving time means "ahead of the year's smallest offset".
fn differential_info(time: i64, timezone: &Timezone) -> TzInfo {
	let utoff = timezone.info(time).utoff;
	let year = y_from_timestamp(time.saturating_add(utoff as i64));
	let standard = timezone.offset_on(year, 1, 1).min(timezone.offset_on(year, 7, 1));
	TzInfo { utoff, isdst: utoff > standard }
}
