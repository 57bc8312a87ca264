//! Regional UTC offsets and daylight saving rules.
//!
//! A [`Timezone`] is a standard UTC offset plus an optional daylight saving rule, the same model as
//! a POSIX TZ string such as `CET-1CEST,M3.5.0,M10.5.0/3`. Only the month/week/day form of the
//! transition dates (`Mm.w.d`) is supported, which covers every rule currently in use in Europe and
//! North America. Julian day forms (`Jn` and `n`) are rejected with
//! [`TzStringError::UnsupportedDateRule`].
//!
//! # Examples
//!
//! ```
//! # use time::tz::{parse_tzstring, TzInfo, CENTRAL_EUROPE};
//! let timezone = parse_tzstring(b"CET-1CEST,M3.5.0,M10.5.0/3").unwrap();
//! assert_eq!(timezone, CENTRAL_EUROPE);
//!
//! // March 31, 2024 00:59:59 UTC, one second before the switch to summer time
//! assert_eq!(timezone.info(1711846799), TzInfo { utoff: 3600, isdst: false });
//! assert_eq!(timezone.info(1711846800), TzInfo { utoff: 7200, isdst: true });
//! ```

use core::{error, fmt, str::FromStr};
use crate::time::{days_from_civil, wday_from_days, y_from_timestamp, Tm, SECONDS_PER_DAY, SECONDS_PER_HOUR};

/// UTC offset information for an instant.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct TzInfo {
	/// Offset from UTC in seconds, positive east of Greenwich
	pub utoff: i32,
	/// Whether daylight saving time is in effect
	pub isdst: bool
}

/// A calendar date together with the offset that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TmWithTzInfo {
	pub tm: Tm,
	pub info: TzInfo
}

/// A transition date rule of the form `Mm.w.d/time`.
///
/// Selects the `week`th `wday` (0-6 => Sunday-Saturday) of `month`; week 5 means the last such
/// weekday of the month. `time` is seconds after local midnight and may be negative or exceed a
/// day.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TzTransition {
	pub month: u8,
	pub week: u8,
	pub wday: u8,
	pub time: i32
}

impl TzTransition {
	pub const fn new(month: u8, week: u8, wday: u8, time: i32) -> TzTransition {
		TzTransition { month, week, wday, time }
	}

	/// The local wall clock time of this transition in `year`, expressed as seconds since the epoch
	/// as though local time were UTC. Subtract the offset in effect before the transition to get
	/// the real Unix timestamp.
	///
	/// ```
	/// # use time::tz::TzTransition;
	/// // Last Sunday of March 2024 is the 31st, transition at 02:00 local
	/// assert_eq!(TzTransition::new(3, 5, 0, 7200).local_timestamp(2024), 1711850400);
	/// ```
	pub const fn local_timestamp(&self, year: i64) -> i64 {
		let first = days_from_civil(year, self.month, 1);
		let month_len = if self.month == 12 {
			31
		} else {
			days_from_civil(year, self.month + 1, 1) - first
		};
		let first_match = (self.wday as i64 - wday_from_days(first) as i64).rem_euclid(7);
		let mut day = first_match + 7 * (self.week as i64 - 1);
		while day >= month_len {
			day -= 7;
		}
		(first + day) * SECONDS_PER_DAY + self.time as i64
	}
}

/// Daylight saving configuration: the summer offset and the two transition rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TzRule {
	/// UTC offset during daylight saving time, in seconds
	pub utoff: i32,
	/// Transition from standard time to daylight saving time
	pub todst: TzTransition,
	/// Transition from daylight saving time to standard time
	pub fromdst: TzTransition
}

/// A region's civil time rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timezone {
	/// UTC offset for standard time, in seconds
	pub utoff: i32,
	/// Optional daylight saving configuration
	pub dst: Option<TzRule>
}

/// Central European Time, `CET-1CEST,M3.5.0,M10.5.0/3`: UTC+1, or UTC+2 from the last Sunday in
/// March to the last Sunday in October.
pub const CENTRAL_EUROPE: Timezone = Timezone {
	utoff: 3600,
	dst: Some(TzRule {
		utoff: 7200,
		todst: TzTransition::new(3, 5, 0, 7200),
		fromdst: TzTransition::new(10, 5, 0, 10800)
	})
};

impl Timezone {
	/// A timezone with a fixed offset and no daylight saving time.
	pub const fn fixed(utoff: i32) -> Timezone {
		Timezone { utoff, dst: None }
	}

	/// Offset information for the Unix timestamp `time`.
	pub fn info(&self, time: i64) -> TzInfo {
		let Some(rule) = self.dst else {
			return TzInfo { utoff: self.utoff, isdst: false };
		};

		// Transition dates are given in local time, so convert each using the offset in effect just
		// before it happens.
		let y = y_from_timestamp(time + self.utoff as i64);
		let todst = rule.todst.local_timestamp(y) - self.utoff as i64;
		let fromdst = rule.fromdst.local_timestamp(y) - rule.utoff as i64;
		// Northern hemisphere rules start and end DST in the same year; southern hemisphere rules
		// wrap around the new year.
		let isdst = if todst < fromdst {
			todst <= time && time < fromdst
		} else {
			time < fromdst || todst <= time
		};

		TzInfo {
			utoff: if isdst { rule.utoff } else { self.utoff },
			isdst
		}
	}

	/// The local calendar date for `time`, or `None` if the local time is before the Unix epoch.
	pub fn date(&self, time: i64) -> Option<TmWithTzInfo> {
		self.date_with(time, self.info(time))
	}

	/// The local calendar date for `time` using an already determined offset.
	pub fn date_with(&self, time: i64, info: TzInfo) -> Option<TmWithTzInfo> {
		let local = time.checked_add(info.utoff as i64)?;
		Tm::new(local).map(|tm| TmWithTzInfo { tm, info })
	}

	/// The UTC offset in effect at local midnight of the given date.
	///
	/// ```
	/// # use time::tz::CENTRAL_EUROPE;
	/// assert_eq!(CENTRAL_EUROPE.offset_on(2024, 1, 1), 3600);
	/// assert_eq!(CENTRAL_EUROPE.offset_on(2024, 7, 1), 7200);
	/// ```
	pub fn offset_on(&self, year: i64, month: u8, day: u8) -> i32 {
		let midnight = days_from_civil(year, month, day) * SECONDS_PER_DAY;
		self.info(midnight - self.utoff as i64).utoff
	}
}

impl FromStr for Timezone {
	type Err = TzStringError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		parse_tzstring(s.as_bytes())
	}
}

/// The error type for parsing TZ strings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TzStringError {
	/// The TZ string was empty.
	MissingTzString,
	/// A zone name was missing, too short, or unterminated.
	InvalidName,
	/// A UTC offset was missing or malformed.
	InvalidOffset,
	/// A time component was outside its allowed range.
	TimeOutOfRange,
	/// A daylight saving zone was named without transition rules.
	MissingDateRule,
	/// A transition rule used the `Jn` or `n` form, which is not supported.
	UnsupportedDateRule,
	/// A transition rule was malformed.
	InvalidDateRule,
	/// A month, week, or weekday was outside its allowed range.
	DateOutOfRange,
	/// Found unexpected bytes after a valid TZ string.
	UnexpectedInput
}

impl fmt::Display for TzStringError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			TzStringError::MissingTzString => write!(f, "Missing TZ string"),
			TzStringError::InvalidName => write!(f, "Invalid zone name"),
			TzStringError::InvalidOffset => write!(f, "Invalid UTC offset"),
			TzStringError::TimeOutOfRange => write!(f, "Time component out of range"),
			TzStringError::MissingDateRule => write!(f, "Daylight saving rules must be included"),
			TzStringError::UnsupportedDateRule => write!(f, "Only Mm.w.d date rules are supported"),
			TzStringError::InvalidDateRule => write!(f, "Invalid date rule"),
			TzStringError::DateOutOfRange => write!(f, "Date component out of range"),
			TzStringError::UnexpectedInput => write!(f, "Unexpected input at end of TZ string")
		}
	}
}

impl error::Error for TzStringError {}

/// Byte cursor over a TZ string.
struct Cursor<'a> {
	bytes: &'a [u8]
}

impl<'a> Cursor<'a> {
	fn peek(&self) -> Option<u8> {
		self.bytes.first().copied()
	}

	fn eat(&mut self, b: u8) -> bool {
		if self.peek() == Some(b) {
			self.bytes = &self.bytes[1..];
			true
		} else {
			false
		}
	}

	/// Read up to `max_digits` decimal digits.
	fn number(&mut self, max_digits: usize) -> Option<u32> {
		let len = self.bytes.iter().take(max_digits).take_while(|b| b.is_ascii_digit()).count();
		if len == 0 { return None }
		let (digits, rest) = self.bytes.split_at(len);
		self.bytes = rest;
		Some(digits.iter().fold(0, |acc, d| acc * 10 + (d - b'0') as u32))
	}

	/// Zone name: `<...>` or at least three alphabetic characters.
	fn name(&mut self) -> Result<(), TzStringError> {
		if self.eat(b'<') {
			let end = self.bytes.iter().position(|&b| b == b'>').ok_or(TzStringError::InvalidName)?;
			if end < 3 { return Err(TzStringError::InvalidName) }
			self.bytes = &self.bytes[end + 1..];
		} else {
			let len = self.bytes.iter().take_while(|b| b.is_ascii_alphabetic()).count();
			if len < 3 { return Err(TzStringError::InvalidName) }
			self.bytes = &self.bytes[len..];
		}
		Ok(())
	}

	/// Signed `[+-]hh[:mm[:ss]]` in seconds, with hours up to `max_hours`.
	fn time(&mut self, max_hours: u32) -> Result<i32, TzStringError> {
		let negative = if self.eat(b'-') { true } else { self.eat(b'+'); false };
		let hours = self.number(3).ok_or(TzStringError::InvalidOffset)?;
		if hours > max_hours { return Err(TzStringError::TimeOutOfRange) }
		let mut total = hours * 3600;
		for scale in [60, 1] {
			if !self.eat(b':') { break }
			let v = self.number(2).ok_or(TzStringError::InvalidOffset)?;
			if v > 59 { return Err(TzStringError::TimeOutOfRange) }
			total += v * scale;
		}
		Ok(if negative { -(total as i32) } else { total as i32 })
	}

	/// Date rule `Mm.w.d[/time]`.
	fn transition(&mut self) -> Result<TzTransition, TzStringError> {
		match self.peek() {
			Some(b'M') => { self.eat(b'M'); },
			Some(b'J' | b'0'..=b'9') => return Err(TzStringError::UnsupportedDateRule),
			_ => return Err(TzStringError::InvalidDateRule)
		}
		let month = self.number(2).ok_or(TzStringError::InvalidDateRule)?;
		if !self.eat(b'.') { return Err(TzStringError::InvalidDateRule) }
		let week = self.number(1).ok_or(TzStringError::InvalidDateRule)?;
		if !self.eat(b'.') { return Err(TzStringError::InvalidDateRule) }
		let wday = self.number(1).ok_or(TzStringError::InvalidDateRule)?;
		if !(1..=12).contains(&month) || !(1..=5).contains(&week) || wday > 6 {
			return Err(TzStringError::DateOutOfRange)
		}
		let time = if self.eat(b'/') { self.time(167)? } else { 2 * SECONDS_PER_HOUR as i32 };
		Ok(TzTransition::new(month as u8, week as u8, wday as u8, time))
	}
}

/// Parse a byte slice containing a TZ string.
///
/// # Errors
///
/// Returns [`TzStringError`] if the TZ string is malformed or uses unsupported date rules.
///
/// # Examples
///
/// ```
/// # use time::tz::{parse_tzstring, TzInfo};
/// let timezone = parse_tzstring(b"EST5EDT,M3.2.0,M11.1.0").unwrap();
/// assert_eq!(timezone.info(1710054000), TzInfo { utoff: -14400, isdst: true });
/// assert_eq!(parse_tzstring(b"JST-9").unwrap().info(0), TzInfo { utoff: 32400, isdst: false });
/// ```
pub fn parse_tzstring(tzstring: &[u8]) -> Result<Timezone, TzStringError> {
	if tzstring.is_empty() {
		return Err(TzStringError::MissingTzString)
	}
	let mut c = Cursor { bytes: tzstring };

	c.name()?;
	// POSIX offsets count hours west of Greenwich
	let utoff = -c.time(24)?;
	if c.peek().is_none() {
		return Ok(Timezone::fixed(utoff))
	}

	c.name()?;
	let dstoff = match c.peek() {
		Some(b'+' | b'-' | b'0'..=b'9') => -c.time(24)?,
		_ => utoff + SECONDS_PER_HOUR as i32
	};
	if !c.eat(b',') {
		return Err(if c.peek().is_none() { TzStringError::MissingDateRule } else { TzStringError::UnexpectedInput })
	}
	let todst = c.transition()?;
	if !c.eat(b',') {
		return Err(TzStringError::MissingDateRule)
	}
	let fromdst = c.transition()?;
	if c.peek().is_some() {
		return Err(TzStringError::UnexpectedInput)
	}

	Ok(Timezone {
		utoff,
		dst: Some(TzRule { utoff: dstoff, todst, fromdst })
	})
}
