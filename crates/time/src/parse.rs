//! Parse date time strings like `YYYY-MM-DD HH:MM:SS.mmm +01:00`.
//!
//! # Examples
//! ```
//! # use time::{parse::parse_timestamp, time::TimeSpec};
//! assert_eq!(parse_timestamp("2025-02-18T12:30:45Z"), Ok(TimeSpec { sec: 1739881845, nsec: 0 }));
//! assert_eq!(parse_timestamp("2025-02-18 13:30:45 +01:00"), Ok(TimeSpec { sec: 1739881845, nsec: 0 }));
//! ```

use core::{error, fmt};
use crate::time::{days_per_month, timestamp_from_ymd, TimeSpec};

/// Error type for parsing date time strings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseError {
	/// A field was missing or had the wrong number of digits. The payload names the field.
	Missing(&'static str),
	/// A field was outside its allowed range. The payload names the field.
	OutOfRange(&'static str),
	/// Found unexpected bytes after a valid date time string.
	UnexpectedInput
}

impl fmt::Display for ParseError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ParseError::Missing(field) => write!(f, "Missing or malformed {}", field),
			ParseError::OutOfRange(field) => write!(f, "{} out of range", field),
			ParseError::UnexpectedInput => write!(f, "Unexpected input after date time")
		}
	}
}

impl error::Error for ParseError {}

/// Read exactly `N` digits from the front of `bytes`.
fn digits<'a, const N: usize>(bytes: &'a [u8], field: &'static str) -> Result<(&'a [u8], u16), ParseError> {
	match bytes.split_first_chunk::<N>() {
		Some((head, rest)) if head.iter().all(u8::is_ascii_digit) => {
			Ok((rest, head.iter().fold(0, |acc, d| acc * 10 + (d - b'0') as u16)))
		},
		_ => Err(ParseError::Missing(field))
	}
}

/// Require `sep` and then `N` digits, checking the value is at most `max`.
fn field<'a, const N: usize>(bytes: &'a [u8], sep: &[u8], field: &'static str, max: u16)
	-> Result<(&'a [u8], u16), ParseError>
{
	let rest = match bytes.split_first() {
		Some((b, rest)) if sep.contains(b) => rest,
		_ => return Err(ParseError::Missing(field))
	};
	let (rest, v) = digits::<N>(rest, field)?;
	if v > max {
		return Err(ParseError::OutOfRange(field))
	}
	Ok((rest, v))
}

/// Parse a date time string into a Unix timestamp.
///
/// Supported forms, where `[...]` is optional:
///
/// `YYYY-MM-DD[(T| )HH:MM[:SS[.mmm]]][ ][Z|(+|-)HH:MM]`
///
/// A missing offset is interpreted as UTC.
///
/// # Errors
///
/// Returns [`ParseError`] naming the first field that is missing or out of range.
///
/// # Examples
///
/// ```
/// # use time::{parse::{parse_timestamp, ParseError}, time::TimeSpec};
/// assert_eq!(parse_timestamp("2025-02-18"), Ok(TimeSpec { sec: 1739836800, nsec: 0 }));
/// assert_eq!(
/// 	parse_timestamp("2025-02-18T12:30:45.123"),
/// 	Ok(TimeSpec { sec: 1739881845, nsec: 123000000 })
/// );
/// assert_eq!(parse_timestamp("2025-02-30"), Err(ParseError::OutOfRange("day")));
/// ```
pub fn parse_timestamp(s: &str) -> Result<TimeSpec, ParseError> {
	let bytes = s.as_bytes();
	let (bytes, year) = digits::<4>(bytes, "year")?;
	let (bytes, month) = field::<2>(bytes, b"-", "month", 12)?;
	if month == 0 {
		return Err(ParseError::OutOfRange("month"))
	}
	let (mut bytes, day) = field::<2>(bytes, b"-", "day", 31)?;
	if day == 0 || day > days_per_month(year, month as u8) as u16 {
		return Err(ParseError::OutOfRange("day"))
	}
	let mut time = TimeSpec::from_secs(timestamp_from_ymd(year, month as u8, day as u8));

	// Time of day, only if the next byte starts one
	if matches!(bytes, [b'T' | b' ', b'0'..=b'9', ..]) {
		let (rest, hours) = field::<2>(bytes, b"T ", "hours", 23)?;
		let (rest, minutes) = field::<2>(rest, b":", "minutes", 59)?;
		time.sec += hours as i64 * 3600 + minutes as i64 * 60;
		bytes = rest;

		if bytes.first() == Some(&b':') {
			let (rest, seconds) = field::<2>(bytes, b":", "seconds", 59)?;
			time.sec += seconds as i64;
			bytes = rest;

			if bytes.first() == Some(&b'.') {
				let (rest, millis) = field::<3>(bytes, b".", "milliseconds", 999)?;
				time.nsec = millis as i64 * 1000000;
				bytes = rest;
			}
		}
	}

	// Offset from UTC
	if let [b' ', rest @ ..] = bytes {
		bytes = rest;
	}
	match bytes {
		[] | [b'Z'] => Ok(time),
		[sign @ (b'+' | b'-'), rest @ ..] => {
			let (rest, hours) = digits::<2>(rest, "offset hours")?;
			if hours > 23 {
				return Err(ParseError::OutOfRange("offset hours"))
			}
			let (rest, minutes) = field::<2>(rest, b":", "offset minutes", 59)?;
			if !rest.is_empty() {
				return Err(ParseError::UnexpectedInput)
			}
			let offset = hours as i64 * 3600 + minutes as i64 * 60;
			time.sec += if *sign == b'+' { -offset } else { offset };
			Ok(time)
		},
		_ => Err(ParseError::UnexpectedInput)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn field_test() {
		let input = b"2024-03-15";
		let (rest, year) = digits::<4>(input, "year").unwrap();
		assert_eq!((rest, year), (&b"-03-15"[..], 2024));
		let (rest, month) = field::<2>(rest, b"-", "month", 12).unwrap();
		assert_eq!((rest, month), (&b"-15"[..], 3));
		assert_eq!(field::<2>(rest, b"-", "day", 9), Err(ParseError::OutOfRange("day")));
		assert_eq!(field::<2>(rest, b":", "day", 31), Err(ParseError::Missing("day")));
		assert_eq!(digits::<4>(b"20x4", "year"), Err(ParseError::Missing("year")));

		// The remainder borrows from the input, not the separator set
		let rest = {
			let seps = [b'T', b' '];
			field::<2>(b" 13:37", &seps, "hour", 23).unwrap().0
		};
		assert_eq!(rest, b":37");
	}

	#[test]
	fn parse_timestamp_test() {
		assert_eq!(parse_timestamp("2024-03-15"), Ok(TimeSpec::from_secs(1710460800)));
		assert_eq!(parse_timestamp("2024-03-15 12:37"), Ok(TimeSpec::from_secs(1710506220)));
		assert_eq!(parse_timestamp("2024-03-15 13:37 +01:00"), Ok(TimeSpec::from_secs(1710506220)));
		assert_eq!(parse_timestamp("2024-03-15T13:37:00+01:00"), Ok(TimeSpec::from_secs(1710506220)));
		assert_eq!(parse_timestamp("2024-03-15 11:37:00-01:00"), Ok(TimeSpec::from_secs(1710506220)));
		assert_eq!(
			parse_timestamp("1999-12-31 23:59:00.500Z"),
			Ok(TimeSpec { sec: 946684740, nsec: 500000000 })
		);
		assert_eq!(parse_timestamp("2024-02-29"), Ok(TimeSpec::from_secs(1709164800)));

		assert_eq!(parse_timestamp(""), Err(ParseError::Missing("year")));
		assert_eq!(parse_timestamp("2024"), Err(ParseError::Missing("month")));
		assert_eq!(parse_timestamp("2024-13-01"), Err(ParseError::OutOfRange("month")));
		assert_eq!(parse_timestamp("2024-00-01"), Err(ParseError::OutOfRange("month")));
		assert_eq!(parse_timestamp("2023-02-29"), Err(ParseError::OutOfRange("day")));
		assert_eq!(parse_timestamp("2024-03-15 24:00"), Err(ParseError::OutOfRange("hours")));
		assert_eq!(parse_timestamp("2024-03-15 12"), Err(ParseError::Missing("minutes")));
		assert_eq!(parse_timestamp("2024-03-15 12:60"), Err(ParseError::OutOfRange("minutes")));
		assert_eq!(parse_timestamp("2024-03-15 12:30:5"), Err(ParseError::Missing("seconds")));
		assert_eq!(parse_timestamp("2024-03-15 12:30 +0100"), Err(ParseError::Missing("offset minutes")));
		assert_eq!(parse_timestamp("2024-03-15 12:30 CET"), Err(ParseError::UnexpectedInput));
		assert_eq!(parse_timestamp("2024-03-15Zx"), Err(ParseError::UnexpectedInput));
	}
}
