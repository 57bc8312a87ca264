//! Unix time and UTC calendar conversions, unaware of timezone.
//!
//! The calendar functions here are pure integer arithmetic over the proleptic Gregorian calendar
//! and do not rely on libc's `gmtime`/`mktime`, so they are thread safe and available in `no_std`.
//!
//! # Examples
//!
//! ```
//! # use time::time::{Tm, timestamp_from_ymd};
//! let date = Tm::new(946684740).unwrap();
//! assert_eq!((date.year, date.mon, date.day, date.hour, date.min), (1999, 12, 31, 23, 59));
//! assert_eq!(timestamp_from_ymd(2000, 1, 1), 946684800);
//! ```

use core::ops::Add;
#[cfg(feature = "now")]
use core::mem::MaybeUninit;
#[cfg(feature = "now")]
use libc::{timespec, clock_gettime, CLOCK_REALTIME};

/// Seconds per minute.
pub const SECONDS_PER_MINUTE: i64 = 60;
/// Seconds per hour.
pub const SECONDS_PER_HOUR: i64 = SECONDS_PER_MINUTE * 60;
/// Seconds per day.
pub const SECONDS_PER_DAY: i64 = SECONDS_PER_HOUR * 24;
/// Nanoseconds per second.
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;
/// Days in one 400 year Gregorian cycle.
const DAYS_PER_ERA: i64 = 146097;
/// Days from March 1, 0000 (start of the shifted calendar) to January 1, 1970.
const DAYS_FROM_MARCH_0000_TO_EPOCH: i64 = 719468;

/// Helper type to support math on [`TimeSpec`]s. Represents seconds.
#[repr(transparent)]
pub struct Seconds(pub i64);

/// Helper type to support math on [`TimeSpec`]s. Represents nanoseconds.
///
/// Adding nanoseconds to a [`TimeSpec`] rolls over into seconds as needed.
///
/// ```
/// # use time::time::{Nanoseconds, TimeSpec};
/// let c = TimeSpec { sec: 1735732800, nsec: 999999999 };
/// assert_eq!(c + Nanoseconds(10), TimeSpec { sec: 1735732801, nsec: 9 });
/// assert_eq!(c + Nanoseconds(-1000000000), TimeSpec { sec: 1735732799, nsec: 999999999 });
/// ```
#[repr(transparent)]
pub struct Nanoseconds(pub i64);

/// Unix time with nanosecond granularity.
///
/// `nsec` is always kept in `[0, 999999999]`, so a negative instant such as -0.5s is represented
/// as `{ sec: -1, nsec: 500000000 }`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeSpec {
	/// Seconds since the Unix epoch
	pub sec: i64,
	/// Nanoseconds since the beginning of `sec`, ranging [0-999999999]
	pub nsec: i64
}

impl TimeSpec {
	/// Construct a [`TimeSpec`] for a whole second.
	pub const fn from_secs(sec: i64) -> TimeSpec {
		TimeSpec { sec, nsec: 0 }
	}

	/// The Unix timestamp of the start of the minute containing `self`.
	///
	/// ```
	/// # use time::time::TimeSpec;
	/// assert_eq!(TimeSpec { sec: 1710506245, nsec: 5 }.minute_start(), 1710506220);
	/// assert_eq!(TimeSpec::from_secs(-1).minute_start(), -60);
	/// ```
	pub const fn minute_start(&self) -> i64 {
		self.sec - self.sec.rem_euclid(SECONDS_PER_MINUTE)
	}

	/// The second within the current minute, ranged [0, 59].
	pub const fn second_of_minute(&self) -> u8 {
		self.sec.rem_euclid(SECONDS_PER_MINUTE) as u8
	}

	/// Nanoseconds elapsed since [`TimeSpec::minute_start`].
	pub const fn nanos_into_minute(&self) -> i64 {
		self.second_of_minute() as i64 * NANOS_PER_SECOND + self.nsec
	}
}

#[cfg(feature = "now")]
impl From<timespec> for TimeSpec {
	/// Convert from `libc::timespec` to [`TimeSpec`] for better math ergonomics
	fn from(value: timespec) -> Self {
		TimeSpec {
			sec: value.tv_sec as i64,
			nsec: value.tv_nsec as i64
		}
	}
}

impl Add<Seconds> for TimeSpec {
	type Output = Self;

	fn add(mut self, rhs: Seconds) -> Self::Output {
		self.sec += rhs.0;
		self
	}
}

impl Add<Nanoseconds> for TimeSpec {
	type Output = Self;

	fn add(self, rhs: Nanoseconds) -> Self::Output {
		let total = self.nsec + rhs.0;
		TimeSpec {
			sec: self.sec + total.div_euclid(NANOS_PER_SECOND),
			nsec: total.rem_euclid(NANOS_PER_SECOND)
		}
	}
}

/// Get the current time as a Unix timestamp with nanosecond granularity.
///
/// Returns `None` if `libc::clock_gettime` fails. This function is thread safe.
#[cfg(feature = "now")]
pub fn now() -> Option<TimeSpec> {
	let mut time = MaybeUninit::<timespec>::uninit();
	// Safety:
	// - clock_gettime does not read time, only writes
	// - if clock_gettime returns zero, time is successfully initialized
	unsafe {
		match clock_gettime(CLOCK_REALTIME, time.as_mut_ptr()) {
			0 => Some(time.assume_init().into()),
			_ => None
		}
	}
}

/// Check whether a given absolute Gregorian `year` is a leap year.
///
/// ```
/// # use time::time::isleapyear;
/// assert!(!isleapyear(1900));
/// assert!(isleapyear(2000));
/// assert!(isleapyear(2024));
/// assert!(!isleapyear(2100));
/// ```
#[inline(always)]
pub const fn isleapyear(year: u16) -> bool {
	year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

/// The number of days in month `m` (1-indexed) of year `y`.
pub const fn days_per_month(y: u16, m: u8) -> u8 {
	match m {
		2 => if isleapyear(y) { 29 } else { 28 },
		4 | 6 | 9 | 11 => 30,
		_ => 31
	}
}

/// Days since January 1, 1970 for a given year, month (1-12), and day of month.
///
/// Works on a calendar rotated to start in March so that the leap day falls at the end of the
/// year, then counts whole 400 year eras.
/// See <http://howardhinnant.github.io/date_algorithms.html#days_from_civil>.
pub const fn days_from_civil(y: i64, m: u8, d: u8) -> i64 {
	let y = if m <= 2 { y - 1 } else { y };
	let era = y.div_euclid(400);
	let yoe = y - era * 400;
	let mp = (m as i64 + 9) % 12;
	let doy = (153 * mp + 2) / 5 + d as i64 - 1;
	let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
	era * DAYS_PER_ERA + doe - DAYS_FROM_MARCH_0000_TO_EPOCH
}

/// Year, month (1-12), and day of month for a count of days since January 1, 1970.
///
/// Inverse of [`days_from_civil`].
pub const fn civil_from_days(days: i64) -> (i64, u8, u8) {
	let z = days + DAYS_FROM_MARCH_0000_TO_EPOCH;
	let era = z.div_euclid(DAYS_PER_ERA);
	let doe = z - era * DAYS_PER_ERA;
	let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
	let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
	let mp = (5 * doy + 2) / 153;
	let d = doy - (153 * mp + 2) / 5 + 1;
	let m = if mp < 10 { mp + 3 } else { mp - 9 };
	let y = yoe + era * 400 + if m <= 2 { 1 } else { 0 };
	(y, m as u8, d as u8)
}

/// Get the Unix timestamp for 00:00:00 UTC on a given year, month, and day.
///
/// ```
/// # use time::time::timestamp_from_ymd;
/// assert_eq!(timestamp_from_ymd(2024, 2, 29), 1709164800);
/// assert_eq!(timestamp_from_ymd(2024, 3, 31), 1711843200);
/// ```
pub const fn timestamp_from_ymd(y: u16, m: u8, d: u8) -> i64 {
	days_from_civil(y as i64, m, d) * SECONDS_PER_DAY
}

/// Weekday (0-6 => Sunday-Saturday) for a count of days since the Unix epoch.
#[inline(always)]
pub const fn wday_from_days(days: i64) -> u8 {
	// Jan 1, 1970 was a Thursday
	(days + 4).rem_euclid(7) as u8
}

/// Get the absolute Gregorian calendar year containing a given Unix timestamp.
pub const fn y_from_timestamp(unixtimestamp: i64) -> i64 {
	civil_from_days(unixtimestamp.div_euclid(SECONDS_PER_DAY)).0
}

/// Gregorian calendar date and time of day.
///
/// Differences from `libc::tm`:
/// - `mon` is [1, 12] rather than [0, 11].
/// - `yday` is [1, 366] rather than [0, 365].
/// - `year` is the absolute Gregorian year rather than years since 1900.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tm {
	/// Seconds, ranged [0, 59]
	pub sec: u8,
	/// Minutes, ranged [0, 59]
	pub min: u8,
	/// Hours, ranged [0, 23]
	pub hour: u8,
	/// Day of the month, ranged [1, 31]
	pub day: u8,
	/// Month of the year, ranged [1, 12]
	pub mon: u8,
	/// Absolute Gregorian year, ranged [1970, 65535]
	pub year: u16,
	/// Day of the week, ranged [0, 6] => [Sunday, Saturday]
	pub wday: u8,
	/// Day of the year, ranged [1, 366]
	pub yday: u16
}

impl Tm {
	/// Convert a Unix timestamp into a calendar date.
	///
	/// Only timestamps on or after the Unix epoch (Jan 1, 1970) are supported; negative inputs, or
	/// inputs beyond year 65535, result in `None`.
	pub const fn new(unixtimestamp: i64) -> Option<Tm> {
		if unixtimestamp < 0 { return None }
		let days = unixtimestamp / SECONDS_PER_DAY;
		let rem = unixtimestamp % SECONDS_PER_DAY;
		let (y, m, d) = civil_from_days(days);
		if y > u16::MAX as i64 { return None }

		Some(Tm {
			sec: (rem % SECONDS_PER_MINUTE) as u8,
			min: ((rem % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE) as u8,
			hour: (rem / SECONDS_PER_HOUR) as u8,
			day: d,
			mon: m,
			year: y as u16,
			wday: wday_from_days(days),
			yday: (days - days_from_civil(y, 1, 1) + 1) as u16
		})
	}

	/// Convert back into a Unix timestamp.
	pub const fn timestamp(&self) -> i64 {
		timestamp_from_ymd(self.year, self.mon, self.day)
			+ self.hour as i64 * SECONDS_PER_HOUR
			+ self.min as i64 * SECONDS_PER_MINUTE
			+ self.sec as i64
	}

	/// Check whether `self` is in a leap year.
	#[inline(always)]
	pub const fn isleapyear(&self) -> bool {
		isleapyear(self.year)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use core::mem::MaybeUninit;
	use libc::{time_t, tm};

	fn utc_time(time: time_t) -> tm {
		let mut result = MaybeUninit::<tm>::uninit();
		unsafe {
			libc::gmtime_r(&time, result.as_mut_ptr());
			result.assume_init()
		}
	}

	fn compare_dates(time: i64) {
		let expected = utc_time(time as time_t);
		let actual = Tm::new(time).unwrap();
		assert_eq!(actual.sec as i32, expected.tm_sec, "sec for {}", time);
		assert_eq!(actual.min as i32, expected.tm_min, "min for {}", time);
		assert_eq!(actual.hour as i32, expected.tm_hour, "hour for {}", time);
		assert_eq!(actual.day as i32, expected.tm_mday, "day for {}", time);
		assert_eq!(actual.mon as i32, expected.tm_mon + 1, "mon for {}", time);
		assert_eq!(actual.year as i32, expected.tm_year + 1900, "year for {}", time);
		assert_eq!(actual.wday as i32, expected.tm_wday, "wday for {}", time);
		assert_eq!(actual.yday as i32, expected.tm_yday + 1, "yday for {}", time);
		assert_eq!(actual.timestamp(), time);
	}

	#[test]
	fn date_test() {
		assert_eq!(Tm::new(-1), None);
		compare_dates(0);
		compare_dates(951782400); // Feb 29, 2000
		compare_dates(946684740); // Dec 31, 1999 23:59
		compare_dates(1710506220);
		compare_dates(4107542400); // Mar 1, 2100

		// Sweep a few decades in irregular steps so every month and weekday gets hit
		let mut t = 0;
		while t < 4200000000 {
			compare_dates(t);
			t += 86400 * 13 + 3607;
		}
	}

	#[test]
	fn civil_round_trip_test() {
		for days in -800000..800000 {
			if days % 997 != 0 { continue }
			let (y, m, d) = civil_from_days(days);
			assert_eq!(days_from_civil(y, m, d), days);
		}
		assert_eq!(civil_from_days(-1), (1969, 12, 31));
	}

	#[test]
	fn days_per_month_test() {
		let expected = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
		for (m, &d) in expected.iter().enumerate() {
			assert_eq!(days_per_month(2023, m as u8 + 1), d);
		}
		assert_eq!(days_per_month(2024, 2), 29);
		assert_eq!(days_per_month(1900, 2), 28);
	}

	#[test]
	fn timespec_test() {
		let t = TimeSpec { sec: 1710506245, nsec: 250000000 };
		assert_eq!(t.second_of_minute(), 25);
		assert_eq!(t.nanos_into_minute(), 25250000000);
		assert_eq!(t + Seconds(35), TimeSpec { sec: 1710506280, nsec: 250000000 });
		assert_eq!(t + Nanoseconds(750000000), TimeSpec { sec: 1710506246, nsec: 0 });
		assert_eq!(t + Nanoseconds(-500000000), TimeSpec { sec: 1710506244, nsec: 750000000 });
		assert_eq!(y_from_timestamp(946684799), 1999);
		assert_eq!(y_from_timestamp(946684800), 2000);
	}
}
