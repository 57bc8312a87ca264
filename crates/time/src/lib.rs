//! Utilities for dealing with civil time.
//!
//! This crate is divided into three parts: [`time`] converts between Unix timestamps and UTC
//! calendar dates with no understanding of timezones; [`tz`] describes a region's UTC offset and
//! daylight saving rules with a subset of POSIX [TZ strings]; [`parse`] reads date time strings
//! supplied on the command line.
//!
//! The crate is `no_std`. If the `now` feature is enabled, [`time::now`] reads the current system
//! time through `libc`.
//!
//! [TZ strings]: https://www.gnu.org/software/libc/manual/html_node/TZ-Variable.html
//!
//! # Examples
//!
//! Conversion from Unix time to UTC calendar time.
//! ```
//! # use time::time::Tm;
//! let date = Tm::new(1718617807).unwrap();
//! assert_eq!(date, Tm {
//! 	sec: 7,
//! 	min: 50,
//! 	hour: 9,
//! 	day: 17,
//! 	mon: 6,
//! 	year: 2024,
//! 	wday: 1,
//! 	yday: 169
//! });
//! ```
//!
//! Conversion from Unix time to Central European calendar time.
//! ```
//! # use time::{time::Tm, tz::{parse_tzstring, TzInfo, TmWithTzInfo}};
//! let timezone = parse_tzstring(b"CET-1CEST,M3.5.0,M10.5.0/3").unwrap();
//! let date = timezone.date(1718617807);
//! assert_eq!(date, Some(TmWithTzInfo {
//! 	tm: Tm { sec: 7, min: 50, hour: 11, day: 17, mon: 6, year: 2024, wday: 1, yday: 169 },
//! 	info: TzInfo { utoff: 7200, isdst: true }
//! }));
//! ```

#![no_std]

pub mod time;
pub mod tz;
pub mod parse;

pub use time::*;
pub use parse::*;
