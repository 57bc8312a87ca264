//! Encode civil time into a DCF77 minute frame.
//!
//! See [DCF77 documentation](https://en.wikipedia.org/wiki/DCF77#Time_code_details) for details.
//! A frame has one position per second. Positions 0-58 carry data bits and position 59 is the
//! minute marker, transmitted without a bit:
//!
//! | Positions | Contents                                                |
//! | --------- | ------------------------------------------------------- |
//! | 0-16      | Fixed preamble `00011101111101000`                       |
//! | 17, 18    | Daylight saving time flag and its complement            |
//! | 19, 20    | Fixed `01`, the start of encoded time                   |
//! | 21-28     | Minute (7 bits BCD) and even parity                     |
//! | 29-35     | Hour (6 bits BCD) and even parity                       |
//! | 36-57     | Day (6), weekday (3), month (5), year (8)               |
//! | 58        | Even parity over the 22 date bits                       |
//! | 59        | Minute marker                                           |
//!
//! All numbers are transmitted least significant bit first.
//!
//! # Examples
//!
//! ```
//! # use dcf77::{encode, CivilTime};
//! // Fri, Mar 15, 2024. 13:37 CET.
//! let t = CivilTime::new(24, 3, 15, 5, 13, 37, false).unwrap();
//! assert_eq!(
//! 	encode(&t).to_string(),
//! 	"00011101111101000010111101101110010110101010111000001001001-"
//! );
//! ```

use std::{fmt, ops::Index};
use crate::civil::CivilTime;

/// Number of positions in a frame, one per second.
pub const FRAME_LEN: usize = 60;

/// Preamble transmitted in positions 0-16.
const PREAMBLE: &[u8; 17] = b"00011101111101000";

/// A single frame position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Bit {
	Zero,
	One,
	/// End of minute, no bit transmitted.
	Marker
}

impl Bit {
	/// The character used to render this position: `'0'`, `'1'`, or `'-'`.
	pub const fn as_char(self) -> char {
		match self {
			Bit::Zero => '0',
			Bit::One => '1',
			Bit::Marker => '-'
		}
	}
}

impl From<bool> for Bit {
	fn from(value: bool) -> Self {
		if value { Bit::One } else { Bit::Zero }
	}
}

/// A fixed width binary coded decimal field, least significant bit first.
///
/// Fields up to 4 bits wide hold the value in plain binary. Wider fields hold the ones digit in the
/// low 4 bits and the tens digit in the remaining bits.
///
/// # Examples
///
/// ```
/// # use dcf77::frame::{Bit, BitField};
/// let minute = BitField::bcd(37, 7);
/// assert_eq!(minute.bits(), 0b011_0111);
/// assert_eq!(minute.value(), 37);
/// assert_eq!(minute.parity(), Bit::One);
/// assert_eq!(BitField::bcd(5, 3).bits(), 0b101);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BitField {
	bits: u16,
	width: u8
}

impl BitField {
	/// Encode `value` in a field of `width` bits.
	///
	/// # Panics
	///
	/// Panics if `width` is not in [1, 8] or if `value` does not fit in the field.
	pub const fn bcd(value: u8, width: u8) -> BitField {
		assert!(width >= 1 && width <= 8, "field width must be between 1 and 8 bits");
		let bits = if width <= 4 {
			value as u16
		} else {
			(value % 10) as u16 | ((value / 10) as u16) << 4
		};
		assert!(bits >> width == 0, "value does not fit in field");
		BitField { bits, width }
	}

	/// The encoded bits, first transmitted bit in the LSB.
	pub const fn bits(&self) -> u16 {
		self.bits
	}

	pub const fn width(&self) -> u8 {
		self.width
	}

	/// Decode the field back into its value.
	pub const fn value(&self) -> u8 {
		if self.width <= 4 {
			self.bits as u8
		} else {
			(self.bits & 0xf) as u8 + (self.bits >> 4) as u8 * 10
		}
	}

	/// Even parity bit for this field.
	pub const fn parity(&self) -> Bit {
		parity(&[*self])
	}

	/// The field's bits in transmission order.
	pub fn iter(&self) -> impl Iterator<Item = Bit> {
		let BitField { bits, width } = *self;
		(0..width).map(move |i| Bit::from((bits >> i) & 1 == 1))
	}
}

/// Even parity over several fields: [`Bit::One`] if they contain an odd number of set bits.
pub const fn parity(fields: &[BitField]) -> Bit {
	let mut ones = 0;
	let mut i = 0;
	while i < fields.len() {
		ones += fields[i].bits.count_ones();
		i += 1;
	}
	if ones % 2 == 1 { Bit::One } else { Bit::Zero }
}

/// One encoded minute.
///
/// Renders as a 60 character string of `'0'`, `'1'`, and a final `'-'`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MinuteFrame([Bit; FRAME_LEN]);

impl MinuteFrame {
	/// All positions in transmission order.
	pub fn bits(&self) -> &[Bit; FRAME_LEN] {
		&self.0
	}

	pub fn get(&self, index: usize) -> Option<Bit> {
		self.0.get(index).copied()
	}
}

impl Index<usize> for MinuteFrame {
	type Output = Bit;

	fn index(&self, index: usize) -> &Self::Output {
		&self.0[index]
	}
}

impl fmt::Display for MinuteFrame {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for b in &self.0 {
			write!(f, "{}", b.as_char())?;
		}
		Ok(())
	}
}

/// Sequential writer for frame positions.
struct FrameWriter {
	bits: [Bit; FRAME_LEN],
	len: usize
}

impl FrameWriter {
	fn push(&mut self, bit: Bit) {
		self.bits[self.len] = bit;
		self.len += 1;
	}

	fn push_field(&mut self, field: BitField) {
		field.iter().for_each(|b| self.push(b));
	}

	fn finish(self) -> MinuteFrame {
		debug_assert_eq!(self.len, FRAME_LEN);
		MinuteFrame(self.bits)
	}
}

/// Encode a civil time into a frame.
///
/// The frame announces `time`, i.e. it is transmitted during the minute before `time` and the
/// minute marker falls exactly on `time`.
///
/// # Panics
///
/// Panics if a field of `time` is out of range. Use [`CivilTime::new`] or [`CivilTime::at`] to build
/// valid times.
pub fn encode(time: &CivilTime) -> MinuteFrame {
	if let Err(e) = time.validate() {
		panic!("Cannot encode {:?}: {}", time, e);
	}

	let mut w = FrameWriter { bits: [Bit::Zero; FRAME_LEN], len: 0 };
	PREAMBLE.iter().for_each(|&b| w.push(Bit::from(b == b'1')));

	w.push(Bit::from(time.dst));
	w.push(Bit::from(!time.dst));
	w.push(Bit::Zero);
	w.push(Bit::One);

	let minute = BitField::bcd(time.minute, 7);
	w.push_field(minute);
	w.push(minute.parity());

	let hour = BitField::bcd(time.hour, 6);
	w.push_field(hour);
	w.push(hour.parity());

	let date = [
		BitField::bcd(time.day, 6),
		BitField::bcd(time.weekday, 3),
		BitField::bcd(time.month, 5),
		BitField::bcd(time.year, 8)
	];
	date.iter().for_each(|&f| w.push_field(f));
	w.push(parity(&date));

	w.push(Bit::Marker);
	w.finish()
}
