use dcf77::{encode, Bit, CivilTime, DstMethod, MinuteRenderer, Synthesizer, Waveform};
use time::tz::CENTRAL_EUROPE;

/// Frames for the minute starting at the given Unix timestamp, in Berlin.
const VECTORS: &[(i64, &str)] = &[
	// Fri, Mar 15, 2024. 13:37 CET
	(1710506220, "00011101111101000010111101101110010110101010111000001001001-"),
	// Sun, May 26, 2024. 18:58 CEST
	(1716742680, "00011101111101000100100011011000110001100100010100001001001-"),
	// Sun, Mar 31, 2024. 01:59 CET, then 03:00 CEST
	(1711846740, "00011101111101000010110011010100000110001100011000001001001-"),
	(1711846800, "00011101111101000100100000000110000010001100011000001001001-"),
	// Sun, Oct 27, 2024. 02:59 CEST, then 02:00 CET
	(1729990740, "00011101111101000100110011010010000111100100000001001001001-"),
	(1729990800, "00011101111101000010100000000010000111100100000001001001001-"),
	// Fri, Dec 31, 1999. 23:59 CET, then Sat, Jan 1, 2000. 00:00 CET
	(946681140, "00011101111101000010110011010110001110001110101001100110011-"),
	(946681200, "00011101111101000010100000000000000010000001110000000000000-")
];

#[test]
fn vectors_test() {
	for method in [DstMethod::Differential, DstMethod::Rule] {
		for &(time, expected) in VECTORS {
			let t = CivilTime::at(time, &CENTRAL_EUROPE, method).unwrap();
			assert_eq!(encode(&t).to_string(), expected, "{} ({:?})", t, method);
		}
	}
}

#[test]
fn renderer_announces_next_minute_test() {
	let renderer = MinuteRenderer::new(CENTRAL_EUROPE, DstMethod::Differential, Synthesizer::new(10, Waveform::Clean));
	for &(time, expected) in VECTORS {
		assert_eq!(renderer.frame(time - 60).unwrap().to_string(), expected);
		assert_eq!(renderer.frame(time - 1).unwrap().to_string(), expected);
	}
}

#[test]
fn frame_invariants_test() {
	// Every minute of a day crossing the switch to summer time
	let start = 1711839600;
	for time in (start..start + 86400).step_by(60) {
		let t = CivilTime::at(time, &CENTRAL_EUROPE, DstMethod::Differential).unwrap();
		let f = encode(&t);
		assert_eq!(f.bits().len(), 60);
		assert_eq!(f.bits().iter().position(|&b| b == Bit::Marker), Some(59));
		assert!(f.bits()[..59].iter().all(|&b| b != Bit::Marker));
		assert_ne!(f[17], f[18]);
		assert_eq!(f, encode(&t));
	}
}
