use std::sync::mpsc::sync_channel;
use std::thread;
use dcf77::{DstMethod, MinuteRenderer, Scheduler, Synthesizer, Waveform};
use time::{tz::CENTRAL_EUROPE, TimeSpec};

const RATE: u32 = 100;

fn renderer() -> MinuteRenderer {
	MinuteRenderer::new(CENTRAL_EUROPE, DstMethod::Differential, Synthesizer::new(RATE, Waveform::Quantized))
}

#[test]
fn render_thread_test() {
	let now = TimeSpec { sec: 1711846715, nsec: 250_000_000 };
	let slot = now.minute_start();
	let r = renderer();

	let mut scheduler = Scheduler::new(RATE);
	scheduler.prime(r.render(slot).unwrap(), r.render(slot + 60).unwrap()).unwrap();
	let start = scheduler.start(now).unwrap();
	assert_eq!(start.offset, 3525);

	// Render thread blocks holding one finished minute until the scheduler wants it
	let (tx, rx) = sync_channel(0);
	let producer = thread::spawn(move || {
		let r = renderer();
		let mut next = slot + 120;
		while tx.send(r.render(next).unwrap()).is_ok() {
			next += 60;
		}
	});

	// Play five minutes in audio callback sized chunks
	let expected: Vec<f32> = (0..6)
		.flat_map(|i| r.render(slot + i * 60).unwrap().samples().to_vec())
		.skip(start.offset)
		.take(RATE as usize * 300)
		.collect();
	let mut played = Vec::new();
	let mut out = [0.; 128];
	while played.len() < expected.len() {
		if scheduler.wants().is_some() {
			scheduler.offer(rx.recv().unwrap()).unwrap();
		}
		let report = scheduler.write(&mut out);
		assert_eq!(report.underrun, 0);
		played.extend_from_slice(&out);
	}
	played.truncate(expected.len());
	assert_eq!(played, expected);

	scheduler.stop();
	drop(rx);
	producer.join().unwrap();
}

#[test]
fn length_test() {
	for rate in [1, 8000, 22050, 44100, 48000] {
		let r = MinuteRenderer::new(CENTRAL_EUROPE, DstMethod::Rule, Synthesizer::new(rate, Waveform::Quantized));
		let m = r.render(1710506160).unwrap();
		assert_eq!(m.len(), rate as usize * 60);
		assert_eq!(m, r.render(1710506160).unwrap());
	}
}
