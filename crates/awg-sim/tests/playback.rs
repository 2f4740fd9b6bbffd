//! End-to-end playback: host compiler → wire bytes → simulated board.
//!
//! These tests drive the full chain the way the CLI does: compile a
//! waveform, wrap it in the command sequence, feed the byte stream into
//! the board one byte per clock, and check the DAC samples cycle by
//! cycle. Knot values must reproduce bit-exactly: every line reloads its
//! starting value, so no rounding drift survives a sample point.

use awg_host::{Command, Device, LineOptions, Segment, WaveformOptions};
use awg_sim::{Awg, AwgConfig};

/// Build the wire bytes for an upload bracketed by start/arm commands,
/// feed them, and run until the board is armed with the FIFO prefetched.
fn upload(build: impl FnOnce(&mut Device<Vec<u8>>)) -> Awg {
    let mut dev = Device::new(Vec::new());
    dev.cmd(Command::Start, false).expect("cmd");
    build(&mut dev);
    dev.cmd(Command::Start, true).expect("cmd");
    dev.cmd(Command::Arm, true).expect("cmd");
    let bytes = dev.into_inner();

    let mut awg = Awg::new(&AwgConfig::default());
    awg.feed(&bytes);
    let _ = awg.run(bytes.len() + 80);
    assert_eq!(awg.pending_input(), 0, "upload must drain");
    awg
}

/// Pulse the external trigger long enough to clear the two-flop
/// synchronizer, then collect channel-0 samples.
fn trigger_and_collect(awg: &mut Awg, cycles: usize) -> Vec<i16> {
    awg.set_trigger(true);
    let mut out: Vec<i16> = awg.run(6).iter().map(|s| s[0]).collect();
    awg.set_trigger(false);
    out.extend(awg.run(cycles).iter().map(|s| s[0]));
    out
}

/// Upload a raw pre-encoded segment to channel 0, frame 0.
fn upload_raw(segment: Segment) -> Awg {
    upload(|dev| {
        dev.channels[0].segments.push(segment);
        dev.write_channel(0, Some(&[Some(0)])).expect("upload");
    })
}

#[test]
fn constant_bias_plays_for_its_duration() {
    // Two constant lines back to back: five samples at +0x4000, then the
    // second line's value pins down the line length exactly
    let mut segment = Segment::new();
    segment
        .line(
            0,
            5,
            &[0x4000],
            0,
            &LineOptions {
                trigger: true,
                ..LineOptions::default()
            },
        )
        .expect("line");
    segment
        .line(
            0,
            5,
            &[0x2000],
            0,
            &LineOptions {
                end: true,
                ..LineOptions::default()
            },
        )
        .expect("line");
    let mut awg = upload_raw(segment);

    let out = trigger_and_collect(&mut awg, 60);
    let first = out.iter().position(|&s| s == 0x4000).expect("plays");
    assert_eq!(&out[first..first + 5], &[0x4000; 5]);
    assert_eq!(&out[first + 5..first + 10], &[0x2000; 5]);
}

#[test]
fn linear_ramp_is_knot_exact() {
    // 0 V → 8.75 V (0x7000 DAC units) over 10 ticks, order 1. The
    // serializer emits d1 = round(0x7000·2^16/10); the device truncates
    // the accumulator view, so intermediate samples follow the integer
    // model and the stop line lands the final knot exactly.
    let mut awg = upload(|dev| {
        let segment = dev
            .build_segment(
                0,
                &[0.0, 2e-7],
                &[0.0, 8.75],
                None,
                None,
                &WaveformOptions {
                    order: 1,
                    ..WaveformOptions::default()
                },
            )
            .expect("compiles");
        dev.write_channel(0, Some(&[Some(segment)])).expect("upload");
    });

    let out = trigger_and_collect(&mut awg, 120);

    let d1 = (0x7000u64 << 16) / 10; // 187904819.2 rounds down
    let expected: Vec<i16> = (0..10).map(|i| ((i * d1) >> 16) as i16).collect();
    assert_eq!(expected[1], 2867);

    let first = out.iter().position(|&s| s != 0).expect("ramp starts");
    let start = first - 1;
    assert_eq!(&out[start..start + 10], &expected[..]);
    // Stop line holds the exact final knot
    assert_eq!(&out[start + 10..start + 20], &[0x7000; 10]);
}

#[test]
fn cubic_spline_is_knot_exact() {
    // Six knots, 10 ticks apart, order 3. Each line reloads its starting
    // value, so the samples at knot times equal round(v·2^15/10 V)
    // bit-for-bit regardless of spline rounding in between.
    let volts: [f64; 6] = [1.0, 3.5, -2.0, 7.25, 4.0, -1.0];
    let times: Vec<f64> = (0..6).map(|i| (i * 10) as f64 / 50e6).collect();
    let quantized: Vec<i16> = volts
        .iter()
        .map(|&v| ((v / 10.0) * 32768.0).round() as i16)
        .collect();
    assert_eq!(quantized[0], 3277);

    let mut awg = upload(|dev| {
        let segment = dev
            .build_segment(0, &times, &volts, None, None, &WaveformOptions::default())
            .expect("compiles");
        dev.write_channel(0, Some(&[Some(segment)])).expect("upload");
    });

    let out = trigger_and_collect(&mut awg, 200);
    let start = out
        .iter()
        .position(|&s| s == quantized[0])
        .expect("playback starts at the first knot");
    for (i, &knot) in quantized.iter().enumerate() {
        assert_eq!(
            out[start + 10 * i],
            knot,
            "knot {i} must reproduce exactly"
        );
    }
    // The stop line dwells on the final knot
    assert!(out[start + 52..start + 80].iter().all(|&s| s == quantized[5]));
}

#[test]
fn frame_select_switches_playback() {
    // Frame 3 unconfigured, frame 5 populated: holding frame=3 stays
    // silent, switching to 5 starts playback
    let mut awg = upload(|dev| {
        let mut segment = Segment::new();
        segment
            .line(
                0,
                6,
                &[0x0F0F],
                0,
                &LineOptions {
                    end: true,
                    ..LineOptions::default()
                },
            )
            .expect("line");
        dev.channels[0].segments.push(segment);
        let mut entry = [None; 8];
        entry[5] = Some(0);
        dev.write_channel(0, Some(&entry)).expect("upload");
        dev.cmd(Command::Trigger, true).expect("cmd");
    });

    awg.set_frame(3);
    for sample in awg.run(60) {
        assert_eq!(sample[0], 0, "unconfigured frame must stay silent");
    }
    awg.set_frame(5);
    let out: Vec<i16> = awg.run(40).iter().map(|s| s[0]).collect();
    assert!(out.contains(&0x0F0F), "frame 5 must start playing");
}

#[test]
fn memory_write_lands_in_the_selected_channel() {
    let awg = upload(|dev| {
        let data: Vec<u8> = [0xAA00u16, 0xAA01, 0xAA02, 0xAA03]
            .iter()
            .flat_map(|w| w.to_le_bytes())
            .collect();
        dev.write_mem(2, &data, 0x0010).expect("write");
    });
    for (i, addr) in (0x10..=0x13).enumerate() {
        assert_eq!(awg.memory(2).read(addr), 0xAA00 + i as u16);
        assert_eq!(awg.memory(0).read(addr), 0);
        assert_eq!(awg.memory(1).read(addr), 0);
    }
}

#[test]
fn dds_phase_clear_replays_bit_for_bit() {
    let dds_words = || -> Vec<u16> {
        let mut words = vec![0u16; 12];
        words[0] = 12_000; // amplitude
        words[10] = 0x0000; // z1 low
        words[11] = 0x0100; // z1 high: 2^24, 1/256 turn per cycle
        words
    };
    let build = |second_clear: bool| -> Segment {
        let mut segment = Segment::new();
        segment
            .line(
                1,
                64,
                &dds_words(),
                0,
                &LineOptions {
                    trigger: true,
                    clear: true,
                    ..LineOptions::default()
                },
            )
            .expect("line");
        segment
            .line(
                1,
                64,
                &dds_words(),
                0,
                &LineOptions {
                    clear: second_clear,
                    end: true,
                    ..LineOptions::default()
                },
            )
            .expect("line");
        segment
    };

    let run = |second_clear: bool| -> Vec<i16> {
        let mut awg = upload_raw(build(second_clear));
        trigger_and_collect(&mut awg, 300)
    };

    let cleared = run(true);
    let start = cleared.iter().position(|&s| s != 0).expect("dds plays");
    for j in 0..60 {
        assert_eq!(
            cleared[start + j],
            cleared[start + 64 + j],
            "with clear, the second line replays the first (offset {j})"
        );
    }

    let free = run(false);
    let start = free.iter().position(|&s| s != 0).expect("dds plays");
    assert!(
        (4..60).any(|j| free[start + j] != free[start + 64 + j]),
        "without clear, the accumulated phase must show"
    );
}

#[test]
fn reset_drops_playback_and_memory_survives() {
    let mut awg = upload(|dev| {
        let mut segment = Segment::new();
        segment
            .line(
                0,
                8,
                &[0x3333],
                0,
                &LineOptions {
                    trigger: true,
                    end: true,
                    ..LineOptions::default()
                },
            )
            .expect("line");
        dev.channels[0].segments.push(segment);
        dev.write_channel(0, Some(&[Some(0)])).expect("upload");
    });

    let out = trigger_and_collect(&mut awg, 40);
    assert!(out.contains(&0x3333));

    // Reset: playback state drops within the debounce window
    awg.feed(&[0xA5, 0x00]);
    let _ = awg.run(140);
    assert_eq!(awg.samples()[0], 0);
    let (trigger, arm, start, _) = awg.levels();
    assert!(!trigger && !arm && !start);

    // The memory image survives: re-arming replays without re-upload
    awg.feed(&[0xA5, 0x08, 0xA5, 0x04]);
    let _ = awg.run(20);
    let out = trigger_and_collect(&mut awg, 40);
    assert!(out.contains(&0x3333), "memory image must survive reset");
}

#[test]
fn silence_and_aux_follow_the_waveform() {
    let mut awg = upload(|dev| {
        let segment = dev
            .build_segment(
                0,
                &[0.0, 2e-7, 4e-7],
                &[1.0, 2.0, 3.0],
                None,
                None,
                &WaveformOptions {
                    order: 1,
                    aux: true,
                    silence: true,
                    ..WaveformOptions::default()
                },
            )
            .expect("compiles");
        dev.write_channel(0, Some(&[Some(segment)])).expect("upload");
    });
    assert!(!awg.aux());

    let _ = trigger_and_collect(&mut awg, 80);
    // By the stop line the aux level is up and the DAC clock is muted
    assert!(awg.aux(), "aux follows the line headers");
    assert!(awg.silence(0), "silence lands on the stop line");
}
