use super::*;

fn assert_sum(durations: &[f64], total: f64) {
    let sum: f64 = durations.iter().sum();
    assert!((sum - total).abs() < 1e-6, "sum {sum} != {total}");
    assert!(durations.iter().all(|d| *d > 0.0), "non-positive slot in {durations:?}");
}

#[test]
fn even_split_without_holds() {
    assert_eq!(allocate(3, 30.0, 0.0, 0.0).unwrap(), vec![10.0, 10.0, 10.0]);
}

#[test]
fn holds_pin_first_and_last_slots() {
    assert_eq!(allocate(3, 30.0, 3.0, 2.0).unwrap(), vec![3.0, 25.0, 2.0]);

    let intro_only = allocate(4, 31.0, 4.0, 0.0).unwrap();
    assert_eq!(intro_only, vec![4.0, 9.0, 9.0, 9.0]);

    let outro_only = allocate(3, 10.0, 0.0, 2.0).unwrap();
    assert_eq!(outro_only, vec![4.0, 4.0, 2.0]);
}

#[test]
fn single_slot_takes_everything() {
    for (intro, outro) in [(0.0, 0.0), (1.0, 0.0), (2.0, 3.0)] {
        assert_eq!(allocate(1, 12.5, intro, outro).unwrap(), vec![12.5]);
    }
}

#[test]
fn two_slots_with_both_holds_share_the_residual() {
    let d = allocate(2, 10.0, 3.0, 2.0).unwrap();
    assert_eq!(d, vec![5.5, 4.5]);
}

#[test]
fn sum_invariant_holds_across_shapes() {
    for n in 1..=17 {
        for &(audio, intro, outro) in &[
            (45.3, 0.0, 0.0),
            (45.3, 3.0, 0.0),
            (45.3, 0.0, 2.5),
            (45.3, 3.0, 2.5),
            (7.0 / 3.0, 0.1, 0.2),
        ] {
            let d = allocate(n, audio, intro, outro).unwrap();
            assert_eq!(d.len(), n);
            assert_sum(&d, audio);
        }
    }
}

#[test]
fn infeasible_holds_fail_for_every_count() {
    for n in 1..=5 {
        assert!(matches!(
            allocate(n, 10.0, 6.0, 4.0),
            Err(StoryreelError::Allocation(_))
        ));
        assert!(allocate(n, 10.0, 11.0, 0.0).is_err());
    }
}

#[test]
fn rejects_empty_and_invalid_inputs() {
    assert!(matches!(
        allocate(0, 10.0, 0.0, 0.0),
        Err(StoryreelError::Allocation(_))
    ));
    assert!(allocate(2, 0.0, 0.0, 0.0).is_err());
    assert!(allocate(2, 10.0, -1.0, 0.0).is_err());
    assert!(allocate(2, 10.0, 0.0, f64::NAN).is_err());
}

#[test]
fn fade_is_clamped_to_forty_percent_of_shortest_slot() {
    assert_eq!(clamp_fade(0.5, &[10.0, 10.0]), 0.5);
    let clamped = clamp_fade(2.0, &[3.0, 25.0, 1.0]);
    assert!((clamped - 0.4).abs() < 1e-12);
    assert_eq!(clamp_fade(-1.0, &[5.0]), 0.0);

    for durations in [vec![0.2, 9.8], vec![1.5, 1.5, 1.5], allocate(5, 13.0, 0.5, 0.0).unwrap()] {
        let shortest = durations.iter().copied().fold(f64::INFINITY, f64::min);
        assert!(clamp_fade(10.0, &durations) <= MAX_FADE_FRACTION * shortest + 1e-12);
    }
}

#[test]
fn frame_spans_sum_to_the_audio_frame_count() {
    let durations = allocate(30, 45.3, 0.0, 0.0).unwrap();
    let spans = frame_spans(&durations, 24);
    assert_eq!(spans.len(), 30);
    assert_eq!(spans.iter().sum::<u64>(), (45.3f64 * 24.0).round() as u64);
    for (span, d) in spans.iter().zip(&durations) {
        assert!((*span as f64 / 24.0 - d).abs() <= 1.0 / 24.0, "{span} frames for {d}s");
    }
    let video_sec = spans.iter().sum::<u64>() as f64 / 24.0;
    assert!((video_sec - 45.3).abs() <= 0.5 / 24.0 + 1e-9);
}

#[test]
fn frame_spans_follow_holds_and_never_drop_a_slot() {
    let spans = frame_spans(&allocate(3, 30.0, 3.0, 2.0).unwrap(), 24);
    assert_eq!(spans, vec![72, 600, 48]);

    let tiny = frame_spans(&[0.01, 0.01, 10.0], 24);
    assert!(tiny.iter().all(|f| *f >= 1));
    assert_eq!(tiny, vec![1, 1, 238]);
}
