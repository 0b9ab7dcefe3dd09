use std::sync::Arc;

use super::*;
use crate::{
    config::RunConfig,
    foundation::core::Canvas,
    test_support::{FakeEncoder, FakeProber, write_media},
};

fn clip(dir: &Path, slot_index: usize, secs: f64) -> RenderedClip {
    let path = dir.join(format!("slot_{slot_index:04}.mp4"));
    write_media(&path, &secs.to_string());
    RenderedClip {
        slot_index,
        path,
        allocated_duration: secs,
        actual_duration: secs,
        mismatch: None,
    }
}

#[test]
fn concat_paths_escape_single_quotes() {
    assert_eq!(
        escape_concat_path(Path::new("/tmp/it's here/a.mp4")),
        r"'/tmp/it'\''s here/a.mp4'"
    );
    assert_eq!(escape_concat_path(Path::new("/plain.mp4")), "'/plain.mp4'");
}

#[test]
fn manifest_lists_absolute_paths_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let list = dir.path().join("list.txt");
    write_concat_manifest(
        &list,
        &[PathBuf::from("relative/b.mp4"), dir.path().join("a.mp4")],
    )
    .unwrap();

    let body = std::fs::read_to_string(&list).unwrap();
    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines.iter().all(|l| l.starts_with("file '/")));
    assert!(lines[0].ends_with("relative/b.mp4'"));
    assert!(lines[1].ends_with("a.mp4'"));

    assert!(matches!(
        write_concat_manifest(&list, &[]),
        Err(StoryreelError::Validation(_))
    ));
}

#[test]
fn mismatch_only_beyond_tolerance() {
    assert_eq!(DurationMismatch::check("final video", 45.3, 45.6, 0.5), None);
    let m = DurationMismatch::check("final video", 45.3, 46.0, 0.5).unwrap();
    assert!((m.delta - 0.7).abs() < 1e-9);
    assert_eq!(m.tolerance, 0.5);
}

#[test]
fn pre_mux_reconciliation_sums_rendered_clips() {
    let dir = tempfile::tempdir().unwrap();
    let audio = AudioTrack::new("audio.mp3", 30.0).unwrap();
    let clips = vec![clip(dir.path(), 0, 10.0), clip(dir.path(), 1, 19.0)];
    let (total, mismatch) = reconcile_rendered(&clips, &audio, 0.5);
    assert_eq!(total, 29.0);
    assert!(mismatch.is_some());
}

#[test]
fn assemble_concatenates_in_slot_order_and_reconciles() {
    let dir = tempfile::tempdir().unwrap();
    let encoder = Arc::new(FakeEncoder::default());
    let ctx = RunContext::new(
        dir.path(),
        Canvas::new(1280, 720, 24).unwrap(),
        &RunConfig::new(dir.path()),
        Arc::new(FakeProber::default()),
        encoder.clone(),
    )
    .unwrap();
    let audio_path = dir.path().join("audio.mp3");
    write_media(&audio_path, "30");
    let audio = AudioTrack::new(&audio_path, 30.0).unwrap();

    let clips = vec![
        clip(dir.path(), 2, 10.0),
        clip(dir.path(), 0, 10.0),
        clip(dir.path(), 1, 10.0),
    ];
    let out = assemble(&ctx, &clips, &audio).unwrap();
    assert_eq!(out.path, ctx.workspace().join("final.mp4"));
    assert!((out.duration - 30.0).abs() < 1e-9);
    assert!(out.mismatch.is_none());

    let list = std::fs::read_to_string(ctx.workspace().join("concat.txt")).unwrap();
    let order: Vec<&str> = list
        .lines()
        .map(|l| &l[l.len() - "slot_0000.mp4'".len()..l.len() - 1])
        .collect();
    assert_eq!(order, ["slot_0000.mp4", "slot_0001.mp4", "slot_0002.mp4"]);

    let args = encoder.args_for(&EncodeStage::Assemble);
    assert!(args.windows(2).any(|w| w == ["-map", "0:v:0"]));
    assert!(args.windows(2).any(|w| w == ["-map", "1:a:0"]));
    assert!(args.windows(2).any(|w| w == ["-c:a", "aac"]));
}

#[test]
fn final_delta_beyond_tolerance_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = RunContext::new(
        dir.path(),
        Canvas::new(1280, 720, 24).unwrap(),
        &RunConfig::new(dir.path()),
        Arc::new(FakeProber::default()),
        Arc::new(FakeEncoder::default()),
    )
    .unwrap();
    let audio = AudioTrack::new(dir.path().join("audio.mp3"), 45.3).unwrap();
    let clips = vec![clip(dir.path(), 0, 44.0)];

    let out = assemble(&ctx, &clips, &audio).unwrap();
    assert!((out.delta + 1.3).abs() < 1e-9);
    assert_eq!(out.mismatch.unwrap().subject, "final video");
}
