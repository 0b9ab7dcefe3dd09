use std::sync::Arc;

use super::*;
use crate::{
    assets::scan::Asset,
    config::RunConfig,
    test_support::{FakeEncoder, FakeProber, write_media},
};

fn canvas() -> Canvas {
    Canvas::new(1280, 720, 24).unwrap()
}

fn slot(position: usize, asset: Asset, allocated: f64, fade: f64) -> Slot {
    let fade_in = match asset.kind {
        AssetKind::StaticImage => fade,
        AssetKind::PrerenderedClip => 0.0,
    };
    Slot {
        position,
        motion: None,
        asset,
        allocated_duration: allocated,
        frames: ((allocated * 24.0).round() as u64).max(1),
        fade_in,
        fade_out: fade,
    }
}

fn clip_asset(path: &Path, duration: f64) -> Asset {
    write_media(path, &format!("{duration} 1280x720"));
    let mut a = Asset::new(1, AssetKind::PrerenderedClip, path);
    a.probed_duration = Some(duration);
    a.probed_width = Some(1280);
    a.probed_height = Some(720);
    a
}

fn context(dir: &Path, encoder: Arc<FakeEncoder>) -> RunContext {
    RunContext::new(
        dir,
        canvas(),
        &RunConfig::new(dir),
        Arc::new(FakeProber::default()),
        encoder,
    )
    .unwrap()
}

#[test]
fn branch_selection_is_trim_iff_clip_covers_slot() {
    assert_eq!(select_clip_strategy(10.0, 10.0), ClipStrategy::Trim);
    assert_eq!(select_clip_strategy(12.0, 10.0), ClipStrategy::Trim);
    assert_eq!(
        select_clip_strategy(4.0, 10.0),
        ClipStrategy::Loop { repeats: 4 }
    );
    assert_eq!(
        select_clip_strategy(3.0, 9.0),
        ClipStrategy::Loop { repeats: 5 }
    );
    assert!(matches!(
        select_clip_strategy(9.999, 10.0),
        ClipStrategy::Loop { .. }
    ));
}

#[test]
fn fit_within_keeps_aspect_and_even_sizes() {
    let c = canvas();
    assert_eq!(fit_within(1024, 1024, &c), (720, 720));
    assert_eq!(fit_within(1920, 1080, &c), (1280, 720));
    assert_eq!(fit_within(1000, 3000, &c), (240, 720));
    assert_eq!(fit_within(1279, 721, &c), (1276, 720));
}

#[test]
fn motion_policy_only_moves_still_images() {
    assert_eq!(
        motion_for(0, AssetKind::StaticImage, true),
        Some(ZoomDirection::In)
    );
    assert_eq!(
        motion_for(3, AssetKind::StaticImage, true),
        Some(ZoomDirection::Out)
    );
    assert_eq!(motion_for(0, AssetKind::StaticImage, false), None);
    assert_eq!(motion_for(0, AssetKind::PrerenderedClip, true), None);
}

#[test]
fn still_without_motion_loops_and_letterboxes() {
    let mut asset = Asset::new(1, AssetKind::StaticImage, "/in/illustration_01.png");
    asset.probed_width = Some(1024);
    asset.probed_height = Some(1024);
    let s = slot(0, asset, 10.0, 0.5);
    let cmd = still_command(
        &s,
        &canvas(),
        &EncodeSettings::default(),
        1.16,
        Path::new("/ws/slot_0000.mp4"),
    )
    .unwrap();

    assert!(matches!(cmd.inputs()[0], Input::LoopedStill { framerate: 24, .. }));
    assert_eq!(
        cmd.filter_chain().unwrap(),
        "scale=720:720,pad=1280:720:(ow-iw)/2:(oh-ih)/2,setsar=1,fade=t=in:st=0:d=0.5,fade=t=out:st=9.5:d=0.5"
    );
    assert_eq!(cmd.output_frames(), Some(240));
    assert_eq!(cmd.output_duration(), Some(10.0));
}

#[test]
fn still_with_motion_decodes_once_and_zooms() {
    let asset = Asset::new(2, AssetKind::StaticImage, "/in/illustration_02.png");
    let mut s = slot(1, asset, 10.0, 0.0);
    s.motion = Some(ZoomDirection::Out);
    let cmd = still_command(
        &s,
        &canvas(),
        &EncodeSettings::default(),
        1.16,
        Path::new("/ws/slot_0001.mp4"),
    )
    .unwrap();

    assert!(matches!(cmd.inputs()[0], Input::File(_)));
    let chain = cmd.filter_chain().unwrap();
    assert!(chain.starts_with("scale=1280:720:force_original_aspect_ratio=decrease,pad="));
    assert!(chain.contains("zoompan=z='1.160000-(0.160000)*min(on/239,1)'"));
    assert!(chain.ends_with(":d=240:s=1280x720:fps=24,setsar=1"));
    assert_eq!(cmd.output_frames(), Some(240));
    assert!(!chain.contains("fade"));
}

#[test]
fn single_frame_still_falls_back_to_static_render() {
    let asset = Asset::new(1, AssetKind::StaticImage, "/in/illustration_01.png");
    let mut s = slot(0, asset, 0.03, 0.0);
    s.motion = Some(ZoomDirection::In);
    let cmd = still_command(
        &s,
        &canvas(),
        &EncodeSettings::default(),
        1.16,
        Path::new("/ws/slot_0000.mp4"),
    )
    .unwrap();
    assert!(matches!(cmd.inputs()[0], Input::LoopedStill { .. }));
    assert!(!cmd.filter_chain().unwrap().contains("zoompan"));
}

#[test]
fn short_clip_takes_the_loop_path_and_hits_its_allocation() {
    let dir = tempfile::tempdir().unwrap();
    let encoder = Arc::new(FakeEncoder::default());
    let ctx = context(dir.path(), encoder.clone());
    let asset = clip_asset(&dir.path().join("video_01.mp4"), 4.0);
    let s = slot(0, asset.clone(), 10.0, 0.5);

    let rendered = render_slot(&ctx, &s, 1).unwrap();
    assert!((rendered.actual_duration - 10.0).abs() <= 0.1);
    assert_eq!(rendered.mismatch, None);
    assert_eq!(rendered.slot_index, 0);

    let repeat_stage = EncodeStage::Repeat {
        slot: 0,
        asset: asset.path.clone(),
    };
    let slide_stage = EncodeStage::Slide {
        slot: 0,
        asset: asset.path.clone(),
    };
    assert_eq!(encoder.invocations.lock().unwrap().len(), 2);

    let repeat_args = encoder.args_for(&repeat_stage);
    assert!(repeat_args.windows(2).any(|w| w == ["-f", "concat"]));
    assert!(repeat_args.windows(2).any(|w| w == ["-c:v", "copy"]));
    let list = std::fs::read_to_string(ctx.workspace().join("repeat_0000.txt")).unwrap();
    assert_eq!(list.lines().count(), 4);

    let slide_args = encoder.args_for(&slide_stage);
    let input = slide_args[slide_args.iter().position(|a| a == "-i").unwrap() + 1].clone();
    assert!(input.ends_with("repeat_0000.mp4"));
    let vf = &slide_args[slide_args.iter().position(|a| a == "-vf").unwrap() + 1];
    assert!(vf.contains("fade=t=out:st=9.5:d=0.5"));
    assert!(!vf.contains("fade=t=in"));
}

#[test]
fn long_clip_is_trimmed_in_one_pass() {
    let dir = tempfile::tempdir().unwrap();
    let encoder = Arc::new(FakeEncoder::default());
    let ctx = context(dir.path(), encoder.clone());
    let asset = clip_asset(&dir.path().join("video_01.mp4"), 12.0);
    let s = slot(0, asset.clone(), 10.0, 0.5);

    render_slot(&ctx, &s, 3).unwrap();
    let stages = encoder.stages();
    assert_eq!(
        stages,
        vec![EncodeStage::Slide {
            slot: 0,
            asset: asset.path
        }]
    );
    let invocations = encoder.invocations.lock().unwrap();
    let args = &invocations[0].args;
    assert!(args.windows(2).any(|w| w == ["-frames:v", "240"]));
    assert!(args.iter().any(|a| a == "-an"));
}

#[test]
fn duration_drift_is_recorded_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let encoder = Arc::new(FakeEncoder {
        drift_sec: 0.3,
        ..FakeEncoder::default()
    });
    let ctx = context(dir.path(), encoder);
    write_media(&dir.path().join("illustration_01.png"), "640x480");
    let asset = Asset::new(1, AssetKind::StaticImage, dir.path().join("illustration_01.png"));
    let s = slot(0, asset, 5.0, 0.5);

    let rendered = render_slot(&ctx, &s, 1).unwrap();
    let mismatch = rendered.mismatch.unwrap();
    assert_eq!(mismatch.subject, "slot 0");
    assert!((mismatch.delta - 0.3).abs() < 1e-9);
}

#[test]
fn encoder_failure_names_the_slot() {
    let dir = tempfile::tempdir().unwrap();
    let asset = clip_asset(&dir.path().join("video_03.mp4"), 12.0);
    let stage = EncodeStage::Slide {
        slot: 2,
        asset: asset.path.clone(),
    };
    let encoder = Arc::new(FakeEncoder {
        fail_stage: Some(stage.clone()),
        ..FakeEncoder::default()
    });
    let ctx = context(dir.path(), encoder);
    let err = render_slot(&ctx, &slot(2, asset, 10.0, 0.0), 3).unwrap_err();
    match err {
        StoryreelError::Encode { stage: s, .. } => assert_eq!(s, stage),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn every_branch_ends_with_square_pixels_on_odd_aspect_canvases() {
    let canvas = Canvas::new(1278, 720, 24).unwrap();
    let settings = EncodeSettings::default();
    let mut image = Asset::new(1, AssetKind::StaticImage, "/in/illustration_01.png");
    image.probed_width = Some(1279);
    image.probed_height = Some(721);

    let still = slot(0, image.clone(), 4.0, 0.0);
    let mut moving = slot(0, image, 4.0, 0.0);
    moving.motion = Some(ZoomDirection::In);
    let clip = slot(1, Asset::new(2, AssetKind::PrerenderedClip, "/in/video_02.mp4"), 4.0, 0.0);

    let chains = [
        still_command(&still, &canvas, &settings, 1.16, Path::new("/ws/a.mp4")).unwrap(),
        still_command(&moving, &canvas, &settings, 1.16, Path::new("/ws/b.mp4")).unwrap(),
        clip_command(&clip, Path::new("/in/video_02.mp4"), &canvas, &settings, Path::new("/ws/c.mp4")),
    ]
    .map(|cmd| cmd.filter_chain().unwrap());
    for chain in &chains {
        assert!(chain.ends_with("setsar=1"), "{chain}");
        assert_eq!(chain.matches("setsar").count(), 1, "{chain}");
    }
    assert!(chains[0].contains(",pad=1278:720:"));
}

#[test]
fn frame_budget_sets_the_fade_out_start() {
    let asset = Asset::new(1, AssetKind::StaticImage, "/in/illustration_01.png");
    let mut s = slot(0, asset, 1.51, 0.5);
    s.frames = 37;
    let cmd = still_command(
        &s,
        &canvas(),
        &EncodeSettings::default(),
        1.16,
        Path::new("/ws/slot_0000.mp4"),
    )
    .unwrap();
    let args: Vec<String> = cmd
        .to_args()
        .unwrap()
        .into_iter()
        .map(|a| a.to_string_lossy().into_owned())
        .collect();
    assert!(args.windows(2).any(|w| w == ["-frames:v", "37"]));
    assert!(!args.iter().any(|a| a == "-t"));
    assert!(cmd.filter_chain().unwrap().contains("fade=t=out:st=1.041667:d=0.5"));
}

#[test]
fn clips_shorter_than_a_frame_are_rejected_before_looping() {
    let dir = tempfile::tempdir().unwrap();
    let encoder = Arc::new(FakeEncoder::default());
    let ctx = context(dir.path(), encoder.clone());
    let asset = clip_asset(&dir.path().join("video_01.mp4"), 0.001);

    let err = render_slot(&ctx, &slot(0, asset, 10.0, 0.0), 1).unwrap_err();
    assert!(matches!(err, StoryreelError::Probe { .. }));
    assert!(encoder.invocations.lock().unwrap().is_empty());
    assert!(!ctx.workspace().join("repeat_0000.txt").exists());
}
