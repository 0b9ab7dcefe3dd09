use super::*;

fn probed(index: u32, kind: AssetKind, dims: Option<(u32, u32)>) -> Asset {
    let path = match kind {
        AssetKind::StaticImage => format!("images/illustration_{index:02}.png"),
        AssetKind::PrerenderedClip => format!("images/video_{index:02}.mp4"),
    };
    let mut asset = Asset::new(index, kind, path);
    asset.probed_width = dims.map(|d| d.0);
    asset.probed_height = dims.map(|d| d.1);
    asset
}

#[test]
fn clip_dimensions_win_over_earlier_images() {
    let assets = vec![
        probed(1, AssetKind::StaticImage, Some((1024, 1024))),
        probed(2, AssetKind::PrerenderedClip, None),
        probed(3, AssetKind::PrerenderedClip, Some((1920, 1080))),
    ];
    let r = resolve_canvas(&assets, false).unwrap();
    assert_eq!(r.canvas, Canvas::new(1920, 1080, 24).unwrap());
    assert!(matches!(r.source, CanvasSource::Clip { index: 3, .. }));
}

#[test]
fn first_image_is_used_without_clips() {
    let assets = vec![
        probed(1, AssetKind::StaticImage, None),
        probed(2, AssetKind::StaticImage, Some((1023, 767))),
        probed(3, AssetKind::StaticImage, Some((640, 480))),
    ];
    let r = resolve_canvas(&assets, false).unwrap();
    assert_eq!((r.canvas.width, r.canvas.height), (1022, 766));
    assert!(matches!(r.source, CanvasSource::Image { index: 2, .. }));
}

#[test]
fn fallback_is_lenient_unless_strict() {
    let assets = vec![probed(1, AssetKind::StaticImage, None)];
    let r = resolve_canvas(&assets, false).unwrap();
    assert_eq!(r.canvas, FALLBACK_CANVAS);
    assert_eq!(r.source, CanvasSource::Fallback);

    assert!(matches!(
        resolve_canvas(&assets, true),
        Err(StoryreelError::Validation(_))
    ));
}
