use std::path::PathBuf;

use crate::{
    assets::scan::{Asset, AssetKind},
    foundation::{
        core::{Canvas, FALLBACK_CANVAS},
        error::{StoryreelError, StoryreelResult},
    },
};

/// Where the run's canvas dimensions came from.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum CanvasSource {
    /// First pre-rendered clip with known dimensions.
    Clip {
        /// Asset index.
        index: u32,
        /// Asset path.
        path: PathBuf,
    },
    /// First still image with known dimensions.
    Image {
        /// Asset index.
        index: u32,
        /// Asset path.
        path: PathBuf,
    },
    /// No probeable asset; the hard-coded default was used.
    Fallback,
}

/// The canvas chosen for a run, with its provenance.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct ResolvedCanvas {
    /// Canvas every rendered clip must conform to.
    pub canvas: Canvas,
    /// Provenance.
    pub source: CanvasSource,
}

/// Pick the run canvas: first clip with dimensions, then first image, then 1280x720.
///
/// With `strict`, the fallback is refused instead.
pub fn resolve_canvas(assets: &[Asset], strict: bool) -> StoryreelResult<ResolvedCanvas> {
    if let Some(asset) = first_with_dims(assets, AssetKind::PrerenderedClip)
        && let Some((w, h)) = asset.dimensions()
    {
        let canvas = Canvas::from_source_dims(w, h)?;
        tracing::info!(%canvas, asset = %asset.file_name(), "resolution from clip");
        return Ok(ResolvedCanvas {
            canvas,
            source: CanvasSource::Clip {
                index: asset.index,
                path: asset.path.clone(),
            },
        });
    }

    if let Some(asset) = first_with_dims(assets, AssetKind::StaticImage)
        && let Some((w, h)) = asset.dimensions()
    {
        let canvas = Canvas::from_source_dims(w, h)?;
        tracing::info!(%canvas, asset = %asset.file_name(), "resolution from image");
        return Ok(ResolvedCanvas {
            canvas,
            source: CanvasSource::Image {
                index: asset.index,
                path: asset.path.clone(),
            },
        });
    }

    if strict {
        return Err(StoryreelError::validation(
            "no asset reported usable dimensions and the fallback canvas is disabled",
        ));
    }
    tracing::warn!(canvas = %FALLBACK_CANVAS, "no probeable asset, using fallback resolution");
    Ok(ResolvedCanvas {
        canvas: FALLBACK_CANVAS,
        source: CanvasSource::Fallback,
    })
}

fn first_with_dims(assets: &[Asset], kind: AssetKind) -> Option<&Asset> {
    assets
        .iter()
        .find(|a| a.kind == kind && a.dimensions().is_some())
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/canvas.rs"]
mod tests;
