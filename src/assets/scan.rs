use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use anyhow::Context as _;

use crate::{
    assets::media::{MediaInfo, MediaProber},
    foundation::error::{StoryreelError, StoryreelResult},
};

/// File-name prefix of still images: `illustration_<NN>.png`.
pub const IMAGE_PREFIX: &str = "illustration_";
/// File-name prefix of pre-rendered clips: `video_<NN>.mp4`.
pub const CLIP_PREFIX: &str = "video_";

/// What backs a slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    /// Still image, animated or letterboxed by the renderer.
    StaticImage,
    /// Short motion clip, trimmed or looped by the renderer.
    PrerenderedClip,
}

/// One visual input, ordered by its index.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Asset {
    /// Slot index parsed from the file name.
    pub index: u32,
    /// Image or clip.
    pub kind: AssetKind,
    /// Source file.
    pub path: PathBuf,
    /// Optional title from the illustrations manifest.
    pub title: Option<String>,
    /// Probed duration (clips).
    pub probed_duration: Option<f64>,
    /// Probed width.
    pub probed_width: Option<u32>,
    /// Probed height.
    pub probed_height: Option<u32>,
    /// Whether the file carries its own audio stream.
    pub has_audio: bool,
}

impl Asset {
    /// Unprobed asset.
    pub fn new(index: u32, kind: AssetKind, path: impl Into<PathBuf>) -> Self {
        Self {
            index,
            kind,
            path: path.into(),
            title: None,
            probed_duration: None,
            probed_width: None,
            probed_height: None,
            has_audio: false,
        }
    }

    /// Copy of this asset with probe facts applied.
    pub fn with_probe(mut self, info: &MediaInfo) -> Self {
        self.probed_duration = info.duration_sec;
        self.probed_width = info.width;
        self.probed_height = info.height;
        self.has_audio = info.has_audio;
        self
    }

    /// `(width, height)` when both were probed and are non-zero.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match (self.probed_width, self.probed_height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some((w, h)),
            _ => None,
        }
    }

    /// File name for log lines.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Parse a file name against the naming convention.
///
/// The index part must be all ASCII digits; anything else is not an asset.
pub fn parse_asset_name(file_name: &str) -> Option<(u32, AssetKind)> {
    let (stem, kind) = if let Some(stem) = file_name
        .strip_prefix(IMAGE_PREFIX)
        .and_then(|rest| rest.strip_suffix(".png"))
    {
        (stem, AssetKind::StaticImage)
    } else if let Some(stem) = file_name
        .strip_prefix(CLIP_PREFIX)
        .and_then(|rest| rest.strip_suffix(".mp4"))
    {
        (stem, AssetKind::PrerenderedClip)
    } else {
        return None;
    };

    if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    stem.parse::<u32>().ok().map(|index| (index, kind))
}

/// Scan `dir` for assets, one per index, sorted by index. A clip wins over an image sharing its index.
#[tracing::instrument]
pub fn scan_assets(dir: &Path) -> StoryreelResult<Vec<Asset>> {
    if !dir.is_dir() {
        return Err(StoryreelError::validation(format!(
            "asset directory '{}' does not exist",
            dir.display()
        )));
    }

    let mut by_index: BTreeMap<u32, Asset> = BTreeMap::new();
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("read asset dir '{}'", dir.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("read entry in '{}'", dir.display()))?;
        let name = entry.file_name();
        let Some((index, kind)) = name.to_str().and_then(parse_asset_name) else {
            continue;
        };
        if !entry.path().is_file() {
            continue;
        }

        let candidate = Asset::new(index, kind, entry.path());
        let replace = match by_index.get(&index) {
            None => true,
            Some(existing) => {
                kind > existing.kind || (kind == existing.kind && candidate.path < existing.path)
            }
        };
        if replace {
            by_index.insert(index, candidate);
        }
    }

    let assets: Vec<Asset> = by_index.into_values().collect();
    let clips = assets
        .iter()
        .filter(|a| a.kind == AssetKind::PrerenderedClip)
        .count();
    tracing::info!(
        total = assets.len(),
        clips,
        images = assets.len() - clips,
        "scanned assets"
    );
    Ok(assets)
}

/// Probe every asset. Clip probe failures (and clips without a duration) are fatal; image probe
/// failures only leave the dimensions unknown.
pub fn probe_assets(assets: Vec<Asset>, prober: &dyn MediaProber) -> StoryreelResult<Vec<Asset>> {
    assets
        .into_iter()
        .map(|asset| match asset.kind {
            AssetKind::PrerenderedClip => {
                let info = prober.probe(&asset.path)?;
                info.require_duration(&asset.path)?;
                Ok(asset.with_probe(&info))
            }
            AssetKind::StaticImage => match prober.probe(&asset.path) {
                Ok(info) => Ok(asset.with_probe(&info)),
                Err(err) => {
                    tracing::warn!(
                        asset = %asset.path.display(),
                        "image probe failed, dimensions unknown: {err}"
                    );
                    Ok(asset)
                }
            },
        })
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/assets/scan.rs"]
mod tests;
