use std::path::Path;

use crate::{
    assets::scan::Asset,
    foundation::error::{StoryreelError, StoryreelResult},
};

/// File name of the optional manifest in the working directory.
pub const MANIFEST_FILE: &str = "illustrations.json";

/// Upstream description of the intended slides. Only `index` and `title` are read; the rest of the
/// document (prompts, metadata) is ignored.
#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize)]
pub struct IllustrationManifest {
    /// One entry per planned illustration.
    #[serde(default)]
    pub illustrations: Vec<ManifestEntry>,
}

/// One planned illustration.
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
pub struct ManifestEntry {
    /// Slot index, matching the `<NN>` in asset file names.
    pub index: Option<u32>,
    /// Human-readable title.
    #[serde(default)]
    pub title: Option<String>,
}

impl IllustrationManifest {
    /// Load the manifest; a missing file yields `None`, a malformed one is an error.
    pub fn load(path: &Path) -> StoryreelResult<Option<Self>> {
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("read manifest '{}'", path.display()))
                    .into());
            }
        };
        Self::from_json(&bytes).map(Some)
    }

    /// Parse manifest JSON.
    pub fn from_json(bytes: &[u8]) -> StoryreelResult<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| StoryreelError::validation(format!("invalid illustrations manifest: {e}")))
    }

    /// Title recorded for `index`, if any.
    pub fn title_for(&self, index: u32) -> Option<&str> {
        self.illustrations
            .iter()
            .find(|e| e.index == Some(index))
            .and_then(|e| e.title.as_deref())
    }

    /// Attach titles to `assets`; returns manifest indices that have no matching asset.
    pub fn apply(&self, assets: &mut [Asset]) -> Vec<u32> {
        for asset in assets.iter_mut() {
            if let Some(title) = self.title_for(asset.index) {
                asset.title = Some(title.to_string());
            }
        }
        let mut orphaned: Vec<u32> = self
            .illustrations
            .iter()
            .filter_map(|e| e.index)
            .filter(|idx| !assets.iter().any(|a| a.index == *idx))
            .collect();
        orphaned.sort_unstable();
        orphaned.dedup();
        orphaned
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/manifest.rs"]
mod tests;
