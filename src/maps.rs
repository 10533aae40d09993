// maps.rs — 当前地图 + 资源轮换
//
// The active map is an `Arc`; readers clone it as a snapshot and a swap
// replaces the whole image at once.

use crate::equirect::{self, EquirectangularImage};
use crate::error::Result;
use crate::tessellate::BandColoring;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct MapLibrary {
    assets: Vec<PathBuf>,
    /// Asset shown right now; `None` while the placeholder is up.
    index: Option<usize>,
    active: Arc<EquirectangularImage>,
    active_name: String,
}

impl MapLibrary {
    /// Load the first asset eagerly; a failure here is fatal to startup.
    /// With no assets, fall back to a banded placeholder globe.
    pub fn open(assets: Vec<PathBuf>, placeholder_stacks: u32) -> Result<Self> {
        let (active, active_name, index) = match assets.first() {
            Some(path) => (equirect::load(path)?, display_name(path), Some(0)),
            None => (
                EquirectangularImage::banded(placeholder_stacks)?,
                "banded".to_string(),
                None,
            ),
        };
        Ok(Self {
            assets,
            index,
            active: Arc::new(active),
            active_name,
        })
    }

    pub fn active(&self) -> Arc<EquirectangularImage> {
        Arc::clone(&self.active)
    }

    pub fn active_name(&self) -> &str {
        &self.active_name
    }

    pub fn assets(&self) -> &[PathBuf] {
        &self.assets
    }

    /// Index of the active asset in [`MapLibrary::assets`].
    pub fn cursor(&self) -> Option<usize> {
        self.index
    }

    /// The placeholder is painted as solid stripes; real maps blend per vertex.
    pub fn coloring(&self) -> BandColoring {
        match self.index {
            Some(_) => BandColoring::PerVertex,
            None => BandColoring::PerBand,
        }
    }

    /// Asset after the active one (wrapping). `None` when there is nothing
    /// else to cycle to. The cursor only moves on [`MapLibrary::swap`].
    pub fn next_asset(&self) -> Option<PathBuf> {
        if self.assets.is_empty() {
            return None;
        }
        let next = self.index.map_or(0, |i| (i + 1) % self.assets.len());
        (Some(next) != self.index).then(|| self.assets[next].clone())
    }

    /// Register an asset (opened or dropped). Known paths are not duplicated.
    pub fn push_asset(&mut self, path: PathBuf) -> usize {
        match self.assets.iter().position(|p| *p == path) {
            Some(pos) => pos,
            None => {
                self.assets.push(path);
                self.assets.len() - 1
            }
        }
    }

    /// Make a loaded map active and move the cursor onto its asset.
    pub fn swap(&mut self, path: &Path, image: EquirectangularImage) {
        self.index = Some(self.push_asset(path.to_path_buf()));
        self.active = Arc::new(image);
        self.active_name = display_name(path);
    }
}

pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
