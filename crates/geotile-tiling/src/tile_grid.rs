//! The 3×3 resident tile set shared by the planar controllers.

use geotile_geo::{Projection, QuadKey};
use glam::DVec3;
use rustc_hash::FxHashMap;

use crate::{
    Delivery, ElevationType, MapDataProvider, NodeHandle, SceneGraph, Tile, TileChange, TileEvent,
    TileWarning, TilingError,
};

#[derive(Debug)]
pub(crate) struct TileGrid {
    root: NodeHandle,
    elevation_type: ElevationType,
    tiles: FxHashMap<QuadKey, Tile>,
    lod: Option<u8>,
}

impl TileGrid {
    pub fn new(root: NodeHandle, elevation_type: ElevationType) -> Self {
        Self {
            root,
            elevation_type,
            tiles: FxHashMap::default(),
            lod: None,
        }
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn lod(&self) -> Option<u8> {
        self.lod
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.values()
    }

    /// Make the resident set exactly the neighbourhood of `center`.
    ///
    /// Every eviction is issued before the first new tile is created.
    pub fn rebuild(
        &mut self,
        center: QuadKey,
        projection: &Projection,
        scene: &mut dyn SceneGraph,
        provider: &dyn MapDataProvider,
    ) -> Result<(TileChange, Vec<TileWarning>), TilingError> {
        let required = center.neighbourhood();

        let change = if self.lod != Some(center.lod) {
            tracing::debug!(
                from = ?self.lod,
                to = center.lod,
                center = %center,
                evicted = self.tiles.len(),
                "LOD changed, rebuilding tile grid"
            );
            for (_, mut tile) in self.tiles.drain() {
                tile.dispose(scene, provider);
            }
            self.lod = Some(center.lod);
            TileChange::Zoom { lod: center.lod }
        } else {
            let stale: Vec<QuadKey> = self
                .tiles
                .keys()
                .filter(|key| !required.contains(key))
                .copied()
                .collect();
            if stale.is_empty() && required.iter().all(|key| self.tiles.contains_key(key)) {
                return Ok((TileChange::None, Vec::new()));
            }
            tracing::trace!(center = %center, evicted = stale.len(), "Panning tile grid");
            for key in stale {
                if let Some(mut tile) = self.tiles.remove(&key) {
                    tile.dispose(scene, provider);
                }
            }
            TileChange::Pan
        };

        let mut warnings = Vec::new();
        for key in required {
            if self.tiles.contains_key(&key) {
                continue;
            }
            let mut tile = Tile::create(key, projection, self.elevation_type, self.root, scene, provider);
            let loaded = tile.load(provider);
            self.tiles.insert(key, tile);
            warnings.extend(loaded?);
        }
        Ok((change, warnings))
    }

    pub fn deliver(&mut self, event: TileEvent, scene: &mut dyn SceneGraph) -> Delivery {
        let id = event.tile();
        match self.tiles.values_mut().find(|tile| tile.id() == id) {
            Some(tile) => tile.apply(event, scene),
            None => {
                tracing::trace!(tile = %id, "Discarding result for evicted tile");
                Delivery::Discarded
            }
        }
    }

    /// Shift every placed tile by `offset`.
    pub fn translate(&self, offset: DVec3, scene: &mut dyn SceneGraph) {
        for tile in self.tiles.values() {
            scene.translate(tile.node(), offset);
        }
    }

    pub fn dispose(&mut self, scene: &mut dyn SceneGraph, provider: &dyn MapDataProvider) {
        for (_, mut tile) in self.tiles.drain() {
            tile.dispose(scene, provider);
        }
        self.lod = None;
    }
}
