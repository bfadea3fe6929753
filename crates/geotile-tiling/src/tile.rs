//! A single resident tile and its lifecycle.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use geotile_geo::{Projection, QuadKey};
use glam::DVec3;
use rustc_hash::FxHashSet;

use crate::{
    CancellationToken, Delivery, ElevationType, MapDataProvider, NodeHandle, ProviderError,
    SceneGraph, TileContent, TileEvent, TileRequest, TileWarning, TilingError,
};

/// Id correlating a tile with its asynchronous results. Unique among the
/// tiles of one provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId(pub u64);

/// Allocates tile ids. Each provider owns one, so every controller sharing
/// that provider draws from the same sequence.
#[derive(Debug)]
pub struct TileIds(AtomicU64);

impl TileIds {
    pub fn new() -> Self {
        Self(AtomicU64::new(1))
    }

    /// A fresh id, never handed out by this allocator before.
    pub fn next(&self) -> TileId {
        TileId(self.0.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for TileIds {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A tile placed in the scene.
///
/// The projection and elevation type are captured at creation; content arriving
/// later is positioned relative to the tile's own anchor, so it stays correct
/// after the tile node has been shifted by a floating-origin recenter.
#[derive(Debug)]
pub struct Tile {
    id: TileId,
    quad_key: QuadKey,
    projection: Projection,
    elevation_type: ElevationType,
    node: NodeHandle,
    anchor: DVec3,
    emitted: FxHashSet<u64>,
    token: CancellationToken,
    disposed: bool,
    failed: bool,
    completed: bool,
}

impl Tile {
    /// Create the tile node under `parent`, placed at the projected tile center.
    pub fn create(
        quad_key: QuadKey,
        projection: &Projection,
        elevation_type: ElevationType,
        parent: NodeHandle,
        scene: &mut dyn SceneGraph,
        provider: &dyn MapDataProvider,
    ) -> Self {
        let center = quad_key.bounding_box().center();
        let elevation = match elevation_type {
            ElevationType::Flat => 0.0,
            ElevationType::Grid | ElevationType::Srtm => provider.elevation(center),
        };
        let anchor = projection.project(center, elevation);

        let node = scene.create_node(Some(parent), &quad_key.to_string());
        scene.set_local_position(node, anchor);

        Self {
            id: provider.next_tile_id(),
            quad_key,
            projection: projection.clone(),
            elevation_type,
            node,
            anchor,
            emitted: FxHashSet::default(),
            token: CancellationToken::new(),
            disposed: false,
            failed: false,
            completed: false,
        }
    }

    pub fn id(&self) -> TileId {
        self.id
    }

    pub fn quad_key(&self) -> QuadKey {
        self.quad_key
    }

    pub fn node(&self) -> NodeHandle {
        self.node
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn elevation_type(&self) -> ElevationType {
        self.elevation_type
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Number of distinct elements placed so far.
    pub fn element_count(&self) -> usize {
        self.emitted.len()
    }

    /// Submit the load request for this tile.
    ///
    /// Tiles the provider has no data for complete immediately. A rejected
    /// request marks the tile failed and is reported as a warning; only fatal
    /// provider errors are returned.
    pub fn load(
        &mut self,
        provider: &dyn MapDataProvider,
    ) -> Result<Option<TileWarning>, TilingError> {
        if !provider.has_data(&self.quad_key) {
            tracing::trace!(tile = %self.id, quad_key = %self.quad_key, "No data for tile");
            self.completed = true;
            return Ok(None);
        }
        let request = TileRequest {
            tile: self.id,
            quad_key: self.quad_key,
            elevation_type: self.elevation_type,
            token: self.token.clone(),
        };
        match provider.submit(request) {
            Ok(()) => Ok(None),
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => Ok(self.fail(ProviderError::Rejected(err.to_string()))),
        }
    }

    /// Apply one piece of content. Returns `true` if the scene changed.
    pub fn accept(&mut self, content: TileContent, scene: &mut dyn SceneGraph) -> bool {
        if self.disposed {
            return false;
        }
        match content {
            TileContent::Element(element) => {
                if !self.emitted.insert(element.id) {
                    return false;
                }
                let world = self.projection.project(element.coordinate, element.elevation);
                let node = scene.create_node(Some(self.node), &element.name);
                scene.set_local_position(node, world - self.anchor);
            }
            TileContent::Mesh { name } => {
                scene.create_node(Some(self.node), &name);
            }
        }
        true
    }

    /// Apply a provider event addressed to this tile.
    pub fn apply(&mut self, event: TileEvent, scene: &mut dyn SceneGraph) -> Delivery {
        if self.disposed {
            return Delivery::Discarded;
        }
        match event {
            TileEvent::Content { content, .. } => {
                if self.accept(content, scene) {
                    Delivery::Applied
                } else {
                    Delivery::Ignored
                }
            }
            TileEvent::Completed { .. } => {
                self.complete();
                Delivery::Applied
            }
            TileEvent::Failed { error, .. } => match self.fail(error) {
                Some(warning) => Delivery::Warning(warning),
                None => Delivery::Ignored,
            },
        }
    }

    pub fn complete(&mut self) {
        if !self.disposed {
            self.completed = true;
        }
    }

    /// Record a provider failure. Returns the warning only the first time.
    pub fn fail(&mut self, error: ProviderError) -> Option<TileWarning> {
        if self.disposed || self.failed {
            return None;
        }
        self.failed = true;
        tracing::warn!(tile = %self.id, quad_key = %self.quad_key, %error, "Tile failed to load");
        Some(TileWarning {
            tile: self.id,
            quad_key: self.quad_key,
            error,
        })
    }

    /// Cancel any pending load and remove the tile from the scene. Idempotent.
    pub fn dispose(&mut self, scene: &mut dyn SceneGraph, provider: &dyn MapDataProvider) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.token.cancel();
        provider.cancel(self.id);
        scene.destroy(self.node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SceneArena;
    use crate::testing::{ProviderCall, RecordingProvider};
    use crate::MapElement;
    use geotile_geo::GeoCoordinate;

    fn setup() -> (SceneArena, NodeHandle, RecordingProvider, Projection) {
        let mut scene = SceneArena::new();
        let root = scene.create_node(None, "root");
        let projection = Projection::scaled(
            Projection::cartesian(GeoCoordinate::new(52.53171, 13.38721)),
            0.01,
        );
        (scene, root, RecordingProvider::with_elevation(35.0), projection)
    }

    fn element(id: u64, coordinate: GeoCoordinate) -> TileContent {
        TileContent::Element(MapElement {
            id,
            name: format!("building-{id}"),
            coordinate,
            elevation: 0.0,
        })
    }

    #[test]
    fn test_tile_ids_are_unique() {
        let ids = TileIds::new();
        let a = ids.next();
        let b = ids.next();
        assert_eq!(a, TileId(1));
        assert!(b > a);
    }

    #[test]
    fn test_tile_ids_come_from_the_provider() {
        let (mut scene, root, provider, projection) = setup();
        let key = QuadKey::from_coordinate(GeoCoordinate::new(52.53171, 13.38721), 12);
        let first = Tile::create(key, &projection, ElevationType::Flat, root, &mut scene, &provider);
        let second = Tile::create(key, &projection, ElevationType::Flat, root, &mut scene, &provider);
        assert_eq!(first.id(), TileId(1));
        assert_eq!(second.id(), TileId(2));

        // Another provider keeps its own sequence.
        let other = RecordingProvider::new();
        let third = Tile::create(key, &projection, ElevationType::Flat, root, &mut scene, &other);
        assert_eq!(third.id(), TileId(1));
    }

    #[test]
    fn test_create_places_node_at_projected_center() {
        let (mut scene, root, provider, projection) = setup();
        let key = QuadKey::from_coordinate(GeoCoordinate::new(52.53171, 13.38721), 12);
        let tile = Tile::create(key, &projection, ElevationType::Grid, root, &mut scene, &provider);

        let expected = projection.project(key.bounding_box().center(), 35.0);
        assert_eq!(scene.local_position(tile.node()), expected);
        assert_eq!(scene.parent(tile.node()), Some(root));
        assert_eq!(scene.name(tile.node()), Some(key.to_string().as_str()));
    }

    #[test]
    fn test_flat_tile_ignores_elevation() {
        let (mut scene, root, provider, projection) = setup();
        let key = QuadKey::new(275, 167, 9);
        let tile = Tile::create(key, &projection, ElevationType::Flat, root, &mut scene, &provider);
        assert_eq!(scene.local_position(tile.node()).y, 0.0);
    }

    #[test]
    fn test_duplicate_elements_are_ignored() {
        let (mut scene, root, provider, projection) = setup();
        let key = QuadKey::new(275, 167, 9);
        let mut tile = Tile::create(key, &projection, ElevationType::Flat, root, &mut scene, &provider);
        let center = key.bounding_box().center();

        assert!(tile.accept(element(7, center), &mut scene));
        assert!(!tile.accept(element(7, center), &mut scene));
        assert!(tile.accept(element(8, center), &mut scene));
        assert_eq!(tile.element_count(), 2);
        assert_eq!(scene.children(tile.node()).len(), 2);
    }

    #[test]
    fn test_dispose_is_idempotent_and_cancels() {
        let (mut scene, root, provider, projection) = setup();
        let mut tile = Tile::create(
            QuadKey::new(275, 167, 9),
            &projection,
            ElevationType::Flat,
            root,
            &mut scene,
            &provider,
        );
        tile.load(&provider).unwrap();
        let token = provider.requests()[0].token.clone();

        tile.dispose(&mut scene, &provider);
        tile.dispose(&mut scene, &provider);

        assert!(token.is_cancelled());
        assert!(!scene.contains(tile.node()));
        let cancels = provider
            .calls()
            .iter()
            .filter(|c| matches!(c, ProviderCall::Cancel { .. }))
            .count();
        assert_eq!(cancels, 1);
    }

    #[test]
    fn test_disposed_tile_does_not_touch_scene() {
        let (mut scene, root, provider, projection) = setup();
        let key = QuadKey::new(275, 167, 9);
        let mut tile = Tile::create(key, &projection, ElevationType::Flat, root, &mut scene, &provider);
        tile.dispose(&mut scene, &provider);
        let before = scene.mutation_count();

        let event = TileEvent::Content {
            tile: tile.id(),
            content: element(1, key.bounding_box().center()),
        };
        assert_eq!(tile.apply(event, &mut scene), Delivery::Discarded);
        assert_eq!(scene.mutation_count(), before);
    }

    #[test]
    fn test_failure_is_reported_once() {
        let (mut scene, root, provider, projection) = setup();
        let mut tile = Tile::create(
            QuadKey::new(275, 167, 9),
            &projection,
            ElevationType::Flat,
            root,
            &mut scene,
            &provider,
        );
        let failed = |tile: &Tile| TileEvent::Failed {
            tile: tile.id(),
            error: ProviderError::Load("timeout".into()),
        };

        let first = tile.apply(failed(&tile), &mut scene);
        assert!(matches!(first, Delivery::Warning(ref w) if w.tile == tile.id()));
        assert_eq!(tile.apply(failed(&tile), &mut scene), Delivery::Ignored);
        assert!(tile.is_failed());
    }

    #[test]
    fn test_fatal_submit_error_is_returned() {
        let (mut scene, root, provider, projection) = setup();
        let mut tile = Tile::create(
            QuadKey::new(275, 167, 9),
            &projection,
            ElevationType::Flat,
            root,
            &mut scene,
            &provider,
        );
        provider.disconnect();
        assert!(matches!(
            tile.load(&provider),
            Err(TilingError::ProviderDisconnected)
        ));
    }
}
