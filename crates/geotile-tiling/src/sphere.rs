//! Orbit controller: a quad-tree of tiles wrapped around a sphere.
//!
//! The whole planet is always covered. Only the branch under the viewer is
//! refined; every other branch is collapsed back to a single tile as soon as
//! the viewer leaves it.

use geotile_geo::{GeoCoordinate, Projection, QuadKey, coordinate_from_euler};
use geotile_lod::{LodIntervalTree, LodRange, sphere_tree};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::{
    Delivery, ElevationType, MapDataProvider, NodeHandle, SceneGraph, Tile, TileChange, TileEvent,
    TileSetManager, TileWarning, TilingError, UpdateOutcome, ViewerState,
};

/// Configuration of a [`SphereController`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SphereSettings {
    pub lod_range: LodRange,
    /// Sphere radius in world units.
    pub radius: f64,
    pub elevation_type: ElevationType,
    /// Orientation change in degrees below which an update is skipped.
    pub rotation_sensitivity: f64,
    /// Distance change in world units below which an update is skipped.
    pub height_sensitivity: f64,
}

impl Default for SphereSettings {
    fn default() -> Self {
        Self {
            lod_range: LodRange::new(1, 8),
            radius: 6371.0,
            elevation_type: ElevationType::Flat,
            rotation_sensitivity: 0.5,
            height_sensitivity: 10.0,
        }
    }
}

#[derive(Debug)]
enum Slot {
    /// Split into four children; holds no content of its own.
    Placeholder,
    Tile(Tile),
}

/// Arena entry: the placement node for a quadkey and what it currently holds.
#[derive(Debug)]
struct SphereNode {
    handle: NodeHandle,
    slot: Slot,
}

#[derive(Debug, Default)]
struct Work {
    created: usize,
    warnings: Vec<TileWarning>,
}

/// Tile quad-tree for the orbit view.
#[derive(Debug)]
pub struct SphereController {
    settings: SphereSettings,
    root: NodeHandle,
    projection: Projection,
    tree: LodIntervalTree,
    nodes: FxHashMap<QuadKey, SphereNode>,
    last: Option<(glam::DVec3, f64)>,
    zoom: f64,
    lod: Option<u8>,
}

/// Largest per-axis difference between two sets of Euler angles, in degrees.
fn angle_delta(a: glam::DVec3, b: glam::DVec3) -> f64 {
    let wrap = |d: f64| ((d + 180.0).rem_euclid(360.0) - 180.0).abs();
    wrap(a.x - b.x).max(wrap(a.y - b.y)).max(wrap(a.z - b.z))
}

impl SphereController {
    pub fn new(settings: SphereSettings, root: NodeHandle) -> Self {
        Self {
            projection: Projection::spherical(settings.radius),
            tree: sphere_tree(settings.lod_range, settings.radius),
            zoom: f64::from(settings.lod_range.min),
            settings,
            root,
            nodes: FxHashMap::default(),
            last: None,
            lod: None,
        }
    }

    /// LOD the viewer was last resolved to.
    pub fn lod(&self) -> Option<u8> {
        self.lod
    }

    /// Live tiles, in no particular order.
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.nodes.values().filter_map(|node| match &node.slot {
            Slot::Tile(tile) => Some(tile),
            Slot::Placeholder => None,
        })
    }

    /// Whether `quad_key` is currently split into children.
    pub fn is_placeholder(&self, quad_key: &QuadKey) -> bool {
        matches!(
            self.nodes.get(quad_key).map(|node| &node.slot),
            Some(Slot::Placeholder)
        )
    }

    /// Placement node for `quad_key`, if it is part of the tree.
    pub fn node_of(&self, quad_key: &QuadKey) -> Option<NodeHandle> {
        self.nodes.get(quad_key).map(|node| node.handle)
    }

    fn insert_tile(
        &mut self,
        quad_key: QuadKey,
        handle: NodeHandle,
        scene: &mut dyn SceneGraph,
        provider: &dyn MapDataProvider,
        work: &mut Work,
    ) -> Result<(), TilingError> {
        let mut tile = Tile::create(
            quad_key,
            &self.projection,
            self.settings.elevation_type,
            handle,
            scene,
            provider,
        );
        let loaded = tile.load(provider);
        self.nodes.insert(
            quad_key,
            SphereNode {
                handle,
                slot: Slot::Tile(tile),
            },
        );
        work.created += 1;
        work.warnings.extend(loaded?);
        Ok(())
    }

    /// Cover the planet with tiles at the coarsest LOD.
    fn build_initial(
        &mut self,
        scene: &mut dyn SceneGraph,
        provider: &dyn MapDataProvider,
        work: &mut Work,
    ) -> Result<(), TilingError> {
        let lod = self.tree.min_lod();
        let size = QuadKey::grid_size(lod);
        tracing::debug!(lod, tiles = size * size, "Building initial sphere grid");
        for y in 0..size {
            for x in 0..size {
                let key = QuadKey::new(x, y, lod);
                let handle = scene.create_node(Some(self.root), &key.to_string());
                self.insert_tile(key, handle, scene, provider, work)?;
            }
        }
        Ok(())
    }

    /// Dispose every tile strictly below `quad_key` and drop their placement nodes.
    fn evict_subtree(
        &mut self,
        quad_key: QuadKey,
        scene: &mut dyn SceneGraph,
        provider: &dyn MapDataProvider,
    ) {
        let descendants: Vec<QuadKey> = self
            .nodes
            .keys()
            .filter(|key| key.lod > quad_key.lod && quad_key.contains(key))
            .copied()
            .collect();
        for key in &descendants {
            if let Some(SphereNode {
                slot: Slot::Tile(tile),
                ..
            }) = self.nodes.get_mut(key)
            {
                tile.dispose(scene, provider);
            }
        }
        if quad_key.lod < QuadKey::MAX_LOD {
            for child in quad_key.children() {
                if let Some(node) = self.nodes.get(&child) {
                    scene.destroy(node.handle);
                }
            }
        }
        for key in descendants {
            self.nodes.remove(&key);
        }
    }

    /// Turn a leaf tile into a placeholder, disposing its content.
    fn evict_leaf(
        &mut self,
        quad_key: QuadKey,
        scene: &mut dyn SceneGraph,
        provider: &dyn MapDataProvider,
    ) {
        if let Some(node) = self.nodes.get_mut(&quad_key) {
            if let Slot::Tile(tile) = &mut node.slot {
                tile.dispose(scene, provider);
            }
            node.slot = Slot::Placeholder;
        }
    }

    /// Refine the branch containing `target` down to its LOD and collapse every
    /// other refined branch. All evictions happen before the first load.
    fn focus(
        &mut self,
        target: QuadKey,
        scene: &mut dyn SceneGraph,
        provider: &dyn MapDataProvider,
        work: &mut Work,
    ) -> Result<(), TilingError> {
        let min_lod = self.tree.min_lod();
        let on_path = |key: &QuadKey| key.lod < target.lod && key.contains(&target);

        // Topmost placeholders that must become leaves again.
        let collapse: Vec<QuadKey> = self
            .nodes
            .iter()
            .filter(|(key, node)| matches!(node.slot, Slot::Placeholder) && !on_path(key))
            .map(|(key, _)| *key)
            .filter(|key| key.lod == min_lod || key.parent().is_some_and(|p| on_path(&p)))
            .collect();
        for key in &collapse {
            tracing::trace!(quad_key = %key, "Collapsing sphere branch");
            self.evict_subtree(*key, scene, provider);
        }

        // Deepest resident leaf above the target, if the target is not in the tree.
        let split_from = if self.nodes.contains_key(&target) {
            None
        } else {
            let mut key = target;
            while !self.nodes.contains_key(&key) {
                match key.parent() {
                    Some(parent) if parent.lod >= min_lod => key = parent,
                    _ => break,
                }
            }
            self.nodes.contains_key(&key).then_some(key)
        };
        if let Some(leaf) = split_from {
            self.evict_leaf(leaf, scene, provider);
        }

        for key in collapse {
            if let Some(handle) = self.node_of(&key) {
                self.insert_tile(key, handle, scene, provider, work)?;
            }
        }

        if let Some(mut current) = split_from {
            tracing::trace!(from = %current, to = %target, "Splitting sphere branch");
            while current.lod < target.lod {
                let next = target.ancestor_at(current.lod + 1);
                let Some(parent) = self.node_of(&current) else {
                    break;
                };
                for child in current.children() {
                    let handle = scene.create_node(Some(parent), &child.to_string());
                    if child == next && child.lod < target.lod {
                        self.nodes.insert(
                            child,
                            SphereNode {
                                handle,
                                slot: Slot::Placeholder,
                            },
                        );
                    } else {
                        self.insert_tile(child, handle, scene, provider, work)?;
                    }
                }
                current = next;
            }
        }
        Ok(())
    }
}

impl TileSetManager for SphereController {
    fn update(
        &mut self,
        viewer: &ViewerState,
        scene: &mut dyn SceneGraph,
        provider: &dyn MapDataProvider,
    ) -> Result<UpdateOutcome, TilingError> {
        let distance = viewer.position.length();
        if let Some((orientation, last_distance)) = self.last {
            let rotated = angle_delta(orientation, viewer.orientation)
                >= self.settings.rotation_sensitivity;
            let moved = (distance - last_distance).abs() >= self.settings.height_sensitivity;
            if !rotated && !moved {
                return Ok(UpdateOutcome::default());
            }
        }
        self.last = Some((viewer.orientation, distance));

        self.zoom = self.tree.calculate_zoom(distance);
        let lod = self.tree.lookup(distance);
        let target = QuadKey::from_coordinate(coordinate_from_euler(viewer.orientation), lod);

        let mut work = Work::default();
        if self.nodes.is_empty() {
            self.build_initial(scene, provider, &mut work)?;
        }
        self.focus(target, scene, provider, &mut work)?;

        let change = if self.lod != Some(lod) {
            tracing::debug!(from = ?self.lod, to = lod, target = %target, "Sphere LOD changed");
            TileChange::Zoom { lod }
        } else if work.created > 0 {
            TileChange::Pan
        } else {
            TileChange::None
        };
        self.lod = Some(lod);

        Ok(UpdateOutcome {
            change,
            recentered: None,
            warnings: work.warnings,
        })
    }

    fn deliver(&mut self, event: TileEvent, scene: &mut dyn SceneGraph) -> Delivery {
        let id = event.tile();
        let tile = self.nodes.values_mut().find_map(|node| match &mut node.slot {
            Slot::Tile(tile) if tile.id() == id => Some(tile),
            _ => None,
        });
        match tile {
            Some(tile) => tile.apply(event, scene),
            None => {
                tracing::trace!(tile = %id, "Discarding result for evicted tile");
                Delivery::Discarded
            }
        }
    }

    fn dispose(&mut self, scene: &mut dyn SceneGraph, provider: &dyn MapDataProvider) {
        let min_lod = self.tree.min_lod();
        for (key, node) in self.nodes.iter_mut() {
            if let Slot::Tile(tile) = &mut node.slot {
                tile.dispose(scene, provider);
            }
            if key.lod == min_lod {
                scene.destroy(node.handle);
            }
        }
        self.nodes.clear();
        self.last = None;
        self.lod = None;
    }

    fn lod_tree(&self) -> &LodIntervalTree {
        &self.tree
    }

    fn projection(&self) -> &Projection {
        &self.projection
    }

    fn zoom_level(&self) -> f64 {
        self.zoom
    }

    fn coordinate_at(&self, viewer: &ViewerState) -> GeoCoordinate {
        coordinate_from_euler(viewer.orientation)
    }

    fn distance_of(&self, viewer: &ViewerState) -> f64 {
        viewer.position.length()
    }

    /// The sphere is centered on the planet, so there is no origin to move.
    fn move_geo_origin(&mut self, _coordinate: GeoCoordinate) {}

    fn field_of_view(&self) -> Option<f64> {
        None
    }

    fn resident_count(&self) -> usize {
        self.tiles().count()
    }
}

#[cfg(test)]
mod tests {
    use geotile_geo::euler_from_coordinate;
    use glam::DVec3;

    use super::*;
    use crate::SceneArena;
    use crate::testing::{ProviderCall, RecordingProvider};

    const BERLIN: GeoCoordinate = GeoCoordinate::new(52.53171, 13.38721);
    const SYDNEY: GeoCoordinate = GeoCoordinate::new(-33.8688, 151.2093);

    struct Fixture {
        scene: SceneArena,
        provider: RecordingProvider,
        controller: SphereController,
    }

    fn fixture() -> Fixture {
        let mut scene = SceneArena::new();
        let root = scene.create_node(None, "orbit");
        Fixture {
            controller: SphereController::new(SphereSettings::default(), root),
            scene,
            provider: RecordingProvider::new(),
        }
    }

    impl Fixture {
        fn distance_for(&self, lod: u8) -> f64 {
            let interval = self.controller.lod_tree().interval_for(lod).unwrap();
            if interval.is_unbounded() {
                interval.from * 1.5
            } else {
                (interval.from + interval.to) * 0.5
            }
        }

        fn look_at(&mut self, coordinate: GeoCoordinate, lod: u8) -> UpdateOutcome {
            let distance = self.distance_for(lod);
            let viewer = ViewerState::new(
                DVec3::new(0.0, 0.0, -distance),
                euler_from_coordinate(coordinate),
            );
            self.controller
                .update(&viewer, &mut self.scene, &self.provider)
                .unwrap()
        }

        fn leaf_lod_under(&self, coordinate: GeoCoordinate) -> Option<u8> {
            self.controller
                .tiles()
                .filter(|t| t.quad_key().bounding_box().contains(&coordinate))
                .map(|t| t.quad_key().lod)
                .max()
        }
    }

    #[test]
    fn test_initial_build_covers_planet() {
        let mut f = fixture();
        let outcome = f.look_at(BERLIN, 1);
        assert_eq!(outcome.change, TileChange::Zoom { lod: 1 });
        assert_eq!(f.controller.resident_count(), 4);
        assert_eq!(f.provider.submitted_count(), 4);
    }

    #[test]
    fn test_zoom_in_splits_down_to_target() {
        let mut f = fixture();
        f.look_at(BERLIN, 1);
        let outcome = f.look_at(BERLIN, 4);
        assert_eq!(outcome.change, TileChange::Zoom { lod: 4 });

        // Three levels of splitting: each replaces one tile with four.
        assert_eq!(f.controller.resident_count(), 4 + 3 * 3);
        assert_eq!(f.leaf_lod_under(BERLIN), Some(4));
        for lod in 1..4 {
            assert!(f.controller.is_placeholder(&QuadKey::from_coordinate(BERLIN, lod)));
        }
    }

    #[test]
    fn test_zoom_out_collapses_subtree() {
        let mut f = fixture();
        f.look_at(BERLIN, 1);
        f.look_at(BERLIN, 5);
        let deep = QuadKey::from_coordinate(BERLIN, 5);
        let deep_node = f.controller.node_of(&deep).unwrap();

        let outcome = f.look_at(BERLIN, 2);
        assert_eq!(outcome.change, TileChange::Zoom { lod: 2 });
        assert_eq!(f.controller.resident_count(), 4 + 3);
        assert_eq!(f.leaf_lod_under(BERLIN), Some(2));
        assert!(f.controller.node_of(&deep).is_none());
        assert!(!f.scene.contains(deep_node));
    }

    #[test]
    fn test_moving_away_collapses_previous_branch() {
        let mut f = fixture();
        f.look_at(BERLIN, 1);
        f.look_at(BERLIN, 4);
        let outcome = f.look_at(SYDNEY, 4);
        assert_eq!(outcome.change, TileChange::Pan);
        assert_eq!(f.controller.resident_count(), 4 + 3 * 3);
        assert_eq!(f.leaf_lod_under(SYDNEY), Some(4));
        assert_eq!(f.leaf_lod_under(BERLIN), Some(1));
    }

    #[test]
    fn test_evictions_precede_loads() {
        let mut f = fixture();
        f.look_at(BERLIN, 1);
        f.look_at(BERLIN, 4);
        f.provider.clear_calls();

        f.look_at(SYDNEY, 3);
        let calls = f.provider.calls();
        let last_cancel = calls
            .iter()
            .rposition(|c| matches!(c, ProviderCall::Cancel { .. }))
            .unwrap();
        let first_submit = calls
            .iter()
            .position(|c| matches!(c, ProviderCall::Submit { .. }))
            .unwrap();
        assert!(last_cancel < first_submit);
    }

    #[test]
    fn test_small_rotation_is_noop() {
        let mut f = fixture();
        f.look_at(BERLIN, 3);
        let mutations = f.scene.mutation_count();
        let nearby = GeoCoordinate::new(BERLIN.latitude + 0.1, BERLIN.longitude);
        assert_eq!(f.look_at(nearby, 3), UpdateOutcome::default());
        assert_eq!(f.scene.mutation_count(), mutations);
    }

    #[test]
    fn test_closer_than_min_selects_finest_lod() {
        let mut f = fixture();
        let viewer = ViewerState::new(DVec3::new(0.0, 0.0, -6400.0), euler_from_coordinate(BERLIN));
        assert!(f.controller.is_below_min(&viewer));
        f.controller.update(&viewer, &mut f.scene, &f.provider).unwrap();
        assert_eq!(f.controller.lod(), Some(8));
        assert_eq!(f.leaf_lod_under(BERLIN), Some(8));
    }

    #[test]
    fn test_coordinate_from_orientation() {
        let f = fixture();
        let viewer = ViewerState::new(DVec3::new(0.0, 0.0, -20_000.0), euler_from_coordinate(BERLIN));
        assert!(f.controller.coordinate_at(&viewer).approx_eq(&BERLIN, 1e-9));
        assert!((f.controller.distance_of(&viewer) - 20_000.0).abs() < 1e-9);
        assert!(!f.controller.is_above_max(&viewer));
    }

    #[test]
    fn test_dispose_removes_all_nodes() {
        let mut f = fixture();
        f.look_at(BERLIN, 1);
        f.look_at(BERLIN, 6);
        f.controller.dispose(&mut f.scene, &f.provider);
        assert_eq!(f.controller.resident_count(), 0);
        assert_eq!(f.scene.len(), 1);
        assert!(f.provider.requests().iter().all(|r| r.token.is_cancelled()));
    }

    #[test]
    fn test_stale_result_after_split_is_discarded() {
        let mut f = fixture();
        f.look_at(BERLIN, 1);
        let coarse = f.provider.requests();
        f.look_at(BERLIN, 2);

        let parent = QuadKey::from_coordinate(BERLIN, 1);
        let stale = coarse.iter().find(|r| r.quad_key == parent).unwrap();
        let mutations = f.scene.mutation_count();
        let delivery = f
            .controller
            .deliver(TileEvent::Completed { tile: stale.tile }, &mut f.scene);
        assert_eq!(delivery, Delivery::Discarded);
        assert_eq!(f.scene.mutation_count(), mutations);
    }
}
