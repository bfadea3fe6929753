//! Owns the spaces, the camera rig, the scene graph and the data provider,
//! and moves the viewer between spaces as it crosses their LOD ranges.

use std::time::Duration;

use geotile_animation::{CameraRig, Remaining, TimeInterpolator};
use geotile_geo::GeoCoordinate;
use geotile_tiling::{
    Delivery, MapDataProvider, NodeHandle, SceneGraph, TileChange, TileController,
    TileSetManager, TileWarning,
};
use glam::DVec3;

use crate::{Space, SpaceError, SpaceKind};

/// A change of space during one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpaceTransition {
    pub from: SpaceKind,
    pub to: SpaceKind,
    /// Where the viewer was looking when it left.
    pub coordinate: GeoCoordinate,
    /// Whether the remaining animation, or the target it landed on, was
    /// carried over.
    pub continued_animation: bool,
    /// Field of view the arriving space wants the camera to use.
    pub field_of_view: Option<f64>,
}

/// What happened during one [`SpaceController::update`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameReport {
    pub change: TileChange,
    pub recentered: Option<DVec3>,
    pub delivered: usize,
    pub warnings: Vec<TileWarning>,
    pub transitions: Vec<SpaceTransition>,
}

/// Drives the active space every frame and hands the viewer over between spaces.
#[derive(Debug)]
pub struct SpaceController<S: SceneGraph, P: MapDataProvider> {
    scene: S,
    provider: P,
    rig: CameraRig,
    interpolator: TimeInterpolator,
    spaces: Vec<Space>,
    current: Option<usize>,
}

impl<S: SceneGraph, P: MapDataProvider> SpaceController<S, P> {
    pub fn new(mut scene: S, provider: P) -> Self {
        let rig = CameraRig::create(&mut scene, None);
        Self {
            scene,
            provider,
            rig,
            interpolator: TimeInterpolator::default(),
            spaces: Vec::new(),
            current: None,
        }
    }

    /// Interpolator for the animators of spaces added from now on.
    pub fn with_interpolator(mut self, interpolator: TimeInterpolator) -> Self {
        self.interpolator = interpolator;
        self
    }

    /// Append a space finer than every space added so far. `build` receives
    /// the space's scene root, created inactive.
    pub fn push_space(
        &mut self,
        kind: SpaceKind,
        build: impl FnOnce(NodeHandle) -> TileController,
    ) -> Result<&Space, SpaceError> {
        let root = self.scene.create_node(None, &kind.to_string());
        self.scene.set_active(root, false);
        let space = Space::new(kind, root, build(root), self.interpolator);

        if let Some(previous) = self.spaces.last() {
            let (previous, next) = (previous.lod_range(), space.lod_range());
            if u16::from(previous.max) + 1 != u16::from(next.min) {
                self.scene.destroy(root);
                return Err(SpaceError::RangeGap { previous, next });
            }
        }

        tracing::debug!(space = %kind, lod_range = ?space.lod_range(), "Added space");
        self.spaces.push(space);
        Ok(&self.spaces[self.spaces.len() - 1])
    }

    /// Cold start: enter the space containing `zoom` from the top and place
    /// the rig at `coordinate`.
    pub fn start(&mut self, coordinate: GeoCoordinate, zoom: f64) -> Result<(), SpaceError> {
        let index = self.space_for_zoom(zoom)?;
        if let Some(current) = self.current.take() {
            self.spaces[current].leave(&mut self.scene, &self.provider);
        }
        tracing::info!(%coordinate, zoom, space = %self.spaces[index].kind(), "Starting map");
        self.enter(index, coordinate, zoom);
        Ok(())
    }

    /// Jump straight to `zoom` at `coordinate`, whichever space it falls into.
    pub fn transition_to(&mut self, coordinate: GeoCoordinate, zoom: f64) -> Result<(), SpaceError> {
        let index = self.space_for_zoom(zoom)?;
        let current = self.current.ok_or(SpaceError::NotStarted)?;
        if index == current {
            self.spaces[index].animate_to(coordinate, zoom, Duration::ZERO, &self.rig, &mut self.scene);
            return Ok(());
        }
        self.spaces[current].leave(&mut self.scene, &self.provider);
        self.enter(index, coordinate, zoom);
        Ok(())
    }

    /// Animate the rig within the current space. Crossing into another space
    /// carries the animation over.
    pub fn animate_to(
        &mut self,
        coordinate: GeoCoordinate,
        zoom: f64,
        duration: Duration,
    ) -> Result<(), SpaceError> {
        let current = self.current.ok_or(SpaceError::NotStarted)?;
        self.spaces[current].animate_to(coordinate, zoom, duration, &self.rig, &mut self.scene);
        Ok(())
    }

    /// Run one frame: advance the animation, update the tiles, apply loaded
    /// content and settle on the space matching the viewer.
    pub fn update(&mut self, delta: Duration) -> Result<FrameReport, SpaceError> {
        let current = self.current.ok_or(SpaceError::NotStarted)?;
        let mut report = FrameReport::default();

        let space = &mut self.spaces[current];
        space.animator_mut().update(delta, &mut self.scene);

        let viewer = space.viewer(&self.rig, &self.scene);
        let outcome = space
            .manager_mut()
            .update(&viewer, &mut self.scene, &self.provider)?;
        if let Some(offset) = outcome.recentered {
            self.scene.translate(self.rig.pivot, -offset);
            space.animator_mut().translate(-offset);
        }
        report.change = outcome.change;
        report.recentered = outcome.recentered;
        report.warnings = outcome.warnings;

        for event in self.provider.drain() {
            match space.manager_mut().deliver(event, &mut self.scene) {
                Delivery::Applied => report.delivered += 1,
                Delivery::Warning(warning) => report.warnings.push(warning),
                Delivery::Ignored | Delivery::Discarded => {}
            }
        }

        self.settle(&mut report.transitions);
        Ok(report)
    }

    /// Move between spaces until the viewer is inside the current one. Each
    /// step moves one space, so this ends after at most `spaces.len()` steps.
    ///
    /// Distances exactly on an edge stay put, so arriving at a boundary never
    /// bounces back. An animation that landed on a zoom beyond the space's
    /// levels moves on even when its distance sits right on the edge.
    fn settle(&mut self, transitions: &mut Vec<SpaceTransition>) {
        for _ in 0..self.spaces.len() {
            let Some(current) = self.current else {
                return;
            };
            let space = &self.spaces[current];
            let viewer = space.viewer(&self.rig, &self.scene);
            let range = space.lod_range();
            let landed = space.landed_outside().map(|target| target.zoom.floor());

            let coarser = space.manager().is_above_max(&viewer)
                || landed.is_some_and(|lod| lod < f64::from(range.min));
            let finer = space.manager().is_below_min(&viewer)
                || landed.is_some_and(|lod| lod > f64::from(range.max));
            let next = if coarser && current > 0 {
                (current - 1, false)
            } else if finer && current + 1 < self.spaces.len() {
                (current + 1, true)
            } else {
                return;
            };
            transitions.push(self.hand_over(current, next.0, next.1));
        }
    }

    /// Leave `from` and enter `to` at its boundary, carrying over any running
    /// animation. A landed target beyond `from` is carried as an instant one.
    fn hand_over(&mut self, from: usize, to: usize, from_top: bool) -> SpaceTransition {
        let departing = &mut self.spaces[from];
        let coordinate = departing.coordinate(&self.rig, &self.scene);
        let landed = departing.landed_outside().map(|target| Remaining {
            target,
            duration: Duration::ZERO,
        });
        let remaining = departing.animator_mut().take_remaining().or(landed);
        departing.leave(&mut self.scene, &self.provider);

        let arriving = &mut self.spaces[to];
        let zoom = arriving.boundary_zoom(from_top);
        arriving.enter(coordinate, &self.rig, &mut self.scene);
        arriving.animate_to(coordinate, zoom, Duration::ZERO, &self.rig, &mut self.scene);
        match remaining {
            Some(remaining) => arriving.resume(remaining, &self.rig, &mut self.scene),
            // The boundary is where the viewer is, not where it was headed.
            None => arriving.animator_mut().clear(),
        }
        self.current = Some(to);

        let transition = SpaceTransition {
            from: self.spaces[from].kind(),
            to: self.spaces[to].kind(),
            coordinate,
            continued_animation: remaining.is_some(),
            field_of_view: self.spaces[to].manager().field_of_view(),
        };
        tracing::info!(
            from = %transition.from,
            to = %transition.to,
            %coordinate,
            zoom,
            continued = transition.continued_animation,
            "Space transition"
        );
        transition
    }

    fn enter(&mut self, index: usize, coordinate: GeoCoordinate, zoom: f64) {
        let space = &mut self.spaces[index];
        space.enter(coordinate, &self.rig, &mut self.scene);
        space.animate_to(coordinate, zoom, Duration::ZERO, &self.rig, &mut self.scene);
        self.current = Some(index);
    }

    fn space_for_zoom(&self, zoom: f64) -> Result<usize, SpaceError> {
        if self.spaces.is_empty() {
            return Err(SpaceError::NoSpaces);
        }
        let lod = zoom.floor();
        self.spaces
            .iter()
            .position(|space| {
                let range = space.lod_range();
                lod >= f64::from(range.min) && lod <= f64::from(range.max)
            })
            .ok_or(SpaceError::ZoomOutOfRange(zoom))
    }

    /// Leave the current space, releasing all of its tiles.
    pub fn dispose(&mut self) {
        if let Some(current) = self.current.take() {
            self.spaces[current].leave(&mut self.scene, &self.provider);
        }
    }

    pub fn current_space(&self) -> Option<&Space> {
        self.current.map(|index| &self.spaces[index])
    }

    pub fn current_kind(&self) -> Option<SpaceKind> {
        self.current_space().map(Space::kind)
    }

    pub fn spaces(&self) -> &[Space] {
        &self.spaces
    }

    /// Geographic position under the viewer.
    pub fn coordinate(&self) -> Option<GeoCoordinate> {
        self.current_space()
            .map(|space| space.coordinate(&self.rig, &self.scene))
    }

    /// Continuous zoom level of the current viewer position.
    pub fn zoom_level(&self) -> Option<f64> {
        self.current_space().map(|space| {
            let manager = space.manager();
            manager.calculate_zoom(manager.distance_of(&space.viewer(&self.rig, &self.scene)))
        })
    }

    pub fn is_animating(&self) -> bool {
        self.current_space()
            .is_some_and(|space| space.animator().is_running())
    }

    pub fn rig(&self) -> CameraRig {
        self.rig
    }

    /// The rig together with the scene that holds it, for input handling.
    pub fn rig_mut(&mut self) -> (CameraRig, &mut S) {
        (self.rig, &mut self.scene)
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }
}
