//! Test doubles for the external interfaces.

use std::cell::{Cell, RefCell};

use geotile_geo::{GeoCoordinate, QuadKey};

use crate::{
    MapDataProvider, MapElement, ProviderError, TileContent, TileEvent, TileId, TileIds,
    TileRequest, TilingError,
};

/// A call observed by [`RecordingProvider`].
#[derive(Clone, Debug, PartialEq)]
pub enum ProviderCall {
    Submit { tile: TileId, quad_key: QuadKey },
    Cancel { tile: TileId },
}

/// Synchronous provider that records every call and returns queued events.
#[derive(Debug, Default)]
pub struct RecordingProvider {
    calls: RefCell<Vec<ProviderCall>>,
    requests: RefCell<Vec<TileRequest>>,
    pending: RefCell<Vec<TileEvent>>,
    disconnected: Cell<bool>,
    elevation: f64,
    tile_ids: TileIds,
}

impl RecordingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider reporting a constant terrain height.
    pub fn with_elevation(elevation: f64) -> Self {
        Self {
            elevation,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    /// All requests submitted so far, including cancelled ones.
    pub fn requests(&self) -> Vec<TileRequest> {
        self.requests.borrow().clone()
    }

    pub fn submitted_count(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| matches!(c, ProviderCall::Submit { .. }))
            .count()
    }

    /// Queue an event for the next [`MapDataProvider::drain`].
    pub fn push_event(&self, event: TileEvent) {
        self.pending.borrow_mut().push(event);
    }

    /// Queue one element and a completion for every request still live.
    pub fn complete_live_requests(&self) {
        let requests = self.requests.borrow();
        let mut pending = self.pending.borrow_mut();
        for request in requests.iter().filter(|r| !r.token.is_cancelled()) {
            pending.push(TileEvent::Content {
                tile: request.tile,
                content: TileContent::Element(MapElement {
                    id: request.tile.0,
                    name: format!("element-{}", request.quad_key),
                    coordinate: request.quad_key.bounding_box().center(),
                    elevation: 0.0,
                }),
            });
            pending.push(TileEvent::Completed { tile: request.tile });
        }
    }

    /// Queue a failure for `tile`.
    pub fn fail(&self, tile: TileId, message: &str) {
        self.push_event(TileEvent::Failed {
            tile,
            error: ProviderError::Load(message.to_string()),
        });
    }

    /// Make every following submission fail with [`TilingError::ProviderDisconnected`].
    pub fn disconnect(&self) {
        self.disconnected.set(true);
    }
}

impl MapDataProvider for RecordingProvider {
    fn submit(&self, request: TileRequest) -> Result<(), TilingError> {
        if self.disconnected.get() {
            return Err(TilingError::ProviderDisconnected);
        }
        self.calls.borrow_mut().push(ProviderCall::Submit {
            tile: request.tile,
            quad_key: request.quad_key,
        });
        self.requests.borrow_mut().push(request);
        Ok(())
    }

    fn cancel(&self, tile: TileId) {
        self.calls.borrow_mut().push(ProviderCall::Cancel { tile });
    }

    fn drain(&self) -> Vec<TileEvent> {
        std::mem::take(&mut *self.pending.borrow_mut())
    }

    fn has_data(&self, _quad_key: &QuadKey) -> bool {
        true
    }

    fn elevation(&self, _coordinate: GeoCoordinate) -> f64 {
        self.elevation
    }

    fn next_tile_id(&self) -> TileId {
        self.tile_ids.next()
    }
}
