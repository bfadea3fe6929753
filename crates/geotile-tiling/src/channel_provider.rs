//! Threaded [`MapDataProvider`] backed by bounded channels.
//!
//! Requests are pushed onto a bounded queue served by a pool of worker
//! threads. Each worker loads the tile from a [`TileSource`] and sends the
//! resulting events back; the owner collects them once per frame with
//! [`MapDataProvider::drain`].

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use dashmap::DashMap;
use geotile_geo::{GeoCoordinate, QuadKey};
use serde::{Deserialize, Serialize};

use crate::{
    CancellationToken, ElevationType, MapDataProvider, ProviderError, TileContent, TileEvent,
    TileId, TileIds, TileRequest, TilingError,
};

/// Blocking loader executed on worker threads.
pub trait TileSource: Send + Sync + 'static {
    /// Produce the content of one tile.
    fn load(
        &self,
        quad_key: &QuadKey,
        elevation_type: ElevationType,
    ) -> Result<Vec<TileContent>, ProviderError>;

    fn has_data(&self, _quad_key: &QuadKey) -> bool {
        true
    }

    /// Terrain height in meters.
    fn elevation(&self, _coordinate: GeoCoordinate) -> f64 {
        0.0
    }
}

/// Sizing of the worker pool and its queues.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub worker_threads: usize,
    /// Requests beyond this many queued ones are rejected.
    pub queue_capacity: usize,
    pub result_capacity: usize,
}

impl Default for ProviderSettings {
    /// Leaves two cores for the main and render threads.
    fn default() -> Self {
        let cpus = num_cpus::get().max(2);
        Self {
            worker_threads: (cpus - 2).max(1),
            queue_capacity: 128,
            result_capacity: 256,
        }
    }
}

/// Map data provider running a [`TileSource`] on a thread pool.
pub struct ChannelDataProvider<S: TileSource> {
    /// `None` once shut down.
    request_sender: Option<Sender<TileRequest>>,
    result_receiver: Receiver<TileEvent>,
    /// Cancellation token per tile still in flight.
    active: Arc<DashMap<TileId, CancellationToken>>,
    in_flight: Arc<AtomicU64>,
    source: Arc<S>,
    workers: Vec<JoinHandle<()>>,
    tile_ids: TileIds,
}

impl<S: TileSource> ChannelDataProvider<S> {
    pub fn new(source: S, settings: ProviderSettings) -> Result<Self, TilingError> {
        let (request_sender, request_receiver) =
            bounded::<TileRequest>(settings.queue_capacity.max(1));
        let (result_sender, result_receiver) = bounded::<TileEvent>(settings.result_capacity.max(1));
        let in_flight = Arc::new(AtomicU64::new(0));
        let source = Arc::new(source);

        let mut workers = Vec::with_capacity(settings.worker_threads);
        for index in 0..settings.worker_threads.max(1) {
            let receiver = request_receiver.clone();
            let sender = result_sender.clone();
            let in_flight = Arc::clone(&in_flight);
            let source = Arc::clone(&source);

            let handle = std::thread::Builder::new()
                .name(format!("tile-loader-{index}"))
                .spawn(move || {
                    while let Ok(request) = receiver.recv() {
                        // Check cancellation before starting work.
                        if request.token.is_cancelled() {
                            in_flight.fetch_sub(1, Ordering::Relaxed);
                            continue;
                        }

                        let result = source.load(&request.quad_key, request.elevation_type);

                        // Check cancellation after loading.
                        if !request.token.is_cancelled() {
                            let tile = request.tile;
                            let events: Vec<TileEvent> = match result {
                                Ok(contents) => contents
                                    .into_iter()
                                    .map(|content| TileEvent::Content { tile, content })
                                    .chain(std::iter::once(TileEvent::Completed { tile }))
                                    .collect(),
                                Err(error) => vec![TileEvent::Failed { tile, error }],
                            };
                            for event in events {
                                if sender.send(event).is_err() {
                                    break;
                                }
                            }
                        }

                        in_flight.fetch_sub(1, Ordering::Relaxed);
                    }
                })?;
            workers.push(handle);
        }

        tracing::debug!(
            workers = workers.len(),
            queue_capacity = settings.queue_capacity,
            "Started tile loader pool"
        );

        Ok(Self {
            request_sender: Some(request_sender),
            result_receiver,
            active: Arc::new(DashMap::new()),
            in_flight,
            source,
            workers,
            tile_ids: TileIds::new(),
        })
    }

    /// Requests queued or executing.
    pub fn in_flight_count(&self) -> u64 {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Whether `tile` was submitted and has neither finished nor been cancelled.
    pub fn is_pending(&self, tile: TileId) -> bool {
        self.active.contains_key(&tile)
    }

    /// Stop accepting requests, cancel outstanding work and join the workers.
    /// Later submissions fail with [`TilingError::ProviderDisconnected`].
    pub fn shutdown(&mut self) {
        if self.request_sender.take().is_none() {
            return;
        }
        for entry in self.active.iter() {
            entry.value().cancel();
        }
        self.active.clear();

        // Workers may be blocked on a full result queue; keep it flowing.
        for handle in self.workers.drain(..) {
            while !handle.is_finished() {
                while self.result_receiver.try_recv().is_ok() {}
                std::thread::sleep(Duration::from_millis(1));
            }
            if handle.join().is_err() {
                tracing::error!("Tile loader thread panicked");
            }
        }
        tracing::debug!("Tile loader pool shut down");
    }
}

impl<S: TileSource> MapDataProvider for ChannelDataProvider<S> {
    fn submit(&self, request: TileRequest) -> Result<(), TilingError> {
        let Some(sender) = &self.request_sender else {
            return Err(TilingError::ProviderDisconnected);
        };
        let tile = request.tile;
        let quad_key = request.quad_key;
        self.active.insert(tile, request.token.clone());
        self.in_flight.fetch_add(1, Ordering::Relaxed);

        sender.try_send(request).map_err(|e| {
            self.in_flight.fetch_sub(1, Ordering::Relaxed);
            self.active.remove(&tile);
            match e {
                TrySendError::Full(_) => TilingError::QueueFull { tile, quad_key },
                TrySendError::Disconnected(_) => TilingError::ProviderDisconnected,
            }
        })
    }

    fn cancel(&self, tile: TileId) {
        if let Some((_, token)) = self.active.remove(&tile) {
            token.cancel();
        }
    }

    fn drain(&self) -> Vec<TileEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.result_receiver.try_recv() {
            if !matches!(event, TileEvent::Content { .. }) {
                self.active.remove(&event.tile());
            }
            events.push(event);
        }
        events
    }

    fn has_data(&self, quad_key: &QuadKey) -> bool {
        self.source.has_data(quad_key)
    }

    fn elevation(&self, coordinate: GeoCoordinate) -> f64 {
        self.source.elevation(coordinate)
    }

    fn next_tile_id(&self) -> TileId {
        self.tile_ids.next()
    }
}

impl<S: TileSource> Drop for ChannelDataProvider<S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<S: TileSource> std::fmt::Debug for ChannelDataProvider<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelDataProvider")
            .field("workers", &self.workers.len())
            .field("in_flight", &self.in_flight_count())
            .field("shut_down", &self.request_sender.is_none())
            .finish()
    }
}
