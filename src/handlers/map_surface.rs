use std::sync::Mutex;
use tokio::sync::watch;
use tracing::info;
use crate::handlers::route_assembler::AssembledRoute;
use crate::models::coordinate::Coordinate;

pub const CURRENT_LOCATION_LABEL: &str = "Current Location";
pub const ROUTE_POINT_LABEL: &str = "Route Point";

#[derive(Debug, Clone, PartialEq)]
pub struct MapMarker {
    pub position: Coordinate,
    pub label: &'static str,
}

/// Everything drawn on the map after one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct MapFrame {
    pub center: Coordinate,
    pub markers: Vec<MapMarker>,
    /// One polyline per resolved waypoint pair.
    pub segments: Vec<Vec<Coordinate>>,
    pub path: Vec<Coordinate>,
    pub distance_km: f64,
    pub instructions: Vec<String>,
}

impl MapFrame {
    /// `waypoints[0]` is the vehicle's own last reported position, so it gets
    /// no route marker; the device position is drawn as the current location.
    pub fn new(current: Coordinate, waypoints: &[Coordinate], route: AssembledRoute) -> Self {
        let mut markers: Vec<MapMarker> = waypoints
            .iter()
            .skip(1)
            .map(|&position| MapMarker { position, label: ROUTE_POINT_LABEL })
            .collect();
        markers.push(MapMarker { position: current, label: CURRENT_LOCATION_LABEL });

        Self {
            center: current,
            markers,
            segments: route.segment_paths(),
            instructions: route.instructions(),
            path: route.path,
            distance_km: route.distance_km,
        }
    }

    pub fn current_location(&self) -> Option<&MapMarker> {
        self.markers.iter().find(|m| m.label == CURRENT_LOCATION_LABEL)
    }
}

/// Rendering target. Every render is a full replace of the previous frame.
pub trait MapSurface: Send + Sync {
    fn clear(&self);
    fn render(&self, frame: &MapFrame);
}

/// Publishes frames to any number of subscribers; `None` means cleared.
pub struct WatchSurface {
    frames: watch::Sender<Option<MapFrame>>,
    rendered: Mutex<u64>,
}

impl WatchSurface {
    pub fn new() -> (Self, watch::Receiver<Option<MapFrame>>) {
        let (frames, receiver) = watch::channel(None);
        (Self { frames, rendered: Mutex::new(0) }, receiver)
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<MapFrame>> {
        self.frames.subscribe()
    }

    pub fn rendered(&self) -> u64 {
        self.rendered.lock().map(|count| *count).unwrap_or_default()
    }
}

impl MapSurface for WatchSurface {
    fn clear(&self) {
        self.frames.send_replace(None);
    }

    fn render(&self, frame: &MapFrame) {
        if let Ok(mut count) = self.rendered.lock() {
            *count += 1;
        }
        self.frames.send_replace(Some(frame.clone()));
    }
}

/// Headless surface that only logs what would be drawn.
pub struct LogSurface;

impl MapSurface for LogSurface {
    fn clear(&self) {}

    fn render(&self, frame: &MapFrame) {
        info!(
            center = %frame.center,
            markers = frame.markers.len(),
            segments = frame.segments.len(),
            distance_km = frame.distance_km,
            "Map updated"
        );
    }
}
