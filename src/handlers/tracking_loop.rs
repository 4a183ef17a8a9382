use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use crate::handlers::map_surface::{MapFrame, MapSurface};
use crate::handlers::position::PositionSource;
use crate::handlers::route_assembler::RouteAssembler;
use crate::handlers::server_client::TrackingServer;
use crate::models::session::VehicleSession;

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingState {
    Idle,
    AwaitingToken,
    Active,
    /// A tick is in flight.
    Updating,
    Stopped,
}

impl Display for TrackingState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TrackingState::Idle => "Idle",
            TrackingState::AwaitingToken => "AwaitingToken",
            TrackingState::Active => "Active",
            TrackingState::Updating => "Updating",
            TrackingState::Stopped => "Stopped",
        };
        f.write_str(name)
    }
}

/// Periodically pushes the device position, pulls the assigned route and
/// redraws it.
///
/// Ticks never overlap: the next one is armed only after the previous
/// round trip has finished, so a slow answer can never overwrite a newer one.
/// No failure inside a tick ends the loop; only [`TrackingHandle::stop`] does.
#[derive(Clone)]
pub struct TrackingLoop {
    server: Arc<dyn TrackingServer>,
    assembler: RouteAssembler,
    position: Arc<dyn PositionSource>,
    surface: Arc<dyn MapSurface>,
    state: Arc<watch::Sender<TrackingState>>,
}

impl TrackingLoop {
    pub fn new(
        server: Arc<dyn TrackingServer>,
        assembler: RouteAssembler,
        position: Arc<dyn PositionSource>,
        surface: Arc<dyn MapSurface>,
    ) -> Self {
        let (state, _) = watch::channel(TrackingState::Idle);
        Self {
            server,
            assembler,
            position,
            surface,
            state: Arc::new(state),
        }
    }

    pub fn state(&self) -> TrackingState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<TrackingState> {
        self.state.subscribe()
    }

    pub(crate) fn transition(&self, next: TrackingState) {
        let previous = self.state.send_replace(next);
        match (previous, next) {
            (previous, next) if previous == next => {}
            (_, TrackingState::Updating) | (TrackingState::Updating, TrackingState::Active) => {
                debug!("Tracking {} -> {}", previous, next)
            }
            _ => info!("Tracking {} -> {}", previous, next),
        }
    }

    /// Enters `Active` and runs the first tick right away.
    pub fn start(&self, session: VehicleSession, interval: Duration) -> TrackingHandle {
        let (stop, stop_rx) = watch::channel(false);
        let (refresh, refresh_rx) = mpsc::channel(1);

        self.transition(TrackingState::Active);
        let actor = self.clone();
        let task = tokio::spawn(actor.run_actor(session, interval, stop_rx, refresh_rx));

        TrackingHandle {
            stop,
            refresh,
            state: self.subscribe_state(),
            task,
        }
    }

    async fn run_actor(
        self,
        mut session: VehicleSession,
        interval: Duration,
        mut stop: watch::Receiver<bool>,
        mut refresh: mpsc::Receiver<()>,
    ) -> VehicleSession {
        loop {
            self.transition(TrackingState::Updating);
            let frame = self.tick(&mut session).await;

            if *stop.borrow() {
                info!("Tracking stopped during an update, discarding its result");
                break;
            }
            if let Some(frame) = frame {
                self.surface.clear();
                self.surface.render(&frame);
            }
            self.transition(TrackingState::Active);

            tokio::select! {
                biased;
                _ = stop.changed() => break,
                request = refresh.recv() => {
                    if request.is_none() {
                        break;
                    }
                    debug!("Manual refresh requested");
                }
                _ = tokio::time::sleep(interval) => {}
            }
        }

        self.transition(TrackingState::Stopped);
        session
    }

    /// One push/pull/assemble round. `None` leaves the map as it is.
    async fn tick(&self, session: &mut VehicleSession) -> Option<MapFrame> {
        let position = match self.position.current_position().await {
            Ok(position) => position,
            Err(e) => {
                warn!(error = %e, "Failed to read current position");
                return None;
            }
        };

        let waypoints = match self.server.update_location(&session.token, position).await {
            Ok(waypoints) => waypoints,
            Err(e) => {
                warn!(error = %e, "Failed to update location!");
                return None;
            }
        };
        session.record_position(position);

        let route = self.assembler.assemble(&waypoints).await;
        info!(
            position = %position,
            waypoints = waypoints.len(),
            distance_km = route.distance_km,
            "Location updated successfully!"
        );

        Some(MapFrame::new(position, &waypoints, route))
    }
}

/// Control side of a running [`TrackingLoop`].
///
/// Dropping the handle stops the loop after any in-flight tick.
pub struct TrackingHandle {
    stop: watch::Sender<bool>,
    refresh: mpsc::Sender<()>,
    state: watch::Receiver<TrackingState>,
    task: JoinHandle<VehicleSession>,
}

impl TrackingHandle {
    /// No further ticks are armed; a tick in flight completes but is not rendered.
    pub fn stop(&self) {
        self.stop.send_replace(true);
    }

    /// Runs a tick now instead of waiting for the interval. Returns `false`
    /// if a refresh is already pending or the loop has ended.
    pub fn refresh(&self) -> bool {
        self.refresh.try_send(()).is_ok()
    }

    pub fn state(&self) -> TrackingState {
        *self.state.borrow()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the loop to end and hands the session back.
    pub async fn join(self) -> Option<VehicleSession> {
        match self.task.await {
            Ok(session) => Some(session),
            Err(e) => {
                error!("Tracking task failed: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use async_trait::async_trait;
    use tokio::sync::Notify;
    use tokio::time::Instant;
    use super::*;
    use crate::handlers::map_surface::WatchSurface;
    use crate::handlers::path_cache::PathCache;
    use crate::handlers::position::FixedPosition;
    use crate::handlers::road_router::RoadRouter;
    use crate::handlers::route_assembler::SegmentMode;
    use crate::handlers::routing_service::tests::MockRoutingService;
    use crate::handlers::server_client::tests::MockTrackingServer;
    use crate::models::coordinate::Coordinate;
    use crate::models::error::TrackerError;
    use crate::models::wire::backend::VehicleRouteSegment;

    const INTERVAL: Duration = Duration::from_millis(3000);

    fn coord(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).unwrap()
    }

    fn device() -> Coordinate {
        coord(12.001, 77.001)
    }

    fn session() -> VehicleSession {
        VehicleSession::new("tok-1".to_string(), coord(12.0, 77.0))
    }

    fn tracking_loop(server: Arc<dyn TrackingServer>, position: Arc<dyn PositionSource>) -> (TrackingLoop, Arc<WatchSurface>) {
        let router = RoadRouter::new(Arc::new(MockRoutingService::new()), Arc::new(PathCache::new()));
        let assembler = RouteAssembler::new(Arc::new(router), SegmentMode::Sequential);
        let (surface, _) = WatchSurface::new();
        let surface = Arc::new(surface);
        let tracking = TrackingLoop::new(server, assembler, position, Arc::clone(&surface) as Arc<dyn MapSurface>);
        (tracking, surface)
    }

    #[tokio::test(start_paused = true)]
    async fn failed_push_does_not_stop_the_loop() {
        let route = vec![coord(12.0, 77.0), coord(12.1, 77.1), coord(12.2, 77.2)];
        let server = Arc::new(MockTrackingServer::new(Some("tok-1"), route.clone()));
        server.queue(Err(TrackerError::UpstreamRejection { status: 500, url: "update-location/".to_string() }));
        let (tracking, surface) = tracking_loop(server.clone(), Arc::new(FixedPosition(device())));
        let mut frames = surface.subscribe();

        let started = Instant::now();
        let handle = tracking.start(session(), INTERVAL);
        frames.wait_for(|frame| frame.is_some()).await.unwrap();

        assert_eq!(server.pushes(), 2);
        assert!(started.elapsed() >= INTERVAL);
        assert_ne!(handle.state(), TrackingState::Stopped);

        let frame = frames.borrow().clone().unwrap();
        assert_eq!(frame.center, device());
        assert_eq!(frame.segments.len(), 2);
        assert_eq!(frame.distance_km, 2.0);

        handle.stop();
        let session = handle.join().await.unwrap();
        assert_eq!(session.last_known_position, Some(device()));
        assert_eq!(tracking.state(), TrackingState::Stopped);
    }

    struct NoFix(AtomicUsize);

    #[async_trait]
    impl PositionSource for NoFix {
        async fn current_position(&self) -> Result<Coordinate, TrackerError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(TrackerError::Position("no fix".to_string()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_rearm_at_the_interval_without_a_fix() {
        let server = Arc::new(MockTrackingServer::new(Some("tok-1"), vec![]));
        let position = Arc::new(NoFix(AtomicUsize::new(0)));
        let (tracking, surface) = tracking_loop(server.clone(), position.clone());

        let handle = tracking.start(session(), INTERVAL);
        tokio::time::sleep(Duration::from_millis(7000)).await;

        assert_eq!(position.0.load(Ordering::SeqCst), 3);
        assert_eq!(server.pushes(), 0);
        assert_eq!(surface.rendered(), 0);

        handle.stop();
        let returned = handle.join().await.unwrap();
        assert_eq!(returned, session());
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_runs_a_tick_immediately() {
        let server = Arc::new(MockTrackingServer::new(Some("tok-1"), vec![coord(12.0, 77.0), coord(12.1, 77.1)]));
        let (tracking, surface) = tracking_loop(server.clone(), Arc::new(FixedPosition(device())));
        let mut frames = surface.subscribe();

        let started = Instant::now();
        let handle = tracking.start(session(), Duration::from_secs(3600));
        frames.wait_for(|frame| frame.is_some()).await.unwrap();
        assert!(handle.refresh());
        frames.wait_for(|_| surface.rendered() >= 2).await.unwrap();

        assert_eq!(server.pushes(), 2);
        assert!(started.elapsed() < Duration::from_secs(3600));
        handle.stop();
        handle.join().await.unwrap();
    }

    /// Holds every location push until released.
    struct GatedServer {
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl TrackingServer for GatedServer {
        async fn register_vehicle(&self, _registration: &str, _position: Coordinate) -> Result<String, TrackerError> {
            Ok("tok-1".to_string())
        }

        async fn update_location(&self, _token: &str, _position: Coordinate) -> Result<Vec<Coordinate>, TrackerError> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(vec![coord(12.0, 77.0), coord(12.1, 77.1)])
        }

        async fn fetch_optimized_routes(&self) -> Result<serde_json::Value, TrackerError> {
            Ok(serde_json::Value::Null)
        }

        async fn fetch_vehicle_route(&self, _vehicle_id: u64) -> Result<Vec<VehicleRouteSegment>, TrackerError> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn stop_discards_in_flight_result() {
        let server = Arc::new(GatedServer { entered: Notify::new(), release: Notify::new() });
        let (tracking, surface) = tracking_loop(server.clone(), Arc::new(FixedPosition(device())));

        let handle = tracking.start(session(), INTERVAL);
        server.entered.notified().await;
        assert_eq!(handle.state(), TrackingState::Updating);

        handle.stop();
        server.release.notify_one();
        handle.join().await.unwrap();

        assert_eq!(surface.rendered(), 0);
        assert_eq!(tracking.state(), TrackingState::Stopped);
    }

    #[tokio::test]
    async fn dropping_the_handle_stops_the_loop() {
        let server = Arc::new(MockTrackingServer::new(Some("tok-1"), vec![]));
        let (tracking, _surface) = tracking_loop(server, Arc::new(FixedPosition(device())));
        let mut state = tracking.subscribe_state();

        drop(tracking.start(session(), INTERVAL));

        state.wait_for(|s| *s == TrackingState::Stopped).await.unwrap();
    }
}
