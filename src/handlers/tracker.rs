use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;
use crate::handlers::position::PositionSource;
use crate::handlers::registration::RegistrationFlow;
use crate::handlers::tracking_loop::{TrackingHandle, TrackingLoop, TrackingState};
use crate::models::error::TrackerError;
use crate::models::session::VehicleSession;

/// Application lifecycle: load-or-register the vehicle, then keep it tracked.
pub struct VehicleTracker {
    registration: RegistrationFlow,
    tracking: TrackingLoop,
    position: Arc<dyn PositionSource>,
    interval: Duration,
    handle: Option<TrackingHandle>,
}

impl VehicleTracker {
    pub fn new(
        registration: RegistrationFlow,
        tracking: TrackingLoop,
        position: Arc<dyn PositionSource>,
        interval: Duration,
    ) -> Self {
        Self { registration, tracking, position, interval, handle: None }
    }

    pub fn state(&self) -> TrackingState {
        self.tracking.state()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<TrackingState> {
        self.tracking.subscribe_state()
    }

    pub fn handle(&self) -> Option<&TrackingHandle> {
        self.handle.as_ref()
    }

    /// Starts tracking straight away when a token is already stored,
    /// otherwise waits for [`VehicleTracker::register`]. A stored token
    /// starts tracking even without a position fix; ticks skip until one arrives.
    pub async fn bootstrap(&mut self) -> Result<TrackingState, TrackerError> {
        if self.state() != TrackingState::Idle {
            return Ok(self.state());
        }

        match self.registration.load_session()? {
            Some(session) => {
                info!("Found stored vehicle token");
                self.start(session);
            }
            None => self.tracking.transition(TrackingState::AwaitingToken),
        }
        Ok(self.state())
    }

    /// Registers at the current position and starts tracking. On failure the
    /// tracker stays in `AwaitingToken` and the call may be repeated.
    pub async fn register(&mut self, identifier: &str) -> Result<(), TrackerError> {
        if self.state() != TrackingState::AwaitingToken {
            return Err(TrackerError::Registration(format!("Cannot register while {}", self.state())));
        }

        let position = self.position.current_position().await?;
        let session = self.registration.register(identifier, position).await?;
        self.start(session);
        Ok(())
    }

    fn start(&mut self, session: VehicleSession) {
        self.handle = Some(self.tracking.start(session, self.interval));
    }

    /// Ends tracking and returns the final session, if tracking had started.
    pub async fn stop(&mut self) -> Option<VehicleSession> {
        let handle = self.handle.take()?;
        handle.stop();
        handle.join().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use async_trait::async_trait;
    use crate::handlers::map_surface::LogSurface;
    use crate::handlers::path_cache::PathCache;
    use crate::handlers::position::FixedPosition;
    use crate::handlers::road_router::RoadRouter;
    use crate::handlers::route_assembler::{RouteAssembler, SegmentMode};
    use crate::handlers::routing_service::tests::MockRoutingService;
    use crate::handlers::server_client::tests::MockTrackingServer;
    use crate::handlers::token_store::TokenStore;
    use crate::models::coordinate::Coordinate;
    use crate::models::error::REGISTRATION_FAILED;

    struct NoFix(AtomicUsize);

    #[async_trait]
    impl PositionSource for NoFix {
        async fn current_position(&self) -> Result<Coordinate, TrackerError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(TrackerError::Position("no fix".to_string()))
        }
    }

    fn tracker(server: Arc<MockTrackingServer>, store: TokenStore) -> VehicleTracker {
        let position: Arc<dyn PositionSource> = Arc::new(FixedPosition(Coordinate::new(12.0, 77.0).unwrap()));
        tracker_at(server, store, position)
    }

    fn tracker_at(server: Arc<MockTrackingServer>, store: TokenStore, position: Arc<dyn PositionSource>) -> VehicleTracker {
        let router = RoadRouter::new(Arc::new(MockRoutingService::new()), Arc::new(PathCache::new()));
        let assembler = RouteAssembler::new(Arc::new(router), SegmentMode::Sequential);
        let tracking = TrackingLoop::new(server.clone(), assembler, Arc::clone(&position), Arc::new(LogSurface));
        VehicleTracker::new(RegistrationFlow::new(server, store), tracking, position, Duration::from_secs(3))
    }

    #[tokio::test]
    async fn without_token_waits_for_registration() {
        let dir = tempfile::tempdir().unwrap();
        let server = Arc::new(MockTrackingServer::new(Some("tok-1"), vec![]));
        let mut tracker = tracker(server.clone(), TokenStore::new(dir.path().join(".env")));

        assert_eq!(tracker.state(), TrackingState::Idle);
        assert_eq!(tracker.bootstrap().await.unwrap(), TrackingState::AwaitingToken);
        assert!(tracker.handle().is_none());
        assert_eq!(server.pushes(), 0);
    }

    #[tokio::test]
    async fn stored_token_starts_tracking() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join(".env"));
        store.save("tok-saved").unwrap();
        let server = Arc::new(MockTrackingServer::new(None, vec![]));
        let mut tracker = tracker(server.clone(), store);

        let state = tracker.bootstrap().await.unwrap();
        assert!(matches!(state, TrackingState::Active | TrackingState::Updating));

        let session = tracker.stop().await.unwrap();
        assert_eq!(session.token, "tok-saved");
        assert_eq!(tracker.state(), TrackingState::Stopped);
        assert_eq!(server.registrations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stored_token_starts_tracking_without_a_fix() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join(".env"));
        store.save("tok-saved").unwrap();
        let server = Arc::new(MockTrackingServer::new(None, vec![]));
        let position = Arc::new(NoFix(AtomicUsize::new(0)));
        let mut tracker = tracker_at(server.clone(), store, position.clone());

        let state = tracker.bootstrap().await.unwrap();
        assert!(matches!(state, TrackingState::Active | TrackingState::Updating));

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(position.0.load(Ordering::SeqCst) >= 2);
        assert_eq!(server.pushes(), 0);
        assert!(!tracker.handle().unwrap().is_finished());

        let session = tracker.stop().await.unwrap();
        assert_eq!(session.token, "tok-saved");
        assert_eq!(session.last_known_position, None);
        assert_eq!(tracker.state(), TrackingState::Stopped);
    }

    #[tokio::test]
    async fn failed_registration_stays_awaiting_token() {
        let dir = tempfile::tempdir().unwrap();
        let server = Arc::new(MockTrackingServer::new(None, vec![]));
        let mut tracker = tracker(server, TokenStore::new(dir.path().join(".env")));
        tracker.bootstrap().await.unwrap();

        let err = tracker.register("ABC123").await.unwrap_err();

        assert_eq!(err.to_string(), REGISTRATION_FAILED);
        assert_eq!(tracker.state(), TrackingState::AwaitingToken);
        assert!(tracker.stop().await.is_none());
    }
}
