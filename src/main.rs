//! Vehicle tracker.
//!
//! Run with
//! ```not_rust
//! ADDRESS=192.168.1.20:8000 cargo run
//! ```
//!
//! Without a stored `VEHICLE_TOKEN` the tracker asks for the vehicle
//! registration on stdin (or takes `VEHICLE_REGISTRATION`) before tracking starts.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vehicle_tracker::config::{TrackerConfig, CONFIG};
use vehicle_tracker::handlers::map_surface::{MapSurface, WatchSurface};
use vehicle_tracker::handlers::position::{FixedPosition, GpsdPosition, PositionSource};
use vehicle_tracker::handlers::registration::RegistrationFlow;
use vehicle_tracker::handlers::routing_service::OsrmClient;
use vehicle_tracker::handlers::server_client::{BackendClient, TrackingServer};
use vehicle_tracker::handlers::token_store::TokenStore;
use vehicle_tracker::{PathCache, RoadRouter, RouteAssembler, TrackerError, TrackingLoop, TrackingState, VehicleTracker};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vehicle_tracker=debug,VehicleTracker=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match CONFIG.as_ref() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(2);
        }
    };

    if let Err(e) = run(config).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(config: &TrackerConfig) -> Result<(), TrackerError> {
    info!("Backend at {}, routing via {}", config.address, config.routing_url);

    let server: Arc<dyn TrackingServer> = Arc::new(BackendClient::new(&config.address, config.http_timeout)?);
    let routing = Arc::new(OsrmClient::new(&config.routing_url, config.http_timeout)?);
    let position: Arc<dyn PositionSource> = match config.fixed_position {
        Some(fixed) => Arc::new(FixedPosition(fixed)),
        None => Arc::new(GpsdPosition::new(&config.gpsd_addr, config.http_timeout)),
    };

    let (surface, mut frames) = WatchSurface::new();
    tokio::spawn(async move {
        while frames.changed().await.is_ok() {
            if let Some(frame) = frames.borrow().as_ref() {
                info!(
                    center = %frame.center,
                    markers = frame.markers.len(),
                    segments = frame.segments.len(),
                    distance_km = frame.distance_km,
                    "Map updated"
                );
            }
        }
    });
    let surface: Arc<dyn MapSurface> = Arc::new(surface);

    let router = RoadRouter::new(routing, Arc::new(PathCache::new()));
    let assembler = RouteAssembler::new(Arc::new(router), config.segment_mode);
    let tracking = TrackingLoop::new(Arc::clone(&server), assembler, Arc::clone(&position), surface);
    let registration = RegistrationFlow::new(server, TokenStore::new(&config.token_file));
    let mut tracker = VehicleTracker::new(registration, tracking, position, config.tick_interval);

    if tracker.bootstrap().await? == TrackingState::AwaitingToken {
        register(&mut tracker, config.registration.as_deref()).await?;
    }

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| TrackerError::Config(format!("Cannot listen for shutdown signal: {}", e)))?;
    info!("Shutting down");
    tracker.stop().await;
    Ok(())
}

/// Tries the configured registration first, then keeps prompting on stdin.
async fn register(tracker: &mut VehicleTracker, configured: Option<&str>) -> Result<(), TrackerError> {
    if let Some(identifier) = configured {
        match tracker.register(identifier).await {
            Ok(()) => return Ok(()),
            Err(e) => warn!("{}", e),
        }
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        println!("Vehicle Registration:");
        let line = lines
            .next_line()
            .await
            .map_err(|e| TrackerError::Config(format!("Cannot read registration from stdin: {}", e)))?;
        let Some(identifier) = line else {
            return Err(TrackerError::Config("stdin closed before the vehicle was registered".to_string()));
        };
        let identifier = identifier.trim();
        if identifier.is_empty() {
            continue;
        }

        match tracker.register(identifier).await {
            Ok(()) => return Ok(()),
            Err(e) => println!("{}", e),
        }
    }
}
