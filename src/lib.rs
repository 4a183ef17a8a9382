//! Live vehicle tracking: pushes the device position to the backend, pulls
//! the assigned route and draws it with road-accurate geometry from an OSRM
//! routing service, caching every resolved segment.

pub mod config;
pub mod handlers;
pub mod models;

pub use handlers::path_cache::PathCache;
pub use handlers::road_router::RoadRouter;
pub use handlers::route_assembler::{AssembledRoute, RouteAssembler, SegmentMode};
pub use handlers::tracker::VehicleTracker;
pub use handlers::tracking_loop::{TrackingHandle, TrackingLoop, TrackingState};
pub use models::coordinate::{Coordinate, PathKey};
pub use models::error::TrackerError;
pub use models::path::PathResult;
pub use models::session::VehicleSession;
