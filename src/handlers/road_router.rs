use std::sync::Arc;
use once_cell::sync::Lazy;
use tracing::{debug, warn};
use crate::handlers::path_cache::PathCache;
use crate::handlers::routing_service::RoutingService;
use crate::models::coordinate::{Coordinate, PathKey};
use crate::models::error::TrackerError;
use crate::models::path::PathResult;
use crate::models::wire::RouteResponse;

static EMPTY_PATH: Lazy<Arc<PathResult>> = Lazy::new(|| Arc::new(PathResult::empty()));

/// Resolves road paths between coordinate pairs, hitting the routing
/// service only on a cache miss.
///
/// Resolution never fails: any transport, status or payload problem degrades
/// to an empty [`PathResult`] so one bad segment cannot sink a whole route.
/// Failed lookups are not cached and are retried on the next request.
pub struct RoadRouter {
    service: Arc<dyn RoutingService>,
    cache: Arc<PathCache>,
}

impl RoadRouter {
    pub fn new(service: Arc<dyn RoutingService>, cache: Arc<PathCache>) -> Self {
        Self { service, cache }
    }

    pub fn cache(&self) -> &Arc<PathCache> {
        &self.cache
    }

    pub async fn resolve(&self, start: Coordinate, end: Coordinate) -> Arc<PathResult> {
        let key = PathKey::new(start, end);

        if let Some(hit) = self.cache.get(&key) {
            debug!(key = %key, "Road path cache hit");
            return hit;
        }
        debug!(key = %key, "Road path cache miss");

        match self.fetch(start, end).await {
            Ok(result) => {
                let result = Arc::new(result);
                self.cache.put(key, Arc::clone(&result));
                result
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Error getting road path");
                Arc::clone(&EMPTY_PATH)
            }
        }
    }

    async fn fetch(&self, start: Coordinate, end: Coordinate) -> Result<PathResult, TrackerError> {
        let response = self.service.driving_route(start, end).await?;
        into_path_result(response)
    }
}

/// Converts an OSRM answer into a [`PathResult`], swapping `[lon, lat]`
/// positions into [`Coordinate`] order and metres into kilometres.
pub fn into_path_result(response: RouteResponse) -> Result<PathResult, TrackerError> {
    if response.code != "Ok" {
        return Err(TrackerError::RoutingStatus(response.code));
    }

    let route = response
        .routes
        .into_iter()
        .next()
        .ok_or_else(|| TrackerError::MalformedResponse("no routes in response".to_string()))?;

    let geometry = route
        .geometry
        .coordinates
        .iter()
        .map(|[lon, lat]| Coordinate::new(*lat, *lon))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| TrackerError::MalformedResponse(e.to_string()))?;

    let instructions = route
        .legs
        .iter()
        .flat_map(|leg| leg.steps.iter().map(|step| step.instruction()))
        .collect();

    Ok(PathResult {
        geometry,
        distance_km: route.distance / 1000.0,
        instructions,
    })
}
