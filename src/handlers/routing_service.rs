use std::time::Duration;
use async_trait::async_trait;
use reqwest::Client;
use tracing::trace;
use crate::handlers::http::{build_client, decode_json, normalize_base_url, transport_error};
use crate::models::coordinate::Coordinate;
use crate::models::error::TrackerError;
use crate::models::wire::RouteResponse;

pub const OSRM_PUBLIC_URL: &str = "http://router.project-osrm.org";

/// External service that answers "how do I drive from A to B".
#[async_trait]
pub trait RoutingService: Send + Sync {
    async fn driving_route(&self, start: Coordinate, end: Coordinate) -> Result<RouteResponse, TrackerError>;
}

/// OSRM HTTP client. Requests full GeoJSON geometry and per-step maneuvers.
#[derive(Clone)]
pub struct OsrmClient {
    client: Client,
    base_url: String,
}

impl OsrmClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TrackerError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: normalize_base_url(base_url),
        })
    }

    pub fn route_url(&self, start: Coordinate, end: Coordinate) -> String {
        format!(
            "{}/route/v1/driving/{},{};{},{}?overview=full&steps=true&geometries=geojson",
            self.base_url,
            start.longitude(),
            start.latitude(),
            end.longitude(),
            end.latitude()
        )
    }
}

#[async_trait]
impl RoutingService for OsrmClient {
    async fn driving_route(&self, start: Coordinate, end: Coordinate) -> Result<RouteResponse, TrackerError> {
        let url = self.route_url(start, end);
        trace!(url = url.as_str(), "Routing request starting");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| transport_error(&url, e))?;

        decode_json(&url, response).await
    }
}
