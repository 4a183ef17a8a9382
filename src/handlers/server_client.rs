use std::time::Duration;
use async_trait::async_trait;
use reqwest::Client;
use tracing::warn;
use crate::handlers::http::{build_client, decode_json, normalize_base_url, transport_error};
use crate::models::coordinate::Coordinate;
use crate::models::error::TrackerError;
use crate::models::wire::backend::{
    RegisterVehicleRequest, RegisterVehicleResponse, UpdateLocationRequest, UpdateLocationResponse,
    VehicleRouteSegment,
};

/// The tracking backend, as seen by a vehicle.
#[async_trait]
pub trait TrackingServer: Send + Sync {
    /// Registers the vehicle and returns its identity token.
    async fn register_vehicle(&self, registration: &str, position: Coordinate) -> Result<String, TrackerError>;

    /// Pushes the current position; answers with the vehicle's assigned route.
    async fn update_location(&self, token: &str, position: Coordinate) -> Result<Vec<Coordinate>, TrackerError>;

    async fn fetch_optimized_routes(&self) -> Result<serde_json::Value, TrackerError>;

    async fn fetch_vehicle_route(&self, vehicle_id: u64) -> Result<Vec<VehicleRouteSegment>, TrackerError>;
}

#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(address: &str, timeout: Duration) -> Result<Self, TrackerError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: normalize_base_url(address),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

#[async_trait]
impl TrackingServer for BackendClient {
    async fn register_vehicle(&self, registration: &str, position: Coordinate) -> Result<String, TrackerError> {
        let url = self.url("register-vehicle/");
        let request = RegisterVehicleRequest {
            registration,
            latitude: position.latitude(),
            longitude: position.longitude(),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(&url, e))?;

        let body: RegisterVehicleResponse = decode_json(&url, response).await?;
        Ok(body.data.token)
    }

    async fn update_location(&self, token: &str, position: Coordinate) -> Result<Vec<Coordinate>, TrackerError> {
        let url = self.url("update-location/");
        let request = UpdateLocationRequest {
            token,
            latitude: position.latitude(),
            longitude: position.longitude(),
        };

        let response = self
            .client
            .put(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(&url, e))?;

        let body: UpdateLocationResponse = decode_json(&url, response).await?;
        let route = body
            .route
            .into_iter()
            .filter_map(|point| match Coordinate::new(point.lat, point.lng) {
                Ok(coordinate) => Some(coordinate),
                Err(e) => {
                    warn!(error = %e, "Dropping invalid waypoint from server route");
                    None
                }
            })
            .collect();
        Ok(route)
    }

    async fn fetch_optimized_routes(&self) -> Result<serde_json::Value, TrackerError> {
        let url = self.url("get-optimized-routes/");
        let response = self.client.get(&url).send().await.map_err(|e| transport_error(&url, e))?;
        decode_json(&url, response).await
    }

    async fn fetch_vehicle_route(&self, vehicle_id: u64) -> Result<Vec<VehicleRouteSegment>, TrackerError> {
        let url = self.url(&format!("get-vehicle-route/{}/", vehicle_id));
        let response = self.client.get(&url).send().await.map_err(|e| transport_error(&url, e))?;
        decode_json(&url, response).await
    }
}
