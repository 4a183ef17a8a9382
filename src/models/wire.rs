//! JSON payloads exchanged with the backend and the routing service.

use serde::{Deserialize, Serialize};

pub mod backend {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize)]
    pub struct RegisterVehicleRequest<'a> {
        pub registration: &'a str,
        pub latitude: f64,
        pub longitude: f64,
    }

    #[derive(Debug, Deserialize)]
    pub struct RegisterVehicleResponse {
        pub data: RegisteredVehicle,
    }

    #[derive(Debug, Deserialize)]
    pub struct RegisteredVehicle {
        pub token: String,
    }

    #[derive(Debug, Serialize)]
    pub struct UpdateLocationRequest<'a> {
        pub token: &'a str,
        pub latitude: f64,
        pub longitude: f64,
    }

    #[derive(Debug, Deserialize)]
    pub struct UpdateLocationResponse {
        #[serde(default)]
        pub route: Vec<WaypointPayload>,
    }

    #[derive(Debug, Clone, Copy, Serialize, Deserialize)]
    pub struct WaypointPayload {
        pub lat: f64,
        pub lng: f64,
    }

    /// One coloured polyline of `get-vehicle-route/<id>/`.
    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    pub struct VehicleRouteSegment {
        #[serde(rename = "type", default)]
        pub kind: String,
        #[serde(default)]
        pub path: Vec<crate::models::coordinate::Coordinate>,
    }
}

/// Driving route answer: `GET /route/v1/driving/{lon},{lat};{lon},{lat}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteResponse {
    pub code: String,
    #[serde(default)]
    pub routes: Vec<RoutePayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutePayload {
    pub geometry: GeometryPayload,
    /// Metres.
    pub distance: f64,
    #[serde(default)]
    pub legs: Vec<LegPayload>,
}

/// GeoJSON line string; positions are `[lon, lat]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeometryPayload {
    pub coordinates: Vec<[f64; 2]>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LegPayload {
    #[serde(default)]
    pub steps: Vec<StepPayload>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepPayload {
    #[serde(default)]
    pub maneuver: Option<ManeuverPayload>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManeuverPayload {
    #[serde(default)]
    pub instruction: Option<String>,
}

impl StepPayload {
    pub fn instruction(&self) -> String {
        self.maneuver
            .as_ref()
            .and_then(|m| m.instruction.clone())
            .unwrap_or_default()
    }
}
