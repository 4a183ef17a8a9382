use std::env;
use std::path::PathBuf;
use std::time::Duration;
use once_cell::sync::Lazy;
use crate::handlers::position::GPSD_DEFAULT_ADDR;
use crate::handlers::route_assembler::SegmentMode;
use crate::handlers::routing_service::OSRM_PUBLIC_URL;
use crate::handlers::tracking_loop::DEFAULT_TICK_INTERVAL;
use crate::models::coordinate::Coordinate;
use crate::models::error::TrackerError;

pub static CONFIG: Lazy<Result<TrackerConfig, TrackerError>> = Lazy::new(TrackerConfig::from_env);

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Backend `host:port`, optionally with scheme and path prefix.
    pub address: String,
    pub routing_url: String,
    pub token_file: PathBuf,
    pub tick_interval: Duration,
    pub http_timeout: Duration,
    pub gpsd_addr: String,
    pub fixed_position: Option<Coordinate>,
    pub registration: Option<String>,
    pub segment_mode: SegmentMode,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            address: "localhost:8000".to_string(),
            routing_url: OSRM_PUBLIC_URL.to_string(),
            token_file: PathBuf::from(".env"),
            tick_interval: DEFAULT_TICK_INTERVAL,
            http_timeout: Duration::from_secs(30),
            gpsd_addr: GPSD_DEFAULT_ADDR.to_string(),
            fixed_position: None,
            registration: None,
            segment_mode: SegmentMode::Sequential,
        }
    }
}

impl TrackerConfig {
    pub fn from_env() -> Result<Self, TrackerError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; unset or unparseable
    /// numbers fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, TrackerError> {
        let defaults = TrackerConfig::default();
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let positive = |key: &str| var(key).and_then(|v| v.parse::<u64>().ok()).filter(|v| *v > 0);

        let fixed_position = match var("FIXED_POSITION") {
            Some(value) => Some(parse_position(&value)?),
            None => None,
        };
        let segment_mode = match var("SEGMENT_MODE") {
            Some(value) => value.parse()?,
            None => defaults.segment_mode,
        };

        Ok(Self {
            address: var("ADDRESS").unwrap_or(defaults.address),
            routing_url: var("ROUTING_URL").unwrap_or(defaults.routing_url),
            token_file: var("TOKEN_FILE").map(PathBuf::from).unwrap_or(defaults.token_file),
            tick_interval: positive("TICK_INTERVAL_MS").map(Duration::from_millis).unwrap_or(defaults.tick_interval),
            http_timeout: positive("HTTP_TIMEOUT_SECS").map(Duration::from_secs).unwrap_or(defaults.http_timeout),
            gpsd_addr: var("GPSD_ADDR").unwrap_or(defaults.gpsd_addr),
            fixed_position,
            registration: var("VEHICLE_REGISTRATION"),
            segment_mode,
        })
    }
}

/// Parses `"lat,lon"`.
pub fn parse_position(value: &str) -> Result<Coordinate, TrackerError> {
    let invalid = || TrackerError::Config(format!("Invalid position {:?}, expected \"lat,lon\"", value));
    let (lat, lon) = value.split_once(',').ok_or_else(invalid)?;
    let lat = lat.trim().parse::<f64>().map_err(|_| invalid())?;
    let lon = lon.trim().parse::<f64>().map_err(|_| invalid())?;
    Coordinate::new(lat, lon).map_err(|e| TrackerError::Config(e.to_string()))
}
