use std::time::Duration;
use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, trace};
use crate::models::coordinate::Coordinate;
use crate::models::error::TrackerError;

pub const GPSD_DEFAULT_ADDR: &str = "127.0.0.1:2947";

const WATCH_COMMAND: &[u8] = b"?WATCH={\"enable\":true,\"json\":true};\n";

/// Where the device's own position comes from.
#[async_trait]
pub trait PositionSource: Send + Sync {
    async fn current_position(&self) -> Result<Coordinate, TrackerError>;
}

pub struct FixedPosition(pub Coordinate);

#[async_trait]
impl PositionSource for FixedPosition {
    async fn current_position(&self) -> Result<Coordinate, TrackerError> {
        Ok(self.0)
    }
}

/// Reads the current fix from a gpsd daemon.
///
/// Every call opens a short-lived connection, enables JSON watch mode and
/// returns the first `TPV` report that carries a position.
pub struct GpsdPosition {
    addr: String,
    timeout: Duration,
}

#[derive(Deserialize)]
struct GpsdReport {
    class: String,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
}

impl GpsdPosition {
    pub fn new(addr: &str, timeout: Duration) -> Self {
        Self { addr: addr.to_string(), timeout }
    }

    async fn read_fix(&self) -> Result<Coordinate, TrackerError> {
        let stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|e| TrackerError::Position(format!("Cannot connect to gpsd at {}: {}", self.addr, e)))?;
        let (reader, mut writer) = stream.into_split();
        writer
            .write_all(WATCH_COMMAND)
            .await
            .map_err(|e| TrackerError::Position(format!("Cannot enable gpsd watch: {}", e)))?;

        let mut lines = BufReader::new(reader).lines();
        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| TrackerError::Position(format!("gpsd read failed: {}", e)))?
        {
            trace!(line = line.as_str(), "gpsd report");
            let report = match serde_json::from_str::<GpsdReport>(&line) {
                Ok(report) => report,
                Err(_) => continue,
            };
            if report.class != "TPV" {
                continue;
            }
            if let (Some(lat), Some(lon)) = (report.lat, report.lon) {
                let fix = Coordinate::new(lat, lon)?;
                debug!(position = %fix, "gpsd fix");
                return Ok(fix);
            }
        }

        Err(TrackerError::Position("gpsd closed the connection without a fix".to_string()))
    }
}

#[async_trait]
impl PositionSource for GpsdPosition {
    async fn current_position(&self) -> Result<Coordinate, TrackerError> {
        tokio::time::timeout(self.timeout, self.read_fix())
            .await
            .map_err(|_| TrackerError::Position(format!("No gpsd fix within {:?}", self.timeout)))?
    }
}
