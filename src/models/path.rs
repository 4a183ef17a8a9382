use crate::models::coordinate::Coordinate;

/// Road-accurate path between two points as resolved by the routing service.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PathResult {
    pub geometry: Vec<Coordinate>,
    pub distance_km: f64,
    pub instructions: Vec<String>,
}

impl PathResult {
    /// The degraded result used when a segment cannot be resolved.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.geometry.is_empty()
    }
}
