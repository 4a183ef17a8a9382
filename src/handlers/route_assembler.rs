use std::str::FromStr;
use std::sync::Arc;
use futures::future::join_all;
use tracing::debug;
use crate::handlers::road_router::RoadRouter;
use crate::models::coordinate::Coordinate;
use crate::models::error::TrackerError;
use crate::models::path::PathResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SegmentMode {
    /// One routing request at a time, in waypoint order.
    #[default]
    Sequential,
    /// All pairs requested together and joined before stitching.
    Concurrent,
}

impl FromStr for SegmentMode {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" => Ok(SegmentMode::Sequential),
            "concurrent" => Ok(SegmentMode::Concurrent),
            other => Err(TrackerError::Config(format!("Unknown segment mode {}", other))),
        }
    }
}

/// A waypoint sequence stitched into one road path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssembledRoute {
    pub path: Vec<Coordinate>,
    pub distance_km: f64,
    /// One entry per consecutive waypoint pair, in order; unresolved pairs are empty.
    pub segments: Vec<Arc<PathResult>>,
}

impl AssembledRoute {
    pub fn instructions(&self) -> Vec<String> {
        self.segments
            .iter()
            .flat_map(|segment| segment.instructions.iter().cloned())
            .collect()
    }

    /// Non-empty segment polylines, for per-segment rendering.
    pub fn segment_paths(&self) -> Vec<Vec<Coordinate>> {
        self.segments
            .iter()
            .filter(|segment| !segment.is_empty())
            .map(|segment| segment.geometry.clone())
            .collect()
    }

    pub fn unresolved_segments(&self) -> usize {
        self.segments.iter().filter(|segment| segment.is_empty()).count()
    }
}

#[derive(Clone)]
pub struct RouteAssembler {
    router: Arc<RoadRouter>,
    mode: SegmentMode,
}

impl RouteAssembler {
    pub fn new(router: Arc<RoadRouter>, mode: SegmentMode) -> Self {
        Self { router, mode }
    }

    pub async fn assemble(&self, waypoints: &[Coordinate]) -> AssembledRoute {
        if waypoints.len() < 2 {
            return AssembledRoute::default();
        }

        let segments = match self.mode {
            SegmentMode::Sequential => {
                let mut segments = Vec::with_capacity(waypoints.len() - 1);
                for pair in waypoints.windows(2) {
                    segments.push(self.router.resolve(pair[0], pair[1]).await);
                }
                segments
            }
            SegmentMode::Concurrent => {
                join_all(waypoints.windows(2).map(|pair| self.router.resolve(pair[0], pair[1]))).await
            }
        };

        let mut route = AssembledRoute {
            path: Vec::new(),
            distance_km: 0.0,
            segments: Vec::with_capacity(segments.len()),
        };
        for segment in segments {
            route.path.extend_from_slice(&segment.geometry);
            route.distance_km += segment.distance_km;
            route.segments.push(segment);
        }

        debug!(
            waypoints = waypoints.len(),
            points = route.path.len(),
            distance_km = route.distance_km,
            unresolved = route.unresolved_segments(),
            "Route assembled"
        );
        route
    }
}
