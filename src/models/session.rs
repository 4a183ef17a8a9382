use crate::models::coordinate::Coordinate;

/// Identity of the registered vehicle plus its last successfully pushed position.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleSession {
    pub token: String,
    /// `None` until the first push when the token was loaded from disk.
    pub last_known_position: Option<Coordinate>,
}

impl VehicleSession {
    pub fn new(token: String, position: Coordinate) -> Self {
        Self { token, last_known_position: Some(position) }
    }

    /// A session resumed from a stored token, before any fix is known.
    pub fn resumed(token: String) -> Self {
        Self { token, last_known_position: None }
    }

    pub fn record_position(&mut self, position: Coordinate) {
        self.last_known_position = Some(position);
    }
}
