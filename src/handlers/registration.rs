use std::sync::Arc;
use tracing::{error, info};
use crate::handlers::server_client::TrackingServer;
use crate::handlers::token_store::TokenStore;
use crate::models::coordinate::Coordinate;
use crate::models::error::TrackerError;
use crate::models::session::VehicleSession;

/// Obtains the vehicle's identity token once and keeps it on disk.
pub struct RegistrationFlow {
    server: Arc<dyn TrackingServer>,
    store: TokenStore,
}

impl RegistrationFlow {
    pub fn new(server: Arc<dyn TrackingServer>, store: TokenStore) -> Self {
        Self { server, store }
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// A session from the persisted token, if there is one. Needs no fix.
    pub fn load_session(&self) -> Result<Option<VehicleSession>, TrackerError> {
        Ok(self.store.load()?.map(VehicleSession::resumed))
    }

    /// Registers `identifier` at `position` and persists the returned token.
    ///
    /// Every failure collapses into [`TrackerError::Registration`] with the
    /// user-facing message; the cause is logged. The flow can be retried.
    pub async fn register(&self, identifier: &str, position: Coordinate) -> Result<VehicleSession, TrackerError> {
        let token = self
            .server
            .register_vehicle(identifier, position)
            .await
            .map_err(|e| {
                error!(registration = identifier, error = %e, "Vehicle registration failed");
                TrackerError::registration_failed()
            })?;

        if token.trim().is_empty() {
            error!(registration = identifier, "Server returned an empty token");
            return Err(TrackerError::registration_failed());
        }

        // The token is still good for this run even if it could not be written.
        if let Err(e) = self.store.save(&token) {
            error!(path = %self.store.path().display(), error = %e, "Failed to persist vehicle token");
        }

        info!(registration = identifier, "Vehicle registered");
        Ok(VehicleSession::new(token, position))
    }
}
