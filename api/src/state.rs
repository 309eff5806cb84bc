//! Application state shared across Axum route handlers.

use sea_orm::DatabaseConnection;
use services::qr_token::TokenSigner;

/// Central application state: the database connection pool and the QR token
/// signer built from the configured secret.
#[derive(Clone)]
pub struct AppState {
    db: DatabaseConnection,
    signer: TokenSigner,
}

impl AppState {
    pub fn new(db: DatabaseConnection, signer: TokenSigner) -> Self {
        Self { db, signer }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn db_clone(&self) -> DatabaseConnection {
        self.db.clone()
    }

    pub fn signer(&self) -> &TokenSigner {
        &self.signer
    }
}
