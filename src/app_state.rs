//! State shared by every request handler.

use std::sync::{Arc, Mutex};

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use rusqlite::Connection;
use sha2::{Digest, Sha512};
use time::Duration;

use crate::{
    Error, auth::DEFAULT_COOKIE_DURATION, category::seed_predefined_categories, db::initialize,
};

/// Everything a handler may need: the cookie key, session length, timezone
/// and the database.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Encrypts the auth cookie.
    pub cookie_key: Key,

    /// How long a session lasts after the user's last request.
    pub cookie_duration: Duration,

    /// Canonical timezone name used for "today" and the current month, e.g. "Pacific/Auckland".
    pub local_timezone: String,

    /// The application database, shared by all requests.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl AppState {
    /// Wrap `db_connection` for sharing across requests after creating any
    /// missing tables and predefined categories.
    ///
    /// The caller is responsible for checking `local_timezone` is valid.
    ///
    /// # Errors
    /// Returns an error if the tables or categories cannot be created.
    pub fn new(
        db_connection: Connection,
        cookie_secret: &str,
        local_timezone: &str,
    ) -> Result<Self, Error> {
        initialize(&db_connection)?;
        let (created, _) = seed_predefined_categories(&db_connection)?;

        if created > 0 {
            tracing::info!("Created {created} predefined categories");
        }

        Ok(Self {
            cookie_key: create_cookie_key(cookie_secret),
            cookie_duration: DEFAULT_COOKIE_DURATION,
            local_timezone: local_timezone.to_owned(),
            db_connection: Arc::new(Mutex::new(db_connection)),
        })
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// Derive the cookie key from `secret` so it survives restarts.
pub fn create_cookie_key(secret: &str) -> Key {
    Key::from(&Sha512::digest(secret))
}
