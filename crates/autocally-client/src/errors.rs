//! Application-level errors.

use autocally_api::ApiError;
use autocally_core::ConnectionError;
use autocally_session::SessionError;
use autocally_settings::SettingsError;
use thiserror::Error;

/// Errors surfaced by [`AppContext`](crate::AppContext).
#[derive(Debug, Error)]
pub enum ClientError {
    /// Settings could not be loaded.
    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// Session storage or channel failure.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Backend call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Real-time channel failure outside a login.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Operation needs a logged-in session.
    #[error("not logged in")]
    NotAuthenticated,
}

/// Result alias for application operations.
pub type Result<T> = std::result::Result<T, ClientError>;
