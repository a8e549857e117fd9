//! Wire names and lifecycle defaults shared across crates.

/// Storage key holding the bearer token.
pub const STORAGE_KEY_TOKEN: &str = "token";
/// Storage key holding the username.
pub const STORAGE_KEY_USERNAME: &str = "username";

/// Socket.IO endpoint path.
pub const SOCKET_PATH: &str = "/socket.io";
/// Prefix of every REST endpoint.
pub const API_PREFIX: &str = "/api";

/// Query parameter carrying the active call.
pub const QUERY_CALL_ID: &str = "call_id";
/// Query parameter carrying the active phone number.
pub const QUERY_PHONE_NUMBER_ID: &str = "phone_number_id";

/// Emitted by the server right after a socket connects.
pub const EVENT_CONNECTION_ESTABLISHED: &str = "connection_established";
/// Liveness probe sent by the client.
pub const EVENT_CONNECTION_CHECK: &str = "connection_check";
/// Server reply to [`EVENT_CONNECTION_CHECK`].
pub const EVENT_CONNECTION_CHECK_RESPONSE: &str = "connection_check_response";

/// Reconnection attempts before giving up.
pub const DEFAULT_RECONNECTION_ATTEMPTS: u32 = 5;
/// Fixed delay between reconnection attempts.
pub const DEFAULT_RECONNECTION_DELAY_MS: u64 = 1_000;
/// Bound on a single handshake.
pub const DEFAULT_HANDSHAKE_TIMEOUT_MS: u64 = 20_000;
/// Bound on the round-trip diagnostic.
pub const DEFAULT_ROUND_TRIP_TIMEOUT_MS: u64 = 5_000;
