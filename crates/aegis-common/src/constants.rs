//! Shared constants for Aegis components.

/// Default Warden HTTP listen address
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8787";

/// Default action name attached to token requests
pub const DEFAULT_ACTION: &str = "homepage";

/// Minimum allowed token refresh interval (seconds)
pub const MIN_REFRESH_INTERVAL_SECS: u64 = 60;

/// Maximum allowed token refresh interval (seconds)
pub const MAX_REFRESH_INTERVAL_SECS: u64 = 110;

/// Default token refresh interval (seconds)
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 110;

/// Provider tokens are valid for 2 minutes; refresh must beat this
pub const TOKEN_TTL_SECS: u64 = 120;

/// Default token issuance endpoint (local provider shim)
pub const DEFAULT_PROVIDER_ENDPOINT: &str = "http://127.0.0.1:9099/v1/token";

/// Default timeout for provider requests (seconds)
pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 10;

/// Maximum lifecycle events retained for the debug endpoint
pub const EVENT_LOG_CAPACITY: usize = 64;
