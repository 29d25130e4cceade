//! Shared string constants for cache key namespaces, headers, and
//! user-facing envelope messages.

/// Key prefix for ordinary (non-grouped) request cache entries.
pub const CACHE_PREFIX_REQUEST: &str = "reqchain.request.";

/// Key prefix for grouped (batch) request cache entries.
pub const CACHE_PREFIX_GROUPED: &str = "reqchain.grouped.";

/// Fixed format applied to date/time values before they enter a cache key.
pub const CACHE_KEY_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const HEADER_CONTENT_TYPE: &str = "content-type";
pub const HEADER_CONTENT_DISPOSITION: &str = "content-disposition";
pub const HEADER_ACCEPT: &str = "accept";
pub const HEADER_USER_AGENT: &str = "user-agent";

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_TEXT: &str = "text/plain";

pub const USER_AGENT: &str = concat!("reqchain/", env!("CARGO_PKG_VERSION"));

// Envelope messages. Detailed diagnostics go into `details` in debug mode;
// these stay generic for callers.
pub const MSG_SUCCESSFUL: &str = "Successful";
pub const MSG_SUCCESSFUL_CACHED: &str = "Successful (cached)";
pub const MSG_GATEWAY_UNAVAILABLE: &str = "The data server is not responding";
pub const MSG_BAD_REQUEST: &str = "Bad request, please contact the service administrator";
pub const MSG_SERVER_ERROR: &str = "Remote server error, please try again later";
pub const MSG_UNPROCESSABLE: &str = "Data error, please contact the service administrator";
pub const MSG_INTERNAL: &str = "Internal error, please contact the service administrator";
