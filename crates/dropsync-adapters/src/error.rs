use thiserror::Error;

/// Fatal, whole-run failures raised by a supplier adapter.
///
/// Per-record problems never surface here; they travel inside
/// [`RawSupplierRecord`](crate::RawSupplierRecord) and fail at normalization.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("rate limited by {domain} (retry after {retry_after_secs}s)")]
    RateLimited {
        domain: String,
        retry_after_secs: u64,
    },

    #[error("endpoint not found: {url}")]
    NotFound { url: String },

    #[error("credentials rejected by {url} (HTTP {status})")]
    Unauthorized { status: u16, url: String },

    #[error("unexpected HTTP status {status} from {url}: {message}")]
    UnexpectedStatus {
        status: u16,
        url: String,
        message: String,
    },

    /// The supplier answered 2xx but reported an error in its envelope.
    #[error("{supplier} API returned error {code}: {message}")]
    Upstream {
        supplier: String,
        code: String,
        message: String,
    },

    #[error("pagination limit reached for {endpoint}: exceeded {max_pages} pages")]
    PaginationLimit { endpoint: String, max_pages: usize },

    #[error("missing credential for {connector}: expected one of {expected}")]
    MissingCredential { connector: String, expected: String },

    #[error("invalid credential for {connector}: {reason}")]
    InvalidCredential { connector: String, reason: String },

    #[error("invalid endpoint \"{endpoint}\": {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("{connector} does not support {operation}")]
    Unsupported {
        connector: String,
        operation: &'static str,
    },
}

impl AdapterError {
    /// Upstream HTTP status, when the failure carried one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            AdapterError::RateLimited { .. } => Some(429),
            AdapterError::NotFound { .. } => Some(404),
            AdapterError::Unauthorized { status, .. }
            | AdapterError::UnexpectedStatus { status, .. } => Some(*status),
            AdapterError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
