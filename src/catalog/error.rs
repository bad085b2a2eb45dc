//! Error types for catalog access and traversal.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from talking to the remote catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error requesting {endpoint}: {source}")]
    Network {
        /// The API endpoint that failed (credentials stripped).
        endpoint: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// HTTP error response (4xx client errors, 5xx server errors).
    #[error("HTTP {status} requesting {endpoint}")]
    HttpStatus {
        /// The API endpoint that returned an error status.
        endpoint: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The server answered with a `failed` API envelope.
    #[error("server error {code} on {endpoint}: {message}")]
    Api {
        /// The API endpoint.
        endpoint: String,
        /// OpenSubsonic error code (40 = wrong credentials, 70 = not found, ...).
        code: i32,
        /// Server-provided message.
        message: String,
    },

    /// The response body could not be decoded.
    #[error("unable to decode response from {endpoint}: {reason}")]
    Decode {
        /// The API endpoint.
        endpoint: String,
        /// What went wrong.
        reason: String,
    },

    /// A request URL could not be built.
    #[error("invalid request URL for {endpoint}: {source}")]
    InvalidUrl {
        /// The API endpoint.
        endpoint: String,
        /// The underlying parse error.
        #[source]
        source: url::ParseError,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {source}")]
    ClientBuild {
        /// The underlying builder error.
        #[source]
        source: reqwest::Error,
    },
}

impl CatalogError {
    /// Creates a network error from a reqwest error.
    pub fn network(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            endpoint: endpoint.into(),
            source,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(endpoint: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            endpoint: endpoint.into(),
            status,
        }
    }

    /// Creates an API error from a `failed` envelope.
    pub fn api(endpoint: impl Into<String>, code: i32, message: impl Into<String>) -> Self {
        Self::Api {
            endpoint: endpoint.into(),
            code,
            message: message.into(),
        }
    }

    /// Creates a decode error.
    pub fn decode(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Decode {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }
}

/// Fatal errors during catalog traversal. No partial work list survives one.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// A remote listing failed.
    #[error("catalog discovery failed while listing {container}: {source}")]
    Remote {
        /// What was being listed: `index` or a container id.
        container: String,
        /// The underlying catalog error.
        #[source]
        source: CatalogError,
    },

    /// A local directory could not be created.
    #[error("unable to create directory {path}: {source}")]
    Io {
        /// The directory path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl DiscoveryError {
    /// Wraps a catalog error with the container being listed.
    pub fn remote(container: impl Into<String>, source: CatalogError) -> Self {
        Self::Remote {
            container: container.into(),
            source,
        }
    }

    /// Creates a directory creation error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
