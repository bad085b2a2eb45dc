//! Server address parsing.
//!
//! A single address string such as `music.local`, `https://music.example.com`
//! or `[::1]:4533` is turned into a [`ServerLocation`] once, at startup.
//! Protocol and port may each be inferred from the other, but never both
//! from nothing: an address with neither falls back to `http` on 8080.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use url::Url;

/// Port used when neither protocol nor port is given.
pub const DEFAULT_PORT: u16 = 8080;

#[allow(clippy::expect_used)]
static ADDRESS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:([A-Za-z][A-Za-z0-9+.-]*)://)?(\[[0-9A-Fa-f:.]+\]|[^/:\s\[\]]+)(?::([^/]*))?/?$",
    )
    .expect("server address regex is valid")
});

/// Transport protocol for the remote server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Http,
    Https,
}

impl Protocol {
    /// Returns the URL scheme for this protocol.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced while parsing a server address.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ServerAddressError {
    /// The address could not be parsed at all (empty host, stray path, ...).
    #[error("unable to parse server address: {address}")]
    Malformed {
        /// The address as supplied.
        address: String,
    },

    /// The scheme is neither `http` nor `https`.
    #[error("unsupported protocol `{scheme}` in server address {address}")]
    UnsupportedProtocol {
        /// The address as supplied.
        address: String,
        /// The rejected scheme.
        scheme: String,
    },

    /// The port is not a number in `1..=65535`.
    #[error("invalid port `{port}` in server address {address}")]
    InvalidPort {
        /// The address as supplied.
        address: String,
        /// The rejected port text.
        port: String,
    },
}

/// Where the remote catalog lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerLocation {
    protocol: Protocol,
    host: String,
    port: u16,
    raw: String,
}

impl ServerLocation {
    /// Parses `[http[s]://]host[:port]`, where `host` may be a bracketed
    /// IPv6 literal.
    ///
    /// An explicit port wins; otherwise `https` implies 443, `http` implies
    /// 80 and no protocol implies [`DEFAULT_PORT`]. An explicit protocol
    /// wins; otherwise port 443 implies `https` and anything else `http`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerAddressError`] when the host is missing, the scheme is
    /// unsupported, or the port is not a valid number.
    pub fn parse(address: &str) -> Result<Self, ServerAddressError> {
        let trimmed = address.trim();
        let malformed = || ServerAddressError::Malformed {
            address: address.to_string(),
        };

        let captures = ADDRESS_PATTERN.captures(trimmed).ok_or_else(malformed)?;

        let scheme = captures.get(1).map(|m| m.as_str().to_ascii_lowercase());
        let host = captures.get(2).map(|m| m.as_str()).ok_or_else(malformed)?;
        let port_text = captures.get(3).map(|m| m.as_str());

        let explicit_protocol = match scheme.as_deref() {
            None => None,
            Some("http") => Some(Protocol::Http),
            Some("https") => Some(Protocol::Https),
            Some(other) => {
                return Err(ServerAddressError::UnsupportedProtocol {
                    address: address.to_string(),
                    scheme: other.to_string(),
                });
            }
        };

        let explicit_port = match port_text {
            None => None,
            Some(text) => Some(
                text.parse::<u16>()
                    .ok()
                    .filter(|port| *port != 0)
                    .ok_or_else(|| ServerAddressError::InvalidPort {
                        address: address.to_string(),
                        port: text.to_string(),
                    })?,
            ),
        };

        let port = explicit_port.unwrap_or(match explicit_protocol {
            Some(Protocol::Https) => 443,
            Some(Protocol::Http) => 80,
            None => DEFAULT_PORT,
        });

        let protocol = explicit_protocol.unwrap_or(if port == 443 {
            Protocol::Https
        } else {
            Protocol::Http
        });

        Ok(Self {
            protocol,
            host: host.to_string(),
            port,
            raw: trimmed.to_string(),
        })
    }

    /// Returns the resolved protocol.
    #[must_use]
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Returns the host name or address. IPv6 literals keep their brackets.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the resolved port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns the address exactly as the operator typed it (trimmed).
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Builds the base URL (`scheme://host:port/`) requests are made against.
    ///
    /// # Errors
    ///
    /// Returns [`url::ParseError`] if the host is not valid in a URL.
    pub fn base_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&format!("{}://{}:{}/", self.protocol, self.host, self.port))
    }
}

impl fmt::Display for ServerLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.protocol, self.host, self.port)
    }
}
