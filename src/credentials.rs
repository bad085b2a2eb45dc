//! Login credential resolution.
//!
//! Credentials come from a netrc file (preferred) or from explicit
//! `--user`/`--password` arguments. The netrc lookup tries the address
//! exactly as typed first, then the bare host name.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::server::ServerLocation;

/// Username and password for the remote server.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    user: String,
    password: String,
}

impl Credentials {
    /// Creates a credential pair.
    #[must_use]
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }

    /// Returns the login name.
    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Returns the password.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

// Passwords must never reach logs through `{:?}`.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Errors from credential resolution.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// Neither netrc nor explicit arguments produced a user and password.
    #[error(
        "unable to get user and password from netrc file or arguments\n  \
         Suggestion: add a `machine {host}` entry to your netrc file or pass --user and --password"
    )]
    Unresolved {
        /// Host the lookup was made for.
        host: String,
    },

    /// The netrc file exists but could not be read.
    #[error("unable to read netrc file {path}: {source}")]
    Io {
        /// The netrc path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// A single `machine` (or `default`) entry in a netrc file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct NetrcEntry {
    login: Option<String>,
    password: Option<String>,
}

/// Parsed netrc file.
#[derive(Debug, Default)]
pub struct Netrc {
    machines: Vec<(String, NetrcEntry)>,
    default: Option<NetrcEntry>,
}

impl Netrc {
    /// Parses netrc text.
    ///
    /// Supports `machine`, `default`, `login`, `password` and `account`.
    /// Tokens may be double-quoted with backslash escapes, `#` starts a
    /// comment, and a `macdef` body is skipped up to the next blank line.
    /// Unknown tokens are ignored.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut netrc = Self::default();
        let mut current: Option<(Option<String>, NetrcEntry)> = None;
        let mut lexer = NetrcLexer { rest: text };

        while let Some(token) = lexer.next_token() {
            match token.as_str() {
                "machine" => {
                    netrc.finish_entry(current.take());
                    let name = lexer.next_token().unwrap_or_default();
                    current = Some((Some(name), NetrcEntry::default()));
                }
                "default" => {
                    netrc.finish_entry(current.take());
                    current = Some((None, NetrcEntry::default()));
                }
                "macdef" => {
                    netrc.finish_entry(current.take());
                    lexer.next_token();
                    lexer.skip_macro_body();
                }
                "login" => {
                    let login = lexer.next_token();
                    if let Some((_, entry)) = current.as_mut() {
                        entry.login = login;
                    }
                }
                "password" => {
                    let password = lexer.next_token();
                    if let Some((_, entry)) = current.as_mut() {
                        entry.password = password;
                    }
                }
                "account" => {
                    lexer.next_token();
                }
                _ => {}
            }
        }
        netrc.finish_entry(current);
        netrc
    }

    /// Reads and parses a netrc file. A missing file yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Io`] for read failures other than not-found.
    pub fn load(path: &Path) -> Result<Option<Self>, CredentialError> {
        match fs::read_to_string(path) {
            Ok(text) => Ok(Some(Self::parse(&text))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(CredentialError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    fn finish_entry(&mut self, entry: Option<(Option<String>, NetrcEntry)>) {
        match entry {
            Some((Some(machine), entry)) => self.machines.push((machine, entry)),
            Some((None, entry)) => self.default = Some(entry),
            None => {}
        }
    }

    /// Returns credentials for `machine`, falling back to the `default` entry.
    #[must_use]
    pub fn authenticator(&self, machine: &str) -> Option<Credentials> {
        self.machines
            .iter()
            .find(|(name, _)| name == machine)
            .map(|(_, entry)| entry)
            .or(self.default.as_ref())
            .and_then(|entry| match (&entry.login, &entry.password) {
                (Some(login), Some(password)) => Some(Credentials::new(login, password)),
                _ => None,
            })
    }

    fn machine_entry(&self, machine: &str) -> Option<Credentials> {
        self.machines
            .iter()
            .find(|(name, _)| name == machine)
            .and_then(|(_, entry)| match (&entry.login, &entry.password) {
                (Some(login), Some(password)) => Some(Credentials::new(login, password)),
                _ => None,
            })
    }
}

/// Splits netrc text into tokens.
struct NetrcLexer<'a> {
    rest: &'a str,
}

impl NetrcLexer<'_> {
    fn next_token(&mut self) -> Option<String> {
        loop {
            self.rest = self.rest.trim_start();
            if !self.rest.starts_with('#') {
                break;
            }
            self.skip_line();
        }

        if let Some(quoted) = self.rest.strip_prefix('"') {
            let mut token = String::new();
            let mut escaped = false;
            for (i, c) in quoted.char_indices() {
                if escaped {
                    token.push(c);
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == '"' {
                    self.rest = &quoted[i + 1..];
                    return Some(token);
                } else {
                    token.push(c);
                }
            }
            // Unterminated quote runs to the end of the input.
            self.rest = "";
            return Some(token);
        }

        if self.rest.is_empty() {
            return None;
        }
        let end = self
            .rest
            .find(char::is_whitespace)
            .unwrap_or(self.rest.len());
        let token = self.rest[..end].to_string();
        self.rest = &self.rest[end..];
        Some(token)
    }

    fn skip_line(&mut self) {
        self.rest = self.rest.find('\n').map_or("", |i| &self.rest[i + 1..]);
    }

    /// Drops the rest of the `macdef` line and the body up to and including
    /// the next blank line.
    fn skip_macro_body(&mut self) {
        self.skip_line();
        while !self.rest.is_empty() {
            let line_end = self.rest.find('\n').unwrap_or(self.rest.len());
            let blank = self.rest[..line_end].trim().is_empty();
            self.skip_line();
            if blank {
                break;
            }
        }
    }
}

/// Returns `$HOME/.netrc` when a home directory is known.
#[must_use]
pub fn default_netrc_path() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(|home| PathBuf::from(home).join(".netrc"))
}

/// Resolves credentials for `location`.
///
/// Order: netrc entry for the address as typed, netrc entry for the host,
/// netrc `default`, then the explicit `user`/`password` pair.
///
/// # Errors
///
/// Returns [`CredentialError::Unresolved`] when nothing yields both a user
/// and a password, or [`CredentialError::Io`] when the netrc file is
/// unreadable.
pub fn resolve_credentials(
    location: &ServerLocation,
    netrc_path: Option<&Path>,
    user: Option<&str>,
    password: Option<&str>,
) -> Result<Credentials, CredentialError> {
    let default_path = default_netrc_path();
    let netrc_path = netrc_path.or(default_path.as_deref());

    if let Some(path) = netrc_path
        && let Some(netrc) = Netrc::load(path)?
    {
        let found = netrc
            .machine_entry(location.raw())
            .or_else(|| netrc.authenticator(location.host()));
        if let Some(credentials) = found {
            debug!(user = credentials.user(), "credentials resolved from netrc");
            return Ok(credentials);
        }
    }

    match (user, password) {
        (Some(user), Some(password)) if !user.is_empty() => {
            debug!(user, "credentials resolved from arguments");
            Ok(Credentials::new(user, password))
        }
        _ => Err(CredentialError::Unresolved {
            host: location.host().to_string(),
        }),
    }
}
