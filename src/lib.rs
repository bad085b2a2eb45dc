//! Sonic Mirror Library
//!
//! Mirrors an OpenSubsonic music catalog into a local directory tree,
//! downloading only songs that are not already present and naming each file
//! after the audio format its bytes actually contain.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`server`] - Server address parsing and port/protocol inference
//! - [`credentials`] - netrc and explicit credential resolution
//! - [`catalog`] - Catalog model, the [`CatalogSource`] seam and traversal
//! - [`subsonic`] - OpenSubsonic REST client
//! - [`download`] - Path resolution, skip detection, sniffing and the worker pool
//!
//! Data flows one way: [`CatalogWalker`] builds the work list, then
//! [`DownloadOrchestrator`] fetches and writes it.

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod catalog;
pub mod credentials;
pub mod download;
pub mod server;
pub mod subsonic;

// Re-export commonly used types
pub use catalog::{
    ArtistEntry, CatalogError, CatalogSource, CatalogWalker, DiscoveryError, SongEntry,
    StreamOptions,
};
pub use credentials::{CredentialError, Credentials, resolve_credentials};
pub use download::{
    ContentSniffer, DownloadOrchestrator, DownloadTask, EngineError, Outcome, PathResolver,
    ProgressObserver, RunParameters, RunReport, ShutdownSignal, SkipFilter,
};
pub use server::{Protocol, ServerAddressError, ServerLocation};
pub use subsonic::SubsonicClient;
