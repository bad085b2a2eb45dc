//! OpenSubsonic implementation of [`CatalogSource`](crate::catalog::CatalogSource).
//!
//! Every request authenticates with a salted token (`t = md5(password + salt)`)
//! so the password itself never goes over the wire.

mod client;
mod response;

pub use client::{API_VERSION, CLIENT_NAME, CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS, SubsonicClient};
