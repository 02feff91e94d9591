//! # etcdir
//!
//! A directory-style client for the etcd v2 keys API.
//!
//! Instead of the keys API's option structs, [`DirClient`] offers a handful of
//! filesystem-like calls:
//!
//! ```ignore
//! use std::time::Duration;
//! use etcdir::DirClient;
//!
//! let client = DirClient::connect("127.0.0.1:2379,127.0.0.1:4001")?;
//!
//! client.mkdir("/home/yi")?;
//! client.set("/home/yi/a", "Apple")?;
//! client.set_with_ttl("/home/yi/lease", "held", Some(Duration::from_secs(10)))?;
//!
//! assert_eq!(client.get("/home/yi/a")?, "Apple");
//! assert_eq!(client.ls("/home/yi")?, vec!["/home/yi/a", "/home/yi/lease"]);
//!
//! client.rm("/home/yi")?;
//! ```
//!
//! Each call is a single blocking round trip bounded by
//! [`ClientConfig::request_timeout`]. Failures are reported as [`Error`],
//! whose variants tell "not found" and "already exists" apart from
//! connection and store failures.
//!
//! The option-level API lives in [`keys`]; the transport is pluggable through
//! [`HttpExecutor`].

pub mod cluster;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod executor;
pub mod keys;
pub mod types;
pub mod wire;

mod client;

#[cfg(test)]
mod fake;

pub use client::DirClient;
pub use config::ClientConfig;
pub use error::{ConnectError, Error, Operation, StoreError};
pub use executor::{HttpExecutor, ReqwestExecutor, TransportError};
pub use keys::{DeleteOptions, GetOptions, KeysApi, PrevExist, SetOptions};
pub use types::{HttpRequest, HttpResponse, Method};
