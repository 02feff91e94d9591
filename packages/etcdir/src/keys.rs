//! The etcd v2 keys API with its full option surface.
//!
//! [`DirClient`](crate::DirClient) is the convenient face of this module; use
//! `KeysApi` directly when an option the façade fixes is needed.

use std::time::Duration;

use tracing::trace;
use url::Url;

use crate::cluster::{error_from_response, Cluster, Deadline};
use crate::endpoint::join_path;
use crate::error::StoreError;
use crate::types::{HttpRequest, HttpResponse};
use crate::wire::KeysResponse;

const KEYS_PREFIX: [&str; 2] = ["v2", "keys"];

/// Precondition on the prior existence of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrevExist {
    #[default]
    Ignore,
    Exist,
    NoExist,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetOptions {
    /// Create a directory instead of a leaf; the value is not sent
    pub dir: bool,
    pub prev_exist: PrevExist,
    /// `None` or zero means the key never expires
    pub ttl: Option<Duration>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetOptions {
    pub recursive: bool,
    /// Order directory children by key
    pub sorted: bool,
    /// Linearized read through the leader instead of a local read
    pub quorum: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeleteOptions {
    pub dir: bool,
    pub recursive: bool,
}

/// etcd accepts whole seconds; a partial second counts as a full one.
pub fn ttl_seconds(ttl: Duration) -> u64 {
    ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0)
}

fn flag(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

pub struct KeysApi {
    cluster: Cluster,
}

impl KeysApi {
    pub fn new(cluster: Cluster) -> Self {
        Self { cluster }
    }

    pub fn cluster(&self) -> &Cluster {
        &self.cluster
    }

    pub fn set(
        &self,
        deadline: &Deadline,
        key: &str,
        value: &str,
        options: &SetOptions,
    ) -> Result<KeysResponse, StoreError> {
        let response = self.cluster.send(deadline, |endpoint| {
            let mut request = HttpRequest::put(keys_url(endpoint, key));
            if options.dir {
                request = request.with_query("dir", "true");
            }
            match options.prev_exist {
                PrevExist::Ignore => {}
                PrevExist::Exist => request = request.with_query("prevExist", "true"),
                PrevExist::NoExist => request = request.with_query("prevExist", "false"),
            }
            if !options.dir {
                request = request.with_form("value", value);
            }
            if let Some(ttl) = options.ttl.filter(|ttl| !ttl.is_zero()) {
                request = request.with_form("ttl", ttl_seconds(ttl).to_string());
            }
            request
        })?;
        decode(response)
    }

    pub fn get(
        &self,
        deadline: &Deadline,
        key: &str,
        options: &GetOptions,
    ) -> Result<KeysResponse, StoreError> {
        let response = self.cluster.send(deadline, |endpoint| {
            let mut request = HttpRequest::get(keys_url(endpoint, key));
            if options.recursive {
                request = request.with_query("recursive", "true");
            }
            request = request.with_query("sorted", flag(options.sorted));
            if options.quorum {
                request = request.with_query("quorum", "true");
            }
            request
        })?;
        decode(response)
    }

    pub fn delete(
        &self,
        deadline: &Deadline,
        key: &str,
        options: &DeleteOptions,
    ) -> Result<KeysResponse, StoreError> {
        let response = self.cluster.send(deadline, |endpoint| {
            let mut request = HttpRequest::delete(keys_url(endpoint, key));
            if options.dir {
                request = request.with_query("dir", "true");
            }
            if options.recursive {
                request = request.with_query("recursive", "true");
            }
            request
        })?;
        decode(response)
    }
}

fn keys_url(endpoint: &Url, key: &str) -> String {
    join_path(endpoint, &KEYS_PREFIX, key).to_string()
}

fn decode(response: HttpResponse) -> Result<KeysResponse, StoreError> {
    trace!(status = response.status, body = %response.body_text, "keys response");
    if !response.is_success() {
        return Err(error_from_response(&response));
    }
    Ok(response.json()?)
}
