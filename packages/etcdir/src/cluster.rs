//! Endpoint set, request deadlines and first-reachable-wins dispatch.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};
use url::Url;

use crate::endpoint::{join_path, parse_endpoint};
use crate::error::{ConnectError, StoreError};
use crate::executor::{HttpExecutor, TransportError};
use crate::types::{HttpRequest, HttpResponse};
use crate::wire::{EtcdErrorBody, MembersResponse};

/// A bounded budget for one logical call, shared by every endpoint attempt.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    timeout: Duration,
}

impl Deadline {
    pub fn after(timeout: Duration) -> Self {
        Self {
            started: Instant::now(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Time left, or `None` once the deadline has passed.
    pub fn remaining(&self) -> Option<Duration> {
        self.timeout
            .checked_sub(self.started.elapsed())
            .filter(|left| !left.is_zero())
    }
}

/// The endpoints of one etcd cluster and the transport used to reach them.
pub struct Cluster {
    endpoints: Vec<Url>,
    executor: Arc<dyn HttpExecutor>,
}

impl Cluster {
    pub fn new(endpoints: Vec<Url>, executor: Arc<dyn HttpExecutor>) -> Self {
        Self {
            endpoints,
            executor,
        }
    }

    pub fn endpoints(&self) -> &[Url] {
        &self.endpoints
    }

    /// Send the request built for each endpoint in turn until one answers.
    ///
    /// Unreachable endpoints and 5xx answers move on to the next endpoint.
    /// If every endpoint answered 5xx the last answer is returned so the
    /// caller can decode the store's error body.
    pub fn send<F>(&self, deadline: &Deadline, build: F) -> Result<HttpResponse, StoreError>
    where
        F: Fn(&Url) -> HttpRequest,
    {
        let mut failures = Vec::new();
        let mut last_server_error = None;

        for endpoint in &self.endpoints {
            let remaining = deadline
                .remaining()
                .ok_or(StoreError::Timeout(deadline.timeout()))?;
            let request = build(endpoint).with_timeout(remaining);

            match self.executor.execute(&request) {
                Ok(response) if response.is_server_error() => {
                    warn!(endpoint = %endpoint, status = response.status, "endpoint answered with server error");
                    failures.push(format!("{}: HTTP {}", endpoint, response.status));
                    last_server_error = Some(response);
                }
                Ok(response) => return Ok(response),
                Err(TransportError::Timeout) => {
                    return Err(StoreError::Timeout(deadline.timeout()));
                }
                Err(TransportError::Unreachable(message)) => {
                    warn!(endpoint = %endpoint, error = %message, "endpoint unreachable");
                    failures.push(format!("{}: {}", endpoint, message));
                }
            }
        }

        match last_server_error {
            Some(response) => Ok(response),
            None => Err(StoreError::Unreachable(failures)),
        }
    }

    /// Ask the cluster for its members and return their client URLs.
    ///
    /// Duplicates are dropped; order follows the members listing.
    pub fn sync(&self, deadline: &Deadline) -> Result<Vec<Url>, ConnectError> {
        let response = self
            .send(deadline, |endpoint| {
                HttpRequest::get(join_path(endpoint, &["v2", "members"], "").to_string())
            })
            .map_err(ConnectError::Sync)?;

        if !response.is_success() {
            return Err(ConnectError::Sync(error_from_response(&response)));
        }

        let members: MembersResponse = response
            .json()
            .map_err(|e| ConnectError::Sync(StoreError::Decode(e)))?;

        let mut urls: Vec<Url> = Vec::new();
        for member in &members.members {
            for client_url in &member.client_urls {
                let url = parse_endpoint(client_url)?;
                if !urls.contains(&url) {
                    urls.push(url);
                }
            }
        }

        if urls.is_empty() {
            return Err(ConnectError::NoMembers);
        }

        debug!(members = members.members.len(), endpoints = urls.len(), "cluster synced");
        Ok(urls)
    }
}

/// Turn a non-2xx answer into a store error, using the etcd error body when
/// there is one.
pub(crate) fn error_from_response(response: &HttpResponse) -> StoreError {
    match response.json::<EtcdErrorBody>() {
        Ok(body) => StoreError::Etcd {
            status: response.status,
            code: body.error_code,
            message: body.message,
            cause: body.cause.filter(|c| !c.is_empty()),
        },
        Err(_) => StoreError::UnexpectedResponse {
            status: response.status,
            body: response.body_text.clone(),
        },
    }
}
