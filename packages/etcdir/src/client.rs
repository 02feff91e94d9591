use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};
use url::Url;

use crate::cluster::{Cluster, Deadline};
use crate::config::ClientConfig;
use crate::endpoint::{normalize_key, parse_endpoints};
use crate::error::{ConnectError, Error, Operation, StoreError};
use crate::executor::{HttpExecutor, ReqwestExecutor};
use crate::keys::{DeleteOptions, GetOptions, KeysApi, PrevExist, SetOptions};

/// Directory-style client for an etcd cluster.
///
/// Every call is one blocking request bounded by the configured request
/// timeout. Nothing is retried beyond trying the next endpoint when one is
/// unreachable.
///
/// # Example
///
/// ```ignore
/// use etcdir::DirClient;
///
/// let client = DirClient::connect("127.0.0.1:2379,127.0.0.1:4001")?;
/// client.mkdir("/home/yi")?;
/// client.set("/home/yi/a", "Apple")?;
/// assert_eq!(client.get("/home/yi/a")?, "Apple");
/// assert_eq!(client.ls("/home/yi")?, vec!["/home/yi/a"]);
/// client.rm("/home/yi")?;
/// ```
pub struct DirClient {
    keys: KeysApi,
    request_timeout: Duration,
}

impl DirClient {
    /// Connect with default timeouts to a comma-delimited endpoint list.
    pub fn connect(endpoints: &str) -> Result<Self, Error> {
        Self::connect_with_config(ClientConfig::new(endpoints))
    }

    pub fn connect_with_config(config: ClientConfig) -> Result<Self, Error> {
        let executor =
            ReqwestExecutor::new(config.connect_timeout).map_err(ConnectError::Transport)?;
        Self::with_executor(config, Arc::new(executor))
    }

    /// Connect over a caller-supplied transport.
    ///
    /// Blocks on the cluster membership sync; the client only talks to the
    /// client URLs the members advertise.
    pub fn with_executor(
        config: ClientConfig,
        executor: Arc<dyn HttpExecutor>,
    ) -> Result<Self, Error> {
        let seeds = parse_endpoints(&config.endpoints)?;
        let seed_cluster = Cluster::new(seeds, executor.clone());

        let deadline = Deadline::after(config.request_timeout);
        let endpoints = seed_cluster.sync(&deadline)?;
        let resolved: Vec<&str> = endpoints.iter().map(Url::as_str).collect();
        info!(endpoints = ?resolved, "connected to etcd");

        Ok(Self {
            keys: KeysApi::new(Cluster::new(endpoints, executor)),
            request_timeout: config.request_timeout,
        })
    }

    /// Endpoints learned from the membership sync.
    pub fn endpoints(&self) -> &[Url] {
        self.keys.cluster().endpoints()
    }

    /// The lower-level keys API this client is built on.
    pub fn keys(&self) -> &KeysApi {
        &self.keys
    }

    /// Create a directory, including any missing parents.
    ///
    /// The directory must not exist yet, otherwise the call fails with
    /// [`Error::AlreadyExists`].
    pub fn mkdir(&self, dir: &str) -> Result<(), Error> {
        debug!(dir, "mkdir");
        let options = SetOptions {
            dir: true,
            prev_exist: PrevExist::NoExist,
            ttl: None,
        };
        self.keys
            .set(&self.deadline(), dir, "", &options)
            .map_err(|e| Error::from_store(Operation::Mkdir, &normalize_key(dir), e))?;
        Ok(())
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        self.set_with_ttl(key, value, None)
    }

    /// Set a leaf value, replacing any previous value and TTL.
    ///
    /// A `None` or zero TTL means the key never expires.
    pub fn set_with_ttl(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), Error> {
        debug!(key, ?ttl, "set");
        let options = SetOptions {
            ttl,
            ..Default::default()
        };
        self.keys
            .set(&self.deadline(), key, value, &options)
            .map_err(|e| Error::from_store(Operation::Set, &normalize_key(key), e))?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<String, Error> {
        debug!(key, "get");
        let options = GetOptions {
            sorted: true,
            ..Default::default()
        };
        let response = self
            .keys
            .get(&self.deadline(), key, &options)
            .map_err(|e| Error::from_store(Operation::Get, &normalize_key(key), e))?;

        if response.node.dir {
            return Err(Error::Store {
                op: Operation::Get,
                source: StoreError::IsDirectory {
                    key: normalize_key(key),
                },
            });
        }
        Ok(response.node.value.unwrap_or_default())
    }

    /// Remove a key, or a directory and everything below it, like `rm -rf`.
    pub fn rm(&self, key: &str) -> Result<(), Error> {
        debug!(key, "rm");
        let options = DeleteOptions {
            dir: false,
            recursive: true,
        };
        self.keys
            .delete(&self.deadline(), key, &options)
            .map_err(|e| Error::from_store(Operation::Rm, &normalize_key(key), e))?;
        Ok(())
    }

    /// Remove a directory and all of its content.
    pub fn rmdir(&self, dir: &str) -> Result<(), Error> {
        debug!(dir, "rmdir");
        let options = DeleteOptions {
            dir: true,
            recursive: true,
        };
        self.keys
            .delete(&self.deadline(), dir, &options)
            .map_err(|e| Error::from_store(Operation::Rmdir, &normalize_key(dir), e))?;
        Ok(())
    }

    /// List the immediate children of a directory, ordered by key, or the
    /// key itself when it is a leaf.
    ///
    /// Uses a quorum read, so the answer reflects every write committed
    /// before the call no matter which member serves it. An empty key lists
    /// the root.
    pub fn ls(&self, key: &str) -> Result<Vec<String>, Error> {
        let key = if key.is_empty() { "/" } else { key };
        debug!(key, "ls");
        let options = GetOptions {
            recursive: false,
            sorted: true,
            quorum: true,
        };
        let response = self
            .keys
            .get(&self.deadline(), key, &options)
            .map_err(|e| Error::from_store(Operation::Ls, &normalize_key(key), e))?;

        if !response.node.dir {
            return Ok(vec![response.node.key]);
        }
        Ok(response.node.nodes.into_iter().map(|node| node.key).collect())
    }

    fn deadline(&self) -> Deadline {
        Deadline::after(self.request_timeout)
    }
}
