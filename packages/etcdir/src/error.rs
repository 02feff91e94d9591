use std::fmt;
use std::time::Duration;

/// The directory operation an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Mkdir,
    Set,
    Get,
    Rm,
    Rmdir,
    Ls,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Mkdir => "mkdir",
            Operation::Set => "set",
            Operation::Get => "get",
            Operation::Rm => "rm",
            Operation::Rmdir => "rmdir",
            Operation::Ls => "ls",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("connect: {0}")]
    Connection(#[from] ConnectError),

    #[error("{op}: key already exists: {key}")]
    AlreadyExists { op: Operation, key: String },

    #[error("{op}: key not found: {key}")]
    NotFound { op: Operation, key: String },

    #[error("{op}: {source}")]
    Store {
        op: Operation,
        #[source]
        source: StoreError,
    },
}

impl Error {
    pub fn is_connection(&self) -> bool {
        matches!(self, Error::Connection(_))
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, Error::AlreadyExists { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// The operation that failed, if the error came from one.
    pub fn operation(&self) -> Option<Operation> {
        match self {
            Error::Connection(_) => None,
            Error::AlreadyExists { op, .. } | Error::NotFound { op, .. } | Error::Store { op, .. } => {
                Some(*op)
            }
        }
    }

    /// Classify a store failure for the given operation.
    ///
    /// Only "key not found" and "node exists" get their own variants; every
    /// other etcd code stays a store error.
    pub(crate) fn from_store(op: Operation, key: &str, source: StoreError) -> Self {
        match source.etcd_code() {
            Some(crate::wire::codes::KEY_NOT_FOUND) => Error::NotFound {
                op,
                key: key.to_string(),
            },
            Some(crate::wire::codes::NODE_EXIST) => Error::AlreadyExists {
                op,
                key: key.to_string(),
            },
            _ => Error::Store { op, source },
        }
    }
}

/// Failures while establishing a client.
#[derive(thiserror::Error, Debug)]
pub enum ConnectError {
    #[error("no endpoints given")]
    NoEndpoints,

    #[error("invalid endpoint {endpoint:?}: {source}")]
    InvalidEndpoint {
        endpoint: String,
        #[source]
        source: url::ParseError,
    },

    #[error("unsupported scheme {scheme:?} in endpoint {endpoint:?}")]
    UnsupportedScheme { endpoint: String, scheme: String },

    #[error("building HTTP transport: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("cluster sync: {0}")]
    Sync(#[source] StoreError),

    #[error("cluster sync: no member advertises a client URL")]
    NoMembers,
}

/// Failures surfaced by the store or on the way to it.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("etcd error {code} (HTTP {status}): {message}{}", fmt_cause(.cause))]
    Etcd {
        status: u16,
        code: u32,
        message: String,
        cause: Option<String>,
    },

    #[error("{key} is a directory")]
    IsDirectory { key: String },

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("all endpoints failed: {}", .0.join("; "))]
    Unreachable(Vec<String>),

    #[error("unexpected HTTP {status} response: {body}")]
    UnexpectedResponse { status: u16, body: String },

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

fn fmt_cause(cause: &Option<String>) -> String {
    match cause {
        Some(cause) => format!(" [{}]", cause),
        None => String::new(),
    }
}

impl StoreError {
    /// The etcd error code, when the store answered with one.
    pub fn etcd_code(&self) -> Option<u32> {
        match self {
            StoreError::Etcd { code, .. } => Some(*code),
            _ => None,
        }
    }
}
