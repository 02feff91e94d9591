//! In-memory stand-in for an etcd v2 member, driven through [`HttpExecutor`].
//!
//! Implements just enough of the keys API for the client's tests: leaves,
//! directories, `prevExist`, TTLs on a manual clock, recursive delete and
//! `/v2/members`.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use url::Url;

use crate::endpoint::normalize_key;
use crate::executor::{HttpExecutor, TransportError};
use crate::types::{HttpRequest, HttpResponse, Method};
use crate::wire::{codes, EtcdErrorBody, KeysResponse, Node};

#[derive(Debug, Clone)]
struct Entry {
    /// `None` marks a directory
    value: Option<String>,
    expires_at: Option<Duration>,
    created_index: u64,
    modified_index: u64,
}

#[derive(Default)]
struct State {
    client_urls: Vec<String>,
    now: Duration,
    index: u64,
    entries: BTreeMap<String, Entry>,
    recorded: Vec<HttpRequest>,
    transport_error: Option<TransportError>,
}

#[derive(Clone, Default)]
pub struct FakeEtcd {
    state: Arc<Mutex<State>>,
}

impl FakeEtcd {
    /// A single-member cluster advertising `client_urls`.
    pub fn new(client_urls: &[&str]) -> Self {
        let fake = Self::default();
        fake.state.lock().unwrap().client_urls = client_urls.iter().map(|u| u.to_string()).collect();
        fake
    }

    /// Move the store's clock forward.
    pub fn advance(&self, by: Duration) {
        self.state.lock().unwrap().now += by;
    }

    pub fn set_transport_error(&self, error: Option<TransportError>) {
        self.state.lock().unwrap().transport_error = error;
    }

    pub fn recorded_requests(&self) -> Vec<HttpRequest> {
        self.state.lock().unwrap().recorded.clone()
    }
}

impl HttpExecutor for FakeEtcd {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut state = self.state.lock().unwrap();
        state.recorded.push(request.clone());

        if let Some(error) = state.transport_error.clone() {
            return Err(error);
        }

        let url = match Url::parse(&request.url) {
            Ok(url) => url,
            Err(e) => return Ok(HttpResponse::new(400, e.to_string())),
        };

        if url.path() == "/v2/members" {
            let body = serde_json::json!({
                "members": [{
                    "id": "8e9e05c52164694d",
                    "name": "fake",
                    "peerURLs": ["http://localhost:2380"],
                    "clientURLs": state.client_urls,
                }]
            });
            return Ok(HttpResponse::new(200, body.to_string()));
        }

        let Some(raw_key) = url.path().strip_prefix("/v2/keys") else {
            return Ok(HttpResponse::new(404, "404 page not found"));
        };
        let key = normalize_key(raw_key);

        state.purge_expired();
        let result = match request.method {
            Method::PUT => state.put(&key, request),
            Method::GET => state.get(&key),
            Method::DELETE => state.delete(&key, request),
        };

        Ok(match result {
            Ok((status, body)) => HttpResponse::new(status, json(&body)),
            Err(error) => error.into_response(),
        })
    }
}

struct EtcdError {
    status: u16,
    body: EtcdErrorBody,
}

impl EtcdError {
    fn new(code: u32, message: &str, key: &str, index: u64) -> Self {
        let status = match code {
            codes::KEY_NOT_FOUND => 404,
            codes::TEST_FAILED | codes::NODE_EXIST => 412,
            _ => 403,
        };
        Self {
            status,
            body: EtcdErrorBody {
                error_code: code,
                message: message.to_string(),
                cause: Some(key.to_string()),
                index,
            },
        }
    }

    fn into_response(self) -> HttpResponse {
        HttpResponse::new(self.status, json(&self.body))
    }
}

fn json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap()
}

fn parent(key: &str) -> &str {
    match key.rsplit_once('/') {
        Some(("", _)) | None => "/",
        Some((parent, _)) => parent,
    }
}

fn ancestors(key: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut current = parent(key);
    while current != "/" {
        result.push(current.to_string());
        current = parent(current);
    }
    result.reverse();
    result
}

fn is_below(candidate: &str, dir: &str) -> bool {
    dir == "/" || candidate.starts_with(&format!("{}/", dir))
}

type Answer = Result<(u16, KeysResponse), EtcdError>;

impl State {
    fn purge_expired(&mut self) {
        let now = self.now;
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, e)| e.expires_at.is_some_and(|at| at <= now))
            .map(|(k, _)| k.clone())
            .collect();
        for key in expired {
            self.remove_tree(&key);
        }
    }

    fn remove_tree(&mut self, key: &str) {
        self.entries
            .retain(|k, _| k != key && !(key != "/" && is_below(k, key)));
    }

    fn is_dir(&self, key: &str) -> bool {
        key == "/" || self.entries.get(key).is_some_and(|e| e.value.is_none())
    }

    fn exists(&self, key: &str) -> bool {
        key == "/" || self.entries.contains_key(key)
    }

    fn node(&self, key: &str, entry: &Entry) -> Node {
        let ttl = entry
            .expires_at
            .map(|at| at.saturating_sub(self.now).as_secs() as i64);
        Node {
            key: key.to_string(),
            dir: entry.value.is_none(),
            value: entry.value.clone(),
            ttl,
            created_index: entry.created_index,
            modified_index: entry.modified_index,
            ..Default::default()
        }
    }

    fn put(&mut self, key: &str, request: &HttpRequest) -> Answer {
        let index = self.index;
        if key == "/" {
            return Err(EtcdError::new(codes::ROOT_READ_ONLY, "Root is read only", key, index));
        }
        for ancestor in ancestors(key) {
            if self.exists(&ancestor) && !self.is_dir(&ancestor) {
                return Err(EtcdError::new(codes::NOT_DIR, "Not a directory", &ancestor, index));
            }
        }

        let dir = request.query_param("dir") == Some("true");
        let exists = self.exists(key);
        match request.query_param("prevExist") {
            Some("false") if exists => {
                return Err(EtcdError::new(codes::NODE_EXIST, "Key already exists", key, index));
            }
            Some("true") if !exists => {
                return Err(EtcdError::new(codes::KEY_NOT_FOUND, "Key not found", key, index));
            }
            _ => {}
        }
        if exists && self.is_dir(key) != dir {
            return Err(EtcdError::new(codes::NOT_FILE, "Not a file", key, index));
        }

        self.index += 1;
        let index = self.index;
        for ancestor in ancestors(key) {
            self.entries.entry(ancestor).or_insert(Entry {
                value: None,
                expires_at: None,
                created_index: index,
                modified_index: index,
            });
        }

        let ttl = request
            .form_field("ttl")
            .and_then(|t| t.parse::<u64>().ok())
            .filter(|t| *t > 0);
        let created_index = self.entries.get(key).map_or(index, |e| e.created_index);
        let entry = Entry {
            value: if dir {
                None
            } else {
                Some(request.form_field("value").unwrap_or_default().to_string())
            },
            expires_at: ttl.map(|t| self.now + Duration::from_secs(t)),
            created_index,
            modified_index: index,
        };
        let node = self.node(key, &entry);
        let prev_node = self.entries.insert(key.to_string(), entry).map(|prev| self.node(key, &prev));

        Ok((
            201,
            KeysResponse {
                action: "set".to_string(),
                node,
                prev_node,
            },
        ))
    }

    fn get(&self, key: &str) -> Answer {
        if !self.exists(key) {
            return Err(EtcdError::new(codes::KEY_NOT_FOUND, "Key not found", key, self.index));
        }

        let node = if key == "/" || self.is_dir(key) {
            let children = self
                .entries
                .iter()
                .filter(|(k, _)| parent(k) == key)
                .map(|(k, e)| self.node(k, e))
                .collect();
            let mut node = Node::directory(if key == "/" { "" } else { key }, children);
            if let Some(entry) = self.entries.get(key) {
                node.created_index = entry.created_index;
                node.modified_index = entry.modified_index;
            }
            node
        } else {
            let entry = &self.entries[key];
            self.node(key, entry)
        };

        Ok((
            200,
            KeysResponse {
                action: "get".to_string(),
                node,
                prev_node: None,
            },
        ))
    }

    fn delete(&mut self, key: &str, request: &HttpRequest) -> Answer {
        let index = self.index;
        if key == "/" {
            return Err(EtcdError::new(codes::ROOT_READ_ONLY, "Root is read only", key, index));
        }
        if !self.exists(key) {
            return Err(EtcdError::new(codes::KEY_NOT_FOUND, "Key not found", key, index));
        }

        let dir = request.query_param("dir") == Some("true");
        let recursive = request.query_param("recursive") == Some("true");
        if self.is_dir(key) && !dir && !recursive {
            return Err(EtcdError::new(codes::NOT_FILE, "Not a file", key, index));
        }
        let has_children = self.entries.keys().any(|k| is_below(k, key));
        if has_children && !recursive {
            return Err(EtcdError::new(codes::DIR_NOT_EMPTY, "Directory not empty", key, index));
        }

        let was_dir = self.is_dir(key);
        let prev = self.entries.get(key).map(|e| self.node(key, e));
        self.remove_tree(key);
        self.index += 1;

        Ok((
            200,
            KeysResponse {
                action: "delete".to_string(),
                node: Node {
                    key: key.to_string(),
                    dir: was_dir,
                    modified_index: self.index,
                    ..Default::default()
                },
                prev_node: prev,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_helpers() {
        assert_eq!(parent("/a/b/c"), "/a/b");
        assert_eq!(parent("/a"), "/");
        assert_eq!(ancestors("/a/b/c"), vec!["/a", "/a/b"]);
        assert!(ancestors("/a").is_empty());
        assert!(is_below("/a/b", "/a"));
        assert!(!is_below("/ab", "/a"));
    }
}
