//! Firebase Realtime Database over the REST streaming protocol.
//!
//! `GET {base}/{path}.json` with `Accept: text/event-stream` returns a
//! server-sent event feed:
//!
//! | event          | data                                  |
//! |----------------|---------------------------------------|
//! | `put`          | `{"path": "/a/b", "data": <json>}`    |
//! | `patch`        | `{"path": "/a", "data": {k: <json>}}` |
//! | `keep-alive`   | `null`                                |
//! | `cancel`       | reason string (rules denied the read) |
//! | `auth_revoked` | reason string                         |
//!
//! Paths in events are relative to the listened node. The listener keeps a
//! local copy of the node and emits the whole of it after every change.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{HttpClient, HttpRequest},
    logging::redact_url,
    realtime::{DataSnapshot, RealtimeDatabase, SnapshotStream},
};
use bytes::Bytes;
use futures_util::stream::{self, BoxStream, StreamExt};
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::sse::{SseDecoder, SseEvent};

/// Realtime database client for a single Firebase project.
pub struct FirebaseRealtimeDatabase {
    http: Arc<dyn HttpClient>,
    base_url: String,
}

impl FirebaseRealtimeDatabase {
    /// `base_url` is the database root, e.g. `https://<project>-default-rtdb.firebaseio.com`.
    pub fn new(http: Arc<dyn HttpClient>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    /// REST endpoint for a node path.
    pub fn node_url(&self, path: &str) -> String {
        let path = path.trim_matches('/');
        if path.is_empty() {
            format!("{}/.json", self.base_url)
        } else {
            format!("{}/{}.json", self.base_url, path)
        }
    }
}

#[async_trait]
impl RealtimeDatabase for FirebaseRealtimeDatabase {
    async fn listen(&self, path: &str) -> Result<SnapshotStream> {
        let url = self.node_url(path);
        let request =
            HttpRequest::get(url.clone()).header("Accept", "text/event-stream");

        let response = self.http.execute_streaming(request).await?;

        match response.status {
            401 | 403 => {
                warn!(status = response.status, url = %redact_url(&url), "Listener refused");
                return Err(BridgeError::PermissionDenied(format!(
                    "HTTP {} for {}",
                    response.status, path
                )));
            }
            status if !response.is_success() => {
                return Err(BridgeError::OperationFailed(format!(
                    "HTTP {} opening listener on {}",
                    status, path
                )));
            }
            _ => {}
        }

        info!(path = %path, "Realtime listener attached");

        let feed = EventFeed::new(path, response.body);
        let snapshots = stream::unfold(feed, |mut feed| async move {
            loop {
                if let Some(item) = feed.pending.pop_front() {
                    return Some((item, feed));
                }
                if feed.finished {
                    return None;
                }

                match feed.body.next().await {
                    Some(Ok(chunk)) => feed.consume(&chunk),
                    Some(Err(e)) => {
                        warn!(error = %e, "Realtime listener stream failed");
                        feed.finished = true;
                        feed.pending.push_back(Err(e));
                    }
                    None => {
                        debug!(path = %feed.path, "Realtime listener stream closed by server");
                        feed.finished = true;
                    }
                }
            }
        });

        Ok(Box::pin(snapshots))
    }
}

/// Decoding state of one listener connection.
struct EventFeed {
    path: String,
    body: BoxStream<'static, Result<Bytes>>,
    decoder: SseDecoder,
    node: Value,
    pending: VecDeque<Result<DataSnapshot>>,
    finished: bool,
}

impl EventFeed {
    fn new(path: &str, body: BoxStream<'static, Result<Bytes>>) -> Self {
        Self {
            path: path.to_string(),
            body,
            decoder: SseDecoder::new(),
            node: Value::Null,
            pending: VecDeque::new(),
            finished: false,
        }
    }

    fn consume(&mut self, chunk: &[u8]) {
        for event in self.decoder.push(chunk) {
            if self.finished {
                break;
            }
            self.handle(event);
        }
    }

    fn handle(&mut self, event: SseEvent) {
        match event.event.as_str() {
            "put" | "patch" => {
                let payload: Value = match serde_json::from_str(&event.data) {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!(error = %e, event = %event.event, "Skipping malformed event payload");
                        return;
                    }
                };

                let at = payload.get("path").and_then(Value::as_str).unwrap_or("/");
                let data = payload.get("data").cloned().unwrap_or(Value::Null);

                if event.event == "put" {
                    apply_put(&mut self.node, at, data);
                } else {
                    apply_patch(&mut self.node, at, data);
                }

                debug!(event = %event.event, at = %at, "Applied remote change");
                self.pending
                    .push_back(Ok(DataSnapshot::at_path(&self.path, self.node.clone())));
            }
            "keep-alive" => {}
            "cancel" | "auth_revoked" => {
                warn!(event = %event.event, reason = %event.data, "Realtime listener cancelled");
                self.finished = true;
                self.pending.push_back(Err(BridgeError::PermissionDenied(
                    event.data.trim_matches('"').to_string(),
                )));
            }
            other => debug!(event = %other, "Ignoring unknown event"),
        }
    }
}

/// Replace the value at `path` (relative to `node`). `null` deletes.
pub(crate) fn apply_put(node: &mut Value, path: &str, data: Value) {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    set_at(node, &segments, data);
}

/// Merge each key of `data` into the node at `path`.
pub(crate) fn apply_patch(node: &mut Value, path: &str, data: Value) {
    let base: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    let Value::Object(children) = data else {
        warn!("Patch payload is not an object; treating as put");
        set_at(node, &base, data);
        return;
    };

    for (key, value) in children {
        let mut segments = base.clone();
        segments.extend(key.split('/').filter(|s| !s.is_empty()));
        set_at(node, &segments, value);
    }
}

fn set_at(node: &mut Value, segments: &[&str], value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        *node = value;
        return;
    };

    if let Value::Array(items) = node {
        let map: Map<String, Value> = items
            .drain(..)
            .enumerate()
            .filter(|(_, v)| !v.is_null())
            .map(|(i, v)| (i.to_string(), v))
            .collect();
        *node = Value::Object(map);
    }

    if !node.is_object() {
        if value.is_null() {
            return;
        }
        *node = Value::Object(Map::new());
    }

    let emptied = match node {
        Value::Object(map) => {
            let child = map.entry(head.to_string()).or_insert(Value::Null);
            set_at(child, rest, value);
            if child.is_null() {
                map.remove(*head);
            }
            map.is_empty()
        }
        _ => false,
    };

    // a node without children does not exist
    if emptied {
        *node = Value::Null;
    }
}
