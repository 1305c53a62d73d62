//! Realtime Database Abstraction
//!
//! A path-addressed JSON tree whose listeners receive full snapshots of the
//! watched node, never deltas. Hosts back this with Firebase Realtime
//! Database (REST streaming on desktop, the native SDK on mobile) or with an
//! in-process fake in tests.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;
use std::cmp::Ordering;

use crate::error::Result;

/// Stream of full-node snapshots produced by a value listener.
///
/// An `Err` item reports that the listener was cancelled (for example
/// [`BridgeError::PermissionDenied`](crate::BridgeError::PermissionDenied));
/// no further items follow it.
pub type SnapshotStream = BoxStream<'static, Result<DataSnapshot>>;

/// Immutable view of a node in the database at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSnapshot {
    key: Option<String>,
    value: Value,
}

impl DataSnapshot {
    pub fn new(key: Option<String>, value: Value) -> Self {
        Self { key, value }
    }

    /// Snapshot of the node at `path`, keyed by the last path segment.
    pub fn at_path(path: &str, value: Value) -> Self {
        let key = path
            .trim_matches('/')
            .rsplit('/')
            .next()
            .filter(|segment| !segment.is_empty())
            .map(str::to_string);
        Self { key, value }
    }

    /// Key of this node; `None` for the database root.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn exists(&self) -> bool {
        !self.value.is_null()
    }

    /// String value of this node, if it is a string leaf.
    pub fn as_str(&self) -> Option<&str> {
        self.value.as_str()
    }

    pub fn has_children(&self) -> bool {
        self.children_count() > 0
    }

    pub fn children_count(&self) -> usize {
        match &self.value {
            Value::Object(map) => map.values().filter(|v| !v.is_null()).count(),
            Value::Array(items) => items.iter().filter(|v| !v.is_null()).count(),
            _ => 0,
        }
    }

    /// Descend into a slash-separated relative path. Missing nodes yield a
    /// snapshot whose value is `null`.
    pub fn child(&self, path: &str) -> DataSnapshot {
        let mut current = &self.value;
        let mut key = None;

        for segment in path.split('/').filter(|s| !s.is_empty()) {
            key = Some(segment.to_string());
            current = match current {
                Value::Object(map) => map.get(segment).unwrap_or(&Value::Null),
                Value::Array(items) => segment
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| items.get(index))
                    .unwrap_or(&Value::Null),
                _ => &Value::Null,
            };
        }

        DataSnapshot {
            key: key.or_else(|| self.key.clone()),
            value: current.clone(),
        }
    }

    /// Direct children in database key order (see [`compare_keys`]).
    ///
    /// Sequential integer keys may arrive from the server as a JSON array;
    /// those are exposed with their index as key. Null children are skipped.
    pub fn children(&self) -> Vec<DataSnapshot> {
        let mut children: Vec<DataSnapshot> = match &self.value {
            Value::Object(map) => map
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| DataSnapshot::new(Some(k.clone()), v.clone()))
                .collect(),
            Value::Array(items) => items
                .iter()
                .enumerate()
                .filter(|(_, v)| !v.is_null())
                .map(|(i, v)| DataSnapshot::new(Some(i.to_string()), v.clone()))
                .collect(),
            _ => Vec::new(),
        };

        children.sort_by(|a, b| compare_keys(a.key().unwrap_or(""), b.key().unwrap_or("")));
        children
    }
}

/// Default child ordering of the realtime database: keys that are canonical
/// 32-bit integers sort first, numerically; all other keys follow in
/// lexicographic order.
pub fn compare_keys(a: &str, b: &str) -> Ordering {
    match (integer_key(a), integer_key(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

fn integer_key(key: &str) -> Option<i32> {
    let parsed = key.parse::<i32>().ok()?;
    (parsed.to_string() == key).then_some(parsed)
}

/// Realtime database bridge.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::realtime::RealtimeDatabase;
/// use futures::StreamExt;
///
/// async fn watch(db: &dyn RealtimeDatabase) -> Result<()> {
///     let mut snapshots = db.listen("voice_files").await?;
///     while let Some(snapshot) = snapshots.next().await {
///         println!("{} children", snapshot?.children_count());
///     }
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait RealtimeDatabase: Send + Sync {
    /// Register a value listener on `path`.
    ///
    /// The stream yields the node's current value as soon as it is known and
    /// again after every remote change. Dropping the stream detaches the
    /// listener.
    async fn listen(&self, path: &str) -> Result<SnapshotStream>;
}
