//! External record store boundary
//!
//! Records are addressed by slash-separated paths alternating collection and
//! document ids (`users/<uid>/vessels/<vid>/modules/<mid>`). The pipeline only
//! ever asks two questions of the store: "fetch these documents" (existence
//! plus fields, batched) and "list this sub-collection".

pub mod memory;

use std::fmt;
use std::future::Future;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::core::error::Result;

pub use memory::MemoryStore;

/// Reference to a single document
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentRef {
    path: String,
}

impl DocumentRef {
    /// Document `id` in the top-level `collection`
    pub fn root(collection: &str, id: &str) -> Self {
        Self {
            path: format!("{}/{}", collection, id),
        }
    }

    pub fn collection(&self, name: &str) -> CollectionRef {
        CollectionRef {
            path: format!("{}/{}", self.path, name),
        }
    }

    /// Last path segment
    pub fn id(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// Reference to a (sub-)collection
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionRef {
    path: String,
}

impl CollectionRef {
    pub fn doc(&self, id: &str) -> DocumentRef {
        DocumentRef {
            path: format!("{}/{}", self.path, id),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for CollectionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// Point-in-time read of one document
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    pub reference: DocumentRef,
    pub exists: bool,
    pub fields: Map<String, Value>,
}

impl DocumentSnapshot {
    pub fn found(reference: DocumentRef, fields: Map<String, Value>) -> Self {
        Self {
            reference,
            exists: true,
            fields,
        }
    }

    pub fn missing(reference: DocumentRef) -> Self {
        Self {
            reference,
            exists: false,
            fields: Map::new(),
        }
    }

    pub fn id(&self) -> &str {
        self.reference.id()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Typed field read; `None` when absent or of the wrong shape
    pub fn get_as<T: DeserializeOwned>(&self, field: &str) -> Option<T> {
        self.get(field)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Decode the whole document into a record type
    pub fn decode<T: DeserializeOwned>(&self) -> Option<T> {
        serde_json::from_value(Value::Object(self.fields.clone())).ok()
    }
}

/// Batched access to the external record store
pub trait RecordStore: Send + Sync + 'static {
    /// Existence and fields of every referenced document
    ///
    /// The result carries one snapshot per reference; callers correlate by
    /// `DocumentSnapshot::reference`, never by position.
    fn get_all(&self, refs: &[DocumentRef]) -> impl Future<Output = Result<Vec<DocumentSnapshot>>> + Send;

    /// Every document of a sub-collection, ordered by document id
    fn list(&self, collection: &CollectionRef) -> impl Future<Output = Result<Vec<DocumentSnapshot>>> + Send;
}
