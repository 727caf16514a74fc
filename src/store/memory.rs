//! In-memory record store
//!
//! Backs the demo binary and the test suite. An availability switch makes
//! every call fail, which is how stalled-stage behavior is exercised.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::RwLock;
use serde_json::{Map, Value};

use crate::core::error::{PipelineError, Result};
use crate::store::{CollectionRef, DocumentRef, DocumentSnapshot, RecordStore};

pub struct MemoryStore {
    documents: RwLock<BTreeMap<String, Map<String, Value>>>,
    available: AtomicBool,
    calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(BTreeMap::new()),
            available: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
        }
    }

    /// Store a document; non-object values are stored as an empty document
    pub fn insert(&self, reference: &DocumentRef, fields: Value) {
        let fields = match fields {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        self.documents.write().insert(reference.path().to_owned(), fields);
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of store calls served or refused so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check_available(&self, what: &str) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(PipelineError::StoreUnavailable(format!("{} refused", what)))
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore for MemoryStore {
    async fn get_all(&self, refs: &[DocumentRef]) -> Result<Vec<DocumentSnapshot>> {
        self.check_available("batched get")?;

        let documents = self.documents.read();
        Ok(refs
            .iter()
            .map(|reference| match documents.get(reference.path()) {
                Some(fields) => DocumentSnapshot::found(reference.clone(), fields.clone()),
                None => DocumentSnapshot::missing(reference.clone()),
            })
            .collect())
    }

    async fn list(&self, collection: &CollectionRef) -> Result<Vec<DocumentSnapshot>> {
        self.check_available("collection list")?;

        let prefix = format!("{}/", collection.path());
        let documents = self.documents.read();
        Ok(documents
            .range(prefix.clone()..)
            .take_while(|(path, _)| path.starts_with(&prefix))
            .filter(|(path, _)| !path[prefix.len()..].contains('/'))
            .map(|(path, fields)| {
                let id = &path[prefix.len()..];
                DocumentSnapshot::found(collection.doc(id), fields.clone())
            })
            .collect())
    }
}
