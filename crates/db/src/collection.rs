use std::collections::{BTreeMap, HashMap};

use tokio::sync::RwLock;

use crate::error::DbError;
use crate::object_id::ObjectId;

/// A value that can be stored in a [`Collection`].
pub trait Document: Clone + Send + Sync + 'static {
    /// Identifier the document was stored under.
    fn id(&self) -> ObjectId;
}

type KeyFn<T> = Box<dyn Fn(&T) -> String + Send + Sync>;

struct UniqueIndex<T> {
    name: &'static str,
    key: KeyFn<T>,
}

/// Documents keyed by an insertion sequence, with an id lookup on the side.
/// A replaced document keeps its sequence.
struct Entries<T> {
    next_seq: u64,
    by_seq: BTreeMap<u64, T>,
    seq_of: HashMap<ObjectId, u64>,
}

impl<T: Document> Entries<T> {
    fn new() -> Self {
        Self {
            next_seq: 0,
            by_seq: BTreeMap::new(),
            seq_of: HashMap::new(),
        }
    }

    fn get(&self, id: &ObjectId) -> Option<&T> {
        self.seq_of.get(id).and_then(|seq| self.by_seq.get(seq))
    }

    fn push(&mut self, id: ObjectId, doc: T) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.seq_of.insert(id, seq);
        self.by_seq.insert(seq, doc);
    }

    fn remove(&mut self, id: &ObjectId) -> Option<T> {
        let seq = self.seq_of.remove(id)?;
        self.by_seq.remove(&seq)
    }

    fn values(&self) -> impl Iterator<Item = &T> {
        self.by_seq.values()
    }
}

/// Set of documents keyed by [`ObjectId`], iterated in insertion order.
///
/// Every operation takes the collection lock for its whole duration.
pub struct Collection<T> {
    name: String,
    indexes: Vec<UniqueIndex<T>>,
    docs: RwLock<Entries<T>>,
}

impl<T: Document> Collection<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            indexes: Vec::new(),
            docs: RwLock::new(Entries::new()),
        }
    }

    /// Declare that `key` must be distinct across all documents.
    pub fn with_unique_index(
        mut self,
        name: &'static str,
        key: impl Fn(&T) -> String + Send + Sync + 'static,
    ) -> Self {
        self.indexes.push(UniqueIndex {
            name,
            key: Box::new(key),
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Insert the document produced by `build` for a freshly generated id.
    pub async fn insert_one(&self, build: impl FnOnce(ObjectId) -> T) -> Result<T, DbError> {
        let mut docs = self.docs.write().await;

        let mut id = ObjectId::new();
        while docs.seq_of.contains_key(&id) {
            id = ObjectId::new();
        }

        let doc = build(id);
        if doc.id() != id {
            return Err(DbError::IdChanged {
                expected: id.to_hex(),
                actual: doc.id().to_hex(),
            });
        }
        self.check_unique(&docs, &doc, None)?;

        docs.push(id, doc.clone());
        tracing::debug!(target: "shelf-db", collection = %self.name, %id, "document inserted");
        Ok(doc)
    }

    pub async fn find_by_id(&self, id: &ObjectId) -> Option<T> {
        self.docs.read().await.get(id).cloned()
    }

    /// Oldest document matching `filter`.
    pub async fn find_one(&self, filter: impl Fn(&T) -> bool) -> Option<T> {
        self.docs.read().await.values().find(|doc| filter(doc)).cloned()
    }

    /// Every document, oldest first.
    pub async fn find_all(&self) -> Vec<T> {
        self.docs.read().await.values().cloned().collect()
    }

    pub async fn count(&self) -> usize {
        self.docs.read().await.by_seq.len()
    }

    /// Replace the oldest document matching `filter` with `replace(current)`.
    ///
    /// Returns `Ok(None)` when nothing matches. The replacement must keep the
    /// original id and satisfy every unique index against the other documents.
    pub async fn replace_one(
        &self,
        filter: impl Fn(&T) -> bool,
        replace: impl FnOnce(&T) -> T,
    ) -> Result<Option<T>, DbError> {
        let mut docs = self.docs.write().await;

        let Some((&seq, current)) = docs.by_seq.iter().find(|(_, doc)| filter(doc)) else {
            return Ok(None);
        };
        let id = current.id();
        let replacement = replace(current);

        if replacement.id() != id {
            return Err(DbError::IdChanged {
                expected: id.to_hex(),
                actual: replacement.id().to_hex(),
            });
        }
        self.check_unique(&docs, &replacement, Some(id))?;

        docs.by_seq.insert(seq, replacement.clone());
        tracing::debug!(target: "shelf-db", collection = %self.name, %id, "document replaced");
        Ok(Some(replacement))
    }

    pub async fn delete_by_id(&self, id: &ObjectId) -> Option<T> {
        let removed = self.docs.write().await.remove(id);
        if removed.is_some() {
            tracing::debug!(target: "shelf-db", collection = %self.name, %id, "document deleted");
        }
        removed
    }

    /// Remove every document, returning how many were removed.
    pub async fn delete_many(&self) -> usize {
        let mut docs = self.docs.write().await;
        let removed = docs.by_seq.len();
        docs.by_seq.clear();
        docs.seq_of.clear();
        tracing::debug!(target: "shelf-db", collection = %self.name, removed, "collection cleared");
        removed
    }

    fn check_unique(
        &self,
        docs: &Entries<T>,
        candidate: &T,
        skip: Option<ObjectId>,
    ) -> Result<(), DbError> {
        for index in &self.indexes {
            let value = (index.key)(candidate);
            let taken = docs
                .values()
                .filter(|doc| Some(doc.id()) != skip)
                .any(|doc| (index.key)(doc) == value);

            if taken {
                return Err(DbError::DuplicateKey {
                    collection: self.name.clone(),
                    index: index.name,
                    value,
                });
            }
        }
        Ok(())
    }
}
