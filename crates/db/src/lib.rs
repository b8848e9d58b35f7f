//! In-process document storage for Shelf.
//!
//! Documents live in [`Collection`]s keyed by a store-generated [`ObjectId`].
//! Collections can declare unique indexes; every write checks them while
//! holding the collection lock, so a write either fully applies or fails.

pub mod collection;
pub mod error;
pub mod object_id;

pub use collection::{Collection, Document};
pub use error::DbError;
pub use object_id::ObjectId;

/// Named database handing out namespaced collections.
#[derive(Debug, Clone)]
pub struct Database {
    name: String,
}

impl Database {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        tracing::info!(target: "shelf-db", database = %name, "database opened");
        Self { name }
    }

    /// Create an empty collection named `{database}.{name}`.
    pub fn collection<T: Document>(&self, name: &str) -> Collection<T> {
        Collection::new(format!("{}.{}", self.name, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct Note {
        id: ObjectId,
    }

    impl Document for Note {
        fn id(&self) -> ObjectId {
            self.id
        }
    }

    #[test]
    fn collections_are_namespaced_by_database() {
        let db = Database::new("shelf");
        let notes: Collection<Note> = db.collection("notes");
        assert_eq!(notes.name(), "shelf.notes");
    }
}
