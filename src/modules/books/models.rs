use serde::{Deserialize, Serialize};
use shelf_db::{Document, ObjectId};

/// A book as stored in the catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    /// Store-assigned identifier, fixed at creation
    pub id: ObjectId,
    /// ISBN-10 or ISBN-13, unique across the catalogue
    pub isbn: String,
    #[serde(rename = "amazon-url", default, skip_serializing_if = "Option::is_none")]
    pub amazon_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
}

impl Book {
    /// Replace every caller-supplied field with the draft's, keeping the id.
    pub fn replaced_with(&self, draft: BookDraft) -> Self {
        draft.into_book(self.id)
    }
}

impl Document for Book {
    fn id(&self) -> ObjectId {
        self.id
    }
}

/// Validated book fields, ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BookDraft {
    pub isbn: String,
    pub amazon_url: Option<String>,
    pub author: Option<String>,
    pub language: Option<String>,
    pub pages: Option<u32>,
    pub publisher: Option<String>,
    pub title: String,
    pub year: Option<i32>,
}

impl BookDraft {
    pub fn into_book(self, id: ObjectId) -> Book {
        Book {
            id,
            isbn: self.isbn,
            amazon_url: self.amazon_url,
            author: self.author,
            language: self.language,
            pages: self.pages,
            publisher: self.publisher,
            title: self.title,
            year: self.year,
        }
    }
}

/// `{"book": ...}` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookEnvelope {
    pub book: Book,
}

/// `{"books": [...]}` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookList {
    pub books: Vec<Book>,
}
