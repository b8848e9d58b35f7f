//! Declarative payload schema for books.
//!
//! [`BOOK_SCHEMA`] lists every accepted field once; [`validate_book`] walks it
//! and either yields a typed [`BookDraft`] or every violation it found.

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{json, Map, Value};
use thiserror::Error;

use super::models::BookDraft;

/// ISBN-10 (nine digits plus a digit or `X` check character) or ISBN-13.
static ISBN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[0-9]{9}[0-9X]|[0-9]{13})$").expect("isbn pattern compiles"));

/// Whether `value` has the shape of an ISBN. Check digits are not verified.
pub fn is_isbn(value: &str) -> bool {
    ISBN_PATTERN.is_match(value)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    Isbn,
    Url,
    Text,
    /// Non-negative integer fitting in `u32`.
    Count,
    /// Signed integer fitting in `i32`.
    Year,
}

#[derive(Debug, Clone, Copy)]
struct FieldRule {
    name: &'static str,
    kind: FieldKind,
    /// Required fields reject missing, null and blank values.
    required: bool,
}

const BOOK_SCHEMA: &[FieldRule] = &[
    FieldRule {
        name: "isbn",
        kind: FieldKind::Isbn,
        required: true,
    },
    FieldRule {
        name: "amazon-url",
        kind: FieldKind::Url,
        required: false,
    },
    FieldRule {
        name: "author",
        kind: FieldKind::Text,
        required: false,
    },
    FieldRule {
        name: "language",
        kind: FieldKind::Text,
        required: false,
    },
    FieldRule {
        name: "pages",
        kind: FieldKind::Count,
        required: false,
    },
    FieldRule {
        name: "publisher",
        kind: FieldKind::Text,
        required: false,
    },
    FieldRule {
        name: "title",
        kind: FieldKind::Text,
        required: true,
    },
    FieldRule {
        name: "year",
        kind: FieldKind::Year,
        required: false,
    },
];

/// Why a single field was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Violation {
    ExpectedObject,
    Required,
    Null,
    Blank,
    ExpectedString,
    ExpectedInteger,
    OutOfRange,
    InvalidIsbn,
    InvalidUrl,
    AssignedByStore,
    UnknownField,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Violation::ExpectedObject => "payload must be a JSON object",
            Violation::Required => "is required",
            Violation::Null => "must not be null",
            Violation::Blank => "must not be blank",
            Violation::ExpectedString => "must be a string",
            Violation::ExpectedInteger => "must be an integer",
            Violation::OutOfRange => "is out of range",
            Violation::InvalidIsbn => "must be a 10 or 13 character ISBN",
            Violation::InvalidUrl => "must be an absolute http(s) URL",
            Violation::AssignedByStore => "is assigned by the store",
            Violation::UnknownField => "is not a book field",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub error: Violation,
}

impl FieldViolation {
    fn new(field: impl Into<String>, error: Violation) -> Self {
        Self {
            field: field.into(),
            error,
        }
    }

    /// Detail entry for the error response body.
    pub fn to_detail(&self) -> Value {
        json!({
            "field": self.field,
            "error": self.error,
            "message": format!("{} {}", self.field, self.error),
        })
    }
}

/// Rejected payload; carries every violation found.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("book payload is invalid ({} violation(s))", .violations.len())]
pub struct ValidationError {
    pub violations: Vec<FieldViolation>,
}

impl ValidationError {
    pub fn has(&self, field: &str, error: Violation) -> bool {
        self.violations
            .iter()
            .any(|v| v.field == field && v.error == error)
    }
}

enum FieldValue {
    Text(String),
    Count(u32),
    Year(i32),
}

impl FieldRule {
    /// `Ok(None)` means an optional field was absent or null.
    fn check(&self, value: Option<&Value>) -> Result<Option<FieldValue>, Violation> {
        let value = match value {
            None if self.required => return Err(Violation::Required),
            Some(Value::Null) if self.required => return Err(Violation::Null),
            None | Some(Value::Null) => return Ok(None),
            Some(value) => value,
        };

        match self.kind {
            FieldKind::Isbn => {
                let text = value.as_str().ok_or(Violation::ExpectedString)?;
                if !is_isbn(text) {
                    return Err(Violation::InvalidIsbn);
                }
                Ok(Some(FieldValue::Text(text.to_string())))
            }
            FieldKind::Url => {
                let text = value.as_str().ok_or(Violation::ExpectedString)?;
                if !is_web_url(text) {
                    return Err(Violation::InvalidUrl);
                }
                Ok(Some(FieldValue::Text(text.to_string())))
            }
            FieldKind::Text => {
                let text = value.as_str().ok_or(Violation::ExpectedString)?;
                if self.required && text.trim().is_empty() {
                    return Err(Violation::Blank);
                }
                Ok(Some(FieldValue::Text(text.to_string())))
            }
            FieldKind::Count => {
                let n = whole_number(value).ok_or(Violation::ExpectedInteger)?;
                let n = u32::try_from(n).map_err(|_| Violation::OutOfRange)?;
                Ok(Some(FieldValue::Count(n)))
            }
            FieldKind::Year => {
                let n = whole_number(value).ok_or(Violation::ExpectedInteger)?;
                let n = i32::try_from(n).map_err(|_| Violation::OutOfRange)?;
                Ok(Some(FieldValue::Year(n)))
            }
        }
    }
}

/// Integer value of a JSON number, including floats with no fractional part
/// such as `250.0`. Floats beyond the `i128` range saturate and fail the
/// caller's range check.
fn whole_number(value: &Value) -> Option<i128> {
    if let Some(n) = value.as_i64() {
        return Some(i128::from(n));
    }
    if let Some(n) = value.as_u64() {
        return Some(i128::from(n));
    }
    let n = value.as_f64()?;
    (n.is_finite() && n.fract() == 0.0).then_some(n as i128)
}

fn is_web_url(text: &str) -> bool {
    match url::Url::parse(text) {
        Ok(parsed) => {
            matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some()
        }
        Err(_) => false,
    }
}

/// Check a raw payload against [`BOOK_SCHEMA`].
pub fn validate_book(payload: &Value) -> Result<BookDraft, ValidationError> {
    let Some(object) = payload.as_object() else {
        return Err(ValidationError {
            violations: vec![FieldViolation::new("$", Violation::ExpectedObject)],
        });
    };

    let mut violations = unexpected_fields(object);
    let mut accepted: HashMap<&'static str, FieldValue> = HashMap::new();

    for rule in BOOK_SCHEMA {
        match rule.check(object.get(rule.name)) {
            Ok(Some(value)) => {
                accepted.insert(rule.name, value);
            }
            Ok(None) => {}
            Err(error) => violations.push(FieldViolation::new(rule.name, error)),
        }
    }

    if !violations.is_empty() {
        return Err(ValidationError { violations });
    }

    // Required fields are guaranteed present at this point.
    Ok(BookDraft {
        isbn: take_text(&mut accepted, "isbn").unwrap_or_default(),
        amazon_url: take_text(&mut accepted, "amazon-url"),
        author: take_text(&mut accepted, "author"),
        language: take_text(&mut accepted, "language"),
        pages: match accepted.remove("pages") {
            Some(FieldValue::Count(n)) => Some(n),
            _ => None,
        },
        publisher: take_text(&mut accepted, "publisher"),
        title: take_text(&mut accepted, "title").unwrap_or_default(),
        year: match accepted.remove("year") {
            Some(FieldValue::Year(n)) => Some(n),
            _ => None,
        },
    })
}

fn unexpected_fields(object: &Map<String, Value>) -> Vec<FieldViolation> {
    object
        .keys()
        .filter_map(|key| {
            if key == "id" || key == "_id" {
                Some(FieldViolation::new(key.as_str(), Violation::AssignedByStore))
            } else if BOOK_SCHEMA.iter().all(|rule| rule.name != key) {
                Some(FieldViolation::new(key.as_str(), Violation::UnknownField))
            } else {
                None
            }
        })
        .collect()
}

fn take_text(accepted: &mut HashMap<&'static str, FieldValue>, name: &str) -> Option<String> {
    match accepted.remove(name) {
        Some(FieldValue::Text(text)) => Some(text),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_payload() -> Value {
        json!({
            "isbn": "1234567890",
            "amazon-url": "https://www.amazon.com/dp/1234567890",
            "author": "John Doe",
            "language": "English",
            "pages": 250,
            "publisher": "Acme Publishing",
            "title": "The Ultimate Guide to Testing",
            "year": 2023
        })
    }

    #[test]
    fn complete_payload_is_forwarded_unchanged() {
        let draft = validate_book(&complete_payload()).unwrap();

        assert_eq!(
            draft,
            BookDraft {
                isbn: "1234567890".to_string(),
                amazon_url: Some("https://www.amazon.com/dp/1234567890".to_string()),
                author: Some("John Doe".to_string()),
                language: Some("English".to_string()),
                pages: Some(250),
                publisher: Some("Acme Publishing".to_string()),
                title: "The Ultimate Guide to Testing".to_string(),
                year: Some(2023),
            }
        );
    }

    #[test]
    fn minimal_payload_needs_only_isbn_and_title() {
        let draft = validate_book(&json!({"isbn": "9780306406157", "title": "Minimal"})).unwrap();
        assert_eq!(draft.isbn, "9780306406157");
        assert_eq!(draft.pages, None);
        assert_eq!(draft.amazon_url, None);
    }

    #[test]
    fn optional_nulls_are_treated_as_absent() {
        let draft =
            validate_book(&json!({"isbn": "123456789X", "title": "T", "year": null})).unwrap();
        assert_eq!(draft.year, None);
    }

    #[test]
    fn every_wrong_field_is_reported() {
        let err = validate_book(&json!({
            "isbn": "invalid",
            "amazon-url": "not-a-url",
            "author": 123,
            "language": true,
            "pages": "not-a-number",
            "publisher": {},
            "title": null,
            "year": "not-a-number"
        }))
        .unwrap_err();

        assert_eq!(err.violations.len(), 8);
        assert!(err.has("isbn", Violation::InvalidIsbn));
        assert!(err.has("amazon-url", Violation::InvalidUrl));
        assert!(err.has("author", Violation::ExpectedString));
        assert!(err.has("language", Violation::ExpectedString));
        assert!(err.has("pages", Violation::ExpectedInteger));
        assert!(err.has("publisher", Violation::ExpectedString));
        assert!(err.has("title", Violation::Null));
        assert!(err.has("year", Violation::ExpectedInteger));
    }

    #[test]
    fn empty_object_misses_required_fields() {
        let err = validate_book(&json!({})).unwrap_err();
        assert_eq!(err.violations.len(), 2);
        assert!(err.has("isbn", Violation::Required));
        assert!(err.has("title", Violation::Required));
    }

    #[test]
    fn non_object_payload_is_rejected() {
        let err = validate_book(&json!(["isbn"])).unwrap_err();
        assert!(err.has("$", Violation::ExpectedObject));
    }

    #[test]
    fn numeric_ranges_are_enforced() {
        let mut payload = complete_payload();
        payload["pages"] = json!(-1);
        payload["year"] = json!(1999.5);
        let err = validate_book(&payload).unwrap_err();
        assert!(err.has("pages", Violation::OutOfRange));
        assert!(err.has("year", Violation::ExpectedInteger));

        payload["pages"] = json!(250.5);
        payload["year"] = json!(u64::MAX);
        let err = validate_book(&payload).unwrap_err();
        assert!(err.has("pages", Violation::ExpectedInteger));
        assert!(err.has("year", Violation::OutOfRange));

        payload["pages"] = json!(0);
        payload["year"] = json!(-350);
        assert!(validate_book(&payload).is_ok());
    }

    #[test]
    fn whole_floats_count_as_integers() {
        let mut payload = complete_payload();
        payload["pages"] = json!(250.0);
        payload["year"] = json!(1e3);
        let draft = validate_book(&payload).unwrap();
        assert_eq!(draft.pages, Some(250));
        assert_eq!(draft.year, Some(1000));

        payload["pages"] = json!(-1.0);
        payload["year"] = json!(1e20);
        let err = validate_book(&payload).unwrap_err();
        assert!(err.has("pages", Violation::OutOfRange));
        assert!(err.has("year", Violation::OutOfRange));
    }

    #[test]
    fn blank_title_is_rejected() {
        let mut payload = complete_payload();
        payload["title"] = json!("   ");
        let err = validate_book(&payload).unwrap_err();
        assert_eq!(err.violations, vec![FieldViolation::new("title", Violation::Blank)]);
    }

    #[test]
    fn caller_supplied_id_and_unknown_fields_are_rejected() {
        let mut payload = complete_payload();
        payload["id"] = json!("000000000000000000000000");
        payload["subtitle"] = json!("A Sequel");
        let err = validate_book(&payload).unwrap_err();
        assert!(err.has("id", Violation::AssignedByStore));
        assert!(err.has("subtitle", Violation::UnknownField));
    }

    #[test]
    fn url_must_be_absolute_web_url() {
        assert!(is_web_url("https://www.amazon.com/dp/1234567890"));
        assert!(is_web_url("http://example.org"));
        assert!(!is_web_url("not-a-url"));
        assert!(!is_web_url("ftp://example.org/book"));
        assert!(!is_web_url("mailto:someone@example.org"));
    }

    #[test]
    fn isbn_shapes() {
        assert!(is_isbn("1234567890"));
        assert!(is_isbn("0000000000"));
        assert!(is_isbn("123456789X"));
        assert!(is_isbn("9780306406157"));
        assert!(!is_isbn("invalid"));
        assert!(!is_isbn("123456789"));
        assert!(!is_isbn("12345678901"));
        assert!(!is_isbn("978-0306406157"));
    }

    #[test]
    fn details_name_field_and_reason() {
        let detail = FieldViolation::new("pages", Violation::ExpectedInteger).to_detail();
        assert_eq!(
            detail,
            json!({
                "field": "pages",
                "error": "expected_integer",
                "message": "pages must be an integer"
            })
        );
    }
}
