//! Filter expressions for `files.list`.
//!
//! The backend grammar is `field op 'literal'` clauses joined by `and`, with
//! string literals in single quotes. Inside a literal `\` and `'` must be
//! backslash-escaped. The finished expression is URL-encoded by the HTTP
//! layer when it is sent as the `q` parameter.

use crate::models::RemoteFile;

/// A structured `files.list` filter. Trashed items are always excluded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    mime_type: Option<String>,
    excluded_mime_type: Option<String>,
    name: Option<String>,
    parent: Option<String>,
}

impl Query {
    /// Match everything that is not trashed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Folders called `name` directly under `parent_id`.
    pub fn folder(name: &str, parent_id: &str) -> Self {
        Self::new()
            .mime_type(crate::FOLDER_MIME_TYPE)
            .named(name)
            .in_parent(parent_id)
    }

    /// Restrict to direct children of `parent_id`.
    pub fn in_parent(mut self, parent_id: &str) -> Self {
        self.parent = Some(parent_id.to_string());
        self
    }

    /// Restrict to items with exactly this name.
    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Restrict to one MIME type.
    pub fn mime_type(mut self, mime_type: &str) -> Self {
        self.mime_type = Some(mime_type.to_string());
        self
    }

    /// Exclude one MIME type.
    pub fn not_mime_type(mut self, mime_type: &str) -> Self {
        self.excluded_mime_type = Some(mime_type.to_string());
        self
    }

    /// Evaluate the filter against an already-fetched item.
    pub fn matches(&self, file: &RemoteFile) -> bool {
        if let Some(mime) = &self.mime_type {
            if &file.mime_type != mime {
                return false;
            }
        }
        if let Some(mime) = &self.excluded_mime_type {
            if &file.mime_type == mime {
                return false;
            }
        }
        if let Some(name) = &self.name {
            if &file.name != name {
                return false;
            }
        }
        if let Some(parent) = &self.parent {
            if !file.parents.iter().any(|p| p == parent) {
                return false;
            }
        }
        true
    }

    /// Render in the backend's query grammar (not yet URL-encoded).
    pub fn to_expression(&self) -> String {
        let mut clauses = Vec::with_capacity(5);
        if let Some(mime) = &self.mime_type {
            clauses.push(format!("mimeType={}", quote(mime)));
        }
        if let Some(mime) = &self.excluded_mime_type {
            clauses.push(format!("mimeType!={}", quote(mime)));
        }
        if let Some(name) = &self.name {
            clauses.push(format!("name={}", quote(name)));
        }
        if let Some(parent) = &self.parent {
            clauses.push(format!("{} in parents", quote(parent)));
        }
        clauses.push("trashed=false".to_string());
        clauses.join(" and ")
    }
}

/// Quote a string literal for the query grammar.
fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        if c == '\\' || c == '\'' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('\'');
    out
}
