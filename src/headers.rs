//! Ordered, case-insensitive HTTP header list.
//!
//! Fields are keyed by their lowercase name and always kept sorted
//! ascending by that key, with at most one field per key. The same order
//! is used for the outgoing request and for the canonical header block
//! of a signature, so the two can never disagree.

use std::fmt;

use crate::errors::{Result, Ros3Error};

/// One header field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderField {
    name: String,
    lowername: String,
    value: String,
    rendered: String,
}

impl HeaderField {
    fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            lowername: name.to_ascii_lowercase(),
            value: value.to_string(),
            rendered: format!("{name}: {value}"),
        }
    }

    /// Name as originally supplied.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lowercase name; the sort and lookup key.
    pub fn lowername(&self) -> &str {
        &self.lowername
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// `"Name: value"` as written on the wire.
    pub fn rendered(&self) -> &str {
        &self.rendered
    }
}

impl fmt::Display for HeaderField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered)
    }
}

/// Header fields sorted by lowercase name, unique per name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderList {
    fields: Vec<HeaderField>,
}

impl HeaderList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert, replace, or remove a field.
    ///
    /// - `Some(value)`: replaces the value of an existing field with the same
    ///   lowercase name (keeping the new spelling of the name), or inserts a
    ///   new field at its sorted position.
    /// - `None`: removes the field, failing with
    ///   [`Ros3Error::HeaderNotFound`] if it is absent.
    ///
    /// # Panics
    ///
    /// Panics if `name` is empty.
    pub fn set(&mut self, name: &str, value: Option<&str>) -> Result<()> {
        assert!(!name.is_empty(), "header name cannot be empty");
        let key = name.to_ascii_lowercase();
        let found = self
            .fields
            .binary_search_by(|field| field.lowername.as_str().cmp(key.as_str()));

        match (found, value) {
            (Ok(idx), Some(value)) => {
                self.fields[idx] = HeaderField::new(name, value);
            }
            (Err(idx), Some(value)) => {
                self.fields.insert(idx, HeaderField::new(name, value));
            }
            (Ok(idx), None) => {
                self.fields.remove(idx);
            }
            (Err(_), None) => {
                return Err(Ros3Error::HeaderNotFound { name: key });
            }
        }
        Ok(())
    }

    /// Shorthand for `set(name, Some(value))`.
    pub fn insert(&mut self, name: &str, value: &str) -> Result<()> {
        self.set(name, Some(value))
    }

    /// Shorthand for `set(name, None)`.
    pub fn remove(&mut self, name: &str) -> Result<()> {
        self.set(name, None)
    }

    /// Case-insensitive lookup.
    pub fn get(&self, name: &str) -> Option<&str> {
        let key = name.to_ascii_lowercase();
        self.fields
            .binary_search_by(|field| field.lowername.as_str().cmp(key.as_str()))
            .ok()
            .map(|idx| self.fields[idx].value.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields in ascending lowercase-name order.
    pub fn iter(&self) -> impl Iterator<Item = &HeaderField> {
        self.fields.iter()
    }
}

impl<'a> IntoIterator for &'a HeaderList {
    type Item = &'a HeaderField;
    type IntoIter = std::slice::Iter<'a, HeaderField>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}
