//! Case-insensitive, insertion-ordered header storage.
//!
//! [`Headers`] maps a lowercase header name to the ordered sequence of
//! its values. Lookups are case-insensitive because the key is folded to
//! lowercase on every access; the stored key never changes case. The
//! conventional display form (`Content-Type`) is produced at read time by
//! [`Headers::display_name`] and is never persisted.
//!
//! Entries keep their insertion order, values keep their append order,
//! and values are never deduplicated. Replacing the values of an existing
//! name keeps its position.

use std::fmt::Write;
use std::slice;

/// Ordered multi-value header map with case-insensitive names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    /// Invariant: keys are lowercase and unique.
    entries: Vec<(String, Vec<String>)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, lower: &str) -> Option<usize> {
        self.entries.iter().position(|(name, _)| name == lower)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(&name.to_ascii_lowercase()).is_some()
    }

    /// All values for a header, in append order. Absent headers yield an
    /// empty slice, never an error.
    pub fn get(&self, name: &str) -> &[String] {
        match self.position(&name.to_ascii_lowercase()) {
            Some(pos) => &self.entries[pos].1,
            None => &[],
        }
    }

    /// The values of a header joined with `", "`; the empty string when
    /// the header is absent.
    pub fn line(&self, name: &str) -> String {
        self.get(name).join(", ")
    }

    /// Replaces all values for the name. An existing entry keeps its
    /// position; a new one is appended at the end.
    pub fn set(&mut self, name: &str, values: impl Into<HeaderValues>) {
        let lower = name.to_ascii_lowercase();
        let values = values.into().0;
        match self.position(&lower) {
            Some(pos) => self.entries[pos].1 = values,
            None => self.entries.push((lower, values)),
        }
    }

    /// Appends values to the name, creating the entry when absent.
    pub fn append(&mut self, name: &str, values: impl Into<HeaderValues>) {
        let lower = name.to_ascii_lowercase();
        let values = values.into().0;
        match self.position(&lower) {
            Some(pos) => self.entries[pos].1.extend(values),
            None => self.entries.push((lower, values)),
        }
    }

    /// Removes the entry if present; a no-op otherwise.
    pub fn remove(&mut self, name: &str) {
        if let Some(pos) = self.position(&name.to_ascii_lowercase()) {
            self.entries.remove(pos);
        }
    }

    /// Iterates entries in insertion order with their stored (lowercase)
    /// names.
    pub fn iter(&self) -> Iter<'_> {
        Iter { inner: self.entries.iter() }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Title-cases each hyphen-delimited segment of a header name
    /// (`content-type` becomes `Content-Type`). Read-time transform only.
    pub fn display_name(name: &str) -> String {
        let mut out = String::with_capacity(name.len());
        for (i, segment) in name.split('-').enumerate() {
            if i > 0 {
                out.push('-');
            }
            let mut chars = segment.chars();
            if let Some(first) = chars.next() {
                let _ = write!(out, "{}", first.to_ascii_uppercase());
                out.push_str(chars.as_str());
            }
        }
        out
    }
}

impl<'a> IntoIterator for &'a Headers {
    type Item = (&'a str, &'a [String]);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug)]
pub struct Iter<'a> {
    inner: slice::Iter<'a, (String, Vec<String>)>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a str, &'a [String]);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(name, values)| (name.as_str(), values.as_slice()))
    }
}

/// One-or-many header values, so setters accept a scalar or a sequence.
#[derive(Debug, Clone)]
pub struct HeaderValues(pub(crate) Vec<String>);

impl From<&str> for HeaderValues {
    fn from(value: &str) -> Self {
        Self(vec![value.to_owned()])
    }
}

impl From<String> for HeaderValues {
    fn from(value: String) -> Self {
        Self(vec![value])
    }
}

impl From<Vec<String>> for HeaderValues {
    fn from(values: Vec<String>) -> Self {
        Self(values)
    }
}

impl From<Vec<&str>> for HeaderValues {
    fn from(values: Vec<&str>) -> Self {
        Self(values.into_iter().map(str::to_owned).collect())
    }
}

impl From<&[&str]> for HeaderValues {
    fn from(values: &[&str]) -> Self {
        Self(values.iter().map(|value| (*value).to_owned()).collect())
    }
}
