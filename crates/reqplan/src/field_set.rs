//! Ordered, duplicate-free field lists.

use serde::Serialize;

/// An insertion-ordered set of field names.
///
/// Field lists are short (a handful of columns), so membership is a linear scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldSet {
    fields: Vec<String>,
}

impl FieldSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `field` if it is not already present. Returns `true` if it was added.
    pub fn ensure(&mut self, field: &str) -> bool {
        if self.contains(field) {
            return false;
        }
        self.fields.push(field.to_string());
        true
    }

    /// Remove `field`. Returns `true` if it was present.
    pub fn remove(&mut self, field: &str) -> bool {
        match self.fields.iter().position(|f| f == field) {
            Some(pos) => {
                self.fields.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.fields
    }
}

impl<S: AsRef<str>> FromIterator<S> for FieldSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = FieldSet::new();
        for field in iter {
            set.ensure(field.as_ref());
        }
        set
    }
}

impl<'a> IntoIterator for &'a FieldSet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}
