//! Safe SQL identifier handling.
//!
//! Every table, alias and column name that reaches rendered SQL goes through [`Ident`].
//! Parts are validated against `[A-Za-z_][A-Za-z0-9_$]*` and always rendered
//! double-quoted, so reserved words such as `user` or `order` are usable as
//! resource names and aliases.
//!
//! # Example
//! ```ignore
//! use reqplan::Ident;
//!
//! let col = Ident::parse("tags.id")?;
//! assert_eq!(col.to_sql(), r#""tags"."id""#);
//! # Ok::<(), reqplan::PlanError>(())
//! ```

use crate::error::{PlanError, PlanResult};

/// A validated, possibly dotted SQL identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    parts: Vec<String>,
}

impl Ident {
    /// Parse an identifier such as `title` or `tags.id`.
    pub fn parse(s: &str) -> PlanResult<Self> {
        if s.is_empty() {
            return Err(PlanError::validation("Identifier cannot be empty"));
        }

        let mut parts = Vec::new();
        for segment in s.split('.') {
            validate_part(segment, s)?;
            parts.push(segment.to_string());
        }
        Ok(Self { parts })
    }

    /// Parse `column` and qualify it with `qualifier` unless it is already dotted.
    pub fn qualified(qualifier: &str, column: &str) -> PlanResult<Self> {
        let mut ident = Self::parse(column)?;
        if ident.parts.len() == 1 {
            validate_part(qualifier, qualifier)?;
            ident.parts.insert(0, qualifier.to_string());
        }
        Ok(ident)
    }

    /// Whether the identifier has more than one part.
    pub fn is_dotted(&self) -> bool {
        self.parts.len() > 1
    }

    /// The last part (the bare column name).
    pub fn name(&self) -> &str {
        self.parts.last().map(String::as_str).unwrap_or_default()
    }

    /// Render the identifier as SQL.
    pub fn to_sql(&self) -> String {
        let mut out = String::with_capacity(self.parts.iter().map(|p| p.len() + 3).sum());
        self.write_sql(&mut out);
        out
    }

    pub(crate) fn write_sql(&self, out: &mut String) {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            out.push('"');
            out.push_str(part);
            out.push('"');
        }
    }
}

/// Check a single identifier part.
pub(crate) fn validate_part(part: &str, whole: &str) -> PlanResult<()> {
    let mut chars = part.chars();
    match chars.next() {
        None => {
            return Err(PlanError::validation(format!(
                "Empty identifier segment in '{whole}'"
            )));
        }
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        Some(c) => {
            return Err(PlanError::validation(format!(
                "Invalid identifier start character '{c}' in '{whole}'"
            )));
        }
    }
    if let Some(c) = chars.find(|&c| !(c == '_' || c == '$' || c.is_ascii_alphanumeric())) {
        return Err(PlanError::validation(format!(
            "Invalid character '{c}' in identifier '{whole}'"
        )));
    }
    Ok(())
}

/// Whether `s` is a valid (possibly dotted) identifier.
pub fn is_valid_ident(s: &str) -> bool {
    Ident::parse(s).is_ok()
}
