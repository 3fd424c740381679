//! Parameter-safe SQL assembly.

use crate::error::{PlanError, PlanResult};
use crate::ident::Ident;
use bytes::BytesMut;
use postgres_types::{Format, IsNull, ToSql, Type, to_sql_checked};
use std::fmt::Write as _;
use std::sync::Arc;

#[derive(Debug, Clone)]
enum SqlPart {
    Raw(String),
    Param,
}

/// A rendered statement (or fragment of one) plus its bound values.
///
/// Plan fragments are built independently (an `EXISTS` per relation, one condition
/// per filter) and spliced together; placeholders are numbered only when the
/// whole statement is rendered.
#[must_use]
#[derive(Clone, Default)]
pub struct Sql {
    parts: Vec<SqlPart>,
    params: Vec<Arc<dyn ToSql + Sync + Send>>,
}

impl Sql {
    pub fn new(initial_sql: impl Into<String>) -> Self {
        Self {
            parts: vec![SqlPart::Raw(initial_sql.into())],
            params: Vec::new(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.iter().all(|p| match p {
            SqlPart::Raw(s) => s.is_empty(),
            SqlPart::Param => false,
        })
    }

    /// Append SQL text. Never pass client input here.
    pub fn push(&mut self, sql: &str) -> &mut Self {
        if sql.is_empty() {
            return self;
        }

        match self.parts.last_mut() {
            Some(SqlPart::Raw(last)) => last.push_str(sql),
            _ => self.parts.push(SqlPart::Raw(sql.to_string())),
        }
        self
    }

    /// Bind `value` at this position.
    pub fn push_bind<T>(&mut self, value: T) -> &mut Self
    where
        T: ToSql + Sync + Send + 'static,
    {
        self.parts.push(SqlPart::Param);
        self.params.push(Arc::new(value));
        self
    }

    /// Bind a client-supplied literal in text format, letting the server coerce it.
    pub fn push_text(&mut self, value: impl Into<String>) -> &mut Self {
        self.push_bind(TextLiteral(value.into()))
    }

    /// Append a validated identifier, double-quoted.
    pub fn push_ident(&mut self, ident: &Ident) -> &mut Self {
        match self.parts.last_mut() {
            Some(SqlPart::Raw(last)) => ident.write_sql(last),
            _ => {
                let mut s = String::new();
                ident.write_sql(&mut s);
                self.parts.push(SqlPart::Raw(s));
            }
        }
        self
    }

    /// Splice in a fragment together with its bound values.
    pub fn push_sql(&mut self, mut other: Sql) -> &mut Self {
        self.parts.append(&mut other.parts);
        self.params.append(&mut other.params);
        self
    }

    /// Append `fragments` separated by `sep`.
    pub fn push_joined(&mut self, fragments: impl IntoIterator<Item = Sql>, sep: &str) -> &mut Self {
        for (i, fragment) in fragments.into_iter().enumerate() {
            if i > 0 {
                self.push(sep);
            }
            self.push_sql(fragment);
        }
        self
    }

    /// Statement text with `$n` placeholders.
    pub fn to_sql(&self) -> String {
        let mut out = String::new();
        let mut idx = 0usize;
        for part in &self.parts {
            match part {
                SqlPart::Raw(s) => out.push_str(s),
                SqlPart::Param => {
                    idx += 1;
                    let _ = write!(out, "${idx}");
                }
            }
        }
        out
    }

    /// Bound values in placeholder order.
    pub fn params_ref(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect()
    }

    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    pub(crate) fn validate(&self) -> PlanResult<()> {
        let placeholder_count = self
            .parts
            .iter()
            .filter(|p| matches!(p, SqlPart::Param))
            .count();

        if placeholder_count != self.params.len() {
            return Err(PlanError::validation(format!(
                "statement has {placeholder_count} placeholders but {} bound values",
                self.params.len()
            )));
        }
        Ok(())
    }
}

impl std::fmt::Debug for Sql {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sql")
            .field("sql", &self.to_sql())
            .field("params", &self.params.len())
            .finish()
    }
}

/// A string sent in Postgres text format.
///
/// Accepts any parameter type; the server parses the text as the inferred type of
/// the placeholder (`numeric` for `price >= $1`, `date` for `published_on = $1`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLiteral(pub String);

impl ToSql for TextLiteral {
    fn to_sql(
        &self,
        _ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        out.extend_from_slice(self.0.as_bytes());
        Ok(IsNull::No)
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    fn encode_format(&self, _ty: &Type) -> Format {
        Format::Text
    }

    to_sql_checked!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binds_are_numbered_left_to_right() {
        let mut q = Sql::new("SELECT id FROM posts WHERE price >= ");
        q.push_text("10").push(" LIMIT ").push_bind(16_i64);

        assert_eq!(q.to_sql(), "SELECT id FROM posts WHERE price >= $1 LIMIT $2");
        assert_eq!(q.params_ref().len(), 2);
        assert!(q.validate().is_ok());
    }

    #[test]
    fn composed_fragments_renumber() {
        let mut a = Sql::empty();
        a.push("x = ").push_text("1");
        let mut b = Sql::empty();
        b.push("y = ").push_text("2");

        let mut q = Sql::new("SELECT 1 WHERE ");
        q.push_joined([a, b], " AND ");
        assert_eq!(q.to_sql(), "SELECT 1 WHERE x = $1 AND y = $2");
        assert_eq!(q.param_count(), 2);
    }

    #[test]
    fn idents_are_quoted() {
        let mut q = Sql::new("SELECT ");
        q.push_ident(&Ident::qualified("user", "name").unwrap());
        assert_eq!(q.to_sql(), r#"SELECT "user"."name""#);
    }

    #[test]
    fn empty_builder() {
        assert!(Sql::empty().is_empty());
        assert!(!Sql::new("SELECT").is_empty());
    }

    #[test]
    fn text_literal_accepts_any_type() {
        assert!(<TextLiteral as ToSql>::accepts(&Type::INT8));
        assert!(<TextLiteral as ToSql>::accepts(&Type::DATE));
        let lit = TextLiteral("42".into());
        assert!(matches!(lit.encode_format(&Type::INT4), Format::Text));
    }
}
