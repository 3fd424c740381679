//! Compiled query plans and their SQL rendering.
//!
//! A [`QueryPlan`] is plain data: it can be inspected, compared and serialized
//! before anything touches the database. [`QueryPlan::to_sql`] renders it into one
//! parameterised Postgres statement that returns each row as a JSON object, with
//! eager-loaded relations nested under their relation name:
//!
//! ```text
//! SELECT row_to_json(t) FROM (
//!   SELECT "post"."title", "post"."author_id",
//!     (SELECT row_to_json(r) FROM (SELECT "author"."name", "author"."id"
//!        FROM "users" AS "author" WHERE "author"."id" = "post"."author_id" LIMIT 1) AS r) AS "author"
//!   FROM "posts" AS "post"
//!   WHERE "post"."price" >= $1
//!   ORDER BY "post"."title" ASC
//!   LIMIT $2 OFFSET $3
//! ) AS t
//! ```

use crate::error::PlanResult;
use crate::field_set::FieldSet;
use crate::ident::Ident;
use crate::parse::WILDCARD;
use crate::request::{FilterExpression, Pagination, SortSpec};
use crate::sql::Sql;
use serde::Serialize;

/// How a related resource joins back to the main resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Correlation {
    /// `related.<owner_key> = main.<foreign_key>`
    ToOne {
        foreign_key: String,
        owner_key: String,
    },
    /// `related.<foreign_key> = main.<local_key>`
    ToMany {
        foreign_key: String,
        local_key: String,
    },
    /// `pivot.<related_pivot_key> = related.<related_key>` and
    /// `pivot.<foreign_pivot_key> = main.<local_key>`
    ManyToMany {
        pivot: String,
        foreign_pivot_key: String,
        related_pivot_key: String,
        local_key: String,
        related_key: String,
    },
}

impl Correlation {
    pub fn is_to_one(&self) -> bool {
        matches!(self, Correlation::ToOne { .. })
    }
}

/// A related resource fetched alongside the main rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EagerLoad {
    /// Relation name; also the alias of the related table and the output key.
    pub relation: String,
    pub table: String,
    pub primary_key: String,
    pub columns: FieldSet,
    pub correlation: Correlation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
}

/// A `WHERE` condition on the main query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    /// Direct comparison on a main resource column.
    Filter(FilterExpression),
    /// Keep main rows with at least one related row matching every filter.
    Exists {
        relation: String,
        table: String,
        correlation: Correlation,
        filters: Vec<FilterExpression>,
    },
}

/// Single-entity lookup for `show`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Lookup {
    PrimaryKey {
        key: String,
        value: String,
    },
    /// Matches either key; the primary key is compared as text.
    PrimaryOrAlternate {
        key: String,
        alternate: String,
        value: String,
    },
}

/// The compiled, executable form of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryPlan {
    pub resource_type: String,
    pub table: String,
    /// Alias of the main table (the singular resource name).
    pub alias: String,
    pub columns: FieldSet,
    pub eager: Vec<EagerLoad>,
    pub predicates: Vec<Predicate>,
    pub sort: Vec<SortSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lookup: Option<Lookup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<Pagination>,
}

impl QueryPlan {
    /// Whether this plan yields at most one row.
    pub fn is_single(&self) -> bool {
        self.lookup.is_some()
    }

    /// Render the full statement.
    ///
    /// Single lookups are capped at one row. Paged plans fetch one row past the
    /// window so the executor can tell whether a next page exists.
    pub fn to_sql(&self) -> PlanResult<Sql> {
        let mut sql = Sql::new("SELECT row_to_json(t) FROM (");
        sql.push_sql(self.select_sql()?);

        if self.lookup.is_some() {
            sql.push(" LIMIT 1");
        } else if let Some(window) = &self.window {
            sql.push(" LIMIT ")
                .push_bind(to_i64(window.per_page.saturating_add(1)))
                .push(" OFFSET ")
                .push_bind(to_i64(window.offset()));
        }
        sql.push(") AS t");
        sql.validate()?;
        Ok(sql)
    }

    /// Render the inner `SELECT` without the row window.
    pub fn select_sql(&self) -> PlanResult<Sql> {
        let mut sql = Sql::new("SELECT ");
        push_projection(&mut sql, &self.alias, &self.columns)?;
        for eager in &self.eager {
            sql.push(", ");
            push_eager(&mut sql, &self.alias, eager)?;
        }

        sql.push(" FROM ");
        push_table(&mut sql, &self.table, &self.alias)?;

        let mut conditions = Vec::new();
        if let Some(lookup) = &self.lookup {
            conditions.push(lookup_sql(&self.alias, lookup)?);
        }
        for predicate in &self.predicates {
            conditions.push(predicate_sql(&self.alias, predicate)?);
        }
        if !conditions.is_empty() {
            sql.push(" WHERE ");
            sql.push_joined(conditions, " AND ");
        }

        if !self.sort.is_empty() {
            sql.push(" ORDER BY ");
            for (i, spec) in self.sort.iter().enumerate() {
                if i > 0 {
                    sql.push(", ");
                }
                sql.push_ident(&Ident::qualified(&self.alias, &spec.field)?)
                    .push(" ")
                    .push(spec.direction.sql());
            }
        }
        Ok(sql)
    }
}

fn to_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn push_table(sql: &mut Sql, table: &str, alias: &str) -> PlanResult<()> {
    sql.push_ident(&Ident::parse(table)?)
        .push(" AS ")
        .push_ident(&Ident::parse(alias)?);
    Ok(())
}

fn push_projection(sql: &mut Sql, alias: &str, columns: &FieldSet) -> PlanResult<()> {
    if columns.is_empty() {
        return push_projection(sql, alias, &[WILDCARD].into_iter().collect::<FieldSet>());
    }
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            sql.push(", ");
        }
        if column == WILDCARD {
            sql.push_ident(&Ident::parse(alias)?).push(".*");
        } else {
            sql.push_ident(&Ident::qualified(alias, column)?);
        }
    }
    Ok(())
}

/// `FROM <related> AS <relation>` plus the pivot join for many-to-many.
fn push_related_from(
    sql: &mut Sql,
    table: &str,
    relation: &str,
    correlation: &Correlation,
) -> PlanResult<()> {
    push_table(sql, table, relation)?;
    if let Correlation::ManyToMany {
        pivot,
        related_pivot_key,
        related_key,
        ..
    } = correlation
    {
        sql.push(" INNER JOIN ")
            .push_ident(&Ident::parse(pivot)?)
            .push(" ON ")
            .push_ident(&Ident::qualified(pivot, related_pivot_key)?)
            .push(" = ")
            .push_ident(&Ident::qualified(relation, related_key)?);
    }
    Ok(())
}

/// The condition tying a related row to the current main row.
fn push_correlation(
    sql: &mut Sql,
    main_alias: &str,
    relation: &str,
    correlation: &Correlation,
) -> PlanResult<()> {
    let (left, right) = match correlation {
        Correlation::ToOne {
            foreign_key,
            owner_key,
        } => (
            Ident::qualified(relation, owner_key)?,
            Ident::qualified(main_alias, foreign_key)?,
        ),
        Correlation::ToMany {
            foreign_key,
            local_key,
        } => (
            Ident::qualified(relation, foreign_key)?,
            Ident::qualified(main_alias, local_key)?,
        ),
        Correlation::ManyToMany {
            pivot,
            foreign_pivot_key,
            local_key,
            ..
        } => (
            Ident::qualified(pivot, foreign_pivot_key)?,
            Ident::qualified(main_alias, local_key)?,
        ),
    };
    sql.push_ident(&left).push(" = ").push_ident(&right);
    Ok(())
}

fn push_eager(sql: &mut Sql, main_alias: &str, eager: &EagerLoad) -> PlanResult<()> {
    let relation = eager.relation.as_str();
    if eager.correlation.is_to_one() {
        sql.push("(SELECT row_to_json(r) FROM (SELECT ");
    } else {
        sql.push("(SELECT COALESCE(json_agg(r), '[]'::json) FROM (SELECT ");
    }
    push_projection(sql, relation, &eager.columns)?;
    sql.push(" FROM ");
    push_related_from(sql, &eager.table, relation, &eager.correlation)?;
    sql.push(" WHERE ");
    push_correlation(sql, main_alias, relation, &eager.correlation)?;

    if eager.correlation.is_to_one() {
        sql.push(" LIMIT 1");
    } else {
        sql.push(" ORDER BY ")
            .push_ident(&Ident::qualified(relation, &eager.primary_key)?);
        if let Some(limit) = eager.limit {
            sql.push(" LIMIT ").push_bind(to_i64(limit));
        }
    }
    sql.push(") AS r) AS ").push_ident(&Ident::parse(relation)?);
    Ok(())
}

fn filter_sql(alias: &str, filter: &FilterExpression) -> PlanResult<Sql> {
    let mut sql = Sql::empty();
    sql.push_ident(&Ident::qualified(alias, &filter.field)?)
        .push(" ")
        .push(filter.op.sql());
    if let Some(value) = &filter.value {
        sql.push(" ").push_text(value.clone());
    }
    Ok(sql)
}

fn predicate_sql(main_alias: &str, predicate: &Predicate) -> PlanResult<Sql> {
    match predicate {
        Predicate::Filter(filter) => filter_sql(main_alias, filter),
        Predicate::Exists {
            relation,
            table,
            correlation,
            filters,
        } => {
            let mut sql = Sql::new("EXISTS (SELECT 1 FROM ");
            push_related_from(&mut sql, table, relation, correlation)?;
            sql.push(" WHERE ");
            push_correlation(&mut sql, main_alias, relation, correlation)?;
            for filter in filters {
                sql.push(" AND ").push_sql(filter_sql(relation, filter)?);
            }
            sql.push(")");
            Ok(sql)
        }
    }
}

fn lookup_sql(alias: &str, lookup: &Lookup) -> PlanResult<Sql> {
    let mut sql = Sql::empty();
    match lookup {
        Lookup::PrimaryKey { key, value } => {
            sql.push_ident(&Ident::qualified(alias, key)?)
                .push(" = ")
                .push_text(value.clone());
        }
        Lookup::PrimaryOrAlternate {
            key,
            alternate,
            value,
        } => {
            sql.push("(")
                .push_ident(&Ident::qualified(alias, key)?)
                .push("::text = ")
                .push_text(value.clone())
                .push(" OR ")
                .push_ident(&Ident::qualified(alias, alternate)?)
                .push(" = ")
                .push_text(value.clone())
                .push(")");
        }
    }
    Ok(sql)
}
