//! # reqplan
//!
//! Turns list/show API query parameters into validated, parameterised Postgres
//! queries.
//!
//! ## Features
//!
//! - **Allow-lists**: clients only select and sort by fields a resource declares
//! - **Relations**: `fields[author]=name` eager-loads a declared relation, with the
//!   join keys added automatically
//! - **Filters**: `filters[post]=price>=10`, `filters[tags]=name=rust` (an `EXISTS`
//!   on the relation)
//! - **Limits and pages**: `limit[comments]=5`, `page=2&per_page=20`
//! - **Best effort**: bad input is dropped and reported next to the result, never
//!   fatal
//! - **Inspectable**: the [`QueryPlan`] is plain data; render it with
//!   [`QueryPlan::to_sql`] or run it with [`QueryPlan::fetch_page`]
//!
//! ## Example
//!
//! ```ignore
//! use reqplan::{Relation, RequestConverter, ResourceMetadata, ResourceRegistry};
//!
//! let mut registry = ResourceRegistry::new();
//! registry.register(
//!     "Post",
//!     ResourceMetadata::new("post", "posts")
//!         .with_selectable(&["id", "title", "author_id"])
//!         .with_sortable(&["title"])
//!         .with_relation("author", Relation::to_one("User")),
//! )?;
//! registry.register(
//!     "User",
//!     ResourceMetadata::new("user", "users").with_selectable(&["id", "name"]),
//! )?;
//!
//! let converter = RequestConverter::new(registry);
//! let conversion = converter.convert_query(
//!     "Post",
//!     "fields[post]=title&fields[author]=name&sorting=-title",
//!     reqplan::Action::Index,
//!     None,
//! )?;
//! let page = conversion.plan.fetch_page(&client).await?;
//! ```

pub mod client;
pub mod compile;
pub mod config;
pub mod convert;
pub mod error;
pub mod exec;
pub mod field_set;
pub mod ident;
pub mod metadata;
pub mod params;
pub mod parse;
pub mod plan;
pub mod request;
pub mod resolve;
pub mod sql;

pub use client::GenericClient;
pub use config::ConverterConfig;
pub use convert::{Conversion, RequestConverter};
pub use error::{PlanError, PlanResult, RequestError};
pub use exec::Page;
pub use field_set::FieldSet;
pub use ident::Ident;
pub use metadata::{
    MetadataProvider, Relation, RelationKind, ResourceMetadata, ResourceRegistry, sibling_type,
    singularize,
};
pub use params::{RawParams, RawValue};
pub use parse::parse_filter;
pub use plan::{Correlation, EagerLoad, Lookup, Predicate, QueryPlan};
pub use request::{
    Action, FilterExpression, FilterOp, Pagination, RequestModel, SortDirection, SortSpec,
};
pub use sql::{Sql, TextLiteral};
