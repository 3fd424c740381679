//! Resource metadata: allow-lists, keys and declared relations.
//!
//! The converter never inspects models at runtime. Everything it needs to know about
//! a resource type is described once by a [`ResourceMetadata`] value and looked up
//! through a [`MetadataProvider`], keyed by a resource type identifier such as
//! `"Post"` or `"blog::Post"`.
//!
//! # Example
//! ```ignore
//! use reqplan::{Relation, ResourceMetadata, ResourceRegistry};
//!
//! let mut registry = ResourceRegistry::new();
//! registry.register(
//!     "Post",
//!     ResourceMetadata::new("post", "posts")
//!         .with_selectable(&["id", "title", "author_id"])
//!         .with_sortable(&["title"])
//!         .with_relation("author", Relation::to_one("User")),
//! )?;
//! ```

use crate::error::{PlanError, PlanResult};
use crate::ident::is_valid_ident;
use heck::ToUpperCamelCase;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Cardinality of a relation, with optional overrides of the conventional join keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RelationKind {
    /// The main resource holds the key: `main.<relation>_id = related.<pk>`.
    ToOne {
        #[serde(default)]
        foreign_key: Option<String>,
    },
    /// The related resource holds the key: `related.<main>_id = main.<pk>`.
    ToMany {
        #[serde(default)]
        foreign_key: Option<String>,
    },
    /// Joined through a pivot table.
    ManyToMany {
        #[serde(default)]
        pivot: Option<String>,
        #[serde(default)]
        foreign_pivot_key: Option<String>,
        #[serde(default)]
        related_pivot_key: Option<String>,
    },
}

/// A named relation declared on a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    /// Type identifier of the related resource.
    pub target: String,
    #[serde(flatten)]
    pub kind: RelationKind,
}

impl Relation {
    pub fn to_one(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            kind: RelationKind::ToOne { foreign_key: None },
        }
    }

    pub fn to_many(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            kind: RelationKind::ToMany { foreign_key: None },
        }
    }

    pub fn many_to_many(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            kind: RelationKind::ManyToMany {
                pivot: None,
                foreign_pivot_key: None,
                related_pivot_key: None,
            },
        }
    }

    /// Override the foreign key of a to-one or to-many relation.
    pub fn with_foreign_key(mut self, key: impl Into<String>) -> Self {
        match &mut self.kind {
            RelationKind::ToOne { foreign_key } | RelationKind::ToMany { foreign_key } => {
                *foreign_key = Some(key.into());
            }
            RelationKind::ManyToMany {
                foreign_pivot_key, ..
            } => *foreign_pivot_key = Some(key.into()),
        }
        self
    }

    /// Override the pivot table of a many-to-many relation. No-op for other kinds.
    pub fn with_pivot(mut self, table: impl Into<String>) -> Self {
        if let RelationKind::ManyToMany { pivot, .. } = &mut self.kind {
            *pivot = Some(table.into());
        }
        self
    }

    /// Override the pivot column pointing at the related resource. No-op for other kinds.
    pub fn with_related_pivot_key(mut self, key: impl Into<String>) -> Self {
        if let RelationKind::ManyToMany {
            related_pivot_key, ..
        } = &mut self.kind
        {
            *related_pivot_key = Some(key.into());
        }
        self
    }

    /// Key column on the main resource for a to-one relation.
    pub fn owner_foreign_key(&self, relation: &str) -> String {
        match &self.kind {
            RelationKind::ToOne {
                foreign_key: Some(key),
            } => key.clone(),
            _ => format!("{relation}_id"),
        }
    }

    /// Key column on the related resource for a to-many relation.
    pub fn related_foreign_key(&self, main_name: &str) -> String {
        match &self.kind {
            RelationKind::ToMany {
                foreign_key: Some(key),
            } => key.clone(),
            _ => format!("{main_name}_id"),
        }
    }

    /// Pivot table name, its column pointing at the main resource, and its column
    /// pointing at the related resource.
    pub fn pivot_keys(&self, main_name: &str, related_name: &str) -> (String, String, String) {
        let (pivot, foreign, related) = match &self.kind {
            RelationKind::ManyToMany {
                pivot,
                foreign_pivot_key,
                related_pivot_key,
            } => (
                pivot.clone(),
                foreign_pivot_key.clone(),
                related_pivot_key.clone(),
            ),
            _ => (None, None, None),
        };
        (
            pivot.unwrap_or_else(|| default_pivot(main_name, related_name)),
            foreign.unwrap_or_else(|| format!("{main_name}_id")),
            related.unwrap_or_else(|| format!("{related_name}_id")),
        )
    }

    fn key_overrides(&self) -> Vec<&str> {
        match &self.kind {
            RelationKind::ToOne { foreign_key } | RelationKind::ToMany { foreign_key } => {
                foreign_key.iter().map(String::as_str).collect()
            }
            RelationKind::ManyToMany {
                pivot,
                foreign_pivot_key,
                related_pivot_key,
            } => [pivot, foreign_pivot_key, related_pivot_key]
                .into_iter()
                .flatten()
                .map(String::as_str)
                .collect(),
        }
    }
}

fn default_pivot(a: &str, b: &str) -> String {
    if a <= b {
        format!("{a}_{b}")
    } else {
        format!("{b}_{a}")
    }
}

fn default_primary_key() -> String {
    "id".to_string()
}

/// Everything the converter knows about one resource type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceMetadata {
    /// Singular resource name, e.g. `post`. Used as the `fields[...]` key for the
    /// main resource and in join-key conventions.
    pub name: String,
    /// Backing table.
    pub table: String,
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
    /// Fields clients may select.
    #[serde(default)]
    pub selectable: Vec<String>,
    /// Fields clients may sort by.
    #[serde(default)]
    pub sortable: Vec<String>,
    /// Second unique field accepted by single-entity lookups (e.g. `slug`).
    #[serde(default)]
    pub alternate_key: Option<String>,
    #[serde(default)]
    pub relations: BTreeMap<String, Relation>,
}

impl ResourceMetadata {
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            primary_key: default_primary_key(),
            selectable: Vec::new(),
            sortable: Vec::new(),
            alternate_key: None,
            relations: BTreeMap::new(),
        }
    }

    pub fn with_primary_key(mut self, pk: impl Into<String>) -> Self {
        self.primary_key = pk.into();
        self
    }

    pub fn with_selectable(mut self, fields: &[&str]) -> Self {
        self.selectable = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn with_sortable(mut self, fields: &[&str]) -> Self {
        self.sortable = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn with_alternate_key(mut self, field: impl Into<String>) -> Self {
        self.alternate_key = Some(field.into());
        self
    }

    pub fn with_relation(mut self, name: impl Into<String>, relation: Relation) -> Self {
        self.relations.insert(name.into(), relation);
        self
    }

    pub fn can_select(&self, field: &str) -> bool {
        self.selectable.iter().any(|f| f == field)
    }

    pub fn can_sort(&self, field: &str) -> bool {
        self.sortable.iter().any(|f| f == field)
    }

    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations.get(name)
    }

    /// Check that every stored name is a safe identifier.
    pub fn validate(&self) -> PlanResult<()> {
        let mut names: Vec<&str> = vec![&self.name, &self.table, &self.primary_key];
        names.extend(self.selectable.iter().map(String::as_str));
        names.extend(self.sortable.iter().map(String::as_str));
        names.extend(self.alternate_key.as_deref());
        for (name, relation) in &self.relations {
            names.push(name);
            names.extend(relation.key_overrides());
        }

        match names.into_iter().find(|n| !is_valid_ident(n)) {
            Some(bad) => Err(PlanError::validation(format!(
                "resource '{}': invalid identifier '{bad}'",
                self.name
            ))),
            None => Ok(()),
        }
    }
}

/// Source of resource metadata, keyed by resource type identifier.
///
/// Implementations must be deterministic: a type without metadata returns `None`
/// rather than panicking. Lookups are read-only, so one provider can serve
/// concurrent conversions.
pub trait MetadataProvider: Send + Sync {
    fn resource(&self, type_id: &str) -> Option<&ResourceMetadata>;
}

impl<T: MetadataProvider + ?Sized> MetadataProvider for &T {
    fn resource(&self, type_id: &str) -> Option<&ResourceMetadata> {
        (**self).resource(type_id)
    }
}

impl<T: MetadataProvider + ?Sized> MetadataProvider for Arc<T> {
    fn resource(&self, type_id: &str) -> Option<&ResourceMetadata> {
        (**self).resource(type_id)
    }
}

/// In-memory [`MetadataProvider`].
#[derive(Debug, Clone, Default)]
pub struct ResourceRegistry {
    resources: BTreeMap<String, ResourceMetadata>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the metadata for `type_id` after validating it.
    pub fn register(
        &mut self,
        type_id: impl Into<String>,
        metadata: ResourceMetadata,
    ) -> PlanResult<&mut Self> {
        metadata.validate()?;
        self.resources.insert(type_id.into(), metadata);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ResourceMetadata)> {
        self.resources.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Report relations whose target type is not registered.
    pub fn check(&self) -> Vec<String> {
        let mut issues = Vec::new();
        for (type_id, meta) in &self.resources {
            for (name, relation) in &meta.relations {
                if !self.resources.contains_key(&relation.target) {
                    issues.push(format!(
                        "{type_id}.{name}: target type '{}' is not registered",
                        relation.target
                    ));
                }
            }
        }
        issues
    }
}

impl MetadataProvider for ResourceRegistry {
    fn resource(&self, type_id: &str) -> Option<&ResourceMetadata> {
        self.resources.get(type_id)
    }
}

/// Naive English singularization, enough for table-style resource names.
pub fn singularize(word: &str) -> String {
    if let Some(stem) = word.strip_suffix("ies") {
        if !stem.is_empty() {
            return format!("{stem}y");
        }
    }
    for suffix in ["sses", "shes", "ches", "xes", "zes"] {
        if word.ends_with(suffix) {
            return word[..word.len() - 2].to_string();
        }
    }
    if word.ends_with("ss") {
        return word.to_string();
    }
    match word.strip_suffix('s') {
        Some(stem) if !stem.is_empty() => stem.to_string(),
        _ => word.to_string(),
    }
}

/// Derive the type identifier a `fields[...]` key conventionally refers to.
///
/// `("blog::Post", "tags")` becomes `"blog::Tag"`.
pub fn sibling_type(main_type: &str, key: &str) -> String {
    let base = singularize(&key.to_lowercase()).to_upper_camel_case();
    match main_type.rsplit_once("::") {
        Some((namespace, _)) => format!("{namespace}::{base}"),
        None => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singularize_common_forms() {
        assert_eq!(singularize("tags"), "tag");
        assert_eq!(singularize("categories"), "category");
        assert_eq!(singularize("boxes"), "box");
        assert_eq!(singularize("addresses"), "address");
        assert_eq!(singularize("address"), "address");
        assert_eq!(singularize("author"), "author");
        assert_eq!(singularize("s"), "s");
    }

    #[test]
    fn sibling_type_keeps_namespace() {
        assert_eq!(sibling_type("Post", "tags"), "Tag");
        assert_eq!(sibling_type("blog::Post", "Comments"), "blog::Comment");
        assert_eq!(sibling_type("Post", "blog_categories"), "BlogCategory");
    }

    #[test]
    fn conventional_join_keys() {
        let author = Relation::to_one("User");
        assert_eq!(author.owner_foreign_key("author"), "author_id");

        let comments = Relation::to_many("Comment");
        assert_eq!(comments.related_foreign_key("post"), "post_id");

        let tags = Relation::many_to_many("Tag");
        assert_eq!(
            tags.pivot_keys("post", "tag"),
            (
                "post_tag".to_string(),
                "post_id".to_string(),
                "tag_id".to_string()
            )
        );
        assert_eq!(tags.pivot_keys("user", "role").0, "role_user");
    }

    #[test]
    fn overridden_join_keys() {
        let writer = Relation::to_one("User").with_foreign_key("written_by");
        assert_eq!(writer.owner_foreign_key("writer"), "written_by");

        let labels = Relation::many_to_many("Tag")
            .with_pivot("post_labels")
            .with_foreign_key("article_id")
            .with_related_pivot_key("label_id");
        assert_eq!(
            labels.pivot_keys("post", "tag"),
            (
                "post_labels".to_string(),
                "article_id".to_string(),
                "label_id".to_string()
            )
        );
    }

    #[test]
    fn register_rejects_unsafe_names() {
        let mut registry = ResourceRegistry::new();
        let bad = ResourceMetadata::new("post", "posts").with_selectable(&["id", "title; --"]);
        assert!(registry.register("Post", bad).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn check_reports_missing_targets() {
        let mut registry = ResourceRegistry::new();
        registry
            .register(
                "Post",
                ResourceMetadata::new("post", "posts")
                    .with_relation("author", Relation::to_one("User")),
            )
            .unwrap();
        assert_eq!(
            registry.check(),
            vec!["Post.author: target type 'User' is not registered".to_string()]
        );
    }

    #[test]
    fn relation_deserializes_with_kind_tag() {
        let relation: Relation = serde_json::from_str(
            r#"{"target": "Tag", "kind": "many_to_many", "pivot": "post_labels"}"#,
        )
        .unwrap();
        assert_eq!(relation, Relation::many_to_many("Tag").with_pivot("post_labels"));
    }
}
