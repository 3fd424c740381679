//! Relation resolution.
//!
//! Every selected key other than the main resource must name a declared relation.
//! Depending on the relation kind, the join keys are added to the field lists so the
//! eager-load can be correlated:
//!
//! | kind           | main resource         | related resource                  |
//! |----------------|-----------------------|-----------------------------------|
//! | to-one         | `<relation>_id`       | primary key                       |
//! | to-many        | unchanged             | `<main>_id`                       |
//! | many-to-many   | primary key           | bare primary key -> `<relation>.id` |
//!
//! Declared key overrides replace the conventional names.

use crate::error::RequestError;
use crate::field_set::FieldSet;
use crate::metadata::RelationKind;
use crate::parse::{Scope, WILDCARD};
use crate::request::RequestModel;

/// Resolve selected relations and inject their join keys.
pub fn resolve_relations(scope: &Scope<'_>, model: &mut RequestModel) {
    let main = scope.main;
    let keys: Vec<String> = model
        .fields
        .keys()
        .filter(|key| !scope.is_main(key))
        .cloned()
        .collect();

    for key in keys {
        let Some(relation) = main.relation(&key) else {
            model.fields.remove(&key);
            model.record(RequestError::UnknownRelation {
                resource: main.name.clone(),
                relation: key,
            });
            continue;
        };
        let related_pk = scope
            .provider
            .resource(&relation.target)
            .map(|meta| meta.primary_key.clone())
            .unwrap_or_else(|| "id".to_string());

        match &relation.kind {
            RelationKind::ToOne { .. } => {
                let fk = relation.owner_foreign_key(&key);
                ensure(model.fields.get_mut(&main.name), &fk);
                ensure(model.fields.get_mut(&key), &related_pk);
            }
            RelationKind::ToMany { .. } => {
                let fk = relation.related_foreign_key(&main.name);
                ensure(model.fields.get_mut(&key), &fk);
            }
            RelationKind::ManyToMany { .. } => {
                if let Some(related) = model.fields.get_mut(&key) {
                    if related.remove(&related_pk) {
                        related.ensure(&format!("{key}.{related_pk}"));
                    }
                }
                ensure(model.fields.get_mut(&main.name), &main.primary_key);
            }
        }
    }
}

/// Drop filters keyed by something that is neither the main resource nor a declared
/// relation with known metadata.
pub fn resolve_filter_targets(scope: &Scope<'_>, model: &mut RequestModel) {
    let main = scope.main;
    let keys: Vec<String> = model
        .filters
        .keys()
        .filter(|key| !scope.is_main(key))
        .cloned()
        .collect();

    for key in keys {
        let error = match main.relation(&key) {
            None => RequestError::UnknownRelation {
                resource: main.name.clone(),
                relation: key.clone(),
            },
            Some(relation) if scope.provider.resource(&relation.target).is_none() => {
                RequestError::UnknownResource {
                    resource: key.clone(),
                }
            }
            Some(_) => continue,
        };
        model.filters.remove(&key);
        model.record(error);
    }
}

fn ensure(fields: Option<&mut FieldSet>, field: &str) {
    if let Some(fields) = fields {
        if !fields.contains(WILDCARD) {
            fields.ensure(field);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{MetadataProvider, Relation, ResourceMetadata, ResourceRegistry};
    use crate::request::{Action, FilterExpression, FilterOp};

    fn registry() -> ResourceRegistry {
        let mut registry = ResourceRegistry::new();
        registry
            .register(
                "Post",
                ResourceMetadata::new("post", "posts")
                    .with_selectable(&["id", "title", "author_id"])
                    .with_relation("author", Relation::to_one("User"))
                    .with_relation(
                        "editor",
                        Relation::to_one("User").with_foreign_key("edited_by"),
                    )
                    .with_relation("comments", Relation::to_many("Comment"))
                    .with_relation("tags", Relation::many_to_many("Tag")),
            )
            .unwrap();
        registry
            .register(
                "User",
                ResourceMetadata::new("user", "users").with_selectable(&["id", "name"]),
            )
            .unwrap();
        registry
            .register(
                "Comment",
                ResourceMetadata::new("comment", "comments")
                    .with_selectable(&["id", "body", "post_id"]),
            )
            .unwrap();
        registry
            .register(
                "Tag",
                ResourceMetadata::new("tag", "tags").with_selectable(&["id", "name"]),
            )
            .unwrap();
        registry
    }

    fn resolve(fields: &[(&str, &[&str])]) -> RequestModel {
        let registry = registry();
        let main = registry.resource("Post").unwrap();
        let scope = Scope::new(&registry, "Post", main);
        let mut model = RequestModel::new("Post", "post", Action::Index);
        for (key, list) in fields {
            model
                .fields
                .insert(key.to_string(), list.iter().collect::<FieldSet>());
        }
        resolve_relations(&scope, &mut model);
        model
    }

    #[test]
    fn to_one_injects_both_keys() {
        let model = resolve(&[("post", &["title"]), ("author", &["name"])]);
        assert_eq!(model.fields["post"].as_slice(), ["title", "author_id"]);
        assert_eq!(model.fields["author"].as_slice(), ["name", "id"]);
    }

    #[test]
    fn to_one_uses_declared_foreign_key() {
        let model = resolve(&[("post", &["title"]), ("editor", &["name"])]);
        assert_eq!(model.fields["post"].as_slice(), ["title", "edited_by"]);
    }

    #[test]
    fn to_many_injects_related_key() {
        let model = resolve(&[("post", &["title"]), ("comments", &["body"])]);
        assert_eq!(model.fields["post"].as_slice(), ["title"]);
        assert_eq!(model.fields["comments"].as_slice(), ["body", "post_id"]);
    }

    #[test]
    fn many_to_many_qualifies_id() {
        let model = resolve(&[("post", &["title"]), ("tags", &["id", "name"])]);
        assert_eq!(model.fields["tags"].as_slice(), ["name", "tags.id"]);
        assert_eq!(model.fields["post"].as_slice(), ["title", "id"]);
    }

    #[test]
    fn many_to_many_without_id_is_left_alone() {
        let model = resolve(&[("post", &["id"]), ("tags", &["name"])]);
        assert_eq!(model.fields["tags"].as_slice(), ["name"]);
        assert_eq!(model.fields["post"].as_slice(), ["id"]);
    }

    #[test]
    fn wildcard_lists_are_not_extended() {
        let model = resolve(&[("post", &["*"]), ("author", &["*"])]);
        assert_eq!(model.fields["post"].as_slice(), ["*"]);
        assert_eq!(model.fields["author"].as_slice(), ["*"]);
    }

    #[test]
    fn undeclared_relation_is_dropped() {
        let model = resolve(&[("post", &["title"]), ("user", &["name"])]);
        assert!(!model.fields.contains_key("user"));
        assert_eq!(
            model.errors,
            vec![RequestError::UnknownRelation {
                resource: "post".into(),
                relation: "user".into(),
            }]
        );
    }

    #[test]
    fn resolution_is_order_independent() {
        let a = resolve(&[
            ("post", &["title"]),
            ("author", &["name"]),
            ("tags", &["id"]),
        ]);
        let b = resolve(&[
            ("tags", &["id"]),
            ("author", &["name"]),
            ("post", &["title"]),
        ]);
        assert_eq!(a, b);
    }

    #[test]
    fn filters_on_unknown_relations_are_dropped() {
        let registry = registry();
        let main = registry.resource("Post").unwrap();
        let scope = Scope::new(&registry, "Post", main);
        let mut model = RequestModel::new("Post", "post", Action::Index);
        let filter = vec![FilterExpression::new("x", FilterOp::Null, None)];
        model.filters.insert("post".into(), filter.clone());
        model.filters.insert("tags".into(), filter.clone());
        model.filters.insert("widgets".into(), filter);

        resolve_filter_targets(&scope, &mut model);

        let keys: Vec<&String> = model.filters.keys().collect();
        assert_eq!(keys, ["post", "tags"]);
        assert_eq!(model.errors.len(), 1);
    }
}
