//! Query compilation.

use crate::field_set::FieldSet;
use crate::metadata::{Relation, RelationKind, ResourceMetadata};
use crate::parse::Scope;
use crate::plan::{Correlation, EagerLoad, Lookup, Predicate, QueryPlan};
use crate::request::{Action, RequestModel};

/// Build the plan for a validated request model.
///
/// Never fails: whatever survived validation is compiled. Relations whose target
/// type has no metadata are skipped. For `show`, `id` selects the single row and
/// filters and sorting are not applied.
pub fn compile(scope: &Scope<'_>, model: &RequestModel, id: Option<&str>) -> QueryPlan {
    let main = scope.main;

    let columns = model
        .main_fields()
        .cloned()
        .unwrap_or_else(|| main.selectable.iter().collect::<FieldSet>());

    let mut eager = Vec::new();
    for (key, fields) in model.relations() {
        let Some((relation, related)) = resolve_related(scope, key) else {
            continue;
        };
        eager.push(EagerLoad {
            relation: key.to_string(),
            table: related.table.clone(),
            primary_key: related.primary_key.clone(),
            columns: fields.clone(),
            correlation: correlation(main, key, relation, related),
            limit: model.limits.get(key).copied(),
        });
    }

    let (predicates, sort, window) = match model.action {
        Action::Index => (
            compile_predicates(scope, model),
            model.sorting.clone(),
            model.pagination,
        ),
        Action::Show => (Vec::new(), Vec::new(), None),
    };

    let lookup = match (model.action, id) {
        (Action::Show, Some(value)) => Some(match &main.alternate_key {
            Some(alternate) => Lookup::PrimaryOrAlternate {
                key: main.primary_key.clone(),
                alternate: alternate.clone(),
                value: value.to_string(),
            },
            None => Lookup::PrimaryKey {
                key: main.primary_key.clone(),
                value: value.to_string(),
            },
        }),
        _ => None,
    };

    QueryPlan {
        resource_type: scope.type_id.to_string(),
        table: main.table.clone(),
        alias: main.name.clone(),
        columns,
        eager,
        predicates,
        sort,
        lookup,
        window,
    }
}

fn compile_predicates(scope: &Scope<'_>, model: &RequestModel) -> Vec<Predicate> {
    let mut out = Vec::new();
    for (key, filters) in &model.filters {
        if filters.is_empty() {
            continue;
        }

        if scope.is_main(key) {
            out.extend(filters.iter().cloned().map(Predicate::Filter));
            continue;
        }
        let Some((relation, related)) = resolve_related(scope, key) else {
            continue;
        };
        out.push(Predicate::Exists {
            relation: key.clone(),
            table: related.table.clone(),
            correlation: correlation(scope.main, key, relation, related),
            filters: filters.clone(),
        });
    }
    out
}

fn resolve_related<'a>(scope: &Scope<'a>, key: &str) -> Option<(&'a Relation, &'a ResourceMetadata)> {
    let relation = scope.main.relation(key)?;
    let related = scope.provider.resource(&relation.target)?;
    Some((relation, related))
}

fn correlation(
    main: &ResourceMetadata,
    key: &str,
    relation: &Relation,
    related: &ResourceMetadata,
) -> Correlation {
    match relation.kind {
        RelationKind::ToOne { .. } => Correlation::ToOne {
            foreign_key: relation.owner_foreign_key(key),
            owner_key: related.primary_key.clone(),
        },
        RelationKind::ToMany { .. } => Correlation::ToMany {
            foreign_key: relation.related_foreign_key(&main.name),
            local_key: main.primary_key.clone(),
        },
        RelationKind::ManyToMany { .. } => {
            let (pivot, foreign_pivot_key, related_pivot_key) =
                relation.pivot_keys(&main.name, &related.name);
            Correlation::ManyToMany {
                pivot,
                foreign_pivot_key,
                related_pivot_key,
                local_key: main.primary_key.clone(),
                related_key: related.primary_key.clone(),
            }
        }
    }
}
