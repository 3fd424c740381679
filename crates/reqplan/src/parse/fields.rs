use super::Scope;
use crate::error::RequestError;
use crate::field_set::FieldSet;
use crate::metadata::ResourceMetadata;
use crate::params::RawValue;
use crate::request::RequestModel;
use std::collections::BTreeMap;

/// Token selecting a resource's whole allow-list.
pub const WILDCARD: &str = "*";

/// Field-selection pass.
///
/// Splits every `fields[key]` value on commas, resolves `key` to a resource and
/// keeps only allow-listed fields. The main resource always ends up with an entry.
pub fn parse_fields(scope: &Scope<'_>, raw: &BTreeMap<String, RawValue>, model: &mut RequestModel) {
    for (key, value) in raw {
        if value.is_blank() {
            continue;
        }
        let requested: Vec<&str> = value
            .iter()
            .flat_map(|s| s.split(','))
            .filter(|s| !s.is_empty())
            .collect();
        if requested.is_empty() {
            continue;
        }

        let Some(meta) = scope.metadata_of(key) else {
            model.record(RequestError::UnknownResource {
                resource: key.clone(),
            });
            continue;
        };

        let selected = if requested.contains(&WILDCARD) {
            all_fields(meta)
        } else {
            let mut set = FieldSet::new();
            for field in requested {
                if meta.can_select(field) {
                    set.ensure(field);
                } else {
                    model.record(RequestError::UnknownField {
                        resource: key.clone(),
                        field: field.to_string(),
                    });
                }
            }
            set
        };

        if !selected.is_empty() {
            model.fields.insert(key.clone(), selected);
        }
    }

    if !model.fields.contains_key(&scope.main.name) {
        model.fields.insert(scope.main.name.clone(), all_fields(scope.main));
    }
}

/// The full allow-list, or the wildcard when the resource declares none.
fn all_fields(meta: &ResourceMetadata) -> FieldSet {
    if meta.selectable.is_empty() {
        [WILDCARD].into_iter().collect()
    } else {
        meta.selectable.iter().collect()
    }
}
