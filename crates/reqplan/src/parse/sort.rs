use crate::error::RequestError;
use crate::metadata::ResourceMetadata;
use crate::request::{RequestModel, SortDirection, SortSpec};

/// Sorting pass.
///
/// `sorting` is a comma-separated list of field names, each optionally prefixed by
/// `+` (ascending, the default) or `-` (descending). A `+` that arrived
/// form-decoded as a space is treated the same. Input order is kept; fields outside
/// the sortable allow-list are dropped and reported.
pub fn parse_sorting(main: &ResourceMetadata, sorting: Option<&str>, model: &mut RequestModel) {
    let Some(sorting) = sorting else {
        return;
    };

    for token in sorting.split(',') {
        let (direction, field) = match token.chars().next() {
            Some('-') => (SortDirection::Desc, &token[1..]),
            Some('+' | ' ') => (SortDirection::Asc, &token[1..]),
            _ => (SortDirection::Asc, token),
        };
        let field = field.trim();
        if field.is_empty() {
            continue;
        }

        if main.can_sort(field) {
            model.sorting.push(SortSpec {
                field: field.to_string(),
                direction,
            });
        } else {
            model.record(RequestError::UnknownSortField {
                field: field.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Action;

    fn people() -> ResourceMetadata {
        ResourceMetadata::new("person", "people")
            .with_selectable(&["id", "name", "age"])
            .with_sortable(&["name", "created_at"])
    }

    fn run(sorting: &str) -> RequestModel {
        let mut model = RequestModel::new("Person", "person", Action::Index);
        parse_sorting(&people(), Some(sorting), &mut model);
        model
    }

    #[test]
    fn unsortable_field_is_reported() {
        let model = run("+name,-age");
        assert_eq!(
            model.sorting,
            vec![SortSpec {
                field: "name".into(),
                direction: SortDirection::Asc
            }]
        );
        assert_eq!(
            model.errors,
            vec![RequestError::UnknownSortField { field: "age".into() }]
        );
    }

    #[test]
    fn input_order_is_precedence() {
        let model = run("-created_at,name");
        let keys: Vec<(&str, SortDirection)> = model
            .sorting
            .iter()
            .map(|s| (s.field.as_str(), s.direction))
            .collect();
        assert_eq!(
            keys,
            [("created_at", SortDirection::Desc), ("name", SortDirection::Asc)]
        );
    }

    #[test]
    fn decoded_plus_is_ascending() {
        let model = run(" name");
        assert_eq!(model.sorting[0].direction, SortDirection::Asc);
        assert_eq!(model.sorting[0].field, "name");
    }

    #[test]
    fn empty_tokens_are_skipped() {
        let model = run(",,name,");
        assert_eq!(model.sorting.len(), 1);
        assert!(model.errors.is_empty());
    }
}
