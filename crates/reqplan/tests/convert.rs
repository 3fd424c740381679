use reqplan::{
    Action, ConverterConfig, FilterExpression, FilterOp, Lookup, PlanError, Predicate, RawParams,
    Relation, RequestConverter, RequestError, ResourceMetadata, ResourceRegistry, SortDirection,
    SortSpec,
};

fn registry() -> ResourceRegistry {
    let mut registry = ResourceRegistry::new();
    registry
        .register(
            "shop::Product",
            ResourceMetadata::new("product", "products")
                .with_selectable(&["id", "name", "price", "brand_id", "sku"])
                .with_sortable(&["name", "price"])
                .with_alternate_key("sku")
                .with_relation("brand", Relation::to_one("shop::Brand"))
                .with_relation("reviews", Relation::to_many("shop::Review"))
                .with_relation("categories", Relation::many_to_many("shop::Category")),
        )
        .unwrap();
    registry
        .register(
            "shop::Brand",
            ResourceMetadata::new("brand", "brands").with_selectable(&["id", "title"]),
        )
        .unwrap();
    registry
        .register(
            "shop::Review",
            ResourceMetadata::new("review", "reviews")
                .with_selectable(&["id", "rating", "body", "product_id"]),
        )
        .unwrap();
    registry
        .register(
            "shop::Category",
            ResourceMetadata::new("category", "categories").with_selectable(&["id", "label"]),
        )
        .unwrap();
    registry
        .register(
            "shop::Person",
            ResourceMetadata::new("person", "people")
                .with_selectable(&["id", "name", "age"])
                .with_sortable(&["name"]),
        )
        .unwrap();
    registry
}

fn converter() -> RequestConverter<ResourceRegistry> {
    RequestConverter::new(registry())
}

fn index(query: &str) -> reqplan::Conversion {
    converter()
        .convert_query("shop::Product", query, Action::Index, None)
        .unwrap()
}

#[test]
fn selected_fields_keep_user_order() {
    let conversion = index("fields[product]=price,name,id");
    assert_eq!(
        conversion.request.fields["product"].as_slice(),
        ["price", "name", "id"]
    );
    assert!(!conversion.request.has_errors());
}

#[test]
fn one_error_per_unknown_field() {
    let conversion = index("fields[product]=name,cost,margin");
    assert_eq!(conversion.request.fields["product"].as_slice(), ["name"]);
    assert!(conversion.request.has_errors());
    assert_eq!(
        conversion.request.errors,
        vec![
            RequestError::UnknownField {
                resource: "product".into(),
                field: "cost".into(),
            },
            RequestError::UnknownField {
                resource: "product".into(),
                field: "margin".into(),
            },
        ]
    );
}

#[test]
fn sorting_keeps_allowed_fields_and_reports_the_rest() {
    let conversion = converter()
        .convert_query("shop::Person", "sorting=%2Bname,-age", Action::Index, None)
        .unwrap();
    assert_eq!(
        conversion.request.sorting,
        vec![SortSpec {
            field: "name".into(),
            direction: SortDirection::Asc,
        }]
    );
    assert_eq!(
        conversion.request.errors,
        vec![RequestError::UnknownSortField { field: "age".into() }]
    );
    assert_eq!(conversion.plan.sort, conversion.request.sorting);
}

#[test]
fn show_ignores_sorting() {
    let raw = RawParams::new().sorting("-age");
    let conversion = converter().show("shop::Person", &raw, "1").unwrap();
    assert!(conversion.request.sorting.is_empty());
    assert!(conversion.request.errors.is_empty());
}

#[test]
fn to_one_relation_gains_join_keys() {
    let conversion = index("fields[product]=name&fields[brand]=title");
    let fields = &conversion.request.fields;
    assert_eq!(fields["product"].as_slice(), ["name", "brand_id"]);
    assert_eq!(fields["brand"].as_slice(), ["title", "id"]);
    assert_eq!(conversion.plan.eager.len(), 1);
    assert_eq!(conversion.plan.eager[0].relation, "brand");
}

#[test]
fn many_to_many_qualifies_related_id() {
    let conversion = index("fields[product]=name&fields[categories]=id,label");
    let fields = &conversion.request.fields;
    assert_eq!(fields["categories"].as_slice(), ["label", "categories.id"]);
    assert_eq!(fields["product"].as_slice(), ["name", "id"]);
}

#[test]
fn filter_injects_field_and_compiles_predicate() {
    let conversion = index("fields[product]=name&filters[product]=price%3E%3D10");
    assert_eq!(
        conversion.request.fields["product"].as_slice(),
        ["name", "price"]
    );
    assert_eq!(
        conversion.plan.predicates,
        vec![Predicate::Filter(FilterExpression::new(
            "price",
            FilterOp::Gte,
            Some("10".into())
        ))]
    );
    assert!(conversion.request.errors.is_empty());
}

#[test]
fn malformed_filter_is_silently_dropped() {
    let conversion = index("filters[product]=price");
    assert!(conversion.request.filters.is_empty());
    assert!(conversion.plan.predicates.is_empty());
    assert!(conversion.request.errors.is_empty());
}

#[test]
fn digit_leading_filter_field_is_dropped_and_plan_renders() {
    let conversion = index("fields[product]=name&filters[product]=1abc=5");
    assert_eq!(conversion.request.fields["product"].as_slice(), ["name"]);
    assert!(conversion.request.filters.is_empty());
    assert!(conversion.request.errors.is_empty());
    assert!(conversion.plan.predicates.is_empty());

    let sql = conversion.plan.to_sql().unwrap().to_sql();
    assert!(!sql.contains("1abc"));
}

#[test]
fn encoded_like_pattern_is_decoded_once() {
    let conversion = index("filters[product]=name%20like%20%25cafe%25");
    assert_eq!(
        conversion.request.filters["product"],
        vec![FilterExpression::new(
            "name",
            FilterOp::Like,
            Some("%cafe%".into())
        )]
    );
}

#[test]
fn plus_encoded_spaces_reach_the_filter_grammar() {
    let conversion = index("filters[product]=name+not+like+a%2Bb%25");
    assert_eq!(
        conversion.request.filters["product"],
        vec![FilterExpression::new(
            "name",
            FilterOp::NotLike,
            Some("a+b%".into())
        )]
    );
}

#[test]
fn related_filter_becomes_exists_without_eager_load() {
    let conversion = index("filters[reviews]=rating%3E%3D4");
    assert!(conversion.plan.eager.is_empty());
    match conversion.plan.predicates.as_slice() {
        [Predicate::Exists {
            relation, filters, ..
        }] => {
            assert_eq!(relation, "reviews");
            assert_eq!(filters.len(), 1);
        }
        other => panic!("unexpected predicates: {other:?}"),
    }
}

#[test]
fn filter_on_undeclared_relation_is_reported() {
    let conversion = index("filters[warehouse]=id=1");
    assert!(conversion.plan.predicates.is_empty());
    assert_eq!(
        conversion.request.errors,
        vec![RequestError::UnknownRelation {
            resource: "product".into(),
            relation: "warehouse".into(),
        }]
    );
}

#[test]
fn strict_filters_reject_unselectable_fields() {
    let converter = converter().with_config(ConverterConfig::default().strict_filters());
    assert!(converter.config().strict_filters);
    let conversion = converter
        .convert_query(
            "shop::Product",
            "filters[product]=secret=1",
            Action::Index,
            None,
        )
        .unwrap();
    assert!(conversion.plan.predicates.is_empty());
    assert_eq!(conversion.request.errors.len(), 1);
}

#[test]
fn limits_apply_to_selected_relations_only() {
    let conversion =
        index("fields[categories]=label&limit[categories]=5&limit[reviews]=5");
    assert_eq!(conversion.request.limits.get("categories"), Some(&5));
    assert!(!conversion.request.limits.contains_key("reviews"));
    assert_eq!(conversion.plan.eager[0].limit, Some(5));
    assert_eq!(
        conversion.request.errors,
        vec![RequestError::UnknownLimit {
            relation: "reviews".into()
        }]
    );
}

#[test]
fn unknown_relation_in_fields_is_dropped_with_error() {
    let conversion = index("fields[person]=name");
    assert!(!conversion.request.fields.contains_key("person"));
    assert!(conversion.plan.eager.is_empty());
    assert_eq!(
        conversion.request.errors,
        vec![RequestError::UnknownRelation {
            resource: "product".into(),
            relation: "person".into(),
        }]
    );
}

#[test]
fn unknown_resource_in_fields_is_reported() {
    let conversion = index("fields[gizmos]=id");
    assert_eq!(
        conversion.request.errors,
        vec![RequestError::UnknownResource {
            resource: "gizmos".into()
        }]
    );
}

#[test]
fn show_matches_id_or_alternate_key() {
    let conversion = converter()
        .show("shop::Product", &RawParams::new(), "42")
        .unwrap();
    assert_eq!(
        conversion.plan.lookup,
        Some(Lookup::PrimaryOrAlternate {
            key: "id".into(),
            alternate: "sku".into(),
            value: "42".into(),
        })
    );
    assert!(conversion.plan.window.is_none());
}

#[test]
fn show_without_id_is_fatal() {
    let err = converter()
        .convert("shop::Product", &RawParams::new(), Action::Show, None)
        .unwrap_err();
    assert!(matches!(err, PlanError::MissingId(_)));
}

#[test]
fn unknown_main_resource_is_fatal() {
    let err = converter()
        .convert("shop::Invoice", &RawParams::new(), Action::Index, None)
        .unwrap_err();
    assert!(err.is_unknown_resource());
}

#[test]
fn pagination_is_parsed_for_index() {
    let conversion = index("page=3&per_page=500");
    let window = conversion.plan.window.unwrap();
    assert_eq!(window.page, 3);
    assert_eq!(window.per_page, 100);
}

#[test]
fn conversion_is_idempotent() {
    let query = "fields[product]=name,bogus&fields[brand]=title&fields[categories]=id\
                 &filters[product]=price%3E5&filters[reviews]=rating=5&limit[categories]=2\
                 &sorting=-price,nope";
    let a = index(query);
    let b = index(query);
    assert_eq!(
        serde_json::to_string(&a.request).unwrap(),
        serde_json::to_string(&b.request).unwrap()
    );
    assert_eq!(a.plan, b.plan);
    assert_eq!(
        a.plan.to_sql().unwrap().to_sql(),
        b.plan.to_sql().unwrap().to_sql()
    );
}
