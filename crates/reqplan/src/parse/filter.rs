use super::Scope;
use super::fields::WILDCARD;
use crate::error::RequestError;
use crate::params::RawValue;
use crate::request::{FilterExpression, FilterOp, RequestModel};
use percent_encoding::percent_decode_str;
use std::collections::BTreeMap;

/// Filter extraction pass.
///
/// Every string that matches `<field>[ ]<op>[ ][<value>]` becomes a
/// [`FilterExpression`] under its resource key; anything else is dropped without an
/// error. With `strict` set, filters on fields the resource does not allow selecting
/// are dropped and reported as well.
pub fn parse_filters(
    scope: &Scope<'_>,
    raw: &BTreeMap<String, RawValue>,
    strict: bool,
    model: &mut RequestModel,
) {
    for (key, value) in raw {
        let mut parsed = Vec::new();
        for input in value.iter() {
            let decoded = percent_decode_str(input).decode_utf8_lossy();
            let Some(expr) = parse_filter(&decoded) else {
                tracing::trace!(target: "reqplan.convert", resource = %key, filter = %decoded, "filter does not match grammar");
                continue;
            };

            if strict {
                if let Some(meta) = scope.metadata_of(key) {
                    if !meta.can_select(&expr.field) {
                        model.record(RequestError::UnknownFilterField {
                            resource: key.clone(),
                            field: expr.field,
                        });
                        continue;
                    }
                }
            }
            parsed.push(expr);
        }

        if !parsed.is_empty() {
            model.filters.entry(key.clone()).or_default().extend(parsed);
        }
    }
}

/// Derived field injection.
///
/// Appends every filtered field to its resource's selected fields. Resources without
/// a selection entry, or selected through the wildcard, are left alone.
pub fn inject_filter_fields(model: &mut RequestModel) {
    for (key, exprs) in &model.filters {
        let Some(fields) = model.fields.get_mut(key) else {
            continue;
        };
        if fields.contains(WILDCARD) {
            continue;
        }
        for expr in exprs {
            fields.ensure(&expr.field);
        }
    }
}

/// Parse one already-decoded filter string.
///
/// The field is `[A-Za-z_]` followed by the longest run of `[A-Za-z0-9_]`; one
/// optional space may surround the operator, which is matched case-insensitively.
/// Value operators need a non-empty value; `null`/`not null` must end the input.
pub fn parse_filter(input: &str) -> Option<FilterExpression> {
    if !input
        .bytes()
        .next()
        .is_some_and(|b| b.is_ascii_alphabetic() || b == b'_')
    {
        return None;
    }
    let field_len = input
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
        .count();
    let (field, rest) = input.split_at(field_len);
    let rest = rest.strip_prefix(' ').unwrap_or(rest);

    let op = FilterOp::ALL.into_iter().find(|op| {
        let token = op.token();
        rest.get(..token.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(token))
    })?;
    let rest = &rest[op.token().len()..];
    let value = rest.strip_prefix(' ').unwrap_or(rest);

    match (op.takes_value(), value.is_empty()) {
        (true, false) => Some(FilterExpression::new(field, op, Some(value.to_string()))),
        (false, true) => Some(FilterExpression::new(field, op, None)),
        _ => None,
    }
}
