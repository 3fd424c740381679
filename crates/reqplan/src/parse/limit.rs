use crate::config::ConverterConfig;
use crate::error::RequestError;
use crate::params::RawValue;
use crate::request::{Pagination, RequestModel};
use std::collections::BTreeMap;

/// Limit extraction pass.
///
/// Runs after relation resolution: a `limit[key]` is kept only when `key` is a
/// selected relation and the value is a positive integer. When a key is repeated
/// the last value wins.
pub fn parse_limits(raw: &BTreeMap<String, RawValue>, model: &mut RequestModel) {
    for (key, value) in raw {
        let Some(value) = value.iter().last() else {
            continue;
        };

        if *key == model.resource {
            model.record(RequestError::LimitOnMainResource {
                resource: key.clone(),
            });
            continue;
        }
        if !model.fields.contains_key(key) {
            model.record(RequestError::UnknownLimit {
                relation: key.clone(),
            });
            continue;
        }

        match parse_positive(value) {
            Some(limit) => {
                model.limits.insert(key.clone(), limit);
            }
            None => model.record(RequestError::InvalidLimit {
                relation: key.clone(),
                value: value.to_string(),
            }),
        }
    }
}

/// Page window for index requests.
///
/// Missing values use the configured defaults; invalid ones are reported and fall
/// back to the defaults. `per_page` is capped at `max_per_page`.
pub fn parse_pagination(
    config: &ConverterConfig,
    page: Option<&str>,
    per_page: Option<&str>,
    model: &mut RequestModel,
) {
    let page = match page {
        None => 1,
        Some(raw) => parse_positive(raw).unwrap_or_else(|| {
            model.record(RequestError::InvalidPagination {
                param: "page",
                value: raw.to_string(),
            });
            1
        }),
    };
    let per_page = match per_page {
        None => config.default_per_page,
        Some(raw) => parse_positive(raw).unwrap_or_else(|| {
            model.record(RequestError::InvalidPagination {
                param: "per_page",
                value: raw.to_string(),
            });
            config.default_per_page
        }),
    };

    model.pagination = Some(Pagination {
        page,
        per_page: per_page.min(config.max_per_page),
    });
}

fn parse_positive(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok().filter(|n| *n > 0)
}
