//! The request converter: runs every pass in order and compiles the plan.

use crate::compile::compile;
use crate::config::ConverterConfig;
use crate::error::{PlanError, PlanResult};
use crate::metadata::MetadataProvider;
use crate::params::RawParams;
use crate::parse::{
    Scope, inject_filter_fields, parse_fields, parse_filters, parse_limits, parse_pagination,
    parse_sorting,
};
use crate::plan::QueryPlan;
use crate::request::{Action, RequestModel};
use crate::resolve::{resolve_filter_targets, resolve_relations};
use serde::Serialize;

/// Result of one conversion: the annotated request and the plan compiled from it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conversion {
    pub request: RequestModel,
    pub plan: QueryPlan,
}

/// Converts raw request parameters into a [`RequestModel`] and a [`QueryPlan`].
///
/// Conversion is synchronous and holds no state between calls; one converter can be
/// shared by every request handler.
///
/// # Example
/// ```ignore
/// use reqplan::{Action, RawParams, RequestConverter};
///
/// let converter = RequestConverter::new(registry);
/// let raw = RawParams::from_query_str("fields[post]=title&fields[author]=name&sorting=-title");
/// let conversion = converter.convert("Post", &raw, Action::Index, None)?;
/// let page = conversion.plan.fetch_page(&client).await?;
/// ```
#[derive(Debug, Clone)]
pub struct RequestConverter<P> {
    provider: P,
    config: ConverterConfig,
}

impl<P: MetadataProvider> RequestConverter<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            config: ConverterConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ConverterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Convert `raw` for `resource_type`.
    ///
    /// Request-data problems never fail the call; they are collected on
    /// [`RequestModel::errors`]. Errors are returned only when `resource_type` has no
    /// metadata or a `show` is requested without an id.
    pub fn convert(
        &self,
        resource_type: &str,
        raw: &RawParams,
        action: Action,
        id: Option<&str>,
    ) -> PlanResult<Conversion> {
        let main = self
            .provider
            .resource(resource_type)
            .ok_or_else(|| PlanError::UnknownResource(resource_type.to_string()))?;
        if action == Action::Show && id.is_none() {
            return Err(PlanError::MissingId(resource_type.to_string()));
        }

        let span = tracing::debug_span!("convert", resource = resource_type, action = %action);
        let _enter = span.enter();

        let scope = Scope::new(&self.provider, resource_type, main);
        let mut model = RequestModel::new(resource_type, main.name.as_str(), action);

        if action == Action::Index {
            parse_sorting(main, raw.sorting.as_deref(), &mut model);
        }
        parse_fields(&scope, &raw.fields, &mut model);
        parse_filters(&scope, &raw.filters, self.config.strict_filters, &mut model);
        inject_filter_fields(&mut model);
        resolve_relations(&scope, &mut model);
        resolve_filter_targets(&scope, &mut model);
        parse_limits(&raw.limit, &mut model);
        if action == Action::Index {
            parse_pagination(
                &self.config,
                raw.page.as_deref(),
                raw.per_page.as_deref(),
                &mut model,
            );
        }

        let plan = compile(&scope, &model, id);
        tracing::debug!(
            fields = plan.columns.len(),
            eager = plan.eager.len(),
            predicates = plan.predicates.len(),
            errors = model.errors.len(),
            "converted"
        );

        Ok(Conversion {
            request: model,
            plan,
        })
    }

    /// Parse `query` as a URL query string and convert it.
    pub fn convert_query(
        &self,
        resource_type: &str,
        query: &str,
        action: Action,
        id: Option<&str>,
    ) -> PlanResult<Conversion> {
        self.convert(resource_type, &RawParams::from_query_str(query), action, id)
    }

    /// Convert for a list endpoint.
    pub fn index(&self, resource_type: &str, raw: &RawParams) -> PlanResult<Conversion> {
        self.convert(resource_type, raw, Action::Index, None)
    }

    /// Convert for a single-entity endpoint.
    pub fn show(&self, resource_type: &str, raw: &RawParams, id: &str) -> PlanResult<Conversion> {
        self.convert(resource_type, raw, Action::Show, Some(id))
    }
}
