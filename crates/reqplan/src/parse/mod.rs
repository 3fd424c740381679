//! Parsing passes over [`RawParams`](crate::RawParams).
//!
//! Each pass reads one part of the raw input and writes into the
//! [`RequestModel`](crate::RequestModel), dropping and reporting what fails
//! validation. The orchestrator runs them in a fixed order:
//! sorting, fields, filters (with derived field injection), relation resolution,
//! limits, pagination.

mod fields;
mod filter;
mod limit;
mod sort;

pub use fields::{WILDCARD, parse_fields};
pub use filter::{inject_filter_fields, parse_filter, parse_filters};
pub use limit::{parse_limits, parse_pagination};
pub use sort::parse_sorting;

use crate::metadata::{MetadataProvider, ResourceMetadata, sibling_type};

/// The main resource a request is converted against, plus the provider used to
/// look up related resources.
#[derive(Clone, Copy)]
pub struct Scope<'a> {
    pub provider: &'a dyn MetadataProvider,
    pub type_id: &'a str,
    pub main: &'a ResourceMetadata,
}

impl<'a> Scope<'a> {
    pub fn new(
        provider: &'a dyn MetadataProvider,
        type_id: &'a str,
        main: &'a ResourceMetadata,
    ) -> Self {
        Self {
            provider,
            type_id,
            main,
        }
    }

    pub fn is_main(&self, key: &str) -> bool {
        key == self.main.name
    }

    /// Type identifier a resource key refers to: the target of a declared relation of
    /// that name, otherwise the conventional sibling type.
    pub fn type_of(&self, key: &str) -> String {
        if self.is_main(key) {
            return self.type_id.to_string();
        }
        match self.main.relation(key) {
            Some(relation) => relation.target.clone(),
            None => sibling_type(self.type_id, key),
        }
    }

    /// Metadata for a resource key, if it names a known resource.
    pub fn metadata_of(&self, key: &str) -> Option<&'a ResourceMetadata> {
        if self.is_main(key) {
            return Some(self.main);
        }
        self.provider.resource(&self.type_of(key))
    }
}
