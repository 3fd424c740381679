use serde::Deserialize;

/// Tunables for [`RequestConverter`](crate::RequestConverter).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Page size used when the request carries no valid `per_page`.
    pub default_per_page: u64,
    /// Upper bound applied to a requested `per_page`.
    pub max_per_page: u64,
    /// Drop (and report) filters on fields outside the selectable allow-list.
    ///
    /// Off by default: filtering on any well-formed field name is allowed and
    /// expands the selected fields.
    pub strict_filters: bool,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            default_per_page: 15,
            max_per_page: 100,
            strict_filters: false,
        }
    }
}

impl ConverterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the page size used when none is requested.
    pub fn with_default_per_page(mut self, per_page: u64) -> Self {
        self.default_per_page = per_page.max(1);
        self
    }

    /// Set the largest page size a client may request.
    pub fn with_max_per_page(mut self, per_page: u64) -> Self {
        self.max_per_page = per_page.max(1);
        self
    }

    /// Reject filters on non-selectable fields.
    pub fn strict_filters(mut self) -> Self {
        self.strict_filters = true;
        self
    }
}
