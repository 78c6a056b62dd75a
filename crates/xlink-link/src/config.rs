use serde::{Deserialize, Serialize};

/// Optional bounds applied to a link's handler registry.
///
/// Both limits default to `None`, meaning the registry grows until an
/// allocation fails. Integrators that want a hard ceiling set them
/// explicitly, for example from a JSON or TOML file; missing fields keep
/// their default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Maximum number of distinct component IDs with handler buckets.
    pub max_components: Option<usize>,
    /// Maximum number of registrations within one component bucket.
    pub max_handlers_per_component: Option<usize>,
}

impl LinkConfig {
    pub(crate) fn components_exhausted(&self, current: usize) -> bool {
        self.max_components.is_some_and(|max| current >= max)
    }

    pub(crate) fn bucket_exhausted(&self, current: usize) -> bool {
        self.max_handlers_per_component.is_some_and(|max| current >= max)
    }
}
