use std::collections::HashMap;

use tracing::debug;

use crate::config::LinkConfig;
use crate::error::{LinkError, Result};
use crate::handler::{same_handler, HandlerRef};

struct Registration {
    message: u8,
    handler: HandlerRef,
}

impl Registration {
    fn matches(&self, message: u8, handler: &HandlerRef) -> bool {
        self.message == message && same_handler(&self.handler, handler)
    }
}

/// Component-keyed registry of message handlers.
///
/// Each component ID owns an insertion-ordered bucket of registrations.
/// Buckets are created on first registration and kept when they empty
/// out, for as long as the registry lives. The registry does no locking
/// of its own; [`LinkContext`](crate::LinkContext) serializes access to it.
pub struct HandlerRegistry {
    buckets: HashMap<u8, Vec<Registration>>,
    config: LinkConfig,
}

impl HandlerRegistry {
    /// Create an empty, unbounded registry.
    pub fn new() -> Self {
        Self::with_config(LinkConfig::default())
    }

    /// Create an empty registry with explicit bounds.
    pub fn with_config(config: LinkConfig) -> Self {
        Self {
            buckets: HashMap::new(),
            config,
        }
    }

    /// Append a handler for `(component, message)`.
    ///
    /// Fails with [`LinkError::DuplicateRegistration`] if this exact handler
    /// is already registered for the pair, and with
    /// [`LinkError::ResourceExhausted`] if an explicit bound is reached or
    /// memory cannot be reserved. A failed call leaves the registry unchanged.
    pub fn register(&mut self, component: u8, message: u8, handler: HandlerRef) -> Result<()> {
        match self.buckets.get_mut(&component) {
            Some(bucket) => {
                if bucket.iter().any(|entry| entry.matches(message, &handler)) {
                    return Err(LinkError::DuplicateRegistration { component, message });
                }
                if self.config.bucket_exhausted(bucket.len()) {
                    return Err(LinkError::ResourceExhausted("component handler limit reached"));
                }
                bucket
                    .try_reserve(1)
                    .map_err(|_| LinkError::ResourceExhausted("handler allocation failed"))?;
                bucket.push(Registration { message, handler });
            }
            None => {
                if self.config.components_exhausted(self.buckets.len())
                    || self.config.bucket_exhausted(0)
                {
                    return Err(LinkError::ResourceExhausted("component limit reached"));
                }
                let mut bucket = Vec::new();
                bucket
                    .try_reserve(1)
                    .map_err(|_| LinkError::ResourceExhausted("bucket allocation failed"))?;
                self.buckets
                    .try_reserve(1)
                    .map_err(|_| LinkError::ResourceExhausted("bucket allocation failed"))?;
                bucket.push(Registration { message, handler });
                self.buckets.insert(component, bucket);
            }
        }

        debug!(component, message, "handler registered");
        Ok(())
    }

    /// Remove one registration of exactly this handler for `(component, message)`.
    pub fn unregister(&mut self, component: u8, message: u8, handler: &HandlerRef) -> Result<()> {
        let bucket = self
            .buckets
            .get_mut(&component)
            .ok_or(LinkError::ComponentNotFound(component))?;

        let pos = bucket
            .iter()
            .position(|entry| entry.matches(message, handler))
            .ok_or(LinkError::HandlerNotFound { component, message })?;
        bucket.remove(pos);

        debug!(component, message, "handler unregistered");
        Ok(())
    }

    /// All handlers registered for `(component, message)`, in registration order.
    pub fn lookup(&self, component: u8, message: u8) -> Vec<HandlerRef> {
        self.buckets
            .get(&component)
            .map(|bucket| {
                bucket
                    .iter()
                    .filter(|entry| entry.message == message)
                    .map(|entry| HandlerRef::clone(&entry.handler))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Check if a bucket exists for the component (it may be empty).
    pub fn has_component(&self, component: u8) -> bool {
        self.buckets.contains_key(&component)
    }

    /// Get component IDs that have buckets.
    pub fn components(&self) -> Vec<u8> {
        let mut components: Vec<u8> = self.buckets.keys().copied().collect();
        components.sort_unstable();
        components
    }

    /// Number of registrations for one component.
    pub fn handler_count(&self, component: u8) -> usize {
        self.buckets.get(&component).map_or(0, Vec::len)
    }

    /// Whether this handler is registered for any `(component, message)`.
    pub fn contains(&self, handler: &HandlerRef) -> bool {
        self.buckets
            .values()
            .flatten()
            .any(|entry| same_handler(&entry.handler, handler))
    }

    /// Total number of registrations.
    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// Whether the registry holds no registrations.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get registry configuration.
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("components", &self.components())
            .field("registrations", &self.len())
            .finish()
    }
}
