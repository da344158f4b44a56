//! Capability Trait and Tool Registry
//!
//! The execution contract between the orchestration core and the external
//! handler modules (mouse/keyboard/browser/etc. wrappers): a capability takes
//! a parameters mapping and either returns a value or fails with a typed
//! [`CoreError`]. Handlers register themselves under an operation name at
//! startup; the registry is read-only while a plan run is in flight.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{CoreError, CoreResult};

/// The executable behavior bound to an operation name.
///
/// Implementations must classify every failure as a [`CoreError`]; raising
/// an unstructured failure (panic) breaks the controller's contract.
#[async_trait]
pub trait Capability: Send + Sync {
    /// Invoke the capability with a parameters mapping.
    async fn invoke(&self, parameters: &Value) -> CoreResult<Value>;
}

impl std::fmt::Debug for dyn Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Capability")
    }
}

/// A capability backed by a closure, for tests and lightweight handlers.
pub struct FunctionCapability<F>
where
    F: Fn(&Value) -> CoreResult<Value> + Send + Sync,
{
    func: F,
}

impl<F> FunctionCapability<F>
where
    F: Fn(&Value) -> CoreResult<Value> + Send + Sync,
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F> Capability for FunctionCapability<F>
where
    F: Fn(&Value) -> CoreResult<Value> + Send + Sync,
{
    async fn invoke(&self, parameters: &Value) -> CoreResult<Value> {
        (self.func)(parameters)
    }
}

/// Registry mapping operation names to capabilities.
///
/// Populated by external collaborators at startup in a fixed, known order;
/// re-registering an existing name silently overwrites it (last registration
/// wins) while keeping the original position in the iteration order. Shared
/// across plan executions behind an `Arc`; lookups are read-only and safe to
/// perform concurrently during a run.
pub struct ToolRegistry {
    capabilities: HashMap<String, Arc<dyn Capability>>,
    /// Registration order for deterministic iteration.
    order: Vec<String>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            capabilities: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Register a capability under an operation name.
    /// Silently replaces any capability already registered under that name.
    pub fn register(&mut self, name: impl Into<String>, capability: Arc<dyn Capability>) {
        let name = name.into();
        if !self.capabilities.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.capabilities.insert(name, capability);
    }

    /// Register a closure-backed capability.
    pub fn register_fn<F>(&mut self, name: impl Into<String>, func: F)
    where
        F: Fn(&Value) -> CoreResult<Value> + Send + Sync + 'static,
    {
        self.register(name, Arc::new(FunctionCapability::new(func)));
    }

    /// Resolve an operation name to its capability.
    ///
    /// Returns `Err(CoreError::ToolNotFound)` for unknown names; callers
    /// treat this as a validation-time or execution-time error, never a
    /// panic.
    pub fn resolve(&self, name: &str) -> CoreResult<Arc<dyn Capability>> {
        self.capabilities
            .get(name)
            .cloned()
            .ok_or_else(|| CoreError::tool_not_found(name))
    }

    /// Check if an operation name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.capabilities.contains_key(name)
    }

    /// Registered operation names, in first-registration order.
    pub fn names(&self) -> Vec<String> {
        self.order.clone()
    }

    /// Number of registered capabilities.
    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("names", &self.order)
            .finish()
    }
}
