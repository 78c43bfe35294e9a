//! Local function registry for model tool calls.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

/// A locally invocable function the model may call.
pub trait ToolHandler: Send + Sync {
    /// Invoke with the model-supplied arguments. The returned value is sent
    /// back to the model as the function response.
    fn call(&self, args: &Value) -> Value;
}

impl<F> ToolHandler for F
where
    F: Fn(&Value) -> Value + Send + Sync,
{
    fn call(&self, args: &Value) -> Value {
        self(args)
    }
}

/// Outcome of dispatching one function call.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolDispatch {
    /// The handler ran and produced a response
    Handled(Value),
    /// No handler is registered under this name
    Unknown,
}

/// Name to handler mapping, fixed once the session is built.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry every session starts with.
    ///
    /// `log_interaction` records that the model reached for a tool and
    /// acknowledges it; it has no other effect.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("log_interaction", |args: &Value| {
            tracing::info!(args = %args, "Model interaction logged");
            serde_json::json!({ "ok": true })
        });
        registry
    }

    /// Register a handler, replacing any previous one with the same name.
    pub fn register(&mut self, name: impl Into<String>, handler: impl ToolHandler + 'static) {
        self.handlers.insert(name.into(), Arc::new(handler));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Look up `name` and invoke it. Unknown names are logged and reported,
    /// never propagated as an error.
    pub fn dispatch(&self, name: &str, args: &Value) -> ToolDispatch {
        match self.handlers.get(name) {
            Some(handler) => {
                tracing::debug!("Invoking tool {}", name);
                ToolDispatch::Handled(handler.call(args))
            }
            None => {
                tracing::warn!("Tool call for unknown function '{}', ignoring", name);
                ToolDispatch::Unknown
            }
        }
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.handlers.keys().collect();
        names.sort();
        f.debug_struct("ToolRegistry").field("tools", &names).finish()
    }
}
