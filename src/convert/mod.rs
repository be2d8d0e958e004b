//! Conversion function registry.
//!
//! A conversion is a pure value transform applied between resolving a
//! field and packing it: `(value, context, args) -> value`. The registry
//! maps names to functions; names are resolved once when the schema is
//! compiled, never per write. There is no process-wide registry; callers
//! pass one by reference into [`LayoutDescriptor::compile`].
//!
//! [`LayoutDescriptor::compile`]: crate::schema::LayoutDescriptor::compile

mod builtins;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::host::TraversalContext;
use crate::util::{Error, Result};
use crate::value::Value;

/// Signature shared by every conversion function.
///
/// Conversions are pure with respect to the buffers: they may read the
/// traversal context but never mutate it.
pub type ConversionFn =
    dyn Fn(&Value, &TraversalContext<'_>, Option<&serde_json::Value>) -> Result<Value>
        + Send
        + Sync;

/// A named conversion resolved from a [`ConversionRegistry`].
#[derive(Clone)]
pub struct Conversion {
    name: Arc<str>,
    func: Arc<ConversionFn>,
}

impl Conversion {
    /// The name this conversion was registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Apply the conversion to `value`.
    pub fn apply(
        &self,
        value: &Value,
        ctx: &TraversalContext<'_>,
        args: Option<&serde_json::Value>,
    ) -> Result<Value> {
        (self.func)(value, ctx, args)
    }
}

impl fmt::Debug for Conversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Conversion({})", self.name)
    }
}

/// Mapping from conversion names to functions.
pub struct ConversionRegistry {
    functions: HashMap<String, Arc<ConversionFn>>,
}

impl ConversionRegistry {
    /// Registry with no functions at all.
    pub fn empty() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    /// Registry pre-populated with the built-in conversions the preset
    /// schemas rely on: `none`, `float_to_byte`, `vec_to_bytes`,
    /// `invert_v`, `invert_y`, `vertex_group_ids_to_bitmask` and
    /// `constant_from_args`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        builtins::register_all(&mut registry);
        registry
    }

    /// Register `func` under `name`, replacing any previous entry.
    pub fn register<F>(&mut self, name: &str, func: F)
    where
        F: Fn(&Value, &TraversalContext<'_>, Option<&serde_json::Value>) -> Result<Value>
            + Send
            + Sync
            + 'static,
    {
        self.functions.insert(name.to_string(), Arc::new(func));
    }

    /// Look up `name`.
    pub fn resolve(&self, name: &str) -> Result<Conversion> {
        let func = self
            .functions
            .get(name)
            .ok_or_else(|| Error::UnknownConversion(name.to_string()))?;
        Ok(Conversion {
            name: Arc::from(name),
            func: Arc::clone(func),
        })
    }

    /// Registered names, unordered.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }
}

impl Default for ConversionRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
