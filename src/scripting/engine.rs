//! Rhai Script Engine Implementation
//!
//! Scripts see the pipeline bag as plain variables and must evaluate to an
//! object map, which becomes the stage output.
//!
//! ## Helper Functions
//!
//! - `lerp(a, b, t)` - Linear interpolation
//! - `map_range(x, in_min, in_max, out_min, out_max)` - Rescale a value
//! - `clamp(x, lo, hi)` - Clamp a float into a range

use crate::error::{FlowError, FlowResult};
use crate::scripting::{CompiledScript, ScriptCache};
use crate::types::Bag;
use rhai::{Dynamic, Engine, Scope};
use serde_json::Value;
use std::sync::{Arc, RwLock};

/// The sandboxed engine shared by every script stage in a graph
pub struct ScriptEngine {
    /// The Rhai engine instance
    engine: Engine,
    /// Cache of compiled scripts
    cache: RwLock<ScriptCache>,
}

impl ScriptEngine {
    /// Create a new script engine with default configuration
    pub fn new() -> Self {
        let mut engine = Engine::new();
        Self::configure_engine(&mut engine);
        Self {
            engine,
            cache: RwLock::new(ScriptCache::new()),
        }
    }

    /// Convenience for the common case of one engine per graph
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn configure_engine(engine: &mut Engine) {
        // Sandbox limits
        engine.set_max_expr_depths(64, 64);
        engine.set_max_call_levels(32);
        engine.set_max_operations(10_000);
        engine.set_max_string_size(10_000);
        engine.set_max_array_size(1_000);
        engine.set_max_map_size(1_000);

        engine.register_fn("lerp", |a: f64, b: f64, t: f64| a + (b - a) * t);
        engine.register_fn(
            "map_range",
            |x: f64, in_min: f64, in_max: f64, out_min: f64, out_max: f64| {
                (x - in_min) * (out_max - out_min) / (in_max - in_min) + out_min
            },
        );
        engine.register_fn("clamp", |x: f64, lo: f64, hi: f64| x.max(lo).min(hi));

        engine.on_print(|text| tracing::info!("[script] {}", text));
        engine.on_debug(|text, source, pos| {
            tracing::debug!("[script {:?} @ {}] {}", source, pos, text)
        });
    }

    /// Compile a script and cache it
    pub fn compile(&self, name: &str, source: &str) -> FlowResult<CompiledScript> {
        let mut cache = self
            .cache
            .write()
            .map_err(|e| FlowError::Script(format!("Failed to acquire cache lock: {}", e)))?;

        cache.get_or_compile(&self.engine, name, source)
    }

    /// Evaluate a compiled script against a bag.
    ///
    /// Bag entries whose keys are valid identifiers are bound as variables.
    /// The script's value is returned as JSON without checking its shape.
    pub fn execute(&self, script: &CompiledScript, bag: &Bag) -> FlowResult<Value> {
        let mut scope = Scope::new();
        for (key, value) in bag {
            if !is_identifier(key) {
                tracing::debug!(
                    "Script '{}': bag key '{}' is not an identifier, not bound",
                    script.name(),
                    key
                );
                continue;
            }
            let dynamic = rhai::serde::to_dynamic(value).map_err(FlowError::from_rhai_error)?;
            scope.push_dynamic(key.as_str(), dynamic);
        }

        let result = self
            .engine
            .eval_ast_with_scope::<Dynamic>(&mut scope, script.ast())
            .map_err(|e| FlowError::Script(format!("Execution error: {}", e)))?;

        rhai::serde::from_dynamic::<Value>(&result)
            .map_err(|e| FlowError::Script(format!("Result is not representable: {}", e)))
    }

    /// Compile and execute a script in one step
    pub fn eval(&self, source: &str, bag: &Bag) -> FlowResult<Value> {
        let script = self.compile("temp", source)?;
        self.execute(&script, bag)
    }

    /// Clear the script cache
    pub fn clear_cache(&self) -> FlowResult<()> {
        let mut cache = self
            .cache
            .write()
            .map_err(|e| FlowError::Script(format!("Failed to acquire cache lock: {}", e)))?;
        cache.clear();
        Ok(())
    }

    /// Number of distinct scripts compiled so far
    pub fn cached_scripts(&self) -> usize {
        self.cache.read().map(|c| c.len()).unwrap_or(0)
    }
}

impl Default for ScriptEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ScriptEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptEngine")
            .field("cache_size", &self.cached_scripts())
            .finish()
    }
}

fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
