//! Rhai scripting for pipeline stages
//!
//! A script stage lets a graph definition describe a transformation without
//! compiling Rust. The bag is exposed to the script as variables and the
//! script evaluates to an object map.
//!
//! ## Example Scripts
//!
//! Scaling the passthrough value:
//! ```rhai
//! #{ passthrough: passthrough * 2 }
//! ```
//!
//! Clamping into a display range:
//! ```rhai
//! #{ level: clamp(level, 0.0, 1.0) }
//! ```

mod engine;

pub use engine::ScriptEngine;

use crate::error::{FlowError, FlowResult};
use crate::pipeline::Stage;
use crate::types::Bag;
use rhai::{Engine, AST};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// A compiled script that can be executed efficiently
#[derive(Clone)]
pub struct CompiledScript {
    ast: AST,
    source: String,
    name: String,
}

impl CompiledScript {
    /// Get the source code of this script
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Get the name this script was first compiled under
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn ast(&self) -> &AST {
        &self.ast
    }
}

impl std::fmt::Debug for CompiledScript {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledScript")
            .field("name", &self.name)
            .field("source", &self.source)
            .finish()
    }
}

/// Cache for compiled scripts, keyed by source text
#[derive(Default)]
pub struct ScriptCache {
    cache: HashMap<String, CompiledScript>,
}

impl ScriptCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a cached script or compile and cache it
    pub fn get_or_compile(
        &mut self,
        engine: &Engine,
        name: &str,
        source: &str,
    ) -> FlowResult<CompiledScript> {
        if let Some(script) = self.cache.get(source) {
            return Ok(script.clone());
        }

        let ast = engine
            .compile(source)
            .map_err(|e| FlowError::Script(format!("Compilation error: {}", e)))?;

        let script = CompiledScript {
            ast,
            source: source.to_string(),
            name: name.to_string(),
        };

        self.cache.insert(source.to_string(), script.clone());
        Ok(script)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }
}

/// A pipeline stage backed by a compiled Rhai script.
#[derive(Debug, Clone)]
pub struct ScriptStage {
    name: String,
    script: CompiledScript,
    engine: Arc<ScriptEngine>,
}

impl ScriptStage {
    /// Compile `source` into a stage.
    ///
    /// A script that does not compile is an [`FlowError::InvalidStage`].
    pub fn compile(
        engine: &Arc<ScriptEngine>,
        name: impl Into<String>,
        source: &str,
    ) -> FlowResult<Self> {
        let name = name.into();
        let script = engine
            .compile(&name, source)
            .map_err(|e| FlowError::InvalidStage {
                name: name.clone(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            name,
            script,
            engine: Arc::clone(engine),
        })
    }

    pub fn source(&self) -> &str {
        self.script.source()
    }
}

impl Stage for ScriptStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, bag: &Bag) -> anyhow::Result<Value> {
        Ok(self.engine.execute(&self.script, bag)?)
    }
}
