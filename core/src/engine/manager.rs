use crate::error::ScoutError;
use crate::engine::Engine;
use crate::model::Model;
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of engines by driver name.
pub struct EngineManager {
    default: String,
    engines: HashMap<String, Arc<dyn Engine>>,
}

impl EngineManager {
    pub fn new(default: impl Into<String>) -> Self {
        Self {
            default: default.into(),
            engines: HashMap::new(),
        }
    }

    pub fn register(&mut self, driver: impl Into<String>, engine: Arc<dyn Engine>) -> &mut Self {
        self.engines.insert(driver.into(), engine);
        self
    }

    pub fn with(mut self, driver: impl Into<String>, engine: Arc<dyn Engine>) -> Self {
        self.register(driver, engine);
        self
    }

    pub fn default_driver(&self) -> &str {
        &self.default
    }

    /// The engine of the default driver.
    pub fn engine(&self) -> Result<&Arc<dyn Engine>, ScoutError> {
        self.driver(&self.default)
    }

    pub fn driver(&self, name: &str) -> Result<&Arc<dyn Engine>, ScoutError> {
        self.engines
            .get(name)
            .ok_or_else(|| ScoutError::UnknownEngine(name.to_string()))
    }

    /// The model's own driver when it names one, the default otherwise.
    pub fn for_model(&self, model: &Model) -> Result<&Arc<dyn Engine>, ScoutError> {
        self.driver(model.engine_name().unwrap_or(&self.default))
    }
}
