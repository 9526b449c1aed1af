// ============================================================================
// arena-core/src/config/builder.rs
// ============================================================================
//
// CONFIGURATION BUILDER: Builder Pattern for EngineConfig
//
// Starts from the environment-aware defaults of EngineConfig and lets the
// CLI layer user-config values and flags on top.

use std::path::PathBuf;

use super::EngineConfig;

/// Builder for creating EngineConfig instances.
///
/// # Examples
///
/// ```rust
/// use arena_core::config::EngineConfigBuilder;
///
/// let config = EngineConfigBuilder::new()
///     .python("python3.11")
///     .engine_dir("/opt/arena/engine")
///     .build();
/// assert_eq!(config.entrypoint_path().to_str(), Some("/opt/arena/engine/arena/main.py"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the interpreter used to run the engine.
    pub fn python(mut self, python: impl Into<String>) -> Self {
        self.config.python = python.into();
        self
    }

    /// Sets the engine install directory.
    pub fn engine_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.engine_dir = dir.into();
        self
    }

    /// Sets the entry script.
    pub fn entrypoint(mut self, entrypoint: impl Into<PathBuf>) -> Self {
        self.config.entrypoint = entrypoint.into();
        self
    }

    /// Sets the module that provides the `format` command.
    pub fn format_module(mut self, module: impl Into<String>) -> Self {
        self.config.format_module = module.into();
        self
    }

    /// Sets the module search path variable.
    pub fn module_path_var(mut self, var: impl Into<String>) -> Self {
        self.config.module_path_var = var.into();
        self
    }

    /// Sets the module imported by the dependency probe.
    pub fn probe_module(mut self, module: impl Into<String>) -> Self {
        self.config.probe_module = module.into();
        self
    }

    pub fn build(self) -> EngineConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides() {
        let config = EngineConfigBuilder::new()
            .python("py")
            .engine_dir("/srv/engine")
            .entrypoint("run.py")
            .module_path_var("ENGINE_PATH")
            .probe_module("engine")
            .format_module("engine.format")
            .build();

        assert_eq!(config.python, "py");
        assert_eq!(config.entrypoint_path(), PathBuf::from("/srv/engine/run.py"));
        assert_eq!(config.module_path_var, "ENGINE_PATH");
        assert_eq!(config.probe_module, "engine");
        assert_eq!(config.format_module, "engine.format");
    }

    #[test]
    fn test_absolute_entrypoint_is_kept() {
        let config = EngineConfigBuilder::new()
            .engine_dir("/srv/engine")
            .entrypoint("/elsewhere/main.py")
            .build();
        assert_eq!(config.entrypoint_path(), PathBuf::from("/elsewhere/main.py"));
        assert_eq!(config.format_module, crate::config::DEFAULT_FORMAT_MODULE);
    }
}
