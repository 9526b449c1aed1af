use arena_core::config::{DEFAULT_ENTRYPOINT, ENV_ENGINE_PATH, ENV_PYTHON, EngineConfig};
use std::env;
use std::path::PathBuf;

// One test per binary touches the process environment, so nothing races.
#[test]
fn test_env_var_overrides() {
    // SAFETY: no other thread in this test binary reads the environment.
    unsafe {
        env::set_var(ENV_PYTHON, "python3.12");
        env::set_var(ENV_ENGINE_PATH, "/opt/arena/engine");
    }

    let config = EngineConfig::default();
    assert_eq!(config.python, "python3.12");
    assert_eq!(config.engine_dir, PathBuf::from("/opt/arena/engine"));
    assert_eq!(config.entrypoint, PathBuf::from(DEFAULT_ENTRYPOINT));

    // Explicit builder calls still win.
    let config = EngineConfig::builder().python("py").build();
    assert_eq!(config.python, "py");
    assert_eq!(config.engine_dir, PathBuf::from("/opt/arena/engine"));

    // Blank values fall back to the defaults.
    unsafe {
        env::set_var(ENV_PYTHON, "  ");
        env::remove_var(ENV_ENGINE_PATH);
    }
    let config = EngineConfig::default();
    assert_eq!(config.python, arena_core::config::DEFAULT_PYTHON);
    assert_eq!(
        config.engine_dir,
        PathBuf::from(arena_core::config::DEFAULT_ENGINE_DIR)
    );

    unsafe {
        env::remove_var(ENV_PYTHON);
    }
}
