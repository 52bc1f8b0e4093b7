pub mod loader;
pub mod schema;

pub use loader::{
    DEFAULT_PORT, ServerConfig, default_constitution_path, load_constitution,
    server_config_from_env,
};
pub use schema::{
    Constitution, ExecutionModeSection, HardKillSection, NetworkLockSection, PolicyConfig,
};
