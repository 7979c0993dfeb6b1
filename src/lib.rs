pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{AuthenticatingClient, ClientOptions, LocalConfigStore};
pub use config::{settings::MirrorSettings, toml_config::TomlConfig};
pub use crate::core::{
    discovery::TreeDiscoverer, dispatch::DownloadDispatcher, engine::MirrorEngine,
};
pub use domain::model::{
    Credential, DiscoveryResult, DispatchReport, LeafDescriptor, MirrorTarget, RunSummary,
};
pub use utils::error::{MirrorError, Result};
