pub mod discovery;
pub mod dispatch;
pub mod engine;

pub use crate::domain::model::{DiscoveryResult, DispatchReport, LeafDescriptor, TreeNode};
pub use crate::domain::ports::{ArtifactStore, ConfigProvider, Fetcher};
pub use crate::utils::error::Result;
