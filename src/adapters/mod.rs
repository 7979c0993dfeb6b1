// Adapters layer: concrete implementations of the domain ports.

pub mod http;
pub mod storage;

pub use http::{AuthenticatingClient, ClientOptions};
pub use storage::LocalConfigStore;
