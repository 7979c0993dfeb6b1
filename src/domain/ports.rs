use crate::domain::model::{Credential, MirrorTarget};
use crate::utils::error::{FetchError, PersistError};
use async_trait::async_trait;
use std::time::Duration;

/// Read side of the remote server.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Write side: one flat namespace of `{name}.xml` artifacts.
pub trait ArtifactStore: Send + Sync {
    fn exists(&self, name: &str) -> impl std::future::Future<Output = bool> + Send;
    fn write(
        &self,
        name: &str,
        body: &[u8],
    ) -> impl std::future::Future<Output = Result<(), PersistError>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn targets(&self) -> Vec<MirrorTarget>;
    fn output_path(&self) -> &str;
    fn concurrent_requests(&self) -> Option<usize>;
    fn skip_folders(&self) -> &[String];
    fn request_timeout(&self) -> Duration;
    fn probe_url(&self) -> Option<&str>;
    fn username(&self) -> Option<&str>;
    fn api_token(&self) -> Option<&str>;

    /// Resolves the configured username/token pair, reading the token from
    /// disk when it names a file.
    fn credential(&self) -> crate::utils::error::Result<Option<Credential>> {
        match (self.username(), self.api_token()) {
            (Some(username), Some(token)) => Credential::resolve(username, token).map(Some),
            (None, None) => Ok(None),
            (Some(_), None) => Err(crate::utils::error::MirrorError::MissingConfig {
                field: "api_token".to_string(),
            }),
            (None, Some(_)) => Err(crate::utils::error::MirrorError::MissingConfig {
                field: "username".to_string(),
            }),
        }
    }
}
