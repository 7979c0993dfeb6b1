use crate::domain::model::Credential;
use crate::domain::ports::Fetcher;
use crate::utils::error::{AuthError, FetchError, MirrorError, Result};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(60),
            user_agent: format!("config-mirror/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// HTTP client that answers 401/403 challenges with Basic credentials once
/// `authenticate` has installed them.
pub struct AuthenticatingClient {
    client: Client,
    credential: Option<Credential>,
}

impl AuthenticatingClient {
    pub fn new(options: ClientOptions) -> Result<Self> {
        let client = Client::builder()
            .timeout(options.request_timeout)
            .user_agent(options.user_agent)
            .build()
            .map_err(|e| MirrorError::Config {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            credential: None,
        })
    }

    pub fn is_authenticated(&self) -> bool {
        self.credential.is_some()
    }

    /// Installs `credential` for every later request and checks it against
    /// `probe_url`.
    ///
    /// # Panics
    ///
    /// Panics if credentials were already installed on this client.
    pub async fn authenticate(
        &mut self,
        credential: Credential,
        probe_url: &str,
    ) -> std::result::Result<(), AuthError> {
        assert!(
            self.credential.is_none(),
            "authenticate may only be called once per client"
        );

        tracing::debug!("Probing {} as {}", probe_url, credential.username);
        self.credential = Some(credential);

        match self.send(probe_url).await {
            Ok(response) if response.status().is_success() => {
                tracing::info!("🔑 Authenticated against {}", probe_url);
                Ok(())
            }
            Ok(response) if response.status() == StatusCode::UNAUTHORIZED => {
                Err(AuthError::Rejected {
                    url: probe_url.to_string(),
                })
            }
            Ok(response) => Err(AuthError::Transport {
                url: probe_url.to_string(),
                reason: format!("unexpected status {}", response.status()),
            }),
            Err(e) => Err(AuthError::Transport {
                url: probe_url.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    async fn send(&self, url: &str) -> std::result::Result<Response, reqwest::Error> {
        let response = self.client.get(url).send().await?;

        let Some(credential) = &self.credential else {
            return Ok(response);
        };

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                tracing::debug!(
                    "{} challenged with {}, retrying with credentials",
                    url,
                    response.status()
                );
                self.client
                    .get(url)
                    .basic_auth(&credential.username, Some(&credential.secret))
                    .send()
                    .await
            }
            _ => Ok(response),
        }
    }

    pub async fn get_bytes(&self, url: &str) -> std::result::Result<Vec<u8>, FetchError> {
        let response = self
            .send(url)
            .await
            .map_err(|e| classify_transport_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| classify_transport_error(url, e))?;
        Ok(body.to_vec())
    }
}

fn classify_transport_error(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Transport {
            url: url.to_string(),
            source: error,
        }
    }
}

#[async_trait]
impl Fetcher for AuthenticatingClient {
    async fn get(&self, url: &str) -> std::result::Result<Vec<u8>, FetchError> {
        self.get_bytes(url).await
    }
}
