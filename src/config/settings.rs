use crate::core::dispatch::default_concurrency;
use crate::domain::model::{Credential, MirrorTarget};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{MirrorError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_positive_number, validate_range,
    validate_unique, validate_url, Validate,
};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

const PROBE_PAGE: &str = "configure";
const TREE_SEGMENTS: [&str; 2] = ["/job/", "/view/"];

/// Everything a run needs, resolved once at start-up and passed down.
#[derive(Debug, Clone)]
pub struct MirrorSettings {
    pub targets: Vec<MirrorTarget>,
    pub output_path: PathBuf,
    pub concurrency: usize,
    pub skip_folders: Vec<String>,
    pub request_timeout: Duration,
    pub probe_url: String,
    pub credential: Option<Credential>,
}

/// `{context}/configure`, where the context is the part of the root's path
/// before its first `/job/` or `/view/` segment.
fn derive_probe_url(root_url: &str) -> Result<String> {
    let mut url = Url::parse(root_url).map_err(|e| MirrorError::InvalidConfigValue {
        field: "root_url".to_string(),
        value: root_url.to_string(),
        reason: format!("Invalid URL format: {}", e),
    })?;

    let path = url.path();
    let context = TREE_SEGMENTS
        .iter()
        .filter_map(|segment| path.find(segment))
        .min()
        .map_or(path, |end| &path[..end]);
    let probe_path = format!("{}/{}", context.trim_end_matches('/'), PROBE_PAGE);

    url.set_path(&probe_path);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url.to_string())
}

impl MirrorSettings {
    pub fn from_provider<P: ConfigProvider + ?Sized>(provider: &P) -> Result<Self> {
        let targets = provider.targets();
        let first = targets.first().ok_or_else(|| MirrorError::MissingConfig {
            field: "targets".to_string(),
        })?;

        for target in &targets {
            validate_url("root_url", &target.root_url)?;
        }

        let probe_url = match provider.probe_url() {
            Some(url) => url.to_string(),
            None => derive_probe_url(&first.root_url)?,
        };

        let settings = Self {
            output_path: PathBuf::from(provider.output_path()),
            concurrency: provider
                .concurrent_requests()
                .unwrap_or_else(default_concurrency),
            skip_folders: provider.skip_folders().to_vec(),
            request_timeout: provider.request_timeout(),
            probe_url,
            credential: provider.credential()?,
            targets,
        };
        settings.validate()?;

        Ok(settings)
    }
}

impl Validate for MirrorSettings {
    fn validate(&self) -> Result<()> {
        if self.targets.is_empty() {
            return Err(MirrorError::MissingConfig {
                field: "targets".to_string(),
            });
        }

        for target in &self.targets {
            validate_non_empty_string("targets.name", &target.name)?;
            validate_url("targets.root_url", &target.root_url)?;
            if let Some(subdir) = &target.output_subdir {
                validate_path("targets.output_subdir", subdir)?;
            }
        }
        validate_unique("targets.name", self.targets.iter().map(|t| t.name.as_str()))?;

        validate_path("output_path", &self.output_path.to_string_lossy())?;
        validate_positive_number("concurrent_requests", self.concurrency, 1)?;
        validate_range(
            "request_timeout_seconds",
            self.request_timeout.as_secs(),
            1,
            3600,
        )?;
        validate_url("probe_url", &self.probe_url)?;

        for folder in &self.skip_folders {
            validate_non_empty_string("skip_folders", folder)?;
        }

        if let Some(credential) = &self.credential {
            validate_non_empty_string("username", &credential.username)?;
        }

        Ok(())
    }
}
