use crate::utils::error::{LeafError, MirrorError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// `_class` substring that marks a node as a folder.
pub const FOLDER_CLASS_MARKER: &str = "Folder";

/// Username and API token used to answer the server's auth challenge.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub username: String,
    pub secret: String,
}

impl Credential {
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: secret.into(),
        }
    }

    /// Builds a credential whose secret is either `token` itself or, when
    /// `token` names an existing file, that file's trimmed contents.
    pub fn resolve(username: &str, token: &str) -> Result<Self> {
        let path = Path::new(token);
        let secret = if path.is_file() {
            tracing::debug!("Reading API token from {}", path.display());
            std::fs::read_to_string(path)?.trim().to_string()
        } else {
            token.to_string()
        };

        if secret.is_empty() {
            return Err(MirrorError::InvalidConfigValue {
                field: "api_token".to_string(),
                value: token.to_string(),
                reason: "API token is empty".to_string(),
            });
        }

        Ok(Self::new(username, secret))
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// One entry of a `jobs` listing as the server returns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawNode {
    #[serde(rename = "_class", default)]
    pub class: String,
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobListing {
    pub jobs: Vec<RawNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeNode {
    Folder { name: String, url: String },
    Job { name: String, url: String },
}

impl From<RawNode> for TreeNode {
    fn from(raw: RawNode) -> Self {
        if raw.class.contains(FOLDER_CLASS_MARKER) {
            TreeNode::Folder {
                name: raw.name,
                url: raw.url,
            }
        } else {
            TreeNode::Job {
                name: raw.name,
                url: raw.url,
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeafDescriptor {
    pub name: String,
    pub source_url: String,
}

impl LeafDescriptor {
    pub fn new(name: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source_url: source_url.into(),
        }
    }

    pub fn config_url(&self) -> String {
        join_url(&self.source_url, "config.xml")
    }
}

/// Appends `suffix` to `base`, inserting a `/` when `base` lacks one.
pub fn join_url(base: &str, suffix: &str) -> String {
    if base.ends_with('/') {
        format!("{}{}", base, suffix)
    } else {
        format!("{}/{}", base, suffix)
    }
}

/// Leaves in traversal order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryResult {
    leaves: Vec<LeafDescriptor>,
}

impl DiscoveryResult {
    pub fn new(leaves: Vec<LeafDescriptor>) -> Self {
        Self { leaves }
    }

    pub fn leaves(&self) -> &[LeafDescriptor] {
        &self.leaves
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.leaves.iter().map(|l| l.name.as_str()).collect()
    }

    /// Names shared by more than one leaf, in order of first appearance.
    pub fn duplicate_names(&self) -> Vec<String> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for leaf in &self.leaves {
            *counts.entry(leaf.name.as_str()).or_default() += 1;
        }

        let mut duplicates = Vec::new();
        for leaf in &self.leaves {
            if counts.get(leaf.name.as_str()).copied().unwrap_or(0) > 1
                && !duplicates.contains(&leaf.name)
            {
                duplicates.push(leaf.name.clone());
            }
        }
        duplicates
    }
}

impl IntoIterator for DiscoveryResult {
    type Item = LeafDescriptor;
    type IntoIter = std::vec::IntoIter<LeafDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.leaves.into_iter()
    }
}

fn serialize_display<T: fmt::Display, S: Serializer>(
    value: &T,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

#[derive(Debug, Serialize)]
pub struct LeafFailure {
    pub name: String,
    pub url: String,
    #[serde(serialize_with = "serialize_display")]
    pub cause: LeafError,
}

#[derive(Debug, Serialize)]
pub struct DispatchReport {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: Vec<LeafFailure>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl DispatchReport {
    pub fn empty() -> Self {
        let now = Utc::now();
        Self {
            succeeded: 0,
            skipped: 0,
            failed: Vec::new(),
            started_at: now,
            finished_at: now,
        }
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.skipped + self.failed.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failed_names(&self) -> Vec<&str> {
        self.failed.iter().map(|f| f.name.as_str()).collect()
    }
}

/// A root to mirror and the subdirectory of the output path it lands in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorTarget {
    pub name: String,
    pub root_url: String,
    #[serde(default)]
    pub output_subdir: Option<String>,
}

impl MirrorTarget {
    pub fn output_dir(&self, output_path: &Path) -> PathBuf {
        match &self.output_subdir {
            Some(subdir) => output_path.join(subdir),
            None => output_path.to_path_buf(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TargetReport {
    pub target: String,
    pub output_dir: PathBuf,
    pub discovered: usize,
    pub report: DispatchReport,
}

#[derive(Debug, Default, Serialize)]
pub struct RunSummary {
    pub targets: Vec<TargetReport>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.targets.iter().all(|t| t.report.is_success())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &LeafFailure)> {
        self.targets
            .iter()
            .flat_map(|t| t.report.failed.iter().map(move |f| (t.target.as_str(), f)))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
