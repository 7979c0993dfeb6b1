use crate::domain::model::{join_url, DiscoveryResult, JobListing, LeafDescriptor, TreeNode};
use crate::domain::ports::Fetcher;
use crate::utils::error::{DiscoveryError, FetchError};
use std::collections::HashSet;

const LISTING_SUFFIX: &str = "api/json";

/// Walks the folder tree depth-first, pre-order, one request at a time.
#[derive(Debug, Clone, Default)]
pub struct TreeDiscoverer {
    skip_folders: HashSet<String>,
}

/// Listing endpoint for a node URL; URLs already pointing at it are kept.
pub fn listing_url(url: &str) -> String {
    if url.trim_end_matches('/').ends_with(LISTING_SUFFIX) {
        url.to_string()
    } else {
        join_url(url, LISTING_SUFFIX)
    }
}

async fn fetch_listing<F: Fetcher + ?Sized>(
    fetcher: &F,
    url: &str,
) -> Result<Vec<TreeNode>, DiscoveryError> {
    let upstream = |source| DiscoveryError::Upstream {
        url: url.to_string(),
        source,
    };

    let body = fetcher.get(url).await.map_err(upstream)?;
    let listing: JobListing = serde_json::from_slice(&body).map_err(|source| {
        upstream(FetchError::Decode {
            url: url.to_string(),
            source,
        })
    })?;

    Ok(listing.jobs.into_iter().map(TreeNode::from).collect())
}

impl TreeDiscoverer {
    pub fn new<I, S>(skip_folders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            skip_folders: skip_folders.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_skipped(&self, folder_name: &str) -> bool {
        self.skip_folders.contains(folder_name)
    }

    /// Expands `root_url` into every job beneath it.
    ///
    /// Any failed or malformed listing aborts the whole walk; a partial tree
    /// is never returned.
    pub async fn discover<F: Fetcher + ?Sized>(
        &self,
        root_url: &str,
        fetcher: &F,
    ) -> Result<DiscoveryResult, DiscoveryError> {
        let root_listing = listing_url(root_url);
        tracing::info!("🔎 Discovering jobs under {}", root_url);

        let mut visited = HashSet::from([root_listing.clone()]);
        let mut leaves = Vec::new();
        let mut stack = vec![fetch_listing(fetcher, &root_listing).await?.into_iter()];

        while let Some(siblings) = stack.last_mut() {
            let Some(node) = siblings.next() else {
                stack.pop();
                continue;
            };

            match node {
                TreeNode::Job { name, url } => {
                    tracing::debug!("Found job {}", name);
                    leaves.push(LeafDescriptor::new(name, url));
                }
                TreeNode::Folder { name, url } => {
                    if self.is_skipped(&name) {
                        tracing::info!("Skipping folder {}", name);
                        continue;
                    }

                    let listing = listing_url(&url);
                    if !visited.insert(listing.clone()) {
                        tracing::warn!("Folder {} at {} was already expanded", name, url);
                        continue;
                    }

                    tracing::debug!("Expanding folder {}", name);
                    let children = fetch_listing(fetcher, &listing).await?;
                    stack.push(children.into_iter());
                }
            }
        }

        tracing::info!("Discovered {} jobs under {}", leaves.len(), root_url);
        Ok(DiscoveryResult::new(leaves))
    }
}
