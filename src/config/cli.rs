use crate::domain::model::MirrorTarget;
use crate::domain::ports::ConfigProvider;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Parser)]
#[command(name = "config-mirror")]
#[command(about = "Mirror every job's config.xml from a folder tree into a local directory")]
pub struct CliConfig {
    /// Folder or view to start from, e.g. https://ci.example.net/job/project/
    #[arg(long)]
    pub root_url: String,

    #[arg(long, default_value = "./output")]
    pub output_path: String,

    #[arg(long, help = "Username the API token belongs to")]
    pub username: Option<String>,

    #[arg(long, help = "API token, or path to a file containing it")]
    pub api_token: Option<String>,

    #[arg(long, help = "Parallel downloads [default: number of CPUs]")]
    pub concurrent_requests: Option<usize>,

    #[arg(long, value_delimiter = ',', help = "Folder names not to descend into")]
    pub skip_folders: Vec<String>,

    #[arg(long, default_value = "60", help = "Per-request timeout in seconds")]
    pub request_timeout: u64,

    #[arg(long, help = "URL used to check credentials [default: <server>/configure]")]
    pub probe_url: Option<String>,

    #[arg(long, help = "Write a JSON run report to this path")]
    pub report: Option<PathBuf>,

    #[arg(long, help = "List the jobs that would be downloaded, then stop")]
    pub dry_run: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub log_json: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl ConfigProvider for CliConfig {
    fn targets(&self) -> Vec<MirrorTarget> {
        vec![MirrorTarget {
            name: "default".to_string(),
            root_url: self.root_url.clone(),
            output_subdir: None,
        }]
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn concurrent_requests(&self) -> Option<usize> {
        self.concurrent_requests
    }

    fn skip_folders(&self) -> &[String] {
        &self.skip_folders
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    fn probe_url(&self) -> Option<&str> {
        self.probe_url.as_deref()
    }

    fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    fn api_token(&self) -> Option<&str> {
        self.api_token.as_deref()
    }
}
