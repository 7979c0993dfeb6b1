use crate::adapters::{AuthenticatingClient, ClientOptions, LocalConfigStore};
use crate::config::settings::MirrorSettings;
use crate::core::discovery::TreeDiscoverer;
use crate::core::dispatch::DownloadDispatcher;
use crate::domain::model::{DiscoveryResult, MirrorTarget, RunSummary, TargetReport};
use crate::utils::error::Result;
use std::path::Path;
use std::sync::Arc;

/// Authenticates once, then discovers and mirrors each target in turn.
pub struct MirrorEngine {
    settings: MirrorSettings,
    client_options: ClientOptions,
}

impl MirrorEngine {
    pub fn new(settings: MirrorSettings) -> Self {
        let client_options = ClientOptions {
            request_timeout: settings.request_timeout,
            ..ClientOptions::default()
        };
        Self {
            settings,
            client_options,
        }
    }

    async fn connect(&self) -> Result<AuthenticatingClient> {
        let mut client = AuthenticatingClient::new(self.client_options.clone())?;

        match &self.settings.credential {
            Some(credential) => {
                client
                    .authenticate(credential.clone(), &self.settings.probe_url)
                    .await?
            }
            None => tracing::warn!("No credentials configured, requests will be anonymous"),
        }

        Ok(client)
    }

    fn discoverer(&self) -> TreeDiscoverer {
        TreeDiscoverer::new(self.settings.skip_folders.iter().cloned())
    }

    /// Discovery only: the leaves each target would download.
    pub async fn plan(&self) -> Result<Vec<(MirrorTarget, DiscoveryResult)>> {
        let client = self.connect().await?;
        let discoverer = self.discoverer();

        let mut plan = Vec::with_capacity(self.settings.targets.len());
        for target in &self.settings.targets {
            let leaves = discoverer.discover(&target.root_url, &client).await?;
            plan.push((target.clone(), leaves));
        }
        Ok(plan)
    }

    pub async fn run(&self) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        match self.run_into(&mut summary).await {
            Ok(()) => Ok(summary),
            Err(e) => {
                if !summary.targets.is_empty() {
                    tracing::error!(
                        "Run aborted after {} of {} targets; results so far:",
                        summary.targets.len(),
                        self.settings.targets.len()
                    );
                    print_targets(&summary);
                }
                Err(e)
            }
        }
    }

    /// Mirrors each target, appending its report to `summary` as soon as it
    /// finishes. On a fatal error the reports of earlier targets stay in
    /// `summary`.
    pub async fn run_into(&self, summary: &mut RunSummary) -> Result<()> {
        let client = Arc::new(self.connect().await?);
        let discoverer = self.discoverer();
        let dispatcher = DownloadDispatcher::new(self.settings.concurrency);

        for target in &self.settings.targets {
            let output_dir = target.output_dir(&self.settings.output_path);
            tracing::info!("🎯 Target '{}' -> {}", target.name, output_dir.display());
            let store = Arc::new(LocalConfigStore::create(&output_dir)?);

            let leaves = discoverer.discover(&target.root_url, &*client).await?;

            let duplicates = leaves.duplicate_names();
            if !duplicates.is_empty() {
                tracing::warn!(
                    "{} job names occur more than once and share one output file: {}",
                    duplicates.len(),
                    duplicates.join(", ")
                );
            }

            let discovered = leaves.len();
            let report = dispatcher.run(leaves, Arc::clone(&client), store).await;

            summary.targets.push(TargetReport {
                target: target.name.clone(),
                output_dir,
                discovered,
                report,
            });
        }

        Ok(())
    }
}

/// Per-target counts on stdout, individual failures on stderr.
fn print_targets(summary: &RunSummary) {
    for target in &summary.targets {
        println!(
            "📁 {}: {} jobs, {} downloaded, {} skipped, {} failed ({})",
            target.target,
            target.discovered,
            target.report.succeeded,
            target.report.skipped,
            target.report.failed.len(),
            target.output_dir.display()
        );
    }
    for (target, failure) in summary.failures() {
        eprintln!("  [{}] {}: {}", target, failure.name, failure.cause);
    }
}

/// Prints the outcome of a run, writes the JSON report if asked to, and
/// returns the process exit code.
pub fn report_outcome(outcome: Result<RunSummary>, report_path: Option<&Path>) -> i32 {
    let summary = match outcome {
        Ok(summary) => summary,
        Err(e) => {
            tracing::error!(
                "❌ Mirror failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            return e.exit_code();
        }
    };

    print_targets(&summary);

    if let Some(path) = report_path {
        let written = summary
            .to_json()
            .and_then(|json| std::fs::write(path, json).map_err(Into::into));
        match written {
            Ok(()) => tracing::info!("Report written to {}", path.display()),
            Err(e) => tracing::error!("Could not write report to {}: {}", path.display(), e),
        }
    }

    if summary.is_success() {
        println!("✅ All configs mirrored");
        return 0;
    }

    eprintln!("❌ Some configs could not be mirrored");
    1
}
