use clap::Parser;
use config_mirror::core::engine::report_outcome;
use config_mirror::utils::logger;
use config_mirror::{MirrorEngine, MirrorSettings, TomlConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "toml-mirror")]
#[command(about = "Mirror job configs for the targets listed in a TOML file")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "mirror.toml")]
    config: PathBuf,

    /// Only mirror these targets (repeatable)
    #[arg(long)]
    only: Vec<String>,

    /// Write a JSON run report to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Discover jobs and list them without downloading
    #[arg(long)]
    dry_run: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    logger::init_logger(args.verbose, args.log_json);

    tracing::info!("🚀 Starting TOML-based config mirror");
    tracing::info!("📁 Loading configuration from: {}", args.config.display());

    let mut config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "❌ Failed to load config file '{}': {}",
                args.config.display(),
                e
            );
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(e.exit_code());
        }
    };

    let settings = match config
        .retain_targets(&args.only)
        .and_then(|_| MirrorSettings::from_provider(&config))
    {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(e.exit_code());
        }
    };

    tracing::info!("✅ Configuration loaded and validated successfully");
    display_config_summary(&settings);

    let engine = MirrorEngine::new(settings);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - nothing will be downloaded");
        match engine.plan().await {
            Ok(plan) => {
                for (target, leaves) in &plan {
                    println!("[{}] {} jobs", target.name, leaves.len());
                    for leaf in leaves.leaves() {
                        println!("  {}", leaf.name);
                    }
                }
            }
            Err(e) => {
                eprintln!("❌ {}", e.user_friendly_message());
                std::process::exit(e.exit_code());
            }
        }
        return;
    }

    let code = report_outcome(engine.run().await, args.report.as_deref());
    std::process::exit(code);
}

fn display_config_summary(settings: &MirrorSettings) {
    tracing::info!("📋 Configuration Summary:");
    for target in &settings.targets {
        tracing::info!(
            "  🎯 {}: {} -> {}",
            target.name,
            target.root_url,
            target.output_dir(&settings.output_path).display()
        );
    }
    tracing::info!("  ⚡ Concurrent requests: {}", settings.concurrency);
    tracing::info!("  ⏱️ Request timeout: {:?}", settings.request_timeout);
    if !settings.skip_folders.is_empty() {
        tracing::info!("  🚫 Skipped folders: {}", settings.skip_folders.join(", "));
    }
    tracing::info!(
        "  🔑 Credentials: {}",
        match &settings.credential {
            Some(credential) => credential.username.as_str(),
            None => "anonymous",
        }
    );
}
