use clap::Parser;
use config_mirror::core::engine::report_outcome;
use config_mirror::utils::logger;
use config_mirror::{CliConfig, MirrorEngine, MirrorSettings};

#[tokio::main]
async fn main() {
    let config = CliConfig::parse();

    logger::init_logger(config.verbose, config.log_json);
    tracing::info!("Starting config-mirror");

    let settings = match MirrorSettings::from_provider(&config) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(e.exit_code());
        }
    };
    if config.verbose {
        tracing::debug!("Settings: {:?}", settings);
    }

    let engine = MirrorEngine::new(settings);

    if config.dry_run {
        tracing::info!("🔍 DRY RUN MODE - nothing will be downloaded");
        let code = match engine.plan().await {
            Ok(plan) => {
                for (_, leaves) in &plan {
                    for leaf in leaves.leaves() {
                        println!("{}\t{}", leaf.name, leaf.config_url());
                    }
                }
                0
            }
            Err(e) => {
                eprintln!("❌ {}", e.user_friendly_message());
                e.exit_code()
            }
        };
        std::process::exit(code);
    }

    let code = report_outcome(engine.run().await, config.report.as_deref());
    std::process::exit(code);
}
