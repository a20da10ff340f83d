use std::path::Path;

use clap::Parser;
use tracing::info;

use scout::activity::ActivityLog;
use scout::analyzer::build_provider;
use scout::cli::Cli;
use scout::config::Config;
use scout::github::GitHubClient;
use scout::orchestrator::Orchestrator;
use scout::targets::load_references;

const ACTIVITY_DIR: &str = "logs";

fn init_logging(verbose: bool) {
    let default_directive = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    info!("scout starting");

    let config = match Config::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    info!(?config, "config loaded");

    let token = match std::env::var("GITHUB_TOKEN") {
        Ok(token) if !token.is_empty() => token,
        _ => {
            eprintln!("error: GITHUB_TOKEN is not set");
            std::process::exit(1);
        }
    };

    let references = match load_references(Path::new(&config.repos_file)) {
        Ok(refs) => refs,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    let provider = match build_provider(&config.ai) {
        Ok(provider) => provider,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    let client = GitHubClient::new(&token);
    let bot_login = match client.viewer_login() {
        Ok(login) => login,
        Err(e) => {
            eprintln!("error: could not verify GitHub credentials: {e}");
            std::process::exit(1);
        }
    };
    info!(bot_login, "authenticated");

    let orchestrator = Orchestrator::new(
        client,
        provider,
        config,
        ActivityLog::new(ACTIVITY_DIR),
        bot_login,
    );

    match orchestrator.run(&references) {
        Ok(summary) => {
            let comment_verb = if summary.dry_run {
                "would post"
            } else {
                "posted"
            };
            info!(
                repositories = summary.repositories_scanned,
                issues_found = summary.issues_found,
                issues_analyzed = summary.issues_analyzed,
                "run complete, {comment_verb} {} comments",
                summary.comments_posted
            );
        }
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}
