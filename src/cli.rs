use clap::Parser;

/// scout — find approachable issues across GitHub repositories
#[derive(Parser, Debug, Clone)]
#[command(name = "scout", version, about)]
pub struct Cli {
    /// Analyze issues but do not post any comments
    #[arg(long)]
    pub dry_run: bool,

    /// Maximum number of issues to analyze this run
    #[arg(long = "max-issues", value_parser = clap::value_parser!(u32).range(1..))]
    pub max_issues: Option<u32>,

    /// Enable debug-level logging
    #[arg(long, short)]
    pub verbose: bool,

    /// Path to config file
    #[arg(long, default_value = "scout.toml")]
    pub config: String,

    /// Path to the repository list, one reference per line
    #[arg(long)]
    pub repos: Option<String>,
}
