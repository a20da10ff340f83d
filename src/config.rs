use std::path::Path;

use serde::Deserialize;

use crate::cli::Cli;
use crate::error::{Error, Result};

pub const DEFAULT_COMMENT_TEMPLATE: &str = include_str!("default_comment_template.md");

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub target_labels: Option<Vec<String>>,
    pub exclude_labels: Option<Vec<String>>,
    pub max_issue_age_days: Option<i64>,
    pub min_comment_interval_hours: Option<i64>,
    pub max_issues_per_run: Option<u32>,
    pub max_comments_per_run: Option<u32>,
    pub repos_file: Option<String>,
    pub comment_template: Option<String>,
    pub ai: Option<AiConfigFile>,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AiConfigFile {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub target_labels: Vec<String>,
    pub exclude_labels: Vec<String>,
    pub max_issue_age_days: i64,
    pub min_comment_interval_hours: i64,
    pub max_issues_per_run: u32,
    pub max_comments_per_run: u32,
    pub repos_file: String,
    pub comment_template: String,
    pub ai: AiConfig,
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AiConfig {
    pub provider: String,
    pub model: String,
    pub temperature: f64,
}

impl Config {
    pub fn load(cli: &Cli) -> Result<Self> {
        let config_path = Path::new(&cli.config);
        let file_config = if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            parse_config(&content)?
        } else {
            return Err(Error::ConfigNotFound(config_path.to_path_buf()));
        };

        Ok(merge(file_config, cli))
    }
}

pub fn parse_config(content: &str) -> Result<ConfigFile> {
    let config: ConfigFile = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &ConfigFile) -> Result<()> {
    if let Some(ref labels) = config.target_labels
        && labels.is_empty()
    {
        return Err(Error::ConfigValidation(
            "target_labels must not be empty".to_string(),
        ));
    }
    if let Some(days) = config.max_issue_age_days
        && days <= 0
    {
        return Err(Error::ConfigValidation(
            "max_issue_age_days must be > 0".to_string(),
        ));
    }
    if let Some(hours) = config.min_comment_interval_hours
        && hours <= 0
    {
        return Err(Error::ConfigValidation(
            "min_comment_interval_hours must be > 0".to_string(),
        ));
    }
    if let Some(max) = config.max_issues_per_run
        && max == 0
    {
        return Err(Error::ConfigValidation(
            "max_issues_per_run must be > 0".to_string(),
        ));
    }
    if let Some(max) = config.max_comments_per_run
        && max == 0
    {
        return Err(Error::ConfigValidation(
            "max_comments_per_run must be > 0".to_string(),
        ));
    }
    if let Some(ref ai) = config.ai
        && let Some(ref provider) = ai.provider
    {
        match provider.as_str() {
            "openai" | "azure" | "anthropic" => {}
            other => {
                return Err(Error::ConfigValidation(format!(
                    "unknown ai provider: {other} (expected: openai, azure, anthropic)"
                )));
            }
        }
    }
    Ok(())
}

pub fn merge(file: ConfigFile, cli: &Cli) -> Config {
    let ai = file.ai.unwrap_or_default();
    Config {
        target_labels: file.target_labels.unwrap_or_else(|| {
            vec!["good first issue".to_string(), "help wanted".to_string()]
        }),
        exclude_labels: file.exclude_labels.unwrap_or_default(),
        max_issue_age_days: file.max_issue_age_days.unwrap_or(90),
        min_comment_interval_hours: file.min_comment_interval_hours.unwrap_or(168),
        max_issues_per_run: cli.max_issues.or(file.max_issues_per_run).unwrap_or(10),
        max_comments_per_run: file.max_comments_per_run.unwrap_or(10),
        repos_file: cli
            .repos
            .clone()
            .or(file.repos_file)
            .unwrap_or_else(|| "repos.txt".to_string()),
        comment_template: file
            .comment_template
            .unwrap_or_else(|| DEFAULT_COMMENT_TEMPLATE.to_string()),
        ai: AiConfig {
            provider: ai.provider.unwrap_or_else(|| "openai".to_string()),
            model: ai.model.unwrap_or_else(|| "gpt-4-turbo-preview".to_string()),
            temperature: ai.temperature.unwrap_or(0.7),
        },
        dry_run: cli.dry_run,
    }
}
