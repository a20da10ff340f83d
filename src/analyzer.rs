use serde::Deserialize;
use tracing::{debug, info};

use crate::config::AiConfig;
use crate::error::{Error, Result};
use crate::issues::IssueContext;

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_COMPLETION_TOKENS: u32 = 2000;

const MAX_PROMPT_BODY_CHARS: usize = 2000;
const MAX_PROMPT_COMMENT_CHARS: usize = 500;
const MAX_PROMPT_COMMENTS: usize = 3;
const DEGRADED_PROBLEM_CHARS: usize = 500;

const SYSTEM_PROMPT: &str = "You are an expert software engineer and open-source contributor. \
You analyze GitHub issues and provide clear, actionable solutions.";

/// Structured result of one issue analysis. Missing fields in the service
/// reply become empty values, never absence.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub problem_statement: String,
    pub proposed_solution: String,
    pub steps: Vec<String>,
}

/// Capability interface over the analysis service: prompt in, raw text out.
pub trait AnalysisProvider {
    fn analyze(&self, prompt: &str) -> Result<String>;
}

// --- Concrete providers ---

#[derive(Debug)]
pub struct OpenAiProvider {
    api_key: String,
    model: String,
    temperature: f64,
}

impl AnalysisProvider for OpenAiProvider {
    fn analyze(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt },
            ],
            "temperature": self.temperature,
            "max_tokens": MAX_COMPLETION_TOKENS,
            "response_format": { "type": "json_object" },
        });

        let response = ureq::post(OPENAI_API_URL)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .send_json(&body)
            .map_err(|e| Error::Remote(format!("OpenAI request failed: {e}")))?;

        extract_chat_content(response)
    }
}

#[derive(Debug)]
pub struct AzureProvider {
    api_key: String,
    endpoint: String,
    api_version: String,
    deployment: String,
    temperature: f64,
}

impl AnalysisProvider for AzureProvider {
    fn analyze(&self, prompt: &str) -> Result<String> {
        let url = format!(
            "{}/openai/deployments/{}/chat/completions",
            self.endpoint.trim_end_matches('/'),
            self.deployment
        );
        let body = serde_json::json!({
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt },
            ],
            "temperature": self.temperature,
            "max_tokens": MAX_COMPLETION_TOKENS,
            "response_format": { "type": "json_object" },
        });

        let response = ureq::post(&url)
            .query("api-version", &self.api_version)
            .set("api-key", &self.api_key)
            .send_json(&body)
            .map_err(|e| Error::Remote(format!("Azure OpenAI request failed: {e}")))?;

        extract_chat_content(response)
    }
}

#[derive(Debug)]
pub struct AnthropicProvider {
    api_key: String,
    model: String,
    temperature: f64,
}

impl AnalysisProvider for AnthropicProvider {
    fn analyze(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": MAX_COMPLETION_TOKENS,
            "temperature": self.temperature,
            "messages": [ { "role": "user", "content": prompt } ],
        });

        let response = ureq::post(ANTHROPIC_API_URL)
            .set("x-api-key", &self.api_key)
            .set("anthropic-version", ANTHROPIC_VERSION)
            .send_json(&body)
            .map_err(|e| Error::Remote(format!("Anthropic request failed: {e}")))?;

        let json: serde_json::Value = response
            .into_json()
            .map_err(|e| Error::Remote(format!("invalid JSON from Anthropic: {e}")))?;

        json.pointer("/content/0/text")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| Error::Remote("Anthropic response missing content".to_string()))
    }
}

fn extract_chat_content(response: ureq::Response) -> Result<String> {
    let json: serde_json::Value = response
        .into_json()
        .map_err(|e| Error::Remote(format!("invalid JSON from analysis service: {e}")))?;

    json.pointer("/choices/0/message/content")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| Error::Remote("chat response missing message content".to_string()))
}

/// One concrete provider selected at construction time; the pipeline never
/// branches on the provider again.
#[derive(Debug)]
pub enum AnyProvider {
    OpenAi(OpenAiProvider),
    Azure(AzureProvider),
    Anthropic(AnthropicProvider),
}

impl AnalysisProvider for AnyProvider {
    fn analyze(&self, prompt: &str) -> Result<String> {
        match self {
            AnyProvider::OpenAi(p) => p.analyze(prompt),
            AnyProvider::Azure(p) => p.analyze(prompt),
            AnyProvider::Anthropic(p) => p.analyze(prompt),
        }
    }
}

fn require_env(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| Error::ConfigValidation(format!("{name} not set in environment")))
}

/// Build the configured provider, pulling API credentials from the
/// environment. Missing credentials are a startup failure.
pub fn build_provider(ai: &AiConfig) -> Result<AnyProvider> {
    match ai.provider.as_str() {
        "openai" => {
            info!(model = ai.model, "using OpenAI analysis provider");
            Ok(AnyProvider::OpenAi(OpenAiProvider {
                api_key: require_env("OPENAI_API_KEY")?,
                model: ai.model.clone(),
                temperature: ai.temperature,
            }))
        }
        "azure" => {
            let deployment = std::env::var("AZURE_OPENAI_DEPLOYMENT_NAME")
                .unwrap_or_else(|_| ai.model.clone());
            info!(deployment, "using Azure OpenAI analysis provider");
            Ok(AnyProvider::Azure(AzureProvider {
                api_key: require_env("AZURE_OPENAI_API_KEY")?,
                endpoint: require_env("AZURE_OPENAI_ENDPOINT")?,
                api_version: std::env::var("AZURE_OPENAI_API_VERSION")
                    .unwrap_or_else(|_| "2024-02-01".to_string()),
                deployment,
                temperature: ai.temperature,
            }))
        }
        "anthropic" => {
            info!(model = ai.model, "using Anthropic analysis provider");
            Ok(AnyProvider::Anthropic(AnthropicProvider {
                api_key: require_env("ANTHROPIC_API_KEY")?,
                model: ai.model.clone(),
                temperature: ai.temperature,
            }))
        }
        other => Err(Error::ConfigValidation(format!(
            "unknown ai provider: {other} (expected: openai, azure, anthropic)"
        ))),
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Build the analysis prompt from an issue context: title, labels,
/// truncated body, and up to the 3 most recent comments.
pub fn build_prompt(ctx: &IssueContext) -> String {
    let issue = &ctx.issue;
    let labels = issue.labels.join(", ");
    let body = truncate_chars(&issue.body, MAX_PROMPT_BODY_CHARS);

    let mut comments_text = String::new();
    let recent = &ctx.recent_comments;
    let start = recent.len().saturating_sub(MAX_PROMPT_COMMENTS);
    if !recent[start..].is_empty() {
        comments_text.push_str("\n\n## Recent Comments:\n");
        for (i, comment) in recent[start..].iter().enumerate() {
            comments_text.push_str(&format!(
                "\n**Comment {} by {}:**\n{}\n",
                i + 1,
                comment.author,
                truncate_chars(&comment.body, MAX_PROMPT_COMMENT_CHARS)
            ));
        }
    }

    format!(
        "You are an experienced open-source contributor analyzing a GitHub issue to provide a helpful solution.\n\
        \n\
        ## Issue Details:\n\
        **Title:** {title}\n\
        \n\
        **Labels:** {labels}\n\
        \n\
        **Description:**\n\
        {body}\n\
        {comments_text}\n\
        ## Your Task:\n\
        Analyze this issue and provide a structured response with:\n\
        \n\
        1. **Problem Analysis**: Clearly explain what the issue is asking for (2-3 sentences)\n\
        2. **Proposed Solution**: Describe your recommended approach to solve this (3-4 sentences)\n\
        3. **Implementation Steps**: List 3-5 concrete steps to implement the solution\n\
        \n\
        ## Important Guidelines:\n\
        - Be specific and actionable\n\
        - Reference relevant parts of the issue description\n\
        - Keep it concise but helpful\n\
        - Show enthusiasm and professionalism\n\
        - If the issue is unclear, mention what clarification would be helpful\n\
        \n\
        Please format your response as JSON with keys: \"analysis\", \"solution\", and \"steps\" (array of strings).\n",
        title = issue.title,
    )
}

#[derive(Debug, Deserialize)]
struct RawAnalysis {
    #[serde(default)]
    analysis: String,
    #[serde(default)]
    solution: String,
    #[serde(default)]
    steps: Vec<String>,
}

/// Parse the service reply into an `Analysis`. Malformed output degrades
/// instead of failing: the raw text becomes the problem statement and the
/// remaining fields get generic placeholders.
pub fn parse_analysis(raw: &str) -> Analysis {
    match serde_json::from_str::<RawAnalysis>(raw) {
        Ok(parsed) => Analysis {
            problem_statement: parsed.analysis,
            proposed_solution: parsed.solution,
            steps: parsed.steps,
        },
        Err(e) => {
            debug!(error = %e, "analysis reply not parseable as JSON, degrading");
            Analysis {
                problem_statement: truncate_chars(raw, DEGRADED_PROBLEM_CHARS),
                proposed_solution: "See full analysis above".to_string(),
                steps: vec![
                    "Review the issue details".to_string(),
                    "Implement the suggested approach".to_string(),
                    "Test thoroughly".to_string(),
                ],
            }
        }
    }
}

/// Run one analysis round trip for an issue. A failing service call is an
/// `Analysis` error; the caller skips the issue without retrying.
pub fn analyze_issue<P: AnalysisProvider>(provider: &P, ctx: &IssueContext) -> Result<Analysis> {
    let prompt = build_prompt(ctx);
    let raw = provider
        .analyze(&prompt)
        .map_err(|e| Error::Analysis(e.to_string()))?;
    Ok(parse_analysis(&raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issues::{IssueComment, IssueRecord, RepositoryTarget};
    use chrono::{TimeZone, Utc};
    use serial_test::serial;

    fn ctx_with_comments(comment_count: usize) -> IssueContext {
        let comments: Vec<IssueComment> = (0..comment_count)
            .map(|i| IssueComment {
                author: format!("user{i}"),
                body: format!("comment number {i}"),
                created_at: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
            })
            .collect();
        IssueContext::new(
            IssueRecord {
                target: RepositoryTarget::new("owner", "repo"),
                number: 1,
                title: "Fix the parser".to_string(),
                body: "b".repeat(3000),
                labels: vec!["good first issue".to_string(), "bug".to_string()],
                created_at: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
                comment_count: comment_count as u32,
                assignees: vec![],
                is_pull_request: false,
                url: String::new(),
            },
            comments,
        )
    }

    struct ScriptedProvider {
        reply: Result<String>,
    }

    impl AnalysisProvider for ScriptedProvider {
        fn analyze(&self, _prompt: &str) -> Result<String> {
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(Error::Remote(e.to_string())),
            }
        }
    }

    #[test]
    fn test_prompt_contains_title_and_labels() {
        let prompt = build_prompt(&ctx_with_comments(0));
        assert!(prompt.contains("**Title:** Fix the parser"));
        assert!(prompt.contains("**Labels:** good first issue, bug"));
        assert!(!prompt.contains("Recent Comments"));
    }

    #[test]
    fn test_prompt_truncates_body() {
        let prompt = build_prompt(&ctx_with_comments(0));
        assert!(prompt.contains(&"b".repeat(2000)));
        assert!(!prompt.contains(&"b".repeat(2001)));
    }

    #[test]
    fn test_prompt_limits_to_three_most_recent_comments() {
        let prompt = build_prompt(&ctx_with_comments(5));
        // Context keeps the last 5, the prompt the last 3 of those.
        assert!(!prompt.contains("comment number 1"));
        assert!(prompt.contains("comment number 2"));
        assert!(prompt.contains("comment number 4"));
    }

    #[test]
    fn test_parse_well_formed_reply() {
        let raw = serde_json::json!({
            "analysis": "The parser drops escapes.",
            "solution": "Handle the escape state.",
            "steps": ["Add a state flag", "Cover with tests"]
        })
        .to_string();
        let analysis = parse_analysis(&raw);
        assert_eq!(analysis.problem_statement, "The parser drops escapes.");
        assert_eq!(analysis.steps.len(), 2);
    }

    #[test]
    fn test_parse_missing_keys_default_to_empty() {
        let analysis = parse_analysis(r#"{"analysis": "only this"}"#);
        assert_eq!(analysis.problem_statement, "only this");
        assert_eq!(analysis.proposed_solution, "");
        assert!(analysis.steps.is_empty());
    }

    #[test]
    fn test_parse_malformed_reply_degrades() {
        let raw = "Sure! Here is my take on the issue: ".repeat(30);
        let analysis = parse_analysis(&raw);
        assert_eq!(
            analysis.problem_statement,
            raw.chars().take(500).collect::<String>()
        );
        assert_eq!(analysis.proposed_solution, "See full analysis above");
        assert_eq!(analysis.steps.len(), 3);
    }

    #[test]
    fn test_analyze_issue_maps_provider_failure() {
        let provider = ScriptedProvider {
            reply: Err(Error::Remote("401 unauthorized".to_string())),
        };
        let err = analyze_issue(&provider, &ctx_with_comments(0)).unwrap_err();
        assert!(matches!(err, Error::Analysis(_)));
    }

    #[test]
    fn test_analyze_issue_returns_parsed_analysis() {
        let provider = ScriptedProvider {
            reply: Ok(r#"{"analysis": "a", "solution": "s", "steps": ["1"]}"#.to_string()),
        };
        let analysis = analyze_issue(&provider, &ctx_with_comments(0)).unwrap();
        assert_eq!(analysis.proposed_solution, "s");
    }

    fn ai_config(provider: &str) -> AiConfig {
        AiConfig {
            provider: provider.to_string(),
            model: "gpt-4-turbo-preview".to_string(),
            temperature: 0.7,
        }
    }

    #[test]
    #[serial]
    fn test_build_provider_unknown_is_config_error() {
        let err = build_provider(&ai_config("bard")).unwrap_err();
        assert!(err.to_string().contains("unknown ai provider"));
    }

    #[test]
    #[serial]
    fn test_build_provider_requires_api_key() {
        unsafe { std::env::remove_var("OPENAI_API_KEY") };
        let err = build_provider(&ai_config("openai")).unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    #[serial]
    fn test_build_provider_openai() {
        unsafe { std::env::set_var("OPENAI_API_KEY", "sk-test") };
        let provider = build_provider(&ai_config("openai")).unwrap();
        assert!(matches!(provider, AnyProvider::OpenAi(_)));
        unsafe { std::env::remove_var("OPENAI_API_KEY") };
    }

    #[test]
    #[serial]
    fn test_build_provider_anthropic() {
        unsafe { std::env::set_var("ANTHROPIC_API_KEY", "sk-ant-test") };
        let provider = build_provider(&ai_config("anthropic")).unwrap();
        assert!(matches!(provider, AnyProvider::Anthropic(_)));
        unsafe { std::env::remove_var("ANTHROPIC_API_KEY") };
    }
}
