use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::issues::{IssueComment, IssueRecord, RepositoryTarget};

const API_BASE: &str = "https://api.github.com";
const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 500;
const PER_PAGE: &str = "100";
const PAGE_SIZE: usize = 100;

/// Abstraction over raw GitHub REST calls for testability.
pub trait GitHubApi {
    fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<serde_json::Value>;

    fn post(&self, path: &str, body: &serde_json::Value) -> Result<serde_json::Value>;
}

/// Real REST client with retry and exponential backoff.
struct HttpGitHubApi {
    token: String,
}

impl HttpGitHubApi {
    fn request(&self, req: ureq::Request) -> ureq::Request {
        req.set("Authorization", &format!("Bearer {}", self.token))
            .set("Accept", "application/vnd.github+json")
            .set("User-Agent", "scout")
    }
}

impl GitHubApi for HttpGitHubApi {
    fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<serde_json::Value> {
        let url = format!("{API_BASE}{path}");

        let mut backoff_ms = INITIAL_BACKOFF_MS;
        for attempt in 1..=MAX_RETRIES {
            let mut req = self.request(ureq::get(&url));
            for (key, value) in query {
                req = req.query(key, value);
            }

            match req.call() {
                Ok(response) => {
                    return response
                        .into_json()
                        .map_err(|e| Error::Remote(format!("invalid JSON from {path}: {e}")));
                }
                Err(ref e) if attempt < MAX_RETRIES && is_retryable(e) => {
                    warn!(attempt, error = %e, backoff_ms, "retrying GitHub API after transient error");
                    thread::sleep(Duration::from_millis(backoff_ms));
                    backoff_ms *= 2;
                }
                Err(e) => {
                    return Err(Error::Remote(format!("GET {path} failed: {e}")));
                }
            }
        }
        unreachable!()
    }

    fn post(&self, path: &str, body: &serde_json::Value) -> Result<serde_json::Value> {
        let url = format!("{API_BASE}{path}");

        let mut backoff_ms = INITIAL_BACKOFF_MS;
        for attempt in 1..=MAX_RETRIES {
            match self.request(ureq::post(&url)).send_json(body) {
                Ok(response) => {
                    return response
                        .into_json()
                        .map_err(|e| Error::Remote(format!("invalid JSON from {path}: {e}")));
                }
                Err(ref e) if attempt < MAX_RETRIES && is_retryable(e) => {
                    warn!(attempt, error = %e, backoff_ms, "retrying GitHub API after transient error");
                    thread::sleep(Duration::from_millis(backoff_ms));
                    backoff_ms *= 2;
                }
                Err(e) => {
                    return Err(Error::Remote(format!("POST {path} failed: {e}")));
                }
            }
        }
        unreachable!()
    }
}

/// Only retry rate-limits (429), server errors (5xx), and transport/network errors.
fn is_retryable(err: &ureq::Error) -> bool {
    match err {
        ureq::Error::Status(code, _) => *code == 429 || *code >= 500,
        ureq::Error::Transport(_) => true,
    }
}

// --- REST wire types ---

#[derive(Debug, Deserialize)]
struct ApiUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct ApiRepo {
    name: String,
    owner: ApiUser,
    #[serde(default)]
    stargazers_count: u64,
}

#[derive(Debug, Deserialize)]
struct ApiLabel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ApiIssue {
    number: u64,
    title: String,
    body: Option<String>,
    #[serde(default)]
    labels: Vec<ApiLabel>,
    created_at: DateTime<Utc>,
    #[serde(default)]
    comments: u32,
    assignee: Option<ApiUser>,
    #[serde(default)]
    assignees: Vec<ApiUser>,
    pull_request: Option<serde_json::Value>,
    html_url: String,
}

#[derive(Debug, Deserialize)]
struct ApiComment {
    user: ApiUser,
    body: Option<String>,
    created_at: DateTime<Utc>,
}

fn parse_issue(api: ApiIssue, target: &RepositoryTarget) -> IssueRecord {
    let mut assignees: Vec<String> = api.assignees.iter().map(|u| u.login.clone()).collect();
    if assignees.is_empty()
        && let Some(single) = &api.assignee
    {
        assignees.push(single.login.clone());
    }

    IssueRecord {
        target: target.clone(),
        number: api.number,
        title: api.title,
        body: api.body.unwrap_or_default(),
        labels: api.labels.into_iter().map(|l| l.name).collect(),
        created_at: api.created_at,
        comment_count: api.comments,
        assignees,
        is_pull_request: api.pull_request.is_some(),
        url: api.html_url,
    }
}

/// High-level issue-tracker operations used by the pipeline.
pub struct GitHubClient {
    api: Box<dyn GitHubApi>,
}

impl GitHubClient {
    pub fn new(token: &str) -> Self {
        Self {
            api: Box::new(HttpGitHubApi {
                token: token.to_string(),
            }),
        }
    }

    pub fn with_api(api: Box<dyn GitHubApi>) -> Self {
        Self { api }
    }

    /// Fetch every page of a list endpoint. A page shorter than the page
    /// size is the last one.
    fn get_paged(&self, path: &str, query: &[(&str, &str)]) -> Result<Vec<serde_json::Value>> {
        let mut items = Vec::new();
        let mut page = 1u32;
        loop {
            let page_str = page.to_string();
            let mut paged_query: Vec<(&str, &str)> = query.to_vec();
            paged_query.push(("per_page", PER_PAGE));
            paged_query.push(("page", &page_str));

            let json = self.api.get(path, &paged_query)?;
            let chunk: Vec<serde_json::Value> = serde_json::from_value(json)
                .map_err(|e| Error::Remote(format!("unexpected response from {path}: {e}")))?;

            let last_page = chunk.len() < PAGE_SIZE;
            items.extend(chunk);
            if last_page {
                return Ok(items);
            }
            page += 1;
        }
    }

    /// Login of the authenticated account; used as the bot identity.
    pub fn viewer_login(&self) -> Result<String> {
        let json = self.api.get("/user", &[])?;
        let user: ApiUser = serde_json::from_value(json)
            .map_err(|e| Error::Remote(format!("failed to parse /user: {e}")))?;
        Ok(user.login)
    }

    pub fn get_repository(&self, owner: &str, name: &str) -> Result<RepositoryTarget> {
        let json = self.api.get(&format!("/repos/{owner}/{name}"), &[])?;
        let repo: ApiRepo = serde_json::from_value(json)
            .map_err(|e| Error::Remote(format!("failed to parse repository: {e}")))?;
        Ok(RepositoryTarget::new(repo.owner.login, repo.name))
    }

    /// Repositories of an organization or user, most-starred first, capped
    /// at `limit`. Tries the org endpoint first, then falls back to user.
    pub fn list_repositories_for(&self, owner: &str, limit: usize) -> Result<Vec<RepositoryTarget>> {
        let query = [("per_page", PER_PAGE)];

        let json = match self.api.get(&format!("/orgs/{owner}/repos"), &query) {
            Ok(json) => json,
            Err(e) => {
                debug!(owner, error = %e, "org lookup failed, trying as user");
                self.api.get(&format!("/users/{owner}/repos"), &query)?
            }
        };

        let mut repos: Vec<ApiRepo> = serde_json::from_value(json)
            .map_err(|e| Error::Remote(format!("failed to parse repositories: {e}")))?;

        repos.sort_by(|a, b| b.stargazers_count.cmp(&a.stargazers_count));
        repos.truncate(limit);

        Ok(repos
            .into_iter()
            .map(|r| RepositoryTarget::new(r.owner.login, r.name))
            .collect())
    }

    /// Open issues carrying `label`, newest first, across all pages.
    /// Includes pull requests; the collector filters those out.
    pub fn list_label_issues(
        &self,
        target: &RepositoryTarget,
        label: &str,
    ) -> Result<Vec<IssueRecord>> {
        let path = format!("/repos/{}/{}/issues", target.owner, target.name);
        let items = self.get_paged(
            &path,
            &[
                ("state", "open"),
                ("labels", label),
                ("sort", "created"),
                ("direction", "desc"),
            ],
        )?;

        let issues: Vec<ApiIssue> = items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| Error::Remote(format!("failed to parse issues: {e}")))?;

        let records: Vec<IssueRecord> = issues
            .into_iter()
            .map(|i| parse_issue(i, target))
            .collect();

        debug!(
            repo = target.full_name(),
            label,
            count = records.len(),
            "fetched labeled issues"
        );
        Ok(records)
    }

    /// All comments on an issue, oldest first, across all pages.
    pub fn list_comments(
        &self,
        target: &RepositoryTarget,
        number: u64,
    ) -> Result<Vec<IssueComment>> {
        let path = format!(
            "/repos/{}/{}/issues/{number}/comments",
            target.owner, target.name
        );
        let items = self.get_paged(&path, &[])?;

        let comments: Vec<ApiComment> = items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| Error::Remote(format!("failed to parse comments: {e}")))?;

        Ok(comments
            .into_iter()
            .map(|c| IssueComment {
                author: c.user.login,
                body: c.body.unwrap_or_default(),
                created_at: c.created_at,
            })
            .collect())
    }

    pub fn create_comment(&self, target: &RepositoryTarget, number: u64, body: &str) -> Result<()> {
        let path = format!(
            "/repos/{}/{}/issues/{number}/comments",
            target.owner, target.name
        );
        self.api.post(&path, &serde_json::json!({ "body": body }))?;
        debug!(repo = target.full_name(), number, "posted comment");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::cell::RefCell;

    use std::rc::Rc;

    /// Scripted API double: responses are consumed in call order. Posted
    /// bodies are captured for assertions via the shared `posts` handle.
    pub(crate) struct MockGitHubApi {
        responses: RefCell<Vec<Result<serde_json::Value>>>,
        pub(crate) posts: Rc<RefCell<Vec<(String, serde_json::Value)>>>,
    }

    impl MockGitHubApi {
        pub(crate) fn new(responses: Vec<Result<serde_json::Value>>) -> Self {
            Self {
                responses: RefCell::new(responses),
                posts: Rc::new(RefCell::new(Vec::new())),
            }
        }

        pub(crate) fn posts_handle(&self) -> Rc<RefCell<Vec<(String, serde_json::Value)>>> {
            Rc::clone(&self.posts)
        }
    }

    impl GitHubApi for MockGitHubApi {
        fn get(&self, _path: &str, _query: &[(&str, &str)]) -> Result<serde_json::Value> {
            let mut responses = self.responses.borrow_mut();
            if responses.is_empty() {
                Err(Error::Remote("no more mock responses".to_string()))
            } else {
                responses.remove(0)
            }
        }

        fn post(&self, path: &str, body: &serde_json::Value) -> Result<serde_json::Value> {
            self.posts.borrow_mut().push((path.to_string(), body.clone()));
            Ok(serde_json::json!({}))
        }
    }

    pub(crate) fn issue_json(
        number: u64,
        title: &str,
        labels: &[&str],
        body: &str,
        created_at: &str,
    ) -> serde_json::Value {
        serde_json::json!({
            "number": number,
            "title": title,
            "body": body,
            "labels": labels.iter().map(|l| serde_json::json!({"name": l})).collect::<Vec<_>>(),
            "created_at": created_at,
            "comments": 0,
            "assignee": null,
            "assignees": [],
            "pull_request": null,
            "html_url": format!("https://github.com/owner/repo/issues/{number}")
        })
    }
}
