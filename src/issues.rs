use chrono::{DateTime, Utc};

/// How many recent comments are carried into the analysis context.
pub const MAX_CONTEXT_COMMENTS: usize = 5;

/// A concrete repository to scan, produced by target resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryTarget {
    pub owner: String,
    pub name: String,
}

impl RepositoryTarget {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// An open issue as collected from the tracker. Read-only once built.
#[derive(Debug, Clone)]
pub struct IssueRecord {
    pub target: RepositoryTarget,
    pub number: u64,
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub comment_count: u32,
    pub assignees: Vec<String>,
    pub is_pull_request: bool,
    pub url: String,
}

/// A single issue comment, oldest-first as returned by the tracker.
#[derive(Debug, Clone)]
pub struct IssueComment {
    pub author: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// An issue enriched with its most recent comments, built once per issue
/// and consumed by the suitability gate and the analyzer.
#[derive(Debug, Clone)]
pub struct IssueContext {
    pub issue: IssueRecord,
    pub recent_comments: Vec<IssueComment>,
}

impl IssueContext {
    /// Keep only the `MAX_CONTEXT_COMMENTS` most recent comments.
    pub fn new(issue: IssueRecord, mut comments: Vec<IssueComment>) -> Self {
        if comments.len() > MAX_CONTEXT_COMMENTS {
            comments.drain(..comments.len() - MAX_CONTEXT_COMMENTS);
        }
        Self {
            issue,
            recent_comments: comments,
        }
    }
}
