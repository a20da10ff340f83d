use chrono::{DateTime, Duration, Utc};
use tracing::warn;

use crate::github::GitHubClient;
use crate::issues::IssueRecord;

/// Whether the bot already commented on this issue within the cooldown
/// window. Comments exactly at the window edge count as not recent.
///
/// Fails closed: if the comment fetch errors, the issue is treated as
/// already handled. Under-posting on error is acceptable; a duplicate
/// comment is not.
pub fn has_recent_bot_comment(
    client: &GitHubClient,
    issue: &IssueRecord,
    bot_login: &str,
    cooldown_hours: i64,
    now: DateTime<Utc>,
) -> bool {
    if issue.comment_count == 0 {
        return false;
    }

    let comments = match client.list_comments(&issue.target, issue.number) {
        Ok(comments) => comments,
        Err(e) => {
            warn!(
                repo = issue.target.full_name(),
                number = issue.number,
                error = %e,
                "comment fetch failed, treating issue as already handled"
            );
            return true;
        }
    };

    let cutoff = now - Duration::hours(cooldown_hours);
    comments
        .iter()
        .any(|c| c.author == bot_login && c.created_at > cutoff)
}
