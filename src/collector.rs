use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::github::GitHubClient;
use crate::issues::{IssueRecord, RepositoryTarget};

/// Why an issue was dropped during collection. Checks are independent; the
/// first failing one claims the rejection in diagnostics.
fn rejection_reason(
    issue: &IssueRecord,
    exclude_labels: &[String],
    max_age_days: i64,
    now: DateTime<Utc>,
) -> Option<&'static str> {
    if issue.is_pull_request {
        return Some("pull request");
    }
    if now - issue.created_at > Duration::days(max_age_days) {
        return Some("older than max age");
    }
    if issue
        .labels
        .iter()
        .any(|l| exclude_labels.iter().any(|ex| ex == l))
    {
        return Some("carries an exclude label");
    }
    if !issue.assignees.is_empty() {
        return Some("already assigned");
    }
    None
}

/// Collect open issues for a repository across the configured labels,
/// applying the eligibility filter and de-duplicating issues that carry
/// more than one target label (first-seen position wins).
///
/// A per-label fetch failure is logged and skipped; remaining labels are
/// still collected. No matches is an empty vec, not an error.
pub fn collect_eligible_issues(
    client: &GitHubClient,
    target: &RepositoryTarget,
    target_labels: &[String],
    exclude_labels: &[String],
    max_age_days: i64,
    now: DateTime<Utc>,
) -> Vec<IssueRecord> {
    let mut seen: HashSet<u64> = HashSet::new();
    let mut collected: Vec<IssueRecord> = Vec::new();

    for label in target_labels {
        let issues = match client.list_label_issues(target, label) {
            Ok(issues) => issues,
            Err(e) => {
                warn!(
                    repo = target.full_name(),
                    label,
                    error = %e,
                    "failed to fetch issues for label, skipping"
                );
                continue;
            }
        };

        for issue in issues {
            if seen.contains(&issue.number) {
                continue;
            }
            if let Some(reason) = rejection_reason(&issue, exclude_labels, max_age_days, now) {
                debug!(
                    repo = target.full_name(),
                    number = issue.number,
                    reason,
                    "issue rejected"
                );
                continue;
            }
            seen.insert(issue.number);
            collected.push(issue);
        }
    }

    info!(
        repo = target.full_name(),
        count = collected.len(),
        "collected eligible issues"
    );
    collected
}
