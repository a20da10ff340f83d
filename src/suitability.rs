use crate::issues::IssueContext;

const MIN_BODY_CHARS: usize = 50;
const MAX_DISCUSSION_COMMENTS: u32 = 10;

/// Labels that signal an issue is meant for newcomers. Matched as
/// case-insensitive substrings against the joined label set.
const BEGINNER_LABELS: &[&str] = &[
    "good first issue",
    "beginner",
    "easy",
    "first-timers-only",
    "help wanted",
];

/// Keywords in the title or body that suggest a change too large for an
/// automated suggestion.
const AVOID_KEYWORDS: &[&str] = &["redesign", "refactor", "rewrite", "breaking change"];

/// Heuristic gate deciding whether an eligible issue is worth analyzing.
/// Pure function; rules are evaluated in precedence order and the first
/// failing rule supplies the reason.
pub fn should_attempt(ctx: &IssueContext) -> (bool, &'static str) {
    let issue = &ctx.issue;

    if issue.body.trim().chars().count() < MIN_BODY_CHARS {
        return (false, "description too short");
    }

    let joined_labels = issue.labels.join(" ").to_lowercase();
    if !BEGINNER_LABELS.iter().any(|l| joined_labels.contains(l)) {
        return (false, "not beginner-friendly");
    }

    if issue.comment_count > MAX_DISCUSSION_COMMENTS {
        return (false, "too much discussion");
    }

    let title = issue.title.to_lowercase();
    let body = issue.body.to_lowercase();
    if AVOID_KEYWORDS
        .iter()
        .any(|kw| title.contains(kw) || body.contains(kw))
    {
        return (false, "looks like a major change");
    }

    (true, "suitable")
}
