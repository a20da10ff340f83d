use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::activity::{Action, ActionRecord, ActivityLog};
use crate::analyzer::{AnalysisProvider, analyze_issue};
use crate::budget::RunBudget;
use crate::collector::collect_eligible_issues;
use crate::comment::render_comment;
use crate::config::Config;
use crate::error::Result;
use crate::github::GitHubClient;
use crate::issues::{IssueContext, IssueRecord};
use crate::recency::has_recent_bot_comment;
use crate::suitability::should_attempt;
use crate::targets;

/// Totals for the end-of-run report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub repositories_scanned: u32,
    pub issues_found: u32,
    pub issues_analyzed: u32,
    pub comments_posted: u32,
    pub dry_run: bool,
}

/// Drives one full run: resolve references, collect eligible issues, and
/// walk each issue through the guard, classifier, analyzer, and composer
/// until the analysis budget runs out.
pub struct Orchestrator<P> {
    client: GitHubClient,
    provider: P,
    config: Config,
    budget: RunBudget,
    activity: ActivityLog,
    bot_login: String,
}

impl<P: AnalysisProvider> Orchestrator<P> {
    pub fn new(
        client: GitHubClient,
        provider: P,
        config: Config,
        activity: ActivityLog,
        bot_login: String,
    ) -> Self {
        let budget = RunBudget::new(config.max_issues_per_run, config.max_comments_per_run);
        Self {
            client,
            provider,
            config,
            budget,
            activity,
            bot_login,
        }
    }

    pub fn run(&self, references: &[String]) -> Result<RunSummary> {
        self.run_at(references, Utc::now())
    }

    fn run_at(&self, references: &[String], now: DateTime<Utc>) -> Result<RunSummary> {
        let mut repositories_scanned = 0u32;
        let mut issues_found = 0u32;

        'run: for reference in references {
            let resolved = match targets::resolve(&self.client, reference) {
                Ok(resolved) => resolved,
                Err(e) => {
                    warn!(reference, error = %e, "could not resolve reference, skipping");
                    continue;
                }
            };

            for target in resolved {
                if self.budget.analyses_exhausted() {
                    info!("analysis budget exhausted, ending run early");
                    break 'run;
                }

                repositories_scanned += 1;
                let issues = collect_eligible_issues(
                    &self.client,
                    &target,
                    &self.config.target_labels,
                    &self.config.exclude_labels,
                    self.config.max_issue_age_days,
                    now,
                );
                issues_found += issues.len() as u32;

                for issue in issues {
                    if self.budget.analyses_exhausted() {
                        info!("analysis budget exhausted, ending run early");
                        break 'run;
                    }
                    self.process_issue(issue, now)?;
                }
            }
        }

        let usage = self.budget.usage();
        Ok(RunSummary {
            repositories_scanned,
            issues_found,
            issues_analyzed: usage.issues_analyzed,
            comments_posted: usage.comments_posted,
            dry_run: self.config.dry_run,
        })
    }

    /// One issue, end to end. Only a broken comment template is fatal; every
    /// other failure skips the issue and keeps the run going.
    fn process_issue(&self, issue: IssueRecord, now: DateTime<Utc>) -> Result<()> {
        if has_recent_bot_comment(
            &self.client,
            &issue,
            &self.bot_login,
            self.config.min_comment_interval_hours,
            now,
        ) {
            debug!(
                repo = issue.target.full_name(),
                number = issue.number,
                "commented recently, skipping"
            );
            self.record(&issue, Action::Skipped, now);
            return Ok(());
        }

        let comments = if issue.comment_count == 0 {
            Vec::new()
        } else {
            match self.client.list_comments(&issue.target, issue.number) {
                Ok(comments) => comments,
                Err(e) => {
                    warn!(
                        repo = issue.target.full_name(),
                        number = issue.number,
                        error = %e,
                        "comment fetch for context failed, analyzing without comments"
                    );
                    Vec::new()
                }
            }
        };
        let ctx = IssueContext::new(issue, comments);

        let (suitable, reason) = should_attempt(&ctx);
        if !suitable {
            debug!(
                repo = ctx.issue.target.full_name(),
                number = ctx.issue.number,
                reason,
                "issue not suitable"
            );
            self.record(&ctx.issue, Action::Skipped, now);
            return Ok(());
        }

        if !self.budget.try_reserve_analysis() {
            return Ok(());
        }

        info!(
            repo = ctx.issue.target.full_name(),
            number = ctx.issue.number,
            title = ctx.issue.title,
            "analyzing issue"
        );
        let analysis = match analyze_issue(&self.provider, &ctx) {
            Ok(analysis) => analysis,
            Err(e) => {
                warn!(
                    repo = ctx.issue.target.full_name(),
                    number = ctx.issue.number,
                    error = %e,
                    "analysis failed, skipping issue"
                );
                self.record(&ctx.issue, Action::Skipped, now);
                return Ok(());
            }
        };

        let body = render_comment(&self.config.comment_template, &analysis)?;

        if !self.budget.try_reserve_comment() {
            info!(
                repo = ctx.issue.target.full_name(),
                number = ctx.issue.number,
                "comment budget exhausted, not posting"
            );
            self.record(&ctx.issue, Action::Skipped, now);
            return Ok(());
        }

        if self.config.dry_run {
            info!(
                repo = ctx.issue.target.full_name(),
                number = ctx.issue.number,
                "dry run, would post comment:\n{body}"
            );
            self.record(&ctx.issue, Action::WouldComment, now);
            return Ok(());
        }

        match self
            .client
            .create_comment(&ctx.issue.target, ctx.issue.number, &body)
        {
            Ok(()) => {
                info!(
                    repo = ctx.issue.target.full_name(),
                    number = ctx.issue.number,
                    "posted comment"
                );
                self.record(&ctx.issue, Action::Commented, now);
            }
            Err(e) => {
                warn!(
                    repo = ctx.issue.target.full_name(),
                    number = ctx.issue.number,
                    error = %e,
                    "failed to post comment"
                );
                self.record(&ctx.issue, Action::Skipped, now);
            }
        }
        Ok(())
    }

    fn record(&self, issue: &IssueRecord, action: Action, now: DateTime<Utc>) {
        self.activity.record(&ActionRecord {
            repository: issue.target.full_name(),
            number: issue.number,
            title: issue.title.clone(),
            action,
            url: issue.url.clone(),
            timestamp: now,
        });
    }
}
