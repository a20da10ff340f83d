use std::path::Path;

use tracing::info;

use crate::error::{Error, Result};
use crate::github::GitHubClient;
use crate::issues::RepositoryTarget;

/// Cap on repositories expanded from a bare organization/user reference.
const MAX_OWNER_REPOS: usize = 5;

/// A parsed repository reference: a specific repo or a whole owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    Repo { owner: String, name: String },
    Owner(String),
}

/// Parse a reference string: `owner`, `owner/repo`, or a github.com URL.
/// Trailing `/` and `.git` are stripped.
pub fn parse_reference(raw: &str) -> Result<Reference> {
    let mut reference = raw.trim();
    reference = reference.trim_end_matches('/');
    reference = reference.strip_suffix(".git").unwrap_or(reference);
    reference = reference.trim_end_matches('/');

    if let Some(idx) = reference.find("github.com/") {
        reference = &reference[idx + "github.com/".len()..];
    }

    let parts: Vec<&str> = reference.split('/').filter(|p| !p.is_empty()).collect();
    match parts.as_slice() {
        [owner] => Ok(Reference::Owner(owner.to_string())),
        [owner, name, ..] => Ok(Reference::Repo {
            owner: owner.to_string(),
            name: name.to_string(),
        }),
        [] => Err(Error::Resolution(format!("invalid reference: {raw:?}"))),
    }
}

/// Expand a reference into concrete repositories to scan.
///
/// A repo reference resolves to exactly that repository; an owner reference
/// resolves to up to `MAX_OWNER_REPOS` of its repositories, most-starred
/// first. Failures are `Error::Resolution`: callers skip the reference and
/// continue the run.
pub fn resolve(client: &GitHubClient, raw: &str) -> Result<Vec<RepositoryTarget>> {
    match parse_reference(raw)? {
        Reference::Repo { owner, name } => {
            let target = client.get_repository(&owner, &name).map_err(|e| {
                Error::Resolution(format!("repository {owner}/{name} not found: {e}"))
            })?;
            Ok(vec![target])
        }
        Reference::Owner(owner) => {
            let targets = client
                .list_repositories_for(&owner, MAX_OWNER_REPOS)
                .map_err(|e| {
                    Error::Resolution(format!("no organization or user named {owner}: {e}"))
                })?;
            if targets.is_empty() {
                return Err(Error::Resolution(format!("{owner} has no repositories")));
            }
            info!(owner, count = targets.len(), "expanded owner reference");
            Ok(targets)
        }
    }
}

/// Load reference strings from a file, one per line. Lines starting with
/// `#` and blank lines are ignored. A missing file is fatal.
pub fn load_references(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::ConfigValidation(format!("cannot read repos file {}: {e}", path.display()))
    })?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::test_support::MockGitHubApi;

    fn client(responses: Vec<crate::error::Result<serde_json::Value>>) -> GitHubClient {
        GitHubClient::with_api(Box::new(MockGitHubApi::new(responses)))
    }

    fn repo_json(owner: &str, name: &str, stars: u64) -> serde_json::Value {
        serde_json::json!({
            "name": name,
            "owner": { "login": owner },
            "stargazers_count": stars
        })
    }

    #[test]
    fn test_parse_owner_repo() {
        assert_eq!(
            parse_reference("rust-lang/cargo").unwrap(),
            Reference::Repo {
                owner: "rust-lang".to_string(),
                name: "cargo".to_string()
            }
        );
    }

    #[test]
    fn test_parse_bare_owner() {
        assert_eq!(
            parse_reference("rust-lang").unwrap(),
            Reference::Owner("rust-lang".to_string())
        );
    }

    #[test]
    fn test_parse_full_url() {
        assert_eq!(
            parse_reference("https://github.com/rust-lang/cargo").unwrap(),
            Reference::Repo {
                owner: "rust-lang".to_string(),
                name: "cargo".to_string()
            }
        );
    }

    #[test]
    fn test_parse_strips_trailing_slash_and_git() {
        assert_eq!(
            parse_reference("https://github.com/rust-lang/cargo.git/").unwrap(),
            Reference::Repo {
                owner: "rust-lang".to_string(),
                name: "cargo".to_string()
            }
        );
        assert_eq!(
            parse_reference("rust-lang/").unwrap(),
            Reference::Owner("rust-lang".to_string())
        );
    }

    #[test]
    fn test_parse_empty_is_error() {
        assert!(parse_reference("").is_err());
        assert!(parse_reference("///").is_err());
        assert!(parse_reference("https://github.com/").is_err());
    }

    #[test]
    fn test_resolve_single_repo() {
        let gh = client(vec![Ok(repo_json("rust-lang", "cargo", 30000))]);
        let targets = resolve(&gh, "rust-lang/cargo").unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].full_name(), "rust-lang/cargo");
    }

    #[test]
    fn test_resolve_owner_caps_at_five() {
        let repos: Vec<serde_json::Value> = (0..8u64)
            .map(|i| repo_json("org", &format!("repo{i}"), 100 - i))
            .collect();
        let gh = client(vec![Ok(serde_json::json!(repos))]);
        let targets = resolve(&gh, "org").unwrap();
        assert_eq!(targets.len(), 5);
        assert_eq!(targets[0].name, "repo0");
    }

    #[test]
    fn test_resolve_unknown_repo_is_resolution_error() {
        let gh = client(vec![Err(Error::Remote("404".to_string()))]);
        let err = resolve(&gh, "nobody/nothing").unwrap_err();
        assert!(matches!(err, Error::Resolution(_)));
    }

    #[test]
    fn test_resolve_owner_without_repos_is_resolution_error() {
        let gh = client(vec![Ok(serde_json::json!([]))]);
        let err = resolve(&gh, "emptyorg").unwrap_err();
        assert!(matches!(err, Error::Resolution(_)));
    }

    #[test]
    fn test_load_references_skips_comments_and_blanks() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("repos.txt");
        std::fs::write(
            &path,
            "# watched repositories\nrust-lang/cargo\n\n  tokio-rs/tokio  \n# trailing comment\n",
        )
        .unwrap();

        let refs = load_references(&path).unwrap();
        assert_eq!(refs, vec!["rust-lang/cargo", "tokio-rs/tokio"]);
    }

    #[test]
    fn test_load_references_missing_file_is_fatal() {
        let err = load_references(Path::new("/nonexistent/repos.txt")).unwrap_err();
        assert!(matches!(err, Error::ConfigValidation(_)));
    }
}
