use crate::error::{Result, StepnoteError};

const RAW_HOST: &str = "raw.githubusercontent.com";
const DEFAULT_BRANCH: &str = "main";
const DEFAULT_DOCUMENT: &str = "README.md";

/// Turn a GitHub page URL into the raw-content URL for the same file.
///
/// - `github.com/{owner}/{repo}/blob/{ref}/{path}` → `raw.githubusercontent.com/{owner}/{repo}/{ref}/{path}`
/// - `github.com/{owner}/{repo}` → that repository's `main` branch `README.md`
/// - `raw.githubusercontent.com/...` is returned as-is
///
/// Other hosts are rejected before any request is made.
pub fn normalize_content_url(url: &str) -> Result<String> {
    let url = url.trim();
    let without_scheme = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .ok_or_else(|| StepnoteError::InvalidContentUrl(url.to_string()))?;
    let (host, rest) = without_scheme
        .split_once('/')
        .unwrap_or((without_scheme, ""));
    let path = rest.split(['?', '#']).next().unwrap_or_default();
    let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();

    match host.to_ascii_lowercase().as_str() {
        RAW_HOST if parts.len() >= 4 => Ok(format!("https://{RAW_HOST}/{}", parts.join("/"))),
        "github.com" | "www.github.com" => match parts.as_slice() {
            [owner, repo] => {
                let repo = repo.strip_suffix(".git").unwrap_or(repo);
                Ok(format!(
                    "https://{RAW_HOST}/{owner}/{repo}/{DEFAULT_BRANCH}/{DEFAULT_DOCUMENT}"
                ))
            }
            [owner, repo, "blob" | "raw", file @ ..] if file.len() >= 2 => Ok(format!(
                "https://{RAW_HOST}/{owner}/{repo}/{}",
                file.join("/")
            )),
            _ => Err(StepnoteError::InvalidContentUrl(url.to_string())),
        },
        RAW_HOST => Err(StepnoteError::InvalidContentUrl(url.to_string())),
        _ => Err(StepnoteError::UnsupportedContentHost(host.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_url_is_rewritten() {
        assert_eq!(
            normalize_content_url("https://github.com/acme/tasks/blob/main/runs/42.md").unwrap(),
            "https://raw.githubusercontent.com/acme/tasks/main/runs/42.md"
        );
    }

    #[test]
    fn query_and_fragment_are_dropped() {
        assert_eq!(
            normalize_content_url("https://github.com/acme/tasks/blob/dev/a.md?plain=1#L3")
                .unwrap(),
            "https://raw.githubusercontent.com/acme/tasks/dev/a.md"
        );
    }

    #[test]
    fn repo_root_assumes_main_readme() {
        assert_eq!(
            normalize_content_url("https://github.com/acme/tasks/").unwrap(),
            "https://raw.githubusercontent.com/acme/tasks/main/README.md"
        );
        assert_eq!(
            normalize_content_url("https://github.com/acme/tasks.git").unwrap(),
            "https://raw.githubusercontent.com/acme/tasks/main/README.md"
        );
    }

    #[test]
    fn raw_url_passes_through() {
        let raw = "https://raw.githubusercontent.com/acme/tasks/main/runs/42.md";
        assert_eq!(normalize_content_url(raw).unwrap(), raw);
    }

    #[test]
    fn other_hosts_are_rejected() {
        assert!(matches!(
            normalize_content_url("https://gitlab.com/acme/tasks/-/blob/main/a.md"),
            Err(StepnoteError::UnsupportedContentHost(h)) if h == "gitlab.com"
        ));
    }

    #[test]
    fn malformed_github_urls_are_rejected() {
        assert!(normalize_content_url("github.com/acme/tasks").is_err());
        assert!(normalize_content_url("https://github.com/acme").is_err());
        assert!(normalize_content_url("https://github.com/acme/tasks/tree/main").is_err());
    }
}
