use anyhow::{bail, Context as _};
use clap::Args;
use std::path::PathBuf;
use stepnote_client::ContentFetcher;

/// Where a transcript comes from.
#[derive(Args, Debug, Default)]
pub struct SourceArgs {
    /// GitHub page or raw URL of the transcript
    pub url: Option<String>,

    /// Read the transcript from a local file instead
    #[arg(long, conflicts_with = "url")]
    pub file: Option<PathBuf>,
}

impl SourceArgs {
    /// Load the markdown, falling back to `default_url` when neither a URL nor
    /// a file was given.
    pub async fn load(&self, default_url: Option<&str>) -> anyhow::Result<String> {
        if let Some(path) = &self.file {
            return std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()));
        }
        let Some(url) = self.url.as_deref().or(default_url) else {
            bail!("no transcript given: pass a URL or --file <path>");
        };
        let markdown = ContentFetcher::new()
            .fetch_markdown(url)
            .await
            .with_context(|| format!("failed to fetch {url}"))?;
        Ok(markdown)
    }
}
