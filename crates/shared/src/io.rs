use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::ArticleRecord;
use crate::pipeline::Digest;

/// Written next to the run so later steps can find the Markdown digest
pub const MARKDOWN_MARKER_FILE: &str = "digest_filename.txt";
/// Same, for the HTML digest
pub const HTML_MARKER_FILE: &str = "digest_html_filename.txt";

/// Where a digest was written
#[derive(Debug, Clone, PartialEq)]
pub struct DigestFiles {
    pub markdown: PathBuf,
    pub html: PathBuf,
}

/// Load the article list produced by the feed collector
pub fn load_articles(filepath: &Path) -> Result<Vec<ArticleRecord>> {
    if !filepath.exists() {
        anyhow::bail!(
            "Articles file not found: {}. Fetch the feeds first.",
            filepath.display()
        );
    }

    let content = fs::read_to_string(filepath)
        .with_context(|| format!("Failed to read articles file: {}", filepath.display()))?;

    let articles: Vec<ArticleRecord> = serde_json::from_str(&content).with_context(|| {
        format!(
            "Failed to parse articles JSON from {}. The file may be corrupted or not an article list.",
            filepath.display()
        )
    })?;

    Ok(articles)
}

/// Write `{out_dir}/{YYYY-MM-DD-HH-MM}.md` and `.html`
pub fn save_digest(digest: &Digest, out_dir: &Path, date: DateTime<Utc>) -> Result<DigestFiles> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create digest directory: {}", out_dir.display()))?;

    let timestamp = date.format("%Y-%m-%d-%H-%M");
    let markdown = out_dir.join(format!("{}.md", timestamp));
    let html = out_dir.join(format!("{}.html", timestamp));

    fs::write(&markdown, &digest.markdown).context("Failed to write Markdown digest")?;
    fs::write(&html, &digest.html).context("Failed to write HTML digest")?;

    Ok(DigestFiles { markdown, html })
}

/// Record the digest paths in the marker files inside `dir`
pub fn write_marker_files(files: &DigestFiles, dir: &Path) -> Result<()> {
    fs::write(
        dir.join(MARKDOWN_MARKER_FILE),
        files.markdown.display().to_string(),
    )
    .context("Failed to write Markdown marker file")?;
    fs::write(dir.join(HTML_MARKER_FILE), files.html.display().to_string())
        .context("Failed to write HTML marker file")?;
    Ok(())
}
