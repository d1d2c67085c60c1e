use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use shared::{load_articles, save_digest, write_marker_files, DigestConfig, DigestPipeline, LlmSettings};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "generate-digest")]
#[command(about = "Group, summarize and rank fetched articles into a Markdown and HTML digest")]
struct Args {
    /// Article list produced by the feed collector
    #[arg(short, long, default_value = "articles.json")]
    articles: PathBuf,

    /// Directory holding config.json, the prompt files and email_template.html
    #[arg(short, long, default_value = ".")]
    config_dir: PathBuf,

    /// Where the digest files are written
    #[arg(short, long, default_value = "digests")]
    output_dir: PathBuf,

    /// Skip writing digest_filename.txt and digest_html_filename.txt
    #[arg(long)]
    no_marker_files: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let llm = LlmSettings::from_env()?;
    let config = DigestConfig::load(&args.config_dir, llm).context("Failed to load configuration")?;
    info!(
        topics = %config.topics_str(),
        digest_count = config.final_digest_count,
        model = %config.llm.model,
        "configuration loaded"
    );

    println!("📖 Reading articles from {}", args.articles.display());
    let articles = load_articles(&args.articles)?;
    println!("✓ Loaded {} articles", articles.len());

    println!("\n🤖 Grouping and summarizing stories...");
    println!("  (This may take a few minutes...)");
    let now = Utc::now();
    let pipeline = DigestPipeline::new(config)?;
    let digest = pipeline.run(articles, now).await;

    let stats = &digest.stats;
    println!(
        "✓ {} general articles in {} groups, {} trending articles",
        stats.general_articles, stats.groups, stats.trending_articles
    );
    println!(
        "✓ Kept {} stories and {} trending repos ({} irrelevant, {} failed)",
        stats.general_results, stats.trending_results, stats.discarded, stats.failed
    );

    println!("\n📝 Writing digest...");
    let files = save_digest(&digest, &args.output_dir, now).context("Failed to save digest")?;

    if !args.no_marker_files {
        write_marker_files(&files, Path::new(".")).context("Failed to record digest paths")?;
    }

    println!("✓ Markdown saved to: {}", files.markdown.display());
    println!("✓ HTML saved to: {}", files.html.display());
    println!("\n✅ Digest generated.");

    Ok(())
}
