use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::config::DigestConfig;
use crate::dedup::group_articles;
use crate::digest::{DigestGenerator, RenderOptions};
use crate::models::{split_streams, ArticleGroup, ArticleRecord, SummaryResult};
use crate::ranking::rank;
use crate::summarizer::{fill_topics, StreamPrompts, SummarizeOutcome, Summarizer, TRENDING_TOPICS};

/// Counts gathered along one run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DigestStats {
    pub general_articles: usize,
    pub trending_articles: usize,
    pub groups: usize,
    pub discarded: usize,
    pub failed: usize,
    pub general_results: usize,
    pub trending_results: usize,
}

/// Rendered output of one run
#[derive(Debug, Clone)]
pub struct Digest {
    pub markdown: String,
    pub html: String,
    pub stats: DigestStats,
}

/// Single-batch digest run: split, group, summarize, rank, render
pub struct DigestPipeline {
    config: DigestConfig,
    summarizer: Summarizer,
}

impl DigestPipeline {
    pub fn new(config: DigestConfig) -> Result<Self> {
        let summarizer = Summarizer::new(config.llm.clone())?;
        Ok(Self { config, summarizer })
    }

    fn general_prompts(&self) -> StreamPrompts {
        let topics = self.config.topics_str();
        StreamPrompts {
            system_prompt: fill_topics(&self.config.system_prompt, &topics),
            prompt_template: self.config.prompt_template.clone(),
            topics,
        }
    }

    fn trending_prompts(&self) -> StreamPrompts {
        let system_prompt = self
            .config
            .trending_system_prompt
            .clone()
            .unwrap_or_else(|| fill_topics(&self.config.system_prompt, TRENDING_TOPICS));

        StreamPrompts {
            system_prompt,
            prompt_template: self.config.prompt_template.clone(),
            topics: TRENDING_TOPICS.to_string(),
        }
    }

    async fn summarize(
        &self,
        groups: &[ArticleGroup],
        prompts: &StreamPrompts,
        stats: &mut DigestStats,
    ) -> Vec<SummaryResult> {
        let outcomes = self.summarizer.summarize_groups(groups, prompts).await;

        let mut results = Vec::new();
        for outcome in outcomes {
            match outcome {
                SummarizeOutcome::Summarized(result) => results.push(result),
                SummarizeOutcome::Discarded => stats.discarded += 1,
                SummarizeOutcome::Failed(_) => stats.failed += 1,
            }
        }
        results
    }

    pub async fn run(&self, articles: Vec<ArticleRecord>, now: DateTime<Utc>) -> Digest {
        let mut stats = DigestStats::default();

        let (general, trending) = split_streams(articles);
        stats.general_articles = general.len();
        stats.trending_articles = trending.len();
        info!(
            general = general.len(),
            trending = trending.len(),
            "split article streams"
        );

        let groups = group_articles(general);
        stats.groups = groups.len();
        info!(groups = groups.len(), "grouped general articles");

        let general_results = self
            .summarize(&groups, &self.general_prompts(), &mut stats)
            .await;
        let general_ranked = rank(general_results);

        // Trending entries are never deduplicated
        let trending_groups: Vec<ArticleGroup> = trending.into_iter().map(|a| vec![a]).collect();
        let trending_results = self
            .summarize(&trending_groups, &self.trending_prompts(), &mut stats)
            .await;
        let trending_ranked = rank(trending_results);

        stats.general_results = general_ranked.len();
        stats.trending_results = trending_ranked.len();
        info!(
            general = stats.general_results,
            trending = stats.trending_results,
            discarded = stats.discarded,
            failed = stats.failed,
            "summarized stories"
        );

        let options = RenderOptions::new(self.config.final_digest_count, now);
        let (markdown, html) = DigestGenerator::render(
            &self.config.html_template,
            &general_ranked,
            &trending_ranked,
            &options,
        );

        Digest {
            markdown,
            html,
            stats,
        }
    }
}
