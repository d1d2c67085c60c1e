use std::collections::HashSet;

use tracing::debug;

use crate::models::{ArticleGroup, ArticleRecord};

/// Jaccard ratio a pair of titles must exceed
const SIMILARITY_THRESHOLD: f64 = 0.6;
/// Minimum number of shared tokens
const MIN_SHARED_TOKENS: usize = 3;

/// Lowercased ASCII alphanumeric words of a title, deduplicated
pub fn token_set(title: &str) -> HashSet<String> {
    let cleaned: String = title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
        .collect();

    cleaned.split_whitespace().map(str::to_string).collect()
}

/// Whether two titles look like the same story.
///
/// Requires both a Jaccard ratio above 0.6 and at least three shared tokens,
/// so short titles with a couple of common words never match.
pub fn are_similar(a: &str, b: &str) -> bool {
    sets_similar(&token_set(a), &token_set(b))
}

/// Greedily cluster articles around anchors.
///
/// Each unassigned article opens a group and pulls in every later unassigned
/// article similar to it. Only similarity to the anchor counts, so chains of
/// titles are not merged transitively. Groups come out in anchor order and
/// every input article lands in exactly one group.
pub fn group_articles(articles: Vec<ArticleRecord>) -> Vec<ArticleGroup> {
    let token_sets: Vec<HashSet<String>> = articles.iter().map(|a| token_set(&a.title)).collect();
    let mut group_of: Vec<Option<usize>> = vec![None; articles.len()];
    let mut group_count = 0;

    for i in 0..articles.len() {
        if group_of[i].is_some() {
            continue;
        }
        group_of[i] = Some(group_count);

        for j in (i + 1)..articles.len() {
            if group_of[j].is_none() && sets_similar(&token_sets[i], &token_sets[j]) {
                group_of[j] = Some(group_count);
            }
        }
        group_count += 1;
    }

    let mut groups: Vec<ArticleGroup> = vec![Vec::new(); group_count];
    for (article, group) in articles.into_iter().zip(group_of) {
        if let Some(idx) = group {
            groups[idx].push(article);
        }
    }

    for group in groups.iter().filter(|g| g.len() > 1) {
        debug!(
            anchor = %group[0].title,
            members = group.len(),
            "grouped near-duplicate articles"
        );
    }

    groups
}

fn sets_similar(a: &HashSet<String>, b: &HashSet<String>) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }

    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    let similarity = intersection as f64 / union as f64;

    similarity > SIMILARITY_THRESHOLD && intersection >= MIN_SHARED_TOKENS
}
