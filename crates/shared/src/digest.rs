use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::models::SummaryResult;
use crate::template;

const ARTICLE_TEMPLATE: &str =
    r#"<div class="article">{{IMAGE}}<h4>{{TITLE}}</h4><p class="meta">{{META}}</p><p>{{SUMMARY}}</p></div>"#;

/// Knobs for one render pass
#[derive(Debug, Clone)]
pub struct RenderOptions<'a> {
    /// How many general stories make it into the digest, hero included
    pub digest_count: usize,
    /// Story to feature instead of the top-ranked one
    pub hero_override: Option<&'a SummaryResult>,
    pub generated_at: DateTime<Utc>,
}

impl<'a> RenderOptions<'a> {
    pub fn new(digest_count: usize, generated_at: DateTime<Utc>) -> Self {
        Self {
            digest_count,
            hero_override: None,
            generated_at,
        }
    }
}

pub struct DigestGenerator;

impl DigestGenerator {
    /// Parse a loosely formatted feed date, keeping its own wall-clock time
    fn parse_date(date_str: &str) -> Option<NaiveDateTime> {
        let s = date_str.trim();
        if s.is_empty() {
            return None;
        }

        if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
            return Some(dt.naive_local());
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.naive_local());
        }
        for fmt in &["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"] {
            if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
                return Some(dt.naive_local());
            }
        }
        for fmt in &[
            "%Y-%m-%dT%H:%M:%S%.f",
            "%Y-%m-%d %H:%M:%S%.f",
            "%Y-%m-%dT%H:%M",
            "%Y-%m-%d %H:%M",
        ] {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
                return Some(dt);
            }
        }
        // Date-only forms land on midnight
        for fmt in &["%Y-%m-%d", "%a, %d %b %Y", "%a, %e %b %Y", "%d %b %Y", "%B %d, %Y"] {
            if let Ok(nd) = NaiveDate::parse_from_str(s, fmt) {
                return nd.and_hms_opt(0, 0, 0);
            }
        }
        None
    }

    /// Format as "Feb 01, 15:30", or `None` if the date cannot be parsed
    pub fn format_date(date_str: &str) -> Option<String> {
        Self::parse_date(date_str).map(|dt| dt.format("%b %d, %H:%M").to_string())
    }

    fn escape_html(text: &str) -> String {
        text.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
            .replace('\'', "&#x27;")
    }

    /// Plain-text digest. Titles and summaries are written as-is.
    pub fn generate_markdown(
        general: &[SummaryResult],
        trending: &[SummaryResult],
        digest_count: usize,
    ) -> String {
        let mut md = String::from("# Your Daily Digest\n\n");

        if !general.is_empty() {
            md.push_str("## Top Stories\n\n");
            for item in general.iter().take(digest_count) {
                md.push_str(&Self::markdown_item(item));
            }
        }

        if !trending.is_empty() {
            md.push_str("## Trending GitHub Repos\n\n");
            for item in trending {
                md.push_str(&Self::markdown_item(item));
            }
        }

        md
    }

    fn markdown_item(item: &SummaryResult) -> String {
        format!("### {}\n{}\n{}\n\n", item.title, item.summary, item.url)
    }

    fn image_tag(item: &SummaryResult) -> String {
        match &item.image_url {
            Some(src) if !src.is_empty() => format!(
                r#"<img src="{}" alt="{}">"#,
                src,
                Self::escape_html(&item.title)
            ),
            _ => String::new(),
        }
    }

    fn render_article(item: &SummaryResult, show_image: bool) -> String {
        let image = if show_image {
            Self::image_tag(item)
        } else {
            String::new()
        };

        let title = format!(
            r#"<a href="{}">{}</a>"#,
            item.url,
            Self::escape_html(&item.title)
        );

        let mut meta = format!(
            r#"<a href="{}" style="color: #666; text-decoration: none;">{}</a>"#,
            item.source_url,
            Self::escape_html(&item.source_name())
        );
        if let Some(date) = Self::format_date(&item.published) {
            meta.push_str(&format!(" • {}", date));
        }

        let summary = Self::escape_html(&item.summary);

        template::fill(
            ARTICLE_TEMPLATE,
            &[
                ("IMAGE", image.as_str()),
                ("TITLE", title.as_str()),
                ("SUMMARY", summary.as_str()),
                ("META", meta.as_str()),
            ],
        )
    }

    fn trending_section(trending: &[SummaryResult]) -> String {
        if trending.is_empty() {
            return String::new();
        }

        let mut html = String::from(r#"<div class="more"><h3>Trending GitHub Repositories</h3>"#);
        for item in trending {
            html.push_str(&Self::render_article(item, false));
        }
        html.push_str(r#"</div><div class="divider"></div>"#);
        html
    }

    /// Fill the email template.
    ///
    /// The hero is the override if given, else the top general story, else a
    /// "No news today" placeholder. The articles block lists the remaining
    /// general stories up to `digest_count` in total.
    pub fn generate_html(
        html_template: &str,
        general: &[SummaryResult],
        trending: &[SummaryResult],
        options: &RenderOptions<'_>,
    ) -> String {
        let placeholder = SummaryResult::placeholder_hero();
        let (hero, rest): (&SummaryResult, &[SummaryResult]) = match options.hero_override {
            Some(hero) => (hero, general),
            None => match general.split_first() {
                Some((hero, rest)) => (hero, rest),
                None => (&placeholder, &[]),
            },
        };

        let mut hero_source = format!(
            r#"<a href="{}" style="text-decoration: none; color: inherit;">{}</a>"#,
            hero.source_url,
            Self::escape_html(&hero.source_name())
        );
        if !hero.published.is_empty() {
            let date = Self::format_date(&hero.published).unwrap_or_else(|| hero.published.clone());
            hero_source.push_str(&format!(" • {}", date));
        }

        let articles: String = rest
            .iter()
            .take(options.digest_count.saturating_sub(1))
            .map(|item| Self::render_article(item, true))
            .collect();

        let date = options.generated_at.format("%A, %B %d, %Y").to_string();
        let hero_title = Self::escape_html(&hero.title);
        let hero_image = Self::image_tag(hero);
        let hero_summary = Self::escape_html(&hero.summary);
        let trending_html = Self::trending_section(trending);

        let html = template::fill(
            html_template,
            &[
                ("DATE", date.as_str()),
                ("HERO_TITLE", hero_title.as_str()),
                ("HERO_SOURCE", hero_source.as_str()),
                ("HERO_IMAGE", hero_image.as_str()),
                ("HERO_SUMMARY", hero_summary.as_str()),
                ("HERO_URL", hero.url.as_str()),
                ("GITHUB_SECTION", trending_html.as_str()),
            ],
        );

        template::replace_block(&html, "ARTICLES", &articles)
    }

    /// Render both documents: `(markdown, html)`
    pub fn render(
        html_template: &str,
        general: &[SummaryResult],
        trending: &[SummaryResult],
        options: &RenderOptions<'_>,
    ) -> (String, String) {
        let markdown = Self::generate_markdown(general, trending, options.digest_count);
        let html = Self::generate_html(html_template, general, trending, options);
        (markdown, html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const TEMPLATE: &str = "<h1>{{DATE}}</h1>\
<div class=\"hero\">{{HERO_IMAGE}}<h2><a href=\"{{HERO_URL}}\">{{HERO_TITLE}}</a></h2>\
<p>{{HERO_SOURCE}}</p><p>{{HERO_SUMMARY}}</p></div>\
{{GITHUB_SECTION}}\
<div class=\"list\">\n{{#ARTICLES}}\n<div class=\"article\">sample</div>\n{{/ARTICLES}}\n</div>";

    fn story(title: &str, url: &str, score: i64) -> SummaryResult {
        SummaryResult {
            title: title.to_string(),
            url: url.to_string(),
            urls: vec![url.to_string()],
            summary: format!("Summary of {}", title),
            image_url: None,
            score,
            source_title: "Tech Daily".to_string(),
            source_url: "https://techdaily.example".to_string(),
            published: "2026-02-01T15:30:00Z".to_string(),
        }
    }

    fn options<'a>(count: usize) -> RenderOptions<'a> {
        RenderOptions::new(count, Utc.with_ymd_and_hms(2026, 2, 1, 12, 0, 0).unwrap())
    }

    // ==================== Date Formatting Tests ====================

    #[test]
    fn test_format_date_rfc2822() {
        assert_eq!(
            DigestGenerator::format_date("Sun, 01 Feb 2026 15:30:00 +0100").as_deref(),
            Some("Feb 01, 15:30")
        );
    }

    #[test]
    fn test_format_date_rfc2822_gmt() {
        assert_eq!(
            DigestGenerator::format_date("Mon, 2 Feb 2026 08:05:00 GMT").as_deref(),
            Some("Feb 02, 08:05")
        );
    }

    #[test]
    fn test_format_date_iso() {
        assert_eq!(
            DigestGenerator::format_date("2026-02-01T15:30:00Z").as_deref(),
            Some("Feb 01, 15:30")
        );
        assert_eq!(
            DigestGenerator::format_date("2026-02-01T15:30:00.268-05:00").as_deref(),
            Some("Feb 01, 15:30")
        );
        assert_eq!(
            DigestGenerator::format_date("2026-02-01 09:15:00").as_deref(),
            Some("Feb 01, 09:15")
        );
    }

    #[test]
    fn test_format_date_date_only() {
        assert_eq!(
            DigestGenerator::format_date("2026-02-01").as_deref(),
            Some("Feb 01, 00:00")
        );
    }

    #[test]
    fn test_format_date_invalid() {
        assert_eq!(DigestGenerator::format_date("not a date"), None);
        assert_eq!(DigestGenerator::format_date(""), None);
    }

    // ==================== HTML Escaping Tests ====================

    #[test]
    fn test_escape_html_combined() {
        assert_eq!(
            DigestGenerator::escape_html("<a href=\"x\">It's A & B</a>"),
            "&lt;a href=&quot;x&quot;&gt;It&#x27;s A &amp; B&lt;/a&gt;"
        );
    }

    // ==================== Markdown Tests ====================

    #[test]
    fn test_markdown_sections() {
        let general = vec![story("One", "https://a.com/1", 9), story("Two", "https://a.com/2", 5)];
        let trending = vec![story("repo/x", "https://github.com/repo/x", 1)];

        let md = DigestGenerator::generate_markdown(&general, &trending, 10);

        assert!(md.starts_with("# Your Daily Digest\n\n## Top Stories\n\n"));
        assert!(md.contains("### One\nSummary of One\nhttps://a.com/1\n\n"));
        assert!(md.contains("## Trending GitHub Repos\n\n### repo/x\n"));
    }

    #[test]
    fn test_markdown_truncates_general_only() {
        let general: Vec<SummaryResult> = (0..5)
            .map(|i| story(&format!("G{}", i), &format!("https://g.com/{}", i), 0))
            .collect();
        let trending: Vec<SummaryResult> = (0..4)
            .map(|i| story(&format!("T{}", i), &format!("https://t.com/{}", i), 0))
            .collect();

        let md = DigestGenerator::generate_markdown(&general, &trending, 2);

        assert_eq!(md.matches("### G").count(), 2);
        assert_eq!(md.matches("### T").count(), 4);
    }

    #[test]
    fn test_markdown_empty_has_no_top_stories() {
        let md = DigestGenerator::generate_markdown(&[], &[], 10);
        assert_eq!(md, "# Your Daily Digest\n\n");
    }

    #[test]
    fn test_markdown_is_not_escaped() {
        let general = vec![story("A <b> & C", "https://a.com", 0)];
        let md = DigestGenerator::generate_markdown(&general, &[], 10);
        assert!(md.contains("### A <b> & C\n"));
    }

    // ==================== HTML Generation Tests ====================

    #[test]
    fn test_html_hero_and_articles() {
        let general = vec![
            story("Hero", "https://a.com/hero", 9),
            story("Second", "https://a.com/2", 7),
            story("Third", "https://a.com/3", 5),
        ];

        let html = DigestGenerator::generate_html(TEMPLATE, &general, &[], &options(10));

        assert!(html.contains("<h1>Sunday, February 01, 2026</h1>"));
        assert!(html.contains("<a href=\"https://a.com/hero\">Hero</a>"));
        assert!(html.contains(
            "<a href=\"https://techdaily.example\" style=\"text-decoration: none; color: inherit;\">Tech Daily</a> • Feb 01, 15:30"
        ));
        assert!(html.contains("<h4><a href=\"https://a.com/2\">Second</a></h4>"));
        assert!(html.contains("<h4><a href=\"https://a.com/3\">Third</a></h4>"));
        assert!(!html.contains("<h4><a href=\"https://a.com/hero\">"));
        assert!(!html.contains("{{#ARTICLES}}"));
        assert!(!html.contains("sample"));
        assert!(!html.contains("{{GITHUB_SECTION}}"));
    }

    #[test]
    fn test_html_article_fragment_shape() {
        let mut second = story("Second", "https://a.com/2", 7);
        second.image_url = Some("https://img.example/2.png".to_string());
        let general = vec![story("Hero", "https://a.com/hero", 9), second];

        let html = DigestGenerator::generate_html(TEMPLATE, &general, &[], &options(10));

        assert!(html.contains(
            "<div class=\"article\"><img src=\"https://img.example/2.png\" alt=\"Second\"><h4><a href=\"https://a.com/2\">Second</a></h4><p class=\"meta\"><a href=\"https://techdaily.example\" style=\"color: #666; text-decoration: none;\">Tech Daily</a> • Feb 01, 15:30</p><p>Summary of Second</p></div>"
        ));
    }

    #[test]
    fn test_html_respects_digest_count() {
        let general: Vec<SummaryResult> = (0..6)
            .map(|i| story(&format!("S{}", i), &format!("https://s.com/{}", i), 0))
            .collect();

        let html = DigestGenerator::generate_html(TEMPLATE, &general, &[], &options(3));

        // Hero plus two listed articles
        assert_eq!(html.matches("<div class=\"article\">").count(), 2);
        assert!(html.contains("https://s.com/2"));
        assert!(!html.contains("https://s.com/3"));
    }

    #[test]
    fn test_html_escapes_once() {
        let mut hero = story("Tom & Jerry <live>", "https://a.com/?a=1&b=2", 1);
        hero.summary = "5 < 6 & 7".to_string();

        let html = DigestGenerator::generate_html(TEMPLATE, &[hero], &[], &options(10));

        assert!(html.contains("Tom &amp; Jerry &lt;live&gt;"));
        assert!(html.contains("5 &lt; 6 &amp; 7"));
        assert!(!html.contains("&amp;amp;"));
        // URLs go in verbatim
        assert!(html.contains("href=\"https://a.com/?a=1&b=2\""));
    }

    #[test]
    fn test_html_empty_uses_placeholder_hero() {
        let html = DigestGenerator::generate_html(TEMPLATE, &[], &[], &options(10));

        assert!(html.contains("<a href=\"#\">No news today</a>"));
        assert!(html.contains(">System</a></p>"));
        assert!(html.contains("<div class=\"list\">\n\n</div>"));
    }

    #[test]
    fn test_html_trending_section() {
        let mut repo = story("owner/repo", "https://github.com/owner/repo", 3);
        repo.image_url = Some("https://img.example/repo.png".to_string());

        let html = DigestGenerator::generate_html(
            TEMPLATE,
            &[story("Hero", "https://a.com", 1)],
            &[repo],
            &options(10),
        );

        assert!(html.contains("<div class=\"more\"><h3>Trending GitHub Repositories</h3><div class=\"article\"><h4>"));
        assert!(html.contains("</div><div class=\"divider\"></div>"));
        // Trending entries never show images
        assert!(!html.contains("repo.png"));
    }

    #[test]
    fn test_html_unparseable_dates() {
        let mut hero = story("Hero", "https://a.com/1", 2);
        hero.published = "sometime yesterday".to_string();
        let mut second = story("Second", "https://a.com/2", 1);
        second.published = "sometime yesterday".to_string();

        let html = DigestGenerator::generate_html(TEMPLATE, &[hero, second], &[], &options(10));

        // Hero keeps the raw string, articles drop the date
        assert!(html.contains("Tech Daily</a> • sometime yesterday</p><p>Summary of Hero"));
        assert!(html.contains("Tech Daily</a></p><p>Summary of Second</p>"));
    }

    #[test]
    fn test_html_hero_override() {
        let pinned = story("Pinned", "https://pinned.com", 0);
        let general = vec![story("Top", "https://a.com/1", 9), story("Next", "https://a.com/2", 5)];
        let mut opts = options(2);
        opts.hero_override = Some(&pinned);

        let html = DigestGenerator::generate_html(TEMPLATE, &general, &[], &opts);

        assert!(html.contains("<a href=\"https://pinned.com\">Pinned</a>"));
        assert!(html.contains("<h4><a href=\"https://a.com/1\">Top</a></h4>"));
        assert!(!html.contains("https://a.com/2"));
    }

    #[test]
    fn test_render_returns_both_documents() {
        let general = vec![story("Hero", "https://a.com", 1)];
        let (md, html) = DigestGenerator::render(TEMPLATE, &general, &[], &options(10));

        assert!(md.contains("### Hero"));
        assert!(html.contains("Summary of Hero"));
    }
}
