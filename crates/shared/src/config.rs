use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.deepseek.com";
const DEFAULT_MODEL: &str = "deepseek-reasoner";

pub const SYSTEM_PROMPT_FILE: &str = "ai_system_prompt.txt";
pub const PROMPT_TEMPLATE_FILE: &str = "ai_prompt.txt";
pub const TRENDING_SYSTEM_PROMPT_FILE: &str = "ai_github_system_prompt.txt";
pub const HTML_TEMPLATE_FILE: &str = "email_template.html";
pub const CONFIG_FILE: &str = "config.json";

/// Connection settings for the language-model endpoint
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout: Duration,
    /// Maximum number of completion requests in flight
    pub concurrency: usize,
}

impl LlmSettings {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 4000,
            timeout: Duration::from_secs(120),
            concurrency: 1,
        }
    }

    pub fn from_env() -> Result<Self> {
        // Try to load .env from multiple locations
        Self::try_load_dotenv();

        let api_key = env::var("DEEPSEEK_API_KEY").context(
            "DEEPSEEK_API_KEY not found.\n\n\
            To fix this, export it or create ~/.config/news-digest/.env with:\n  \
            DEEPSEEK_API_KEY=your_key_here",
        )?;

        let mut settings = Self::new(api_key);

        if let Ok(base_url) = env::var("DEEPSEEK_BASE_URL") {
            settings.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Ok(model) = env::var("DEEPSEEK_MODEL") {
            settings.model = model;
        }
        if let Some(concurrency) = env::var("DIGEST_CONCURRENCY")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|n| *n > 0)
        {
            settings.concurrency = concurrency;
        }

        Ok(settings)
    }

    fn try_load_dotenv() {
        // 1. Current directory
        if dotenvy::dotenv().is_ok() {
            return;
        }

        // 2. ~/.config/news-digest/.env
        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("news-digest").join(".env");
            if config_path.exists() && dotenvy::from_path(&config_path).is_ok() {
                return;
            }
        }

        // 3. ~/.env
        if let Some(home_dir) = dirs::home_dir() {
            let home_path = home_dir.join(".env");
            if home_path.exists() {
                let _ = dotenvy::from_path(&home_path);
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    topics: Option<Vec<String>>,
    #[serde(default)]
    limits: Limits,
}

#[derive(Debug, Default, Deserialize)]
struct Limits {
    final_digest_count: Option<usize>,
}

/// Everything one digest run needs, loaded once and passed down read-only
#[derive(Debug, Clone)]
pub struct DigestConfig {
    pub topics: Vec<String>,
    pub final_digest_count: usize,
    /// System prompt text with a `{topics}` placeholder
    pub system_prompt: String,
    /// User prompt with `{articles}` and `{topics}` placeholders
    pub prompt_template: String,
    /// Used verbatim for the trending stream when present
    pub trending_system_prompt: Option<String>,
    pub html_template: String,
    pub llm: LlmSettings,
}

impl DigestConfig {
    pub fn default_topics() -> Vec<String> {
        vec!["AI".to_string(), "Technology".to_string(), "Startup".to_string()]
    }

    /// Load `config.json`, the prompt files and the HTML template from `dir`.
    ///
    /// `config.json` and the trending prompt are optional; the other files
    /// are required and their absence aborts the run.
    pub fn load(dir: &Path, llm: LlmSettings) -> Result<Self> {
        let config_path = dir.join(CONFIG_FILE);
        let file: ConfigFile = if config_path.exists() {
            let content = fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read {}", config_path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {}", config_path.display()))?
        } else {
            ConfigFile::default()
        };

        let system_prompt = read_required(dir, SYSTEM_PROMPT_FILE)?.trim().to_string();
        let prompt_template = read_required(dir, PROMPT_TEMPLATE_FILE)?.trim().to_string();
        let html_template = read_required(dir, HTML_TEMPLATE_FILE)?;

        let trending_path = dir.join(TRENDING_SYSTEM_PROMPT_FILE);
        let trending_system_prompt = if trending_path.exists() {
            let content = fs::read_to_string(&trending_path)
                .with_context(|| format!("Failed to read {}", trending_path.display()))?;
            Some(content.trim().to_string())
        } else {
            None
        };

        Ok(Self {
            topics: file.topics.unwrap_or_else(Self::default_topics),
            final_digest_count: file.limits.final_digest_count.unwrap_or(10),
            system_prompt,
            prompt_template,
            trending_system_prompt,
            html_template,
            llm,
        })
    }

    pub fn topics_str(&self) -> String {
        self.topics.join(", ")
    }
}

fn read_required(dir: &Path, name: &str) -> Result<String> {
    let path = dir.join(name);
    if !path.exists() {
        anyhow::bail!("Required file not found: {}", path.display());
    }
    fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_required(dir: &Path) {
        fs::write(dir.join(SYSTEM_PROMPT_FILE), "  Filter for {topics}.\n").unwrap();
        fs::write(dir.join(PROMPT_TEMPLATE_FILE), "{articles}\n\nTopics: {topics}\n").unwrap();
        fs::write(dir.join(HTML_TEMPLATE_FILE), "<html>{{DATE}}</html>\n").unwrap();
    }

    #[test]
    fn test_load_defaults_without_config_json() {
        let dir = tempfile::tempdir().unwrap();
        write_required(dir.path());

        let config = DigestConfig::load(dir.path(), LlmSettings::new("key")).unwrap();

        assert_eq!(config.topics, vec!["AI", "Technology", "Startup"]);
        assert_eq!(config.final_digest_count, 10);
        assert_eq!(config.system_prompt, "Filter for {topics}.");
        assert_eq!(config.prompt_template, "{articles}\n\nTopics: {topics}");
        // Template is kept byte for byte
        assert_eq!(config.html_template, "<html>{{DATE}}</html>\n");
        assert!(config.trending_system_prompt.is_none());
    }

    #[test]
    fn test_load_reads_config_json() {
        let dir = tempfile::tempdir().unwrap();
        write_required(dir.path());
        fs::write(
            dir.path().join(CONFIG_FILE),
            r#"{"topics": ["Rust", "Linux"], "limits": {"final_digest_count": 5, "articles_per_feed": 3}}"#,
        )
        .unwrap();
        fs::write(dir.path().join(TRENDING_SYSTEM_PROMPT_FILE), "Rate repos.\n").unwrap();

        let config = DigestConfig::load(dir.path(), LlmSettings::new("key")).unwrap();

        assert_eq!(config.topics_str(), "Rust, Linux");
        assert_eq!(config.final_digest_count, 5);
        assert_eq!(config.trending_system_prompt.as_deref(), Some("Rate repos."));
    }

    #[test]
    fn test_load_missing_template_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write_required(dir.path());
        fs::remove_file(dir.path().join(HTML_TEMPLATE_FILE)).unwrap();

        let err = DigestConfig::load(dir.path(), LlmSettings::new("key")).unwrap_err();
        assert!(err.to_string().contains(HTML_TEMPLATE_FILE));
    }

    #[test]
    fn test_load_malformed_config_json_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write_required(dir.path());
        fs::write(dir.path().join(CONFIG_FILE), "{not json").unwrap();

        assert!(DigestConfig::load(dir.path(), LlmSettings::new("key")).is_err());
    }

    #[test]
    fn test_llm_settings_defaults() {
        let settings = LlmSettings::new("key");
        assert_eq!(settings.base_url, "https://api.deepseek.com");
        assert_eq!(settings.model, "deepseek-reasoner");
        assert_eq!(settings.max_tokens, 4000);
        assert_eq!(settings.concurrency, 1);
    }
}
