use serde::Deserialize;
use std::time::Duration;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: i64 = 8080;
const DEFAULT_GOOGLE_BOOKS_BASE_URL: &str = "https://www.googleapis.com/books/v1";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TIMEOUT_SECONDS: i64 = 30;
const DEFAULT_RETRY_ATTEMPTS: i64 = 2;
const DEFAULT_CATALOG_PAGE_SIZE: i64 = 40;
const DEFAULT_RESULT_LIMIT: i64 = 3;
const DEFAULT_EMBEDDING_CACHE_TTL_SECONDS: i64 = 300;

/// Application configuration, read from `APP_*` environment variables.
///
/// Credentials for the catalog and OpenAI are optional: when one is missing the
/// feature that depends on it degrades instead of preventing start-up.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub supabase_url: String,
    pub supabase_key: String,
    #[serde(default)]
    pub google_books_api_key: Option<String>,
    pub google_books_base_url: String,
    #[serde(default)]
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub embedding_model: String,
    pub chat_model: String,
    pub request_timeout_secs: u64,
    pub external_service_retries: u32,
    pub catalog_page_size: usize,
    pub result_limit: usize,
    pub embedding_cache_ttl_secs: u64,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn load() -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .set_default("host", DEFAULT_HOST)?
            .set_default("port", DEFAULT_PORT)?
            .set_default("google_books_base_url", DEFAULT_GOOGLE_BOOKS_BASE_URL)?
            .set_default("openai_base_url", DEFAULT_OPENAI_BASE_URL)?
            .set_default("embedding_model", DEFAULT_EMBEDDING_MODEL)?
            .set_default("chat_model", DEFAULT_CHAT_MODEL)?
            .set_default("request_timeout_secs", DEFAULT_TIMEOUT_SECONDS)?
            .set_default("external_service_retries", DEFAULT_RETRY_ATTEMPTS)?
            .set_default("catalog_page_size", DEFAULT_CATALOG_PAGE_SIZE)?
            .set_default("result_limit", DEFAULT_RESULT_LIMIT)?
            .set_default(
                "embedding_cache_ttl_secs",
                DEFAULT_EMBEDDING_CACHE_TTL_SECONDS,
            )?
            .add_source(config::Environment::with_prefix("APP").try_parsing(true))
            .build()?;

        let mut config: Config = settings.try_deserialize()?;
        config.google_books_api_key = non_blank(config.google_books_api_key);
        config.openai_api_key = non_blank(config.openai_api_key);

        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn embedding_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.embedding_cache_ttl_secs)
    }
}

#[cfg(test)]
impl Config {
    /// Configuration with every external service unconfigured.
    pub fn for_tests() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: 0,
            supabase_url: "http://127.0.0.1:9".to_string(),
            supabase_key: "test-key".to_string(),
            google_books_api_key: None,
            google_books_base_url: DEFAULT_GOOGLE_BOOKS_BASE_URL.to_string(),
            openai_api_key: None,
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            request_timeout_secs: 1,
            external_service_retries: 1,
            catalog_page_size: DEFAULT_CATALOG_PAGE_SIZE as usize,
            result_limit: DEFAULT_RESULT_LIMIT as usize,
            embedding_cache_ttl_secs: DEFAULT_EMBEDDING_CACHE_TTL_SECONDS as u64,
        }
    }
}

// An empty variable in a .env file means "not configured".
fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_credentials_are_treated_as_missing() {
        assert_eq!(non_blank(Some("   ".to_string())), None);
        assert_eq!(non_blank(None), None);
        assert_eq!(
            non_blank(Some("sk-test".to_string())),
            Some("sk-test".to_string())
        );
    }
}
