use crate::config::Config;
use crate::models::{Book, BookIndexEntry, Interaction, PromptEmbeddingRecord, UserProfile};
use crate::services::outcome::{ProviderError, ProviderResult};
use crate::services::store::{InteractionStore, UserProfileStore};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

const BOOK_INDEX: &str = "book_index";
const USER_INTERACTIONS: &str = "user_interactions";
const PROMPT_EMBEDDINGS: &str = "smart_prompt_embeddings";
const USER_PROFILES: &str = "user_profiles";

/// Thin client for the Supabase PostgREST API.
#[derive(Debug, Clone)]
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl SupabaseClient {
    pub fn new(config: &Config) -> ProviderResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| {
                ProviderError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            api_key: config.supabase_key.clone(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }

    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(&str, String)],
    ) -> ProviderResult<Vec<T>> {
        let response = self
            .authorized(self.client.get(self.table_url(table)))
            .query(filters)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::ServiceUnavailable(format!(
                "Supabase select on {} failed: {}",
                table, status
            )));
        }

        Ok(response.json().await?)
    }

    pub async fn insert<T: Serialize + ?Sized>(&self, table: &str, data: &T) -> ProviderResult<()> {
        let response = self
            .authorized(self.client.post(self.table_url(table)))
            .header("Prefer", "return=minimal")
            .json(data)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::ServiceUnavailable(format!(
                "Failed to insert into {}: {}",
                table, status
            )));
        }
        Ok(())
    }

    pub async fn upsert<T: Serialize + ?Sized>(
        &self,
        table: &str,
        data: &T,
        on_conflict: &str,
    ) -> ProviderResult<()> {
        let response = self
            .authorized(self.client.post(self.table_url(table)))
            .query(&[("on_conflict", on_conflict)])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(data)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::ServiceUnavailable(format!(
                "Failed to upsert into {}: {}",
                table, status
            )));
        }
        Ok(())
    }
}

/// PostgREST `in` filter with every value quoted.
fn in_filter(values: &[String]) -> String {
    let quoted = values
        .iter()
        .map(|v| format!("\"{}\"", v.replace('"', "")))
        .collect::<Vec<_>>()
        .join(",");
    format!("in.({})", quoted)
}

#[async_trait]
impl InteractionStore for SupabaseClient {
    async fn log_interaction(&self, interaction: &Interaction) -> ProviderResult<()> {
        self.insert(USER_INTERACTIONS, interaction).await
    }

    async fn interactions_for_user(&self, user_id: &str) -> ProviderResult<Vec<Interaction>> {
        let interactions: Vec<Interaction> = self
            .select(
                USER_INTERACTIONS,
                &[
                    ("user_id", format!("eq.{}", user_id)),
                    ("deleted_at", "is.null".to_string()),
                    ("order", "created_at.desc".to_string()),
                ],
            )
            .await?;
        debug!("Loaded {} interactions for user", interactions.len());
        Ok(interactions)
    }

    async fn book_index_entries(&self, isbns: &[String]) -> ProviderResult<Vec<BookIndexEntry>> {
        let isbns: Vec<String> = isbns.iter().filter(|i| !i.is_empty()).cloned().collect();
        if isbns.is_empty() {
            return Ok(Vec::new());
        }

        self.select(BOOK_INDEX, &[("isbn_13", in_filter(&isbns))])
            .await
    }

    async fn book_exists(&self, isbn: &str) -> ProviderResult<bool> {
        let rows: Vec<serde_json::Value> = self
            .select(
                BOOK_INDEX,
                &[
                    ("isbn_13", format!("eq.{}", isbn)),
                    ("select", "isbn_13".to_string()),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(!rows.is_empty())
    }

    async fn upsert_book(&self, book: &Book) -> ProviderResult<()> {
        self.upsert(BOOK_INDEX, book, "isbn_13").await
    }

    async fn store_prompt_embedding(&self, record: &PromptEmbeddingRecord) -> ProviderResult<()> {
        self.insert(PROMPT_EMBEDDINGS, record).await
    }
}

#[async_trait]
impl UserProfileStore for SupabaseClient {
    async fn user_profile(&self, user_id: &str) -> ProviderResult<Option<UserProfile>> {
        let mut profiles: Vec<UserProfile> = self
            .select(
                USER_PROFILES,
                &[
                    ("id", format!("eq.{}", user_id)),
                    (
                        "select",
                        "id,smart_mode_enabled,preferred_discovery_mode".to_string(),
                    ),
                ],
            )
            .await?;
        Ok(profiles.pop())
    }
}
