use crate::error::{ApiError, Result};
use crate::models::{
    BatchReport, Book, DiscoveryMode, Interaction, InteractionType, TrackInteractionRequest,
    ViewportBatchRequest, ViewportEvent,
};
use crate::services::outcome::ProviderResult;
use crate::services::store::{InteractionStore, UserProfileStore};
use chrono::Utc;
use futures::future::join_all;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

const VIEWPORT_SIGNAL: f64 = 0.05;

/// Writes explicit and implicit user signals to the interaction store.
pub struct TrackingService {
    interactions: Arc<dyn InteractionStore>,
    profiles: Arc<dyn UserProfileStore>,
}

impl TrackingService {
    pub fn new(
        interactions: Arc<dyn InteractionStore>,
        profiles: Arc<dyn UserProfileStore>,
    ) -> Self {
        Self {
            interactions,
            profiles,
        }
    }

    pub async fn track_interaction(&self, request: TrackInteractionRequest) -> Result<Interaction> {
        if request.book_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("Book ID required".to_string()));
        }

        let book = with_isbn(request.book_data, &request.book_id);
        self.ensure_indexed(&book).await;

        let (interaction_type, signal) = request.interaction_type.signal();
        let mut interaction = Interaction::record(
            request.user_id,
            interaction_type,
            signal,
            request.book_id,
            &book,
        );
        interaction.session_id = request.session_id;
        interaction.position_in_results = request.position_in_results;
        interaction.discovery_context = request.discovery_context;

        self.interactions.log_interaction(&interaction).await?;
        info!(
            "Tracked {:?} (signal {}) for '{}'",
            interaction_type, signal, book.title
        );
        Ok(interaction)
    }

    /// Log a batch of viewport events as `viewed` interactions.
    ///
    /// Events are written concurrently and independently; the report carries
    /// the failures rather than failing the batch.
    pub async fn track_viewport_batch(&self, batch: ViewportBatchRequest) -> Result<BatchReport> {
        if batch.events.is_empty() {
            return Err(ApiError::InvalidInput("No events to process".to_string()));
        }

        if self.profiles.user_profile(&batch.user_id).await?.is_none() {
            return Err(ApiError::NotFound("User profile not found".to_string()));
        }

        if batch.current_mode != DiscoveryMode::Smart {
            return Err(ApiError::Forbidden(
                "Viewport tracking is only available in Smart mode".to_string(),
            ));
        }

        let context = json!({
            "tracking_type": "viewport",
            "batch_size": batch.events.len(),
            "timestamp": Utc::now().to_rfc3339(),
        });
        let results = join_all(
            batch
                .events
                .iter()
                .map(|event| self.log_view(&batch.user_id, &batch.session_id, &context, event)),
        )
        .await;

        let report = BatchReport::from_results(&results);
        if report.is_complete() {
            debug!("Viewport batch of {} events logged", report.total_count);
        } else {
            warn!(
                "Viewport batch: {} of {} events failed",
                report.failed_count, report.total_count
            );
        }
        Ok(report)
    }

    async fn log_view(
        &self,
        user_id: &str,
        session_id: &str,
        context: &serde_json::Value,
        event: &ViewportEvent,
    ) -> ProviderResult<()> {
        let book = with_isbn(event.book_data.clone(), &event.book_id);
        self.ensure_indexed(&book).await;

        let mut interaction = Interaction::record(
            user_id,
            InteractionType::Viewed,
            VIEWPORT_SIGNAL,
            event.book_id.clone(),
            &book,
        );
        interaction.session_id = Some(session_id.to_string());
        interaction.view_duration_ms = event.duration_ms;
        interaction.scroll_depth_percent = event.scroll_depth_percent;
        interaction.position_in_results = event.position_in_results;
        interaction.discovery_context = Some(context.clone());

        self.interactions.log_interaction(&interaction).await
    }

    /// Add the book to the index unless it is already there. Failure is logged
    /// and does not block the interaction itself.
    async fn ensure_indexed(&self, book: &Book) {
        let result = match self.interactions.book_exists(&book.isbn_13).await {
            Ok(true) => Ok(()),
            Ok(false) => self.interactions.upsert_book(book).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            warn!("Could not add '{}' to the book index: {}", book.title, e);
        }
    }
}

fn with_isbn(mut book: Book, book_id: &str) -> Book {
    if book.isbn_13.is_empty() {
        book.isbn_13 = book_id.to_string();
    }
    book
}
