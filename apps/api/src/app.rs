use crate::{
    config::Config,
    error::Result,
    ml::{EmbeddingProvider, OpenAiEmbedder},
    routes::api_routes,
    services::{
        CatalogSearch, GoogleBooksClient, OpenAiChat, RecommendationService, SupabaseClient,
        TextGenerator, TrackingService,
    },
};
use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use log::{info, warn};
use std::net::TcpListener;
use std::sync::Arc;

pub struct Application {
    port: u16,
    host: String,
    config: Config,
}

impl Application {
    /// Create a new application instance
    pub fn new(config: &Config) -> Self {
        Self {
            port: config.port,
            host: config.host.clone(),
            config: config.clone(),
        }
    }

    /// Build and run the server
    pub async fn run(&self) -> Result<()> {
        let bind_address = format!("{}:{}", self.host, self.port);
        let listener = TcpListener::bind(&bind_address)?;
        info!("Starting server at http://{}", bind_address);

        self.run_with_listener(listener).await
    }

    /// Run the server with a specific TCP listener
    pub async fn run_with_listener(&self, listener: TcpListener) -> Result<()> {
        let config = &self.config;
        if config.google_books_api_key.is_none() {
            warn!("APP_GOOGLE_BOOKS_API_KEY is not set, every search will return no books");
        }

        // Store, providers, then the services that share them
        let store = Arc::new(SupabaseClient::new(config)?);
        let generator: Arc<dyn TextGenerator> = Arc::new(OpenAiChat::new(config)?);
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(OpenAiEmbedder::new(config)?);
        let catalog = CatalogSearch::new(
            Arc::new(GoogleBooksClient::new(config)?),
            generator.clone(),
            config.catalog_page_size,
            config.result_limit,
        );

        let recommendation_service = web::Data::new(RecommendationService::new(
            catalog,
            embedder,
            generator,
            store.clone(),
        ));
        let tracking_service = web::Data::new(TrackingService::new(store.clone(), store));

        HttpServer::new(move || {
            let cors = Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header();

            App::new()
                .wrap(cors)
                .wrap(Logger::default())
                .app_data(recommendation_service.clone())
                .app_data(tracking_service.clone())
                .service(api_routes())
        })
        .listen(listener)?
        .run()
        .await?;

        Ok(())
    }
}
