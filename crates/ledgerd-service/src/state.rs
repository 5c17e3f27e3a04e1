//! Application state.

use std::sync::Arc;

use ledgerd_store::RocksStore;

use crate::config::ServiceConfig;
use crate::generator::{HttpImageGenerator, ImageGenerator};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The storage backend.
    pub store: Arc<RocksStore>,

    /// Service configuration.
    pub config: ServiceConfig,

    /// Image generator backend (optional).
    pub generator: Option<Arc<dyn ImageGenerator>>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(store: Arc<RocksStore>, config: ServiceConfig) -> Self {
        // Create generator client if configured
        let generator: Option<Arc<dyn ImageGenerator>> =
            config.generator_url.as_ref().map(|url| {
                tracing::info!(generator_url = %url, "Image generator backend enabled");
                Arc::new(HttpImageGenerator::new(url, config.generator_api_key.clone()))
                    as Arc<dyn ImageGenerator>
            });

        if generator.is_none() {
            tracing::warn!("Image generator not configured - image edits will be rejected");
        }

        Self {
            store,
            config,
            generator,
        }
    }

    /// Replace the generator backend (used by tests to inject stubs).
    #[must_use]
    pub fn with_generator(mut self, generator: Arc<dyn ImageGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }
}
