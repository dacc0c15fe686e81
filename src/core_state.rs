//! Shared application state handed to every HTTP handler.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::pipeline::analysis::{AnalysisError, CarAnalyzer};
use crate::store::{CollectionRepository, HistoryRepository, JsonCollectionStore, JsonHistoryStore};

/// Everything a request needs: the pipeline and the two stores.
///
/// Built once at startup and wrapped in `Arc`.
pub struct CoreState {
    pub config: AppConfig,
    pub analyzer: Arc<CarAnalyzer>,
    pub history: Arc<dyn HistoryRepository>,
    pub collections: Arc<dyn CollectionRepository>,
}

impl CoreState {
    /// Production state: Gemini-backed analyzer and JSON stores under
    /// the configured data directory.
    ///
    /// Builds a blocking HTTP client, so call it outside the async runtime.
    pub fn from_config(config: AppConfig) -> Result<Self, AnalysisError> {
        let analyzer = CarAnalyzer::from_config(&config)?;
        let history = JsonHistoryStore::new(config.history_path());
        let collections = JsonCollectionStore::new(config.collections_path());

        tracing::info!(
            data_dir = %config.data_dir.display(),
            api_key = %config.redacted_key(),
            "Application state ready"
        );

        Ok(Self {
            config,
            analyzer: Arc::new(analyzer),
            history: Arc::new(history),
            collections: Arc::new(collections),
        })
    }

    /// State from explicit parts (tests, alternative backends).
    pub fn with_parts(
        config: AppConfig,
        analyzer: CarAnalyzer,
        history: Arc<dyn HistoryRepository>,
        collections: Arc<dyn CollectionRepository>,
    ) -> Self {
        Self {
            config,
            analyzer: Arc::new(analyzer),
            history,
            collections,
        }
    }
}
