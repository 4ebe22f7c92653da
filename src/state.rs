// Shared state handed to every request handler
use crate::config::SummaryDefaults;
use crate::models::ModelProvider;
use crate::services::{SharedModelCache, SummarizationService, TranslationService};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub translation: TranslationService,
    pub summarization: SummarizationService,
    pub cache: Arc<SharedModelCache>,
}

impl AppState {
    /// Build both services over one model cache.
    pub fn new(provider: Arc<dyn ModelProvider>, summary_defaults: SummaryDefaults) -> Self {
        let cache = Arc::new(SharedModelCache::new());
        Self {
            translation: TranslationService::new(cache.clone(), provider.clone()),
            summarization: SummarizationService::new(cache.clone(), provider, summary_defaults),
            cache,
        }
    }
}
