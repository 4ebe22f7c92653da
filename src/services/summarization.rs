use super::{cache_key, SharedModelCache};
use crate::config::SummaryDefaults;
use crate::error::{ServiceError, ServiceResult};
use crate::models::{ModelHandle, ModelProvider, SummarizationModel};
use log::info;
use std::sync::Arc;

/// Summarizes text with the single configured model. Decoding is greedy, so
/// identical input and bounds give identical output.
#[derive(Clone)]
pub struct SummarizationService {
    cache: Arc<SharedModelCache>,
    provider: Arc<dyn ModelProvider>,
    defaults: SummaryDefaults,
}

impl SummarizationService {
    pub fn new(
        cache: Arc<SharedModelCache>,
        provider: Arc<dyn ModelProvider>,
        defaults: SummaryDefaults,
    ) -> Self {
        Self {
            cache,
            provider,
            defaults,
        }
    }

    pub fn defaults(&self) -> SummaryDefaults {
        self.defaults
    }

    pub fn summarize(
        &self,
        text: &str,
        max_length: usize,
        min_length: usize,
    ) -> ServiceResult<String> {
        if min_length > max_length {
            return Err(ServiceError::InvalidRequest(format!(
                "min_length ({min_length}) is greater than max_length ({max_length})"
            )));
        }

        let (model_id, model) = self.model()?;
        model
            .summarize(text, max_length, min_length)
            .map_err(|err| ServiceError::inference(model_id, err))
    }

    pub fn summarize_with_defaults(&self, text: &str) -> ServiceResult<String> {
        self.summarize(text, self.defaults.max_length, self.defaults.min_length)
    }

    fn model(&self) -> ServiceResult<(String, Arc<dyn SummarizationModel>)> {
        let model_id = self.provider.summarization_model_id();
        let handle = self
            .cache
            .get_or_load(&cache_key("summarization", &model_id), || {
                info!("Loading summarization model {}", model_id);
                self.provider
                    .load_summarization()
                    .map(ModelHandle::Summarization)
                    .map_err(|err| ServiceError::unavailable(&model_id, err))
            })?;

        match handle {
            ModelHandle::Summarization(model) => Ok((model_id, model)),
            ModelHandle::Translation(_) => Err(ServiceError::ModelUnavailable {
                model_id,
                reason: "cached under a translation model".to_string(),
            }),
        }
    }
}
