use super::{cache_key, SharedModelCache};
use crate::error::{ServiceError, ServiceResult};
use crate::language::{Language, LanguagePair};
use crate::models::{ModelHandle, ModelProvider, TranslationModel};
use log::{info, warn};
use std::sync::Arc;

/// Translates between supported languages, pivoting through English when a
/// pair has no direct model.
#[derive(Clone)]
pub struct TranslationService {
    cache: Arc<SharedModelCache>,
    provider: Arc<dyn ModelProvider>,
}

impl TranslationService {
    pub fn new(cache: Arc<SharedModelCache>, provider: Arc<dyn ModelProvider>) -> Self {
        Self { cache, provider }
    }

    pub fn translate(
        &self,
        text: &str,
        source: Language,
        target: Language,
    ) -> ServiceResult<String> {
        let pair = LanguagePair::new(source, target);
        match self.direct_translate(text, pair) {
            Ok(translated) => Ok(translated),
            Err(err @ (ServiceError::ModelUnavailable { .. } | ServiceError::Inference { .. })) => {
                // through English the pivot would only repeat this request
                if source == Language::PIVOT || target == Language::PIVOT {
                    return Err(err);
                }
                warn!(
                    "Direct translation {} failed ({}), translating via {}",
                    pair,
                    err,
                    Language::PIVOT
                );
                self.translate_via_pivot(text, pair)
            }
            Err(err) => Err(err),
        }
    }

    /// Translate with the model for exactly `pair`, loading it on first use.
    pub fn direct_translate(&self, text: &str, pair: LanguagePair) -> ServiceResult<String> {
        let (model_id, model) = self.model(pair)?;
        model
            .translate(text)
            .map_err(|err| ServiceError::inference(model_id, err))
    }

    fn translate_via_pivot(&self, text: &str, pair: LanguagePair) -> ServiceResult<String> {
        let intermediate =
            self.direct_translate(text, LanguagePair::new(pair.source, Language::PIVOT))?;
        self.direct_translate(&intermediate, LanguagePair::new(Language::PIVOT, pair.target))
    }

    fn model(&self, pair: LanguagePair) -> ServiceResult<(String, Arc<dyn TranslationModel>)> {
        let model_id = self.provider.translation_model_id(pair);
        let handle = self
            .cache
            .get_or_load(&cache_key("translation", &model_id), || {
                info!("Loading translation model {} for {}", model_id, pair);
                self.provider
                    .load_translation(pair)
                    .map(ModelHandle::Translation)
                    .map_err(|err| ServiceError::unavailable(&model_id, err))
            })?;

        match handle {
            ModelHandle::Translation(model) => Ok((model_id, model)),
            ModelHandle::Summarization(_) => Err(ServiceError::ModelUnavailable {
                model_id,
                reason: "cached under a summarization model".to_string(),
            }),
        }
    }
}
