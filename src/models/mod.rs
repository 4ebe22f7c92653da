// Inference models and the provider that loads them from the hub
pub(crate) mod generation;
pub mod marian;
pub mod t5;

use crate::config::ModelsConfig;
use crate::language::LanguagePair;
use anyhow::Context;
use candle::{DType, Device};
use candle_nn::VarBuilder;
use hf_hub::api::sync::{ApiBuilder, ApiRepo};
use hf_hub::{Repo, RepoType};
use log::debug;
use marian::MarianTranslationModel;
use std::path::PathBuf;
use std::sync::Arc;
use t5::T5SummarizationModel;

/// A loaded translation model for one language pair.
pub trait TranslationModel: Send + Sync {
    fn translate(&self, text: &str) -> anyhow::Result<String>;
}

/// A loaded summarization model. Lengths count generated tokens.
pub trait SummarizationModel: Send + Sync {
    fn summarize(&self, text: &str, max_length: usize, min_length: usize)
        -> anyhow::Result<String>;
}

/// Loads models by identifier. Loading may download weights and is slow;
/// callers go through the model cache.
pub trait ModelProvider: Send + Sync {
    fn translation_model_id(&self, pair: LanguagePair) -> String;

    fn summarization_model_id(&self) -> String;

    fn load_translation(&self, pair: LanguagePair) -> anyhow::Result<Arc<dyn TranslationModel>>;

    fn load_summarization(&self) -> anyhow::Result<Arc<dyn SummarizationModel>>;
}

/// Anything the model cache can hold.
#[derive(Clone)]
pub enum ModelHandle {
    Translation(Arc<dyn TranslationModel>),
    Summarization(Arc<dyn SummarizationModel>),
}

/// A model repository on the hub; files are downloaded into the local cache on first use.
pub(crate) struct HubRepo {
    model_id: String,
    repo: ApiRepo,
}

impl HubRepo {
    pub fn open(model_id: &str, revision: &str, token: Option<String>) -> anyhow::Result<Self> {
        let api = ApiBuilder::new().with_token(token).build()?;
        let repo = api.repo(Repo::with_revision(
            model_id.to_string(),
            RepoType::Model,
            revision.to_string(),
        ));
        Ok(Self {
            model_id: model_id.to_string(),
            repo,
        })
    }

    pub fn get(&self, filename: &str) -> anyhow::Result<PathBuf> {
        self.repo
            .get(filename)
            .with_context(|| format!("fetching {filename} from {}", self.model_id))
    }

    /// Weights from `model.safetensors`, or from `pytorch_model.bin` for
    /// repos that were never converted.
    pub fn variable_builder(
        &self,
        dtype: DType,
        device: &Device,
    ) -> anyhow::Result<VarBuilder<'static>> {
        match self.get("model.safetensors") {
            Ok(weights) => {
                Ok(unsafe { VarBuilder::from_mmaped_safetensors(&[weights], dtype, device)? })
            }
            Err(err) => {
                debug!("{err:#}, trying pytorch_model.bin");
                let weights = self.get("pytorch_model.bin")?;
                Ok(VarBuilder::from_pth(weights, dtype, device)?)
            }
        }
    }
}

/// Production provider: Marian models for translation, T5 for summarization.
pub struct HubModelProvider {
    config: ModelsConfig,
    device: Device,
}

impl HubModelProvider {
    pub fn new(config: ModelsConfig) -> anyhow::Result<Self> {
        let device = if config.cuda {
            Device::cuda_if_available(0)?
        } else {
            Device::Cpu
        };
        Ok(Self { config, device })
    }
}

impl ModelProvider for HubModelProvider {
    fn translation_model_id(&self, pair: LanguagePair) -> String {
        self.config
            .translation_model_id(pair.source.code(), pair.target.code())
    }

    fn summarization_model_id(&self) -> String {
        self.config.summarization_model.clone()
    }

    fn load_translation(&self, pair: LanguagePair) -> anyhow::Result<Arc<dyn TranslationModel>> {
        let model = MarianTranslationModel::load(
            &self.translation_model_id(pair),
            &self.config.translation_revision,
            self.config.hf_token.clone(),
            self.device.clone(),
            self.config.translation_max_tokens,
        )?;
        Ok(Arc::new(model))
    }

    fn load_summarization(&self) -> anyhow::Result<Arc<dyn SummarizationModel>> {
        let model = T5SummarizationModel::load(
            &self.config.summarization_model,
            &self.config.summarization_revision,
            self.config.hf_token.clone(),
            self.device.clone(),
            &self.config.summarization_prefix,
        )?;
        Ok(Arc::new(model))
    }
}
