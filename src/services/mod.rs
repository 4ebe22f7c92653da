// Translation and summarization services over the shared model cache
mod summarization;
mod translation;

pub use summarization::SummarizationService;
pub use translation::TranslationService;

use crate::cache::ModelCache;
use crate::models::ModelHandle;

pub type SharedModelCache = ModelCache<ModelHandle>;

fn cache_key(task: &str, model_id: &str) -> String {
    format!("{task}:{model_id}")
}
