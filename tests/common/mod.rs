use anyhow::bail;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use translation_server::language::{Language, LanguagePair};
use translation_server::models::{ModelProvider, SummarizationModel, TranslationModel};

pub struct TaggingTranslator(LanguagePair);

impl TranslationModel for TaggingTranslator {
    fn translate(&self, text: &str) -> anyhow::Result<String> {
        Ok(format!("[{}] {}", self.0, text))
    }
}

pub struct FirstWordsSummarizer;

impl SummarizationModel for FirstWordsSummarizer {
    fn summarize(
        &self,
        text: &str,
        max_length: usize,
        _min_length: usize,
    ) -> anyhow::Result<String> {
        Ok(text
            .split_whitespace()
            .take(max_length)
            .collect::<Vec<_>>()
            .join(" "))
    }
}

/// Provider with a fixed set of translation pairs and a word-truncating summarizer.
pub struct StubProvider {
    pairs: HashSet<LanguagePair>,
    loads: AtomicUsize,
}

impl StubProvider {
    pub fn new(pairs: &[(Language, Language)]) -> Self {
        Self {
            pairs: pairs
                .iter()
                .map(|&(source, target)| LanguagePair::new(source, target))
                .collect(),
            loads: AtomicUsize::new(0),
        }
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl ModelProvider for StubProvider {
    fn translation_model_id(&self, pair: LanguagePair) -> String {
        format!("stub/opus-mt-{pair}")
    }

    fn summarization_model_id(&self) -> String {
        "stub/summarizer".to_string()
    }

    fn load_translation(&self, pair: LanguagePair) -> anyhow::Result<Arc<dyn TranslationModel>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if !self.pairs.contains(&pair) {
            bail!("no model for {pair}");
        }
        Ok(Arc::new(TaggingTranslator(pair)))
    }

    fn load_summarization(&self) -> anyhow::Result<Arc<dyn SummarizationModel>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(FirstWordsSummarizer))
    }
}
