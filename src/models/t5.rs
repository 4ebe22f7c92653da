// T5 summarization model
use super::generation::GreedyDecoder;
use super::{HubRepo, SummarizationModel};
use anyhow::anyhow;
use candle::{DType, Device, Tensor};
use candle_transformers::models::t5::{Config, T5ForConditionalGeneration};
use log::{debug, info};
use std::sync::Mutex;
use tokenizers::Tokenizer;

pub struct T5SummarizationModel {
    model_id: String,
    model: Mutex<T5ForConditionalGeneration>,
    tokenizer: Tokenizer,
    config: Config,
    device: Device,
    prefix: String,
    // prefix plus end-of-sequence marker
    prefix_tokens: usize,
}

/// A short input must not be padded out into a longer "summary": the minimum
/// never exceeds the number of tokens the text itself encodes to.
fn cap_min_length(min_length: usize, input_tokens: usize, prefix_tokens: usize) -> usize {
    min_length.min(input_tokens.saturating_sub(prefix_tokens))
}

impl T5SummarizationModel {
    pub fn load(
        model_id: &str,
        revision: &str,
        huggingface_token: Option<String>,
        device: Device,
        prefix: &str,
    ) -> anyhow::Result<Self> {
        info!("Downloading summarization model {} ({})", model_id, revision);
        let repo = HubRepo::open(model_id, revision, huggingface_token)?;

        let config = std::fs::read_to_string(repo.get("config.json")?)?;
        let config: Config = serde_json::from_str(&config)?;

        let tokenizer =
            Tokenizer::from_file(repo.get("tokenizer.json")?).map_err(anyhow::Error::msg)?;

        let variable_builder = repo.variable_builder(DType::F32, &device)?;
        let model = T5ForConditionalGeneration::load(variable_builder, &config)?;
        info!("Loaded summarization model {}", model_id);

        let prefix_tokens = tokenizer
            .encode(prefix, true)
            .map_err(anyhow::Error::msg)?
            .get_ids()
            .len();

        Ok(Self {
            model_id: model_id.to_string(),
            model: Mutex::new(model),
            tokenizer,
            config,
            device,
            prefix: prefix.to_string(),
            prefix_tokens,
        })
    }

    fn generate(
        &self,
        model: &mut T5ForConditionalGeneration,
        tokens: &[u32],
        max_length: usize,
        min_length: usize,
    ) -> anyhow::Result<Vec<u32>> {
        let input = Tensor::new(tokens, &self.device)?.unsqueeze(0)?;
        let encoder_output = model.encode(&input)?;

        let decoder = GreedyDecoder {
            start_token_id: self
                .config
                .decoder_start_token_id
                .unwrap_or(self.config.pad_token_id) as u32,
            end_token_ids: vec![self.config.eos_token_id as u32],
            max_tokens: max_length,
            min_tokens: min_length,
        };
        decoder.run(|index, output_token_ids| {
            let decoder_token_ids = if index == 0 || !self.config.use_cache {
                Tensor::new(output_token_ids, &self.device)?.unsqueeze(0)?
            } else {
                let last_token = output_token_ids[output_token_ids.len() - 1];
                Tensor::new(&[last_token], &self.device)?.unsqueeze(0)?
            };
            Ok(model
                .decode(&decoder_token_ids, &encoder_output)?
                .squeeze(0)?)
        })
    }
}

impl SummarizationModel for T5SummarizationModel {
    fn summarize(
        &self,
        text: &str,
        max_length: usize,
        min_length: usize,
    ) -> anyhow::Result<String> {
        let input = format!("{}{}", self.prefix, text);
        let tokens = self
            .tokenizer
            .encode(input, true)
            .map_err(anyhow::Error::msg)?
            .get_ids()
            .to_vec();
        let min_length = cap_min_length(min_length, tokens.len(), self.prefix_tokens);

        let mut model = self
            .model
            .lock()
            .map_err(|_| anyhow!("{} is poisoned by an earlier panic", self.model_id))?;
        model.clear_kv_cache();
        let generated = self.generate(&mut model, &tokens, max_length, min_length);
        model.clear_kv_cache();
        let generated = generated?;
        debug!(
            "{}: {} input tokens, {} summary tokens",
            self.model_id,
            tokens.len(),
            generated.len()
        );

        self.tokenizer
            .decode(&generated, true)
            .map_err(anyhow::Error::msg)
    }
}
