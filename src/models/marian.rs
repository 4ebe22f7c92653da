// Marian (opus-mt) translation model
use super::generation::GreedyDecoder;
use super::{HubRepo, TranslationModel};
use anyhow::{anyhow, Context};
use candle::{DType, Device, Tensor};
use candle_transformers::models::marian::{Config, MTModel};
use log::{debug, info};
use sentencepiece::SentencePieceProcessor;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;
use tokenizers::Tokenizer;

const UNK_TOKEN: &str = "<unk>";
const PAD_TOKEN: &str = "<pad>";
const EOS_TOKEN: &str = "</s>";

/// Piece <-> id table from an opus-mt `vocab.json`.
struct Vocab {
    ids: HashMap<String, u32>,
    pieces: HashMap<u32, String>,
    unk_token_id: u32,
    special_ids: HashSet<u32>,
}

impl Vocab {
    fn from_json(json: &str) -> anyhow::Result<Self> {
        let ids: HashMap<String, u32> = serde_json::from_str(json)?;
        let pieces = ids.iter().map(|(piece, &id)| (id, piece.clone())).collect();
        let unk_token_id = *ids
            .get(UNK_TOKEN)
            .ok_or_else(|| anyhow!("vocab has no {UNK_TOKEN} entry"))?;
        let special_ids = [UNK_TOKEN, PAD_TOKEN, EOS_TOKEN]
            .iter()
            .filter_map(|token| ids.get(*token).copied())
            .collect();
        Ok(Self {
            ids,
            pieces,
            unk_token_id,
            special_ids,
        })
    }

    fn ids<'a>(&self, pieces: impl IntoIterator<Item = &'a str>) -> Vec<u32> {
        pieces
            .into_iter()
            .map(|piece| *self.ids.get(piece).unwrap_or(&self.unk_token_id))
            .collect()
    }

    /// Text for `ids`, special tokens dropped.
    fn decode(&self, ids: &[u32]) -> String {
        let text: String = ids
            .iter()
            .filter(|&&id| !self.special_ids.contains(&id))
            .filter_map(|id| self.pieces.get(id).map(String::as_str))
            .collect();
        text.replace('\u{2581}', " ").trim().to_string()
    }
}

enum MarianTokenizer {
    /// `tokenizer.json`, for repositories that ship one
    Fast(Tokenizer),
    /// `source.spm` pieces mapped through `vocab.json`
    SentencePiece {
        source: SentencePieceProcessor,
        vocab: Vocab,
    },
}

impl MarianTokenizer {
    fn load(repo: &HubRepo) -> anyhow::Result<Self> {
        match repo.get("tokenizer.json") {
            Ok(path) => Ok(MarianTokenizer::Fast(
                Tokenizer::from_file(path).map_err(anyhow::Error::msg)?,
            )),
            Err(err) => {
                debug!("{err:#}, using sentencepiece files");
                let source = open_spm(&repo.get("source.spm")?)?;
                let vocab = Vocab::from_json(&std::fs::read_to_string(repo.get("vocab.json")?)?)?;
                Ok(MarianTokenizer::SentencePiece { source, vocab })
            }
        }
    }

    fn encode(&self, text: &str) -> anyhow::Result<Vec<u32>> {
        match self {
            MarianTokenizer::Fast(tokenizer) => Ok(tokenizer
                .encode(text, true)
                .map_err(anyhow::Error::msg)?
                .get_ids()
                .to_vec()),
            MarianTokenizer::SentencePiece { source, vocab } => {
                let pieces = source.encode(text)?;
                Ok(vocab.ids(pieces.iter().map(|piece| piece.piece.as_str())))
            }
        }
    }

    fn decode(&self, ids: &[u32]) -> anyhow::Result<String> {
        match self {
            MarianTokenizer::Fast(tokenizer) => {
                tokenizer.decode(ids, true).map_err(anyhow::Error::msg)
            }
            MarianTokenizer::SentencePiece { vocab, .. } => Ok(vocab.decode(ids)),
        }
    }
}

fn open_spm(path: &Path) -> anyhow::Result<SentencePieceProcessor> {
    SentencePieceProcessor::open(path).with_context(|| format!("loading {}", path.display()))
}

/// Parse an opus-mt `config.json`. Older repositories leave out fields that
/// newer configs carry; they get the values transformers assumes.
fn parse_config(raw: &str) -> anyhow::Result<Config> {
    let mut value: Value = serde_json::from_str(raw)?;
    if let Some(fields) = value.as_object_mut() {
        let pad_token_id = fields.get("pad_token_id").cloned().unwrap_or(json!(0));
        let eos_token_id = fields.get("eos_token_id").cloned().unwrap_or(json!(0));
        fields
            .entry("decoder_start_token_id")
            .or_insert(pad_token_id);
        fields.entry("forced_eos_token_id").or_insert(eos_token_id);
        fields
            .entry("share_encoder_decoder_embeddings")
            .or_insert(json!(true));
        fields.entry("use_cache").or_insert(json!(true));
        fields.entry("is_encoder_decoder").or_insert(json!(true));
    }
    Ok(serde_json::from_value(value)?)
}

/// Encoder input: at most `max_positions` ids, always ending in exactly one `eos`.
fn frame_source_tokens(
    mut tokens: Vec<u32>,
    eos_token_id: u32,
    max_positions: usize,
) -> Vec<u32> {
    if tokens.last() == Some(&eos_token_id) {
        tokens.pop();
    }
    tokens.truncate(max_positions.saturating_sub(1));
    tokens.push(eos_token_id);
    tokens
}

pub struct MarianTranslationModel {
    model_id: String,
    // decoding mutates the decoder's kv cache
    model: Mutex<MTModel>,
    tokenizer: MarianTokenizer,
    config: Config,
    device: Device,
    max_tokens: usize,
}

impl MarianTranslationModel {
    pub fn load(
        model_id: &str,
        revision: &str,
        huggingface_token: Option<String>,
        device: Device,
        max_tokens: usize,
    ) -> anyhow::Result<Self> {
        info!("Downloading translation model {} ({})", model_id, revision);
        let repo = HubRepo::open(model_id, revision, huggingface_token)?;

        let config = parse_config(&std::fs::read_to_string(repo.get("config.json")?)?)?;
        let tokenizer = MarianTokenizer::load(&repo)?;

        let variable_builder = repo.variable_builder(DType::F32, &device)?;
        let model = MTModel::new(&config, variable_builder)?;
        info!("Loaded translation model {}", model_id);

        Ok(Self {
            model_id: model_id.to_string(),
            model: Mutex::new(model),
            tokenizer,
            config,
            device,
            max_tokens,
        })
    }

    fn generate(&self, model: &mut MTModel, tokens: &[u32]) -> anyhow::Result<Vec<u32>> {
        let input = Tensor::new(tokens, &self.device)?.unsqueeze(0)?;
        let encoder_xs = model.encoder().forward(&input, 0)?;

        let decoder = GreedyDecoder {
            start_token_id: self.config.decoder_start_token_id,
            end_token_ids: vec![self.config.eos_token_id, self.config.forced_eos_token_id],
            max_tokens: self.max_tokens,
            min_tokens: 0,
        };
        decoder.run(|index, token_ids| {
            let context_size = if index >= 1 { 1 } else { token_ids.len() };
            let start_pos = token_ids.len().saturating_sub(context_size);
            let input_ids = Tensor::new(&token_ids[start_pos..], &self.device)?.unsqueeze(0)?;
            let logits = model.decode(&input_ids, &encoder_xs, start_pos)?;
            let logits = logits.squeeze(0)?;
            Ok(logits.get(logits.dim(0)? - 1)?)
        })
    }
}

impl TranslationModel for MarianTranslationModel {
    fn translate(&self, text: &str) -> anyhow::Result<String> {
        let tokens = frame_source_tokens(
            self.tokenizer.encode(text)?,
            self.config.eos_token_id,
            self.config.max_position_embeddings,
        );
        let mut model = self
            .model
            .lock()
            .map_err(|_| anyhow!("{} is poisoned by an earlier panic", self.model_id))?;

        let generated = self.generate(&mut model, &tokens);
        model.reset_kv_cache();
        let generated = generated?;
        debug!(
            "{}: {} input tokens, {} output tokens",
            self.model_id,
            tokens.len(),
            generated.len()
        );

        self.tokenizer.decode(&generated)
    }
}
