// Greedy decoding shared by the seq2seq models
use candle::Tensor;
use candle_transformers::generation::LogitsProcessor;

/// Seed handed to the logits processor. Decoding is argmax, so it never
/// influences the output.
const SEED: u64 = 299792458;

/// Argmax decoding from `start_token_id` until an end token or `max_tokens`.
///
/// End tokens cannot be picked before `min_tokens` tokens exist. The start
/// token and the end token are not part of the returned ids.
pub(crate) struct GreedyDecoder {
    pub start_token_id: u32,
    pub end_token_ids: Vec<u32>,
    pub max_tokens: usize,
    pub min_tokens: usize,
}

impl GreedyDecoder {
    /// `step` gets the step index and every id so far (start token first) and
    /// returns the 1-d logits for the next position.
    pub fn run<F>(&self, mut step: F) -> anyhow::Result<Vec<u32>>
    where
        F: FnMut(usize, &[u32]) -> anyhow::Result<Tensor>,
    {
        // no temperature, no top_p: argmax every step
        let mut logits_processor = LogitsProcessor::new(SEED, None, None);
        let mut end_mask: Option<Tensor> = None;
        let mut token_ids = vec![self.start_token_id];

        for index in 0..self.max_tokens {
            let mut logits = step(index, &token_ids)?;
            if index < self.min_tokens {
                if end_mask.is_none() {
                    end_mask = Some(self.end_mask(&logits)?);
                }
                if let Some(mask) = &end_mask {
                    logits = logits.broadcast_add(mask)?;
                }
            }

            let token = logits_processor.sample(&logits)?;
            if self.end_token_ids.contains(&token) {
                break;
            }
            token_ids.push(token);
        }

        token_ids.remove(0);
        Ok(token_ids)
    }

    /// Zeros with `-inf` at every end token, shaped like `logits`.
    fn end_mask(&self, logits: &Tensor) -> anyhow::Result<Tensor> {
        let vocab_size = logits.dim(0)?;
        let mut values = vec![0f32; vocab_size];
        for &token in &self.end_token_ids {
            if let Some(value) = values.get_mut(token as usize) {
                *value = f32::NEG_INFINITY;
            }
        }
        let mask = Tensor::from_vec(values, vocab_size, logits.device())?;
        Ok(mask.to_dtype(logits.dtype())?)
    }
}
