// Command-line / environment configuration
use clap::{Args, Parser};

pub const DEFAULT_TRANSLATION_REPO: &str = "Helsinki-NLP/opus-mt-{src}-{tgt}";
pub const DEFAULT_SUMMARIZATION_MODEL: &str = "t5-small";
pub const DEFAULT_SUMMARY_MAX_LENGTH: usize = 130;
pub const DEFAULT_SUMMARY_MIN_LENGTH: usize = 30;

/// Where models come from and how they decode.
#[derive(Args, Debug, Clone)]
pub struct ModelsConfig {
    /// Hub repository of a translation model; `{src}` and `{tgt}` are replaced by language codes
    #[arg(long, env = "TRANSLATION_REPO", default_value = DEFAULT_TRANSLATION_REPO)]
    pub translation_repo: String,

    #[arg(long, env = "TRANSLATION_REVISION", default_value = "main")]
    pub translation_revision: String,

    /// Upper bound on generated tokens per translation
    #[arg(long, default_value_t = 128)]
    pub translation_max_tokens: usize,

    #[arg(long, env = "SUMMARIZATION_MODEL", default_value = DEFAULT_SUMMARIZATION_MODEL)]
    pub summarization_model: String,

    #[arg(long, env = "SUMMARIZATION_REVISION", default_value = "main")]
    pub summarization_revision: String,

    /// Task prefix prepended to summarization input
    #[arg(long, default_value = "summarize: ")]
    pub summarization_prefix: String,

    #[arg(long, env = "HF_TOKEN", hide_env_values = true)]
    pub hf_token: Option<String>,

    /// Run inference on the first CUDA device when available
    #[arg(long)]
    pub cuda: bool,
}

impl ModelsConfig {
    pub fn translation_model_id(&self, source: &str, target: &str) -> String {
        self.translation_repo
            .replace("{src}", source)
            .replace("{tgt}", target)
    }
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            translation_repo: DEFAULT_TRANSLATION_REPO.to_string(),
            translation_revision: "main".to_string(),
            translation_max_tokens: 128,
            summarization_model: DEFAULT_SUMMARIZATION_MODEL.to_string(),
            summarization_revision: "main".to_string(),
            summarization_prefix: "summarize: ".to_string(),
            hf_token: None,
            cuda: false,
        }
    }
}

/// Summary bounds used when a request leaves them out.
#[derive(Args, Debug, Clone, Copy)]
pub struct SummaryDefaults {
    #[arg(long = "summary-max-length", default_value_t = DEFAULT_SUMMARY_MAX_LENGTH)]
    pub max_length: usize,

    #[arg(long = "summary-min-length", default_value_t = DEFAULT_SUMMARY_MIN_LENGTH)]
    pub min_length: usize,
}

impl Default for SummaryDefaults {
    fn default() -> Self {
        Self {
            max_length: DEFAULT_SUMMARY_MAX_LENGTH,
            min_length: DEFAULT_SUMMARY_MIN_LENGTH,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "translation_server", about = "Translate text, then summarize the translation")]
pub struct ServerConfig {
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, default_value_t = 8080)]
    pub port: u16,

    #[command(flatten)]
    pub models: ModelsConfig,

    #[command(flatten)]
    pub summary: SummaryDefaults,
}
