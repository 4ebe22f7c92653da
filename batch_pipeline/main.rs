use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use translation_server::config::{ModelsConfig, SummaryDefaults};
use translation_server::error::ServiceResult;
use translation_server::language::Language;
use translation_server::models::HubModelProvider;
use translation_server::state::AppState;

/// Translate every row of a CSV file, optionally summarizing each translation.
#[derive(Parser, Debug)]
#[command(name = "batch_pipeline")]
struct BatchArgs {
    /// CSV file with a header row and `id,text` columns
    input: PathBuf,

    #[arg(long, default_value = "en")]
    source: Language,

    #[arg(long, default_value = "de")]
    target: Language,

    /// Also summarize each translation
    #[arg(long)]
    summarize: bool,

    #[arg(long, default_value = "translations.csv")]
    output: PathBuf,

    #[command(flatten)]
    models: ModelsConfig,

    #[command(flatten)]
    summary: SummaryDefaults,
}

struct Row {
    id: String,
    translation: String,
    summary: Option<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = BatchArgs::parse();

    let records = load_records_from_csv(&args.input, 0, 1)?;
    info!("Loaded {} rows from {}", records.len(), args.input.display());

    let provider = HubModelProvider::new(args.models.clone())?;
    let state = AppState::new(Arc::new(provider), args.summary);

    // rows run one after another: every row of a pair decodes on the same model
    let summarize = |text: &str| state.summarization.summarize_with_defaults(text);
    let rows = process_records(
        records,
        |text| state.translation.translate(text, args.source, args.target),
        args.summarize.then_some(summarize),
    );

    write_rows(&args.output, &rows, args.summarize)?;
    info!(
        "Wrote {} rows to {} (models loaded: {})",
        rows.len(),
        args.output.display(),
        state.cache.keys().join(", ")
    );
    Ok(())
}

// One output row per record. A failed translation keeps its row with an empty
// translation so output ids line up with the input.
fn process_records<T, S>(
    records: Vec<(String, String)>,
    mut translate: T,
    mut summarize: Option<S>,
) -> Vec<Row>
where
    T: FnMut(&str) -> ServiceResult<String>,
    S: FnMut(&str) -> ServiceResult<String>,
{
    records
        .into_iter()
        .map(|(id, text)| {
            let translation = match translate(&text) {
                Ok(translation) => translation,
                Err(err) => {
                    warn!("Row {}: translation failed: {}", id, err);
                    String::new()
                }
            };
            let summary = match summarize.as_mut() {
                Some(summarize) if !translation.is_empty() => match summarize(&translation) {
                    Ok(summary) => Some(summary),
                    Err(err) => {
                        warn!("Row {}: summarization failed: {}", id, err);
                        None
                    }
                },
                _ => None,
            };
            Row {
                id,
                translation,
                summary,
            }
        })
        .collect()
}

// Load (id, text) pairs, skipping rows with empty text
fn load_records_from_csv(
    csv_file_path: &PathBuf,
    id_col_index: usize,
    text_col_index: usize,
) -> Result<Vec<(String, String)>> {
    let mut records = Vec::new();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(csv_file_path)
        .with_context(|| format!("opening {}", csv_file_path.display()))?;
    for result in reader.records() {
        let record = result?;
        let id = record.get(id_col_index).unwrap_or_default().to_string();
        let text = record.get(text_col_index).unwrap_or_default().trim().to_string();
        if text.is_empty() {
            warn!("Row {}: empty text, skipped", id);
            continue;
        }
        records.push((id, text));
    }
    Ok(records)
}

fn write_rows(path: &PathBuf, rows: &[Row], with_summary: bool) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    if with_summary {
        writer.write_record(["id", "translation", "summary"])?;
    } else {
        writer.write_record(["id", "translation"])?;
    }
    for row in rows {
        match (&row.summary, with_summary) {
            (Some(summary), true) => {
                writer.write_record([row.id.as_str(), row.translation.as_str(), summary.as_str()])?
            }
            (None, true) => writer.write_record([row.id.as_str(), row.translation.as_str(), ""])?,
            _ => writer.write_record([row.id.as_str(), row.translation.as_str()])?,
        }
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use translation_server::error::ServiceError;

    fn records(texts: &[&str]) -> Vec<(String, String)> {
        texts
            .iter()
            .enumerate()
            .map(|(i, text)| ((i + 1).to_string(), text.to_string()))
            .collect()
    }

    fn upper(text: &str) -> ServiceResult<String> {
        if text == "kaputt" {
            return Err(ServiceError::Inference {
                model_id: "mock".to_string(),
                reason: "decode failed".to_string(),
            });
        }
        Ok(text.to_uppercase())
    }

    #[test]
    fn test_failed_rows_keep_their_place() {
        let no_summary: Option<fn(&str) -> ServiceResult<String>> = None;
        let rows = process_records(records(&["eins", "kaputt", "drei"]), upper, no_summary);

        let ids: Vec<&str> = rows.iter().map(|row| row.id.as_str()).collect();
        let translations: Vec<&str> = rows.iter().map(|row| row.translation.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert_eq!(translations, vec!["EINS", "", "DREI"]);
        assert!(rows.iter().all(|row| row.summary.is_none()));
    }

    #[test]
    fn test_summaries_skip_failed_translations() {
        let mut summarized = Vec::new();
        let rows = process_records(
            records(&["eins zwei", "kaputt"]),
            upper,
            Some(|text: &str| -> ServiceResult<String> {
                summarized.push(text.to_string());
                Ok(text.split_whitespace().next().unwrap_or_default().to_string())
            }),
        );

        assert_eq!(rows[0].summary.as_deref(), Some("EINS"));
        assert_eq!(rows[1].summary, None);
        assert_eq!(summarized, vec!["EINS ZWEI"]);
    }

    #[test]
    fn test_load_records_skips_empty_text() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "id,text").unwrap();
        writeln!(file, "1,The quick brown fox jumps over the lazy dog.").unwrap();
        writeln!(file, "2,   ").unwrap();
        writeln!(file, "3,\"Hello, world\"").unwrap();

        let records = load_records_from_csv(&file.path().to_path_buf(), 0, 1).unwrap();
        assert_eq!(
            records,
            vec![
                (
                    "1".to_string(),
                    "The quick brown fox jumps over the lazy dog.".to_string()
                ),
                ("3".to_string(), "Hello, world".to_string()),
            ]
        );
    }

    #[test]
    fn test_write_rows_with_summary_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let rows = vec![
            Row {
                id: "1".to_string(),
                translation: "Hallo Welt".to_string(),
                summary: Some("Hallo".to_string()),
            },
            Row {
                id: "2".to_string(),
                translation: "Guten Morgen".to_string(),
                summary: None,
            },
        ];

        write_rows(&path, &rows, true).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            written,
            "id,translation,summary\n1,Hallo Welt,Hallo\n2,Guten Morgen,\n"
        );
    }
}
