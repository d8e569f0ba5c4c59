use console::style;
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::cleaning::clean;
use crate::completion::{CompletionClient, SupportedModel, validate_temperature};
use crate::config::Config;
use crate::embeddings::AzureEmbeddingClient;
use crate::indexer::{DEFAULT_TOP_K, Indexer, SessionIndex};
use crate::prompt::assemble_prompt;
use crate::session::Session;
use crate::table::Table;
use crate::{AssistantError, Result};

/// Clean an uploaded table and write the result next to it as CSV.
#[inline]
pub fn clean_file(input: &Path, output: Option<&Path>) -> Result<()> {
    info!("Cleaning table from {}", input.display());

    let table = Table::from_file(input)?;
    let cleaned = clean(&table);

    let output_path = output.map_or_else(|| default_output_path(input), Path::to_path_buf);
    cleaned.write_csv(&output_path)?;

    println!(
        "Cleaned {}: {} rows in, {} rows out ({} duplicate rows removed)",
        input.display(),
        table.row_count(),
        cleaned.row_count(),
        table.row_count() - cleaned.row_count()
    );
    println!("Wrote cleaned table to {}", output_path.display());

    Ok(())
}

fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("table");
    input.with_file_name(format!("{}_cleaned.csv", stem))
}

/// Answer a single question about a dataset: clean, index, retrieve,
/// assemble, complete.
#[inline]
pub fn ask(
    file: &Path,
    question: &str,
    model: Option<&str>,
    temperature: f32,
    top_k: usize,
) -> Result<()> {
    let config = Config::from_env()?;
    let model = resolve_model(model, &config)?;
    validate_temperature(temperature)?;

    let table = load_cleaned_table(file)?;
    let index = build_session_index(&config, &table)?;
    let embedder = AzureEmbeddingClient::new(&config.service)?;
    let completion = CompletionClient::new(&config.service);

    let answer = answer_question(
        &table,
        &index,
        &embedder,
        &completion,
        question,
        model,
        temperature,
        top_k,
    )?;

    println!("{}", answer);
    Ok(())
}

/// Interactive session: load and index a dataset once, then answer
/// questions until the user leaves. Questions asked without a dataset go
/// to the model ungrounded.
#[inline]
pub fn chat(file: Option<&Path>, model: Option<&str>, temperature: f32) -> Result<()> {
    let config = Config::from_env()?;
    let model = resolve_model(model, &config)?;
    validate_temperature(temperature)?;

    let embedder = AzureEmbeddingClient::new(&config.service)?;
    let completion = CompletionClient::new(&config.service);
    let mut session = Session::new();

    if let Some(path) = file {
        let table = load_cleaned_table(path)?;
        let index = build_session_index(&config, &table)?;
        println!(
            "{}",
            style(format!(
                "Indexed {} rows as {} chunks. Questions will be grounded in the dataset.",
                table.row_count(),
                index.chunk_count()
            ))
            .green()
        );
        session.set_table(table);
        session.set_index(index);
    } else {
        println!(
            "{}",
            style("No dataset loaded; answers will not be grounded.").yellow()
        );
    }

    println!("Type a question, 'history' to review the session, or 'exit' to quit.");

    loop {
        let line: String = Input::new()
            .with_prompt("question")
            .allow_empty(true)
            .interact_text()
            .map_err(|e| AssistantError::Io(std::io::Error::other(e)))?;
        let input = line.trim();

        match input {
            "" => {}
            "exit" | "quit" => break,
            "history" => print_history(&session),
            question => {
                // Any failure is reported and the loop continues; table,
                // index, and history stay as they were.
                let result = match (session.table(), session.index()) {
                    (Some(table), Some(index)) => answer_question(
                        table,
                        index,
                        &embedder,
                        &completion,
                        question,
                        model,
                        temperature,
                        DEFAULT_TOP_K,
                    ),
                    _ => completion.complete(model, question, temperature),
                };

                match result {
                    Ok(answer) => {
                        println!();
                        println!("{}", answer);
                        println!();
                        session.record_exchange(question, answer, model.to_string(), temperature);
                    }
                    Err(e) => {
                        error!("Question failed: {}", e);
                        println!("{}", style(format!("Error: {}", e)).red());
                    }
                }
            }
        }
    }

    Ok(())
}

/// Print the effective configuration, with the credential redacted.
#[inline]
pub fn show_config() -> Result<()> {
    let config = Config::from_env()?;

    println!("Endpoint:             {}", config.service.endpoint);
    println!("Completion model:     {}", config.service.deployment);
    println!("Embedding deployment: {}", config.service.embedding_deployment);
    println!("API version:          {}", config.service.api_version);
    println!("Embedding batch size: {}", config.service.batch_size);
    println!("API key:              {}", redact(&config.service.api_key));

    Ok(())
}

fn redact(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    format!("{}… ({} chars)", visible, secret.chars().count())
}

fn resolve_model(explicit: Option<&str>, config: &Config) -> Result<SupportedModel> {
    explicit.unwrap_or(&config.service.deployment).parse()
}

fn load_cleaned_table(path: &Path) -> Result<Table> {
    let table = Table::from_file(path)?;
    let cleaned = clean(&table);
    info!(
        "Loaded {}: {} rows, cleaned to {} rows",
        path.display(),
        table.row_count(),
        cleaned.row_count()
    );
    Ok(cleaned)
}

fn build_session_index(config: &Config, table: &Table) -> Result<SessionIndex> {
    let embedder = AzureEmbeddingClient::new(&config.service)?;
    let indexer = Indexer::new(embedder, config.chunking.clone(), config.service.batch_size);

    let bar = ProgressBar::no_length().with_style(
        ProgressStyle::with_template("{spinner} embedding batch {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );

    let index = indexer.build_with_progress(table, |done, total| {
        bar.set_length(total as u64);
        bar.set_position(done as u64);
    })?;

    bar.finish_and_clear();
    Ok(index)
}

#[expect(clippy::too_many_arguments, reason = "internal helper shared by ask and chat")]
fn answer_question(
    table: &Table,
    index: &SessionIndex,
    embedder: &AzureEmbeddingClient,
    completion: &CompletionClient,
    question: &str,
    model: SupportedModel,
    temperature: f32,
    top_k: usize,
) -> Result<String> {
    let retrieved = index.query(embedder, question, top_k)?;
    let prompt = assemble_prompt(table, question, &retrieved);
    completion.complete(model, &prompt, temperature)
}

fn print_history(session: &Session) {
    if session.history().is_empty() {
        println!("No history yet.");
        return;
    }

    for (i, record) in session.history().iter().enumerate() {
        println!();
        println!("{}", style(format!("#{} {}", i + 1, record.prompt)).bold());
        println!("{}", record.answer);
        println!(
            "{}",
            style(format!(
                "model: {}, temperature: {}, at {}",
                record.model,
                record.temperature,
                record.created_at.format("%Y-%m-%d %H:%M:%S")
            ))
            .dim()
        );
    }
    println!();
}
