use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use atrium_agent::llm::ChatMessage;
use atrium_agent::{OpenAiClient, Pipeline};
use atrium_core::config::AppConfig;
use atrium_core::guards::GuardConfig;
use atrium_core::profile::DatasetProfile;
use atrium_core::sandbox::ExecLimits;

/// Build the per-process pipeline: dataset and profile are loaded once and
/// shared read-only across every turn.
pub fn build_pipeline(config: &AppConfig) -> Result<(Pipeline, Arc<DatasetProfile>)> {
    let table = Arc::new(
        atrium_core::load_dataset(&config.dataset.path)
            .with_context(|| format!("loading dataset from {}", config.dataset.path.display()))?,
    );
    let profile = Arc::new(DatasetProfile::build(&table));
    let llm = Arc::new(OpenAiClient::new(&config.llm).context("building completion client")?);

    let pipeline = Pipeline::new(table, profile.clone(), llm)
        .with_guard_config(GuardConfig {
            wordlike_ratio: config.guards.gibberish_wordlike_ratio,
        })
        .with_exec_limits(ExecLimits {
            deadline: std::time::Duration::from_millis(config.executor.deadline_ms),
            max_ops: config.executor.max_ops,
        })
        .with_token_budgets(
            config.llm.max_output_tokens_extractor,
            config.llm.max_output_tokens_planner,
            config.llm.max_output_tokens_answer,
        );
    Ok((pipeline, profile))
}

pub async fn ask(config: &AppConfig, question: &str) -> Result<()> {
    let (pipeline, _profile) = build_pipeline(config)?;
    let turn = pipeline.run_turn(question, &[]).await;
    println!("{}", turn.final_text());
    Ok(())
}

/// Interactive session. Cross-turn history lives here, in the UI layer;
/// the pipeline itself sees one isolated turn at a time.
pub async fn chat(config: &AppConfig) -> Result<()> {
    let (pipeline, _profile) = build_pipeline(config)?;
    let mut history: Vec<ChatMessage> = Vec::new();

    println!("atrium chat - ask about the ledger dataset (empty line to exit)");
    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush().ok();
        let mut line = String::new();
        if stdin.lock().read_line(&mut line).context("reading input")? == 0 {
            break;
        }
        let question = line.trim();
        if question.is_empty() {
            break;
        }

        let turn = pipeline.run_turn(question, &history).await;
        println!("{}", turn.final_text());

        history.push(ChatMessage::user(question));
        history.push(ChatMessage::assistant(turn.final_text()));
    }
    Ok(())
}

pub fn profile(config: &AppConfig) -> Result<()> {
    let table = atrium_core::load_dataset(&config.dataset.path)
        .with_context(|| format!("loading dataset from {}", config.dataset.path.display()))?;
    let profile = DatasetProfile::build(&table);
    println!(
        "{}",
        serde_json::to_string_pretty(&profile).context("serializing profile")?
    );
    Ok(())
}
