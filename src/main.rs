//! Interactive terminal session for the design flow engine.
//!
//! Usage: `pbl-flow [PROJECT_ID]`
//!
//! Lines are sent as utterances. `:edit <step>` reopens a step, `:context`
//! prints the committed design as JSON, and `:quit` exits.

use std::error::Error;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use pbl_flow::application::{DesignFlowEngine, TurnRecord};
use pbl_flow::config::AppConfig;
use pbl_flow::domain::design::StepId;
use pbl_flow::domain::foundation::ProjectId;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::load()?;
    config.validate()?;

    let engine = DesignFlowEngine::from_config(&config)?;
    let project_id = std::env::args()
        .nth(1)
        .map(|arg| arg.parse::<ProjectId>())
        .transpose()?;

    let started = engine.start_design(project_id).await?;
    let project_id = started.record.project_id;
    info!(project_id = %project_id, resumed = started.resumed, "Session ready");
    render(&started.record);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if line == ":quit" {
            break;
        }

        if line == ":context" {
            match engine.design_context(project_id).await {
                Ok(context) => println!("{}", serde_json::to_string_pretty(&context)?),
                Err(err) => eprintln!("error: {err}"),
            }
            continue;
        }

        if let Some(step) = line.strip_prefix(":edit") {
            match step.parse::<StepId>() {
                Ok(step) => match engine.request_edit(project_id, step).await {
                    Ok(record) => render(&record),
                    Err(err) => eprintln!("error: {err}"),
                },
                Err(err) => eprintln!("error: {err}"),
            }
            continue;
        }

        match engine.process_utterance(project_id, line).await {
            Ok(record) => render(&record),
            Err(err) => eprintln!("error: {err}"),
        }
    }

    info!(project_id = %project_id, "Session closed");
    Ok(())
}

fn render(record: &TurnRecord) {
    println!();
    println!(
        "[{} / {}]",
        record.current_stage.label(),
        record.current_step.label()
    );
    println!("{}", record.display_text);
    for (i, suggestion) in record.suggestions.iter().enumerate() {
        println!("  {}. {}", i + 1, suggestion);
    }
    for warning in &record.warnings {
        eprintln!("warning: {}", serde_json::to_string(warning).unwrap_or_default());
    }
    println!();
}
