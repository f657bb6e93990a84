//! taskcapture CLI entry point

use std::collections::BTreeMap;

use clap::Parser;
use colored::*;
use eyre::{Context, Result, bail};
use tracing::info;

use entitystore::{ContextProvider, EntityStore, KnowledgeGraphContext};
use taskcapture::cli::{Cli, Command, OutputFormat, parse_answer};
use taskcapture::config::Config;
use taskcapture::domain::LeafType;
use taskcapture::llm::create_client;
use taskcapture::pipeline::{CapturePipeline, CaptureRequest, CaptureResponse, Finalizer, generate_clarifications};
use taskcapture::store::{FileSessionStore, SessionStore, StoreError};
use taskcapture::{api, domain::CaptureSession};

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    match cli.command {
        Command::Serve { host, port } => cmd_serve(config, host, port).await,
        Command::Capture {
            text,
            auto,
            no_clarify,
            offline,
            user,
            format,
        } => cmd_capture(config, text, auto, no_clarify, offline, user, format).await,
        Command::Clarify {
            task_id,
            answers,
            offline,
            format,
        } => cmd_clarify(config, task_id, answers, offline, format).await,
        Command::Show { task_id, format } => cmd_show(config, task_id, format).await,
        Command::List => cmd_list(config).await,
    }
}

async fn cmd_serve(mut config: Config, host: Option<String>, port: Option<u16>) -> Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config.validate()?;

    info!(
        "taskcapture serving with provider={} model={}",
        config.llm.provider, config.llm.model
    );
    api::serve(config).await
}

async fn cmd_capture(
    mut config: Config,
    text: String,
    auto: bool,
    no_clarify: bool,
    offline: bool,
    user: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    if offline {
        config.llm.provider = "none".to_string();
    }
    config.validate()?;

    let llm = create_client(&config.llm)?;
    let pipeline = CapturePipeline::new(llm, &config);

    let user = user.unwrap_or_else(|| config.knowledge.default_user.clone());
    let knowledge = EntityStore::open(&config.knowledge.store_path)?.get_context(&user)?;

    let request = CaptureRequest {
        text,
        auto_mode: auto,
        ask_for_clarity: !no_clarify,
        user: Some(user),
    };

    let (session, response) = pipeline.capture(&request, &knowledge).await?;

    let store = FileSessionStore::open(&config.storage.sessions_dir)?;
    store.save(&session).await?;

    print_response(&response, format)
}

async fn cmd_clarify(
    mut config: Config,
    task_id: String,
    answers: Vec<String>,
    offline: bool,
    format: OutputFormat,
) -> Result<()> {
    if offline {
        config.llm.provider = "none".to_string();
    }
    config.validate()?;

    let mut parsed = BTreeMap::new();
    for raw in &answers {
        let (field, value) = parse_answer(raw).map_err(|e| eyre::eyre!(e))?;
        parsed.insert(field, value);
    }

    let store = FileSessionStore::open(&config.storage.sessions_dir)?;
    let mut session = load_session(&store, &task_id).await?;

    let llm = create_client(&config.llm)?;
    let pipeline = CapturePipeline::new(llm, &config);
    let knowledge = knowledge_for(&config, &session)?;

    let response = pipeline.clarify(&mut session, &parsed, &knowledge).await?;
    store.update(&session).await?;

    print_response(&response, format)
}

async fn cmd_show(config: Config, task_id: String, format: OutputFormat) -> Result<()> {
    let store = FileSessionStore::open(&config.storage.sessions_dir)?;
    let session = load_session(&store, &task_id).await?;
    let knowledge = knowledge_for(&config, &session)?;

    let clarifications = generate_clarifications(&session.steps, &knowledge);
    let response = Finalizer::finalize(&session, clarifications, 0);
    print_response(&response, format)
}

async fn cmd_list(config: Config) -> Result<()> {
    let store = FileSessionStore::open(&config.storage.sessions_dir)?;
    let ids = store.list().await?;
    if ids.is_empty() {
        println!("No captured tasks");
    } else {
        for id in ids {
            println!("{}", id);
        }
    }
    Ok(())
}

async fn load_session(store: &FileSessionStore, task_id: &str) -> Result<CaptureSession> {
    match store.load(task_id).await {
        Ok(session) => Ok(session),
        Err(StoreError::NotFound(id)) => bail!("No captured task with id '{}'", id),
        Err(e) => Err(e.into()),
    }
}

fn knowledge_for(config: &Config, session: &CaptureSession) -> Result<KnowledgeGraphContext> {
    let user = session.user.as_deref().unwrap_or(&config.knowledge.default_user);
    let store = EntityStore::open(&config.knowledge.store_path)?;
    store.get_context(user)
}

fn print_response(response: &CaptureResponse, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(response)?);
        }
        OutputFormat::Text => {
            println!(
                "{} {} {}",
                "✓".green(),
                response.task.title.bold(),
                format!("({})", response.task.id).dimmed()
            );
            println!(
                "  priority: {}  estimate: {:.1}h",
                response.task.priority,
                response.task.estimated_hours
            );

            println!("\nSteps:");
            for step in &response.micro_steps {
                println!(
                    "  {}. [{} {}m] {}",
                    step.step_number,
                    leaf_badge(step.leaf_type),
                    step.estimated_minutes,
                    step.description
                );
            }

            let b = &response.breakdown;
            println!(
                "\n{} steps: {} digital, {} human, {} unknown ({} min total)",
                b.total_steps, b.digital_count, b.human_count, b.unknown_count, b.total_minutes
            );

            if response.needs_clarification {
                println!("\n{}", "Needs info:".yellow());
                for q in &response.clarifications {
                    if q.options.is_empty() {
                        println!("  {}: {}", q.field.cyan(), q.question);
                    } else {
                        println!("  {}: {} [{}]", q.field.cyan(), q.question, q.options.join(", "));
                    }
                }
            }
        }
    }
    Ok(())
}

fn leaf_badge(leaf: LeafType) -> ColoredString {
    match leaf {
        LeafType::Digital => "DIGITAL".green(),
        LeafType::Human => "HUMAN".yellow(),
        LeafType::Unknown => "UNKNOWN".red(),
    }
}
