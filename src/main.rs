mod agents;
mod llm_client;
mod router;
mod session;

use std::env;
use std::io::{self, Write};
use std::sync::Arc;

use agents::{default_roster, AgentRegistry, DEFAULT_AGENT_NAME};
use anyhow::Context;
use clap::{Parser, Subcommand};
use llm_client::build_llm_client_from_env;
use router::Router;
use serde_json::json;
use session::{ConversationManager, SessionConfig, TurnResult};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    name = "expertflow",
    about = "CLI entrypoint into the expertflow agent router"
)]
struct Cli {
    /// Optional one-shot prompt; if omitted the CLI enters interactive mode.
    #[arg(short, long)]
    prompt: Option<String>,

    /// Session key; turns with the same user share history and agent state.
    #[arg(short, long, default_value = "local")]
    user: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the configured agent roster as JSON.
    Agents,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    let cli = Cli::parse();

    let registry = Arc::new(
        AgentRegistry::new(build_roster(), DEFAULT_AGENT_NAME)
            .context("Agent roster configuration is invalid")?,
    );

    if let Some(Commands::Agents) = cli.command {
        print_roster(&registry)?;
        return Ok(());
    }

    let llm_client = build_llm_client_from_env(true)?;
    let mut router = Router::new(registry.clone(), llm_client.clone());
    if let Ok(model) =
        env::var("EXPERTFLOW_ROUTER_MODEL").or_else(|_| env::var("EXPERTFLOW_MODEL"))
    {
        router = router.with_classifier_model(model);
    }
    let manager = ConversationManager::with_session_config(
        registry,
        router,
        llm_client,
        SessionConfig::from_env(),
    );

    if let Some(prompt) = cli.prompt {
        run_single(&manager, &cli.user, prompt).await?;
        return Ok(());
    }

    run_repl(&manager, &cli.user).await
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .try_init();
}

/// Built-in roster, with the model overridable via EXPERTFLOW_MODEL.
fn build_roster() -> Vec<agents::Agent> {
    let roster = default_roster();
    match env::var("EXPERTFLOW_MODEL") {
        Ok(model) => roster
            .into_iter()
            .map(|agent| agent.with_model(model.clone()))
            .collect(),
        Err(_) => roster,
    }
}

fn print_roster(registry: &AgentRegistry) -> anyhow::Result<()> {
    let mut roster = registry
        .agents()
        .map(|agent| {
            json!({
                "name": agent.name,
                "description": agent.description,
                "model": agent.model_name,
                "default": agent.name == registry.default_agent().name,
            })
        })
        .collect::<Vec<_>>();
    roster.sort_by_key(|entry| entry["name"].as_str().map(str::to_string));

    println!("{}", serde_json::to_string_pretty(&roster)?);
    Ok(())
}

async fn run_single(
    manager: &ConversationManager,
    user_id: &str,
    prompt: String,
) -> anyhow::Result<()> {
    let result = manager.process_turn(user_id, &prompt).await.map_err(|err| {
        error!(?err, "Turn failed");
        err
    })?;

    print_turn(&result);
    Ok(())
}

async fn run_repl(manager: &ConversationManager, user_id: &str) -> anyhow::Result<()> {
    println!("expertflow ready. Type 'exit' to quit.\n");
    let stdin = io::stdin();

    loop {
        print!("You > ");
        io::stdout().flush()?;

        let mut buffer = String::new();
        if stdin.read_line(&mut buffer)? == 0 {
            break;
        }
        let trimmed = buffer.trim();

        if trimmed.eq_ignore_ascii_case("exit") {
            info!("User exited CLI");
            break;
        }

        if trimmed.is_empty() {
            continue;
        }

        match manager.process_turn(user_id, trimmed).await {
            Ok(result) => print_turn(&result),
            Err(err) => {
                error!(?err, "Turn failed");
                println!("\n[turn did not complete: {err:#}]\n");
            }
        }
    }

    Ok(())
}

fn print_turn(result: &TurnResult) {
    if result.switched_context {
        println!("\n[switched to {}]", result.agent_name);
    }
    println!("\n{} >\n{}\n", result.agent_name, result.content);
}
