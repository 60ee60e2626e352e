//! Command handlers. Each returns the process exit code.

use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tracing::{debug, error, info};

use super::commands::{ChatArgs, ConfigArgs, PreprocessArgs, ToolArgs, ToolsArgs};
use super::output::{ChatReply, OutputFormat, OutputFormatter};
use crate::agent::{AgentDefinition, AgentRunner, MemoryStore, Session, SessionStore, AGENT_NAME};
use crate::config::UrAgentConfig;
use crate::gcp::{default_token_provider, GcpClients};
use crate::llm::GenAIClient;
use crate::preprocessing::{Preprocessor, UploadEvent};
use crate::progress::{LoggingHandler, ProgressHandler, SpinnerHandler};
use crate::tools::{ToolContext, ToolSystem};

const EXIT_OK: i32 = 0;
const EXIT_FAILURE: i32 = 1;
const EXIT_CONFIG: i32 = 2;
const PROMPT: &str = "you> ";

fn load_config() -> Result<UrAgentConfig> {
    let config = UrAgentConfig::default();
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn build_tool_system(config: &UrAgentConfig) -> Result<ToolSystem> {
    let clients = GcpClients::from_config(config, default_token_provider())
        .context("Failed to create Google Cloud clients")?;
    let memory = MemoryStore::new(SessionStore::new(&config.session_dir));
    Ok(ToolSystem::new(&ToolContext::new(
        clients,
        config.clone(),
        memory,
    )))
}

fn print_output(output: &str) {
    print!("{}", output);
    if !output.ends_with('\n') {
        println!();
    }
}

fn report(result: Result<i32>) -> i32 {
    result.unwrap_or_else(|e| {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        EXIT_FAILURE
    })
}

pub async fn handle_chat(args: &ChatArgs, quiet: bool) -> i32 {
    let mut config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return EXIT_CONFIG;
        }
    };
    if let Some(provider) = args.provider {
        config.provider = provider;
    }
    if let Some(ref model) = args.model {
        config.model = model.clone();
    }
    if let Some(max_iterations) = args.max_iterations {
        config.max_iterations = max_iterations;
    }

    report(run_chat(args, &config, quiet).await)
}

async fn run_chat(args: &ChatArgs, config: &UrAgentConfig, quiet: bool) -> Result<i32> {
    let llm = GenAIClient::from_config(config)?;
    let tools = Arc::new(build_tool_system(config)?);
    let store = SessionStore::new(&config.session_dir);

    let mut session = match args.session {
        Some(ref id) => store
            .load(id)
            .with_context(|| format!("Cannot resume session {}", id))?,
        None => Session::new(AGENT_NAME),
    };
    info!(session = %session.id, model = %config.model, "Chat session ready");

    let runner = AgentRunner::new(
        AgentDefinition::ur_agent(config.model.clone()),
        Arc::new(llm),
        tools,
        config.max_iterations,
    )
    .with_session_store(store);

    let interactive = atty::is(atty::Stream::Stdin);
    let progress: Arc<dyn ProgressHandler> = if quiet || !atty::is(atty::Stream::Stderr) {
        Arc::new(LoggingHandler)
    } else {
        Arc::new(SpinnerHandler::new())
    };

    match args.message {
        Some(ref message) => one_shot(&runner, &mut session, message, args, progress).await,
        None if !interactive => {
            let mut message = String::new();
            tokio::io::stdin()
                .read_to_string(&mut message)
                .await
                .context("Failed to read message from stdin")?;
            if message.trim().is_empty() {
                return Err(anyhow!("No message given on the command line or stdin"));
            }
            one_shot(&runner, &mut session, message.trim(), args, progress).await
        }
        None => repl(&runner, &mut session, progress).await,
    }
}

async fn one_shot(
    runner: &AgentRunner,
    session: &mut Session,
    message: &str,
    args: &ChatArgs,
    progress: Arc<dyn ProgressHandler>,
) -> Result<i32> {
    let response = runner.run_turn(session, message, Some(progress)).await?;
    let formatter = OutputFormatter::new(args.format.into());
    print_output(&formatter.format_reply(&ChatReply {
        session_id: &session.id,
        response: &response,
    })?);
    Ok(EXIT_OK)
}

async fn repl(
    runner: &AgentRunner,
    session: &mut Session,
    progress: Arc<dyn ProgressHandler>,
) -> Result<i32> {
    println!(
        "{} ({}). Type 'exit' to quit. Session: {}",
        runner.definition().name,
        runner.definition().model,
        session.id
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{}", PROMPT);
        std::io::stdout().flush().context("Failed to flush stdout")?;

        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            break;
        };
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if matches!(message, "exit" | "quit") {
            break;
        }

        match runner.run_turn(session, message, Some(progress.clone())).await {
            Ok(response) => println!("\n{}\n", response.trim_end()),
            // A failed turn does not end the conversation
            Err(e) => eprintln!("\u{274C} {}\n", e),
        }
    }

    println!("Session saved: {}", session.id);
    Ok(EXIT_OK)
}

pub async fn handle_tools(args: &ToolsArgs) -> i32 {
    report(list_tools(args))
}

fn list_tools(args: &ToolsArgs) -> Result<i32> {
    let config = load_config()?;
    let system = build_tool_system(&config)?;
    let formatter = OutputFormatter::new(args.format.into());
    print_output(&formatter.format_tools(&system.as_tool_definitions())?);
    Ok(EXIT_OK)
}

pub async fn handle_tool(args: &ToolArgs) -> i32 {
    report(run_tool(args).await)
}

async fn run_tool(args: &ToolArgs) -> Result<i32> {
    let arguments: Value =
        serde_json::from_str(&args.args).context("--args must be a JSON object")?;
    if !arguments.is_object() {
        return Err(anyhow!("--args must be a JSON object, got {}", arguments));
    }

    let config = load_config()?;
    let system = build_tool_system(&config)?;
    debug!(tool = %args.name, "Invoking tool from the command line");

    let result = system.execute(&args.name, arguments).await?;
    let formatter = OutputFormatter::new(args.format.into());
    print_output(&formatter.format_tool_result(&args.name, &result)?);

    let failed = result["status"] == "error" || result.get("error").is_some();
    Ok(if failed { EXIT_FAILURE } else { EXIT_OK })
}

pub async fn handle_preprocess(args: &PreprocessArgs) -> i32 {
    report(run_preprocess(args).await)
}

async fn run_preprocess(args: &PreprocessArgs) -> Result<i32> {
    let event = UploadEvent::from_gcs_uri(&args.gcs_uri)?;
    let config = load_config()?;
    let clients = GcpClients::from_config(&config, default_token_provider())?;
    let preprocessor = Preprocessor::new(clients.storage, clients.document_ai, &config);

    let outcome = preprocessor.process_uploaded_document(&event).await?;
    let formatter = OutputFormatter::new(args.format.into());
    print_output(&formatter.format_preprocess(&outcome)?);
    Ok(EXIT_OK)
}

pub async fn handle_config(args: &ConfigArgs) -> i32 {
    let config = UrAgentConfig::default();
    let format: OutputFormat = args.format.into();
    let rendered = OutputFormatter::new(format).format_config(&config);

    report(rendered.map(|output| {
        print_output(&output);
        match config.validate() {
            Ok(()) => EXIT_OK,
            Err(e) => {
                eprintln!("\u{274C} {}", e);
                EXIT_CONFIG
            }
        }
    }))
}
