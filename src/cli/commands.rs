use clap::{Parser, Subcommand, ValueEnum};
use genai::adapter::AdapterKind;

use crate::config::parse_provider;

/// Requirements analyst agent backed by an LLM and Google Cloud document tools
#[derive(Parser, Debug)]
#[command(
    name = "uragent",
    version,
    author,
    long_about = "uragent reads documents from Cloud Storage, extracts their text with Document AI, \
                  and works with an LLM to turn them into structured user requirements. It can also \
                  manage buckets and Vertex AI RAG corpora on request."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - only errors are logged and no spinner is shown"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Talk to the requirements agent",
        long_about = "Without a message, starts an interactive session (or reads the message from \
                      stdin when it is not a terminal).\n\n\
                      Examples:\n  \
                      uragent chat\n  \
                      uragent chat \"Extract requirements from gs://ur-docs/rfp.pdf\"\n  \
                      uragent chat --session 2f0c... \"Make USR0003 high priority\""
    )]
    Chat(ChatArgs),

    #[command(about = "List the tools available to the agent")]
    Tools(ToolsArgs),

    #[command(
        about = "Invoke one tool directly",
        long_about = "Runs a single tool without the LLM.\n\n\
                      Examples:\n  \
                      uragent tool list_buckets\n  \
                      uragent tool list_blobs --args '{\"bucket_name\": \"ur-docs\"}'"
    )]
    Tool(ToolArgs),

    #[command(about = "OCR an uploaded PDF and store its text in the knowledge-base bucket")]
    Preprocess(PreprocessArgs),

    #[command(about = "Show the resolved configuration")]
    Config(ConfigArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct ChatArgs {
    #[arg(value_name = "MESSAGE", help = "Send one message and exit")]
    pub message: Option<String>,

    #[arg(long, value_name = "ID", help = "Resume a stored session")]
    pub session: Option<String>,

    #[arg(
        short = 'p',
        long,
        value_parser = parse_adapter_kind,
        help = "LLM provider (default: gemini or UR_AGENT_PROVIDER)"
    )]
    pub provider: Option<AdapterKind>,

    #[arg(short = 'm', long, value_name = "MODEL", help = "Model name")]
    pub model: Option<String>,

    #[arg(long, value_name = "N", help = "Maximum LLM round-trips per message")]
    pub max_iterations: Option<usize>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format for one-shot replies"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct ToolsArgs {
    #[arg(short = 'f', long, value_enum, default_value = "human", help = "Output format")]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct ToolArgs {
    #[arg(value_name = "NAME", help = "Tool name, as listed by `uragent tools`")]
    pub name: String,

    #[arg(
        short = 'a',
        long,
        value_name = "JSON",
        default_value = "{}",
        help = "Tool arguments as a JSON object"
    )]
    pub args: String,

    #[arg(short = 'f', long, value_enum, default_value = "json", help = "Output format")]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct PreprocessArgs {
    #[arg(value_name = "GCS_URI", help = "Uploaded object, e.g. gs://uploads/rfp.pdf")]
    pub gcs_uri: String,

    #[arg(short = 'f', long, value_enum, default_value = "human", help = "Output format")]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct ConfigArgs {
    #[arg(short = 'f', long, value_enum, default_value = "human", help = "Output format")]
    pub format: OutputFormatArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}

fn parse_adapter_kind(s: &str) -> Result<AdapterKind, String> {
    parse_provider(s).map_err(|_| {
        format!(
            "Invalid provider: {}. Valid options: gemini, openai, anthropic, ollama, xai, groq",
            s
        )
    })
}
