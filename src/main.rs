use uragent::cli::commands::{CliArgs, Commands};
use uragent::cli::handlers::{
    handle_chat, handle_config, handle_preprocess, handle_tool, handle_tools,
};
use uragent::util::logging::{init_logging, parse_level, LoggingConfig};
use uragent::VERSION;

use clap::Parser;
use tracing::{debug, Level};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging(logging_config(&args));

    debug!("uragent v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Chat(chat_args) => handle_chat(chat_args, args.quiet).await,
        Commands::Tools(tools_args) => handle_tools(tools_args).await,
        Commands::Tool(tool_args) => handle_tool(tool_args).await,
        Commands::Preprocess(preprocess_args) => handle_preprocess(preprocess_args).await,
        Commands::Config(config_args) => handle_config(config_args).await,
    };

    std::process::exit(exit_code);
}

/// `--log-level` wins over `-v`/`-q`, which win over `UR_AGENT_LOG_LEVEL`
fn logging_config(args: &CliArgs) -> LoggingConfig {
    let mut config = LoggingConfig::from_env();

    if let Some(ref level) = args.log_level {
        match parse_level(level) {
            Some(level) => config.level = level,
            None => eprintln!(
                "Invalid log level '{}', using {}. Valid levels: trace, debug, info, warn, error",
                level, config.level
            ),
        }
    } else if args.verbose {
        config.level = Level::DEBUG;
    } else if args.quiet {
        config.level = Level::ERROR;
    }

    config
}
