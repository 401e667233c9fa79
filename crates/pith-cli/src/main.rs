//! pith - terminal chat client with bounded web-search tool calling

mod commands;
mod config;
mod display;
mod input;
mod logging;
mod repl;
mod segment;
mod tools;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use pith_agent::{
    Conversation, Orchestrator, OrchestratorConfig, ProviderGateway, ToolExecutor, ToolRegistry,
};
use pith_ai::models::{find_model, get_all_models, get_model_by_id};
use pith_ai::providers::get_api_key;
use pith_ai::providers::openai::OpenAIProvider;

/// pith - chat with a hosted model that can search the web
#[derive(Parser, Debug)]
#[command(name = "pith")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Model to use (default: grok-3-mini-beta)
    #[arg(short, long)]
    model: Option<String>,

    /// Config file (default: ~/.config/pith/config.toml, or PITH_CONFIG_PATH)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log file, overwritten at startup (default: app.log)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Do not offer the web_search tool to the model
    #[arg(long)]
    no_tools: bool,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize config and exit
    if args.init_config {
        match config::Config::init(args.config.as_deref()) {
            Ok(path) => {
                println!("Config file created at: {}", path.display());
                println!("\nExample config:\n{}", config::example_config());
            }
            Err(e) => {
                eprintln!("Error creating config: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    // Merge config with CLI args (CLI takes precedence)
    let cfg = config::Config::load(args.config.as_deref());
    let mut settings = config::Settings::from_config(&cfg);
    if let Some(model) = args.model {
        settings.model = model;
    }
    if let Some(path) = args.log_file {
        settings.log_file = path;
    }

    logging::init(&settings.log_file, args.verbose)?;

    let models = get_all_models();
    let resolved =
        get_model_by_id(&settings.model).or_else(|| find_model(&settings.model, &models));
    let Some(model) = resolved else {
        eprintln!("Error: No model found matching '{}'", settings.model);
        let ids: Vec<&str> = models.iter().map(|m| m.id.as_str()).collect();
        eprintln!("Available models: {}", ids.join(", "));
        std::process::exit(1);
    };
    let model = repl::with_base_url(model, settings.base_url.as_deref());

    let api_key_var = model.provider.api_key_env_var().unwrap_or("XAI_API_KEY");
    let api_key = match get_api_key(cfg.api_key.as_deref(), api_key_var) {
        Ok(key) => key,
        Err(_) => {
            eprintln!("Error: No API key found for {}", model.provider.name());
            eprintln!();
            eprintln!("Set your API key with: export {}=your-key", api_key_var);
            eprintln!("Or add it to config file: pith --init-config");
            std::process::exit(1);
        }
    };

    let provider = Arc::new(OpenAIProvider::new(api_key).context("cannot build HTTP client")?);

    let registry = if args.no_tools {
        ToolRegistry::new()
    } else {
        let backend =
            Arc::new(tools::DuckDuckGo::new().context("cannot build search client")?);
        ToolRegistry::new().with_tool(Arc::new(
            tools::WebSearchTool::new(backend).with_limit(settings.search_results),
        ))
    };

    tracing::info!(
        model = %model.id,
        tools = ?registry.names(),
        history_cap = settings.history_cap,
        max_tool_iterations = settings.max_tool_iterations,
        parallel_tools = settings.parallel_tools,
        "starting pith"
    );

    let gateway = Arc::new(ProviderGateway::new(
        provider,
        model,
        settings.completion_options(),
    ));
    let executor = ToolExecutor::new(Arc::new(registry)).with_timeout(settings.tool_timeout);
    let orchestrator = Orchestrator::new(
        gateway.clone(),
        executor,
        OrchestratorConfig {
            max_iterations: settings.max_tool_iterations,
            parallel_tools: settings.parallel_tools,
        },
    );
    let conversation = Conversation::new(settings.system_prompt.clone(), settings.history_cap);

    repl::Session::new(orchestrator, gateway, conversation, models, settings.base_url)
        .run()
        .await
}
