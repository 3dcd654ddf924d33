use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use relay_core::{logging, Config};
use relay_mcp::StdioConnector;
use relay_server::cli::{CliArgs, Command};
use relay_server::commands;

fn load_config(args: &CliArgs) -> anyhow::Result<Config> {
    relay_core::config::load_dotenv();
    let mut config = match &args.profile {
        Some(profile) => Config::from_vars(profile, &std::env::vars().collect())?,
        None => Config::from_env()?,
    };
    if let Some(script) = &args.server_script {
        config.mcp.server_script_path = Some(script.clone());
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    let config = load_config(&args).context("failed to load configuration")?;
    logging::init(&config.log).context("failed to initialize logging")?;
    config.log_summary();

    let script = config.require_server_script()?.clone();
    let connector = Arc::new(StdioConnector::new());

    match args.command() {
        Command::Serve => {
            let model = relay_llm::create_endpoint(&config.llm)?;
            commands::serve(&config, connector, model, &script).await?;
        }
        Command::Ask { query } => {
            let model = relay_llm::create_endpoint(&config.llm)?;
            let conversation =
                commands::ask(connector, model, &script, &query, config.resolver.cycle_limit())
                    .await?;
            println!("{}", serde_json::to_string_pretty(&conversation)?);
        }
        Command::Tools => {
            let tools = commands::list_tools(connector, &script).await?;
            info!(count = tools.len(), "Tool catalog");
            for tool in &tools {
                println!("{tool}");
            }
        }
    }

    Ok(())
}
