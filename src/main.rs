use anyhow::Context;
use clap::Parser;
use coworker::config::AgentConfig;
use coworker::provider::AnthropicAdapter;
use coworker::server::AgentServer;
use std::path::PathBuf;
use std::sync::Arc;

/// Turn execution engine for a local AI co-worker: boots the WebSocket
/// Session Server and exits when asked to shut down.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Address to bind the Session Server to.
    #[arg(long, default_value = "127.0.0.1:8787")]
    bind: String,

    /// Working directory the agent operates in. Defaults to the current
    /// directory.
    #[arg(long)]
    working_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let working_dir = match args.working_dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("resolving current directory")?,
    };

    let config = AgentConfig::load(&working_dir).context("loading configuration")?;
    let api_key = config.api_key_for("anthropic").unwrap_or_default();
    let adapter = Arc::new(AnthropicAdapter::new(api_key));

    let server = AgentServer::new(Arc::new(config), adapter);
    server.run(&args.bind).await.context("running session server")
}
