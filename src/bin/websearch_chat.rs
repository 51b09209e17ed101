//! WebSearch Chat - standalone chat helper.
//!
//! Asks one question through the web-search tool loop, or runs a direct
//! search and prints the structured results.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use websearch_proxy::{
    agent::Agent,
    config::Config,
    llm::OpenAiCompatClient,
    search::{FallbackSearch, SearchBackend},
    tools::{ToolRegistry, DEFAULT_TOP_K},
};

const DEFAULT_QUESTION: &str =
    "Find the latest macOS release and summarize key features. Include sources.";

#[derive(Parser)]
#[command(name = "websearch-chat", version, about = "Websearch tool-enabled chat demo")]
struct Cli {
    /// Ask a question; will attempt tool-calling and fall back to a direct search summary
    #[arg(long, conflicts_with = "search")]
    ask: Option<String>,

    /// Run a direct web search and print JSON results (no model involved)
    #[arg(long)]
    search: Option<String>,

    /// Number of results for --search
    #[arg(long, visible_alias = "top_k", default_value_t = DEFAULT_TOP_K)]
    top_k: usize,

    /// Model to ask (defaults to DEFAULT_MODEL or llama3.1:8b)
    #[arg(long, env = "DEFAULT_MODEL")]
    model: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "websearch_proxy=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let search: Arc<dyn SearchBackend> = Arc::new(FallbackSearch::from_config(&config.search)?);

    if let Some(query) = cli.search {
        let outcome = search.search(&query, cli.top_k).await;
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    let llm = OpenAiCompatClient::from_config(&config).context("Cannot ask without a credential")?;
    let agent = Agent::new(Arc::new(llm), search, Arc::new(ToolRegistry::new()));

    let question = cli.ask.unwrap_or_else(|| DEFAULT_QUESTION.to_string());
    let model = cli.model.unwrap_or(config.default_model);
    let answer = agent.chat_with_websearch(&model, &question, None).await;

    println!("{}", answer.content());
    Ok(())
}
