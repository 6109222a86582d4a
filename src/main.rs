use anyhow::Result;
use clap::Parser;
use colored::*;
use indicatif::ProgressBar;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};

use pdf_rdf_analyzer::{
    config::Configuration,
    core::{JulepClient, ResponseGenerator},
    graph::RdfGraph,
    handlers::{DocumentHandler, PdfHandler},
};

const RDF_QUERY: &str =
    "SELECT ?subject ?predicate ?object WHERE { ?subject ?predicate ?object . } LIMIT 10";

const DEFAULT_QUESTION: &str = "What are the insights from the dataset?";

#[derive(Parser)]
#[command(
    name = "pdf_rdf_analyzer",
    about = "Answer questions over PDF documents and RDF graphs using a hosted LLM agent",
    long_about = None,
    version
)]
struct Cli {
    /// PDF document to analyze
    #[arg(long, default_value = "data.pdf")]
    pdf: PathBuf,

    /// RDF graph file (RDF/XML; .ttl and .nt are also accepted)
    #[arg(long, default_value = "data.rdf")]
    rdf: PathBuf,

    /// Question to answer from the combined data
    #[arg(short, long, default_value = DEFAULT_QUESTION)]
    question: String,

    /// Configuration file path (YAML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Agent API base URL
    #[arg(long)]
    server_url: Option<String>,

    /// API key for the agent service
    #[arg(long)]
    api_key: Option<String>,

    /// Model backing the agent
    #[arg(long)]
    model: Option<String>,

    /// Seconds between execution status polls
    #[arg(long)]
    poll_interval: Option<u64>,

    /// Maximum seconds to wait for an execution to finish
    #[arg(long)]
    poll_timeout: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.debug {
        tracing::Level::DEBUG
    } else if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    run(cli).await
}

async fn run(cli: Cli) -> Result<()> {
    // Load configuration
    let mut config = match &cli.config {
        Some(path) => Configuration::from_file(path)?,
        None => Configuration::default(),
    };
    config.fill_from_env();

    // Override settings if provided
    if let Some(url) = cli.server_url {
        config.agent.base_url = url;
    }
    if let Some(key) = cli.api_key {
        config.agent.api_key = Some(key);
    }
    if let Some(model) = cli.model {
        config.agent.model = model;
    }
    if let Some(secs) = cli.poll_interval {
        config.poll.interval_secs = secs;
    }
    if let Some(secs) = cli.poll_timeout {
        config.poll.timeout_secs = secs;
    }

    config.validate()?;

    // Input files must exist before any parsing or remote call
    if !cli.pdf.exists() {
        anyhow::bail!("PDF file '{}' not found", cli.pdf.display());
    }
    if !cli.rdf.exists() {
        anyhow::bail!("RDF file '{}' not found", cli.rdf.display());
    }

    println!("{}", "Analyzing documents...".bright_blue().bold());
    println!(" PDF: {}", cli.pdf.display().to_string().bright_green());
    println!(" RDF: {}", cli.rdf.display().to_string().bright_green());
    println!(" Question: {}", cli.question.bright_cyan());

    // Extract PDF text; failures degrade to an empty block
    let pdf_text = match PdfHandler.extract_text(&cli.pdf).await {
        Ok(text) => {
            info!("Extracted {} characters from {}", text.len(), cli.pdf.display());
            text
        }
        Err(e) => {
            warn!("Error reading PDF file {}: {:#}", cli.pdf.display(), e);
            String::new()
        }
    };

    // Parse the RDF graph and run the fixed query; failures degrade too
    let rdf_results = match RdfGraph::from_file(&cli.rdf) {
        Ok(graph) => {
            if graph.is_empty() {
                warn!("RDF graph {} contains no triples", cli.rdf.display());
            }
            println!(
                " Parsed {} triples from {}",
                graph.len().to_string().bright_cyan(),
                cli.rdf.display().to_string().bright_green()
            );
            match graph.query_to_text(RDF_QUERY) {
                Ok(text) => text,
                Err(e) => {
                    warn!("Error querying RDF graph: {:#}", e);
                    String::new()
                }
            }
        }
        Err(e) => {
            warn!("Error parsing RDF file {}: {:#}", cli.rdf.display(), e);
            String::new()
        }
    };

    // Provision the remote agent
    let api_key = config.agent.api_key.clone().unwrap_or_default();
    let client = JulepClient::new(
        &config.agent.base_url,
        &api_key,
        config.agent.request_timeout_secs,
    )?;

    let agent = match client
        .create_agent(&config.agent.name, &config.agent.model, &config.agent.about)
        .await
    {
        Ok(agent) => {
            println!(" Agent created: {}", agent.name.bright_green());
            Some(agent)
        }
        Err(e) => {
            warn!("Error creating agent: {}", e);
            None
        }
    };

    // Generate the response
    let generator = ResponseGenerator::new(client, agent, config.poll.clone());

    let spinner = ProgressBar::new_spinner();
    spinner.set_message("Waiting for the agent to answer...");
    spinner.enable_steady_tick(Duration::from_millis(120));

    let outcome = generator
        .generate(&cli.question, &pdf_text, &rdf_results)
        .await;

    spinner.finish_and_clear();

    println!("\n{}", "Chatbot Response:".bright_yellow().bold());
    match outcome {
        Ok(result) => {
            if result.answer.is_empty() {
                warn!("Agent returned an empty answer");
            } else {
                println!("{}", result.answer);
            }
            info!(
                "Answered in {:.2}s (result {})",
                result.processing_time_seconds, result.id
            );
        }
        Err(e) => {
            error!("{}", e);
        }
    }

    Ok(())
}
