//! tripcraft - conversational travel-itinerary planner
//!
//! CLI entry point. Builds the collaborator stack from configuration and
//! routes each invocation through the session orchestrator, printing the
//! turn's `TripResult` as JSON on stdout.

use std::sync::Arc;

use clap::Parser;
use eyre::{Context, Result};
use tracing::{debug, info};

use tripcraft::cli::{Cli, Command, SessionFile};
use tripcraft::config::Config;
use tripcraft::domain::TripResult;
use tripcraft::geo::{MapboxGeocoder, PlaceEnricher, StaticGazetteer};
use tripcraft::llm::{GenerationClient, GradientClient};
use tripcraft::orchestrator::{FollowUpRequest, SessionOrchestrator};
use tripcraft::prompts::PromptLoader;
use tripcraft::search::{SearchContextBuilder, SerpSearchProvider};

fn setup_logging(cli_log_level: Option<&str>) -> Result<()> {
    let level = match cli_log_level.map(str::to_uppercase).as_deref() {
        Some("TRACE") => tracing::Level::TRACE,
        Some("DEBUG") => tracing::Level::DEBUG,
        Some("INFO") | None => tracing::Level::INFO,
        Some("WARN") | Some("WARNING") => tracing::Level::WARN,
        Some("ERROR") => tracing::Level::ERROR,
        Some(other) => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", other);
            tracing::Level::INFO
        }
    };

    // Results go to stdout; logs stay on stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

/// Wire the collaborator stack into an orchestrator
fn build_orchestrator(config: &Config) -> Result<SessionOrchestrator> {
    debug!("build_orchestrator: called");

    let engine = GradientClient::from_config(&config.llm).wrap_err("Failed to build LLM client")?;
    let client = Arc::new(GenerationClient::new(Arc::new(engine)));

    let geocoder = MapboxGeocoder::from_config(&config.geocoding).wrap_err("Failed to build geocoder")?;
    let enricher = Arc::new(PlaceEnricher::new(Arc::new(geocoder), Arc::new(StaticGazetteer)));

    let provider = SerpSearchProvider::from_config(&config.search).wrap_err("Failed to build search provider")?;
    let search = Arc::new(SearchContextBuilder::new(Arc::new(provider)));

    let cwd = std::env::current_dir().wrap_err("Failed to resolve working directory")?;
    let prompts = Arc::new(PromptLoader::new(cwd));

    Ok(SessionOrchestrator::new(client, prompts, search, enricher, config.limits.clone()))
}

fn print_result(result: &TripResult) -> Result<()> {
    let json = serde_json::to_string_pretty(result).wrap_err("Failed to serialize result")?;
    println!("{json}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.log_level.as_deref()).wrap_err("Failed to setup logging")?;

    let config = Config::load(cli.config.as_deref()).wrap_err("Failed to load configuration")?;
    info!("tripcraft loaded config: model={}", config.llm.model);

    let orchestrator = build_orchestrator(&config)?;

    debug!("main: dispatching command");
    match cli.command {
        Command::Plan { text, premium, session } => {
            debug!(premium, "main: matched Plan command");
            let result = orchestrator.plan_trip(&text, premium).await;
            print_result(&result)?;

            if let Some(path) = session {
                SessionFile::from_result(&text, &result).save(&path)?;
                info!(path = %path.display(), "Session written");
            }
            Ok(())
        }
        Command::Continue { instruction, session, premium } => {
            debug!(premium, "main: matched Continue command");
            let mut state = SessionFile::load(&session)?;

            let request = FollowUpRequest {
                destination: state.destination.clone(),
                destination_type: state.destination_type,
                interests: state.interests.clone(),
                days: state.days,
                places: state.places.clone(),
                instruction: instruction.clone(),
                original_request: Some(state.original_request.clone()),
                chat_history: state.chat_history.clone(),
                premium,
            };
            let result = orchestrator.continue_trip(request).await;
            print_result(&result)?;

            state.absorb_turn(&instruction, &result);
            state.save(&session)?;
            Ok(())
        }
    }
}
