//! Funnel Conversion Engine
//!
//! Batch analysis over a slice of conversion events:
//! - Event validation and schema enforcement
//! - Optional conversion-goal re-tagging
//! - Funnel flow, drop-off, and attribution computed concurrently

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use analytics::{
    analyze_attribution, analyze_dropoff, calculate_funnel_flow, check_slice_size,
    scope_to_funnel, AttributionPolicy, FunnelReport, TimeWindow,
};
use engine_core::{
    limits::MAX_SLICE_EVENTS, retag_conversions, validate_json_batch, ConversionEvent,
    ConversionGoal, FunnelDefinition, GoalRegistry,
};
use telemetry::{init_tracing_from_env, metrics};

/// Application configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Config {
    /// JSON array of raw conversion events
    #[serde(default = "default_events_path")]
    events_path: PathBuf,

    /// JSON funnel definition
    #[serde(default = "default_funnel_path")]
    funnel_path: PathBuf,

    /// JSON array of conversion goals
    #[serde(default)]
    goals_path: Option<PathBuf>,

    /// Goal to re-tag conversions with; requires `goals_path`
    #[serde(default)]
    goal_id: Option<String>,

    #[serde(default = "default_true")]
    scope_to_funnel: bool,

    #[serde(default)]
    window_start_ms: Option<i64>,
    #[serde(default)]
    window_end_ms: Option<i64>,

    #[serde(default)]
    attribution_policy: AttributionPolicy,

    #[serde(default = "default_max_events")]
    max_events: usize,

    /// Abort when any event fails validation
    #[serde(default = "default_true")]
    strict: bool,

    /// Report destination; stdout when unset
    #[serde(default)]
    output_path: Option<PathBuf>,
}

fn default_events_path() -> PathBuf {
    PathBuf::from("events.json")
}

fn default_funnel_path() -> PathBuf {
    PathBuf::from("funnel.json")
}

fn default_true() -> bool {
    true
}

fn default_max_events() -> usize {
    MAX_SLICE_EVENTS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            events_path: default_events_path(),
            funnel_path: default_funnel_path(),
            goals_path: None,
            goal_id: None,
            scope_to_funnel: true,
            window_start_ms: None,
            window_end_ms: None,
            attribution_policy: AttributionPolicy::default(),
            max_events: default_max_events(),
            strict: true,
            output_path: None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing_from_env();

    info!("Starting Funnel Engine v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;
    info!(
        events = %config.events_path.display(),
        funnel = %config.funnel_path.display(),
        policy = ?config.attribution_policy,
        strict = config.strict,
        "Loaded config"
    );

    let funnel: FunnelDefinition = read_json(&config.funnel_path).context("Failed to load funnel")?;
    let events = load_events(&config)?;
    let events = prepare_slice(&config, &funnel, events)?;

    let report = run_analysis(Arc::new(funnel), events, config.attribution_policy).await?;
    write_report(&report, config.output_path.as_deref())?;

    let snapshot = metrics().snapshot();
    info!(
        validated = snapshot.events_validated,
        rejected = snapshot.events_rejected,
        analyzed = snapshot.events_analyzed,
        flow_ms = snapshot.flow_latency_mean_ms,
        dropoff_ms = snapshot.dropoff_latency_mean_ms,
        attribution_ms = snapshot.attribution_latency_mean_ms,
        "Analysis complete"
    );

    Ok(())
}

/// Load configuration from files and environment.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        .add_source(config::Config::try_from(&Config::default())?)
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("FUNNEL")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let config: Config = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    if config.goal_id.is_some() && config.goals_path.is_none() {
        bail!("goal_id is set but goals_path is not");
    }

    Ok(config)
}

fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = read_bytes(path)?;
    serde_json::from_slice(&bytes).with_context(|| format!("Invalid JSON in {}", path.display()))
}

/// Reads and validates the raw event batch element by element.
fn load_events(config: &Config) -> Result<Vec<ConversionEvent>> {
    let bytes = read_bytes(&config.events_path).context("Failed to load events")?;
    let (events, errors) = validate_json_batch(&bytes)
        .with_context(|| format!("Invalid events file {}", config.events_path.display()))?;
    let total = events.len() + errors.len();

    metrics().events_validated.inc_by(events.len() as u64);
    metrics().events_rejected.inc_by(errors.len() as u64);

    for err in &errors {
        warn!(code = err.error_code().unwrap_or("-"), "Rejected event: {}", err);
    }

    if config.strict && !errors.is_empty() {
        bail!("{} of {} events failed validation", errors.len(), total);
    }

    info!(accepted = events.len(), rejected = errors.len(), "Validated events");
    Ok(events)
}

/// Applies goal re-tagging, funnel scope, time window, and the size limit.
fn prepare_slice(
    config: &Config,
    funnel: &FunnelDefinition,
    mut events: Vec<ConversionEvent>,
) -> Result<Vec<ConversionEvent>> {
    if let (Some(goals_path), Some(goal_id)) = (&config.goals_path, &config.goal_id) {
        let goals: Vec<ConversionGoal> = read_json(goals_path).context("Failed to load goals")?;
        let registry = GoalRegistry::from_goals(goals);
        let goal = registry.resolve(goal_id)?;
        events = retag_conversions(goal, &events);
        info!(goal_id = %goal.id, funnel_id = %goal.funnel_id, "Re-tagged conversions");
    }

    if config.scope_to_funnel {
        events = scope_to_funnel(&events, &funnel.id);
    }

    let window = TimeWindow::new(config.window_start_ms, config.window_end_ms);
    if !window.is_unbounded() {
        events = window.apply(&events);
    }

    check_slice_size(events.len(), config.max_events)?;
    Ok(events)
}

/// Runs the three calculators on blocking threads over a shared slice.
async fn run_analysis(
    funnel: Arc<FunnelDefinition>,
    events: Vec<ConversionEvent>,
    policy: AttributionPolicy,
) -> Result<FunnelReport> {
    let events: Arc<[ConversionEvent]> = events.into();
    metrics().events_analyzed.inc_by(events.len() as u64);

    let flow = {
        let (events, funnel) = (events.clone(), funnel.clone());
        tokio::task::spawn_blocking(move || {
            let start = Instant::now();
            let flow = calculate_funnel_flow(&events, &funnel.id, &funnel.name, &funnel.steps);
            metrics().flow_runs.inc();
            metrics().flow_latency_ms.observe_since(start);
            flow
        })
    };

    let dropoff = {
        let (events, funnel) = (events.clone(), funnel.clone());
        tokio::task::spawn_blocking(move || {
            let start = Instant::now();
            let dropoff = analyze_dropoff(&events, &funnel.id, &funnel.steps);
            metrics().dropoff_runs.inc();
            metrics().dropoff_latency_ms.observe_since(start);
            dropoff
        })
    };

    let attribution = {
        let (events, funnel) = (events.clone(), funnel.clone());
        tokio::task::spawn_blocking(move || {
            let start = Instant::now();
            let attribution = analyze_attribution(&events, &funnel.id, policy);
            metrics().attribution_runs.inc();
            metrics().attribution_latency_ms.observe_since(start);
            attribution
        })
    };

    let (flow, dropoff, attribution) =
        tokio::try_join!(flow, dropoff, attribution).context("Analysis task failed")?;

    Ok(FunnelReport::from_parts(&funnel, events.len(), flow, dropoff, attribution))
}

fn write_report(report: &FunnelReport, output_path: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
    match output_path {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), "Wrote report");
        }
        None => println!("{}", json),
    }
    Ok(())
}
