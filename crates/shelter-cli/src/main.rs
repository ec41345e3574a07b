//! Shelter analytics CLI
//!
//! The `shelter` command records sensor readings, flags anomalies and ranks
//! volunteers by activity.
//!
//! ## Commands
//!
//! - `seed`: Load volunteers, tasks and readings from a JSON fixture
//! - `record`: Store a reading and evaluate it against recent history
//! - `evaluate`: Evaluate a value against a window file (no database)
//! - `latest`: Re-evaluate the newest stored reading of one or more series
//! - `history`: Show readings for a subject
//! - `rank`: Rank volunteers by activity index
//! - `completed`: Count completed tasks for a volunteer
//! - `config`: Print the effective analytics configuration

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use shelter_core::{
    resolve_as_of, ActivityScorer, ActivityService, AnomalyDetector, AnomalyResult,
    DetectionPolicy, Metric, NewReading, NewTask, Reading, ReadingId, ReadingWindow,
    RecordedReading, ShelterConfig, SubjectId, SubjectSpan, TelemetryService, VolunteerId,
    VolunteerScore, METRICS,
};
use shelter_state::{
    ReadingStore, StorageError, SurrealShelterStore, TaskStore, VolunteerDirectory,
};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn, Level};

#[derive(Parser)]
#[command(name = "shelter")]
#[command(author = "Shelter Backend Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Shelter telemetry anomaly detection and volunteer scoring", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Analytics configuration file (TOML)
    #[arg(short, long, global = true, env = "SHELTER_CONFIG")]
    config: Option<PathBuf>,

    /// JSON fixture loaded into the store before the command runs
    #[arg(long, global = true)]
    seed: Option<PathBuf>,

    /// Format of command results on stdout
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Load volunteers, tasks and readings from a JSON fixture
    Seed {
        /// Path to the fixture file
        fixture: PathBuf,
    },

    /// Record a sensor reading and evaluate it against recent history
    Record {
        #[arg(long)]
        subject: i64,

        /// Temperature or Humidity
        #[arg(long)]
        metric: Metric,

        #[arg(long, allow_negative_numbers = true)]
        value: f64,

        /// Reading time (RFC 3339 or YYYY-MM-DD, default: now)
        #[arg(long)]
        at: Option<String>,
    },

    /// Evaluate a value against a window file without touching the store
    Evaluate {
        /// Window file (JSON): stored readings or bare values, newest first
        #[arg(short, long)]
        window: PathBuf,

        #[arg(long, allow_negative_numbers = true)]
        value: f64,

        /// Override the configured detection policy
        #[arg(long)]
        policy: Option<DetectionPolicy>,
    },

    /// Re-evaluate the newest stored reading of one or more series
    Latest {
        /// Subject id (repeatable)
        #[arg(long = "subject", required = true)]
        subjects: Vec<i64>,

        #[arg(long)]
        metric: Metric,
    },

    /// Show readings for a subject, newest first
    History {
        subject: i64,

        /// Maximum number of readings to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Rank volunteers by activity index
    Rank {
        /// Reference time (RFC 3339 or YYYY-MM-DD, default: now)
        #[arg(long)]
        as_of: Option<String>,
    },

    /// Count completed tasks for a volunteer
    Completed { volunteer: i64 },

    /// Print the effective analytics configuration
    Config,
}

/// Seed data for the store.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Fixture {
    volunteers: Vec<VolunteerId>,
    tasks: Vec<NewTask>,
    readings: Vec<NewReading>,
}

impl Fixture {
    fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixture {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse fixture {}", path.display()))
    }
}

#[derive(Debug, Default, PartialEq, Serialize)]
struct SeedSummary {
    volunteers: usize,
    tasks: usize,
    readings: usize,
}

/// Window file accepted by `evaluate`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WindowFile {
    Values {
        subject_id: SubjectId,
        metric: Metric,
        values: Vec<f64>,
    },
    Readings(ReadingWindow),
}

impl WindowFile {
    fn into_window(self) -> ReadingWindow {
        match self {
            WindowFile::Readings(window) => window,
            WindowFile::Values {
                subject_id,
                metric,
                values,
            } => {
                let now = Utc::now();
                let readings = values
                    .into_iter()
                    .enumerate()
                    .map(|(i, value)| Reading {
                        id: ReadingId::new(),
                        subject_id,
                        metric,
                        value,
                        timestamp: now - Duration::seconds(i as i64),
                    })
                    .collect();
                ReadingWindow::new(subject_id, metric, readings)
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    shelter_core::init_tracing(cli.json, level);

    let config = load_config(cli.config.as_deref())?;
    let output = cli.output;
    let seed = cli.seed.as_deref();

    let result = match cli.command {
        Commands::Config => cmd_config(&config, output),
        Commands::Evaluate {
            window,
            value,
            policy,
        } => cmd_evaluate(&config, &window, value, policy, output),
        Commands::Seed { fixture } => {
            let store = open_store(seed).await?;
            cmd_seed(store.as_ref(), &fixture, output).await
        }
        Commands::Record {
            subject,
            metric,
            value,
            at,
        } => {
            let telemetry = telemetry_service(open_store(seed).await?, &config)?;
            cmd_record(&telemetry, SubjectId(subject), metric, value, at.as_deref(), output).await
        }
        Commands::Latest { subjects, metric } => {
            let telemetry = telemetry_service(open_store(seed).await?, &config)?;
            cmd_latest(&telemetry, &subjects, metric, output).await
        }
        Commands::History { subject, limit } => {
            let telemetry = telemetry_service(open_store(seed).await?, &config)?;
            cmd_history(&telemetry, SubjectId(subject), limit, output).await
        }
        Commands::Rank { as_of } => {
            let activity = activity_service(open_store(seed).await?, &config)?;
            cmd_rank(&activity, as_of.as_deref(), output).await
        }
        Commands::Completed { volunteer } => {
            let activity = activity_service(open_store(seed).await?, &config)?;
            cmd_completed(&activity, VolunteerId(volunteer), output).await
        }
    };

    METRICS.flush();
    result
}

fn load_config(path: Option<&Path>) -> Result<ShelterConfig> {
    match path {
        Some(path) => ShelterConfig::load(path)
            .with_context(|| format!("Failed to load configuration {}", path.display())),
        None => Ok(ShelterConfig::default()),
    }
}

/// Connect to the database named by the environment and apply `--seed`.
async fn open_store(seed: Option<&Path>) -> Result<Arc<SurrealShelterStore>> {
    let store = SurrealShelterStore::from_env()
        .await
        .context("Failed to connect to shelter database")?;
    if let Some(path) = seed {
        let fixture = Fixture::load(path)?;
        let summary = seed_store(&store, &fixture).await?;
        info!(
            volunteers = summary.volunteers,
            tasks = summary.tasks,
            readings = summary.readings,
            "fixture loaded"
        );
    }
    Ok(Arc::new(store))
}

fn telemetry_service(
    store: Arc<SurrealShelterStore>,
    config: &ShelterConfig,
) -> Result<TelemetryService> {
    let detector = AnomalyDetector::new(config.detector.clone())?;
    Ok(TelemetryService::new(store, detector))
}

fn activity_service(
    store: Arc<SurrealShelterStore>,
    config: &ShelterConfig,
) -> Result<ActivityService> {
    let scorer = ActivityScorer::new(config.scorer.clone())?;
    Ok(ActivityService::new(store.clone(), store, scorer))
}

/// Write a fixture into any store. Volunteers referenced only by tasks are
/// registered too; already registered volunteers are skipped.
async fn seed_store<S>(store: &S, fixture: &Fixture) -> Result<SeedSummary>
where
    S: ReadingStore + TaskStore + VolunteerDirectory,
{
    let volunteers: BTreeSet<VolunteerId> = fixture
        .volunteers
        .iter()
        .copied()
        .chain(fixture.tasks.iter().map(|t| t.volunteer_id))
        .collect();

    let mut summary = SeedSummary::default();
    for volunteer_id in volunteers {
        match store.register_volunteer(volunteer_id).await {
            Ok(()) => summary.volunteers += 1,
            Err(StorageError::DuplicateVolunteer { .. }) => {
                warn!(volunteer_id = %volunteer_id, "volunteer already registered, skipping");
            }
            Err(e) => return Err(e).context("Failed to register volunteer"),
        }
    }
    for task in &fixture.tasks {
        store
            .add_task(task.clone())
            .await
            .with_context(|| format!("Failed to add task '{}'", task.title))?;
        summary.tasks += 1;
    }
    for reading in &fixture.readings {
        store
            .append_reading(reading.clone())
            .await
            .context("Failed to append reading")?;
        summary.readings += 1;
    }
    Ok(summary)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print the effective configuration
fn cmd_config(config: &ShelterConfig, output: OutputFormat) -> Result<()> {
    match output {
        OutputFormat::Json => print_json(config),
        OutputFormat::Text => {
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}

/// Evaluate a value against a window file
fn cmd_evaluate(
    config: &ShelterConfig,
    window_path: &Path,
    value: f64,
    policy: Option<DetectionPolicy>,
    output: OutputFormat,
) -> Result<()> {
    let text = std::fs::read_to_string(window_path)
        .with_context(|| format!("Failed to read window {}", window_path.display()))?;
    let window = serde_json::from_str::<WindowFile>(&text)
        .with_context(|| format!("Failed to parse window {}", window_path.display()))?
        .into_window();

    let mut detector_config = config.detector.clone();
    if let Some(policy) = policy {
        detector_config.policy = policy;
    }
    let _span = SubjectSpan::enter(window.subject_id);
    let result = AnomalyDetector::new(detector_config)?.evaluate(&window, value)?;
    METRICS.inc_readings_evaluated();

    match output {
        OutputFormat::Json => print_json(&result),
        OutputFormat::Text => {
            println!("{}", render_verdict(window.subject_id, window.metric, &result));
            Ok(())
        }
    }
}

/// Load a fixture into the store
async fn cmd_seed<S>(store: &S, fixture: &Path, output: OutputFormat) -> Result<()>
where
    S: ReadingStore + TaskStore + VolunteerDirectory,
{
    let fixture = Fixture::load(fixture)?;
    let summary = seed_store(store, &fixture).await?;
    match output {
        OutputFormat::Json => print_json(&summary),
        OutputFormat::Text => {
            println!(
                "Seeded {} volunteers, {} tasks, {} readings",
                summary.volunteers, summary.tasks, summary.readings
            );
            Ok(())
        }
    }
}

/// Record a reading
async fn cmd_record(
    telemetry: &TelemetryService,
    subject: SubjectId,
    metric: Metric,
    value: f64,
    at: Option<&str>,
    output: OutputFormat,
) -> Result<()> {
    let mut reading = NewReading::now(subject, metric, value);
    if let Some(at) = at {
        reading = reading.at(resolve_as_of(at)?);
    }
    let recorded = telemetry
        .record_reading(reading)
        .await
        .context("Failed to record reading")?;

    match output {
        OutputFormat::Json => print_json(&recorded),
        OutputFormat::Text => {
            println!("Recorded {}", recorded.reading.id);
            println!("{}", render_verdict(subject, metric, &recorded.anomaly));
            Ok(())
        }
    }
}

/// Re-evaluate the newest reading of each requested series
async fn cmd_latest(
    telemetry: &TelemetryService,
    subjects: &[i64],
    metric: Metric,
    output: OutputFormat,
) -> Result<()> {
    let series: Vec<(SubjectId, Metric)> =
        subjects.iter().map(|id| (SubjectId(*id), metric)).collect();
    let results = telemetry.evaluate_many(&series).await?;

    match output {
        OutputFormat::Json => {
            let found: Vec<&RecordedReading> = results.iter().flatten().collect();
            print_json(&found)
        }
        OutputFormat::Text => {
            for ((subject, metric), result) in series.iter().zip(&results) {
                match result {
                    Some(recorded) => {
                        println!("{}", render_verdict(*subject, *metric, &recorded.anomaly))
                    }
                    None => println!("subject {subject} {metric}: no readings"),
                }
            }
            Ok(())
        }
    }
}

/// Show readings for a subject
async fn cmd_history(
    telemetry: &TelemetryService,
    subject: SubjectId,
    limit: usize,
    output: OutputFormat,
) -> Result<()> {
    let mut readings = telemetry.history(subject).await?;
    readings.truncate(limit);

    match output {
        OutputFormat::Json => print_json(&readings),
        OutputFormat::Text => {
            if readings.is_empty() {
                println!("No readings found for subject {subject}");
                return Ok(());
            }
            print!("{}", render_history(&readings));
            Ok(())
        }
    }
}

/// Rank volunteers by activity
async fn cmd_rank(
    activity: &ActivityService,
    as_of: Option<&str>,
    output: OutputFormat,
) -> Result<()> {
    let as_of = match as_of {
        Some(text) => resolve_as_of(text)?,
        None => Utc::now(),
    };
    let scores = activity.rank(as_of).await.context("Failed to rank volunteers")?;

    match output {
        OutputFormat::Json => print_json(&scores),
        OutputFormat::Text => {
            if scores.is_empty() {
                println!("No volunteers registered.");
                return Ok(());
            }
            print!("{}", render_scores(&scores));
            Ok(())
        }
    }
}

/// Count completed tasks for a volunteer
async fn cmd_completed(
    activity: &ActivityService,
    volunteer: VolunteerId,
    output: OutputFormat,
) -> Result<()> {
    let count = activity.completed_count(volunteer).await?;
    match output {
        OutputFormat::Json => print_json(&serde_json::json!({
            "volunteer_id": volunteer,
            "completed_tasks": count,
        })),
        OutputFormat::Text => {
            println!("volunteer {volunteer}: {count} completed tasks");
            Ok(())
        }
    }
}

fn render_verdict(subject: SubjectId, metric: Metric, result: &AnomalyResult) -> String {
    let verdict = if result.is_anomaly { "ANOMALY" } else { "ok" };
    let mut line = format!(
        "subject {subject} {metric} {} {}: {verdict} (mean {:.2}, std dev {:.2})",
        result.current,
        metric.unit(),
        result.mean,
        result.std_dev
    );
    if let Some(reason) = &result.reason {
        line.push_str(" - ");
        line.push_str(reason);
    }
    line
}

fn render_history(readings: &[Reading]) -> String {
    readings
        .iter()
        .map(|r| {
            format!(
                "{}  {:<11} {:>8.2} {}\n",
                r.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
                r.metric,
                r.value,
                r.metric.unit()
            )
        })
        .collect()
}

fn render_scores(scores: &[VolunteerScore]) -> String {
    let mut out = format!(
        "{:<4} {:>10} {:>9} {:>7} {:>6}\n",
        "rank", "volunteer", "completed", "overdue", "index"
    );
    for (rank, score) in scores.iter().enumerate() {
        out.push_str(&format!(
            "{:<4} {:>10} {:>9} {:>7} {:>6.2}\n",
            rank + 1,
            score.volunteer_id,
            score.completed_tasks,
            score.overdue_tasks,
            score.activity_index
        ));
    }
    out
}
