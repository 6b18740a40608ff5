use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use planner_core::{generate_plan, Clock, PlanRequest, SystemClock};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use study_planner::{
    api,
    assistant::{parse_topic_response, ConversationStore, ExtractionSource},
    client::PlannerClient,
    config::PlannerConfig,
    render,
};

#[derive(Parser)]
#[command(name = "splan")]
#[command(about = "Exam study planner: weighted topics in, a day-by-day schedule out")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the planner API server
    Serve {
        /// Port for HTTP API (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Preview a schedule from a topic-extraction response without a server
    Plan {
        /// File holding the response, raw model text or plain JSON
        file: PathBuf,

        #[arg(long)]
        exam_date: NaiveDate,

        #[arg(long)]
        daily_hours: f64,

        /// First study day (default: today)
        #[arg(long)]
        today: Option<NaiveDate>,

        /// Print the plan as JSON instead of a tree
        #[arg(long)]
        json: bool,
    },
    /// Check server status
    Status,
    /// Show a plan's progress dashboard
    Dashboard { plan_id: Uuid },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(
        |_| "study_planner=debug,planner_core=debug,tower_http=debug".into(),
    ));

    // stdout carries command output, so logs go to stderr
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => serve(port).await?,
        Commands::Plan {
            file,
            exam_date,
            daily_hours,
            today,
            json,
        } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let extraction = parse_topic_response(&raw);
            if extraction.source == ExtractionSource::Fallback {
                eprintln!("Could not read topics from {}, using defaults", file.display());
            }

            let plan = generate_plan(&PlanRequest {
                topics: extraction.topics,
                today: today.unwrap_or_else(|| SystemClock.today()),
                exam_date,
                daily_hours,
            })?;

            if json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            } else {
                print!("{}", render::render_plan(&plan));
            }
        }
        Commands::Status => {
            let client = PlannerClient::from_env();
            match client.health().await {
                Ok(_) => println!("Planner server is running at {}", client.base_url()),
                Err(e) => {
                    println!("Planner server is not reachable at {}", client.base_url());
                    return Err(e.into());
                }
            }
        }
        Commands::Dashboard { plan_id } => {
            let dashboard = PlannerClient::from_env().get_dashboard(plan_id).await?;

            println!(
                "Exam {} | {} days left | {:.2}% done ({}/{} sessions)",
                dashboard.exam_date,
                dashboard.days_remaining,
                dashboard.progress,
                dashboard.completed_sessions,
                dashboard.total_sessions
            );
            if dashboard.today_tasks.is_empty() {
                println!("Nothing scheduled today.");
            }
            for task in &dashboard.today_tasks {
                let mark = if task.completed { 'x' } else { ' ' };
                println!("[{}] {} ({:.2}h)", mark, task.topic, task.duration);
            }
        }
    }

    Ok(())
}

async fn serve(port: Option<u16>) -> anyhow::Result<()> {
    let config = PlannerConfig::load();
    let port = port.unwrap_or(config.port);
    tracing::info!("Starting study planner server on port {}", port);

    let db = config.open_database()?;
    db.migrate()?;

    let state = api::AppState::new(db).with_conversations(ConversationStore::new(
        config.history_limit,
        config.max_conversations,
    ));
    let security = api::SecurityConfig::from_env();
    if let Some(limiter) = security.rate_limiter.clone() {
        tokio::spawn(async move {
            let mut ticks = tokio::time::interval(Duration::from_secs(60));
            loop {
                ticks.tick().await;
                limiter.cleanup();
            }
        });
    }
    let app = api::create_router_with_security(state, security);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!("Study planner listening on http://127.0.0.1:{}", port);

    axum::serve(listener, app).await?;
    Ok(())
}
