use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use gcp_role_checker::checker::audit::{self, MemberType, SortKey};
use gcp_role_checker::checker::discovery::{parse_labels, ProjectFilter};
use gcp_role_checker::checker::fanout::{FailurePolicy, FanOut};
use gcp_role_checker::checker::{report, run_checker, CheckerOptions};
use gcp_role_checker::config::Config;
use gcp_role_checker::gcp::client::GcpClient;
use gcp_role_checker::gcp::http::format_gcp_error;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Enumerate IAM role bindings across a GCP organization
#[derive(Parser, Debug)]
#[command(name = "gcp-role-checker", version, about, long_about = None)]
struct Args {
    /// The organization resource ID, e.g. organizations/999999999999
    #[arg(long, required_unless_present = "skip_collect")]
    org: Option<String>,

    /// Labels to filter projects on, e.g. env:dev,project:foo
    #[arg(long = "project_labels", default_value = "")]
    project_labels: String,

    /// Directory where roles.json and members.json are written
    #[arg(long)]
    data: Option<PathBuf>,

    /// Config file (default: <config dir>/gcp-role-checker/config.yaml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Maximum concurrent API calls per phase
    #[arg(long)]
    max_concurrency: Option<usize>,

    /// Failure handling for role and policy fetches
    #[arg(long, value_enum)]
    on_error: Option<FailurePolicy>,

    /// Failure handling while listing folders
    #[arg(long, value_enum)]
    folder_errors: Option<FailurePolicy>,

    /// Print the most privileged members after the run
    #[arg(long)]
    summary: bool,

    /// Read an existing members.json instead of querying GCP (implies --summary)
    #[arg(long)]
    skip_collect: bool,

    /// Only rank members of this type
    #[arg(long, value_enum)]
    member_type: Option<MemberType>,

    /// Ranking used by the summary
    #[arg(long, value_enum, default_value = "total-sum")]
    sort: SortKey,

    /// Maximum number of members in the summary
    #[arg(long, default_value_t = audit::DEFAULT_LIMIT)]
    limit: usize,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    log_level: LogLevel,

    /// Append logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

fn setup_logging(
    level: LogLevel,
    log_file: Option<&PathBuf>,
) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    // RUST_LOG wins over --log-level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_directive()));

    let (writer, guard) = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_appender::non_blocking(file)
        }
        None => tracing_appender::non_blocking(std::io::stderr()),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(log_file.is_none())
        .with_target(true)
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level, args.log_file.as_ref())?;
    tracing::info!("gcp-role-checker {} started", env!("CARGO_PKG_VERSION"));

    let config = Config::load(args.config.as_deref())?;
    let data_dir = config.effective_data_dir(args.data.clone());

    if args.skip_collect {
        let members = report::load_members(&data_dir)?;
        print_summary(&args, &members);
        return Ok(());
    }

    let Some(organization) = args.org.clone() else {
        bail!("--org is required");
    };

    let options = CheckerOptions {
        organization,
        project_filter: ProjectFilter::new(parse_labels(&args.project_labels)?),
        fan_out: FanOut {
            max_concurrency: config.effective_max_concurrency(args.max_concurrency),
            on_error: config.effective_on_error(args.on_error),
        },
        folder_errors: config.effective_folder_errors(args.folder_errors),
    };
    tracing::info!(
        "Auditing {} (max concurrency {}, on error {}, folder errors {})",
        options.organization,
        options.fan_out.max_concurrency,
        options.fan_out.on_error,
        options.folder_errors
    );

    let client = GcpClient::new(config.endpoints.clone()).await?;

    let result = run_checker(&client, &options).await;
    let collected = match result {
        Ok(collected) => collected,
        Err(err) => {
            tracing::error!("{}", format_gcp_error(&err));
            return Err(err);
        }
    };

    for warning in &collected.warnings {
        tracing::warn!("Incomplete data: {}", warning);
    }

    let written = report::write_report(&data_dir, &collected.catalog, &collected.members)?;
    tracing::info!(
        "Done: {} roles, {} members, {} of {} projects audited ({}, {})",
        collected.catalog.len(),
        collected.members.len(),
        collected.projects_audited,
        collected.projects_listed,
        written.roles.display(),
        written.members.display()
    );

    if args.summary {
        print_summary(&args, &collected.members);
    }

    Ok(())
}

fn print_summary(args: &Args, members: &gcp_role_checker::checker::model::MemberMap) {
    let ranked = audit::rank_members(members, args.member_type, args.sort, args.limit);
    print!("{}", audit::render_ranking(&ranked));
}
