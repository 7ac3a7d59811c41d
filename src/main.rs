mod render;

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveTime, Utc};
use clap::{Args, Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use tracing_subscriber::EnvFilter;

use gitrisk_core::{ComplexityMetric, GitriskConfig, OutputFormat, Pagination, RiskFilter};
use gitrisk_history::{
    AnalysisFilter, GitStore, History, HistoryStore, MemoryStore, MiningOptions, ProjectHistory,
    SqliteStore,
};
use gitrisk_pulse::{coupling, filter_by_risk, hotspots, overview, ownership};

const CONFIG_FILE: &str = ".gitrisk.toml";

/// Project id used for a git repository when `--project` is not given.
const LOCAL_PROJECT: &str = "local";

#[derive(Parser)]
#[command(
    name = "gitrisk",
    version,
    about = "Engineering-risk signals from version-control history",
    long_about = "gitrisk reads a project's commit log and reports files that change too often,\n\
                   files that change together, and files known by too few people.\n\n\
                   Examples:\n  \
                     gitrisk hotspots --repo .                 Rank high-churn files\n  \
                     gitrisk ownership --risk critical         List knowledge silos\n  \
                     gitrisk coupling --since 2024-01-01       Files that change together\n  \
                     gitrisk overview --snapshot history.json  Dashboard summary\n  \
                     gitrisk init                              Write a default .gitrisk.toml"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (default: .gitrisk.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format for command results.\n\n\
                       Formats:\n  \
                         text      Human-readable tables and summaries (default)\n  \
                         json      Machine-readable JSON\n  \
                         markdown  GitHub-flavored Markdown"
    )]
    format: OutputFormat,

    /// Log analysis decisions to stderr
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Rank files by change volume and flag hotspots
    #[command(long_about = "Rank files by change volume and flag hotspots.\n\n\
        A file is a hotspot when its metric (distinct commits by default) is strictly\n\
        above --min-complexity. Files are ranked by lines changed, then commit count.\n\n\
        Examples:\n  gitrisk hotspots --repo .\n  \
        gitrisk hotspots --metric complexity --min-complexity 40 --flagged")]
    Hotspots {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        filter: FilterArgs,
        #[command(flatten)]
        page: PageArgs,
        /// Only show files at this risk level
        #[arg(long, default_value = "all")]
        risk: RiskFilter,
        /// Signal compared against the threshold: change_count or complexity
        #[arg(long)]
        metric: Option<ComplexityMetric>,
        /// Flag files whose metric is strictly above this value
        #[arg(long)]
        min_complexity: Option<f64>,
        /// Hide files that are not hotspots
        #[arg(long)]
        flagged: bool,
    },
    /// Analyze knowledge ownership and bus factor
    #[command(long_about = "Analyze knowledge ownership and bus factor.\n\n\
        Contribution is lines changed, or commits when the history has no line counts.\n\
        Risk is classified on the primary owner's share.\n\n\
        Examples:\n  gitrisk ownership --repo .\n  \
        gitrisk ownership --risk critical --path src/auth")]
    Ownership {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        filter: FilterArgs,
        #[command(flatten)]
        page: PageArgs,
        /// Only show files at this risk level
        #[arg(long, default_value = "all")]
        risk: RiskFilter,
    },
    /// Detect files that change together
    #[command(long_about = "Detect files that change together.\n\n\
        Score is shared commits divided by the smaller file's commit count.\n\
        Commits touching more than --max-files-per-commit files are left out of pairing.\n\n\
        Examples:\n  gitrisk coupling --repo .\n  \
        gitrisk coupling --min-shared-commits 3 --min-coupling-score 0.5")]
    Coupling {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        filter: FilterArgs,
        #[command(flatten)]
        page: PageArgs,
        /// Minimum commits shared by both files
        #[arg(long)]
        min_shared_commits: Option<u32>,
        /// Minimum coupling score in [0, 1]
        #[arg(long)]
        min_coupling_score: Option<f64>,
        /// Commits touching more files than this form no pairs
        #[arg(long)]
        max_files_per_commit: Option<usize>,
        /// Maximum pairs kept before pagination
        #[arg(long)]
        max_pairs: Option<usize>,
    },
    /// Summarize totals, risk counts, and the monthly debt trend
    Overview {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        filter: FilterArgs,
        /// Number of most recent months in the trend
        #[arg(long)]
        trend_months: Option<usize>,
    },
    /// Copy a JSON history snapshot into a SQLite database
    #[command(long_about = "Copy a JSON history snapshot into a SQLite database.\n\n\
        The snapshot is validated before anything is written; a failed import\n\
        leaves the database unchanged.\n\n\
        Example:\n  gitrisk import --snapshot history.json --db gitrisk.db")]
    Import {
        /// JSON snapshot to import
        #[arg(long)]
        snapshot: PathBuf,
        /// SQLite database to write (created if missing)
        #[arg(long)]
        db: PathBuf,
    },
    /// Create a default .gitrisk.toml configuration file
    #[command(long_about = "Create a default .gitrisk.toml configuration file.\n\n\
        Generates a commented template with all available options.\n\
        Fails if .gitrisk.toml already exists.")]
    Init,
}

/// Where the commit log is read from. Defaults to the git repository in
/// the current directory.
#[derive(Args)]
struct SourceArgs {
    /// Local git repository to read
    #[arg(long, conflicts_with_all = ["snapshot", "db"])]
    repo: Option<PathBuf>,
    /// JSON history snapshot to read
    #[arg(long, conflicts_with = "db")]
    snapshot: Option<PathBuf>,
    /// SQLite history database to read (requires --project)
    #[arg(long, requires = "project")]
    db: Option<PathBuf>,
    /// Project id within the store
    #[arg(long)]
    project: Option<String>,
    /// Branch to walk instead of HEAD (git only)
    #[arg(long)]
    branch: Option<String>,
    /// Stop after this many commits, newest first (git only)
    #[arg(long)]
    max_commits: Option<usize>,
}

#[derive(Args)]
struct FilterArgs {
    /// Only commits on or after this date (YYYY-MM-DD)
    #[arg(long)]
    since: Option<NaiveDate>,
    /// Only commits on or before this date (YYYY-MM-DD)
    #[arg(long)]
    until: Option<NaiveDate>,
    /// Only files under this directory
    #[arg(long)]
    path: Option<String>,
    /// Only files with this extension (repeatable)
    #[arg(long = "file-type", value_name = "EXT")]
    file_types: Vec<String>,
}

impl FilterArgs {
    fn to_filter(&self) -> AnalysisFilter {
        AnalysisFilter {
            start_date: self.since.map(|d| d.and_time(NaiveTime::MIN).and_utc()),
            end_date: self
                .until
                .and_then(|d| d.and_hms_nano_opt(23, 59, 59, 999_999_999))
                .map(|dt| dt.and_utc()),
            path_prefix: self.path.clone(),
            file_types: self.file_types.iter().cloned().collect(),
        }
    }
}

#[derive(Args)]
struct PageArgs {
    /// Page number, starting at 1
    #[arg(long, default_value_t = 1)]
    page: usize,
    /// Rows per page
    #[arg(long, default_value_t = 20)]
    page_size: usize,
}

impl PageArgs {
    fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            page_size: self.page_size,
        }
    }
}

const DEFAULT_CONFIG: &str = r#"# gitrisk configuration

# Ownership risk cutoffs on the primary owner's share, in percent.
# Each boundary is strict; set all three together.
# [ownership]
# critical = 90.0
# high = 70.0
# medium = 40.0

[hotspots]
# metric = "change_count"    # or "complexity" (lines changed per commit)
# min_complexity = 5.0       # hotspot when the metric is strictly above this

# Risk cutoffs on the hotspot metric; set all three together.
# Defaults follow the metric: 20 / 10 / 5 commits, or 200 / 100 / 50
# lines per commit for "complexity".
# [hotspots.thresholds]
# critical = 20.0
# high = 10.0
# medium = 5.0

[coupling]
# min_shared_commits = 2
# min_coupling_score = 0.0
# max_files_per_commit = 25  # larger commits are left out of pairing
# max_pairs = 200

[overview]
# trend_months = 12
"#;

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))?;
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = load_config(cli.config.as_deref())?;
    let mut out = std::io::stdout().lock();

    match cli.command {
        Command::Hotspots {
            ref source,
            ref filter,
            ref page,
            risk,
            metric,
            min_complexity,
            flagged,
        } => {
            if let Some(metric) = metric {
                config.hotspots.metric = metric;
            }
            if let Some(min) = min_complexity {
                config.hotspots.min_complexity = min;
            }
            config.validate()?;

            let history = load_history(source, filter)?;
            let mut rows = hotspots::detect_hotspots(&history, &config.hotspots);
            if flagged {
                rows = hotspots::flagged(rows);
            }
            let page = page.pagination().apply(filter_by_risk(rows, risk))?;
            render::hotspots(&mut out, cli.format, &page)?;
        }
        Command::Ownership {
            ref source,
            ref filter,
            ref page,
            risk,
        } => {
            config.validate()?;

            let history = load_history(source, filter)?;
            let summary = ownership::analyze_ownership(&history, &config.ownership);
            let report = render::OwnershipReport {
                total_files: summary.total_files,
                single_author_files: summary.single_author_files,
                knowledge_silos: summary.knowledge_silos,
                project_bus_factor: summary.project_bus_factor,
                files: page.pagination().apply(filter_by_risk(summary.files, risk))?,
            };
            render::ownership(&mut out, cli.format, &report)?;
        }
        Command::Coupling {
            ref source,
            ref filter,
            ref page,
            min_shared_commits,
            min_coupling_score,
            max_files_per_commit,
            max_pairs,
        } => {
            if let Some(v) = min_shared_commits {
                config.coupling.min_shared_commits = v;
            }
            if let Some(v) = min_coupling_score {
                config.coupling.min_coupling_score = v;
            }
            if let Some(v) = max_files_per_commit {
                config.coupling.max_files_per_commit = v;
            }
            if let Some(v) = max_pairs {
                config.coupling.max_pairs = v;
            }
            config.validate()?;

            let history = load_history(source, filter)?;
            let result = coupling::detect_coupling(&history, &config.coupling);
            let report = render::CouplingOutput {
                commits_analyzed: result.commits_analyzed,
                bulk_commits_skipped: result.bulk_commits_skipped,
                pairs_matched: result.pairs_matched,
                pairs: page.pagination().apply(result.pairs)?,
            };
            render::coupling(&mut out, cli.format, &report)?;
        }
        Command::Overview {
            ref source,
            ref filter,
            trend_months,
        } => {
            if let Some(months) = trend_months {
                config.overview.trend_months = months;
            }
            config.validate()?;

            let history = load_history(source, filter)?;
            let summary = overview::build_overview(&history, &config, Utc::now());
            render::overview(&mut out, cli.format, &summary)?;
        }
        Command::Import {
            ref snapshot,
            ref db,
        } => {
            if !snapshot.exists() {
                miette::bail!(miette::miette!(
                    help = "Pass the path to a JSON history snapshot with --snapshot",
                    "Snapshot not found: {}",
                    snapshot.display()
                ));
            }
            let content = std::fs::read_to_string(snapshot).into_diagnostic()?;
            let history = ProjectHistory::from_json(&content)?;
            let store = SqliteStore::open(db)?;
            store.import(&history)?;
            writeln!(
                out,
                "Imported {} commits and {} changes for project '{}' into {}",
                history.commits.len(),
                history.changes.len(),
                history.project,
                db.display()
            )
            .into_diagnostic()?;
        }
        Command::Init => {
            let path = Path::new(CONFIG_FILE);
            if path.exists() {
                miette::bail!("{CONFIG_FILE} already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            writeln!(out, "Created {CONFIG_FILE} with default configuration").into_diagnostic()?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(explicit: Option<&Path>) -> Result<GitriskConfig> {
    let config = match explicit {
        Some(path) => GitriskConfig::from_file(path)?,
        None => {
            let default_path = Path::new(CONFIG_FILE);
            if default_path.exists() {
                GitriskConfig::from_file(default_path)?
            } else {
                GitriskConfig::default()
            }
        }
    };
    Ok(config)
}

/// Open the selected store and read the filtered history for one project.
fn load_history(source: &SourceArgs, filter: &FilterArgs) -> Result<History> {
    let filter = filter.to_filter();
    filter.validate()?;

    let (store, project): (Box<dyn HistoryStore>, String) = if let Some(path) = &source.snapshot {
        let store = MemoryStore::from_file(path)?;
        let project = match &source.project {
            Some(project) => project.clone(),
            None => store
                .projects()
                .first()
                .map(|p| (*p).to_string())
                .unwrap_or_default(),
        };
        (Box::new(store), project)
    } else if let Some(path) = &source.db {
        if !path.exists() {
            miette::bail!(miette::miette!(
                help = "Create one with 'gitrisk import --snapshot <FILE> --db <FILE>'",
                "History database not found: {}",
                path.display()
            ));
        }
        let project = source.project.clone().unwrap_or_default();
        (Box::new(SqliteStore::open(path)?), project)
    } else {
        let repo = source.repo.clone().unwrap_or_else(|| PathBuf::from("."));
        let options = MiningOptions {
            branch: source.branch.clone(),
            max_commits: source.max_commits,
        };
        let project = source
            .project
            .clone()
            .unwrap_or_else(|| LOCAL_PROJECT.to_string());
        (Box::new(GitStore::new(&repo, options)), project)
    };

    tracing::debug!(project = %project, "reading history");
    Ok(History::load(store.as_ref(), &project, &filter)?)
}
