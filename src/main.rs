use anyhow::Context;
use chrono::{Datelike, Local};
use clap::{ArgGroup, Parser, ValueEnum};
use git_worktime::analyzer::{
    parse_date_bound, CommitFilter, GitRepository, DEFAULT_THRESHOLD_HOURS,
};
use git_worktime::report::{self, ReportOptions};
use git_worktime::{export, AnalyzerOptions, WorkTimeAnalyzer};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// クイックモードで分析する最新コミットの件数
const QUICK_MODE_COMMITS: usize = 1000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(
    version,
    about = "Estimates the time spent working on a Git repository",
    long_about = None
)]
#[command(group(ArgGroup::new("shortcut").args(["last_week", "last_month", "last_year", "me"])))]
struct Cli {
    /// Path to Git repository
    #[arg(short, long, default_value = ".")]
    repo: PathBuf,

    /// Only count commits whose author matches this pattern (regex on "Name <email>")
    #[arg(short, long)]
    author: Option<String>,

    /// Only count commits after this date (e.g. "2023-01-01" or "2 weeks ago")
    #[arg(short, long)]
    since: Option<String>,

    /// Only count commits before this date
    #[arg(short, long)]
    until: Option<String>,

    /// Walk history from this branch or revision instead of HEAD
    #[arg(short, long)]
    branch: Option<String>,

    /// Maximum gap in hours between two commits of the same session
    #[arg(short, long, default_value_t = DEFAULT_THRESHOLD_HOURS)]
    threshold: f64,

    /// Print progress details (same as RUST_LOG=debug)
    #[arg(short, long)]
    verbose: bool,

    /// Include detailed charts, the commit calendar and commit sizes
    #[arg(short, long)]
    detailed: bool,

    /// Only analyze the most recent 1000 commits
    #[arg(short, long)]
    quick: bool,

    /// Skip merge commits
    #[arg(long)]
    no_merges: bool,

    /// Export sessions and commits to CSV (a second "<name>_commits.csv" file is written)
    #[arg(short, long)]
    export: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Analyze the last week
    #[arg(long)]
    last_week: bool,

    /// Analyze the last month
    #[arg(long)]
    last_month: bool,

    /// Analyze the last year
    #[arg(long)]
    last_year: bool,

    /// Only count your own commits (uses the repository's user.name)
    #[arg(long)]
    me: bool,
}

impl Cli {
    fn since(&self) -> Option<String> {
        if self.last_week {
            Some("1 week ago".to_string())
        } else if self.last_month {
            Some("1 month ago".to_string())
        } else if self.last_year {
            Some("1 year ago".to_string())
        } else {
            self.since.clone()
        }
    }

    fn filter(&self, since: Option<&str>) -> anyhow::Result<CommitFilter> {
        let now = Local::now();
        let since = since
            .map(|s| parse_date_bound(s, &now))
            .transpose()
            .context("Invalid --since value")?;
        let until = self
            .until
            .as_deref()
            .map(|s| parse_date_bound(s, &now))
            .transpose()
            .context("Invalid --until value")?;

        Ok(CommitFilter {
            author: self.author.clone(),
            branch: self.branch.clone(),
            since,
            until,
            include_merges: !self.no_merges,
            max_commits: self.quick.then_some(QUICK_MODE_COMMITS),
        })
    }
}

fn main() -> anyhow::Result<()> {
    let mut cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    if cli.me {
        let repo = GitRepository::open(&cli.repo).context("Failed to open repository")?;
        match repo.configured_user() {
            Some(user) => {
                tracing::debug!(%user, "filtering on configured git user");
                cli.author = Some(regex::escape(&user));
            }
            None => tracing::warn!("git user.name is not configured, use --author instead"),
        }
    }

    let since = cli.since();
    let options = AnalyzerOptions {
        filter: cli.filter(since.as_deref())?,
        threshold_hours: cli.threshold,
        collect_change_stats: cli.detailed,
    };

    let analyzer =
        WorkTimeAnalyzer::new(&cli.repo, options).context("Failed to initialize analyzer")?;

    let analysis = analyzer.analyze().context("Failed to analyze repository")?;

    let now = Local::now();
    let activity = analysis.report(now.year(), &Local);

    match cli.format {
        OutputFormat::Text => {
            let report_options = ReportOptions {
                repo_path: cli
                    .repo
                    .canonicalize()
                    .unwrap_or_else(|_| cli.repo.clone())
                    .display()
                    .to_string(),
                author: cli.author.clone(),
                since,
                until: cli.until.clone(),
                detailed: cli.detailed,
            };
            let text = report::render(&analysis, &activity, &report_options, &Local)
                .context("Failed to render report")?;
            print!("{}", text);
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "repository": analysis.repo_info,
                "estimate": analysis.estimate,
                "activity": activity,
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&output).context("Failed to serialize to JSON")?
            );
        }
    }

    if let Some(path) = &cli.export {
        let (sessions, commits) =
            export::export_csv(path, &analysis, &Local).context("Failed to export CSV")?;
        eprintln!("Exported {} and {}", sessions.display(), commits.display());
    }

    Ok(())
}
