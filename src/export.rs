//! 分析結果のCSV出力
//!
//! セッションの一覧と、コミットの一覧を別々のファイルに書き出します。

use crate::analyzer::{to_datetime, Analysis, Commit, SessionEstimate};
use chrono::TimeZone;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
struct SessionRow<'a> {
    date: String,
    time: String,
    duration_hours: String,
    commit_count: usize,
    first_message: &'a str,
}

#[derive(Debug, Serialize)]
struct CommitRow<'a> {
    date: String,
    time: String,
    author: &'a str,
    message: &'a str,
    short_hash: &'a str,
}

/// セッションの一覧をCSVとして書き出します
pub fn write_sessions<W: Write, Tz: TimeZone>(
    writer: W,
    sessions: &[SessionEstimate],
    tz: &Tz,
) -> csv::Result<()>
where
    Tz::Offset: std::fmt::Display,
{
    let mut wtr = csv::Writer::from_writer(writer);
    for session in sessions {
        let start = to_datetime(session.start, tz);
        wtr.serialize(SessionRow {
            date: format_or_empty(&start, "%Y-%m-%d"),
            time: format_or_empty(&start, "%H:%M"),
            duration_hours: format!("{:.2}", session.estimated_hours),
            commit_count: session.commit_count,
            first_message: &session.first_message,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

/// コミットの一覧をCSVとして書き出します
pub fn write_commits<W: Write, Tz: TimeZone>(
    writer: W,
    commits: &[Commit],
    tz: &Tz,
) -> csv::Result<()>
where
    Tz::Offset: std::fmt::Display,
{
    let mut wtr = csv::Writer::from_writer(writer);
    for commit in commits {
        let at = commit.datetime_in(tz);
        wtr.serialize(CommitRow {
            date: format_or_empty(&at, "%Y-%m-%d"),
            time: format_or_empty(&at, "%H:%M:%S"),
            author: &commit.author_name,
            message: &commit.message,
            short_hash: commit.short_hash(),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

/// コミット一覧の出力先パスを決めます
///
/// `report.csv`なら`report_commits.csv`、拡張子が`.csv`でなければ
/// 末尾に`_commits.csv`を付けます。
pub fn commits_path(sessions_path: &Path) -> PathBuf {
    let raw = sessions_path.to_string_lossy();
    match raw.strip_suffix(".csv") {
        Some(stem) => PathBuf::from(format!("{}_commits.csv", stem)),
        None => PathBuf::from(format!("{}_commits.csv", raw)),
    }
}

/// セッションとコミットの2つのCSVファイルを書き出し、それぞれのパスを返します
pub fn export_csv<Tz: TimeZone>(
    path: &Path,
    analysis: &Analysis,
    tz: &Tz,
) -> csv::Result<(PathBuf, PathBuf)>
where
    Tz::Offset: std::fmt::Display,
{
    write_sessions(
        std::fs::File::create(path)?,
        &analysis.estimate.session_estimates,
        tz,
    )?;

    let commits_file = commits_path(path);
    write_commits(std::fs::File::create(&commits_file)?, &analysis.commits, tz)?;

    tracing::debug!(sessions = %path.display(), commits = %commits_file.display(), "exported csv");
    Ok((path.to_path_buf(), commits_file))
}

fn format_or_empty<Tz: TimeZone>(dt: &Option<chrono::DateTime<Tz>>, fmt: &str) -> String
where
    Tz::Offset: std::fmt::Display,
{
    dt.as_ref()
        .map(|dt| dt.format(fmt).to_string())
        .unwrap_or_default()
}
