//! 分析結果をテキストのレポートとして整形するモジュール
//!
//! 色付けや端末の制御は行わず、プレーンテキストのみを生成します。

use crate::analyzer::{
    to_datetime, ActivityReport, Analysis, CalendarHeatmap, Recommendation, SizeDistribution,
    WEEKDAY_NAMES,
};
use chrono::{Datelike, Duration, NaiveDate, TimeZone};
use std::fmt::{self, Display, Write};

const CHART_WIDTH: usize = 40;
const RULE_WIDTH: usize = 80;
const TOP_AUTHORS: usize = 8;
const TOP_SESSIONS: usize = 5;
const RECENT_MONTHS: usize = 12;
const HEAT_LEVELS: [char; 5] = ['▁', '▃', '▅', '▇', '█'];

/// レポートに表示する条件
///
/// # フィールド
///
/// - `repo_path`: 分析したリポジトリのパス
/// - `author`, `since`, `until`: 指定された絞り込み条件（表示用）
/// - `detailed`: 詳細なセクションを含めるかどうか
#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    pub repo_path: String,
    pub author: Option<String>,
    pub since: Option<String>,
    pub until: Option<String>,
    pub detailed: bool,
}

/// 分析結果をテキストのレポートに整形します
pub fn render<Tz: TimeZone>(
    analysis: &Analysis,
    report: &ActivityReport,
    options: &ReportOptions,
    tz: &Tz,
) -> Result<String, fmt::Error>
where
    Tz::Offset: Display,
{
    let mut out = String::new();
    if analysis.is_empty() {
        writeln!(out, "No commits match the given criteria.")?;
        return Ok(out);
    }

    header(
        &mut out,
        &format!("WORK TIME REPORT - {}", analysis.repo_info.name.to_uppercase()),
    )?;
    value(&mut out, "Directory", &options.repo_path)?;
    value(&mut out, "Repository", &analysis.repo_info.name)?;
    value(&mut out, "Branch", &analysis.repo_info.branch)?;
    if let Some(author) = &options.author {
        value(&mut out, "Author", author)?;
    }
    let period: Vec<String> = [("since", &options.since), ("until", &options.until)]
        .into_iter()
        .filter_map(|(label, bound)| bound.as_ref().map(|b| format!("{} {}", label, b)))
        .collect();
    if !period.is_empty() {
        value(&mut out, "Period", period.join(", "))?;
    }

    general(&mut out, report, tz)?;
    work_time(&mut out, analysis, options, tz)?;
    distributions(&mut out, report, options)?;

    if options.detailed {
        if let Some(heatmap) = &report.heatmap {
            calendar(&mut out, heatmap)?;
        }
        if let Some(sizes) = &report.sizes {
            activity(&mut out, sizes)?;
        }
    }

    if !report.recommendations.is_empty() {
        subheader(&mut out, "RECOMMENDATIONS")?;
        for recommendation in &report.recommendations {
            writeln!(out, "  {}", describe(recommendation))?;
        }
    }

    header(&mut out, "END OF REPORT")?;
    Ok(out)
}

fn general<Tz: TimeZone>(out: &mut String, report: &ActivityReport, tz: &Tz) -> fmt::Result
where
    Tz::Offset: Display,
{
    let Some(summary) = &report.summary else {
        return Ok(());
    };

    subheader(out, "GENERAL STATISTICS")?;
    value(out, "Total commits", summary.commit_count)?;
    value(out, "First commit", timestamp(summary.first_commit, tz))?;
    value(out, "Last commit", timestamp(summary.last_commit, tz))?;
    let duration = if summary.duration_months > 0 {
        format!(
            "{} months, {} days",
            summary.duration_months, summary.duration_days
        )
    } else {
        format!("{} days", summary.project_days)
    };
    value(out, "Project duration", duration)?;
    value(out, "Commits per day", format!("{:.2}", summary.commits_per_day))?;
    value(out, "Commits per week", format!("{:.1}", summary.commits_per_week))?;
    value(out, "Commits per month", format!("{:.1}", summary.commits_per_month))?;

    if report.authors.len() > 1 {
        let data: Vec<(String, f64)> = report
            .authors
            .iter()
            .take(TOP_AUTHORS)
            .map(|a| (a.name.clone(), a.commits as f64))
            .collect();
        chart(out, "Contributions by author", &data, 0, true)?;
        if report.authors.len() > TOP_AUTHORS {
            writeln!(
                out,
                "  ... and {} more contributors",
                report.authors.len() - TOP_AUTHORS
            )?;
        }
    }
    Ok(())
}

fn work_time<Tz: TimeZone>(
    out: &mut String,
    analysis: &Analysis,
    options: &ReportOptions,
    tz: &Tz,
) -> fmt::Result
where
    Tz::Offset: Display,
{
    let estimate = &analysis.estimate;

    subheader(out, "WORK TIME ESTIMATE")?;
    value(
        out,
        "Estimated total",
        format!("{:.2} hours", estimate.total_estimated_hours),
    )?;
    value(
        out,
        "Workday equivalent (8h)",
        format!("{:.2} days", estimate.workdays()),
    )?;
    value(out, "Work sessions", estimate.session_count)?;

    if estimate.session_count == 0 {
        return Ok(());
    }
    value(
        out,
        "Average per session",
        format!("{:.2} hours", estimate.average_session_hours()),
    )?;
    value(
        out,
        "Average per commit",
        format!("{:.2} hours", estimate.hours_per_commit(analysis.commits.len())),
    )?;
    value(
        out,
        "Adjustment factor",
        format!("{:.2}x", estimate.adjustment_factor()),
    )?;

    if options.detailed {
        writeln!(out, "\n  Longest sessions")?;
        for (i, session) in estimate.top_sessions(TOP_SESSIONS).iter().enumerate() {
            writeln!(
                out,
                "  {}. {} - {:.2}h ({} commits) - \"{}\"",
                i + 1,
                timestamp(session.start, tz),
                session.estimated_hours,
                session.commit_count,
                session.first_message
            )?;
        }
    }
    Ok(())
}

fn distributions(
    out: &mut String,
    report: &ActivityReport,
    options: &ReportOptions,
) -> fmt::Result {
    if !report.weekdays.is_empty() {
        let sessions: Vec<(String, f64)> = report
            .weekdays
            .iter()
            .map(|d| (d.name().to_string(), d.sessions as f64))
            .collect();
        chart(out, "Sessions per weekday", &sessions, 0, true)?;

        if options.detailed {
            let hours: Vec<(String, f64)> = report
                .weekdays
                .iter()
                .map(|d| (d.name().to_string(), d.hours))
                .collect();
            chart(out, "Work hours per weekday", &hours, 1, true)?;

            let per_hour: Vec<(String, f64)> = report
                .hours
                .iter()
                .map(|h| (format!("{}h", h.hour), h.sessions as f64))
                .collect();
            chart(out, "Sessions per hour", &per_hour, 0, true)?;
        }
    }

    let recent = &report.months[report.months.len().saturating_sub(RECENT_MONTHS)..];
    if !recent.is_empty() {
        let commits: Vec<(String, f64)> = recent
            .iter()
            .map(|m| (m.month.clone(), m.commits as f64))
            .collect();
        chart(out, "Commits per month", &commits, 0, true)?;

        if options.detailed && recent.iter().any(|m| m.hours > 0.0) {
            let hours: Vec<(String, f64)> =
                recent.iter().map(|m| (m.month.clone(), m.hours)).collect();
            chart(out, "Work hours per month", &hours, 1, true)?;
        }
    }
    Ok(())
}

fn calendar(out: &mut String, heatmap: &CalendarHeatmap) -> fmt::Result {
    let (Some(first), Some(last)) = (
        NaiveDate::from_ymd_opt(heatmap.year, 1, 1),
        NaiveDate::from_ymd_opt(heatmap.year, 12, 31),
    ) else {
        return Ok(());
    };

    writeln!(out, "\n  Commit calendar - {}", heatmap.year)?;
    writeln!(out, "  {}", "─".repeat(50))?;
    writeln!(out, "       Mo Tu We Th Fr Sa Su")?;

    let mut week = first - Duration::days(i64::from(first.weekday().num_days_from_monday()));
    while week <= last {
        let label_day = if week < first { first } else { week };
        write!(out, "  {}  ", label_day.format("%b"))?;

        for offset in 0..7 {
            let day = week + Duration::days(offset);
            let count = heatmap.days.get(&day).copied().unwrap_or(0);
            if day.year() != heatmap.year {
                write!(out, "   ")?;
            } else if count == 0 {
                write!(out, "·· ")?;
            } else {
                let level = (count * 4 / heatmap.max_count.max(1)).min(4);
                write!(out, "{}{:<2}", HEAT_LEVELS[level], count)?;
            }
        }
        writeln!(out)?;
        week += Duration::days(7);
    }

    writeln!(
        out,
        "  Legend: ·· none  {} few  {} many (max {} commits/day)",
        HEAT_LEVELS[0], HEAT_LEVELS[4], heatmap.max_count
    )
}

fn activity(out: &mut String, sizes: &SizeDistribution) -> fmt::Result {
    if sizes.measured_commits == 0 {
        return Ok(());
    }

    subheader(out, "ACTIVITY")?;
    value(out, "Lines changed", sizes.total_lines)?;
    value(out, "Lines per commit", format!("{:.1}", sizes.average_lines()))?;
    value(out, "Files touched", sizes.total_files)?;
    value(out, "Files per commit", format!("{:.1}", sizes.average_files()))?;

    let data = vec![
        ("Small (<10)".to_string(), sizes.small as f64),
        ("Medium (<100)".to_string(), sizes.medium as f64),
        ("Large (<500)".to_string(), sizes.large as f64),
        ("Huge (500+)".to_string(), sizes.huge as f64),
    ];
    chart(out, "Commits by size (lines changed)", &data, 0, true)
}

fn describe(recommendation: &Recommendation) -> String {
    match recommendation {
        Recommendation::LongSessions { average_hours } => format!(
            "Work sessions are long (average {:.1}h). Consider taking regular breaks.",
            average_hours
        ),
        Recommendation::LowCommitRate { commits_per_day } => format!(
            "Commit rate is low ({:.2} per day). \
             More frequent commits make progress easier to follow.",
            commits_per_day
        ),
        Recommendation::MostProductiveDay { weekday } => format!(
            "Your most productive day is {}.",
            WEEKDAY_NAMES[*weekday as usize % 7]
        ),
        Recommendation::MostProductiveHour { hour } => {
            format!("Your most productive hour is {}h.", hour)
        }
    }
}

/// 横棒グラフ
fn chart(
    out: &mut String,
    title: &str,
    data: &[(String, f64)],
    decimals: usize,
    show_percentage: bool,
) -> fmt::Result {
    writeln!(out, "\n  {}", title)?;
    writeln!(out, "  {}", "─".repeat(CHART_WIDTH + 12))?;

    let max = data.iter().map(|(_, v)| *v).fold(0.0, f64::max);
    let total: f64 = data.iter().map(|(_, v)| *v).sum();
    let label_width = data
        .iter()
        .map(|(label, _)| label.chars().count())
        .max()
        .unwrap_or(0);

    for (label, v) in data {
        let bar_length = if max > 0.0 {
            (v / max * CHART_WIDTH as f64) as usize
        } else {
            0
        };
        write!(
            out,
            "  {:<width$} │ {} {:.prec$}",
            label,
            "█".repeat(bar_length),
            v,
            width = label_width,
            prec = decimals
        )?;
        if show_percentage && total > 0.0 {
            write!(out, " ({:.1}%)", v / total * 100.0)?;
        }
        writeln!(out)?;
    }

    writeln!(out, "  {}", "─".repeat(CHART_WIDTH + 12))
}

fn header(out: &mut String, text: &str) -> fmt::Result {
    let rule = "═".repeat(RULE_WIDTH);
    writeln!(out, "\n{}", rule)?;
    writeln!(out, "{:^width$}", text, width = RULE_WIDTH)?;
    writeln!(out, "{}", rule)
}

fn subheader(out: &mut String, text: &str) -> fmt::Result {
    writeln!(out, "\n{}", text)?;
    writeln!(out, "{}", "─".repeat(RULE_WIDTH))
}

fn value(out: &mut String, label: &str, value: impl Display) -> fmt::Result {
    writeln!(out, "  {}: {}", label, value)
}

fn timestamp<Tz: TimeZone>(ts: i64, tz: &Tz) -> String
where
    Tz::Offset: Display,
{
    to_datetime(ts, tz)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}
