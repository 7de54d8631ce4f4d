//! セッションと見積もりから統計を集計するモジュール
//!
//! 作成者別・曜日別・時間帯別・月別の分布、コミットサイズの分類、
//! カレンダー用の日別コミット数などを計算します。
//! すべて入力を読み取るだけの純粋な関数で、表示形式には関与しません。
//!
//! 曜日・時刻・月は呼び出し側が指定したタイムゾーンで判定します。

use super::commit::{to_datetime, ChangeStats, Commit};
use super::estimate::WorkEstimate;
use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Timelike};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeMap;

/// 曜日名（0=月曜日）
pub const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

const SECONDS_PER_DAY: i64 = 86_400;

/// 浮動小数点数を2桁に丸める補助関数
///
/// # 引数
///
/// - `value`: 丸める浮動小数点数
/// - `serializer`: serdeシリアライザ
pub(crate) fn round_to_2<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_f64((*value * 100.0).round() / 100.0)
}

/// 作成者ごとのコミット数
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorActivity {
    pub name: String,
    pub commits: usize,
}

/// 曜日ごとのセッション数と見積時間
///
/// `weekday`は0=月曜日〜6=日曜日です。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekdayActivity {
    pub weekday: u32,
    pub sessions: usize,
    #[serde(serialize_with = "round_to_2")]
    pub hours: f64,
}

impl WeekdayActivity {
    pub fn name(&self) -> &'static str {
        WEEKDAY_NAMES[self.weekday as usize % 7]
    }
}

/// 開始時刻（0〜23時）ごとのセッション数
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourActivity {
    pub hour: u32,
    pub sessions: usize,
}

/// 年月（`YYYY-MM`）ごとのコミット数と見積時間
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthActivity {
    pub month: String,
    pub commits: usize,
    #[serde(serialize_with = "round_to_2")]
    pub hours: f64,
}

/// 変更行数によるコミットの分類
///
/// 変更統計を取得できたコミットのみが対象です。
///
/// # フィールド
///
/// - `small`: 10行未満
/// - `medium`: 10〜99行
/// - `large`: 100〜499行
/// - `huge`: 500行以上
/// - `measured_commits`: 分類したコミット数
/// - `total_lines`: 変更行数の合計
/// - `total_files`: 変更ファイル数の合計
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SizeDistribution {
    pub small: usize,
    pub medium: usize,
    pub large: usize,
    pub huge: usize,
    pub measured_commits: usize,
    pub total_lines: usize,
    pub total_files: usize,
}

impl SizeDistribution {
    fn record(&mut self, stats: &ChangeStats) {
        match stats.lines_changed() {
            0..=9 => self.small += 1,
            10..=99 => self.medium += 1,
            100..=499 => self.large += 1,
            _ => self.huge += 1,
        }
        self.measured_commits += 1;
        self.total_lines += stats.lines_changed();
        self.total_files += stats.files_changed;
    }

    pub fn average_lines(&self) -> f64 {
        ratio(self.total_lines as f64, self.measured_commits)
    }

    pub fn average_files(&self) -> f64 {
        ratio(self.total_files as f64, self.measured_commits)
    }
}

/// プロジェクト全体の概要
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectSummary {
    pub commit_count: usize,
    pub first_commit: i64,
    pub last_commit: i64,
    /// 経過日数（最低1日）
    pub project_days: i64,
    /// 経過日数を30日単位で区切った月数と残りの日数
    pub duration_months: i64,
    pub duration_days: i64,
    #[serde(serialize_with = "round_to_2")]
    pub commits_per_day: f64,
    #[serde(serialize_with = "round_to_2")]
    pub commits_per_week: f64,
    #[serde(serialize_with = "round_to_2")]
    pub commits_per_month: f64,
}

impl ProjectSummary {
    /// コミット列から概要を計算します（空なら`None`）
    pub fn from_commits(commits: &[Commit]) -> Option<Self> {
        let first = commits.iter().map(|c| c.timestamp).min()?;
        let last = commits.iter().map(|c| c.timestamp).max()?;

        // 秒の差は i64 を超えうるが、日数にすれば必ず収まる
        let elapsed_days = (i128::from(last) - i128::from(first))
            .div_euclid(i128::from(SECONDS_PER_DAY)) as i64;
        let project_days = elapsed_days.max(1);
        let months = elapsed_days / 30;
        let count = commits.len() as f64;

        Some(Self {
            commit_count: commits.len(),
            first_commit: first,
            last_commit: last,
            project_days,
            duration_months: months,
            duration_days: elapsed_days % 30,
            commits_per_day: count / project_days as f64,
            commits_per_week: count / (project_days as f64 / 7.0),
            commits_per_month: count / months.max(1) as f64,
        })
    }
}

/// カレンダー表示用の日別コミット数
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarHeatmap {
    pub year: i32,
    pub days: BTreeMap<NaiveDate, usize>,
    pub max_count: usize,
}

impl CalendarHeatmap {
    /// 指定した年の日別コミット数を集計します
    pub fn for_year<Tz: TimeZone>(commits: &[Commit], year: i32, tz: &Tz) -> Self {
        let mut days = BTreeMap::new();
        for dt in local_times(commits, tz) {
            if dt.year() == year {
                *days.entry(dt.date_naive()).or_insert(0) += 1;
            }
        }
        let max_count = days.values().copied().max().unwrap_or(0);
        Self {
            year,
            days,
            max_count,
        }
    }
}

/// カレンダーに表示する年を選びます
///
/// 現在の年のコミットが全体の過半数なら現在の年、
/// そうでなければ最もコミットの多い年（同数なら古い年）を返します。
pub fn heatmap_year<Tz: TimeZone>(commits: &[Commit], current_year: i32, tz: &Tz) -> Option<i32> {
    let mut per_year: BTreeMap<i32, usize> = BTreeMap::new();
    for dt in local_times(commits, tz) {
        *per_year.entry(dt.year()).or_insert(0) += 1;
    }

    let total: usize = per_year.values().sum();
    if total == 0 {
        return None;
    }
    let in_current = per_year.get(&current_year).copied().unwrap_or(0);
    if in_current * 2 > total {
        return Some(current_year);
    }
    first_max(per_year.iter().map(|(year, count)| (*year, *count)))
}

/// 作業習慣に関する所見
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recommendation {
    /// セッションの平均が4時間を超えている
    LongSessions {
        #[serde(serialize_with = "round_to_2")]
        average_hours: f64,
    },
    /// 30日を超える期間で1日あたりのコミットが0.5件未満
    LowCommitRate {
        #[serde(serialize_with = "round_to_2")]
        commits_per_day: f64,
    },
    MostProductiveDay { weekday: u32 },
    MostProductiveHour { hour: u32 },
}

/// 集計結果一式
///
/// 表示層にそのまま渡せる形でまとめたものです。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityReport {
    pub summary: Option<ProjectSummary>,
    pub authors: Vec<AuthorActivity>,
    pub weekdays: Vec<WeekdayActivity>,
    pub hours: Vec<HourActivity>,
    pub months: Vec<MonthActivity>,
    pub most_productive_weekday: Option<u32>,
    pub most_productive_hour: Option<u32>,
    pub sizes: Option<SizeDistribution>,
    pub heatmap: Option<CalendarHeatmap>,
    pub recommendations: Vec<Recommendation>,
}

impl ActivityReport {
    /// すべての集計を実行します
    ///
    /// # 引数
    ///
    /// - `commits`: 分析対象のコミット列
    /// - `estimate`: セッションの見積もり
    /// - `change_stats`: コミットハッシュごとの変更統計（取得した場合のみ）
    /// - `current_year`: カレンダーの年を選ぶ際の「現在の年」
    /// - `tz`: 曜日・時刻を判定するタイムゾーン
    pub fn build<Tz: TimeZone>(
        commits: &[Commit],
        estimate: &WorkEstimate,
        change_stats: Option<&IndexMap<String, ChangeStats>>,
        current_year: i32,
        tz: &Tz,
    ) -> Self {
        let summary = ProjectSummary::from_commits(commits);
        let weekdays = weekday_distribution(estimate, tz);
        let hours = hour_distribution(estimate, tz);
        let most_productive_weekday = most_productive_weekday(&weekdays);
        let most_productive_hour = most_productive_hour(&hours);

        let recommendations = recommendations(
            estimate,
            summary.as_ref(),
            most_productive_weekday,
            most_productive_hour,
        );

        Self {
            authors: author_distribution(commits),
            months: monthly_distribution(commits, estimate, tz),
            sizes: change_stats.map(|stats| size_distribution(commits, stats)),
            heatmap: heatmap_year(commits, current_year, tz)
                .map(|year| CalendarHeatmap::for_year(commits, year, tz)),
            summary,
            weekdays,
            hours,
            most_productive_weekday,
            most_productive_hour,
            recommendations,
        }
    }
}

/// 作成者名ごとのコミット数をコミット数の多い順に返します
///
/// 名前は完全一致で比較し、同一人物の別名は統合しません。
/// 同数の場合は最初に現れた作成者が先になります。
pub fn author_distribution(commits: &[Commit]) -> Vec<AuthorActivity> {
    let mut counts: IndexMap<&str, usize> = IndexMap::new();
    for commit in commits {
        *counts.entry(commit.author_name.as_str()).or_insert(0) += 1;
    }

    let mut authors: Vec<AuthorActivity> = counts
        .into_iter()
        .map(|(name, commits)| AuthorActivity {
            name: name.to_string(),
            commits,
        })
        .collect();
    authors.sort_by(|a, b| b.commits.cmp(&a.commits));
    authors
}

/// 開始曜日ごとのセッション数と見積時間（月曜日から順、該当なしの曜日は除外）
pub fn weekday_distribution<Tz: TimeZone>(
    estimate: &WorkEstimate,
    tz: &Tz,
) -> Vec<WeekdayActivity> {
    let mut buckets = [(0usize, 0.0f64); 7];
    for session in &estimate.session_estimates {
        if let Some(start) = to_datetime(session.start, tz) {
            let bucket = &mut buckets[start.weekday().num_days_from_monday() as usize];
            bucket.0 += 1;
            bucket.1 += session.estimated_hours;
        }
    }

    buckets
        .iter()
        .enumerate()
        .filter(|(_, (sessions, _))| *sessions > 0)
        .map(|(weekday, (sessions, hours))| WeekdayActivity {
            weekday: weekday as u32,
            sessions: *sessions,
            hours: *hours,
        })
        .collect()
}

/// 開始時刻ごとのセッション数（0時から順、該当なしの時刻は除外）
pub fn hour_distribution<Tz: TimeZone>(estimate: &WorkEstimate, tz: &Tz) -> Vec<HourActivity> {
    let mut buckets = [0usize; 24];
    for session in &estimate.session_estimates {
        if let Some(start) = to_datetime(session.start, tz) {
            buckets[start.hour() as usize] += 1;
        }
    }

    buckets
        .iter()
        .enumerate()
        .filter(|(_, sessions)| **sessions > 0)
        .map(|(hour, sessions)| HourActivity {
            hour: hour as u32,
            sessions: *sessions,
        })
        .collect()
}

/// 年月ごとのコミット数と見積時間を古い順に返します
///
/// セッションの見積時間は最初のコミットの年月に計上します。
pub fn monthly_distribution<Tz: TimeZone>(
    commits: &[Commit],
    estimate: &WorkEstimate,
    tz: &Tz,
) -> Vec<MonthActivity> {
    let mut months: BTreeMap<String, (usize, f64)> = BTreeMap::new();

    for dt in local_times(commits, tz) {
        months.entry(month_key(&dt)).or_default().0 += 1;
    }
    for session in &estimate.session_estimates {
        if let Some(start) = to_datetime(session.start, tz) {
            months.entry(month_key(&start)).or_default().1 += session.estimated_hours;
        }
    }

    months
        .into_iter()
        .map(|(month, (commits, hours))| MonthActivity {
            month,
            commits,
            hours,
        })
        .collect()
}

/// 変更統計のあるコミットをサイズで分類します
///
/// 統計を取得できなかったコミットは除外されます。
pub fn size_distribution(
    commits: &[Commit],
    change_stats: &IndexMap<String, ChangeStats>,
) -> SizeDistribution {
    let mut distribution = SizeDistribution::default();
    for stats in commits.iter().filter_map(|c| change_stats.get(&c.hash)) {
        distribution.record(stats);
    }
    distribution
}

/// セッション数が最も多い曜日
///
/// 同数の場合は週の早い曜日（月曜日に近い方）を返します。
pub fn most_productive_weekday(weekdays: &[WeekdayActivity]) -> Option<u32> {
    first_max(weekdays.iter().map(|d| (d.weekday, d.sessions)))
}

/// セッション数が最も多い時刻
///
/// 同数の場合は早い時刻を返します。
pub fn most_productive_hour(hours: &[HourActivity]) -> Option<u32> {
    first_max(hours.iter().map(|h| (h.hour, h.sessions)))
}

fn recommendations(
    estimate: &WorkEstimate,
    summary: Option<&ProjectSummary>,
    weekday: Option<u32>,
    hour: Option<u32>,
) -> Vec<Recommendation> {
    let mut found = Vec::new();
    if estimate.session_count <= 5 {
        return found;
    }

    let average_hours = estimate.average_session_hours();
    if average_hours > 4.0 {
        found.push(Recommendation::LongSessions { average_hours });
    }
    if let Some(summary) = summary {
        if summary.commits_per_day < 0.5 && summary.project_days > 30 {
            found.push(Recommendation::LowCommitRate {
                commits_per_day: summary.commits_per_day,
            });
        }
    }
    if let (Some(weekday), Some(hour)) = (weekday, hour) {
        found.push(Recommendation::MostProductiveDay { weekday });
        found.push(Recommendation::MostProductiveHour { hour });
    }
    found
}

/// 最大値を持つ最初のキーを返します
fn first_max<K>(items: impl Iterator<Item = (K, usize)>) -> Option<K> {
    let mut best: Option<(K, usize)> = None;
    for (key, count) in items {
        match best {
            Some((_, max)) if count <= max => {}
            _ => best = Some((key, count)),
        }
    }
    best.map(|(key, _)| key)
}

fn local_times<'a, Tz: TimeZone>(
    commits: &'a [Commit],
    tz: &'a Tz,
) -> impl Iterator<Item = DateTime<Tz>> + 'a {
    commits.iter().filter_map(move |c| c.datetime_in(tz))
}

fn month_key<Tz: TimeZone>(dt: &DateTime<Tz>) -> String {
    format!("{:04}-{:02}", dt.year(), dt.month())
}

fn ratio(total: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}
