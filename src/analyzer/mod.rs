//! 作業時間分析の中核となるモジュール
//!
//! 分析プロセスは以下の流れで行われます：
//!
//! 1. 条件に合うコミット履歴の取得（`git`）
//! 2. 時間的に近いコミットのセッションへの分割（`session`）
//! 3. セッションごとの作業時間の見積もり（`estimate`）
//! 4. 曜日・時間帯・月・作成者などの統計の集計（`metrics`）
//!
//! 2〜4は入出力を持たない純粋な関数で、進捗は`tracing`のイベントとして
//! 呼び出し側に通知されます。
//!
//! # 主要なコンポーネント
//!
//! - `WorkTimeAnalyzer`: リポジトリからの取得と分析全体を制御する構造体
//! - `Analysis`: 取得したコミット・セッション・見積もりをまとめた結果
//! - `ActivityReport`: 表示層に渡す集計結果

mod commit;
mod dates;
mod error;
mod estimate;
mod git;
mod metrics;
mod session;

pub use commit::{to_datetime, ChangeStats, Commit};
pub use dates::parse_date_bound;
pub use error::{AnalyzerError, IngestionError};
pub use estimate::{
    commit_factor, estimate, SessionEstimate, WorkEstimate, MAX_COMMIT_FACTOR,
    MAX_SESSION_HOURS, MIN_SESSION_HOURS,
};
pub use git::{CommitFilter, GitRepository, LastCommit, RepoInfo};
pub use metrics::{
    author_distribution, heatmap_year, hour_distribution, monthly_distribution,
    most_productive_hour, most_productive_weekday, size_distribution, weekday_distribution,
    ActivityReport, AuthorActivity, CalendarHeatmap, HourActivity, MonthActivity,
    ProjectSummary, Recommendation, SizeDistribution, WeekdayActivity, WEEKDAY_NAMES,
};
pub use session::{gap_hours, segment, Session, SessionSegmenter};

use chrono::TimeZone;
use indexmap::IndexMap;
use std::path::Path;

/// セッションを区切る間隔の既定値（時間）
pub const DEFAULT_THRESHOLD_HOURS: f64 = 3.0;

/// 分析の設定
///
/// # フィールド
///
/// - `filter`: コミットの絞り込み条件
/// - `threshold_hours`: 同一セッションとみなす最大間隔（時間）
/// - `collect_change_stats`: コミットごとの変更統計を取得するかどうか
#[derive(Debug, Clone)]
pub struct AnalyzerOptions {
    pub filter: CommitFilter,
    pub threshold_hours: f64,
    pub collect_change_stats: bool,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            filter: CommitFilter::default(),
            threshold_hours: DEFAULT_THRESHOLD_HOURS,
            collect_change_stats: false,
        }
    }
}

/// 作業時間の分析を実行するメインの構造体
pub struct WorkTimeAnalyzer {
    repo: GitRepository,
    options: AnalyzerOptions,
}

impl WorkTimeAnalyzer {
    /// 新しいWorkTimeAnalyzerインスタンスを作成します
    ///
    /// # エラー
    ///
    /// 以下の場合にエラーを返します：
    /// - 指定されたパスが有効なGitリポジトリでない
    /// - 閾値が`NaN`
    pub fn new(path: impl AsRef<Path>, options: AnalyzerOptions) -> Result<Self, AnalyzerError> {
        if options.threshold_hours.is_nan() {
            return Err(AnalyzerError::InvalidInput(
                "session threshold must be a number".to_string(),
            ));
        }
        Ok(Self {
            repo: GitRepository::open(path)?,
            options,
        })
    }

    /// コミット履歴を取得し、セッション分割と見積もりを行います
    ///
    /// 条件に合うコミットがない場合もエラーにはせず、
    /// 空の`Analysis`を返します（`Analysis::is_empty`で判別できます）。
    ///
    /// # エラー
    ///
    /// コミット履歴の取得に失敗した場合は`AnalyzerError::Ingestion`を返します。
    pub fn analyze(&self) -> Result<Analysis, AnalyzerError> {
        let repo_info = self.repo.info();
        tracing::debug!(
            name = %repo_info.name,
            branch = %repo_info.branch,
            "opened repository"
        );

        let commits = self.repo.get_commits(&self.options.filter)?;
        if commits.is_empty() {
            tracing::info!("no commits match the given filters");
        }

        let mut analysis =
            Analysis::from_commits(repo_info, commits, self.options.threshold_hours)?;

        if self.options.collect_change_stats && !analysis.commits.is_empty() {
            let stats = self.repo.change_stats(&analysis.commits);
            tracing::debug!(
                measured = stats.len(),
                total = analysis.commits.len(),
                "collected change stats"
            );
            analysis.change_stats = Some(stats);
        }

        Ok(analysis)
    }
}

/// 分析結果
///
/// # フィールド
///
/// - `repo_info`: リポジトリの基本情報
/// - `commits`: 時系列順のコミット
/// - `sessions`: コミットを分割したセッション
/// - `estimate`: セッションごとの見積もりと合計
/// - `change_stats`: コミットごとの変更統計（取得した場合のみ）
#[derive(Debug, Clone)]
pub struct Analysis {
    pub repo_info: RepoInfo,
    pub commits: Vec<Commit>,
    pub sessions: Vec<Session>,
    pub estimate: WorkEstimate,
    pub change_stats: Option<IndexMap<String, ChangeStats>>,
}

impl Analysis {
    /// 取得済みのコミットから分析結果を作成します
    ///
    /// # エラー
    ///
    /// 閾値が`NaN`の場合は`AnalyzerError::InvalidInput`を返します。
    pub fn from_commits(
        repo_info: RepoInfo,
        mut commits: Vec<Commit>,
        threshold_hours: f64,
    ) -> Result<Self, AnalyzerError> {
        commits.sort_by_key(|c| c.timestamp);

        tracing::debug!(threshold_hours, "grouping commits into sessions");
        let sessions = segment(commits.clone(), threshold_hours)?;
        tracing::debug!(count = sessions.len(), "identified work sessions");

        let estimate = estimate(&sessions);
        for session in estimate.session_estimates.iter().take(3) {
            tracing::debug!(
                start = session.start,
                commits = session.commit_count,
                raw_hours = session.raw_hours,
                estimated_hours = session.estimated_hours,
                "session estimate"
            );
        }
        tracing::debug!(
            total_hours = estimate.total_estimated_hours,
            adjustment_factor = estimate.adjustment_factor(),
            "estimated work time"
        );

        Ok(Self {
            repo_info,
            commits,
            sessions,
            estimate,
            change_stats: None,
        })
    }

    /// 条件に合うコミットがなかったかどうか
    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    /// 統計を集計します
    pub fn report<Tz: TimeZone>(&self, current_year: i32, tz: &Tz) -> ActivityReport {
        ActivityReport::build(
            &self.commits,
            &self.estimate,
            self.change_stats.as_ref(),
            current_year,
            tz,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn repo_info() -> RepoInfo {
        RepoInfo {
            name: "demo".to_string(),
            branch: "main".to_string(),
            last_commit: None,
        }
    }

    fn commit_at(hash: &str, timestamp: i64) -> Commit {
        Commit {
            hash: hash.to_string(),
            author_name: "dev1".to_string(),
            author_email: "dev1@example.com".to_string(),
            timestamp,
            message: format!("commit {}", hash),
        }
    }

    #[test]
    fn test_analysis_from_commits() {
        let commits = vec![
            commit_at("d", 10 * 3600),
            commit_at("a", 0),
            commit_at("b", 3600),
            commit_at("c", 2 * 3600),
        ];

        let analysis = Analysis::from_commits(repo_info(), commits, 3.0).unwrap();

        assert!(!analysis.is_empty());
        assert_eq!(analysis.commits[0].hash, "a");
        assert_eq!(analysis.sessions.len(), 2);
        assert_eq!(analysis.estimate.session_count, 2);
        assert!((analysis.estimate.total_estimated_hours - 2.9).abs() < 1e-9);

        let report = analysis.report(1970, &Utc);
        assert_eq!(report.authors[0].commits, 4);
        assert!(report.sizes.is_none());
    }

    #[test]
    fn test_analysis_without_commits() {
        let analysis = Analysis::from_commits(repo_info(), Vec::new(), 3.0).unwrap();

        assert!(analysis.is_empty());
        assert!(analysis.sessions.is_empty());
        assert_eq!(analysis.estimate.session_count, 0);
        assert_eq!(analysis.estimate.total_estimated_hours, 0.0);
    }

    #[test]
    fn test_nan_threshold_is_rejected() {
        let result = WorkTimeAnalyzer::new(
            ".",
            AnalyzerOptions {
                threshold_hours: f64::NAN,
                ..AnalyzerOptions::default()
            },
        );
        assert!(matches!(result, Err(AnalyzerError::InvalidInput(_))));
    }

    #[test]
    fn test_invalid_repository_is_ingestion_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = WorkTimeAnalyzer::new(dir.path(), AnalyzerOptions::default());
        assert!(matches!(
            result,
            Err(AnalyzerError::Ingestion(IngestionError::InvalidRepository(_)))
        ));
    }
}
