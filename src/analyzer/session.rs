//! コミット列を作業セッションに分割するモジュール
//!
//! 時系列順のコミット列を1回の走査で区切ります。直前のコミットとの間隔が
//! 閾値（時間）以下なら同じセッションに追加し、閾値を超えたら新しい
//! セッションを開始します。

use super::commit::Commit;
use super::error::AnalyzerError;
use serde::Serialize;

const SECONDS_PER_HOUR: f64 = 3600.0;

/// 時間的に近いコミットの連続した並び
///
/// 空のセッションは作られません。生成後は変更されず、
/// 所属するコミットを所有します。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    commits: Vec<Commit>,
}

impl Session {
    fn start_with(commit: Commit) -> Self {
        Self {
            commits: vec![commit],
        }
    }

    pub fn commits(&self) -> &[Commit] {
        &self.commits
    }

    pub fn first(&self) -> &Commit {
        &self.commits[0]
    }

    pub fn last(&self) -> &Commit {
        &self.commits[self.commits.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.commits.len()
    }

    /// 常に`false`（セッションは少なくとも1件のコミットを持つ）
    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    /// 最初と最後のコミットの間の経過時間（時間単位）
    pub fn span_hours(&self) -> f64 {
        gap_hours(self.first(), self.last())
    }
}

/// 2つのコミット間の間隔（時間単位）
///
/// 差は`i128`で計算するため、任意の`i64`の組でオーバーフローしません。
pub fn gap_hours(earlier: &Commit, later: &Commit) -> f64 {
    (i128::from(later.timestamp) - i128::from(earlier.timestamp)) as f64 / SECONDS_PER_HOUR
}

/// コミットを1件ずつ受け取り、閉じたセッションを順次返す分割器
///
/// 巨大な履歴をチャンク単位で流し込む場合に使います。
/// 入力は時系列順である必要があり、直前より古いコミットは拒否されます。
///
/// # フィールド
///
/// - `threshold_hours`: 同一セッションとみなす最大間隔（時間）
/// - `current`: 構築中のセッション
#[derive(Debug)]
pub struct SessionSegmenter {
    threshold_hours: f64,
    current: Option<Session>,
}

impl SessionSegmenter {
    /// 新しい分割器を作成します
    ///
    /// 閾値は0以下でも有効です（同一時刻のコミットのみがまとまります）。
    ///
    /// # エラー
    ///
    /// 閾値が`NaN`の場合は`AnalyzerError::InvalidInput`を返します。
    pub fn new(threshold_hours: f64) -> Result<Self, AnalyzerError> {
        if threshold_hours.is_nan() {
            return Err(AnalyzerError::InvalidInput(
                "session threshold must be a number".to_string(),
            ));
        }
        Ok(Self {
            threshold_hours,
            current: None,
        })
    }

    /// コミットを1件追加します
    ///
    /// 間隔が閾値を超えた場合、それまでのセッションを閉じて返します。
    ///
    /// # エラー
    ///
    /// 直前のコミットより古いコミットを渡した場合は
    /// `AnalyzerError::InvalidInput`を返し、状態は変更しません。
    pub fn push(&mut self, commit: Commit) -> Result<Option<Session>, AnalyzerError> {
        if let Some(session) = self.current.as_mut() {
            let last = session.last();
            if commit.timestamp < last.timestamp {
                return Err(AnalyzerError::InvalidInput(format!(
                    "commit {} ({}) is older than the previous commit {} ({})",
                    commit.short_hash(),
                    commit.timestamp,
                    last.short_hash(),
                    last.timestamp
                )));
            }
            if gap_hours(last, &commit) <= self.threshold_hours {
                session.commits.push(commit);
                return Ok(None);
            }
        }
        Ok(self.current.replace(Session::start_with(commit)))
    }

    /// 構築中のセッションを閉じて返します
    pub fn finish(self) -> Option<Session> {
        self.current
    }
}

/// コミット列をセッションに分割します
///
/// 取り込み側の並び順は信用せず、時系列順でない入力は
/// タイムスタンプで安定ソートしてから分割します。
/// 空の入力には空のベクターを返します。
///
/// # エラー
///
/// 閾値が`NaN`の場合は`AnalyzerError::InvalidInput`を返します。
pub fn segment(
    mut commits: Vec<Commit>,
    threshold_hours: f64,
) -> Result<Vec<Session>, AnalyzerError> {
    let mut segmenter = SessionSegmenter::new(threshold_hours)?;

    if !commits.windows(2).all(|w| w[0].timestamp <= w[1].timestamp) {
        tracing::debug!("commits are not in chronological order, sorting before segmentation");
        commits.sort_by_key(|c| c.timestamp);
    }

    let mut sessions = Vec::new();
    for commit in commits {
        if let Some(closed) = segmenter.push(commit)? {
            sessions.push(closed);
        }
    }
    sessions.extend(segmenter.finish());

    Ok(sessions)
}
