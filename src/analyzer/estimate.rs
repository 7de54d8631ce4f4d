//! セッションから作業時間を見積もるモジュール
//!
//! 各セッションの経過時間を下限0.5時間・上限8時間に丸め、
//! コミット数に応じた係数（1.0〜2.0倍）を掛けて見積時間とします。

use super::metrics::round_to_2;
use super::session::Session;
use serde::Serialize;

/// 1セッションで計上できる連続作業時間の上限
pub const MAX_SESSION_HOURS: f64 = 8.0;
/// 1セッションあたりの最低作業時間
pub const MIN_SESSION_HOURS: f64 = 0.5;
/// 追加コミット1件ごとの係数の増分
pub const COMMIT_FACTOR_STEP: f64 = 0.1;
/// コミット数係数の上限
pub const MAX_COMMIT_FACTOR: f64 = 2.0;

/// 1セッション分の見積もり結果
///
/// # フィールド
///
/// - `start`, `end`: 最初と最後のコミットのタイムスタンプ（エポック秒）
/// - `commit_count`: セッション内のコミット数
/// - `raw_hours`: 丸める前の経過時間
/// - `adjusted_hours`: 下限・上限を適用した時間
/// - `commit_factor`: コミット数による係数
/// - `estimated_hours`: 最終的な見積時間
/// - `first_message`: 最初のコミットのメッセージ
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionEstimate {
    pub start: i64,
    pub end: i64,
    pub commit_count: usize,
    #[serde(serialize_with = "round_to_2")]
    pub raw_hours: f64,
    #[serde(serialize_with = "round_to_2")]
    pub adjusted_hours: f64,
    #[serde(serialize_with = "round_to_2")]
    pub commit_factor: f64,
    #[serde(serialize_with = "round_to_2")]
    pub estimated_hours: f64,
    pub first_message: String,
}

impl SessionEstimate {
    /// セッションの見積もりを計算します
    pub fn from_session(session: &Session) -> Self {
        let raw_hours = session.span_hours();

        let mut adjusted_hours = if raw_hours > 0.0 {
            raw_hours.min(MAX_SESSION_HOURS)
        } else {
            MIN_SESSION_HOURS
        };
        if adjusted_hours < MIN_SESSION_HOURS {
            adjusted_hours = MIN_SESSION_HOURS;
        }

        let commit_factor = commit_factor(session.len());

        Self {
            start: session.first().timestamp,
            end: session.last().timestamp,
            commit_count: session.len(),
            raw_hours,
            adjusted_hours,
            commit_factor,
            estimated_hours: adjusted_hours * commit_factor,
            first_message: session.first().message.clone(),
        }
    }
}

/// コミット数に応じた係数を返します
pub fn commit_factor(commit_count: usize) -> f64 {
    let extra = commit_count.saturating_sub(1) as f64;
    (1.0 + extra * COMMIT_FACTOR_STEP).min(MAX_COMMIT_FACTOR)
}

/// 全セッションの見積もりの集計
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WorkEstimate {
    #[serde(serialize_with = "round_to_2")]
    pub total_estimated_hours: f64,
    #[serde(serialize_with = "round_to_2")]
    pub total_raw_hours: f64,
    pub session_count: usize,
    pub session_estimates: Vec<SessionEstimate>,
}

impl WorkEstimate {
    /// セッションごとの平均見積時間
    pub fn average_session_hours(&self) -> f64 {
        if self.session_count == 0 {
            0.0
        } else {
            self.total_estimated_hours / self.session_count as f64
        }
    }

    /// 見積時間と経過時間の比率（経過時間が0なら1.0）
    pub fn adjustment_factor(&self) -> f64 {
        if self.total_raw_hours > 0.0 {
            self.total_estimated_hours / self.total_raw_hours
        } else {
            1.0
        }
    }

    /// 8時間労働に換算した日数
    pub fn workdays(&self) -> f64 {
        self.total_estimated_hours / MAX_SESSION_HOURS
    }

    pub fn hours_per_commit(&self, commit_count: usize) -> f64 {
        if commit_count == 0 {
            0.0
        } else {
            self.total_estimated_hours / commit_count as f64
        }
    }

    /// 見積時間の長い順に上位`n`件のセッションを返します
    ///
    /// 同じ見積時間のセッションは時系列順に並びます。
    pub fn top_sessions(&self, n: usize) -> Vec<&SessionEstimate> {
        let mut sorted: Vec<&SessionEstimate> = self.session_estimates.iter().collect();
        sorted.sort_by(|a, b| b.estimated_hours.total_cmp(&a.estimated_hours));
        sorted.truncate(n);
        sorted
    }
}

/// セッション列から作業時間を見積もります
pub fn estimate(sessions: &[Session]) -> WorkEstimate {
    let session_estimates: Vec<SessionEstimate> =
        sessions.iter().map(SessionEstimate::from_session).collect();

    let total_estimated_hours = session_estimates.iter().map(|s| s.estimated_hours).sum();
    let total_raw_hours = session_estimates.iter().map(|s| s.raw_hours).sum();

    WorkEstimate {
        total_estimated_hours,
        total_raw_hours,
        session_count: session_estimates.len(),
        session_estimates,
    }
}
