//! Gitリポジトリの作業時間推定ツール
//!
//! このクレートは、Gitリポジトリのコミット履歴を時間的に近いまとまり
//! （作業セッション）に分割し、ヒューリスティックによって
//! 実際の作業時間を推定するための機能を提供します。
//!
//! # 主な機能
//!
//! - コミット履歴の取得と絞り込み（作成者・ブランチ・期間）
//! - 時間の間隔によるセッション分割
//! - セッションごとの作業時間の見積もり
//! - 曜日・時間帯・月・作成者ごとの統計
//! - テキストレポートとCSV出力
//!
//! # 使用例
//!
//! ```no_run
//! use git_worktime::{AnalyzerOptions, WorkTimeAnalyzer};
//!
//! let analyzer = WorkTimeAnalyzer::new("path/to/repo", AnalyzerOptions::default()).unwrap();
//!
//! let analysis = analyzer.analyze().unwrap();
//! println!("{:.2} hours", analysis.estimate.total_estimated_hours);
//! ```

pub mod analyzer;
pub mod export;
pub mod report;

pub use analyzer::{Analysis, AnalyzerError, AnalyzerOptions, WorkTimeAnalyzer};
