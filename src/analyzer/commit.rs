//! コミット履歴の基本データ型を定義するモジュール

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

/// 1件のコミットを表す不変のレコード
///
/// 並び順のキーは`timestamp`です。`hash`はコミットごとに一意ですが、
/// 重複しても個別のコミットとして扱います。
///
/// # フィールド
///
/// - `hash`: コミットハッシュ（40桁の16進数）
/// - `author_name`: 作成者の表示名
/// - `author_email`: 作成者のメールアドレス
/// - `timestamp`: 作成日時（エポック秒）
/// - `message`: コミットメッセージの1行目
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Commit {
    pub hash: String,
    pub author_name: String,
    pub author_email: String,
    pub timestamp: i64,
    pub message: String,
}

impl Commit {
    /// 先頭8文字の短縮ハッシュを返します
    pub fn short_hash(&self) -> &str {
        let end = self
            .hash
            .char_indices()
            .nth(8)
            .map_or(self.hash.len(), |(i, _)| i);
        &self.hash[..end]
    }

    /// 指定したタイムゾーンでの作成日時を返します
    ///
    /// chronoで表現できない範囲のタイムスタンプの場合は`None`を返します。
    pub fn datetime_in<Tz: TimeZone>(&self, tz: &Tz) -> Option<DateTime<Tz>> {
        to_datetime(self.timestamp, tz)
    }
}

/// エポック秒を指定したタイムゾーンの日時に変換します
pub fn to_datetime<Tz: TimeZone>(timestamp: i64, tz: &Tz) -> Option<DateTime<Tz>> {
    DateTime::<Utc>::from_timestamp(timestamp, 0).map(|dt| dt.with_timezone(tz))
}

/// 1コミット分の変更統計
///
/// 取り込み側が任意で付与する情報で、サイズ分類の集計にのみ使われます。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChangeStats {
    pub files_changed: usize,
    pub insertions: usize,
    pub deletions: usize,
}

impl ChangeStats {
    /// 変更行数（追加 + 削除）
    pub fn lines_changed(&self) -> usize {
        self.insertions + self.deletions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, FixedOffset, Timelike};

    fn commit(hash: &str, timestamp: i64) -> Commit {
        Commit {
            hash: hash.to_string(),
            author_name: "dev1".to_string(),
            author_email: "dev1@example.com".to_string(),
            timestamp,
            message: "init".to_string(),
        }
    }

    #[test]
    fn test_short_hash() {
        let c = commit("0123456789abcdef0123456789abcdef01234567", 0);
        assert_eq!(c.short_hash(), "01234567");

        let short = commit("abc", 0);
        assert_eq!(short.short_hash(), "abc");
    }

    #[test]
    fn test_datetime_in_fixed_offset() {
        // 2024-01-01T23:30:00Z
        let c = commit("a", 1_704_151_800);
        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        let local = c.datetime_in(&tokyo).unwrap();

        assert_eq!(local.day(), 2);
        assert_eq!(local.hour(), 8);
        assert_eq!(local.minute(), 30);
    }

    #[test]
    fn test_negative_timestamp_is_before_epoch() {
        let c = commit("a", -3600);
        let dt = c.datetime_in(&Utc).unwrap();
        assert_eq!(dt.year(), 1969);
        assert_eq!(dt.hour(), 23);
    }

    #[test]
    fn test_lines_changed() {
        let stats = ChangeStats {
            files_changed: 3,
            insertions: 40,
            deletions: 2,
        };
        assert_eq!(stats.lines_changed(), 42);
    }
}
