//! コミットの期間指定（since / until）を解釈するモジュール
//!
//! 以下の形式を受け付けます：
//!
//! - `2024-01-31`、`2024-01-31 14:00`、`2024-01-31 14:00:30`（呼び出し側のタイムゾーン）
//! - RFC 3339（`2024-01-31T14:00:00+09:00`）
//! - `today`、`yesterday`
//! - `3 days ago`、`1 week ago`、`6 months ago` など

use super::error::IngestionError;
use chrono::{DateTime, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use regex::Regex;

const RELATIVE_PATTERN: &str = r"^(\d+)\s+(second|minute|hour|day|week|month|year)s?\s+ago$";

/// 期間指定の文字列を日時に変換します
///
/// # 引数
///
/// - `input`: 期間指定の文字列
/// - `now`: 相対指定の基準となる現在時刻（タイムゾーンも日付のみの指定に使われます）
///
/// # エラー
///
/// どの形式にも当てはまらない場合は`IngestionError::InvalidDate`を返します。
pub fn parse_date_bound<Tz: TimeZone>(
    input: &str,
    now: &DateTime<Tz>,
) -> Result<DateTime<Utc>, IngestionError> {
    let trimmed = input.trim();
    let lowered = trimmed.to_lowercase();
    let invalid = || IngestionError::InvalidDate(input.to_string());
    let tz = now.timezone();

    match lowered.as_str() {
        "today" => return start_of_day(now.date_naive(), &tz).ok_or_else(invalid),
        "yesterday" => {
            let date = now.date_naive().pred_opt().ok_or_else(invalid)?;
            return start_of_day(date, &tz).ok_or_else(invalid);
        }
        "now" => return Ok(now.with_timezone(&Utc)),
        _ => {}
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return in_timezone(&naive, &tz).ok_or_else(invalid);
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return start_of_day(date, &tz).ok_or_else(invalid);
    }

    let relative = Regex::new(RELATIVE_PATTERN)
        .map_err(|e| IngestionError::InvalidPattern(e.to_string()))?;
    let captures = relative.captures(&lowered).ok_or_else(invalid)?;
    let amount: u32 = captures[1].parse().map_err(|_| invalid())?;

    let bound = match &captures[2] {
        "month" => now.clone().checked_sub_months(Months::new(amount)),
        "year" => amount
            .checked_mul(12)
            .and_then(|months| now.clone().checked_sub_months(Months::new(months))),
        unit => {
            let seconds = i64::from(amount) * unit_seconds(unit);
            Duration::try_seconds(seconds).and_then(|d| now.clone().checked_sub_signed(d))
        }
    };

    bound.map(|dt| dt.with_timezone(&Utc)).ok_or_else(invalid)
}

fn unit_seconds(unit: &str) -> i64 {
    match unit {
        "minute" => 60,
        "hour" => 3_600,
        "day" => 86_400,
        "week" => 7 * 86_400,
        _ => 1,
    }
}

fn start_of_day<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> Option<DateTime<Utc>> {
    in_timezone(&date.and_time(NaiveTime::MIN), tz)
}

fn in_timezone<Tz: TimeZone>(naive: &NaiveDateTime, tz: &Tz) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 12, 30, 0).unwrap()
    }

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    #[test]
    fn test_absolute_dates() {
        let test_cases = [
            ("2023-01-01", utc(2023, 1, 1, 0, 0, 0)),
            ("2023-01-01 14:05", utc(2023, 1, 1, 14, 5, 0)),
            ("2023-01-01 14:05:09", utc(2023, 1, 1, 14, 5, 9)),
            ("2023-01-01T14:05:09+02:00", utc(2023, 1, 1, 12, 5, 9)),
            ("  2023-06-30  ", utc(2023, 6, 30, 0, 0, 0)),
        ];

        for (input, expected) in test_cases {
            let result = parse_date_bound(input, &now()).unwrap();
            assert_eq!(result, expected, "input '{}'", input);
        }
    }

    #[test]
    fn test_relative_dates() {
        let test_cases = [
            ("30 seconds ago", utc(2024, 3, 15, 12, 29, 30)),
            ("2 hours ago", utc(2024, 3, 15, 10, 30, 0)),
            ("1 day ago", utc(2024, 3, 14, 12, 30, 0)),
            ("2 weeks ago", utc(2024, 3, 1, 12, 30, 0)),
            ("1 month ago", utc(2024, 2, 15, 12, 30, 0)),
            ("1 Year Ago", utc(2023, 3, 15, 12, 30, 0)),
            ("today", utc(2024, 3, 15, 0, 0, 0)),
            ("yesterday", utc(2024, 3, 14, 0, 0, 0)),
            ("now", now()),
        ];

        for (input, expected) in test_cases {
            let result = parse_date_bound(input, &now()).unwrap();
            assert_eq!(result, expected, "input '{}'", input);
        }
    }

    #[test]
    fn test_naive_dates_use_caller_timezone() {
        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        let now_in_tokyo = now().with_timezone(&tokyo);

        let result = parse_date_bound("2024-01-01", &now_in_tokyo).unwrap();
        assert_eq!(result, utc(2023, 12, 31, 15, 0, 0));
    }

    #[test]
    fn test_invalid_dates() {
        for input in ["", "last tuesday", "2024-13-01", "ago", "-3 days ago"] {
            let result = parse_date_bound(input, &now());
            assert!(
                matches!(result, Err(IngestionError::InvalidDate(_))),
                "input '{}' should be rejected",
                input
            );
        }
    }
}
