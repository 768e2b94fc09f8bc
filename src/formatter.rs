//! Formatter Module
//!
//! ワークブックのセル値を表示用の文字列に変換するモジュール。
//! 抽出したCSVには、Excelで表示される文字列に近い形でセル値を書き出します。

use calamine::{Data, ExcelDateTime};
use chrono::{NaiveDateTime, Timelike};

use crate::format::FormatParser;

/// セルフォーマッター
///
/// セル値のフォーマット処理のファサードとして機能します。
#[derive(Debug, Default)]
pub(crate) struct CellFormatter {
    /// 日付フォーマッター
    date_formatter: DateFormatter,

    /// 数値フォーマッター
    number_formatter: NumberFormatter,

    /// ワークブックが1904年エポックを使用するかどうか
    is_1904: bool,
}

impl CellFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_1904(is_1904: bool) -> Self {
        Self {
            is_1904,
            ..Self::default()
        }
    }

    /// セルの書式を適用してフォーマット
    ///
    /// 数値・日時のセルに"General"以外の書式があれば、Excelの表示文字列を返します。
    /// 書式が無い場合や再現できない書式（指数・分数など）の場合は
    /// [`format_cell`](Self::format_cell)の規則に従います。
    pub fn format_cell_with(&self, cell: &Data, format: Option<&FormatParser>) -> String {
        let value = match cell {
            Data::Int(i) => Some(*i as f64),
            Data::Float(f) => Some(*f),
            Data::DateTime(dt) => Some(dt.as_f64()),
            _ => None,
        };

        if let (Some(value), Some(format)) = (value, format) {
            if let Some(text) = format.format_number(value, self.is_1904) {
                return text;
            }
        }

        self.format_cell(cell)
    }

    /// セル値を標準（"General"）の規則でフォーマット
    ///
    /// # 変換規則
    ///
    /// - 文字列: そのまま
    /// - 整数・小数: 有効数字15桁の最短表記（`1.0` → `1`）
    /// - 真偽値: `TRUE` / `FALSE`
    /// - 日付: `YYYY-MM-DD`、時刻成分があれば`YYYY-MM-DD HH:MM:SS`
    /// - ISO形式の日付・期間: そのまま
    /// - エラー値: Excelのエラーコード（`#DIV/0!`など）
    /// - 空セル: 空文字列
    pub fn format_cell(&self, cell: &Data) -> String {
        match cell {
            Data::String(s) => s.clone(),
            Data::Int(i) => i.to_string(),
            Data::Float(f) => self.number_formatter.format(*f),
            Data::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            Data::DateTime(dt) => self
                .date_formatter
                .format(dt)
                .unwrap_or_else(|| self.number_formatter.format(dt.as_f64())),
            Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
            Data::Error(e) => e.to_string(),
            Data::Empty => String::new(),
        }
    }

    /// 行全体をフォーマットし、末尾の空セルを取り除く
    ///
    /// `format_at`は行内の列インデックスからセルの書式を返します。
    /// 行はパディングせず、値を持つ最後のセルまでを返します。
    pub fn format_row<'a>(
        &self,
        row: &[Data],
        format_at: impl Fn(usize) -> Option<&'a FormatParser>,
    ) -> Vec<String> {
        let mut cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(col, cell)| self.format_cell_with(cell, format_at(col)))
            .collect();
        while cells.last().is_some_and(|c| c.is_empty()) {
            cells.pop();
        }
        cells
    }
}

/// 日付フォーマッター
///
/// calamineが日付書式から判定した日時値を文字列に変換します。
/// 1900年/1904年エポックの補正はcalamine側で行われます。
#[derive(Debug, Default)]
pub(crate) struct DateFormatter;

impl DateFormatter {
    /// 日時値をフォーマット
    ///
    /// 変換できない値（範囲外のシリアル値など）は`None`を返します。
    pub fn format(&self, value: &ExcelDateTime) -> Option<String> {
        if value.is_duration() {
            let duration = value.as_duration()?;
            let total = duration.num_seconds();
            return Some(format!(
                "{}:{:02}:{:02}",
                total / 3600,
                (total % 3600).abs() / 60,
                total.abs() % 60
            ));
        }

        value.as_datetime().map(|dt| self.format_datetime(&dt))
    }

    fn format_datetime(&self, dt: &NaiveDateTime) -> String {
        if dt.time().num_seconds_from_midnight() == 0 {
            dt.format("%Y-%m-%d").to_string()
        } else {
            dt.format("%Y-%m-%d %H:%M:%S").to_string()
        }
    }
}

/// 数値フォーマッター
///
/// Excelの「標準」書式と同様に、有効数字15桁で丸めてから最短表記にします。
#[derive(Debug, Default)]
pub(crate) struct NumberFormatter;

impl NumberFormatter {
    /// 数値をフォーマット
    ///
    /// `0.1 + 0.2`のような浮動小数点誤差は`0.3`として出力されます。
    pub fn format(&self, value: f64) -> String {
        if !value.is_finite() {
            return value.to_string();
        }

        let rounded: f64 = format!("{:.14e}", value).parse().unwrap_or(value);
        if rounded == 0.0 {
            // -0 を 0 に正規化
            return "0".to_string();
        }
        rounded.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::CellErrorType;

    #[test]
    fn test_format_string_and_empty() {
        let formatter = CellFormatter::new();
        assert_eq!(formatter.format_cell(&Data::String("open".to_string())), "open");
        assert_eq!(formatter.format_cell(&Data::Empty), "");
    }

    #[test]
    fn test_format_numbers() {
        let formatter = CellFormatter::new();
        assert_eq!(formatter.format_cell(&Data::Int(42)), "42");
        assert_eq!(formatter.format_cell(&Data::Float(1.0)), "1");
        assert_eq!(formatter.format_cell(&Data::Float(2.5)), "2.5");
        assert_eq!(formatter.format_cell(&Data::Float(-3.25)), "-3.25");
        assert_eq!(formatter.format_cell(&Data::Float(0.1 + 0.2)), "0.3");
        assert_eq!(formatter.format_cell(&Data::Float(-0.0)), "0");
    }

    #[test]
    fn test_format_bool() {
        let formatter = CellFormatter::new();
        assert_eq!(formatter.format_cell(&Data::Bool(true)), "TRUE");
        assert_eq!(formatter.format_cell(&Data::Bool(false)), "FALSE");
    }

    #[test]
    fn test_format_error() {
        let formatter = CellFormatter::new();
        assert_eq!(formatter.format_cell(&Data::Error(CellErrorType::Div0)), "#DIV/0!");
        assert_eq!(formatter.format_cell(&Data::Error(CellErrorType::NA)), "#N/A");
    }

    #[test]
    fn test_format_iso_strings() {
        let formatter = CellFormatter::new();
        assert_eq!(
            formatter.format_cell(&Data::DateTimeIso("2025-01-02T03:04:05".to_string())),
            "2025-01-02T03:04:05"
        );
        assert_eq!(
            formatter.format_cell(&Data::DurationIso("PT1H".to_string())),
            "PT1H"
        );
    }

    #[test]
    fn test_format_row_trims_trailing_empty_cells() {
        let formatter = CellFormatter::new();
        let row = vec![
            Data::String("a".to_string()),
            Data::Empty,
            Data::String("c".to_string()),
            Data::Empty,
            Data::Empty,
        ];
        assert_eq!(formatter.format_row(&row, |_| None), vec!["a", "", "c"]);
        assert!(formatter
            .format_row(&[Data::Empty, Data::Empty], |_| None)
            .is_empty());
    }

    #[test]
    fn test_format_cell_with_number_format() {
        let formatter = CellFormatter::new();
        let percent = FormatParser::parse("0%");
        let fixed = FormatParser::parse("0.00");
        assert_eq!(formatter.format_cell_with(&Data::Float(0.5), Some(&percent)), "50%");
        assert_eq!(formatter.format_cell_with(&Data::Float(1.0), Some(&fixed)), "1.00");
        assert_eq!(formatter.format_cell_with(&Data::Int(3), Some(&fixed)), "3.00");
        assert_eq!(formatter.format_cell_with(&Data::Float(1.0), None), "1");
    }

    #[test]
    fn test_format_cell_with_ignores_format_for_text() {
        let formatter = CellFormatter::new();
        let fixed = FormatParser::parse("0.00");
        assert_eq!(
            formatter.format_cell_with(&Data::String("open".to_string()), Some(&fixed)),
            "open"
        );
        assert_eq!(formatter.format_cell_with(&Data::Bool(true), Some(&fixed)), "TRUE");
    }

    #[test]
    fn test_format_cell_with_unsupported_format_falls_back() {
        let formatter = CellFormatter::new();
        let scientific = FormatParser::parse("0.00E+00");
        assert_eq!(
            formatter.format_cell_with(&Data::Float(12345.0), Some(&scientific)),
            "12345"
        );
    }

    #[test]
    fn test_format_row_applies_formats_per_column() {
        let formatter = CellFormatter::new();
        let code = FormatParser::parse("000");
        let row = vec![Data::Float(7.0), Data::Float(7.0)];
        let cells = formatter.format_row(&row, |col| (col == 1).then_some(&code));
        assert_eq!(cells, vec!["7", "007"]);
    }

    #[test]
    fn test_format_1904_dates() {
        let formatter = CellFormatter::with_1904(true);
        let date = FormatParser::parse("yyyy-mm-dd");
        assert_eq!(formatter.format_cell_with(&Data::Float(0.0), Some(&date)), "1904-01-01");
    }

    #[test]
    fn test_number_formatter_large_values() {
        let formatter = NumberFormatter;
        assert_eq!(formatter.format(1234567.0), "1234567");
        assert_eq!(formatter.format(0.000125), "0.000125");
    }
}
