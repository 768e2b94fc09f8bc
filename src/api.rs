//! Public API Types
//!
//! 公開APIで使用する列挙型を定義するモジュール。

use std::path::Path;
use std::str::FromStr;

use serde::Serialize;

use crate::error::RemapError;

/// 対象列に届かない短い行の扱い
///
/// ワークブックから抽出したCSVは行ごとに末尾の空セルが省略されるため、
/// ヘッダーよりセル数が少ない行が現れることがあります。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum ShortRowPolicy {
    /// `RemapError::MalformedRow`としてファイル全体を失敗させる（デフォルト）
    ///
    /// 対象列がシートの最終列の場合、その列が空欄の行は末尾の空セルとして
    /// 省略されるため、空欄が1つでもあるワークブックは失敗します。
    /// 空欄を`DEFAULT`で埋めたい場合は[`ShortRowPolicy::Pad`]を使用してください。
    #[default]
    Reject,

    /// 対象列まで空文字列で埋めてから変換する
    ///
    /// 空文字列は通常`VALUES`に一致しないため、対象セルは`DEFAULT`になります。
    Pad,
}

impl FromStr for ShortRowPolicy {
    type Err = RemapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" | "error" => Ok(ShortRowPolicy::Reject),
            "pad" => Ok(ShortRowPolicy::Pad),
            other => Err(RemapError::Config(format!(
                "Invalid SHORT_ROWS value: '{}' (expected 'reject' or 'pad')",
                other
            ))),
        }
    }
}

/// ファイル単位の失敗に対する実行全体の振る舞い
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum ErrorPolicy {
    /// 失敗したファイルを記録して残りのファイルの処理を続ける（デフォルト）
    ///
    /// 失敗は`RunSummary::failed`に集約されます。
    #[default]
    Continue,

    /// 最初の失敗で実行全体を停止し、そのエラーを返す
    Halt,
}

impl FromStr for ErrorPolicy {
    type Err = RemapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "continue" => Ok(ErrorPolicy::Continue),
            "halt" | "stop" => Ok(ErrorPolicy::Halt),
            other => Err(RemapError::Config(format!(
                "Invalid ON_ERROR value: '{}' (expected 'continue' or 'halt')",
                other
            ))),
        }
    }
}

/// 入力ファイルの種類
///
/// 拡張子を小文字化して判定します。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    /// `.xlsx`ワークブック
    Spreadsheet,
    /// `.csv`ファイル
    Csv,
    /// 対象外の拡張子（小文字化済み、ドットなし）
    Unsupported(String),
}

impl FileKind {
    /// パスの拡張子からファイルの種類を判定する
    ///
    /// # 使用例
    ///
    /// ```rust
    /// use xlsxremap::FileKind;
    ///
    /// assert_eq!(FileKind::from_path("docs/Report.XLSX".as_ref()), FileKind::Spreadsheet);
    /// assert_eq!(FileKind::from_path("docs/list.csv".as_ref()), FileKind::Csv);
    /// ```
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "xlsx" => FileKind::Spreadsheet,
            "csv" => FileKind::Csv,
            _ => FileKind::Unsupported(ext),
        }
    }
}
